//! Fuzz target for request validation
//!
//! Arbitrary JSON is read as a request and validated. Validation must either
//! accept the input or report issues; it must never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if input.len() > 10_000 {
            return;
        }

        if let Ok(request) = ferro_mrna::OptimizationInput::from_json(input) {
            let _ = request.validate();
        }

        let _ = ferro_mrna::RawSequence::nucleic_acid(input).validate();
        let _ = ferro_mrna::RawSequence::amino_acid(input).validate();
    }
});
