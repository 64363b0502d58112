//! Input construct model: coding sequence plus flanking regions
//!
//! A [`Sequence`] is built once from a [`RawSequence`] at submission time and
//! is immutable for the rest of the run. Validation reports every violated
//! field rather than stopping at the first.

pub mod normalize;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::context::RequestContext;
use crate::engine::{OptimizationEngine, TransportError};
use crate::validation::{ValidationCollector, ValidationErrors};

pub use normalize::{
    is_amino_acid, is_nucleic_acid, normalize_nucleic_acid, normalize_sequence,
    AMINO_ACID_ALPHABET, NUCLEIC_ACID_ALPHABET,
};

/// Kind of coding sequence supplied by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SequenceType {
    #[default]
    NucleicAcid,
    AminoAcid,
}

impl SequenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceType::NucleicAcid => "nucleic-acid",
            SequenceType::AminoAcid => "amino-acid",
        }
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unvalidated sequence input, as submitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSequence {
    #[serde(default)]
    pub coding_sequence_type: SequenceType,
    #[serde(default)]
    pub coding_sequence: String,
    #[serde(default)]
    pub five_prime_utr: String,
    #[serde(default)]
    pub three_prime_utr: String,
    #[serde(default)]
    pub poly_a_tail: String,
}

impl RawSequence {
    /// Nucleic-acid coding sequence without flanking regions
    pub fn nucleic_acid(coding_sequence: impl Into<String>) -> Self {
        Self {
            coding_sequence_type: SequenceType::NucleicAcid,
            coding_sequence: coding_sequence.into(),
            ..Self::default()
        }
    }

    /// Amino-acid coding sequence without flanking regions
    pub fn amino_acid(coding_sequence: impl Into<String>) -> Self {
        Self {
            coding_sequence_type: SequenceType::AminoAcid,
            coding_sequence: coding_sequence.into(),
            ..Self::default()
        }
    }

    pub fn with_utrs(
        mut self,
        five_prime_utr: impl Into<String>,
        three_prime_utr: impl Into<String>,
    ) -> Self {
        self.five_prime_utr = five_prime_utr.into();
        self.three_prime_utr = three_prime_utr.into();
        self
    }

    pub fn with_poly_a_tail(mut self, poly_a_tail: impl Into<String>) -> Self {
        self.poly_a_tail = poly_a_tail.into();
        self
    }

    /// Normalize and validate into a [`Sequence`]
    pub fn validate(&self) -> Result<Sequence, ValidationErrors> {
        Sequence::validate(self)
    }
}

/// Failure to project an amino-acid sequence to nucleic acid
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("conversion failed: {0}")]
    Transport(#[from] TransportError),

    #[error("conversion returned an invalid nucleic acid sequence: {0}")]
    InvalidOutput(String),
}

/// Validated, normalized input construct
#[derive(Debug, Clone, Serialize)]
pub struct Sequence {
    coding_sequence_type: SequenceType,
    coding_sequence: String,
    five_prime_utr: String,
    three_prime_utr: String,
    poly_a_tail: String,
    /// Nucleic-acid projection of the CDS, filled on first request
    #[serde(skip)]
    nucleic_acid: Arc<OnceCell<String>>,
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.coding_sequence_type == other.coding_sequence_type
            && self.coding_sequence == other.coding_sequence
            && self.five_prime_utr == other.five_prime_utr
            && self.three_prime_utr == other.three_prime_utr
            && self.poly_a_tail == other.poly_a_tail
    }
}

impl Eq for Sequence {}

impl Sequence {
    /// Normalize the raw input, then check every invariant
    pub fn validate(raw: &RawSequence) -> Result<Self, ValidationErrors> {
        let mut collector = ValidationCollector::new();
        let kind = raw.coding_sequence_type;

        let coding_sequence = match kind {
            SequenceType::NucleicAcid => normalize_nucleic_acid(&raw.coding_sequence),
            SequenceType::AminoAcid => normalize_sequence(&raw.coding_sequence),
        };

        if coding_sequence.is_empty() {
            collector.push("coding_sequence", "Coding sequence must not be empty.");
        } else {
            match kind {
                SequenceType::NucleicAcid => {
                    if coding_sequence.len() % 3 != 0 {
                        collector.push(
                            "coding_sequence",
                            "Nucleic acid sequence must be a valid amino acid (sequence length must be a multiple of 3).",
                        );
                    }
                    if !is_nucleic_acid(&coding_sequence) {
                        collector.push(
                            "coding_sequence",
                            "Nucleic acid must only contain the characters 'ACGTU'.",
                        );
                    }
                }
                SequenceType::AminoAcid => {
                    if !is_amino_acid(&coding_sequence) {
                        collector.push(
                            "coding_sequence",
                            "Amino acid must only contain the characters 'ARNDCEQGHILKMFPSTWYV*'.",
                        );
                    }
                }
            }
        }

        let five_prime_utr = normalize_nucleic_acid(&raw.five_prime_utr);
        let three_prime_utr = normalize_nucleic_acid(&raw.three_prime_utr);
        let poly_a_tail = normalize_nucleic_acid(&raw.poly_a_tail);

        for (field, value) in [
            ("five_prime_utr", &five_prime_utr),
            ("three_prime_utr", &three_prime_utr),
            ("poly_a_tail", &poly_a_tail),
        ] {
            if !is_nucleic_acid(value) {
                collector.push(field, "Nucleic acid must only contain the characters 'ACGTU'.");
            }
        }

        collector.finish_with(|| Self {
            coding_sequence_type: kind,
            coding_sequence,
            five_prime_utr,
            three_prime_utr,
            poly_a_tail,
            nucleic_acid: Arc::new(OnceCell::new()),
        })
    }

    pub fn coding_sequence_type(&self) -> SequenceType {
        self.coding_sequence_type
    }

    pub fn coding_sequence(&self) -> &str {
        &self.coding_sequence
    }

    pub fn five_prime_utr(&self) -> &str {
        &self.five_prime_utr
    }

    pub fn three_prime_utr(&self) -> &str {
        &self.three_prime_utr
    }

    pub fn poly_a_tail(&self) -> &str {
        &self.poly_a_tail
    }

    /// CDS length in nucleotides; with `full`, UTRs and poly(A) are added
    pub fn nucleotide_length(&self, full: bool) -> usize {
        let cds = match self.coding_sequence_type {
            SequenceType::NucleicAcid => self.coding_sequence.len(),
            SequenceType::AminoAcid => self.coding_sequence.len() * 3,
        };
        if full {
            cds + self.five_prime_utr.len() + self.three_prime_utr.len() + self.poly_a_tail.len()
        } else {
            cds
        }
    }

    /// CDS length in codons
    pub fn amino_acid_length(&self) -> usize {
        match self.coding_sequence_type {
            SequenceType::NucleicAcid => self.coding_sequence.len() / 3,
            SequenceType::AminoAcid => self.coding_sequence.len(),
        }
    }

    /// Assemble 5'UTR + `cds` + 3'UTR + poly(A)
    pub fn full_sequence(&self, cds: &str) -> String {
        let mut full = String::with_capacity(
            self.five_prime_utr.len() + cds.len() + self.three_prime_utr.len() + self.poly_a_tail.len(),
        );
        full.push_str(&self.five_prime_utr);
        full.push_str(cds);
        full.push_str(&self.three_prime_utr);
        full.push_str(&self.poly_a_tail);
        full
    }

    /// The CDS as nucleic acid
    ///
    /// Amino-acid input is projected through the engine's Convert operation.
    /// The projection is cached, so repeated calls (including on clones of this
    /// sequence) invoke the engine at most once.
    pub async fn to_nucleic_acid(
        &self,
        engine: &dyn OptimizationEngine,
        ctx: &RequestContext,
        organism: &str,
    ) -> Result<&str, ConversionError> {
        if self.coding_sequence_type == SequenceType::NucleicAcid {
            return Ok(&self.coding_sequence);
        }

        let converted = self
            .nucleic_acid
            .get_or_try_init(|| async {
                tracing::debug!(
                    organism,
                    residues = self.coding_sequence.len(),
                    "converting amino acid sequence to nucleic acid"
                );
                let output = engine.convert(ctx, &self.coding_sequence, organism).await?;
                let output = normalize_nucleic_acid(&output);
                if output.is_empty() || output.len() % 3 != 0 || !is_nucleic_acid(&output) {
                    return Err(ConversionError::InvalidOutput(output));
                }
                Ok(output)
            })
            .await?;

        Ok(converted.as_str())
    }

    /// True once the nucleic-acid projection has been resolved
    pub fn is_resolved(&self) -> bool {
        self.coding_sequence_type == SequenceType::NucleicAcid || self.nucleic_acid.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::MockEngine;
    use crate::engine::Operation;

    fn issues_for(raw: RawSequence) -> Vec<(String, String)> {
        raw.validate()
            .unwrap_err()
            .issues()
            .iter()
            .map(|i| (i.path.clone(), i.message.clone()))
            .collect()
    }

    #[test]
    fn test_valid_nucleic_acid_is_normalized() {
        let seq = RawSequence::nucleic_acid("aug gcc\nuaa")
            .with_utrs("gg u", "cc")
            .with_poly_a_tail("aaa")
            .validate()
            .unwrap();
        assert_eq!(seq.coding_sequence(), "ATGGCCTAA");
        assert_eq!(seq.five_prime_utr(), "GGT");
        assert_eq!(seq.three_prime_utr(), "CC");
        assert_eq!(seq.poly_a_tail(), "AAA");
    }

    #[test]
    fn test_amino_acid_keeps_letters() {
        let seq = RawSequence::amino_acid("mk v*").validate().unwrap();
        assert_eq!(seq.coding_sequence(), "MKV*");
        assert_eq!(seq.coding_sequence_type(), SequenceType::AminoAcid);
    }

    #[test]
    fn test_empty_cds_is_rejected() {
        let issues = issues_for(RawSequence::nucleic_acid(" \n"));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].0, "coding_sequence");
        assert_eq!(issues[0].1, "Coding sequence must not be empty.");
    }

    #[test]
    fn test_nucleic_acid_reports_length_and_alphabet_independently() {
        let issues = issues_for(RawSequence::nucleic_acid("ATGX"));
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|(path, _)| path == "coding_sequence"));
    }

    #[test]
    fn test_amino_acid_alphabet() {
        let issues = issues_for(RawSequence::amino_acid("MKBZ"));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].1.contains("ARNDCEQGHILKMFPSTWYV*"));
    }

    #[test]
    fn test_flanking_regions_are_checked() {
        let issues = issues_for(RawSequence::nucleic_acid("ATG").with_utrs("NNN", "ACG"));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].0, "five_prime_utr");
    }

    #[test]
    fn test_lengths() {
        let na = RawSequence::nucleic_acid("ATGGCC")
            .with_utrs("GG", "CCC")
            .with_poly_a_tail("AAAA")
            .validate()
            .unwrap();
        assert_eq!(na.nucleotide_length(false), 6);
        assert_eq!(na.nucleotide_length(true), 15);
        assert_eq!(na.amino_acid_length(), 2);

        let aa = RawSequence::amino_acid("MKV").with_utrs("G", "").validate().unwrap();
        assert_eq!(aa.nucleotide_length(false), 9);
        assert_eq!(aa.nucleotide_length(true), 10);
        assert_eq!(aa.amino_acid_length(), 3);
    }

    #[test]
    fn test_full_sequence_assembly() {
        let seq = RawSequence::nucleic_acid("ATG")
            .with_utrs("GG", "CC")
            .with_poly_a_tail("AA")
            .validate()
            .unwrap();
        assert_eq!(seq.full_sequence("CCC"), "GGCCCCCAA");
    }

    #[tokio::test]
    async fn test_nucleic_acid_does_not_call_convert() {
        let engine = MockEngine::new();
        let seq = RawSequence::nucleic_acid("ATGGCC").validate().unwrap();
        let ctx = RequestContext::anonymous();

        let na = seq.to_nucleic_acid(&engine, &ctx, "homo-sapiens").await.unwrap();
        assert_eq!(na, "ATGGCC");
        assert_eq!(engine.calls(Operation::Convert), 0);
    }

    #[tokio::test]
    async fn test_amino_acid_conversion_is_cached() {
        let engine = MockEngine::new().with_conversion("MK", "ATGAAA");
        let seq = RawSequence::amino_acid("MK").validate().unwrap();
        let ctx = RequestContext::anonymous();

        assert!(!seq.is_resolved());
        let first = seq.to_nucleic_acid(&engine, &ctx, "homo-sapiens").await.unwrap().to_string();
        let clone = seq.clone();
        let second = clone.to_nucleic_acid(&engine, &ctx, "homo-sapiens").await.unwrap();

        assert_eq!(first, "ATGAAA");
        assert_eq!(second, "ATGAAA");
        assert!(seq.is_resolved());
        assert_eq!(engine.calls(Operation::Convert), 1);
    }

    #[tokio::test]
    async fn test_conversion_rejects_invalid_output() {
        let engine = MockEngine::new().with_conversion("MK", "ATGAA");
        let seq = RawSequence::amino_acid("MK").validate().unwrap();
        let result = seq
            .to_nucleic_acid(&engine, &RequestContext::anonymous(), "homo-sapiens")
            .await;
        assert!(matches!(result, Err(ConversionError::InvalidOutput(_))));
    }
}
