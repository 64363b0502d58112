//! In-process engine for testing
//!
//! Produces deterministic results computed from the input sequence, counts
//! every call per operation and can be scripted to fail specific calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::context::RequestContext;
use crate::engine::types::{AnalysisResult, GcWindowStats, MinimumFreeEnergy};
use crate::engine::{
    EngineFailure, OptimizationEngine, OptimizationOutcome, Operation, TransportError,
};
use crate::parameter::OptimizationParameter;

/// Failure injected by a [`MockEngine`] script
///
/// Engine failures are structured Optimize rejections; scripted on Convert or
/// Analyze they surface as [`TransportError::Unavailable`].
#[derive(Debug, Clone, PartialEq)]
pub enum MockFailure {
    Engine(EngineFailure),
    Transport(TransportError),
}

#[derive(Debug, Clone)]
enum Trigger {
    Always,
    Call(usize),
    Sequence(String),
}

#[derive(Debug, Clone)]
struct Script {
    operation: Operation,
    trigger: Trigger,
    failure: MockFailure,
}

/// Scriptable in-process engine
#[derive(Debug, Default)]
pub struct MockEngine {
    conversions: HashMap<String, String>,
    analyses: HashMap<String, AnalysisResult>,
    optimized: Vec<String>,
    scripts: Vec<Script>,
    latency: Option<Duration>,
    convert_calls: AtomicUsize,
    analyze_calls: AtomicUsize,
    optimize_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    users: Mutex<Vec<Option<String>>>,
}

impl MockEngine {
    /// Create a mock with default behavior for every operation
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `nucleic_acid` when converting `amino_acid`
    pub fn with_conversion(mut self, amino_acid: &str, nucleic_acid: &str) -> Self {
        self.conversions
            .insert(amino_acid.to_string(), nucleic_acid.to_string());
        self
    }

    /// Return `analysis` when analyzing exactly `sequence`
    pub fn with_analysis(mut self, sequence: &str, analysis: AnalysisResult) -> Self {
        self.analyses.insert(sequence.to_string(), analysis);
        self
    }

    /// Optimize call `k` returns `sequences[k % len]`; without this, the input is echoed
    pub fn with_optimized_sequences<I, S>(mut self, sequences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optimized = sequences.into_iter().map(Into::into).collect();
        self
    }

    /// Sleep this long inside every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail every call of `operation`
    pub fn fail_always(mut self, operation: Operation, failure: MockFailure) -> Self {
        self.scripts.push(Script {
            operation,
            trigger: Trigger::Always,
            failure,
        });
        self
    }

    /// Fail the `index`-th (0-based) call of `operation`
    pub fn fail_on_call(mut self, operation: Operation, index: usize, failure: MockFailure) -> Self {
        self.scripts.push(Script {
            operation,
            trigger: Trigger::Call(index),
            failure,
        });
        self
    }

    /// Fail calls of `operation` whose input is exactly `sequence`
    pub fn fail_on_sequence(
        mut self,
        operation: Operation,
        sequence: &str,
        failure: MockFailure,
    ) -> Self {
        self.scripts.push(Script {
            operation,
            trigger: Trigger::Sequence(sequence.to_string()),
            failure,
        });
        self
    }

    /// Number of calls made to `operation`
    pub fn calls(&self, operation: Operation) -> usize {
        self.counter(operation).load(Ordering::SeqCst)
    }

    /// Highest number of calls that were in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// User of every call, in arrival order
    pub fn users(&self) -> Vec<Option<String>> {
        self.users
            .lock()
            .map(|users| users.clone())
            .unwrap_or_default()
    }

    fn counter(&self, operation: Operation) -> &AtomicUsize {
        match operation {
            Operation::Convert => &self.convert_calls,
            Operation::Analyze => &self.analyze_calls,
            Operation::Optimize => &self.optimize_calls,
        }
    }

    /// Record the call, apply latency, and return any scripted failure
    async fn enter(
        &self,
        operation: Operation,
        ctx: &RequestContext,
        sequence: &str,
    ) -> (usize, Option<MockFailure>) {
        let index = self.counter(operation).fetch_add(1, Ordering::SeqCst);
        if let Ok(mut users) = self.users.lock() {
            users.push(ctx.user().map(str::to_string));
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failure = self
            .scripts
            .iter()
            .find(|script| {
                script.operation == operation
                    && match &script.trigger {
                        Trigger::Always => true,
                        Trigger::Call(n) => *n == index,
                        Trigger::Sequence(s) => s == sequence,
                    }
            })
            .map(|script| script.failure.clone());

        (index, failure)
    }
}

fn into_transport(operation: Operation, failure: MockFailure) -> TransportError {
    match failure {
        MockFailure::Transport(err) => err,
        MockFailure::Engine(failure) => TransportError::Unavailable {
            operation,
            msg: failure.to_string(),
        },
    }
}

#[async_trait::async_trait]
impl OptimizationEngine for MockEngine {
    async fn convert(
        &self,
        ctx: &RequestContext,
        sequence: &str,
        _organism: &str,
    ) -> Result<String, TransportError> {
        let (_, failure) = self.enter(Operation::Convert, ctx, sequence).await;
        if let Some(failure) = failure {
            return Err(into_transport(Operation::Convert, failure));
        }
        match self.conversions.get(sequence) {
            Some(converted) => Ok(converted.clone()),
            None => back_translate(sequence),
        }
    }

    async fn analyze(
        &self,
        ctx: &RequestContext,
        sequence: &str,
        _organism: &str,
    ) -> Result<AnalysisResult, TransportError> {
        let (_, failure) = self.enter(Operation::Analyze, ctx, sequence).await;
        if let Some(failure) = failure {
            return Err(into_transport(Operation::Analyze, failure));
        }
        Ok(self
            .analyses
            .get(sequence)
            .cloned()
            .unwrap_or_else(|| synthetic_analysis(sequence)))
    }

    async fn optimize(
        &self,
        ctx: &RequestContext,
        sequence: &str,
        parameters: &[OptimizationParameter],
    ) -> Result<OptimizationOutcome, TransportError> {
        let (index, failure) = self.enter(Operation::Optimize, ctx, sequence).await;
        match failure {
            Some(MockFailure::Engine(failure)) => return Ok(OptimizationOutcome::Failure(failure)),
            Some(MockFailure::Transport(err)) => return Err(err),
            None => {}
        }

        let optimized = if self.optimized.is_empty() {
            sequence.to_string()
        } else {
            self.optimized[index % self.optimized.len()].clone()
        };
        let constraint_log = parameters
            .iter()
            .map(|p| {
                format!(
                    "EnforceTranslation[{}-{}] passed",
                    p.resolved_start(),
                    p.resolved_end(sequence.len())
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let objective_log = format!("MaximizeCAI: score {:.2}", codon_gc3_ratio(&optimized));

        Ok(OptimizationOutcome::success(
            optimized,
            constraint_log,
            objective_log,
        ))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// One fixed codon per residue
fn codon_for(residue: char) -> Option<&'static str> {
    let codon = match residue {
        'A' => "GCC",
        'R' => "CGC",
        'N' => "AAC",
        'D' => "GAC",
        'C' => "TGC",
        'E' => "GAG",
        'Q' => "CAG",
        'G' => "GGC",
        'H' => "CAC",
        'I' => "ATC",
        'L' => "CTG",
        'K' => "AAG",
        'M' => "ATG",
        'F' => "TTC",
        'P' => "CCC",
        'S' => "AGC",
        'T' => "ACC",
        'W' => "TGG",
        'Y' => "TAC",
        'V' => "GTG",
        '*' => "TGA",
        _ => return None,
    };
    Some(codon)
}

fn back_translate(amino_acids: &str) -> Result<String, TransportError> {
    amino_acids
        .chars()
        .map(|residue| {
            codon_for(residue).ok_or_else(|| {
                TransportError::malformed(
                    Operation::Convert,
                    format!("unknown residue '{}'", residue),
                )
            })
        })
        .collect()
}

/// Fraction of codons ending in G or C
fn codon_gc3_ratio(sequence: &str) -> f64 {
    let codons = sequence.len() / 3;
    if codons == 0 {
        return 0.0;
    }
    let gc3 = sequence
        .as_bytes()
        .chunks_exact(3)
        .filter(|codon| matches!(codon[2], b'G' | b'C'))
        .count();
    gc3 as f64 / codons as f64
}

/// Statistics derived from base composition alone
pub fn synthetic_analysis(sequence: &str) -> AnalysisResult {
    let bytes = sequence.as_bytes();
    let length = bytes.len();
    let count = |base: u8| bytes.iter().filter(|&&b| b == base).count() as f64;
    let ratio = |n: f64| if length == 0 { 0.0 } else { n / length as f64 };
    let (a, c, g, t) = (count(b'A'), count(b'C'), count(b'G'), count(b'T'));

    let is_coding = length > 0 && length % 3 == 0;
    let uridine_depletion = is_coding.then(|| {
        let codons = bytes.chunks_exact(3);
        let total = codons.len() as f64;
        bytes
            .chunks_exact(3)
            .filter(|codon| codon[2] == b'T')
            .count() as f64
            / total
    });

    AnalysisResult {
        a_ratio: ratio(a),
        c_ratio: ratio(c),
        g_ratio: ratio(g),
        t_ratio: ratio(t),
        at_ratio: ratio(a + t),
        ga_ratio: ratio(g + a),
        gc_ratio: ratio(g + c),
        uridine_depletion,
        codon_adaptation_index: is_coding.then(|| codon_gc3_ratio(sequence)),
        trna_adaptation_index: None,
        minimum_free_energy: MinimumFreeEnergy {
            structure: ".".repeat(length),
            energy: -0.5 * (g + c),
            paired_nt_ratio: 0.0,
        },
        gc_ratio_window: gc_window(bytes, 100),
        debug: None,
    }
}

fn gc_window(bytes: &[u8], window_size: usize) -> GcWindowStats {
    let window = window_size.min(bytes.len());
    if window == 0 {
        return GcWindowStats {
            window_size: window_size as u32,
            min_ratio: 0.0,
            min_start: 0,
            max_ratio: 0.0,
            max_start: 0,
        };
    }

    let is_gc = |b: u8| matches!(b, b'G' | b'C') as usize;
    let mut gc: usize = bytes[..window].iter().map(|&b| is_gc(b)).sum();
    let (mut min, mut min_start, mut max, mut max_start) = (gc, 0, gc, 0);
    for start in 1..=(bytes.len() - window) {
        gc = gc + is_gc(bytes[start + window - 1]) - is_gc(bytes[start - 1]);
        if gc < min {
            min = gc;
            min_start = start;
        }
        if gc > max {
            max = gc;
            max_start = start;
        }
    }

    GcWindowStats {
        window_size: window_size as u32,
        min_ratio: min as f64 / window as f64,
        min_start: min_start as u64,
        max_ratio: max as f64 / window as f64,
        max_start: max_start as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_conversion_back_translates() {
        let engine = MockEngine::new();
        let ctx = RequestContext::anonymous();
        assert_eq!(engine.convert(&ctx, "MK*", "homo-sapiens").await.unwrap(), "ATGAAGTGA");
        assert!(engine.convert(&ctx, "MB", "homo-sapiens").await.is_err());
        assert_eq!(engine.calls(Operation::Convert), 2);
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let engine = MockEngine::new()
            .fail_on_call(
                Operation::Optimize,
                1,
                MockFailure::Engine(EngineFailure::new("no solution")),
            )
            .fail_on_sequence(
                Operation::Analyze,
                "GGG",
                MockFailure::Transport(TransportError::malformed(Operation::Analyze, "bad")),
            );
        let ctx = RequestContext::for_user("ana");

        let first = engine.optimize(&ctx, "ATG", &[]).await.unwrap();
        assert!(first.is_success());
        let second = engine.optimize(&ctx, "ATG", &[]).await.unwrap();
        assert_eq!(second.failure().unwrap().message, "no solution");

        assert!(engine.analyze(&ctx, "GGG", "homo-sapiens").await.is_err());
        assert!(engine.analyze(&ctx, "GGA", "homo-sapiens").await.is_ok());
        assert_eq!(engine.users(), vec![Some("ana".to_string()); 4]);
    }

    #[tokio::test]
    async fn test_optimized_sequences_cycle() {
        let engine = MockEngine::new().with_optimized_sequences(["AAA", "CCC"]);
        let ctx = RequestContext::anonymous();
        let mut outputs = Vec::new();
        for _ in 0..3 {
            let outcome = engine.optimize(&ctx, "GGG", &[]).await.unwrap();
            outputs.push(outcome.sequence().unwrap().to_string());
        }
        assert_eq!(outputs, vec!["AAA", "CCC", "AAA"]);
    }

    #[test]
    fn test_synthetic_analysis() {
        let analysis = synthetic_analysis("ATGGCC");
        assert!((analysis.gc_ratio - 4.0 / 6.0).abs() < 1e-9);
        assert!((analysis.at_ratio - 2.0 / 6.0).abs() < 1e-9);
        assert_eq!(analysis.codon_adaptation_index, Some(1.0));
        assert_eq!(analysis.uridine_depletion, Some(0.0));
        assert_eq!(analysis.minimum_free_energy.structure, "......");

        let utr = synthetic_analysis("GGAA");
        assert_eq!(utr.codon_adaptation_index, None);
    }

    #[test]
    fn test_gc_window_extremes() {
        let stats = gc_window(b"AAAAGGGG", 4);
        assert_eq!(stats.min_start, 0);
        assert_eq!(stats.min_ratio, 0.0);
        assert_eq!(stats.max_start, 4);
        assert_eq!(stats.max_ratio, 1.0);
    }
}
