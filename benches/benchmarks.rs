//! Performance benchmarks for ferro-mrna
//!
//! Run with: cargo bench
//! Run specific benchmark: cargo bench -- validation

use std::sync::Arc;

use chrono::{FixedOffset, TimeZone};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ferro_mrna::{
    MockEngine, OptimizationRequest, Orchestrator, RawOptimizationParameter, RawSequence,
    ReportGenerator, RequestContext,
};

/// A coding sequence of `codons` codons with an ATG start
fn coding_sequence(codons: usize) -> String {
    let body = ["GCC", "AAG", "CTG", "GAG", "TTC", "AGC"];
    std::iter::once("ATG")
        .chain(body.iter().copied().cycle().take(codons.saturating_sub(1)))
        .collect()
}

// =============================================================================
// Validation benchmarks
// =============================================================================

/// Benchmark sequence validation by CDS length
fn bench_sequence_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation");

    for codons in [100, 1_000, 10_000] {
        let raw = RawSequence::nucleic_acid(coding_sequence(codons).to_lowercase())
            .with_utrs("GGGAAAUAAGAGAGAAAAGAAGAGUAAGAAGAAAUAUAAGAGCCACC", "UGAUAAUAGGCUGGAGCCUCGGUGG");
        group.throughput(Throughput::Bytes(raw.coding_sequence.len() as u64));
        group.bench_with_input(BenchmarkId::new("sequence", codons), &raw, |b, raw| {
            b.iter(|| black_box(raw).validate())
        });
    }

    group.finish();
}

/// Benchmark parameter validation for many regions
fn bench_parameter_validation(c: &mut Criterion) {
    let regions: Vec<RawOptimizationParameter> = (0..100)
        .map(|i| RawOptimizationParameter::region(i * 30 + 1, i * 30 + 30))
        .collect();
    let sequence = RawSequence::nucleic_acid(coding_sequence(1_000));

    c.bench_function("validation/request_100_regions", |b| {
        b.iter(|| OptimizationRequest::validate(black_box(&sequence), black_box(&regions)))
    });
}

// =============================================================================
// Orchestration benchmarks
// =============================================================================

/// Benchmark a full run against the in-process engine
fn bench_orchestration(c: &mut Criterion) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(_) => return,
    };
    let request = OptimizationRequest::validate(
        &RawSequence::nucleic_acid(coding_sequence(300)).with_utrs("GGGAAA", "UGAUAA"),
        &[RawOptimizationParameter::default()],
    )
    .unwrap();

    let mut group = c.benchmark_group("orchestration");
    for variants in [1, 5, 10] {
        group.bench_with_input(BenchmarkId::new("variants", variants), &variants, |b, &n| {
            b.iter(|| {
                runtime.block_on(async {
                    let orchestrator = Orchestrator::new(Arc::new(MockEngine::new()));
                    orchestrator
                        .run(&RequestContext::anonymous(), &request, n)
                        .await
                        .unwrap()
                })
            })
        });
    }
    group.finish();
}

// =============================================================================
// Report benchmarks
// =============================================================================

/// Benchmark report rendering for ten variants
fn bench_report(c: &mut Criterion) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(_) => return,
    };
    let request = OptimizationRequest::validate(
        &RawSequence::nucleic_acid(coding_sequence(1_000)).with_utrs("GGGAAA", "UGAUAA"),
        &[RawOptimizationParameter::default()],
    )
    .unwrap();
    let result = runtime
        .block_on(
            Orchestrator::new(Arc::new(MockEngine::new())).run(
                &RequestContext::anonymous(),
                &request,
                10,
            ),
        )
        .unwrap();
    let generated_at = FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
        .unwrap();
    let generator = ReportGenerator::default();

    c.bench_function("report/10_variants", |b| {
        b.iter(|| {
            generator.generate(
                "bench",
                black_box(request.sequence()),
                request.parameters(),
                black_box(&result),
                &generated_at,
            )
        })
    });
}

criterion_group!(
    benches,
    bench_sequence_validation,
    bench_parameter_validation,
    bench_orchestration,
    bench_report,
);

criterion_main!(benches);
