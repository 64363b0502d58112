//! Report generation tests
//!
//! The report is compared line by line against a hand-written golden copy.

use std::sync::Arc;

use chrono::{FixedOffset, TimeZone};
use ferro_mrna::engine::{
    AnalysisResult, EngineFailure, GcWindowStats, MinimumFreeEnergy, OptimizationOutcome,
};
use ferro_mrna::orchestrate::{AggregatedResult, BaselineAnalyses, VariantResult};
use ferro_mrna::{
    MockEngine, OptimizationRequest, Orchestrator, RawOptimizationParameter, RawSequence,
    ReportGenerator, RequestContext,
};

fn analysis(gc: f64, cai: Option<f64>, energy: f64, structure: &str, paired: f64) -> AnalysisResult {
    AnalysisResult {
        a_ratio: 0.25,
        c_ratio: 0.25,
        g_ratio: 0.25,
        t_ratio: 0.25,
        at_ratio: 0.5,
        ga_ratio: 0.5,
        gc_ratio: gc,
        uridine_depletion: Some(0.1),
        codon_adaptation_index: cai,
        trna_adaptation_index: None,
        minimum_free_energy: MinimumFreeEnergy {
            structure: structure.to_string(),
            energy,
            paired_nt_ratio: paired,
        },
        gc_ratio_window: GcWindowStats {
            window_size: 100,
            min_ratio: 0.3,
            min_start: 0,
            max_ratio: 0.6,
            max_start: 3,
        },
        debug: None,
    }
}

fn golden_request() -> OptimizationRequest {
    OptimizationRequest::validate(
        &RawSequence::nucleic_acid("ATGAAATAA")
            .with_utrs("GGG", "CCC")
            .with_poly_a_tail("AAAA"),
        &[RawOptimizationParameter::default()],
    )
    .unwrap()
}

fn golden_result() -> AggregatedResult {
    AggregatedResult {
        baseline: BaselineAnalyses {
            cds: analysis(0.5, Some(0.8), -1.2, "(((...)))", 0.67),
            five_prime_utr: Some(analysis(0.0, None, -0.5, "...", 0.0)),
            three_prime_utr: None,
            full_sequence: analysis(0.55, Some(0.8), -3.456, "((.))", 0.4),
        },
        variants: vec![
            VariantResult {
                outcome: OptimizationOutcome::success(
                    "ATGAAGTAA",
                    "EnforceTranslation[1-9] passed\n",
                    "MaximizeCAI: score 0.67",
                ),
                cds_analysis: Some(analysis(0.6, Some(0.9), -2.0, "(((...)))", 0.67)),
                full_sequence_analysis: Some(analysis(0.61, None, -4.0, "(...)", 0.5)),
            },
            VariantResult {
                outcome: OptimizationOutcome::Failure(
                    EngineFailure::new("No solution").with_constraint("AvoidPattern"),
                ),
                cds_analysis: None,
                full_sequence_analysis: None,
            },
        ],
    }
}

fn generated_at() -> chrono::DateTime<FixedOffset> {
    FixedOffset::east_opt(10 * 3600)
        .unwrap()
        .with_ymd_and_hms(2026, 10, 18, 14, 3, 9)
        .unwrap()
}

fn render(request: &OptimizationRequest, result: &AggregatedResult) -> String {
    ReportGenerator::new("mRNArchitect", "1.2.3").generate(
        "golden",
        request.sequence(),
        request.parameters(),
        result,
        &generated_at(),
    )
}

#[test]
fn test_golden_report() {
    let expected = [
        "---mRNArchitect",
        "Version\t\t1.2.3",
        "Date\t\t18th Oct 2026",
        "Time\t\t14:03:09 +10",
        "Sequence name\tgolden",
        "",
        "---Input Sequence",
        "Full Length (nt)\t19",
        "CDS Length (aa)\t\t3",
        "CDS Length (nt)\t\t9",
        "CDS\t\t\tATGAAATAA",
        "5' UTR\t\t\tGGG",
        "3' UTR\t\t\tCCC",
        "Poly(A) tail\t\tAAAA",
        "",
        "---Optimisation parameters:",
        "",
        "---Parameter region [1-9]",
        "Start coordinate\t\t\t1",
        "End coordinate\t\t\t\t9",
        "Don't optimise region\t\t\tfalse",
        "Organism\t\t\t\thomo-sapiens",
        "Avoid repeat length\t\t\t10",
        "Enable uridine depletion\t\tfalse",
        "Avoid ribosome slip\t\t\tfalse",
        "Avoid manufacture restriction sites\tfalse",
        "Avoid microRNA seed sites\t\tfalse",
        "GC content global minimum\t\t0.4",
        "GC content global maximum\t\t0.7",
        "GC content window minimum\t\t0.4",
        "GC content window maximum\t\t0.7",
        "GC content window size\t\t\t100",
        "Avoid cut sites\t\t\t\t",
        "Avoid sequences\t\t\t\t",
        "Avoid poly(U)\t\t\t\t9",
        "Avoid poly(A)\t\t\t\t9",
        "Avoid poly(C)\t\t\t\t6",
        "Avoid poly(G)\t\t\t\t6",
        "Hairpin stem size\t\t\t10",
        "Hairpin window\t\t\t\t60",
        "",
        "",
        "---Optimised Sequence #1",
        "",
        "CDS:\t\t\tATGAAGTAA",
        "",
        "Full-length mRNA:\tGGGATGAAGTAACCCAAAA",
        "",
        "---Results",
        "Metric\t\t\tInput\tOptimised",
        "A ratio\t\t\t0.25\t0.25",
        "T/U ratio\t\t0.25\t0.25",
        "G ratio\t\t\t0.25\t0.25",
        "C ratio\t\t\t0.25\t0.25",
        "AT ratio\t\t0.50\t0.50",
        "GA ratio\t\t0.50\t0.50",
        "GC ratio\t\t0.50\t0.60",
        "Uridine depletion\t0.10\t0.10",
        "CAI\t\t\t0.80\t0.90",
        "tAI\t\t\t-\t-",
        "GC window minimum\t0.30\t0.30",
        "GC window maximum\t0.60\t0.60",
        "CDS MFE (kcal/mol)\t-1.20\t-2.00",
        "5' UTR MFE (kcal/mol)\t-0.50\t-0.50",
        "3' UTR MFE (kcal/mol)\t-\t-",
        "Total MFE (kcal/mol)\t-3.46\t-4.00",
        "Total Structure\t\t((.))\t(...)",
        "Total Paired nt Ratio\t0.40\t0.50",
        "",
        "---Logs",
        "EnforceTranslation[1-9] passed",
        "MaximizeCAI: score 0.67",
        "",
        "---Optimised Sequence #2",
        "",
        "Optimisation failed:\tNo solution",
        "Constraint:\t\tAvoidPattern",
        "",
    ]
    .join("\n");

    let report = render(&golden_request(), &golden_result());
    for (line, (actual, wanted)) in report.lines().zip(expected.lines()).enumerate() {
        assert_eq!(actual, wanted, "line {} differs", line + 1);
    }
    assert_eq!(report, expected);
}

#[test]
fn test_report_is_deterministic() {
    let request = golden_request();
    let result = golden_result();
    assert_eq!(render(&request, &result), render(&request, &result));
}

#[test]
fn test_enforced_region_omits_knobs() {
    let request = OptimizationRequest::validate(
        &RawSequence::nucleic_acid("ATGAAATAA"),
        &[
            RawOptimizationParameter {
                enforce_sequence: true,
                ..RawOptimizationParameter::region(1, 3)
            },
            RawOptimizationParameter::region(4, 9),
        ],
    )
    .unwrap();
    let report = render(&request, &golden_result());
    assert!(report.contains(
        "---Parameter region [1-3]\nStart coordinate\t\t\t1\nEnd coordinate\t\t\t\t3\nDon't optimise region\t\t\ttrue\n\n---Parameter region [4-9]"
    ));
    assert_eq!(report.matches("Organism\t\t\t\t").count(), 1);
}

#[tokio::test]
async fn test_report_from_orchestrated_run() {
    let engine = Arc::new(MockEngine::new().with_optimized_sequences(["ATGAAGTAA"]));
    let orchestrator = Orchestrator::new(engine);
    let request = golden_request();
    let result = orchestrator
        .run(&RequestContext::anonymous(), &request, 2)
        .await
        .unwrap();

    let report = render(&request, &result);
    assert_eq!(report.matches("---Optimised Sequence #").count(), 2);
    assert!(report.contains("Full-length mRNA:\tGGGATGAAGTAACCCAAAA"));
    assert!(report.contains("EnforceTranslation[1-9] passed"));
    assert!(report.ends_with('\n'));
}
