//! Plain-text report of an optimization run
//!
//! The report is a pure function of its inputs and the timestamp passed in,
//! so identical inputs produce byte-identical text. Lines are separated by
//! `\n`; columns are tab-aligned.
//!
//! Layout:
//! - header: tool, version, date, time, sequence name
//! - input sequence: lengths, CDS, UTRs, poly(A) tail
//! - one block per parameter region
//! - one block per optimized variant: sequences, metric table, engine logs

use chrono::{DateTime, Datelike, FixedOffset, SecondsFormat, Utc};

use crate::config::ReportConfig;
use crate::engine::{AnalysisResult, OptimizationOutcome};
use crate::orchestrate::{AggregatedResult, VariantResult};
use crate::parameter::OptimizationParameter;
use crate::sequence::Sequence;

/// Renders reports with a fixed tool name and version
#[derive(Debug, Clone, PartialEq)]
pub struct ReportGenerator {
    tool_name: String,
    version: String,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::from_config(&ReportConfig::default())
    }
}

impl ReportGenerator {
    pub fn new(tool_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            version: version.into(),
        }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(&config.tool_name, &config.version)
    }

    /// Render the report for one run
    pub fn generate(
        &self,
        sequence_name: &str,
        sequence: &Sequence,
        parameters: &[OptimizationParameter],
        result: &AggregatedResult,
        generated_at: &DateTime<FixedOffset>,
    ) -> String {
        let cds_length = sequence.nucleotide_length(false);

        let mut lines = vec![
            format!("---{}", self.tool_name),
            format!("Version\t\t{}", self.version),
            format!("Date\t\t{}", format_date(generated_at)),
            format!("Time\t\t{}", format_time(generated_at)),
            format!("Sequence name\t{}", sequence_name),
            String::new(),
            "---Input Sequence".to_string(),
            format!("Full Length (nt)\t{}", sequence.nucleotide_length(true)),
            format!("CDS Length (aa)\t\t{}", sequence.amino_acid_length()),
            format!("CDS Length (nt)\t\t{}", cds_length),
            format!("CDS\t\t\t{}", sequence.coding_sequence()),
            format!("5' UTR\t\t\t{}", sequence.five_prime_utr()),
            format!("3' UTR\t\t\t{}", sequence.three_prime_utr()),
            format!("Poly(A) tail\t\t{}", sequence.poly_a_tail()),
            String::new(),
            "---Optimisation parameters:".to_string(),
        ];

        for parameter in parameters {
            lines.push(String::new());
            lines.extend(parameter_block(parameter, cds_length));
        }

        lines.push(String::new());
        for (index, variant) in result.variants.iter().enumerate() {
            lines.push(String::new());
            lines.extend(variant_block(index, sequence, result, variant));
        }
        lines.push(String::new());

        lines.join("\n")
    }

    /// Download name for a report generated at `timestamp`
    pub fn file_name(&self, timestamp: &DateTime<Utc>) -> String {
        format!(
            "{}-report-{}.txt",
            self.tool_name,
            timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

/// Render with the default tool name and version
pub fn generate_report(
    sequence_name: &str,
    sequence: &Sequence,
    parameters: &[OptimizationParameter],
    result: &AggregatedResult,
    generated_at: &DateTime<FixedOffset>,
) -> String {
    ReportGenerator::default().generate(sequence_name, sequence, parameters, result, generated_at)
}

/// `mRNArchitect-report-<RFC 3339 UTC>.txt`
pub fn report_file_name(timestamp: &DateTime<Utc>) -> String {
    ReportGenerator::default().file_name(timestamp)
}

fn parameter_block(parameter: &OptimizationParameter, cds_length: usize) -> Vec<String> {
    let mut block = vec![
        format!("---{}", parameter.title(cds_length)),
        format!("Start coordinate\t\t\t{}", parameter.resolved_start()),
        format!("End coordinate\t\t\t\t{}", parameter.resolved_end(cds_length)),
        format!("Don't optimise region\t\t\t{}", parameter.enforce_sequence),
    ];
    if parameter.enforce_sequence {
        return block;
    }

    block.extend([
        format!("Organism\t\t\t\t{}", parameter.organism),
        format!("Avoid repeat length\t\t\t{}", parameter.avoid_repeat_length),
        format!(
            "Enable uridine depletion\t\t{}",
            parameter.enable_uridine_depletion
        ),
        format!("Avoid ribosome slip\t\t\t{}", parameter.avoid_ribosome_slip),
        format!(
            "Avoid manufacture restriction sites\t{}",
            parameter.avoid_manufacture_restriction_sites
        ),
        format!(
            "Avoid microRNA seed sites\t\t{}",
            parameter.avoid_micro_rna_seed_sites
        ),
        format!(
            "GC content global minimum\t\t{}",
            parameter.gc_content_global_min
        ),
        format!(
            "GC content global maximum\t\t{}",
            parameter.gc_content_global_max
        ),
        format!(
            "GC content window minimum\t\t{}",
            parameter.gc_content_window_min
        ),
        format!(
            "GC content window maximum\t\t{}",
            parameter.gc_content_window_max
        ),
        format!(
            "GC content window size\t\t\t{}",
            parameter.gc_content_window_size
        ),
        format!(
            "Avoid cut sites\t\t\t\t{}",
            parameter.avoid_restriction_sites.join(",")
        ),
        format!(
            "Avoid sequences\t\t\t\t{}",
            parameter.avoid_sequences.join(",")
        ),
        format!("Avoid poly(U)\t\t\t\t{}", parameter.avoid_poly_t),
        format!("Avoid poly(A)\t\t\t\t{}", parameter.avoid_poly_a),
        format!("Avoid poly(C)\t\t\t\t{}", parameter.avoid_poly_c),
        format!("Avoid poly(G)\t\t\t\t{}", parameter.avoid_poly_g),
        format!("Hairpin stem size\t\t\t{}", parameter.hairpin_stem_size),
        format!("Hairpin window\t\t\t\t{}", parameter.hairpin_window),
    ]);
    block
}

fn variant_block(
    index: usize,
    sequence: &Sequence,
    result: &AggregatedResult,
    variant: &VariantResult,
) -> Vec<String> {
    let mut block = vec![format!("---Optimised Sequence #{}", index + 1), String::new()];

    let (optimized, constraint_log, objective_log) = match &variant.outcome {
        OptimizationOutcome::Success {
            optimized_nucleic_acid_sequence,
            constraint_log,
            objective_log,
        } => (optimized_nucleic_acid_sequence, constraint_log, objective_log),
        OptimizationOutcome::Failure(failure) => {
            block.push(format!("Optimisation failed:\t{}", failure.message));
            if let Some(location) = &failure.location {
                block.push(format!("Location:\t\t{}", location));
            }
            if let Some(constraint) = &failure.constraint {
                block.push(format!("Constraint:\t\t{}", constraint));
            }
            return block;
        }
    };

    block.extend([
        format!("CDS:\t\t\t{}", optimized),
        String::new(),
        format!("Full-length mRNA:\t{}", sequence.full_sequence(optimized)),
        String::new(),
    ]);
    block.extend(metric_table(result, variant));
    block.push(String::new());
    block.push("---Logs".to_string());
    block.extend(constraint_log.trim().split('\n').map(str::to_string));
    block.extend(objective_log.trim().split('\n').map(str::to_string));
    block
}

fn metric_table(result: &AggregatedResult, variant: &VariantResult) -> Vec<String> {
    let input = &result.baseline.cds;
    let output = variant.cds_analysis.as_ref();
    let input_full = &result.baseline.full_sequence;
    let output_full = variant.full_sequence_analysis.as_ref();

    let ratio = |label: &str, metric: fn(&AnalysisResult) -> f64| {
        row(label, Some(metric(input)), output.map(metric))
    };
    let optional = |label: &str, metric: fn(&AnalysisResult) -> Option<f64>| {
        row(label, metric(input), output.and_then(metric))
    };
    let utr_energy = |label: &str, analysis: Option<&AnalysisResult>| {
        let energy = analysis.map(|a| a.minimum_free_energy.energy);
        row(label, energy, energy)
    };

    vec![
        "---Results".to_string(),
        "Metric\t\t\tInput\tOptimised".to_string(),
        ratio("A ratio\t\t\t", |a| a.a_ratio),
        ratio("T/U ratio\t\t", |a| a.t_ratio),
        ratio("G ratio\t\t\t", |a| a.g_ratio),
        ratio("C ratio\t\t\t", |a| a.c_ratio),
        ratio("AT ratio\t\t", |a| a.at_ratio),
        ratio("GA ratio\t\t", |a| a.ga_ratio),
        ratio("GC ratio\t\t", |a| a.gc_ratio),
        optional("Uridine depletion\t", |a| a.uridine_depletion),
        optional("CAI\t\t\t", |a| a.codon_adaptation_index),
        optional("tAI\t\t\t", |a| a.trna_adaptation_index),
        ratio("GC window minimum\t", |a| a.gc_ratio_window.min_ratio),
        ratio("GC window maximum\t", |a| a.gc_ratio_window.max_ratio),
        ratio("CDS MFE (kcal/mol)\t", |a| a.minimum_free_energy.energy),
        utr_energy(
            "5' UTR MFE (kcal/mol)\t",
            result.baseline.five_prime_utr.as_ref(),
        ),
        utr_energy(
            "3' UTR MFE (kcal/mol)\t",
            result.baseline.three_prime_utr.as_ref(),
        ),
        row(
            "Total MFE (kcal/mol)\t",
            Some(input_full.minimum_free_energy.energy),
            output_full.map(|a| a.minimum_free_energy.energy),
        ),
        format!(
            "Total Structure\t\t{}\t{}",
            input_full.minimum_free_energy.structure,
            output_full
                .map(|a| a.minimum_free_energy.structure.as_str())
                .unwrap_or("-")
        ),
        row(
            "Total Paired nt Ratio\t",
            Some(input_full.minimum_free_energy.paired_nt_ratio),
            output_full.map(|a| a.minimum_free_energy.paired_nt_ratio),
        ),
    ]
}

fn row(label: &str, input: Option<f64>, output: Option<f64>) -> String {
    format!("{}{}\t{}", label, fixed(input), fixed(output))
}

/// Two decimals; missing values render as `-`
fn fixed(value: Option<f64>) -> String {
    match value {
        // -0.0 would otherwise print as "-0.00"
        Some(v) if v == 0.0 => "0.00".to_string(),
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

/// `18th Oct 2026`
fn format_date(timestamp: &DateTime<FixedOffset>) -> String {
    let day = timestamp.day();
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{} {}", day, suffix, timestamp.format("%b %Y"))
}

/// `HH:MM:SS` plus the UTC offset as `+hh` or `+hhmm`
fn format_time(timestamp: &DateTime<FixedOffset>) -> String {
    let offset = timestamp.offset().local_minus_utc();
    let sign = if offset < 0 { '-' } else { '+' };
    let hours = offset.abs() / 3600;
    let minutes = (offset.abs() % 3600) / 60;
    let offset = if minutes == 0 {
        format!("{}{:02}", sign, hours)
    } else {
        format!("{}{:02}{:02}", sign, hours, minutes)
    };
    format!("{} {}", timestamp.format("%H:%M:%S"), offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(offset_seconds: i32, y: i32, m: u32, d: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(offset_seconds)
            .unwrap()
            .with_ymd_and_hms(y, m, d, 9, 5, 7)
            .unwrap()
    }

    #[test]
    fn test_date_ordinals() {
        assert_eq!(format_date(&at(0, 2026, 10, 1)), "1st Oct 2026");
        assert_eq!(format_date(&at(0, 2026, 10, 2)), "2nd Oct 2026");
        assert_eq!(format_date(&at(0, 2026, 10, 3)), "3rd Oct 2026");
        assert_eq!(format_date(&at(0, 2026, 10, 11)), "11th Oct 2026");
        assert_eq!(format_date(&at(0, 2026, 10, 12)), "12th Oct 2026");
        assert_eq!(format_date(&at(0, 2026, 10, 18)), "18th Oct 2026");
        assert_eq!(format_date(&at(0, 2026, 10, 22)), "22nd Oct 2026");
        assert_eq!(format_date(&at(0, 2026, 10, 31)), "31st Oct 2026");
    }

    #[test]
    fn test_time_offsets() {
        assert_eq!(format_time(&at(0, 2026, 10, 18)), "09:05:07 +00");
        assert_eq!(format_time(&at(5 * 3600 + 1800, 2026, 10, 18)), "09:05:07 +0530");
        assert_eq!(format_time(&at(-8 * 3600, 2026, 10, 18)), "09:05:07 -08");
    }

    #[test]
    fn test_fixed() {
        assert_eq!(fixed(Some(0.456)), "0.46");
        assert_eq!(fixed(Some(-0.0)), "0.00");
        assert_eq!(fixed(Some(-12.3)), "-12.30");
        assert_eq!(fixed(None), "-");
    }

    #[test]
    fn test_file_name() {
        let timestamp = Utc.with_ymd_and_hms(2026, 10, 18, 9, 5, 7).unwrap();
        assert_eq!(
            report_file_name(&timestamp),
            "mRNArchitect-report-2026-10-18T09:05:07.000Z.txt"
        );
    }

    #[test]
    fn test_enforced_region_lists_only_coordinates() {
        let parameter = crate::parameter::RawOptimizationParameter {
            enforce_sequence: true,
            ..crate::parameter::RawOptimizationParameter::region(1, 6)
        }
        .validate()
        .unwrap();
        let block = parameter_block(&parameter, 9);
        assert_eq!(
            block,
            vec![
                "---Parameter region [1-6]",
                "Start coordinate\t\t\t1",
                "End coordinate\t\t\t\t6",
                "Don't optimise region\t\t\ttrue",
            ]
        );
    }
}
