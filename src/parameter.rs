//! Per-region optimization parameters
//!
//! Each region is validated on its own. Regions may overlap or leave gaps;
//! no cross-region coverage check is made.
//!
//! # Codon frame alignment
//!
//! The engine substitutes whole codons, so a region boundary that does not
//! sit on a codon edge would split a codon between the edited and unedited
//! parts of the sequence. A set region therefore requires
//! `(start - 1) % 3 == 0` and `end % 3 == 0` (1-based, inclusive).

use serde::{Deserialize, Serialize};

use crate::sequence::{is_nucleic_acid, normalize_nucleic_acid};
use crate::validation::{ValidationCollector, ValidationErrors, REQUIRED_MESSAGE};

/// Default codon usage table identifier
pub const DEFAULT_ORGANISM: &str = "homo-sapiens";

/// Message raised against `parameters` when no region is given
pub const EMPTY_PARAMETERS_MESSAGE: &str = "At least one optimization parameter region is required.";

/// Unvalidated region parameters, as submitted
///
/// Absent fields take the defaults of [`RawOptimizationParameter::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOptimizationParameter {
    pub start_coordinate: Option<i64>,
    pub end_coordinate: Option<i64>,
    pub enforce_sequence: bool,
    #[serde(alias = "codon_usage_table")]
    pub organism: String,
    pub optimize_cai: bool,
    pub optimize_tai: Option<f64>,
    pub avoid_repeat_length: i64,
    pub enable_uridine_depletion: bool,
    pub avoid_ribosome_slip: bool,
    pub avoid_manufacture_restriction_sites: bool,
    pub avoid_micro_rna_seed_sites: bool,
    pub gc_content_global_min: f64,
    pub gc_content_global_max: f64,
    pub gc_content_window_min: f64,
    pub gc_content_window_max: f64,
    pub gc_content_window_size: i64,
    pub avoid_restriction_sites: Vec<String>,
    pub avoid_sequences: Vec<String>,
    pub avoid_poly_t: i64,
    pub avoid_poly_a: i64,
    pub avoid_poly_c: i64,
    pub avoid_poly_g: i64,
    pub hairpin_stem_size: i64,
    pub hairpin_window: i64,
}

impl Default for RawOptimizationParameter {
    fn default() -> Self {
        Self {
            start_coordinate: None,
            end_coordinate: None,
            enforce_sequence: false,
            organism: DEFAULT_ORGANISM.to_string(),
            optimize_cai: true,
            optimize_tai: None,
            avoid_repeat_length: 10,
            enable_uridine_depletion: false,
            avoid_ribosome_slip: false,
            avoid_manufacture_restriction_sites: false,
            avoid_micro_rna_seed_sites: false,
            gc_content_global_min: 0.4,
            gc_content_global_max: 0.7,
            gc_content_window_min: 0.4,
            gc_content_window_max: 0.7,
            gc_content_window_size: 100,
            avoid_restriction_sites: Vec::new(),
            avoid_sequences: Vec::new(),
            avoid_poly_t: 9,
            avoid_poly_a: 9,
            avoid_poly_c: 6,
            avoid_poly_g: 6,
            hairpin_stem_size: 10,
            hairpin_window: 60,
        }
    }
}

impl RawOptimizationParameter {
    /// Default parameters restricted to a region
    pub fn region(start: i64, end: i64) -> Self {
        Self {
            start_coordinate: Some(start),
            end_coordinate: Some(end),
            ..Self::default()
        }
    }

    /// Validate this region, reporting every violated field
    pub fn validate(&self) -> Result<OptimizationParameter, ValidationErrors> {
        let mut collector = ValidationCollector::new();

        check_coordinates(&mut collector, self.start_coordinate, self.end_coordinate);

        if self.organism.trim().is_empty() {
            collector.push("organism", REQUIRED_MESSAGE);
        }

        let avoid_repeat_length =
            collector.non_negative("avoid_repeat_length", self.avoid_repeat_length);
        collector.fraction("gc_content_global_min", self.gc_content_global_min);
        collector.fraction("gc_content_global_max", self.gc_content_global_max);
        collector.fraction("gc_content_window_min", self.gc_content_window_min);
        collector.fraction("gc_content_window_max", self.gc_content_window_max);
        let gc_content_window_size =
            collector.at_least("gc_content_window_size", self.gc_content_window_size, 1);
        let avoid_poly_t = collector.non_negative("avoid_poly_t", self.avoid_poly_t);
        let avoid_poly_a = collector.non_negative("avoid_poly_a", self.avoid_poly_a);
        let avoid_poly_c = collector.non_negative("avoid_poly_c", self.avoid_poly_c);
        let avoid_poly_g = collector.non_negative("avoid_poly_g", self.avoid_poly_g);
        let hairpin_stem_size = collector.non_negative("hairpin_stem_size", self.hairpin_stem_size);
        let hairpin_window = collector.non_negative("hairpin_window", self.hairpin_window);

        let mut avoid_sequences = Vec::with_capacity(self.avoid_sequences.len());
        for (index, motif) in self.avoid_sequences.iter().enumerate() {
            let motif = normalize_nucleic_acid(motif);
            if motif.is_empty() || !is_nucleic_acid(&motif) {
                collector.push(
                    &format!("avoid_sequences[{}]", index),
                    "Sequences must be nucleic acids.",
                );
            }
            avoid_sequences.push(motif);
        }

        let avoid_restriction_sites = self
            .avoid_restriction_sites
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        collector.finish_with(|| OptimizationParameter {
            start_coordinate: self.start_coordinate.and_then(|v| u64::try_from(v).ok()),
            end_coordinate: self.end_coordinate.and_then(|v| u64::try_from(v).ok()),
            enforce_sequence: self.enforce_sequence,
            organism: self.organism.trim().to_string(),
            optimize_cai: self.optimize_cai,
            optimize_tai: self.optimize_tai,
            avoid_repeat_length,
            enable_uridine_depletion: self.enable_uridine_depletion,
            avoid_ribosome_slip: self.avoid_ribosome_slip,
            avoid_manufacture_restriction_sites: self.avoid_manufacture_restriction_sites,
            avoid_micro_rna_seed_sites: self.avoid_micro_rna_seed_sites,
            gc_content_global_min: self.gc_content_global_min,
            gc_content_global_max: self.gc_content_global_max,
            gc_content_window_min: self.gc_content_window_min,
            gc_content_window_max: self.gc_content_window_max,
            gc_content_window_size,
            avoid_restriction_sites,
            avoid_sequences,
            avoid_poly_t,
            avoid_poly_a,
            avoid_poly_c,
            avoid_poly_g,
            hairpin_stem_size,
            hairpin_window,
        })
    }
}

/// Coordinate checks for one region
///
/// Only one of start/end set: a single "must be set" issue on the missing
/// field. Both set: ordering and alignment are checked independently so
/// start and end issues are all reported together.
fn check_coordinates(collector: &mut ValidationCollector, start: Option<i64>, end: Option<i64>) {
    match (start, end) {
        (None, None) => {}
        (None, Some(_)) => collector.push("start_coordinate", "Start coordinate must be set."),
        (Some(_), None) => collector.push("end_coordinate", "End coordinate must be set."),
        (Some(start), Some(end)) => {
            if start < 1 {
                collector.push("start_coordinate", "Must be greater than or equal to 1.");
            }
            if end < 1 {
                collector.push("end_coordinate", "Must be greater than or equal to 1.");
            }
            if start > end {
                collector.push(
                    "start_coordinate",
                    "Start coordinate must be less than or equal to end coordinate.",
                );
            }
            if (start - 1).rem_euclid(3) != 0 {
                collector.push(
                    "start_coordinate",
                    "Start coordinate must align to the start of a codon frame (e.g. 1, 4, 7, etc).",
                );
            }
            if end.rem_euclid(3) != 0 {
                collector.push(
                    "end_coordinate",
                    "End coordinate must align to the end of a codon frame (e.g. 3, 6, 9, etc).",
                );
            }
        }
    }
}

/// Validate an ordered list of regions
///
/// Issues are addressed as `parameters[i].<field>`. An empty list is itself
/// an issue on `parameters`.
pub fn validate_parameters(
    raw: &[RawOptimizationParameter],
) -> Result<Vec<OptimizationParameter>, ValidationErrors> {
    let mut collector = ValidationCollector::new();
    if raw.is_empty() {
        collector.push("parameters", EMPTY_PARAMETERS_MESSAGE);
    }

    let mut parameters = Vec::with_capacity(raw.len());
    for (index, parameter) in raw.iter().enumerate() {
        match parameter.validate() {
            Ok(p) => parameters.push(p),
            Err(errors) => collector.extend(errors.prefixed(&format!("parameters[{}]", index))),
        }
    }

    collector.finish(parameters)
}

/// A validated optimization region
///
/// Serializes to the engine's parameter shape (snake_case, organism sent as
/// `codon_usage_table`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationParameter {
    /// 1-based inclusive start; `None` together with `end_coordinate` means the whole CDS
    pub start_coordinate: Option<u64>,
    /// 1-based inclusive end
    pub end_coordinate: Option<u64>,
    /// Pass the region through unmodified; every field below is then ignored
    pub enforce_sequence: bool,
    #[serde(rename = "codon_usage_table")]
    pub organism: String,
    pub optimize_cai: bool,
    pub optimize_tai: Option<f64>,
    pub avoid_repeat_length: u32,
    pub enable_uridine_depletion: bool,
    pub avoid_ribosome_slip: bool,
    pub avoid_manufacture_restriction_sites: bool,
    pub avoid_micro_rna_seed_sites: bool,
    pub gc_content_global_min: f64,
    pub gc_content_global_max: f64,
    pub gc_content_window_min: f64,
    pub gc_content_window_max: f64,
    pub gc_content_window_size: u32,
    pub avoid_restriction_sites: Vec<String>,
    pub avoid_sequences: Vec<String>,
    pub avoid_poly_t: u32,
    pub avoid_poly_a: u32,
    pub avoid_poly_c: u32,
    pub avoid_poly_g: u32,
    pub hairpin_stem_size: u32,
    pub hairpin_window: u32,
}

impl OptimizationParameter {
    /// Start of the region, defaulting to the first base
    pub fn resolved_start(&self) -> u64 {
        self.start_coordinate.unwrap_or(1)
    }

    /// End of the region, defaulting to the last CDS base
    pub fn resolved_end(&self, cds_nucleotide_length: usize) -> u64 {
        self.end_coordinate.unwrap_or(cds_nucleotide_length as u64)
    }

    /// True when the region covers the whole CDS
    pub fn is_full_sequence(&self) -> bool {
        self.start_coordinate.is_none() && self.end_coordinate.is_none()
    }

    /// `Parameter region [start-end]`
    pub fn title(&self, cds_nucleotide_length: usize) -> String {
        format!(
            "Parameter region [{}-{}]",
            self.resolved_start(),
            self.resolved_end(cds_nucleotide_length)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinate_issues(start: Option<i64>, end: Option<i64>) -> Vec<(String, String)> {
        let raw = RawOptimizationParameter {
            start_coordinate: start,
            end_coordinate: end,
            ..RawOptimizationParameter::default()
        };
        match raw.validate() {
            Ok(_) => Vec::new(),
            Err(e) => e
                .issues()
                .iter()
                .map(|i| (i.path.clone(), i.message.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_aligned_region_is_valid() {
        assert!(coordinate_issues(Some(1), Some(3)).is_empty());
        assert!(coordinate_issues(Some(4), Some(99)).is_empty());
        assert!(coordinate_issues(None, None).is_empty());
    }

    #[test]
    fn test_misaligned_start() {
        let issues = coordinate_issues(Some(2), Some(3));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].0, "start_coordinate");
        assert!(issues[0].1.contains("start of a codon frame"));
    }

    #[test]
    fn test_misaligned_end() {
        let issues = coordinate_issues(Some(1), Some(4));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].0, "end_coordinate");
        assert!(issues[0].1.contains("end of a codon frame"));
    }

    #[test]
    fn test_start_after_end_and_misaligned_start_reported_together() {
        let issues = coordinate_issues(Some(5), Some(3));
        let messages: Vec<_> = issues.iter().map(|(_, m)| m.as_str()).collect();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|(p, _)| p == "start_coordinate"));
        assert!(messages[0].contains("less than or equal"));
        assert!(messages[1].contains("start of a codon frame"));
    }

    #[test]
    fn test_start_and_end_issues_are_independent() {
        let issues = coordinate_issues(Some(8), Some(4));
        let paths: Vec<_> = issues.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(
            paths,
            vec!["start_coordinate", "start_coordinate", "end_coordinate"]
        );
    }

    #[test]
    fn test_only_end_set() {
        let issues = coordinate_issues(None, Some(9));
        assert_eq!(
            issues,
            vec![(
                "start_coordinate".to_string(),
                "Start coordinate must be set.".to_string()
            )]
        );
    }

    #[test]
    fn test_only_start_set() {
        let issues = coordinate_issues(Some(1), None);
        assert_eq!(
            issues,
            vec![(
                "end_coordinate".to_string(),
                "End coordinate must be set.".to_string()
            )]
        );
    }

    #[test]
    fn test_knob_ranges() {
        let raw = RawOptimizationParameter {
            avoid_repeat_length: -1,
            gc_content_global_min: -0.1,
            gc_content_window_max: 1.1,
            gc_content_window_size: 0,
            avoid_poly_g: -3,
            hairpin_window: -1,
            organism: " ".to_string(),
            ..RawOptimizationParameter::default()
        };
        let errors = raw.validate().unwrap_err();
        let map = errors.field_messages();
        for field in [
            "avoid_repeat_length",
            "gc_content_global_min",
            "gc_content_window_max",
            "gc_content_window_size",
            "avoid_poly_g",
            "hairpin_window",
            "organism",
        ] {
            assert!(map.contains_key(field), "missing issue for {}", field);
        }
        assert_eq!(errors.len(), 7);
    }

    #[test]
    fn test_knobs_wider_than_u32_are_rejected() {
        let raw = RawOptimizationParameter {
            avoid_repeat_length: (1 << 32) + 10,
            gc_content_window_size: 1 << 32,
            ..RawOptimizationParameter::default()
        };
        let errors = raw.validate().unwrap_err();
        let map = errors.field_messages();
        assert_eq!(errors.len(), 2);
        assert_eq!(
            map["avoid_repeat_length"],
            vec!["Must be less than or equal to 4294967295."]
        );
        assert_eq!(
            map["gc_content_window_size"],
            vec!["Must be less than or equal to 4294967295."]
        );

        let widest = RawOptimizationParameter {
            hairpin_window: i64::from(u32::MAX),
            ..RawOptimizationParameter::default()
        };
        assert_eq!(widest.validate().unwrap().hairpin_window, u32::MAX);
    }

    #[test]
    fn test_gc_min_above_max_is_left_to_engine() {
        let raw = RawOptimizationParameter {
            gc_content_global_min: 0.8,
            gc_content_global_max: 0.2,
            ..RawOptimizationParameter::default()
        };
        assert!(raw.validate().is_ok());
    }

    #[test]
    fn test_avoid_sequences_are_normalized() {
        let raw = RawOptimizationParameter {
            avoid_sequences: vec!["gg uu\n".to_string(), "XYZ".to_string()],
            ..RawOptimizationParameter::default()
        };
        let errors = raw.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.issues()[0].path, "avoid_sequences[1]");

        let raw = RawOptimizationParameter {
            avoid_sequences: vec!["gg uu\n".to_string()],
            ..RawOptimizationParameter::default()
        };
        assert_eq!(raw.validate().unwrap().avoid_sequences, vec!["GGTT"]);
    }

    #[test]
    fn test_validate_parameters_prefixes_index() {
        let raw = vec![
            RawOptimizationParameter::region(1, 9),
            RawOptimizationParameter::region(2, 9),
        ];
        let errors = validate_parameters(&raw).unwrap_err();
        assert_eq!(errors.issues()[0].path, "parameters[1].start_coordinate");
    }

    #[test]
    fn test_overlapping_regions_are_allowed() {
        let raw = vec![
            RawOptimizationParameter::region(1, 30),
            RawOptimizationParameter::region(4, 12),
            RawOptimizationParameter::region(61, 90),
        ];
        assert_eq!(validate_parameters(&raw).unwrap().len(), 3);
    }

    #[test]
    fn test_empty_parameter_list() {
        let errors = validate_parameters(&[]).unwrap_err();
        assert_eq!(errors.issues()[0].path, "parameters");
    }

    #[test]
    fn test_title_resolves_full_sequence() {
        let full = RawOptimizationParameter::default().validate().unwrap();
        assert!(full.is_full_sequence());
        assert_eq!(full.title(90), "Parameter region [1-90]");

        let region = RawOptimizationParameter::region(4, 12).validate().unwrap();
        assert_eq!(region.title(90), "Parameter region [4-12]");
    }

    #[test]
    fn test_wire_shape_uses_codon_usage_table() {
        let parameter = RawOptimizationParameter::default().validate().unwrap();
        let json = serde_json::to_value(&parameter).unwrap();
        assert_eq!(json["codon_usage_table"], "homo-sapiens");
        assert!(json.get("organism").is_none());
        assert_eq!(json["start_coordinate"], serde_json::Value::Null);
    }

    #[test]
    fn test_raw_defaults_fill_missing_fields() {
        let raw: RawOptimizationParameter =
            serde_json::from_str(r#"{"start_coordinate": 1, "end_coordinate": 6, "codon_usage_table": "mus-musculus"}"#)
                .unwrap();
        assert_eq!(raw.organism, "mus-musculus");
        assert_eq!(raw.avoid_poly_c, 6);
        assert_eq!(raw.gc_content_window_size, 100);
    }
}
