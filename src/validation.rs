//! Field-addressed validation issues
//!
//! Validation never stops at the first problem: every check appends a
//! [`ValidationIssue`] to a [`ValidationCollector`], and a request is rejected
//! with the complete [`ValidationErrors`] list so the caller can fix all
//! problems in one pass. Nothing in this module talks to the external engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Minimum number of optimized variants per run
pub const MIN_NUMBER_OF_SEQUENCES: usize = 1;

/// Maximum number of optimized variants per run
pub const MAX_NUMBER_OF_SEQUENCES: usize = 10;

/// Message used when a required field is missing or blank
pub const REQUIRED_MESSAGE: &str = "Field cannot be empty.";

/// A single structural violation, addressed by field path
///
/// Paths use dotted/indexed notation, e.g. `sequence.coding_sequence` or
/// `parameters[1].end_coordinate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Field path the issue is attached to
    pub path: String,
    /// Human-readable message
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A non-empty list of validation issues
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    issues: Vec<ValidationIssue>,
}

impl ValidationErrors {
    /// Build from a list of issues, returning `None` when the list is empty
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Option<Self> {
        if issues.is_empty() {
            None
        } else {
            Some(Self { issues })
        }
    }

    /// All issues in the order they were raised
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues raised against an exact field path
    pub fn for_path<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a ValidationIssue> {
        self.issues.iter().filter(move |i| i.path == path)
    }

    /// Field -> messages mapping, ordered by field path
    pub fn field_messages(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for issue in &self.issues {
            map.entry(issue.path.clone())
                .or_default()
                .push(issue.message.clone());
        }
        map
    }

    /// Prefix every path, e.g. `coding_sequence` -> `sequence.coding_sequence`
    pub fn prefixed(self, prefix: &str) -> Self {
        Self {
            issues: self
                .issues
                .into_iter()
                .map(|i| ValidationIssue::new(join_path(prefix, &i.path), i.message))
                .collect(),
        }
    }

    /// Merge two issue lists, keeping order
    pub fn merge(mut self, other: ValidationErrors) -> Self {
        self.issues.extend(other.issues);
        self
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.issues.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Accumulates issues while validating one value
#[derive(Debug, Default)]
pub struct ValidationCollector {
    prefix: String,
    issues: Vec<ValidationIssue>,
}

impl ValidationCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collector whose paths are all rooted at `prefix`
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            issues: Vec::new(),
        }
    }

    /// Record an issue against `field`
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.issues
            .push(ValidationIssue::new(join_path(&self.prefix, field), message));
    }

    /// Absorb issues produced by a nested validator
    pub fn extend(&mut self, errors: ValidationErrors) {
        let errors = if self.prefix.is_empty() {
            errors
        } else {
            errors.prefixed(&self.prefix)
        };
        self.issues.extend(errors.issues);
    }

    /// Check a `u32` knob that must be non-negative, returning the converted value
    pub fn non_negative(&mut self, field: &str, value: i64) -> u32 {
        self.at_least(field, value, 0)
    }

    /// Check a `u32` knob against `min..=u32::MAX`, returning the converted value
    ///
    /// An out-of-range value records an issue and converts to the nearest bound.
    pub fn at_least(&mut self, field: &str, value: i64, min: u32) -> u32 {
        if value < i64::from(min) {
            self.push(field, format!("Must be greater than or equal to {}.", min));
            return min;
        }
        match u32::try_from(value) {
            Ok(value) => value,
            Err(_) => {
                self.push(field, format!("Must be less than or equal to {}.", u32::MAX));
                u32::MAX
            }
        }
    }

    /// Record an issue when `value` is not a fraction in [0, 1]
    pub fn fraction(&mut self, field: &str, value: f64) {
        if !(0.0..=1.0).contains(&value) {
            self.push(field, "Must be between 0 and 1.");
        }
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Finish validation: `Ok(value)` only if no issue was recorded
    pub fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        match ValidationErrors::from_issues(self.issues) {
            Some(errors) => Err(errors),
            None => Ok(value),
        }
    }

    /// Finish validation, building the value lazily
    pub fn finish_with<T>(self, build: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        match ValidationErrors::from_issues(self.issues) {
            Some(errors) => Err(errors),
            None => Ok(build()),
        }
    }
}

/// Validate the requested number of optimized variants
pub fn validate_number_of_sequences(count: usize) -> Result<usize, ValidationErrors> {
    let mut collector = ValidationCollector::new();
    if !(MIN_NUMBER_OF_SEQUENCES..=MAX_NUMBER_OF_SEQUENCES).contains(&count) {
        collector.push(
            "number_of_sequences",
            format!(
                "Number of sequences must be between {} and {}.",
                MIN_NUMBER_OF_SEQUENCES, MAX_NUMBER_OF_SEQUENCES
            ),
        );
    }
    collector.finish(count)
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else if field.is_empty() {
        prefix.to_string()
    } else if field.starts_with('[') {
        format!("{}{}", prefix, field)
    } else {
        format!("{}.{}", prefix, field)
    }
}
