//! Engine result types and response envelopes

use serde::{Deserialize, Serialize};

use super::{EngineFailure, Operation, TransportError};

/// Minimum free energy of the folded sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimumFreeEnergy {
    /// Dot-bracket structure
    pub structure: String,
    /// kcal/mol
    pub energy: f64,
    #[serde(default)]
    pub paired_nt_ratio: f64,
}

/// Sliding-window GC content extremes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcWindowStats {
    pub window_size: u32,
    pub min_ratio: f64,
    pub min_start: u64,
    pub max_ratio: f64,
    pub max_start: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDebug {
    pub time_seconds: f64,
}

/// Statistics for one nucleic acid sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub a_ratio: f64,
    pub c_ratio: f64,
    pub g_ratio: f64,
    pub t_ratio: f64,
    pub at_ratio: f64,
    pub ga_ratio: f64,
    pub gc_ratio: f64,
    #[serde(default)]
    pub uridine_depletion: Option<f64>,
    #[serde(default)]
    pub codon_adaptation_index: Option<f64>,
    #[serde(default)]
    pub trna_adaptation_index: Option<f64>,
    pub minimum_free_energy: MinimumFreeEnergy,
    pub gc_ratio_window: GcWindowStats,
    #[serde(default)]
    pub debug: Option<AnalysisDebug>,
}

impl AnalysisResult {
    /// Parse an Analyze response body
    pub fn from_json(body: &[u8]) -> Result<Self, TransportError> {
        serde_json::from_slice(body)
            .map_err(|e| TransportError::malformed(Operation::Analyze, e.to_string()))
    }
}

/// Result of one Optimize call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OptimizationOutcome {
    Success {
        optimized_nucleic_acid_sequence: String,
        /// Constraint summary, one line per constraint
        constraint_log: String,
        /// Objective summary, one line per objective
        objective_log: String,
    },
    Failure(EngineFailure),
}

impl OptimizationOutcome {
    pub fn success(
        sequence: impl Into<String>,
        constraint_log: impl Into<String>,
        objective_log: impl Into<String>,
    ) -> Self {
        OptimizationOutcome::Success {
            optimized_nucleic_acid_sequence: sequence.into(),
            constraint_log: constraint_log.into(),
            objective_log: objective_log.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OptimizationOutcome::Success { .. })
    }

    /// Optimized sequence, if the call succeeded
    pub fn sequence(&self) -> Option<&str> {
        match self {
            OptimizationOutcome::Success {
                optimized_nucleic_acid_sequence,
                ..
            } => Some(optimized_nucleic_acid_sequence),
            OptimizationOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&EngineFailure> {
        match self {
            OptimizationOutcome::Failure(failure) => Some(failure),
            OptimizationOutcome::Success { .. } => None,
        }
    }

    /// Parse the engine's `{success, result, error}` envelope
    pub fn from_json(body: &[u8]) -> Result<Self, TransportError> {
        let envelope: OptimizationEnvelope = serde_json::from_slice(body)
            .map_err(|e| TransportError::malformed(Operation::Optimize, e.to_string()))?;
        envelope.into_outcome()
    }
}

/// Raw Optimize response as the engine sends it
#[derive(Debug, Deserialize)]
struct OptimizationEnvelope {
    success: bool,
    #[serde(default)]
    result: Option<EnvelopeResult>,
    #[serde(default)]
    error: Option<EnvelopeError>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeResult {
    sequence: EnvelopeSequence,
    #[serde(default)]
    constraints: Option<String>,
    #[serde(default)]
    objectives: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EnvelopeSequence {
    Text(String),
    Record { nucleic_acid_sequence: String },
}

#[derive(Debug, Deserialize)]
struct EnvelopeError {
    message: String,
    #[serde(default)]
    location: Option<serde_json::Value>,
    #[serde(default)]
    constraint: Option<serde_json::Value>,
}

impl OptimizationEnvelope {
    fn into_outcome(self) -> Result<OptimizationOutcome, TransportError> {
        if self.success {
            let result = self.result.ok_or_else(|| {
                TransportError::malformed(Operation::Optimize, "success without a result")
            })?;
            let sequence = match result.sequence {
                EnvelopeSequence::Text(s) => s,
                EnvelopeSequence::Record {
                    nucleic_acid_sequence,
                } => nucleic_acid_sequence,
            };
            Ok(OptimizationOutcome::success(
                sequence,
                result.constraints.unwrap_or_default(),
                result.objectives.unwrap_or_default(),
            ))
        } else {
            let error = self.error.ok_or_else(|| {
                TransportError::malformed(Operation::Optimize, "failure without an error")
            })?;
            Ok(OptimizationOutcome::Failure(EngineFailure {
                message: error.message,
                location: error.location.and_then(diagnostic_text),
                constraint: error.constraint.and_then(diagnostic_text),
            }))
        }
    }
}

/// Render a diagnostic field; null and the literal "None" count as absent
fn diagnostic_text(value: serde_json::Value) -> Option<String> {
    let text = match value {
        serde_json::Value::Null => return None,
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };
    let text = text.trim();
    if text.is_empty() || text == "None" {
        None
    } else {
        Some(text.to_string())
    }
}

/// Convert response: a bare JSON string or `{"sequence": ...}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConvertResponse {
    Text(String),
    Record { sequence: String },
}

/// Parse a Convert response body
pub fn parse_conversion(body: &[u8]) -> Result<String, TransportError> {
    let response: ConvertResponse = serde_json::from_slice(body)
        .map_err(|e| TransportError::malformed(Operation::Convert, e.to_string()))?;
    Ok(match response {
        ConvertResponse::Text(s) => s,
        ConvertResponse::Record { sequence } => sequence,
    })
}
