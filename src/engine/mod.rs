//! External optimization/analysis engine boundary
//!
//! The orchestrator only sees the [`OptimizationEngine`] trait, with three
//! operations:
//! - Convert: amino acid to nucleic acid projection
//! - Analyze: sequence statistics ([`AnalysisResult`])
//! - Optimize: constraint-driven redesign ([`OptimizationOutcome`])
//!
//! Transports:
//! - [`SubprocessEngine`]: runs the engine's command-line front end
//! - [`HttpEngine`]: talks to the engine's HTTP API (feature `http`)
//! - [`MockEngine`]: in-process, scriptable, for tests and dry runs

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, EngineConfig, EngineKind};
use crate::context::RequestContext;
use crate::parameter::OptimizationParameter;

#[cfg(feature = "http")]
pub mod http;
pub mod mock;
pub mod subprocess;
pub mod types;

#[cfg(feature = "http")]
pub use http::HttpEngine;
pub use mock::MockEngine;
pub use subprocess::SubprocessEngine;
pub use types::{AnalysisResult, GcWindowStats, MinimumFreeEnergy, OptimizationOutcome};

/// One of the three engine operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Convert,
    Analyze,
    Optimize,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Convert => "convert",
            Operation::Analyze => "analyze",
            Operation::Optimize => "optimize",
        }
    }

    pub fn all() -> [Operation; 3] {
        [Operation::Convert, Operation::Analyze, Operation::Optimize]
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unstructured failure at the process/network boundary
///
/// No diagnostic from the engine is available for these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: Operation, seconds: u64 },

    #[error("failed to start engine for {operation}: {msg}")]
    Spawn { operation: Operation, msg: String },

    #[error("engine process failed during {operation} (exit code {code:?}): {stderr}")]
    ProcessFailed {
        operation: Operation,
        code: Option<i32>,
        stderr: String,
    },

    #[error("malformed {operation} response: {msg}")]
    Malformed { operation: Operation, msg: String },

    #[error("HTTP error during {operation}{}: {msg}", .status.map(|s| format!(" (status {})", s)).unwrap_or_default())]
    Http {
        operation: Operation,
        status: Option<u16>,
        msg: String,
    },

    #[error("engine unavailable for {operation}: {msg}")]
    Unavailable { operation: Operation, msg: String },
}

impl TransportError {
    /// Operation the failure occurred in
    pub fn operation(&self) -> Operation {
        match self {
            TransportError::Timeout { operation, .. }
            | TransportError::Spawn { operation, .. }
            | TransportError::ProcessFailed { operation, .. }
            | TransportError::Malformed { operation, .. }
            | TransportError::Http { operation, .. }
            | TransportError::Unavailable { operation, .. } => *operation,
        }
    }

    pub fn malformed(operation: Operation, msg: impl Into<String>) -> Self {
        TransportError::Malformed {
            operation,
            msg: msg.into(),
        }
    }
}

/// Structured rejection reported by the engine's Optimize operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineFailure {
    pub message: String,
    pub location: Option<String>,
    pub constraint: Option<String>,
}

impl EngineFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            constraint: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }
}

impl fmt::Display for EngineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(location) = &self.location {
            write!(f, " (location: {})", location)?;
        }
        if let Some(constraint) = &self.constraint {
            write!(f, " (constraint: {})", constraint)?;
        }
        Ok(())
    }
}

impl std::error::Error for EngineFailure {}

/// Capability-typed interface to the optimization/analysis engine
///
/// Implementations must be pure request/response: no state is shared between
/// calls, so the orchestrator may issue any number of them concurrently.
/// Timeouts, if any, belong to the implementation.
#[async_trait::async_trait]
pub trait OptimizationEngine: Send + Sync {
    /// Project an amino acid sequence to nucleic acid using the organism's codon usage
    async fn convert(
        &self,
        ctx: &RequestContext,
        sequence: &str,
        organism: &str,
    ) -> Result<String, TransportError>;

    /// Compute statistics for a nucleic acid sequence
    async fn analyze(
        &self,
        ctx: &RequestContext,
        sequence: &str,
        organism: &str,
    ) -> Result<AnalysisResult, TransportError>;

    /// Optimize a nucleic acid sequence under the ordered region parameters
    ///
    /// A structured rejection is `Ok(OptimizationOutcome::Failure(_))`; only
    /// transport problems are `Err`.
    async fn optimize(
        &self,
        ctx: &RequestContext,
        sequence: &str,
        parameters: &[OptimizationParameter],
    ) -> Result<OptimizationOutcome, TransportError>;

    /// Short transport name for logs
    fn name(&self) -> &'static str;
}

/// Build the engine described by the configuration
pub fn build_engine(config: &EngineConfig) -> Result<Arc<dyn OptimizationEngine>, ConfigError> {
    match config.kind {
        EngineKind::Subprocess => {
            let subprocess = config.subprocess.as_ref().ok_or_else(|| {
                ConfigError::Invalid("engine.subprocess section is required".to_string())
            })?;
            Ok(Arc::new(SubprocessEngine::new(subprocess.clone())))
        }
        #[cfg(feature = "http")]
        EngineKind::Http => {
            let http = config.http.as_ref().ok_or_else(|| {
                ConfigError::Invalid("engine.http section is required".to_string())
            })?;
            Ok(Arc::new(HttpEngine::new(http)?))
        }
        #[cfg(not(feature = "http"))]
        EngineKind::Http => Err(ConfigError::Invalid(
            "HTTP engine support requires the `http` feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_names_operation() {
        let err = TransportError::Timeout {
            operation: Operation::Optimize,
            seconds: 1800,
        };
        assert_eq!(err.operation(), Operation::Optimize);
        assert_eq!(err.to_string(), "optimize timed out after 1800s");

        let err = TransportError::Http {
            operation: Operation::Analyze,
            status: Some(502),
            msg: "bad gateway".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP error during analyze (status 502): bad gateway"
        );
    }

    #[test]
    fn test_engine_failure_display() {
        let failure = EngineFailure::new("No solution found")
            .with_location("12-48")
            .with_constraint("EnforceGCContent");
        assert_eq!(
            failure.to_string(),
            "No solution found (location: 12-48) (constraint: EnforceGCContent)"
        );
        assert_eq!(EngineFailure::new("x").to_string(), "x");
    }

    #[test]
    fn test_build_engine_requires_section() {
        let config = EngineConfig {
            kind: EngineKind::Subprocess,
            subprocess: None,
            http: None,
        };
        assert!(matches!(
            build_engine(&config),
            Err(ConfigError::Invalid(_))
        ));
    }
}
