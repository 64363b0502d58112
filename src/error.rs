//! Error types for ferro-mrna
//!
//! Every failure surfaced by the library or the CLI maps to one [`ErrorCode`]
//! so callers can branch on the class of failure without matching messages.

use std::fmt;
use thiserror::Error;

use crate::config::ConfigError;
use crate::engine::TransportError;
use crate::orchestrate::OrchestrationError;
use crate::sequence::ConversionError;
use crate::validation::ValidationErrors;

/// Error codes for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // Validation errors (E1xxx)
    /// One or more request fields are invalid
    InvalidRequest = 1001,

    // Conversion errors (E2xxx)
    /// Amino-acid to nucleic-acid conversion failed
    ConversionFailed = 2001,
    /// Conversion produced something other than a nucleic acid
    InvalidConversionOutput = 2002,

    // Engine errors (E3xxx)
    /// The engine rejected the optimization
    EngineRejected = 3001,

    // Transport errors (E4xxx)
    /// Engine call timed out
    EngineTimeout = 4001,
    /// Engine could not be started or reached
    EngineUnavailable = 4002,
    /// Engine process or HTTP call failed
    EngineCallFailed = 4003,
    /// Engine response could not be parsed
    MalformedResponse = 4004,

    // Aggregation errors (E5xxx)
    /// A task did not complete
    TaskFailed = 5001,

    // IO errors (E9xxx)
    /// File IO error
    IoError = 9001,
    /// JSON parsing error
    JsonError = 9002,
    /// Configuration error
    ConfigError = 9003,
}

impl ErrorCode {
    /// Get the error code as a string (e.g., "E1001")
    pub fn as_str(&self) -> String {
        format!("E{:04}", *self as u16)
    }

    /// Get a brief description of this error code
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "invalid request",
            ErrorCode::ConversionFailed => "sequence conversion failed",
            ErrorCode::InvalidConversionOutput => "conversion returned an invalid sequence",
            ErrorCode::EngineRejected => "optimization rejected by the engine",
            ErrorCode::EngineTimeout => "engine call timed out",
            ErrorCode::EngineUnavailable => "engine unavailable",
            ErrorCode::EngineCallFailed => "engine call failed",
            ErrorCode::MalformedResponse => "malformed engine response",
            ErrorCode::TaskFailed => "engine task did not complete",
            ErrorCode::IoError => "file I/O error",
            ErrorCode::JsonError => "JSON parsing error",
            ErrorCode::ConfigError => "configuration error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for ferro-mrna
#[derive(Debug, Error)]
pub enum MrnaError {
    #[error("invalid request: {0}")]
    Validation(ValidationErrors),

    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {msg}")]
    Io { msg: String },

    #[error("JSON error: {msg}")]
    Json { msg: String },
}

impl From<ValidationErrors> for MrnaError {
    fn from(errors: ValidationErrors) -> Self {
        MrnaError::Validation(errors)
    }
}

impl From<std::io::Error> for MrnaError {
    fn from(err: std::io::Error) -> Self {
        MrnaError::Io {
            msg: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for MrnaError {
    fn from(err: serde_json::Error) -> Self {
        MrnaError::Json {
            msg: err.to_string(),
        }
    }
}

impl MrnaError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            MrnaError::Validation(_) => ErrorCode::InvalidRequest,
            MrnaError::Orchestration(err) => orchestration_code(err),
            MrnaError::Config(_) => ErrorCode::ConfigError,
            MrnaError::Io { .. } => ErrorCode::IoError,
            MrnaError::Json { .. } => ErrorCode::JsonError,
        }
    }

    /// Validation issues, when the request itself was rejected
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            MrnaError::Validation(errors)
            | MrnaError::Orchestration(OrchestrationError::Validation(errors)) => Some(errors),
            _ => None,
        }
    }
}

fn orchestration_code(err: &OrchestrationError) -> ErrorCode {
    match err {
        OrchestrationError::Validation(_) => ErrorCode::InvalidRequest,
        OrchestrationError::Conversion(ConversionError::Transport(_)) => {
            ErrorCode::ConversionFailed
        }
        OrchestrationError::Conversion(ConversionError::InvalidOutput(_)) => {
            ErrorCode::InvalidConversionOutput
        }
        OrchestrationError::EngineFailure { .. } => ErrorCode::EngineRejected,
        OrchestrationError::Transport { source, .. } => transport_code(source),
        OrchestrationError::Task { .. } => ErrorCode::TaskFailed,
    }
}

fn transport_code(err: &TransportError) -> ErrorCode {
    match err {
        TransportError::Timeout { .. } => ErrorCode::EngineTimeout,
        TransportError::Spawn { .. } | TransportError::Unavailable { .. } => {
            ErrorCode::EngineUnavailable
        }
        TransportError::ProcessFailed { .. } | TransportError::Http { .. } => {
            ErrorCode::EngineCallFailed
        }
        TransportError::Malformed { .. } => ErrorCode::MalformedResponse,
    }
}
