// Copyright (c) 2024-2025 Fulcrum Genomics LLC
// SPDX-License-Identifier: MIT

//! ferro-mrna: mRNA design request validation, optimization and reporting
//!
//! Part of the ferro bioinformatics toolkit.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ferro_mrna::{MockEngine, OptimizationRequest, Orchestrator, RequestContext};
//! use ferro_mrna::{RawOptimizationParameter, RawSequence};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! // Validate the submission
//! let request = OptimizationRequest::validate(
//!     &RawSequence::nucleic_acid("ATGAAAGCGTAA").with_utrs("GGGAAA", "UUUCCC"),
//!     &[RawOptimizationParameter::default()],
//! )
//! .unwrap();
//!
//! // Fan the run out over an engine
//! let orchestrator = Orchestrator::new(Arc::new(MockEngine::new()));
//! let result = orchestrator
//!     .run(&RequestContext::anonymous(), &request, 2)
//!     .await
//!     .unwrap();
//! assert_eq!(result.variants.len(), 2);
//! # });
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod orchestrate;
pub mod parameter;
pub mod report;
pub mod sequence;
pub mod validation;

// Re-export commonly used types
pub use config::{JoinPolicy, MrnaConfig};
pub use context::RequestContext;
pub use engine::{build_engine, MockEngine, OptimizationEngine, OptimizationOutcome};
pub use error::{ErrorCode, MrnaError};
pub use orchestrate::{
    AggregatedResult, OptimizationInput, OptimizationRequest, OrchestrationError, Orchestrator,
    SettledResult,
};
pub use parameter::{OptimizationParameter, RawOptimizationParameter};
pub use report::{generate_report, report_file_name, ReportGenerator};
pub use sequence::{RawSequence, Sequence, SequenceType};
pub use validation::{ValidationErrors, ValidationIssue};

/// Result type alias for ferro-mrna operations
pub type Result<T> = std::result::Result<T, MrnaError>;
