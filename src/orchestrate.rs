//! Orchestration of one optimization run
//!
//! A run resolves the coding sequence to nucleic acid, then issues one
//! concurrent batch of engine calls:
//! - baseline analyses of the CDS, each non-empty UTR, and the assembled sequence
//! - N independent optimization pipelines; each successful optimization
//!   immediately analyzes its CDS and assembled sequence in parallel
//!
//! [`Orchestrator::run`] is all-or-nothing: the first failed call aborts every
//! outstanding call and no partial result is produced.
//! [`Orchestrator::run_settled`] lets every call finish and reports each
//! failure next to the results that did complete.
//!
//! Variants are always returned in dispatch order; nothing here ranks or
//! filters them.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

use crate::config::OrchestrationConfig;
use crate::context::RequestContext;
use crate::engine::{
    AnalysisResult, EngineFailure, OptimizationEngine, OptimizationOutcome, TransportError,
};
use crate::parameter::{
    validate_parameters, OptimizationParameter, RawOptimizationParameter, DEFAULT_ORGANISM,
    EMPTY_PARAMETERS_MESSAGE,
};
use crate::sequence::{ConversionError, RawSequence, Sequence, SequenceType};
use crate::validation::{validate_number_of_sequences, ValidationCollector, ValidationErrors};

/// Message shown for a variant that failed without an engine diagnostic
pub const GENERIC_FAILURE_MESSAGE: &str = "Optimization could not complete.";

/// Part of the construct an analysis covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SequenceRegion {
    Cds,
    FivePrimeUtr,
    ThreePrimeUtr,
    FullSequence,
}

impl SequenceRegion {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceRegion::Cds => "CDS",
            SequenceRegion::FivePrimeUtr => "5' UTR",
            SequenceRegion::ThreePrimeUtr => "3' UTR",
            SequenceRegion::FullSequence => "full sequence",
        }
    }
}

impl fmt::Display for SequenceRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies one call within a run; variants are 0-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    BaselineAnalysis { region: SequenceRegion },
    Optimize { variant: usize },
    VariantAnalysis { variant: usize, region: SequenceRegion },
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::BaselineAnalysis { region } => write!(f, "baseline {} analysis", region),
            TaskId::Optimize { variant } => write!(f, "optimization #{}", variant + 1),
            TaskId::VariantAnalysis { variant, region } => {
                write!(f, "optimization #{} {} analysis", variant + 1, region)
            }
        }
    }
}

/// Run-level failure
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("invalid request: {0}")]
    Validation(ValidationErrors),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("{task} was rejected by the engine: {failure}")]
    EngineFailure { task: TaskId, failure: EngineFailure },

    #[error("{task} failed: {source}")]
    Transport {
        task: TaskId,
        #[source]
        source: TransportError,
    },

    #[error("{} did not complete: {msg}", .task.map(|t| t.to_string()).unwrap_or_else(|| "engine task".to_string()))]
    Task { task: Option<TaskId>, msg: String },
}

impl OrchestrationError {
    /// True for a structured rejection from the engine
    pub fn is_engine_failure(&self) -> bool {
        matches!(self, OrchestrationError::EngineFailure { .. })
    }

    /// The engine's diagnostic, when one exists
    pub fn diagnostic(&self) -> Option<&EngineFailure> {
        match self {
            OrchestrationError::EngineFailure { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// Call that failed, for failures raised inside the batch
    pub fn task(&self) -> Option<TaskId> {
        match self {
            OrchestrationError::EngineFailure { task, .. }
            | OrchestrationError::Transport { task, .. } => Some(*task),
            OrchestrationError::Task { task, .. } => *task,
            OrchestrationError::Validation(_) | OrchestrationError::Conversion(_) => None,
        }
    }

    /// Engine diagnostic, or the generic failure marker
    pub fn user_message(&self) -> String {
        match self.diagnostic() {
            Some(failure) => failure.to_string(),
            None => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Validated sequence plus its ordered, non-empty region parameters
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationRequest {
    sequence: Sequence,
    parameters: Vec<OptimizationParameter>,
}

impl OptimizationRequest {
    pub fn new(
        sequence: Sequence,
        parameters: Vec<OptimizationParameter>,
    ) -> Result<Self, ValidationErrors> {
        let mut collector = ValidationCollector::new();
        if parameters.is_empty() {
            collector.push("parameters", EMPTY_PARAMETERS_MESSAGE);
        }
        collector.finish(Self {
            sequence,
            parameters,
        })
    }

    /// Validate raw input; issues are addressed as `sequence.*` and `parameters[i].*`
    pub fn validate(
        sequence: &RawSequence,
        parameters: &[RawOptimizationParameter],
    ) -> Result<Self, ValidationErrors> {
        let sequence = sequence.validate().map_err(|e| e.prefixed("sequence"));
        let parameters = validate_parameters(parameters);
        match (sequence, parameters) {
            (Ok(sequence), Ok(parameters)) => Ok(Self {
                sequence,
                parameters,
            }),
            (Err(a), Err(b)) => Err(a.merge(b)),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
        }
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn parameters(&self) -> &[OptimizationParameter] {
        &self.parameters
    }

    /// Organism for Convert/Analyze: the first optimized region's, else the first region's
    pub fn organism(&self) -> &str {
        self.parameters
            .iter()
            .find(|p| !p.enforce_sequence)
            .or_else(|| self.parameters.first())
            .map(|p| p.organism.as_str())
            .unwrap_or(DEFAULT_ORGANISM)
    }
}

fn default_number_of_sequences() -> i64 {
    1
}

fn default_parameters() -> Vec<RawOptimizationParameter> {
    vec![RawOptimizationParameter::default()]
}

/// A complete submission as read from a JSON input file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationInput {
    #[serde(default)]
    pub name: String,
    /// Signed so that a negative count is a validation issue, not a parse error
    #[serde(default = "default_number_of_sequences")]
    pub number_of_sequences: i64,
    pub sequence: RawSequence,
    /// One full-sequence region with default settings when absent
    #[serde(default = "default_parameters")]
    pub parameters: Vec<RawOptimizationParameter>,
}

/// An [`OptimizationInput`] that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInput {
    pub name: String,
    pub request: OptimizationRequest,
    pub number_of_sequences: usize,
}

impl OptimizationInput {
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Validate every part, reporting all issues together
    pub fn validate(&self) -> Result<ValidatedInput, ValidationErrors> {
        // Negative counts fall outside the range just like zero does
        let count =
            validate_number_of_sequences(usize::try_from(self.number_of_sequences).unwrap_or(0));
        let request = OptimizationRequest::validate(&self.sequence, &self.parameters);
        match (count, request) {
            (Ok(number_of_sequences), Ok(request)) => Ok(ValidatedInput {
                name: self.name.clone(),
                request,
                number_of_sequences,
            }),
            (Err(a), Err(b)) => Err(b.merge(a)),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
        }
    }
}

/// Baseline analyses of the input construct
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineAnalyses {
    pub cds: AnalysisResult,
    pub five_prime_utr: Option<AnalysisResult>,
    pub three_prime_utr: Option<AnalysisResult>,
    pub full_sequence: AnalysisResult,
}

/// One optimized variant and the analyses of its output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantResult {
    pub outcome: OptimizationOutcome,
    pub cds_analysis: Option<AnalysisResult>,
    pub full_sequence_analysis: Option<AnalysisResult>,
}

impl VariantResult {
    fn codon_adaptation_index(&self) -> f64 {
        self.cds_analysis
            .as_ref()
            .and_then(|a| a.codon_adaptation_index)
            .unwrap_or(0.0)
    }
}

/// Everything a run produced, variants in dispatch order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedResult {
    pub baseline: BaselineAnalyses,
    pub variants: Vec<VariantResult>,
}

impl AggregatedResult {
    /// Variants reordered by descending CAI of their CDS; missing CAI counts as 0
    ///
    /// Presentation only. The sort is stable, so ties keep dispatch order.
    pub fn sorted_by_adaptation_index(mut self) -> Self {
        self.variants.sort_by(|a, b| {
            b.codon_adaptation_index()
                .total_cmp(&a.codon_adaptation_index())
        });
        self
    }
}

/// Outcome of one call in a settled run
pub type TaskOutcome<T> = Result<T, OrchestrationError>;

/// Baseline analyses of a settled run, each with its own outcome
#[derive(Debug)]
pub struct SettledBaseline {
    pub cds: TaskOutcome<AnalysisResult>,
    pub five_prime_utr: Option<TaskOutcome<AnalysisResult>>,
    pub three_prime_utr: Option<TaskOutcome<AnalysisResult>>,
    pub full_sequence: TaskOutcome<AnalysisResult>,
}

/// One variant of a settled run
///
/// Engine rejections are `Err(OrchestrationError::EngineFailure)`. The
/// analyses are `None` when the optimization did not succeed.
#[derive(Debug)]
pub struct SettledVariant {
    pub outcome: TaskOutcome<OptimizationOutcome>,
    pub cds_analysis: Option<TaskOutcome<AnalysisResult>>,
    pub full_sequence_analysis: Option<TaskOutcome<AnalysisResult>>,
}

/// Every outcome of a settle-all run
#[derive(Debug)]
pub struct SettledResult {
    pub baseline: SettledBaseline,
    pub variants: Vec<SettledVariant>,
}

impl SettledResult {
    /// Every failed call, baseline first, then variants in order
    pub fn failures(&self) -> Vec<&OrchestrationError> {
        let baseline = [
            self.baseline.cds.as_ref().err(),
            self.baseline
                .five_prime_utr
                .as_ref()
                .and_then(|r| r.as_ref().err()),
            self.baseline
                .three_prime_utr
                .as_ref()
                .and_then(|r| r.as_ref().err()),
            self.baseline.full_sequence.as_ref().err(),
        ];
        let variants = self.variants.iter().flat_map(|v| {
            [
                v.outcome.as_ref().err(),
                v.cds_analysis.as_ref().and_then(|r| r.as_ref().err()),
                v.full_sequence_analysis
                    .as_ref()
                    .and_then(|r| r.as_ref().err()),
            ]
            .into_iter()
            .flatten()
        });
        baseline.into_iter().flatten().chain(variants).collect()
    }

    /// True when no call failed
    pub fn is_complete(&self) -> bool {
        self.failures().is_empty()
    }

    /// Collapse into an [`AggregatedResult`] for reporting
    ///
    /// The CDS and full-sequence baselines are required; a failure there is
    /// returned. A failed UTR baseline or variant analysis becomes `None`. A
    /// failed optimization becomes an [`OptimizationOutcome::Failure`] with the
    /// engine's diagnostic, or the generic failure marker when there is none.
    pub fn into_aggregated(self) -> Result<AggregatedResult, OrchestrationError> {
        let baseline = BaselineAnalyses {
            cds: self.baseline.cds?,
            five_prime_utr: self.baseline.five_prime_utr.and_then(Result::ok),
            three_prime_utr: self.baseline.three_prime_utr.and_then(Result::ok),
            full_sequence: self.baseline.full_sequence?,
        };

        let variants = self
            .variants
            .into_iter()
            .map(|v| {
                let outcome = match v.outcome {
                    Ok(outcome) => outcome,
                    Err(OrchestrationError::EngineFailure { failure, .. }) => {
                        OptimizationOutcome::Failure(failure)
                    }
                    Err(_) => {
                        OptimizationOutcome::Failure(EngineFailure::new(GENERIC_FAILURE_MESSAGE))
                    }
                };
                VariantResult {
                    outcome,
                    cds_analysis: v.cds_analysis.and_then(Result::ok),
                    full_sequence_analysis: v.full_sequence_analysis.and_then(Result::ok),
                }
            })
            .collect();

        Ok(AggregatedResult { baseline, variants })
    }
}

/// Shared state cloned into every spawned call
#[derive(Clone)]
struct Dispatch {
    engine: Arc<dyn OptimizationEngine>,
    ctx: RequestContext,
    organism: Arc<str>,
    limiter: Option<Arc<Semaphore>>,
}

impl Dispatch {
    async fn permit(&self, task: TaskId) -> Result<Option<OwnedSemaphorePermit>, OrchestrationError> {
        match &self.limiter {
            Some(limiter) => Arc::clone(limiter)
                .acquire_owned()
                .await
                .map(Some)
                .map_err(|e| OrchestrationError::Task {
                    task: Some(task),
                    msg: format!("concurrency limiter closed: {}", e),
                }),
            None => Ok(None),
        }
    }

    async fn analyze(&self, task: TaskId, sequence: &str) -> TaskOutcome<AnalysisResult> {
        let _permit = self.permit(task).await?;
        self.engine
            .analyze(&self.ctx, sequence, &self.organism)
            .await
            .map_err(|source| OrchestrationError::Transport { task, source })
    }

    /// Optimize; an engine rejection is returned as `EngineFailure`
    async fn optimize(
        &self,
        variant: usize,
        sequence: &str,
        parameters: &[OptimizationParameter],
    ) -> TaskOutcome<OptimizationOutcome> {
        let task = TaskId::Optimize { variant };
        let _permit = self.permit(task).await?;
        let outcome = self
            .engine
            .optimize(&self.ctx, sequence, parameters)
            .await
            .map_err(|source| OrchestrationError::Transport { task, source })?;
        match outcome {
            OptimizationOutcome::Failure(failure) => {
                Err(OrchestrationError::EngineFailure { task, failure })
            }
            success => Ok(success),
        }
    }
}

/// Inputs of one run, shared by every task
struct Batch {
    dispatch: Dispatch,
    sequence: Arc<Sequence>,
    cds: Arc<str>,
    parameters: Arc<[OptimizationParameter]>,
}

impl Batch {
    /// Baseline regions to analyze with their sequences
    fn baseline_regions(&self) -> Vec<(SequenceRegion, String)> {
        let mut regions = vec![(SequenceRegion::Cds, self.cds.to_string())];
        if !self.sequence.five_prime_utr().is_empty() {
            regions.push((
                SequenceRegion::FivePrimeUtr,
                self.sequence.five_prime_utr().to_string(),
            ));
        }
        if !self.sequence.three_prime_utr().is_empty() {
            regions.push((
                SequenceRegion::ThreePrimeUtr,
                self.sequence.three_prime_utr().to_string(),
            ));
        }
        regions.push((
            SequenceRegion::FullSequence,
            self.sequence.full_sequence(&self.cds),
        ));
        regions
    }
}

enum TaskOutput {
    Baseline(SequenceRegion, AnalysisResult),
    Variant(usize, VariantResult),
}

enum SettledOutput {
    Baseline(SequenceRegion, TaskOutcome<AnalysisResult>),
    Variant(usize, SettledVariant),
}

type Completed<T> = (TaskId, Duration, T);

/// Run `work` as task `task`, timing it and turning a panic into a task failure
fn guarded<T, F>(
    task: TaskId,
    work: F,
    on_panic: impl FnOnce(OrchestrationError) -> T + Send + 'static,
) -> impl std::future::Future<Output = Completed<T>> + Send + 'static
where
    T: Send + 'static,
    F: std::future::Future<Output = T> + Send + 'static,
{
    async move {
        let start = Instant::now();
        let output = match AssertUnwindSafe(work).catch_unwind().await {
            Ok(output) => output,
            Err(_) => on_panic(OrchestrationError::Task {
                task: Some(task),
                msg: "task panicked".to_string(),
            }),
        };
        (task, start.elapsed(), output)
    }
}

/// Optimize, then analyze the result's CDS and assembled sequence in parallel
async fn variant_pipeline(batch: Arc<Batch>, variant: usize) -> TaskOutcome<VariantResult> {
    let outcome = batch
        .dispatch
        .optimize(variant, &batch.cds, &batch.parameters)
        .await?;
    let optimized = outcome.sequence().unwrap_or_default().to_string();
    let full = batch.sequence.full_sequence(&optimized);

    let (cds_analysis, full_sequence_analysis) = tokio::try_join!(
        batch.dispatch.analyze(
            TaskId::VariantAnalysis {
                variant,
                region: SequenceRegion::Cds
            },
            &optimized
        ),
        batch.dispatch.analyze(
            TaskId::VariantAnalysis {
                variant,
                region: SequenceRegion::FullSequence
            },
            &full
        ),
    )?;

    Ok(VariantResult {
        outcome,
        cds_analysis: Some(cds_analysis),
        full_sequence_analysis: Some(full_sequence_analysis),
    })
}

/// Like [`variant_pipeline`], but every step's outcome is kept
async fn settled_variant_pipeline(batch: Arc<Batch>, variant: usize) -> SettledVariant {
    let outcome = batch
        .dispatch
        .optimize(variant, &batch.cds, &batch.parameters)
        .await;
    let optimized = outcome
        .as_ref()
        .ok()
        .and_then(|o| o.sequence())
        .map(str::to_string);
    let Some(optimized) = optimized else {
        return SettledVariant {
            outcome,
            cds_analysis: None,
            full_sequence_analysis: None,
        };
    };
    let full = batch.sequence.full_sequence(&optimized);

    let (cds_analysis, full_sequence_analysis) = tokio::join!(
        batch.dispatch.analyze(
            TaskId::VariantAnalysis {
                variant,
                region: SequenceRegion::Cds
            },
            &optimized
        ),
        batch.dispatch.analyze(
            TaskId::VariantAnalysis {
                variant,
                region: SequenceRegion::FullSequence
            },
            &full
        ),
    );

    SettledVariant {
        outcome,
        cds_analysis: Some(cds_analysis),
        full_sequence_analysis: Some(full_sequence_analysis),
    }
}

/// Drives engine calls for optimization runs
pub struct Orchestrator {
    engine: Arc<dyn OptimizationEngine>,
    limiter: Option<Arc<Semaphore>>,
}

impl Orchestrator {
    /// Orchestrator with no bound on in-flight calls
    pub fn new(engine: Arc<dyn OptimizationEngine>) -> Self {
        Self {
            engine,
            limiter: None,
        }
    }

    pub fn from_config(engine: Arc<dyn OptimizationEngine>, config: &OrchestrationConfig) -> Self {
        let orchestrator = Self::new(engine);
        match config.max_concurrent_calls {
            Some(max) => orchestrator.with_max_concurrent_calls(max),
            None => orchestrator,
        }
    }

    /// Bound the number of engine calls in flight at once
    pub fn with_max_concurrent_calls(mut self, max: usize) -> Self {
        self.limiter = Some(Arc::new(Semaphore::new(max.max(1))));
        self
    }

    pub fn engine(&self) -> &Arc<dyn OptimizationEngine> {
        &self.engine
    }

    /// Validate the count, resolve the CDS and prepare the shared batch state
    async fn prepare(
        &self,
        ctx: &RequestContext,
        request: &OptimizationRequest,
        number_of_sequences: usize,
    ) -> Result<Arc<Batch>, OrchestrationError> {
        validate_number_of_sequences(number_of_sequences).map_err(OrchestrationError::Validation)?;

        let organism = request.organism();
        tracing::info!(
            engine = self.engine.name(),
            variants = number_of_sequences,
            regions = request.parameters().len(),
            organism,
            user = ctx.user().unwrap_or("-"),
            "starting optimization run"
        );

        let cds = request
            .sequence()
            .to_nucleic_acid(self.engine.as_ref(), ctx, organism)
            .await?
            .to_string();
        if request.sequence().coding_sequence_type() == SequenceType::AminoAcid {
            tracing::info!(nucleotides = cds.len(), "converted amino acid sequence");
        }

        Ok(Arc::new(Batch {
            dispatch: Dispatch {
                engine: Arc::clone(&self.engine),
                ctx: ctx.clone(),
                organism: Arc::from(organism),
                limiter: self.limiter.clone(),
            },
            sequence: Arc::new(request.sequence().clone()),
            cds: Arc::from(cds),
            parameters: Arc::from(request.parameters()),
        }))
    }

    /// Run with fail-fast semantics
    ///
    /// Resolves only when every call has succeeded. The first failure aborts
    /// all outstanding calls and is returned with its own class: an engine
    /// rejection stays an [`OrchestrationError::EngineFailure`], a transport
    /// problem stays an [`OrchestrationError::Transport`].
    pub async fn run(
        &self,
        ctx: &RequestContext,
        request: &OptimizationRequest,
        number_of_sequences: usize,
    ) -> Result<AggregatedResult, OrchestrationError> {
        let start = Instant::now();
        let batch = self.prepare(ctx, request, number_of_sequences).await?;

        let mut tasks: JoinSet<Completed<TaskOutcome<TaskOutput>>> = JoinSet::new();
        for (region, sequence) in batch.baseline_regions() {
            let batch = Arc::clone(&batch);
            let task = TaskId::BaselineAnalysis { region };
            tasks.spawn(guarded(
                task,
                async move {
                    batch
                        .dispatch
                        .analyze(task, &sequence)
                        .await
                        .map(|analysis| TaskOutput::Baseline(region, analysis))
                },
                Err,
            ));
        }
        for variant in 0..number_of_sequences {
            let batch = Arc::clone(&batch);
            tasks.spawn(guarded(
                TaskId::Optimize { variant },
                async move {
                    variant_pipeline(batch, variant)
                        .await
                        .map(|result| TaskOutput::Variant(variant, result))
                },
                Err,
            ));
        }

        let mut cds = None;
        let mut five_prime_utr = None;
        let mut three_prime_utr = None;
        let mut full_sequence = None;
        let mut variants: Vec<Option<VariantResult>> = vec![None; number_of_sequences];

        while let Some(joined) = tasks.join_next().await {
            let (task, elapsed, output) = match joined {
                Ok(completed) => completed,
                Err(e) => {
                    tasks.abort_all();
                    return Err(OrchestrationError::Task {
                        task: None,
                        msg: e.to_string(),
                    });
                }
            };
            match output {
                Ok(TaskOutput::Baseline(region, analysis)) => {
                    tracing::debug!(%task, elapsed_ms = elapsed.as_millis() as u64, "task completed");
                    match region {
                        SequenceRegion::Cds => cds = Some(analysis),
                        SequenceRegion::FivePrimeUtr => five_prime_utr = Some(analysis),
                        SequenceRegion::ThreePrimeUtr => three_prime_utr = Some(analysis),
                        SequenceRegion::FullSequence => full_sequence = Some(analysis),
                    }
                }
                Ok(TaskOutput::Variant(variant, result)) => {
                    tracing::debug!(%task, elapsed_ms = elapsed.as_millis() as u64, "task completed");
                    variants[variant] = Some(result);
                }
                Err(err) => {
                    tracing::warn!(
                        task = %err.task().unwrap_or(task),
                        error = %err,
                        "engine call failed, aborting run"
                    );
                    tasks.abort_all();
                    return Err(err);
                }
            }
        }

        let missing = |region: SequenceRegion| OrchestrationError::Task {
            task: Some(TaskId::BaselineAnalysis { region }),
            msg: "no result was produced".to_string(),
        };
        let baseline = BaselineAnalyses {
            cds: cds.ok_or_else(|| missing(SequenceRegion::Cds))?,
            five_prime_utr,
            three_prime_utr,
            full_sequence: full_sequence.ok_or_else(|| missing(SequenceRegion::FullSequence))?,
        };
        let variants = variants
            .into_iter()
            .enumerate()
            .map(|(variant, result)| {
                result.ok_or(OrchestrationError::Task {
                    task: Some(TaskId::Optimize { variant }),
                    msg: "no result was produced".to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            variants = variants.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "optimization run completed"
        );
        Ok(AggregatedResult { baseline, variants })
    }

    /// Run with settle-all semantics
    ///
    /// Every call runs to completion. Only failures before the batch is
    /// dispatched (invalid variant count, conversion) are returned as `Err`.
    pub async fn run_settled(
        &self,
        ctx: &RequestContext,
        request: &OptimizationRequest,
        number_of_sequences: usize,
    ) -> Result<SettledResult, OrchestrationError> {
        let start = Instant::now();
        let batch = self.prepare(ctx, request, number_of_sequences).await?;

        let mut tasks: JoinSet<Completed<SettledOutput>> = JoinSet::new();
        for (region, sequence) in batch.baseline_regions() {
            let batch = Arc::clone(&batch);
            let task = TaskId::BaselineAnalysis { region };
            tasks.spawn(guarded(
                task,
                async move {
                    SettledOutput::Baseline(region, batch.dispatch.analyze(task, &sequence).await)
                },
                move |err| SettledOutput::Baseline(region, Err(err)),
            ));
        }
        for variant in 0..number_of_sequences {
            let batch = Arc::clone(&batch);
            tasks.spawn(guarded(
                TaskId::Optimize { variant },
                async move {
                    SettledOutput::Variant(variant, settled_variant_pipeline(batch, variant).await)
                },
                move |err| {
                    SettledOutput::Variant(
                        variant,
                        SettledVariant {
                            outcome: Err(err),
                            cds_analysis: None,
                            full_sequence_analysis: None,
                        },
                    )
                },
            ));
        }

        let mut cds = None;
        let mut five_prime_utr = None;
        let mut three_prime_utr = None;
        let mut full_sequence = None;
        let mut variants: Vec<Option<SettledVariant>> =
            (0..number_of_sequences).map(|_| None).collect();

        while let Some(joined) = tasks.join_next().await {
            let (task, elapsed, output) = match joined {
                Ok(completed) => completed,
                Err(e) => {
                    tracing::warn!(error = %e, "engine task did not complete");
                    continue;
                }
            };
            tracing::debug!(%task, elapsed_ms = elapsed.as_millis() as u64, "task settled");
            match output {
                SettledOutput::Baseline(region, outcome) => {
                    if let Err(err) = &outcome {
                        tracing::warn!(%task, error = %err, "baseline analysis failed");
                    }
                    match region {
                        SequenceRegion::Cds => cds = Some(outcome),
                        SequenceRegion::FivePrimeUtr => five_prime_utr = Some(outcome),
                        SequenceRegion::ThreePrimeUtr => three_prime_utr = Some(outcome),
                        SequenceRegion::FullSequence => full_sequence = Some(outcome),
                    }
                }
                SettledOutput::Variant(variant, settled) => {
                    if let Err(err) = &settled.outcome {
                        tracing::warn!(%task, error = %err, "optimization failed");
                    }
                    variants[variant] = Some(settled);
                }
            }
        }

        let unsettled = |task: TaskId| OrchestrationError::Task {
            task: Some(task),
            msg: "task did not complete".to_string(),
        };
        let has_five = !batch.sequence.five_prime_utr().is_empty();
        let has_three = !batch.sequence.three_prime_utr().is_empty();
        let baseline = SettledBaseline {
            cds: cds.unwrap_or_else(|| {
                Err(unsettled(TaskId::BaselineAnalysis {
                    region: SequenceRegion::Cds,
                }))
            }),
            five_prime_utr: five_prime_utr.or_else(|| {
                has_five.then(|| {
                    Err(unsettled(TaskId::BaselineAnalysis {
                        region: SequenceRegion::FivePrimeUtr,
                    }))
                })
            }),
            three_prime_utr: three_prime_utr.or_else(|| {
                has_three.then(|| {
                    Err(unsettled(TaskId::BaselineAnalysis {
                        region: SequenceRegion::ThreePrimeUtr,
                    }))
                })
            }),
            full_sequence: full_sequence.unwrap_or_else(|| {
                Err(unsettled(TaskId::BaselineAnalysis {
                    region: SequenceRegion::FullSequence,
                }))
            }),
        };
        let variants: Vec<SettledVariant> = variants
            .into_iter()
            .enumerate()
            .map(|(variant, settled)| {
                settled.unwrap_or_else(|| SettledVariant {
                    outcome: Err(unsettled(TaskId::Optimize { variant })),
                    cds_analysis: None,
                    full_sequence_analysis: None,
                })
            })
            .collect();

        let result = SettledResult { baseline, variants };
        tracing::info!(
            variants = result.variants.len(),
            failures = result.failures().len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "optimization run settled"
        );
        Ok(result)
    }
}
