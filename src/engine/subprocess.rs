//! Engine driven through its command-line front end
//!
//! Each call spawns `<program> <args..> <operation> <sequence> ... --format json`
//! and parses stdout. The child is killed if the call times out or the
//! awaiting future is dropped.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::time::timeout;

use crate::config::SubprocessConfig;
use crate::context::RequestContext;
use crate::engine::types::{parse_conversion, AnalysisResult, OptimizationOutcome};
use crate::engine::{OptimizationEngine, Operation, TransportError};
use crate::parameter::OptimizationParameter;

/// Environment variable carrying the caller's user identifier
pub const USER_ENV_VAR: &str = "MRNA_ENGINE_USER";

/// Subprocess-backed engine
#[derive(Debug, Clone)]
pub struct SubprocessEngine {
    config: SubprocessConfig,
}

impl SubprocessEngine {
    pub fn new(config: SubprocessConfig) -> Self {
        Self { config }
    }

    fn timeout_for(&self, operation: Operation) -> u64 {
        match operation {
            Operation::Convert => self.config.convert_timeout_seconds,
            Operation::Analyze => self.config.analyze_timeout_seconds,
            Operation::Optimize => self.config.optimize_timeout_seconds,
        }
    }

    fn command(&self, ctx: &RequestContext, operation: Operation, args: &[&str]) -> Command {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .arg(operation.as_str())
            .args(args)
            .args(["--format", "json"])
            .envs(&self.config.env_vars)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }
        if let Some(user) = ctx.user() {
            command.env(USER_ENV_VAR, user);
        }
        command
    }

    /// Run one engine invocation and return its stdout
    async fn run(
        &self,
        ctx: &RequestContext,
        operation: Operation,
        args: &[&str],
    ) -> Result<Vec<u8>, TransportError> {
        let seconds = self.timeout_for(operation);
        let start = Instant::now();
        tracing::debug!(
            program = %self.config.program,
            %operation,
            timeout_seconds = seconds,
            "invoking engine subprocess"
        );

        let child = self
            .command(ctx, operation, args)
            .spawn()
            .map_err(|e| TransportError::Spawn {
                operation,
                msg: format!("{}: {}", self.config.program, e),
            })?;

        let output = match timeout(Duration::from_secs(seconds), child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(TransportError::ProcessFailed {
                    operation,
                    code: None,
                    stderr: e.to_string(),
                })
            }
            Err(_) => return Err(TransportError::Timeout { operation, seconds }),
        };

        tracing::debug!(
            %operation,
            elapsed_ms = start.elapsed().as_millis() as u64,
            status = ?output.status.code(),
            "engine subprocess finished"
        );

        if !output.status.success() {
            return Err(TransportError::ProcessFailed {
                operation,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

#[async_trait::async_trait]
impl OptimizationEngine for SubprocessEngine {
    async fn convert(
        &self,
        ctx: &RequestContext,
        sequence: &str,
        organism: &str,
    ) -> Result<String, TransportError> {
        let stdout = self
            .run(
                ctx,
                Operation::Convert,
                &[sequence, "--sequence-type", "amino-acid", "--organism", organism],
            )
            .await?;
        parse_conversion(&stdout)
    }

    async fn analyze(
        &self,
        ctx: &RequestContext,
        sequence: &str,
        organism: &str,
    ) -> Result<AnalysisResult, TransportError> {
        let stdout = self
            .run(ctx, Operation::Analyze, &[sequence, "--organism", organism])
            .await?;
        AnalysisResult::from_json(&stdout)
    }

    async fn optimize(
        &self,
        ctx: &RequestContext,
        sequence: &str,
        parameters: &[OptimizationParameter],
    ) -> Result<OptimizationOutcome, TransportError> {
        let config = serde_json::to_string(parameters)
            .map_err(|e| TransportError::malformed(Operation::Optimize, e.to_string()))?;
        let stdout = self
            .run(ctx, Operation::Optimize, &[sequence, "--config", &config])
            .await?;
        OptimizationOutcome::from_json(&stdout)
    }

    fn name(&self) -> &'static str {
        "subprocess"
    }
}
