//! Engine reached over its HTTP API
//!
//! `POST {base_url}/api/{convert,analyze,optimize}` with a JSON body. The
//! caller's user, when present, is sent as the `user` query parameter.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::config::{ConfigError, HttpConfig};
use crate::context::RequestContext;
use crate::engine::types::{parse_conversion, AnalysisResult, OptimizationOutcome};
use crate::engine::{OptimizationEngine, Operation, TransportError};
use crate::parameter::OptimizationParameter;

#[derive(Serialize)]
struct SequenceRequest<'a> {
    sequence: &'a str,
    organism: &'a str,
}

#[derive(Serialize)]
struct OptimizeRequest<'a> {
    sequence: &'a str,
    parameters: &'a [OptimizationParameter],
}

/// HTTP-backed engine
#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: Client,
    base_url: Url,
    timeout_seconds: u64,
}

impl HttpEngine {
    /// Build the client from configuration
    pub fn new(config: &HttpConfig) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(&config.base_url)?;

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true);

        if let Some(pool) = &config.connection_pool {
            if let Some(max_idle) = pool.max_idle_per_host {
                builder = builder.pool_max_idle_per_host(max_idle);
            }
            if let Some(idle_timeout) = pool.idle_timeout_seconds {
                builder = builder.pool_idle_timeout(Duration::from_secs(idle_timeout));
            }
            if let Some(keep_alive) = pool.keep_alive_seconds {
                builder = builder.tcp_keepalive(Duration::from_secs(keep_alive));
            }
        }

        let client = builder
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            timeout_seconds: config.timeout_seconds,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, operation: Operation) -> Result<Url, TransportError> {
        self.base_url
            .join(&format!("api/{}", operation.as_str()))
            .map_err(|e| TransportError::Unavailable {
                operation,
                msg: e.to_string(),
            })
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        ctx: &RequestContext,
        operation: Operation,
        body: &B,
    ) -> Result<Vec<u8>, TransportError> {
        let url = self.endpoint(operation)?;
        let start = Instant::now();
        tracing::debug!(%url, %operation, "posting engine request");

        let mut request = self.client.post(url).json(body);
        if let Some(user) = ctx.user() {
            request = request.query(&[("user", user)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.classify(operation, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.classify(operation, e))?;

        tracing::debug!(
            %operation,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "engine response received"
        );

        if !status.is_success() {
            return Err(TransportError::Http {
                operation,
                status: Some(status.as_u16()),
                msg: String::from_utf8_lossy(&body).trim().to_string(),
            });
        }
        Ok(body.to_vec())
    }

    fn classify(&self, operation: Operation, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                operation,
                seconds: self.timeout_seconds,
            }
        } else if err.is_connect() {
            TransportError::Unavailable {
                operation,
                msg: err.to_string(),
            }
        } else {
            TransportError::Http {
                operation,
                status: err.status().map(|s| s.as_u16()),
                msg: err.to_string(),
            }
        }
    }
}

/// Parse and validate a base URL, forcing a trailing slash so joins append
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw)
        .map_err(|e| ConfigError::Invalid(format!("invalid base_url '{}': {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(format!(
            "base_url must use http or https, got scheme: {}",
            url.scheme()
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait::async_trait]
impl OptimizationEngine for HttpEngine {
    async fn convert(
        &self,
        ctx: &RequestContext,
        sequence: &str,
        organism: &str,
    ) -> Result<String, TransportError> {
        let body = self
            .post(ctx, Operation::Convert, &SequenceRequest { sequence, organism })
            .await?;
        parse_conversion(&body)
    }

    async fn analyze(
        &self,
        ctx: &RequestContext,
        sequence: &str,
        organism: &str,
    ) -> Result<AnalysisResult, TransportError> {
        let body = self
            .post(ctx, Operation::Analyze, &SequenceRequest { sequence, organism })
            .await?;
        AnalysisResult::from_json(&body)
    }

    async fn optimize(
        &self,
        ctx: &RequestContext,
        sequence: &str,
        parameters: &[OptimizationParameter],
    ) -> Result<OptimizationOutcome, TransportError> {
        let body = self
            .post(
                ctx,
                Operation::Optimize,
                &OptimizeRequest {
                    sequence,
                    parameters,
                },
            )
            .await?;
        OptimizationOutcome::from_json(&body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
