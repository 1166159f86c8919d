// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT

//! Rate limiting and retry-with-backoff around a [`ModelProvider`].
//!
//! Both concerns sit in front of the provider rather than inside any one
//! driver implementation, so a tool-calling agent and a code agent sharing
//! the same provider instance share the same call budget.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;

use crate::catalog::{InputModality, ModelCatalogEntry};
use crate::provider::{ModelProvider, ResponseStream};
use crate::CompletionRequest;

/// Enforces a minimum interval between calls so that `requests_per_minute`
/// requests are never exceeded. The first call never sleeps.
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `requests_per_minute == 0` disables limiting entirely.
    pub fn new(requests_per_minute: u32) -> Self {
        let min_interval = if requests_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(60.0 / requests_per_minute as f64)
        };
        Self { min_interval, last_call: Mutex::new(None) }
    }

    /// Sleeps if necessary to respect the configured rate, then records this
    /// call as the new "last call" time.
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let wait = {
            let mut last = self.last_call.lock().expect("rate limiter mutex poisoned");
            let now = Instant::now();
            let wait = match *last {
                Some(prev) => self.min_interval.saturating_sub(now.duration_since(prev)),
                None => Duration::ZERO,
            };
            *last = Some(now + wait);
            wait
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

/// Exponential backoff policy for transient generation failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub wait_seconds: f64,
    pub exponential_base: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, wait_seconds: 1.0, exponential_base: 2.0 }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt` (0-indexed retry count, not counting
    /// the first try), including +/-20% jitter.
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.wait_seconds * self.exponential_base.powi(attempt as i32);
        let jitter = rand::thread_rng().gen_range(-0.2..0.2);
        let seconds = (base * (1.0 + jitter)).max(0.0);
        Duration::from_secs_f64(seconds)
    }
}

/// Returns true if `error`'s message looks like a rate-limit response: an
/// HTTP 429 status or a body matching `rate limit|too many requests`
/// (case-insensitive). Only errors shaped like this are retried; anything
/// else (400s, auth failures, parse errors) bypasses retry and fails fast.
fn is_rate_limit_error(error: &anyhow::Error) -> bool {
    let text = error.to_string();
    if text.contains("429") {
        return true;
    }
    let lower = text.to_lowercase();
    lower.contains("rate limit") || lower.contains("too many requests")
}

/// Wraps a [`ModelProvider`] with rate limiting and retry-with-backoff.
///
/// Retries cover the initial request (connection errors, non-2xx responses,
/// anything surfaced before the first byte of the stream). A failure that
/// occurs mid-stream is not retried here — the driver that owns the
/// conversation turn decides whether to resubmit a fresh request. Only
/// rate-limit-shaped errors (HTTP 429, or a body matching `rate limit|too
/// many requests`) are retried; every other error bypasses retry and is
/// returned immediately.
pub struct RetryingProvider {
    inner: Box<dyn ModelProvider>,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl RetryingProvider {
    pub fn new(inner: Box<dyn ModelProvider>, requests_per_minute: u32, retry: RetryPolicy) -> Self {
        Self { inner, limiter: RateLimiter::new(requests_per_minute), retry }
    }
}

#[async_trait]
impl ModelProvider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<ResponseStream> {
        let mut attempt = 0;
        loop {
            self.limiter.acquire().await;
            match self.inner.complete(req.clone()).await {
                Ok(stream) => return Ok(stream),
                Err(e) if is_rate_limit_error(&e) && attempt + 1 < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(attempt, error = %e, delay_secs = delay.as_secs_f64(), "rate limited, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if is_rate_limit_error(&e) => {
                    return Err(e.context("generation failed after retry exhaustion"))
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn generate_stream(&self, req: CompletionRequest) -> anyhow::Result<ResponseStream> {
        self.complete(req).await
    }

    async fn list_models(&self) -> anyhow::Result<Vec<ModelCatalogEntry>> {
        self.inner.list_models().await
    }

    fn catalog_max_output_tokens(&self) -> Option<u32> {
        self.inner.catalog_max_output_tokens()
    }

    fn catalog_context_window(&self) -> Option<u32> {
        self.inner.catalog_context_window()
    }

    async fn probe_context_window(&self) -> Option<u32> {
        self.inner.probe_context_window().await
    }

    fn input_modalities(&self) -> Vec<InputModality> {
        self.inner.input_modalities()
    }

    fn supports_images(&self) -> bool {
        self.inner.supports_images()
    }
}
