//! In-process mock `Provider` used by the end-to-end race scenarios
//!
//! Mirrors this lineage's own mock-backend test harness (an in-process stand-in
//! exercised directly rather than through a mocking framework), minus the HTTP
//! surface: the racing engine never speaks HTTP, so the mock just returns a
//! canned stream after a configurable delay.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;
use race_core::{ChunkStream, FinishReason, GenerationChunk, GenerationOptions, Provider, ProviderMetrics, RaceContext, RaceError};

/// A provider that either succeeds after `delay` with `content`, or fails after `delay`
pub struct MockProvider {
    name: String,
    delay: Duration,
    behavior: Behavior,
    calls: AtomicU64,
}

enum Behavior {
    Succeed(String),
    Fail,
}

impl MockProvider {
    /// A provider that responds with `content` after `delay`
    pub fn succeeding(name: &str, delay: Duration, content: &str) -> Self {
        Self {
            name: name.to_owned(),
            delay,
            behavior: Behavior::Succeed(content.to_owned()),
            calls: AtomicU64::new(0),
        }
    }

    /// A provider that errors after `delay`
    pub fn failing(name: &str, delay: Duration) -> Self {
        Self {
            name: name.to_owned(),
            delay,
            behavior: Behavior::Fail,
            calls: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn identify_type(&self) -> &str {
        "mock"
    }

    async fn generate_chat_completion(
        &self,
        ctx: &RaceContext,
        _options: &GenerationOptions,
    ) -> Result<ChunkStream, RaceError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        tokio::select! {
            () = ctx.cancelled() => Err(RaceError::ContextCancelled),
            () = tokio::time::sleep(self.delay) => match &self.behavior {
                Behavior::Succeed(content) => {
                    let chunk = GenerationChunk {
                        content: Some(content.clone()),
                        finish_reason: Some(FinishReason::Stop),
                        ..GenerationChunk::default()
                    };
                    let s: ChunkStream = Box::pin(stream::iter(vec![Ok(chunk)]));
                    Ok(s)
                }
                Behavior::Fail => Err(RaceError::ParticipantTransport {
                    provider: self.name.clone(),
                    source: anyhow::anyhow!("mock failure"),
                }),
            },
        }
    }

    async fn health_check(&self, _ctx: &RaceContext) -> Result<(), RaceError> {
        match &self.behavior {
            Behavior::Succeed(_) => Ok(()),
            Behavior::Fail => Err(RaceError::ParticipantTransport {
                provider: self.name.clone(),
                source: anyhow::anyhow!("mock unhealthy"),
            }),
        }
    }

    fn report_own_metrics(&self) -> ProviderMetrics {
        let calls = self.calls.load(Ordering::Relaxed);
        let succeeded = matches!(self.behavior, Behavior::Succeed(_));
        ProviderMetrics {
            requests: calls,
            successes: if succeeded { calls } else { 0 },
            errors: if succeeded { 0 } else { calls },
            tokens: 0,
            total_latency_ms: 0,
        }
    }
}
