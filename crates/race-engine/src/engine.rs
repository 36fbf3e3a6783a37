//! The scheduler: resolves participants, fans out, selects a winner

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use race_core::{GenerationOptions, Provider, RaceContext, RaceError};
use tokio::sync::{RwLock, mpsc};
use tokio::time::{Instant, timeout_at};

use crate::config::{RaceConfig, Strategy};
use crate::metrics::{MetricEvent, MetricEventType, SharedCollector, emit};
use crate::stream::{RaceAnnotation, RacingStream};
use crate::strategy::{self, RaceResult, Selection, SelectionError};
use crate::tracker::PerformanceTracker;

const ENGINE_NAME: &str = "race-engine";
const ENGINE_TYPE: &str = "virtual";

/// A model entry surfaced via `get_models`
#[derive(Debug, Clone)]
pub struct ModelEntry {
    /// Virtual model identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Always `"virtual"`: the engine's own type tag
    pub provider: String,
    /// Description
    pub description: String,
}

/// Aggregate counters across the engine and every attached provider
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineMetrics {
    /// Total races dispatched by this engine (including configuration failures)
    pub requests: u64,
    /// Summed provider request counters
    pub provider_requests: u64,
    /// Summed provider success counters
    pub provider_successes: u64,
    /// Summed provider error counters
    pub provider_errors: u64,
    /// Summed provider token counters
    pub provider_tokens: u64,
    /// `sum(total_latency_ms) / sum(successes)` across providers, or 0.0
    pub provider_average_latency_ms: f64,
}

struct EngineState {
    providers: Vec<Arc<dyn Provider>>,
    config: RaceConfig,
    collector: SharedCollector,
}

/// The virtual-provider racing engine
pub struct RaceEngine {
    state: RwLock<EngineState>,
    tracker: PerformanceTracker,
    request_count: AtomicU64,
}

impl RaceEngine {
    /// Construct an engine with no attached providers and default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(EngineState {
                providers: Vec::new(),
                config: RaceConfig::default(),
                collector: None,
            }),
            tracker: PerformanceTracker::new(),
            request_count: AtomicU64::new(0),
        }
    }

    /// Install a snapshot of provider handles, replacing any previously attached
    pub async fn attach_providers(&self, providers: Vec<Arc<dyn Provider>>) {
        self.state.write().await.providers = providers;
    }

    /// Install or clear the metric event sink
    pub async fn set_metrics_collector(&self, collector: SharedCollector) {
        self.state.write().await.collector = collector;
    }

    /// Validate and swap in a new configuration
    ///
    /// # Errors
    ///
    /// Rejects an invalid configuration, leaving the previous one in effect.
    pub async fn configure(&self, config: RaceConfig) -> Result<(), RaceError> {
        config
            .validate()
            .map_err(|err| RaceError::Configuration(err.to_string()))?;
        self.state.write().await.config = config;
        Ok(())
    }

    /// Access the shared performance tracker (e.g. to pre-seed scores in tests)
    #[must_use]
    pub const fn tracker(&self) -> &PerformanceTracker {
        &self.tracker
    }

    /// List available virtual models, sorted by identifier
    pub async fn get_models(&self) -> Vec<ModelEntry> {
        let state = self.state.read().await;
        let mut entries: Vec<_> = state
            .config
            .virtual_models
            .iter()
            .map(|(id, model)| ModelEntry {
                id: id.clone(),
                name: model.display_name.clone(),
                provider: ENGINE_TYPE.to_owned(),
                description: model.description.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }

    /// The identifier `configure`'s `default_virtual_model` names, falling back
    /// to the alphabetically first virtual model, or empty if none exist
    pub async fn get_default_model(&self) -> String {
        self.state.read().await.config.default_model_id().to_owned()
    }

    /// Aggregate health: ok if at least one attached provider reports ok
    ///
    /// # Errors
    ///
    /// Returns an error describing why no provider is usable.
    pub async fn health_check(&self, ctx: &RaceContext) -> Result<(), RaceError> {
        let providers = self.state.read().await.providers.clone();
        if providers.is_empty() {
            return Err(RaceError::Configuration("no providers configured".to_owned()));
        }

        let mut last_error = None;
        for provider in &providers {
            match provider.health_check(ctx).await {
                Ok(()) => return Ok(()),
                Err(err) => last_error = Some(err.to_string()),
            }
        }

        Err(RaceError::AllFailed(format!(
            "all providers unhealthy: {}",
            last_error.unwrap_or_default()
        )))
    }

    /// Aggregate metrics across the engine and every attached provider
    pub async fn get_metrics(&self) -> EngineMetrics {
        let providers = self.state.read().await.providers.clone();
        let mut metrics = EngineMetrics {
            requests: self.request_count.load(Ordering::Relaxed),
            ..EngineMetrics::default()
        };

        for provider in &providers {
            let reported = provider.report_own_metrics();
            metrics.provider_requests += reported.requests;
            metrics.provider_successes += reported.successes;
            metrics.provider_errors += reported.errors;
            metrics.provider_tokens += reported.tokens;
        }

        if metrics.provider_successes > 0 {
            let total_latency: u64 = providers
                .iter()
                .map(|p| p.report_own_metrics().total_latency_ms)
                .sum();
            metrics.provider_average_latency_ms = total_latency as f64 / metrics.provider_successes as f64;
        }

        metrics
    }

    /// Race the attached providers (or the options' named virtual model) and
    /// return the winning stream, annotated with race metadata
    ///
    /// # Errors
    ///
    /// See §7: configuration, all-participants-failed, no-candidates, and
    /// context-cancellation errors are all possible.
    pub async fn generate(
        &self,
        ctx: &RaceContext,
        options: GenerationOptions,
    ) -> Result<RacingStream, RaceError> {
        self.request_count.fetch_add(1, Ordering::Relaxed);

        let (providers, config, collector) = {
            let state = self.state.read().await;
            (state.providers.clone(), state.config.clone(), state.collector.clone())
        };

        if providers.is_empty() {
            return Err(RaceError::Configuration("no providers configured".to_owned()));
        }

        let plan = resolve(&config, &options, &providers)?;

        emit(
            &collector,
            MetricEvent {
                model_id: plan.model_label.clone(),
                timestamp_ms: now_ms(),
                ..MetricEvent::new(MetricEventType::RequestStarted, ENGINE_NAME, ENGINE_TYPE)
            },
        )
        .await;
        tracing::info!(
            virtual_model = plan.model_label.as_str(),
            participants = plan.participants.len(),
            "race started"
        );

        let deadline = Instant::now() + std::time::Duration::from_millis(plan.timeout_ms);
        let race_ctx = ctx.child();

        let (tx, rx) = mpsc::channel(plan.participants.len());
        for (provider, participant_options) in plan.participants.clone() {
            let tx = tx.clone();
            let race_ctx = race_ctx.child();
            tokio::spawn(async move {
                let start = Instant::now();
                let outcome = run_participant(provider.as_ref(), &race_ctx, &participant_options, deadline).await;
                let latency_ms = start.elapsed().as_millis() as u64;
                tracing::debug!(
                    provider = provider.name(),
                    latency_ms,
                    ok = outcome.is_ok(),
                    "participant completed"
                );
                let _ = tx
                    .send(RaceResult {
                        provider: provider.name().to_owned(),
                        latency_ms,
                        outcome,
                    })
                    .await;
            });
        }
        drop(tx);

        let selection = strategy::select(plan.strategy, rx, &self.tracker, &race_ctx, config.defaults.grace_period_ms).await;
        race_ctx.cancel();

        match selection {
            Ok(selection) => {
                self.on_success(&collector, &plan, &selection).await;
                Ok(RacingStream::new(
                    selection.stream,
                    RaceAnnotation {
                        winner: selection.winner,
                        latency_ms: selection.latency_ms,
                        virtual_model: plan.display_name.clone(),
                        virtual_model_desc: plan.description.clone(),
                    },
                ))
            }
            Err(selection_error) => {
                self.on_failure(&collector, &plan, &selection_error).await;
                Err(to_race_error(selection_error))
            }
        }
    }

    async fn on_success(&self, collector: &SharedCollector, plan: &Plan, selection: &Selection) {
        emit(
            collector,
            MetricEvent {
                model_id: plan.model_label.clone(),
                timestamp_ms: now_ms(),
                race_participants: selection.participants.clone(),
                race_latencies_ms: selection.latencies_ms.clone(),
                race_winner: Some(selection.winner.clone()),
                latency_ms: Some(selection.latency_ms),
                ..MetricEvent::new(MetricEventType::RaceComplete, ENGINE_NAME, ENGINE_TYPE)
            },
        )
        .await;

        emit(
            collector,
            MetricEvent {
                model_id: plan.model_label.clone(),
                timestamp_ms: now_ms(),
                to_provider: Some(selection.winner.clone()),
                switch_reason: Some(selection.switch_reason.to_owned()),
                ..MetricEvent::new(MetricEventType::ProviderSwitch, ENGINE_NAME, ENGINE_TYPE)
            },
        )
        .await;
        tracing::warn!(winner = selection.winner.as_str(), reason = selection.switch_reason, "provider switch");

        let mut success_metadata = serde_json::Map::new();
        success_metadata.insert("winner".to_owned(), serde_json::Value::String(selection.winner.clone()));
        emit(
            collector,
            MetricEvent {
                model_id: plan.model_label.clone(),
                timestamp_ms: now_ms(),
                latency_ms: Some(selection.latency_ms),
                race_winner: Some(selection.winner.clone()),
                metadata: success_metadata,
                ..MetricEvent::new(MetricEventType::Success, ENGINE_NAME, ENGINE_TYPE)
            },
        )
        .await;
        tracing::info!(winner = selection.winner.as_str(), latency_ms = selection.latency_ms, "race succeeded");
    }

    async fn on_failure(&self, collector: &SharedCollector, plan: &Plan, error: &SelectionError) {
        let error_type = match error {
            SelectionError::AllFailed(_) => "race_all_failed",
            SelectionError::NoCandidates => "race_no_candidates",
            SelectionError::ContextCancelled => "race_no_candidates",
        };
        let error_message = match error {
            SelectionError::AllFailed(msg) => msg.clone(),
            SelectionError::NoCandidates => "no successful candidates".to_owned(),
            SelectionError::ContextCancelled => "race cancelled".to_owned(),
        };

        emit(
            collector,
            MetricEvent {
                model_id: plan.model_label.clone(),
                timestamp_ms: now_ms(),
                error_type: Some(error_type.to_owned()),
                error_message: Some(error_message.clone()),
                ..MetricEvent::new(MetricEventType::Error, ENGINE_NAME, ENGINE_TYPE)
            },
        )
        .await;
        tracing::warn!(error = error_message.as_str(), "race failed");
    }
}

impl Default for RaceEngine {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_participant(
    provider: &dyn Provider,
    ctx: &RaceContext,
    options: &GenerationOptions,
    deadline: Instant,
) -> Result<race_core::ChunkStream, anyhow::Error> {
    tokio::select! {
        () = ctx.cancelled() => Err(anyhow::anyhow!("cancelled")),
        result = timeout_at(deadline, provider.generate_chat_completion(ctx, options)) => {
            match result {
                Ok(Ok(stream)) => Ok(stream),
                Ok(Err(err)) => Err(anyhow::Error::new(err)),
                Err(_elapsed) => Err(anyhow::anyhow!("deadline exceeded")),
            }
        }
    }
}

struct Plan {
    participants: Vec<(Arc<dyn Provider>, GenerationOptions)>,
    strategy: Strategy,
    timeout_ms: u64,
    model_label: String,
    display_name: Option<String>,
    description: Option<String>,
}

fn resolve(
    config: &RaceConfig,
    options: &GenerationOptions,
    providers: &[Arc<dyn Provider>],
) -> Result<Plan, RaceError> {
    if config.has_virtual_models() {
        let resolved = config
            .resolve(&options.model)
            .ok_or_else(|| RaceError::Configuration(format!("virtual model not found: {}", options.model)))?;

        let mut participants = Vec::new();
        for participant in &resolved.model().providers {
            let provider = providers
                .iter()
                .find(|p| p.name() == participant.name)
                .ok_or_else(|| RaceError::Configuration(format!("provider not attached: {}", participant.name)))?;
            let participant_options = match &participant.model {
                Some(model) => options.clone().with_model(model.clone()),
                None => options.clone(),
            };
            participants.push((Arc::clone(provider), participant_options));
        }

        if participants.is_empty() {
            return Err(RaceError::Configuration(format!(
                "virtual model {} resolved to zero participants",
                resolved.id
            )));
        }

        Ok(Plan {
            participants,
            strategy: resolved.effective_strategy(),
            timeout_ms: resolved.effective_timeout_ms(),
            model_label: resolved.id.to_owned(),
            display_name: Some(resolved.model().display_name.clone()).filter(|s| !s.is_empty()),
            description: Some(resolved.model().description.clone()).filter(|s| !s.is_empty()),
        })
    } else {
        let participants = providers
            .iter()
            .map(|p| (Arc::clone(p), options.clone()))
            .collect::<Vec<_>>();

        Ok(Plan {
            participants,
            strategy: config.defaults.strategy,
            timeout_ms: config.defaults.timeout_ms,
            model_label: "legacy_mode".to_owned(),
            display_name: None,
            description: None,
        })
    }
}

fn to_race_error(error: SelectionError) -> RaceError {
    match error {
        SelectionError::AllFailed(msg) => RaceError::AllFailed(msg),
        SelectionError::NoCandidates => RaceError::NoCandidates,
        SelectionError::ContextCancelled => RaceError::ContextCancelled,
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
