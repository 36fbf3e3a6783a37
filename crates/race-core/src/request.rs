//! Canonical generation request passed to every racing participant

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Generation parameters common to every backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Names of tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
}

/// A generation request entering the racing engine
///
/// `model` names the virtual model to race under; an empty string selects
/// the engine's default virtual model (or legacy mode, if none are configured).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Virtual model identifier, or empty for the default
    #[serde(default)]
    pub model: String,
    /// Conversation messages
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Generation parameters
    #[serde(default)]
    pub params: GenerationParams,
    /// Whether the caller wants a streamed response
    #[serde(default = "default_stream")]
    pub stream: bool,
    /// Opaque caller-supplied metadata, echoed back in metric events
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

const fn default_stream() -> bool {
    true
}

impl GenerationOptions {
    /// Replace the model field, used when dispatching to a participant
    /// whose virtual-model entry names a per-provider model override
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}
