//! Streaming response chunk produced by a provider and annotated by the engine

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reason generation stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model reached a natural stopping point
    Stop,
    /// The response was truncated at `max_tokens`
    Length,
    /// The model invoked a tool
    ToolCalls,
    /// Generation was stopped by content filtering
    ContentFilter,
}

/// Token usage reported at the end of a stream
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Input tokens consumed
    pub prompt_tokens: u32,
    /// Output tokens generated
    pub completion_tokens: u32,
}

/// A single chunk produced by a provider's generation stream
///
/// The racing engine never constructs the content of a chunk; it only
/// ensures `metadata` is populated with race-annotation fields before the
/// chunk reaches the caller (see `RacingStream`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationChunk {
    /// Incremental text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Present on the final chunk of a stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    /// Present on the final chunk of a stream, if the provider reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Free-form metadata; race annotations are injected here
    #[serde(default)]
    pub metadata: Map<String, Value>,
}
