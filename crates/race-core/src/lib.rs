//! Shared types for the virtual-provider racing engine
//!
//! This crate defines the wire-independent message/request/chunk shapes,
//! the `Provider` capability trait, the cancellation context, and the error
//! hierarchy that `race-engine` schedules over. It carries no HTTP, no
//! backend wire protocols, and no configuration-file loading; those are the
//! responsibility of whatever façade embeds the engine.

pub mod chunk;
pub mod context;
pub mod error;
pub mod message;
pub mod provider;
pub mod request;

pub use chunk::{FinishReason, GenerationChunk, Usage};
pub use context::RaceContext;
pub use error::RaceError;
pub use message::{Message, Role};
pub use provider::{ChunkStream, Provider, ProviderMetrics};
pub use request::{GenerationOptions, GenerationParams};
