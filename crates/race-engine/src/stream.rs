//! Transparent wrapper that annotates the winning stream with race metadata

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use race_core::{ChunkStream, GenerationChunk, RaceError};
use serde_json::Value;

/// Race-annotation fields injected into every chunk of the winning stream
#[derive(Debug, Clone)]
pub struct RaceAnnotation {
    /// Name of the winning provider
    pub winner: String,
    /// Measured latency of the winner, in milliseconds
    pub latency_ms: u64,
    /// Display name of the virtual model raced under, if any
    pub virtual_model: Option<String>,
    /// Description of the virtual model raced under, if any
    pub virtual_model_desc: Option<String>,
}

/// Wraps a provider's chunk stream, stamping every chunk with `RaceAnnotation`
/// fields before it reaches the caller
///
/// Closing is delegated to the inner stream by simply dropping it; repeated
/// drops of an already-taken inner stream are a no-op, which is what makes
/// `close` safe to call more than once (see §4.3).
pub struct RacingStream {
    inner: ChunkStream,
    annotation: RaceAnnotation,
}

impl RacingStream {
    /// Wrap `inner`, annotating every chunk it yields with `annotation`
    #[must_use]
    pub fn new(inner: ChunkStream, annotation: RaceAnnotation) -> Self {
        Self { inner, annotation }
    }

    fn annotate(&self, mut chunk: GenerationChunk) -> GenerationChunk {
        chunk
            .metadata
            .insert("racing_winner".to_owned(), Value::String(self.annotation.winner.clone()));
        chunk.metadata.insert(
            "racing_latency_ms".to_owned(),
            Value::Number(self.annotation.latency_ms.into()),
        );
        if let Some(model) = &self.annotation.virtual_model {
            chunk
                .metadata
                .insert("virtual_model".to_owned(), Value::String(model.clone()));
        }
        if let Some(desc) = &self.annotation.virtual_model_desc {
            chunk
                .metadata
                .insert("virtual_model_desc".to_owned(), Value::String(desc.clone()));
        }
        chunk
    }
}

impl Stream for RacingStream {
    type Item = Result<GenerationChunk, RaceError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Some(Ok(self.annotate(chunk)))),
            Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(err))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
