//! Cancellation context threaded through a race

use tokio_util::sync::CancellationToken;

/// Cancellable context handed to a provider for a single generation call
///
/// Wraps a `CancellationToken` rather than a bespoke future so that both the
/// caller's own cancellation and the engine's internal "a winner was chosen,
/// stop racing" signal compose with a single `.child_token()` call.
#[derive(Debug, Clone)]
pub struct RaceContext {
    cancellation: CancellationToken,
}

impl RaceContext {
    /// Create a fresh, non-cancelled context
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancellation: CancellationToken::new(),
        }
    }

    /// Derive a child context that is cancelled whenever `self` is, but that
    /// can also be cancelled independently without affecting `self`
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
        }
    }

    /// Cancel this context and every context derived from it
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Whether this context has been cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once this context is cancelled
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }
}

impl Default for RaceContext {
    fn default() -> Self {
        Self::new()
    }
}
