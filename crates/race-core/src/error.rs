use thiserror::Error;

/// Errors that can occur while racing providers for a generation request
#[derive(Debug, Error)]
pub enum RaceError {
    /// The named virtual model does not exist, or references an unattached provider
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A single participant failed to produce a usable stream
    #[error("participant {provider} failed: {source}")]
    ParticipantTransport {
        /// Name of the failing provider
        provider: String,
        /// Underlying transport error
        #[source]
        source: anyhow::Error,
    },

    /// Every participant in the race failed
    #[error("all providers failed: {0}")]
    AllFailed(String),

    /// The weighted/quality strategy ended with no successful candidate
    #[error("no successful candidates")]
    NoCandidates,

    /// The caller's context was cancelled or its deadline expired before a winner was chosen
    #[error("race cancelled")]
    ContextCancelled,

    /// Closing the wrapped stream failed
    #[error("stream close error: {0}")]
    StreamClose(String),
}

impl RaceError {
    /// Whether this error represents a transient, per-participant failure
    /// rather than a structural misconfiguration
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ParticipantTransport { .. } | Self::AllFailed(_) | Self::NoCandidates
        )
    }
}
