//=========================================================================
// Render Errors
//=========================================================================
//
// Recoverable error types for the render subsystem.
//
// Misuse of the queue (re-entrant drains, submitting into an arena that is
// being drained) is a programming error and panics. The variants here
// cover what a caller can reasonably handle: a full arena under the
// reject policy, a render thread that went away, and bad configuration.
//
//=========================================================================

//=== External Dependencies ===============================================

use thiserror::Error;

//=== Result Alias ========================================================

/// Result type used across the render subsystem.
pub type RenderResult<T> = Result<T, QueueError>;

//=== QueueError ==========================================================

/// Errors raised while submitting or handing off queued commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The arena has no room for the record and the overflow policy
    /// forbids growing it.
    #[error(
        "command arena exhausted: record of {requested} bytes does not fit \
         ({used} of {capacity} bytes used)"
    )]
    ArenaExhausted {
        requested: usize,
        used: usize,
        capacity: usize,
    },

    /// The render thread has terminated and can no longer accept frames.
    #[error("render thread disconnected")]
    RenderThreadDisconnected,
}

//=== ConfigError =========================================================

/// Errors raised while loading or validating a [`RendererConfig`].
///
/// [`RendererConfig`]: crate::core::config::RendererConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

//=========================================================================
// Tests
//=========================================================================
