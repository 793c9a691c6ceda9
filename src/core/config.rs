//=========================================================================
// Renderer Configuration
//=========================================================================
//
// Tunables for the command arena, the execution driver and the frame loop.
//
// Loaded from TOML; every key is optional and falls back to its default:
//
// ```toml
// arena_capacity = 10485760
// overflow_policy = "reject"      # or "grow"
// execution_mode = "inline"       # or "threaded"
// frame_channel_capacity = 1
// tps = 60.0
// ```
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

//=== Internal Dependencies ===============================================

use crate::core::error::ConfigError;

//=== Defaults ============================================================

/// Default arena size: 10 MiB of packed command records per frame.
pub const DEFAULT_ARENA_CAPACITY: usize = 10 * 1024 * 1024;

fn default_arena_capacity() -> usize {
    DEFAULT_ARENA_CAPACITY
}
fn default_frame_channel_capacity() -> usize {
    1
}
fn default_tps() -> f64 {
    60.0
}

//=== OverflowPolicy ======================================================

/// What the arena does when a record does not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Refuse the record with [`QueueError::ArenaExhausted`].
    ///
    /// [`QueueError::ArenaExhausted`]: crate::core::error::QueueError::ArenaExhausted
    #[default]
    Reject,

    /// Reallocate the arena, at least doubling it.
    Grow,
}

//=== ExecutionMode =======================================================

/// Where drained frames run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// On the thread calling `wait_and_render`.
    #[default]
    Inline,

    /// On a dedicated render thread.
    Threaded,
}

//=== RendererConfig ======================================================

/// Configuration for the render subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Arena size in bytes, headers included.
    #[serde(default = "default_arena_capacity")]
    pub arena_capacity: usize,

    #[serde(default)]
    pub overflow_policy: OverflowPolicy,

    #[serde(default)]
    pub execution_mode: ExecutionMode,

    /// Frames that may wait for the render thread at once.
    #[serde(default = "default_frame_channel_capacity")]
    pub frame_channel_capacity: usize,

    /// Frame loop ticks per second.
    #[serde(default = "default_tps")]
    pub tps: f64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            arena_capacity: default_arena_capacity(),
            overflow_policy: OverflowPolicy::default(),
            execution_mode: ExecutionMode::default(),
            frame_channel_capacity: default_frame_channel_capacity(),
            tps: default_tps(),
        }
    }
}

impl RendererConfig {
    //--- Loading ----------------------------------------------------------

    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: RendererConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the config at `path`, falling back to defaults if the file
    /// does not exist. A file that exists but is malformed is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(source) => {
                let config = Self::from_toml_str(&source)?;
                info!(target: "renderer", "Loaded renderer config from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    target: "renderer",
                    "Renderer config {} not found, using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    //--- Validation -------------------------------------------------------

    /// Rejects values the renderer cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arena_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "arena_capacity",
                reason: "must be positive".into(),
            });
        }
        if self.frame_channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "frame_channel_capacity",
                reason: "must be positive".into(),
            });
        }
        if !(self.tps > 0.0) {
            return Err(ConfigError::Invalid {
                field: "tps",
                reason: format!("must be positive, got {}", self.tps),
            });
        }
        Ok(())
    }
}

//=========================================================================
// Tests
//=========================================================================
