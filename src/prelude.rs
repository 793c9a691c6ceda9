//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use aetheric_render::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Engine facade
pub use crate::engine::{Engine, EngineBuilder};

// Frame loop and layers
pub use crate::core::layers::{FrameContext, Layer, LayerStack};
pub use crate::core::{FrameLoop, TickControl};

// Configuration and errors
pub use crate::core::config::{ExecutionMode, OverflowPolicy, RendererConfig};
pub use crate::core::error::{ConfigError, QueueError, RenderResult};

// Command queue and ownership
pub use crate::core::command_queue::CommandQueue;
pub use crate::core::memory::{Ref, WeakRef};

// Renderer
pub use crate::renderer::{
    BackendCall, BufferUsage, CallLog, ClearColor, ClearFlags, GpuBuffer, GpuTexture,
    HeadlessRendererApi, RenderCommand, Renderer, RendererApi, ResourceId, TextureDescriptor,
    TextureFormat, Viewport,
};
