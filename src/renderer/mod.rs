//=========================================================================
// Renderer
//=========================================================================
//
// Deferred rendering front end.
//
// Architecture:
//   RenderCommand (submit from anywhere)
//     └─ CommandQueue arena ── swapped out at the frame boundary
//          └─ Renderer::wait_and_render()
//               ├─ inline:   executes on the calling thread
//               └─ threaded: RenderThread executes, arena comes back
//
// Every backend call goes through `RendererApi`; resources that own
// backend objects (`GpuBuffer`, `GpuTexture`) queue their own teardown.
//
//=========================================================================

//=== Module Declarations =================================================

pub mod api;
pub mod headless;
mod render_command;
mod render_thread;
#[allow(clippy::module_inception)]
mod renderer;
mod resources;

//=== Public API ==========================================================

pub use api::{
    BufferUsage, ClearColor, ClearFlags, RendererApi, ResourceId, TextureDescriptor,
    TextureFormat, Viewport,
};
pub use headless::{BackendCall, CallLog, HeadlessRendererApi};
pub use render_command::{RenderCommand, SharedBackend};
pub use render_thread::{CompletedFrame, RenderThread};
pub use renderer::{FrameStats, Renderer};
pub use resources::{GpuBuffer, GpuTexture};
