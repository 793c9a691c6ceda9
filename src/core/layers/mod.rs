//=========================================================================
// Layer System
//=========================================================================
//
// Per-tick application logic that records render work.
//
// Architecture:
//   LayerStack
//     ├─ layers:   [0 .. overlay_start)   pushed with push_layer()
//     └─ overlays: [overlay_start .. len) pushed with push_overlay()
//
// Flow:
//   FrameLoop::tick() → Layer::on_update(&mut FrameContext) for each layer,
//   bottom to top → Renderer::wait_and_render()
//
// Layers never call the backend directly. They submit through the
// RenderCommand carried by the FrameContext.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::time::Duration;

//=== Internal Dependencies ===============================================

use crate::renderer::RenderCommand;

//=== Module Declarations =================================================

mod layer_stack;

//=== Public API ==========================================================

pub use layer_stack::LayerStack;

//=== FrameContext ========================================================

/// What a layer sees during one tick.
pub struct FrameContext<'a> {
    render: &'a RenderCommand,
    frame_index: u64,
    delta: Duration,
    exit_requested: bool,
}

impl<'a> FrameContext<'a> {
    pub(crate) fn new(render: &'a RenderCommand, frame_index: u64, delta: Duration) -> Self {
        Self {
            render,
            frame_index,
            delta,
            exit_requested: false,
        }
    }

    /// Submission handle for this tick's render work.
    pub fn render(&self) -> &'a RenderCommand {
        self.render
    }

    /// Index of the frame being recorded, starting at 1.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Time since the previous tick started. Zero on the first tick.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Asks the frame loop to stop after this tick renders.
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }
}

//=== Layer Trait =========================================================

/// Application logic attached to the frame loop.
///
/// Only `on_update` is required:
///
/// ```rust
/// # use aetheric_render::prelude::*;
/// struct ClearLayer;
///
/// impl Layer for ClearLayer {
///     fn on_update(&mut self, ctx: &mut FrameContext) {
///         ctx.render().clear(ClearFlags::COLOR_DEPTH);
///     }
/// }
/// ```
pub trait Layer: Send {
    /// Name used in log output.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called once when the frame loop starts, after the backend init has
    /// drained. Resources created here are created on the backend before
    /// the first tick renders.
    fn on_attach(&mut self, _render: &RenderCommand) {}

    /// Called once at shutdown, top of the stack first.
    fn on_detach(&mut self, _render: &RenderCommand) {}

    /// Called every tick, bottom of the stack first.
    fn on_update(&mut self, ctx: &mut FrameContext);
}
