//=========================================================================
// Render Command
//=========================================================================
//
// Submission façade: the one handle every call site uses to enqueue
// render work.
//
// Architecture:
//   Layers / resources / shutdown path
//              │ submit(F), set_viewport(), draw_indexed(), ...
//              ↓
//   RenderCommand ── Mutex<CommandQueue> (accepting arena)
//              │
//              └─ Arc<Mutex<dyn RendererApi>> captured by backend commands
//
// The handle is cheap to clone and Send + Sync. Submitting has no effect
// until the Renderer drains the queue at the frame boundary.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use log::trace;
use parking_lot::Mutex;

//=== Internal Dependencies ===============================================

use super::api::{ClearColor, ClearFlags, RendererApi, ResourceId, Viewport};
use super::resources::GpuBuffer;
use crate::core::command_queue::{CommandQueue, QueueStats};
use crate::core::error::RenderResult;
use crate::core::memory::Ref;

//=== Shared State ========================================================

/// The active backend, locked by each backend command while it runs.
pub type SharedBackend = Arc<Mutex<dyn RendererApi>>;

struct Shared {
    queue: Mutex<CommandQueue>,
    backend: SharedBackend,
    draining: AtomicBool,
    next_resource_id: AtomicU64,
}

//=== RenderCommand =======================================================

/// Cloneable submission handle for deferred render work.
///
/// Commands are `FnOnce() + Send + 'static`: they may capture values and
/// [`Ref`] handles, never borrowed stack data. They run in submission order
/// during the next drain.
///
/// # Examples
///
/// ```
/// use aetheric_render::prelude::*;
///
/// let (backend, calls) = HeadlessRendererApi::new();
/// let mut renderer = Renderer::new(backend, &RendererConfig::default());
/// let render = renderer.render_command().clone();
///
/// render.init();
/// render.set_clear_color(ClearColor::new(0.1, 0.1, 0.1, 1.0));
/// render.clear(ClearFlags::COLOR_DEPTH);
/// assert!(calls.is_empty());
///
/// renderer.wait_and_render().unwrap();
/// assert_eq!(calls.len(), 3);
/// ```
#[derive(Clone)]
pub struct RenderCommand {
    shared: Arc<Shared>,
}

impl RenderCommand {
    //--- Construction -----------------------------------------------------

    pub(crate) fn new(queue: CommandQueue, backend: SharedBackend) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(queue),
                backend,
                draining: AtomicBool::new(false),
                next_resource_id: AtomicU64::new(1),
            }),
        }
    }

    //--- Generic Submission -----------------------------------------------

    /// Queues `command` for the next drain.
    ///
    /// # Panics
    ///
    /// Panics if the arena is full and the overflow policy is `Reject`.
    pub fn submit<F>(&self, command: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(e) = self.try_submit(command) {
            panic!("{}", e);
        }
    }

    /// Queues `command`, returning an error instead of panicking when the
    /// arena is full.
    ///
    /// A rejected command is dropped after the queue lock is released, so
    /// its captures may submit from their own `Drop`.
    pub fn try_submit<F>(&self, command: F) -> RenderResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.note_if_draining();
        let submitted = self.shared.queue.lock().try_submit_or_return(command);
        match submitted {
            Ok(()) => Ok(()),
            Err((e, rejected)) => {
                drop(rejected);
                Err(e)
            }
        }
    }

    /// Queues a command that runs `call` against the active backend.
    pub fn submit_to_backend<F>(&self, call: F)
    where
        F: FnOnce(&mut dyn RendererApi) + Send + 'static,
    {
        let backend = Arc::clone(&self.shared.backend);
        self.submit(move || call(&mut *backend.lock()));
    }

    /// Non-panicking form of [`submit_to_backend`](Self::submit_to_backend).
    pub fn try_submit_to_backend<F>(&self, call: F) -> RenderResult<()>
    where
        F: FnOnce(&mut dyn RendererApi) + Send + 'static,
    {
        let backend = Arc::clone(&self.shared.backend);
        self.try_submit(move || call(&mut *backend.lock()))
    }

    fn note_if_draining(&self) {
        if self.shared.draining.load(Ordering::Acquire) {
            trace!(target: "render_queue", "Submission during drain, deferred to next frame");
        }
    }

    //--- Convenience Operations -------------------------------------------

    /// Queues backend initialization. Submit it before anything else that
    /// touches backend state; FIFO order does the rest.
    pub fn init(&self) {
        self.submit_to_backend(|api| api.init());
    }

    /// Queues backend shutdown.
    pub fn shutdown(&self) {
        self.submit_to_backend(|api| api.shutdown());
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.submit_to_backend(move |api| api.set_viewport(viewport));
    }

    pub fn set_clear_color(&self, color: ClearColor) {
        self.submit_to_backend(move |api| api.set_clear_color(color));
    }

    pub fn clear(&self, flags: ClearFlags) {
        self.submit_to_backend(move |api| api.clear(flags));
    }

    /// Queues an indexed draw. The command holds its own handle to
    /// `index_buffer`, so the buffer outlives the draw even if every other
    /// owner lets go before the drain.
    pub fn draw_indexed(&self, index_buffer: &Ref<GpuBuffer>, index_count: u32) {
        let index_buffer = index_buffer.clone();
        self.submit_to_backend(move |api| api.draw_indexed(index_buffer.id(), index_count));
    }

    //--- Resources --------------------------------------------------------

    /// Hands out a fresh backend resource name.
    pub fn allocate_resource_id(&self) -> ResourceId {
        ResourceId(self.shared.next_resource_id.fetch_add(1, Ordering::Relaxed))
    }

    //--- Query API --------------------------------------------------------

    /// Commands waiting for the next drain.
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Usage of the accepting arena. The high-water mark covers every
    /// frame so far, not just this arena's.
    pub fn stats(&self) -> QueueStats {
        self.shared.queue.lock().stats()
    }

    /// Returns true while a drained frame is executing.
    pub fn is_draining(&self) -> bool {
        self.shared.draining.load(Ordering::Acquire)
    }

    //--- Driver Hooks -----------------------------------------------------

    /// Swaps the accepting arena with `frame`. The previously accepting
    /// arena, holding this frame's commands, ends up in `frame`.
    pub(crate) fn swap_queue(&self, frame: &mut CommandQueue) {
        debug_assert!(frame.is_empty(), "spare arena still holds commands");
        let mut queue = self.shared.queue.lock();
        std::mem::swap(&mut *queue, frame);
        queue.carry_high_water_mark(frame.stats().high_water_mark);
    }

    pub(crate) fn set_draining(&self, draining: bool) {
        self.shared.draining.store(draining, Ordering::Release);
    }
}

impl std::fmt::Debug for RenderCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCommand")
            .field("pending", &self.pending())
            .field("draining", &self.is_draining())
            .finish()
    }
}

//=========================================================================
// Tests
//=========================================================================
