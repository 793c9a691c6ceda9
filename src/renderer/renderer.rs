//=========================================================================
// Renderer
//=========================================================================
//
// Execution driver: owns the render queue and defines the frame boundary.
//
// Frame cycle:
// ```text
//   Accepting ── submit() from anywhere via RenderCommand
//       │
//   wait_and_render()
//       ├─ [threaded] wait for the previous frame, take its arena back
//       ├─ swap accepting arena ⇄ spare (lock held only for the swap)
//       ├─ [inline]   execute the swapped-out arena here
//       └─ [threaded] kick it to the render thread
//       │
//   Accepting (next frame)
// ```
//
// Commands submitted while a frame drains (for example teardown queued by
// a resource whose last handle a command just released) land in the new
// accepting arena and run next frame.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::Arc;

use log::{debug, info, trace, warn};
use parking_lot::Mutex;

//=== Internal Dependencies ===============================================

use super::api::RendererApi;
use super::render_command::{RenderCommand, SharedBackend};
use super::render_thread::RenderThread;
use crate::core::command_queue::CommandQueue;
use crate::core::config::{ExecutionMode, RendererConfig};
use crate::core::error::RenderResult;

/// Drain passes `flush` makes before giving up on a queue that keeps
/// refilling itself.
const MAX_FLUSH_PASSES: usize = 8;

//=== FrameStats ==========================================================

/// What one call to [`Renderer::wait_and_render`] handed off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    /// Index of the frame, starting at 1.
    pub frame_index: u64,

    /// Commands in the frame.
    pub commands: usize,

    /// Arena bytes the frame used.
    pub bytes_used: usize,
}

//=== DrainingFlag ========================================================

/// Marks the render command as draining until dropped, unwinding included.
struct DrainingFlag<'a> {
    render_command: &'a RenderCommand,
}

impl<'a> DrainingFlag<'a> {
    fn raise(render_command: &'a RenderCommand) -> Self {
        render_command.set_draining(true);
        Self { render_command }
    }
}

impl Drop for DrainingFlag<'_> {
    fn drop(&mut self) {
        self.render_command.set_draining(false);
    }
}

//=== Renderer ============================================================

/// Root render context: owns the queue, the backend and, in threaded mode,
/// the render thread.
///
/// Call sites enqueue through [`Renderer::render_command`]; the main loop
/// calls [`Renderer::wait_and_render`] once per tick.
pub struct Renderer {
    render_command: RenderCommand,
    spare: Option<CommandQueue>,
    render_thread: Option<RenderThread>,
    config: RendererConfig,
    frame_index: u64,
}

impl Renderer {
    //--- Construction -----------------------------------------------------

    /// Creates a renderer driving `backend`.
    ///
    /// Falls back to inline execution if the render thread cannot be
    /// spawned.
    pub fn new<A: RendererApi>(backend: A, config: &RendererConfig) -> Self {
        let backend: SharedBackend = Arc::new(Mutex::new(backend));
        let render_command = RenderCommand::new(CommandQueue::from_config(config), backend);

        let render_thread = match config.execution_mode {
            ExecutionMode::Inline => None,
            ExecutionMode::Threaded => match RenderThread::spawn(config.frame_channel_capacity) {
                Ok(thread) => Some(thread),
                Err(e) => {
                    warn!(
                        target: "renderer",
                        "Failed to spawn render thread ({}), executing inline",
                        e
                    );
                    None
                }
            },
        };

        info!(
            target: "renderer",
            "Renderer created (arena: {} bytes, policy: {:?}, mode: {:?})",
            config.arena_capacity,
            config.overflow_policy,
            if render_thread.is_some() {
                ExecutionMode::Threaded
            } else {
                ExecutionMode::Inline
            }
        );

        Self {
            render_command,
            spare: Some(CommandQueue::from_config(config)),
            render_thread,
            config: config.clone(),
            frame_index: 0,
        }
    }

    //--- Accessors --------------------------------------------------------

    /// Submission handle; clone it into anything that needs to queue work.
    pub fn render_command(&self) -> &RenderCommand {
        &self.render_command
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Frames handed off so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn is_threaded(&self) -> bool {
        self.render_thread.is_some()
    }

    //--- Frame Boundary ---------------------------------------------------

    /// Ends the current frame: every command submitted so far is executed
    /// (inline) or handed to the render thread (threaded), in submission
    /// order.
    ///
    /// In threaded mode this first waits for the previous frame, so at
    /// most one frame is ever in flight.
    pub fn wait_and_render(&mut self) -> RenderResult<FrameStats> {
        self.wait_for_render_thread()?;

        let mut frame = match self.spare.take() {
            Some(queue) => queue,
            None => CommandQueue::from_config(&self.config),
        };
        self.render_command.swap_queue(&mut frame);

        self.frame_index += 1;
        let stats = FrameStats {
            frame_index: self.frame_index,
            commands: frame.len(),
            bytes_used: frame.bytes_used(),
        };
        trace!(
            target: "renderer",
            "Frame {}: {} commands, {} bytes",
            stats.frame_index,
            stats.commands,
            stats.bytes_used
        );

        match self.render_thread.as_mut() {
            Some(thread) => {
                self.render_command.set_draining(true);
                if let Err(e) = thread.kick(frame) {
                    self.render_command.set_draining(false);
                    return Err(e);
                }
            }
            None => {
                let draining = DrainingFlag::raise(&self.render_command);
                frame.execute();
                drop(draining);
                self.spare = Some(frame);
            }
        }

        Ok(stats)
    }

    /// Blocks until the render thread has finished every kicked frame.
    /// A no-op in inline mode.
    pub fn wait_for_render_thread(&mut self) -> RenderResult<()> {
        let Some(thread) = self.render_thread.as_mut() else {
            return Ok(());
        };

        let waited = loop {
            match thread.wait() {
                Ok(Some(done)) => {
                    trace!(target: "renderer", "Render thread finished {} commands", done.executed);
                    self.spare = Some(done.queue);
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        self.render_command.set_draining(false);
        waited
    }

    /// Drains until nothing is pending and nothing is in flight.
    ///
    /// Teardown commands can queue more teardown (a released handle drops
    /// an object whose `Drop` submits), so this runs several passes.
    pub fn flush(&mut self) -> RenderResult<()> {
        for _ in 0..MAX_FLUSH_PASSES {
            self.wait_for_render_thread()?;
            if self.render_command.pending() == 0 {
                return Ok(());
            }
            self.wait_and_render()?;
        }

        self.wait_for_render_thread()?;
        let pending = self.render_command.pending();
        if pending > 0 {
            warn!(
                target: "renderer",
                "Flush gave up after {} passes with {} commands pending",
                MAX_FLUSH_PASSES,
                pending
            );
        }
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.wait_for_render_thread() {
            warn!(target: "renderer", "Render thread lost during shutdown: {}", e);
        }

        // Pending commands may hold resources that hold RenderCommand
        // clones; discard them so those cycles break. Discarding can queue
        // more teardown, hence the loop.
        let mut scratch = match self.spare.take() {
            Some(queue) => queue,
            None => CommandQueue::from_config(&self.config),
        };
        for _ in 0..MAX_FLUSH_PASSES {
            if self.render_command.pending() == 0 {
                break;
            }
            self.render_command.swap_queue(&mut scratch);
            let discarded = scratch.discard();
            debug!(
                target: "renderer",
                "Discarded {} commands never rendered",
                discarded
            );
        }

        info!(target: "renderer", "Renderer shut down after {} frames", self.frame_index);
    }
}

//=========================================================================
// Tests
//=========================================================================
