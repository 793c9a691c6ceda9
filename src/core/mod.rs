//=========================================================================
// Frame Loop
//
// Central coordinator for one render context and the layers feeding it.
//
// Responsibilities:
// - Queue backend init and drain it before any layer runs
// - Tick every layer, then end the frame with wait_and_render()
// - Maintain pacing at a fixed tick rate (TPS)
// - Tear down in order: detach layers, queue backend shutdown, flush
//
// Notes:
// The loop runs on the calling thread. Whether drained frames execute
// inline or on the render thread is the Renderer's business; from here
// every frame ends the same way.
//
//=========================================================================

//=== Standard Library Imports ============================================
use std::thread;
use std::time::{Duration, Instant};

//=== External Crates =====================================================
use log::{debug, error, info, trace};

//=== Internal Modules ====================================================
use crate::core::error::RenderResult;
use crate::core::layers::{FrameContext, LayerStack};
use crate::renderer::{RenderCommand, Renderer};

pub mod command_queue;
pub mod config;
pub mod error;
pub mod layers;
pub mod memory;

//=== TickControl =========================================================
//
// Defines control flow for the frame loop.
// Each tick signals either to continue or to shut down.
//
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Exit,
}

//=== FrameLoop ===========================================================
//
// Owns the renderer and the layer stack and drives both through startup,
// per-tick updates and shutdown.
//
pub struct FrameLoop {
    renderer: Renderer,
    layers: LayerStack,
    frame_duration: Duration,
    started: bool,
    last_tick: Option<Instant>,
}

impl FrameLoop {
    //--- Construction -----------------------------------------------------

    /// # Panics
    ///
    /// Panics if `tps <= 0.0`.
    pub fn new(renderer: Renderer, tps: f64) -> Self {
        assert!(tps > 0.0, "TPS must be positive, got {}", tps);
        Self {
            renderer,
            layers: LayerStack::new(),
            frame_duration: Duration::from_secs_f64(1.0 / tps),
            started: false,
            last_tick: None,
        }
    }

    //--- Accessors --------------------------------------------------------

    pub fn layers_mut(&mut self) -> &mut LayerStack {
        &mut self.layers
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn render_command(&self) -> &RenderCommand {
        self.renderer.render_command()
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    //--- startup() --------------------------------------------------------
    //
    // 1. Queue backend init and drain it
    // 2. Attach layers (resource creation lands in the fresh arena)
    // 3. Drain again so those resources exist before the first tick
    //
    pub fn startup(&mut self) -> RenderResult<()> {
        assert!(!self.started, "Frame loop already started");
        info!(target: "frame_loop", "Starting frame loop ({} layers)", self.layers.len());

        self.renderer.render_command().init();
        self.renderer.wait_and_render()?;

        let render = self.renderer.render_command();
        for layer in self.layers.iter_mut() {
            debug!(target: "frame_loop", "Attaching {}", layer.name());
            layer.on_attach(render);
        }
        self.renderer.wait_and_render()?;

        self.started = true;
        self.last_tick = None;
        Ok(())
    }

    //--- tick() -----------------------------------------------------------
    //
    // Each tick:
    //  1. Updates layers bottom to top
    //  2. Ends the frame (wait_and_render)
    //  3. Reports whether a layer asked to exit
    //
    pub fn tick(&mut self) -> RenderResult<TickControl> {
        assert!(self.started, "tick() called before startup()");

        let now = Instant::now();
        let delta = self
            .last_tick
            .map(|last| now.duration_since(last))
            .unwrap_or_default();
        self.last_tick = Some(now);

        let exit_requested = {
            let frame_index = self.renderer.frame_index() + 1;
            let mut ctx = FrameContext::new(self.renderer.render_command(), frame_index, delta);
            for layer in self.layers.iter_mut() {
                layer.on_update(&mut ctx);
            }
            ctx.exit_requested()
        };

        let stats = self.renderer.wait_and_render()?;
        trace!(
            target: "frame_loop",
            "Tick {} done ({} commands)",
            stats.frame_index,
            stats.commands
        );

        if exit_requested {
            info!(target: "frame_loop", "Exit requested on frame {}", stats.frame_index);
            Ok(TickControl::Exit)
        } else {
            Ok(TickControl::Continue)
        }
    }

    //--- shutdown() -------------------------------------------------------
    //
    // Detaches layers top to bottom and drops them, so their resources
    // queue teardown ahead of the backend shutdown, then flushes.
    //
    pub fn shutdown(&mut self) -> RenderResult<()> {
        if !self.started {
            return Ok(());
        }
        info!(target: "frame_loop", "Shutting down frame loop");

        let render = self.renderer.render_command();
        for layer in self.layers.iter_mut().rev() {
            debug!(target: "frame_loop", "Detaching {}", layer.name());
            layer.on_detach(render);
        }
        self.layers.clear();

        self.renderer.render_command().shutdown();
        self.renderer.flush()?;

        self.started = false;
        info!(
            target: "frame_loop",
            "Frame loop stopped after {} frames",
            self.renderer.frame_index()
        );
        Ok(())
    }

    //--- run() ------------------------------------------------------------

    /// Runs paced ticks until a layer requests exit.
    pub fn run(&mut self) -> RenderResult<u64> {
        self.run_loop(None, true)
    }

    /// Runs at most `frames` ticks without pacing. Used for headless runs.
    pub fn run_frames(&mut self, frames: u64) -> RenderResult<u64> {
        self.run_loop(Some(frames), false)
    }

    fn run_loop(&mut self, limit: Option<u64>, paced: bool) -> RenderResult<u64> {
        self.startup()?;

        let result = self.tick_until(limit, paced);
        if let Err(e) = &result {
            error!(target: "frame_loop", "Frame loop failed: {}", e);
        }

        match self.shutdown() {
            Ok(()) => result,
            Err(e) => {
                error!(target: "frame_loop", "Shutdown failed: {}", e);
                result.and(Err(e))
            }
        }
    }

    fn tick_until(&mut self, limit: Option<u64>, paced: bool) -> RenderResult<u64> {
        let mut ticks = 0;
        while limit.map_or(true, |limit| ticks < limit) {
            let frame_start = Instant::now();

            let control = self.tick()?;
            ticks += 1;
            if control == TickControl::Exit {
                break;
            }

            if paced {
                let elapsed = frame_start.elapsed();
                if elapsed < self.frame_duration {
                    thread::sleep(self.frame_duration - elapsed);
                }
            }
        }
        Ok(ticks)
    }
}

//=========================================================================
// Tests
//=========================================================================
