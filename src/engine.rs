//=========================================================================
// Aetheric Render Engine
//
// Main entry point: configures a renderer and runs the frame loop.
//
// Architecture:
// ```text
//     EngineBuilder  ──build(backend)──>  Engine  ──run()──>  [FrameLoop]
//         │                                 │
//         ├─ with_tps()                     ├─ init(|layers, render| ..)
//         ├─ with_arena_capacity()          └─ startup, ticks, shutdown
//         ├─ with_overflow_policy()            blocks until exit
//         ├─ with_execution_mode()
//         └─ from_config()
// ```
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{error, info};

//=== Internal Dependencies ===============================================

use crate::core::config::{ExecutionMode, OverflowPolicy, RendererConfig};
use crate::core::error::{ConfigError, RenderResult};
use crate::core::layers::LayerStack;
use crate::core::FrameLoop;
use crate::renderer::{RenderCommand, Renderer, RendererApi};

//=== EngineBuilder =======================================================

/// Builder for configuring and constructing an [`Engine`].
///
/// # Default Values
///
/// - **TPS**: 60.0 (frames per second)
/// - **Arena capacity**: 10 MiB
/// - **Overflow policy**: `Reject`
/// - **Execution mode**: `Inline`
///
/// # Examples
///
/// Headless run with a fixed number of frames:
/// ```
/// use aetheric_render::prelude::*;
///
/// let (backend, calls) = HeadlessRendererApi::new();
/// let frames = EngineBuilder::new()
///     .with_arena_capacity(64 * 1024)
///     .build(backend)
///     .run_frames(3)
///     .unwrap();
///
/// assert_eq!(frames, 3);
/// assert_eq!(calls.calls().first(), Some(&BackendCall::Init));
/// ```
///
/// From a config file:
/// ```no_run
/// # use aetheric_render::prelude::*;
/// let config = RendererConfig::load_or_default("renderer.toml").unwrap();
/// let (backend, _calls) = HeadlessRendererApi::new();
///
/// EngineBuilder::from_config(config)
///     .unwrap()
///     .build(backend)
///     .run()
///     .unwrap();
/// ```
pub struct EngineBuilder {
    config: RendererConfig,
}

impl EngineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: RendererConfig::default(),
        }
    }

    /// Starts from a loaded configuration, rejecting invalid values.
    pub fn from_config(config: RendererConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Sets the target ticks per second for the frame loop.
    ///
    /// Default: 60.0
    ///
    /// # Panics
    ///
    /// Panics if `tps <= 0.0`.
    pub fn with_tps(mut self, tps: f64) -> Self {
        assert!(tps > 0.0, "TPS must be positive, got {}", tps);
        self.config.tps = tps;
        self
    }

    /// Sets the command arena size in bytes, record headers included.
    ///
    /// Default: 10 MiB
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_arena_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Arena capacity must be positive");
        self.config.arena_capacity = capacity;
        self
    }

    /// Chooses between failing loudly and growing when the arena is full.
    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.overflow_policy = policy;
        self
    }

    /// Chooses where drained frames execute.
    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.config.execution_mode = mode;
        self
    }

    /// Sets how many frames may queue up for the render thread.
    ///
    /// Default: 1
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_frame_channel_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Channel capacity must be positive");
        self.config.frame_channel_capacity = capacity;
        self
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Builds the engine around `backend`.
    ///
    /// Nothing reaches the backend until the engine runs; backend init is
    /// the first command of the first frame.
    pub fn build<A: RendererApi>(self, backend: A) -> Engine {
        info!(
            "Building engine (TPS: {}, arena: {} bytes, mode: {:?})",
            self.config.tps, self.config.arena_capacity, self.config.execution_mode
        );

        let renderer = Renderer::new(backend, &self.config);
        Engine {
            frame_loop: FrameLoop::new(renderer, self.config.tps),
            tps: self.config.tps,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== Engine ==============================================================

/// Aetheric render runtime.
///
/// # Architecture
///
/// ```text
/// Engine (Main Thread)
///   └─► FrameLoop (@ TPS)
///         ├─► LayerStack ── records commands via RenderCommand
///         └─► Renderer   ── wait_and_render() once per tick
///               └─► RenderThread (threaded mode only)
/// ```
pub struct Engine {
    frame_loop: FrameLoop,
    tps: f64,
}

impl Engine {
    //--- Initialization ---------------------------------------------------

    /// Registers layers before execution.
    ///
    /// The render handle is available for commands that should run in the
    /// first frame, right after backend init.
    ///
    /// # Examples
    ///
    /// ```
    /// # use aetheric_render::prelude::*;
    /// struct Clear;
    ///
    /// impl Layer for Clear {
    ///     fn on_update(&mut self, ctx: &mut FrameContext) {
    ///         ctx.render().clear(ClearFlags::COLOR);
    ///         ctx.request_exit();
    ///     }
    /// }
    ///
    /// let (backend, calls) = HeadlessRendererApi::new();
    /// EngineBuilder::new()
    ///     .with_arena_capacity(4096)
    ///     .build(backend)
    ///     .init(|layers, render| {
    ///         render.set_clear_color(ClearColor::BLACK);
    ///         layers.push_layer(Clear);
    ///     })
    ///     .run()
    ///     .unwrap();
    ///
    /// assert!(calls.calls().contains(&BackendCall::Clear(ClearFlags::COLOR)));
    /// ```
    pub fn init<F>(mut self, init_fn: F) -> Self
    where
        F: FnOnce(&mut LayerStack, &RenderCommand),
    {
        info!("Initializing engine layers");

        let render = self.frame_loop.render_command().clone();
        init_fn(self.frame_loop.layers_mut(), &render);

        info!("Engine initialization complete");
        self
    }

    pub fn render_command(&self) -> &RenderCommand {
        self.frame_loop.render_command()
    }

    //--- Execution --------------------------------------------------------

    /// Runs paced frames until a layer requests exit.
    ///
    /// # Lifecycle
    ///
    /// 1. Queues backend init and drains it
    /// 2. Attaches layers and drains their setup
    /// 3. Ticks layers and renders at the configured TPS
    /// 4. Detaches layers, queues backend shutdown, flushes
    ///
    /// Returns the number of ticks run.
    pub fn run(mut self) -> RenderResult<u64> {
        info!("Starting engine runtime (TPS: {})", self.tps);
        let result = self.frame_loop.run();
        Self::report(result)
    }

    /// Runs at most `frames` ticks as fast as possible.
    pub fn run_frames(mut self, frames: u64) -> RenderResult<u64> {
        info!("Starting headless engine run ({} frames)", frames);
        let result = self.frame_loop.run_frames(frames);
        Self::report(result)
    }

    fn report(result: RenderResult<u64>) -> RenderResult<u64> {
        match &result {
            Ok(ticks) => info!("Engine shutdown complete after {} ticks", ticks),
            Err(e) => error!("Engine stopped with error: {}", e),
        }
        result
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
