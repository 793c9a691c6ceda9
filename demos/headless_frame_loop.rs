//=========================================================================
// Headless Frame Loop
//=========================================================================
//
// Runs the engine against the recording backend and prints what reached
// it. Reads `renderer.toml` from the working directory if present.
//
//   RUST_LOG=debug cargo run --example headless_frame_loop
//
//=========================================================================

use aetheric_render::prelude::*;
use env_logger::{Builder, Env};

//=== Layers ==============================================================

/// Clears, then draws a quad from a buffer it owns.
struct QuadLayer {
    indices: Option<Ref<GpuBuffer>>,
    frames: u64,
}

impl Layer for QuadLayer {
    fn name(&self) -> &str {
        "quad"
    }

    fn on_attach(&mut self, render: &RenderCommand) {
        self.indices = Some(GpuBuffer::create(render, BufferUsage::Index, 6 * 4));
    }

    fn on_update(&mut self, ctx: &mut FrameContext) {
        let render = ctx.render();
        render.set_clear_color(ClearColor::new(0.1, 0.1, 0.12, 1.0));
        render.clear(ClearFlags::COLOR_DEPTH);
        if let Some(indices) = &self.indices {
            render.draw_indexed(indices, 6);
        }

        self.frames += 1;
        if self.frames == 3 {
            // Last owner of the buffer goes away mid-run; the draw queued
            // above still holds its own handle.
            self.indices = None;
        }
        if self.frames == 5 {
            ctx.request_exit();
        }
    }
}

/// Overlay that sets the viewport every frame.
struct ViewportOverlay;

impl Layer for ViewportOverlay {
    fn on_update(&mut self, ctx: &mut FrameContext) {
        ctx.render().set_viewport(Viewport::new(0, 0, 1280, 720));
    }
}

//=== Main ================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = RendererConfig::load_or_default("renderer.toml")?;
    let (backend, calls) = HeadlessRendererApi::new();

    let ticks = EngineBuilder::from_config(config)?
        .build(backend)
        .init(|layers, _render| {
            layers.push_overlay(ViewportOverlay);
            layers.push_layer(QuadLayer {
                indices: None,
                frames: 0,
            });
        })
        .run()?;

    println!("ran {} ticks, backend saw {} calls:", ticks, calls.len());
    for call in calls.calls() {
        println!("  {:?}", call);
    }
    Ok(())
}
