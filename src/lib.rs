//=========================================================================
// Aetheric Render Library Root
//
// Deferred render command submission with reference-counted resources.
//
// Responsibilities:
// - Expose the frame loop facade (`Engine`, `EngineBuilder`)
// - Expose the render front end (`Renderer`, `RenderCommand`, resources)
// - Expose the core building blocks (`CommandQueue`, `Ref`, config, errors)
//   for callers that drive frames themselves
//
// Typical usage:
// ```no_run
// use aetheric_render::prelude::*;
//
// let (backend, _calls) = HeadlessRendererApi::new();
// EngineBuilder::new().build(backend).run().unwrap();
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` holds the command arena, shared ownership handles, config,
// errors, layers and the frame loop.
//
// `renderer` holds the submission facade, the execution driver, the
// backend trait and the GPU resource wrappers.
//
pub mod core;
pub mod renderer;
pub mod prelude;

//--- Internal Modules ----------------------------------------------------
mod engine;

//--- Public Exports ------------------------------------------------------
pub use engine::{Engine, EngineBuilder};
