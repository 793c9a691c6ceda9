//=========================================================================
// Headless Backend
//=========================================================================
//
// A `RendererApi` with no GPU behind it.
//
// Records every call it receives, in order, and tracks which buffers and
// textures are alive. Used for headless runs and for asserting on what
// drained commands actually did.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashSet;
use std::sync::Arc;

use log::{trace, warn};
use parking_lot::Mutex;

//=== Internal Dependencies ===============================================

use super::api::{
    BufferUsage, ClearColor, ClearFlags, RendererApi, ResourceId, TextureDescriptor, Viewport,
};

//=== BackendCall =========================================================

/// One call received by the headless backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Init,
    Shutdown,
    SetViewport(Viewport),
    SetClearColor(ClearColor),
    Clear(ClearFlags),
    DrawIndexed {
        index_buffer: ResourceId,
        index_count: u32,
    },
    CreateBuffer {
        id: ResourceId,
        usage: BufferUsage,
        size: u64,
    },
    DeleteBuffer(ResourceId),
    CreateTexture {
        id: ResourceId,
        descriptor: TextureDescriptor,
    },
    DeleteTexture(ResourceId),
}

//=== CallLog =============================================================

#[derive(Default)]
struct LogState {
    calls: Vec<BackendCall>,
    live_buffers: HashSet<ResourceId>,
    live_textures: HashSet<ResourceId>,
}

/// Shared view of what a [`HeadlessRendererApi`] has received.
///
/// Stays readable after the backend itself has moved into the renderer.
#[derive(Clone, Default)]
pub struct CallLog {
    state: Arc<Mutex<LogState>>,
}

impl CallLog {
    /// Copy of every call so far, in the order received.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().calls.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().calls.is_empty()
    }

    /// Forgets recorded calls; live resource tracking is kept.
    pub fn clear(&self) {
        self.state.lock().calls.clear();
    }

    pub fn live_buffers(&self) -> usize {
        self.state.lock().live_buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.state.lock().live_textures.len()
    }
}

//=== HeadlessRendererApi =================================================

/// Backend that records calls instead of issuing them.
pub struct HeadlessRendererApi {
    log: CallLog,
    initialized: bool,
}

impl HeadlessRendererApi {
    /// Creates the backend and a log handle that observes it.
    pub fn new() -> (Self, CallLog) {
        let log = CallLog::default();
        (
            Self {
                log: log.clone(),
                initialized: false,
            },
            log,
        )
    }

    fn record(&mut self, call: BackendCall) {
        if !self.initialized && call != BackendCall::Init {
            warn!(target: "renderer", "Backend call before init: {:?}", call);
        }
        trace!(target: "renderer", "{:?}", call);
        self.log.state.lock().calls.push(call);
    }
}

impl RendererApi for HeadlessRendererApi {
    fn init(&mut self) {
        if self.initialized {
            warn!(target: "renderer", "Headless backend initialized twice");
        }
        self.record(BackendCall::Init);
        self.initialized = true;
    }

    fn shutdown(&mut self) {
        self.record(BackendCall::Shutdown);
        let state = self.log.state.lock();
        if !state.live_buffers.is_empty() || !state.live_textures.is_empty() {
            warn!(
                target: "renderer",
                "Backend shut down with {} buffers and {} textures alive",
                state.live_buffers.len(),
                state.live_textures.len()
            );
        }
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.record(BackendCall::SetViewport(viewport));
    }

    fn set_clear_color(&mut self, color: ClearColor) {
        self.record(BackendCall::SetClearColor(color));
    }

    fn clear(&mut self, flags: ClearFlags) {
        self.record(BackendCall::Clear(flags));
    }

    fn draw_indexed(&mut self, index_buffer: ResourceId, index_count: u32) {
        if !self.log.state.lock().live_buffers.contains(&index_buffer) {
            warn!(target: "renderer", "Draw from unknown index buffer {}", index_buffer);
        }
        self.record(BackendCall::DrawIndexed {
            index_buffer,
            index_count,
        });
    }

    fn create_buffer(&mut self, id: ResourceId, usage: BufferUsage, size: u64) {
        self.log.state.lock().live_buffers.insert(id);
        self.record(BackendCall::CreateBuffer { id, usage, size });
    }

    fn delete_buffer(&mut self, id: ResourceId) {
        if !self.log.state.lock().live_buffers.remove(&id) {
            warn!(target: "renderer", "Delete of unknown buffer {}", id);
        }
        self.record(BackendCall::DeleteBuffer(id));
    }

    fn create_texture(&mut self, id: ResourceId, descriptor: TextureDescriptor) {
        self.log.state.lock().live_textures.insert(id);
        self.record(BackendCall::CreateTexture { id, descriptor });
    }

    fn delete_texture(&mut self, id: ResourceId) {
        if !self.log.state.lock().live_textures.remove(&id) {
            warn!(target: "renderer", "Delete of unknown texture {}", id);
        }
        self.record(BackendCall::DeleteTexture(id));
    }
}

//=========================================================================
// Tests
//=========================================================================
