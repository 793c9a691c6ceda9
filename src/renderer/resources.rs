//=========================================================================
// GPU Resources
//=========================================================================
//
// Objects whose lifetime ends in a backend call.
//
// Lifecycle:
//   create()  → allocate id, queue create_*(id), return Ref<Self>
//   Ref clones held by call sites and by queued commands
//   last Ref dropped → Drop queues delete_*(id)
//
// The teardown command captures only the id. The Rust object is gone by
// the time the command runs.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{debug, error};

//=== Internal Dependencies ===============================================

use super::api::{BufferUsage, ResourceId, TextureDescriptor};
use super::render_command::RenderCommand;
use crate::core::memory::Ref;

//=== GpuBuffer ===========================================================

/// Reference-counted handle owner for a backend buffer.
pub struct GpuBuffer {
    id: ResourceId,
    usage: BufferUsage,
    size: u64,
    render: RenderCommand,
}

impl GpuBuffer {
    /// Queues creation of a `size`-byte buffer and returns its only owner.
    pub fn create(render: &RenderCommand, usage: BufferUsage, size: u64) -> Ref<Self> {
        let id = render.allocate_resource_id();
        debug!(target: "resources", "Creating {:?} buffer {} ({} bytes)", usage, id, size);
        render.submit_to_backend(move |api| api.create_buffer(id, usage, size));
        Ref::new(Self {
            id,
            usage,
            size,
            render: render.clone(),
        })
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        let id = self.id;
        debug!(target: "resources", "Releasing buffer {}", id);
        if let Err(e) = self
            .render
            .try_submit_to_backend(move |api| api.delete_buffer(id))
        {
            error!(target: "resources", "Buffer {} leaked on the backend: {}", id, e);
        }
    }
}

//=== GpuTexture ==========================================================

/// Reference-counted handle owner for a backend texture.
pub struct GpuTexture {
    id: ResourceId,
    descriptor: TextureDescriptor,
    render: RenderCommand,
}

impl GpuTexture {
    /// Queues creation of a texture and returns its only owner.
    pub fn create(render: &RenderCommand, descriptor: TextureDescriptor) -> Ref<Self> {
        let id = render.allocate_resource_id();
        debug!(
            target: "resources",
            "Creating texture {} ({}x{} {:?})",
            id,
            descriptor.width,
            descriptor.height,
            descriptor.format
        );
        render.submit_to_backend(move |api| api.create_texture(id, descriptor));
        Ref::new(Self {
            id,
            descriptor,
            render: render.clone(),
        })
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn descriptor(&self) -> TextureDescriptor {
        self.descriptor
    }
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        let id = self.id;
        debug!(target: "resources", "Releasing texture {}", id);
        if let Err(e) = self
            .render
            .try_submit_to_backend(move |api| api.delete_texture(id))
        {
            error!(target: "resources", "Texture {} leaked on the backend: {}", id, e);
        }
    }
}

//=========================================================================
// Tests
//=========================================================================
