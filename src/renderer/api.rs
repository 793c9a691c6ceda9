//=========================================================================
// Renderer API
//=========================================================================
//
// Boundary between queued commands and the graphics backend.
//
// Commands never talk to a backend directly at submission time. They
// capture plain data (ids, sizes, colors) and call into the active
// `RendererApi` only when the queue is drained, on the thread that owns
// the graphics context.
//
//=========================================================================

//=== ResourceId ==========================================================

/// Backend-side name of a buffer or texture.
///
/// Teardown commands capture the id rather than the owning object, which
/// is already gone by the time the command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u64);

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//=== Plain Data ==========================================================

/// Pixel rectangle the backend renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Linear RGBA clear color.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ClearColor {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Which attachments a clear touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearFlags {
    pub color: bool,
    pub depth: bool,
}

impl ClearFlags {
    pub const COLOR: Self = Self {
        color: true,
        depth: false,
    };
    pub const COLOR_DEPTH: Self = Self {
        color: true,
        depth: true,
    };
}

impl Default for ClearFlags {
    fn default() -> Self {
        Self::COLOR_DEPTH
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
    Rgb8,
    Depth24Stencil8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl TextureDescriptor {
    pub fn rgba8(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Rgba8,
        }
    }
}

//=== RendererApi =========================================================

/// Graphics backend driven by drained commands.
///
/// Every method is called from inside a queued command, in submission
/// order, by whichever thread executes the frame. Implementations own the
/// graphics context and need no synchronization of their own; the
/// renderer serializes access.
pub trait RendererApi: Send + 'static {
    /// One-time backend setup. Runs before any other queued backend call.
    fn init(&mut self);

    /// Releases backend state. Runs after all teardown commands.
    fn shutdown(&mut self) {}

    fn set_viewport(&mut self, viewport: Viewport);

    fn set_clear_color(&mut self, color: ClearColor);

    fn clear(&mut self, flags: ClearFlags);

    /// Draws `index_count` indices from the index buffer `index_buffer`.
    fn draw_indexed(&mut self, index_buffer: ResourceId, index_count: u32);

    fn create_buffer(&mut self, id: ResourceId, usage: BufferUsage, size: u64);

    fn delete_buffer(&mut self, id: ResourceId);

    fn create_texture(&mut self, id: ResourceId, descriptor: TextureDescriptor);

    fn delete_texture(&mut self, id: ResourceId);
}
