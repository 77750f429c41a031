//! The narrow graphics surface the aurora background is written against.
//!
//! The trait mirrors the handful of immediate-mode calls the background needs
//! (compile, link, resolve, clear, bind, upload, draw) so the program builder,
//! surface manager, and animation loop never touch `wgpu` directly. The
//! production implementation lives in [`crate::gpu::WgpuBackend`]; tests use a
//! recording double.

use std::fmt;

use crate::error::DrawError;

/// Pipeline stage a shader source targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Compiled, not yet linked, shader stage object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(u32);

/// Linked program object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(u32);

/// Vertex buffer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(u32);

impl ShaderId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl ProgramId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl BufferId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Resolved vertex attribute slot. Unsigned, so always a valid location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeLocation(u32);

/// Resolved uniform slot within the program it was queried from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(u32);

impl AttributeLocation {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl UniformLocation {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Declared type of a resolved uniform, as far as uploads care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Vec2,
    /// Anything the background never uploads (`vec3`, `int`, matrices...).
    Other,
}

impl UniformKind {
    pub fn byte_len(self) -> usize {
        match self {
            Self::Float => 4,
            Self::Vec2 => 8,
            Self::Other => 0,
        }
    }
}

/// How a bound vertex buffer feeds an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    /// Number of `f32` components per vertex.
    pub components: u32,
    pub normalized: bool,
    /// Byte distance between consecutive vertices; `0` means tightly packed.
    pub stride: u64,
    pub offset: u64,
}

impl VertexLayout {
    /// `components` floats per vertex, not normalized, tightly packed.
    pub fn packed_f32(components: u32) -> Self {
        Self {
            components,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }

    pub fn effective_stride(&self) -> u64 {
        if self.stride == 0 {
            u64::from(self.components) * std::mem::size_of::<f32>() as u64
        } else {
            self.stride
        }
    }
}

/// Immediate-mode graphics context bound to one drawable surface.
///
/// Compilation and link failures are returned as the backend's diagnostic log;
/// callers wrap them into [`crate::RenderError`]. Uniform uploads apply to the
/// program most recently passed to [`GraphicsBackend::use_program`].
pub trait GraphicsBackend {
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String>;
    fn delete_shader(&mut self, shader: ShaderId);

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String>;
    fn delete_program(&mut self, program: ProgramId);

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<AttributeLocation>;
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn uniform_kind(&self, program: ProgramId, location: UniformLocation) -> Option<UniformKind>;

    fn create_vertex_buffer(&mut self, data: &[f32]) -> BufferId;
    fn delete_buffer(&mut self, buffer: BufferId);

    /// Largest drawable edge the backend can allocate.
    fn max_surface_dimension(&self) -> u32;
    /// Resizes the drawable buffer and the viewport transform together.
    fn set_viewport(&mut self, width: u32, height: u32);

    fn clear(&mut self, color: [f32; 4]);
    fn use_program(&mut self, program: ProgramId);
    fn bind_vertex_attribute(
        &mut self,
        buffer: BufferId,
        location: AttributeLocation,
        layout: VertexLayout,
    );
    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32);
    fn set_uniform_vec2(&mut self, location: UniformLocation, value: [f32; 2]);
    fn draw_triangle_strip(&mut self, vertex_count: u32) -> Result<(), DrawError>;

    /// Tears down the context. No other call is valid afterwards.
    fn destroy(&mut self);
}
