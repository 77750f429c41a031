use tracing::trace;

use crate::backend::{
    AttributeLocation, BufferId, GraphicsBackend, ProgramId, ShaderId, ShaderStage,
    UniformKind, UniformLocation, VertexLayout,
};
use crate::error::{DrawError, RenderError};
use crate::program::compile_program;
use crate::shaders::{ShaderSources, POSITION_ATTRIBUTE, RESOLUTION_UNIFORM, TIME_UNIFORM};

use super::reflect::ShaderObjects;

/// Compile/link/reflect without a device. Draw calls are accepted and
/// discarded.
#[derive(Debug, Default)]
pub struct OfflineBackend {
    objects: ShaderObjects,
}

impl OfflineBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphicsBackend for OfflineBackend {
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        self.objects.compile(stage, source)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.objects.delete_shader(shader);
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String> {
        self.objects.link(vertex, fragment).map(|(id, _)| id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.objects.delete_program(program);
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<AttributeLocation> {
        self.objects.program(program)?.attribute_location(name)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.objects.program(program)?.uniform_location(name)
    }

    fn uniform_kind(&self, program: ProgramId, location: UniformLocation) -> Option<UniformKind> {
        self.objects.program(program)?.uniform_kind(location)
    }

    fn create_vertex_buffer(&mut self, _data: &[f32]) -> BufferId {
        BufferId::new(self.objects.allocate_id())
    }

    fn delete_buffer(&mut self, _buffer: BufferId) {}

    fn max_surface_dimension(&self) -> u32 {
        wgpu::Limits::default().max_texture_dimension_2d
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        trace!(width, height, "offline viewport");
    }

    fn clear(&mut self, _color: [f32; 4]) {}

    fn use_program(&mut self, _program: ProgramId) {}

    fn bind_vertex_attribute(
        &mut self,
        _buffer: BufferId,
        _location: AttributeLocation,
        _layout: VertexLayout,
    ) {
    }

    fn set_uniform_f32(&mut self, _location: UniformLocation, _value: f32) {}

    fn set_uniform_vec2(&mut self, _location: UniformLocation, _value: [f32; 2]) {}

    fn draw_triangle_strip(&mut self, _vertex_count: u32) -> Result<(), DrawError> {
        Ok(())
    }

    fn destroy(&mut self) {
        self.objects.clear();
    }
}

/// Resolved handles of a program that passed [`check_sources`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderReport {
    pub attributes: Vec<(String, u32)>,
    pub uniforms: Vec<(String, u32)>,
}

/// Builds `sources` exactly as the GPU path would, minus the pipeline.
pub fn check_sources(sources: &ShaderSources) -> Result<ShaderReport, RenderError> {
    let mut backend = OfflineBackend::new();
    let program = compile_program(&mut backend, &sources.vertex, &sources.fragment)?;
    let report = ShaderReport {
        attributes: vec![(POSITION_ATTRIBUTE.to_string(), program.position().raw())],
        uniforms: vec![
            (TIME_UNIFORM.to_string(), program.elapsed_time().raw()),
            (RESOLUTION_UNIFORM.to_string(), program.resolution().raw()),
        ],
    };
    program.release(&mut backend);
    backend.destroy();
    Ok(report)
}
