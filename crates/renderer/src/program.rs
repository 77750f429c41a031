use tracing::{debug, error};

use crate::backend::{
    AttributeLocation, GraphicsBackend, ProgramId, ShaderId, ShaderStage, UniformKind,
    UniformLocation,
};
use crate::error::RenderError;
use crate::shaders::{POSITION_ATTRIBUTE, RESOLUTION_UNIFORM, TIME_UNIFORM};

/// A linked program with every handle the animation loop needs resolved.
///
/// Only [`compile_program`] constructs this type, so holding one means the
/// program linked and all three handles exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderProgram {
    id: ProgramId,
    position: AttributeLocation,
    elapsed_time: UniformLocation,
    resolution: UniformLocation,
}

impl ShaderProgram {
    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn position(&self) -> AttributeLocation {
        self.position
    }

    pub fn elapsed_time(&self) -> UniformLocation {
        self.elapsed_time
    }

    pub fn resolution(&self) -> UniformLocation {
        self.resolution
    }

    /// Releases the backend program object.
    pub fn release<B: GraphicsBackend + ?Sized>(self, backend: &mut B) {
        debug!(program = self.id.raw(), "releasing shader program");
        backend.delete_program(self.id);
    }
}

/// Compiles and links `vertex_source`/`fragment_source`, then resolves
/// `position`, `iTime`, and `iResolution`.
///
/// On any failure every backend object created so far is released before the
/// error is returned.
pub fn compile_program<B: GraphicsBackend + ?Sized>(
    backend: &mut B,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<ShaderProgram, RenderError> {
    let vertex = compile_stage(backend, ShaderStage::Vertex, vertex_source)?;
    let fragment = match compile_stage(backend, ShaderStage::Fragment, fragment_source) {
        Ok(fragment) => fragment,
        Err(err) => {
            backend.delete_shader(vertex);
            return Err(err);
        }
    };

    let linked = backend.link_program(vertex, fragment);
    // Stage objects are not needed once linking has been attempted.
    backend.delete_shader(vertex);
    backend.delete_shader(fragment);
    let id = linked.map_err(|log| {
        error!(%log, "shader program failed to link");
        RenderError::ShaderLink { log }
    })?;

    match resolve_handles(backend, id) {
        Ok(program) => {
            debug!(
                program = id.raw(),
                position = program.position.raw(),
                elapsed_time = program.elapsed_time.raw(),
                resolution = program.resolution.raw(),
                "linked shader program"
            );
            Ok(program)
        }
        Err(err) => {
            error!(error = %err, "linked program is missing a required handle");
            backend.delete_program(id);
            Err(err)
        }
    }
}

fn compile_stage<B: GraphicsBackend + ?Sized>(
    backend: &mut B,
    stage: ShaderStage,
    source: &str,
) -> Result<ShaderId, RenderError> {
    backend.compile_shader(stage, source).map_err(|log| {
        error!(%stage, %log, "shader stage failed to compile");
        RenderError::ShaderCompilation { stage, log }
    })
}

fn resolve_handles<B: GraphicsBackend + ?Sized>(
    backend: &B,
    id: ProgramId,
) -> Result<ShaderProgram, RenderError> {
    let position = backend
        .attribute_location(id, POSITION_ATTRIBUTE)
        .ok_or_else(|| RenderError::AttributeResolution {
            name: POSITION_ATTRIBUTE.to_string(),
        })?;
    let elapsed_time = resolve_uniform(backend, id, TIME_UNIFORM, UniformKind::Float)?;
    let resolution = resolve_uniform(backend, id, RESOLUTION_UNIFORM, UniformKind::Vec2)?;
    Ok(ShaderProgram {
        id,
        position,
        elapsed_time,
        resolution,
    })
}

fn resolve_uniform<B: GraphicsBackend + ?Sized>(
    backend: &B,
    id: ProgramId,
    name: &str,
    expected: UniformKind,
) -> Result<UniformLocation, RenderError> {
    let location = backend
        .uniform_location(id, name)
        .ok_or_else(|| RenderError::UniformResolution {
            name: name.to_string(),
            reason: "not declared or not used".to_string(),
        })?;
    // Uploads are typed; a mismatched declaration would never receive a value.
    match backend.uniform_kind(id, location) {
        Some(kind) if kind == expected => Ok(location),
        Some(found) => Err(RenderError::UniformResolution {
            name: name.to_string(),
            reason: format!("declared as {found:?}, expected {expected:?}"),
        }),
        None => Err(RenderError::UniformResolution {
            name: name.to_string(),
            reason: "backend reported no type".to_string(),
        }),
    }
}
