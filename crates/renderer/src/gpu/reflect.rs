//! GLSL front-end, validation and interface reflection through `naga`.
//!
//! `wgpu` has no separate compile and link steps, so this module supplies
//! them: [`compile_stage`] parses and validates one stage and records its
//! interface, and [`link`] checks that the two stages agree and flattens
//! their uniform blocks into addressable slots. Both GPU and offline
//! backends sit on top of [`ShaderObjects`].

use std::collections::HashMap;

use wgpu::naga;
use wgpu::naga::front::glsl::{Frontend, Options};
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::backend::{
    AttributeLocation, ProgramId, ShaderId, ShaderStage, UniformKind, UniformLocation,
};

fn naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    }
}

/// A user-defined stage input or output bound to a `location`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InterfaceVariable {
    pub name: Option<String>,
    pub location: u32,
    pub ty: naga::TypeInner,
}

impl InterfaceVariable {
    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

fn uniform_kind_of(inner: &naga::TypeInner) -> UniformKind {
    match *inner {
        naga::TypeInner::Scalar(scalar) if scalar == naga::Scalar::F32 => UniformKind::Float,
        naga::TypeInner::Vector {
            size: naga::VectorSize::Bi,
            scalar,
        } if scalar == naga::Scalar::F32 => UniformKind::Vec2,
        _ => UniformKind::Other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UniformMember {
    pub name: String,
    pub offset: u32,
    pub kind: UniformKind,
}

/// One `uniform` interface block as laid out by the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UniformBlock {
    pub group: u32,
    pub binding: u32,
    pub size: u32,
    pub members: Vec<UniformMember>,
}

/// A parsed, validated shader stage and its reflected interface.
#[derive(Debug, Clone)]
pub(crate) struct CompiledStage {
    pub stage: ShaderStage,
    pub source: String,
    pub inputs: Vec<InterfaceVariable>,
    pub outputs: Vec<InterfaceVariable>,
    pub uniforms: Vec<UniformBlock>,
}

/// Parses and validates `source`, returning the front-end or validator
/// diagnostic on failure.
pub(crate) fn compile_stage(stage: ShaderStage, source: &str) -> Result<CompiledStage, String> {
    let mut frontend = Frontend::default();
    let module = frontend
        .parse(&Options::from(naga_stage(stage)), source)
        .map_err(|errors| errors.emit_to_string(source))?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|error| error.emit_to_string(source))?;

    let entry = module
        .entry_points
        .iter()
        .find(|entry| entry.stage == naga_stage(stage))
        .ok_or_else(|| format!("no {stage} entry point (`void main()`) found"))?;

    let inputs = entry
        .function
        .arguments
        .iter()
        .filter_map(|arg| located(&module, arg.name.clone(), arg.ty, arg.binding.as_ref()))
        .collect();

    let outputs = match &entry.function.result {
        Some(result) => match (&module.types[result.ty].inner, &result.binding) {
            (naga::TypeInner::Struct { members, .. }, None) => members
                .iter()
                .filter_map(|member| {
                    located(&module, member.name.clone(), member.ty, member.binding.as_ref())
                })
                .collect(),
            (_, binding) => located(&module, None, result.ty, binding.as_ref())
                .into_iter()
                .collect(),
        },
        None => Vec::new(),
    };

    let uniforms = module
        .global_variables
        .iter()
        .filter_map(|(_, global)| uniform_block(&module, global))
        .collect();

    Ok(CompiledStage {
        stage,
        source: source.to_string(),
        inputs,
        outputs,
        uniforms,
    })
}

fn located(
    module: &naga::Module,
    name: Option<String>,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
) -> Option<InterfaceVariable> {
    match binding {
        Some(naga::Binding::Location { location, .. }) => Some(InterfaceVariable {
            name,
            location: *location,
            ty: module.types[ty].inner.clone(),
        }),
        _ => None,
    }
}

fn uniform_block(module: &naga::Module, global: &naga::GlobalVariable) -> Option<UniformBlock> {
    if global.space != naga::AddressSpace::Uniform {
        return None;
    }
    let binding = global.binding.as_ref()?;
    let naga::TypeInner::Struct { members, span } = &module.types[global.ty].inner else {
        return None;
    };
    let members = members
        .iter()
        .filter_map(|member| {
            Some(UniformMember {
                name: member.name.clone()?,
                offset: member.offset,
                kind: uniform_kind_of(&module.types[member.ty].inner),
            })
        })
        .collect();
    Some(UniformBlock {
        group: binding.group,
        binding: binding.binding,
        size: *span,
        members,
    })
}

/// A vertex stage input the pipeline must feed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VertexInput {
    pub name: String,
    pub location: u32,
    pub format: wgpu::VertexFormat,
}

/// A uniform addressable through a [`UniformLocation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UniformSlot {
    pub name: String,
    /// Index into [`LinkedProgram::blocks`].
    pub block: usize,
    pub offset: u32,
    pub kind: UniformKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockLayout {
    pub binding: u32,
    pub size: u32,
}

/// Result of a successful link: everything a pipeline needs, minus the GPU.
#[derive(Debug, Clone)]
pub(crate) struct LinkedProgram {
    pub vertex_source: String,
    pub fragment_source: String,
    pub inputs: Vec<VertexInput>,
    pub blocks: Vec<BlockLayout>,
    pub uniforms: Vec<UniformSlot>,
}

impl LinkedProgram {
    pub fn attribute_location(&self, name: &str) -> Option<AttributeLocation> {
        self.inputs
            .iter()
            .find(|input| input.name == name)
            .map(|input| AttributeLocation::new(input.location))
    }

    /// Uniform locations are indices into the flattened slot table.
    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms
            .iter()
            .position(|slot| slot.name == name)
            .map(|index| UniformLocation::new(index as u32))
    }

    pub fn uniform_kind(&self, location: UniformLocation) -> Option<UniformKind> {
        self.uniform(location).map(|slot| slot.kind)
    }

    pub fn uniform(&self, location: UniformLocation) -> Option<&UniformSlot> {
        self.uniforms.get(location.raw() as usize)
    }
}

/// Checks the stage interface and merges uniform blocks.
pub(crate) fn link(vertex: &CompiledStage, fragment: &CompiledStage) -> Result<LinkedProgram, String> {
    if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
        return Err("link requires one vertex and one fragment shader".to_string());
    }

    for input in &fragment.inputs {
        let output = vertex
            .outputs
            .iter()
            .find(|output| output.location == input.location)
            .ok_or_else(|| {
                format!(
                    "fragment input '{}' at location {} is not written by the vertex stage",
                    input.label(),
                    input.location
                )
            })?;
        if output.ty != input.ty {
            return Err(format!(
                "fragment input '{}' at location {} does not match the type of vertex output '{}'",
                input.label(),
                input.location,
                output.label()
            ));
        }
    }

    let mut merged: Vec<&UniformBlock> = Vec::new();
    for block in vertex.uniforms.iter().chain(&fragment.uniforms) {
        if block.group != 0 {
            return Err(format!(
                "uniform block at set {} is unsupported; only set 0 is bound",
                block.group
            ));
        }
        match merged.iter().find(|existing| existing.binding == block.binding) {
            Some(existing) if *existing != block => {
                return Err(format!(
                    "uniform block at binding {} is declared differently in each stage",
                    block.binding
                ));
            }
            Some(_) => {}
            None => merged.push(block),
        }
    }
    merged.sort_by_key(|block| block.binding);

    let blocks = merged
        .iter()
        .map(|block| BlockLayout {
            binding: block.binding,
            size: block.size,
        })
        .collect();
    let uniforms = merged
        .iter()
        .enumerate()
        .flat_map(|(index, block)| {
            block.members.iter().map(move |member| UniformSlot {
                name: member.name.clone(),
                block: index,
                offset: member.offset,
                kind: member.kind,
            })
        })
        .collect();

    let inputs = vertex
        .inputs
        .iter()
        .map(|input| {
            let format = vertex_format(&input.ty).ok_or_else(|| {
                format!(
                    "vertex input '{}' must be a float scalar or vector",
                    input.label()
                )
            })?;
            Ok(VertexInput {
                name: input.name.clone().unwrap_or_default(),
                location: input.location,
                format,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;

    Ok(LinkedProgram {
        vertex_source: vertex.source.clone(),
        fragment_source: fragment.source.clone(),
        inputs,
        blocks,
        uniforms,
    })
}

fn vertex_format(inner: &naga::TypeInner) -> Option<wgpu::VertexFormat> {
    match *inner {
        naga::TypeInner::Scalar(scalar) if scalar == naga::Scalar::F32 => {
            Some(wgpu::VertexFormat::Float32)
        }
        naga::TypeInner::Vector { size, scalar } if scalar == naga::Scalar::F32 => Some(match size {
            naga::VectorSize::Bi => wgpu::VertexFormat::Float32x2,
            naga::VectorSize::Tri => wgpu::VertexFormat::Float32x3,
            naga::VectorSize::Quad => wgpu::VertexFormat::Float32x4,
        }),
        _ => None,
    }
}

/// Handle table for compiled stages and linked programs.
#[derive(Debug, Default)]
pub(crate) struct ShaderObjects {
    next_id: u32,
    shaders: HashMap<ShaderId, CompiledStage>,
    programs: HashMap<ProgramId, LinkedProgram>,
}

impl ShaderObjects {
    pub fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn compile(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        let compiled = compile_stage(stage, source)?;
        let id = ShaderId::new(self.allocate_id());
        self.shaders.insert(id, compiled);
        Ok(id)
    }

    pub fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }

    /// Links two live stages. The program is registered only on success.
    pub fn link(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<(ProgramId, &LinkedProgram), String> {
        let vertex = self
            .shaders
            .get(&vertex)
            .ok_or_else(|| format!("unknown vertex shader object {}", vertex.raw()))?;
        let fragment = self
            .shaders
            .get(&fragment)
            .ok_or_else(|| format!("unknown fragment shader object {}", fragment.raw()))?;
        let linked = link(vertex, fragment)?;
        let id = ProgramId::new(self.allocate_id());
        let linked = self.programs.entry(id).or_insert(linked);
        Ok((id, linked))
    }

    pub fn delete_program(&mut self, program: ProgramId) -> Option<LinkedProgram> {
        self.programs.remove(&program)
    }

    pub fn program(&self, program: ProgramId) -> Option<&LinkedProgram> {
        self.programs.get(&program)
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn clear(&mut self) {
        self.shaders.clear();
        self.programs.clear();
    }
}
