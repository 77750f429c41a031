use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, trace, warn};
use wgpu::naga;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::backend::{
    AttributeLocation, BufferId, GraphicsBackend, ProgramId, ShaderId, ShaderStage,
    UniformKind, UniformLocation, VertexLayout,
};
use crate::error::{DrawError, RenderError};

use super::context::{ContextOptions, GpuContext};
use super::reflect::{LinkedProgram, ShaderObjects};
use super::uniforms::{UniformStaging, UniformValue};

struct GpuUniformBlock {
    buffer: wgpu::Buffer,
    staging: UniformStaging,
}

/// Vertex input the pipeline expects in buffer slot `index`.
struct PipelineInput {
    location: u32,
    stride: u64,
}

struct ProgramPipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group: Option<wgpu::BindGroup>,
    blocks: Vec<GpuUniformBlock>,
    inputs: Vec<PipelineInput>,
}

#[derive(Debug, Clone, Copy)]
struct VertexBinding {
    buffer: BufferId,
    layout: VertexLayout,
}

/// [`GraphicsBackend`] on top of `wgpu`.
///
/// Stages are parsed and reflected by `naga` at compile time; linking checks
/// the interface and builds the render pipeline inside a validation error
/// scope. Uniform writes land in CPU staging blocks that are flushed when the
/// next draw is recorded, and `clear` becomes the load op of that draw's pass.
pub struct WgpuBackend {
    context: Option<GpuContext>,
    objects: ShaderObjects,
    pipelines: HashMap<ProgramId, ProgramPipeline>,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    bindings: HashMap<u32, VertexBinding>,
    current: Option<ProgramId>,
    clear_color: wgpu::Color,
}

impl WgpuBackend {
    /// Acquires a device and a surface for `window`.
    pub fn new(
        window: Arc<Window>,
        initial_size: (u32, u32),
        options: ContextOptions,
    ) -> Result<Self, RenderError> {
        let context =
            GpuContext::new(window, initial_size, options).map_err(RenderError::logged)?;
        info!(
            width = context.config.width,
            height = context.config.height,
            format = ?context.config.format,
            "graphics context ready"
        );
        Ok(Self {
            context: Some(context),
            objects: ShaderObjects::default(),
            pipelines: HashMap::new(),
            buffers: HashMap::new(),
            bindings: HashMap::new(),
            current: None,
            clear_color: wgpu::Color::BLACK,
        })
    }

    fn write_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let Some(program) = self.current else {
            warn!(location = location.raw(), "uniform upload without a program in use");
            return;
        };
        let Some(slot) = self
            .objects
            .program(program)
            .and_then(|linked| linked.uniform(location))
        else {
            warn!(location = location.raw(), "uniform location is not part of the current program");
            return;
        };
        let Some(block) = self
            .pipelines
            .get_mut(&program)
            .and_then(|pipeline| pipeline.blocks.get_mut(slot.block))
        else {
            return;
        };
        if !block.staging.write(slot, value) {
            warn!(uniform = %slot.name, ?value, "uniform upload does not match declared type");
        }
    }
}

fn build_pipeline(context: &GpuContext, linked: &LinkedProgram) -> Result<ProgramPipeline, String> {
    let device = &context.device;
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("aurora vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(linked.vertex_source.clone()),
            stage: naga::ShaderStage::Vertex,
            defines: &[],
        },
    });
    let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("aurora fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(linked.fragment_source.clone()),
            stage: naga::ShaderStage::Fragment,
            defines: &[],
        },
    });

    let layout_entries: Vec<wgpu::BindGroupLayoutEntry> = linked
        .blocks
        .iter()
        .map(|block| wgpu::BindGroupLayoutEntry {
            binding: block.binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(u64::from(block.size)),
            },
            count: None,
        })
        .collect();
    let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("aurora uniform layout"),
        entries: &layout_entries,
    });

    let blocks: Vec<GpuUniformBlock> = linked
        .blocks
        .iter()
        .map(|block| GpuUniformBlock {
            buffer: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("aurora uniforms"),
                size: u64::from(block.size),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
            staging: UniformStaging::new(block.size),
        })
        .collect();

    let bind_group = (!blocks.is_empty()).then(|| {
        let entries: Vec<wgpu::BindGroupEntry> = linked
            .blocks
            .iter()
            .zip(&blocks)
            .map(|(layout, block)| wgpu::BindGroupEntry {
                binding: layout.binding,
                resource: block.buffer.as_entire_binding(),
            })
            .collect();
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("aurora uniform bind group"),
            layout: &uniform_layout,
            entries: &entries,
        })
    });

    let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = if blocks.is_empty() {
        Vec::new()
    } else {
        vec![&uniform_layout]
    };
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("aurora pipeline layout"),
        bind_group_layouts: &bind_group_layouts,
        push_constant_ranges: &[],
    });

    let attributes: Vec<[wgpu::VertexAttribute; 1]> = linked
        .inputs
        .iter()
        .map(|input| {
            [wgpu::VertexAttribute {
                format: input.format,
                offset: 0,
                shader_location: input.location,
            }]
        })
        .collect();
    let vertex_buffers: Vec<wgpu::VertexBufferLayout> = linked
        .inputs
        .iter()
        .zip(&attributes)
        .map(|(input, attributes)| wgpu::VertexBufferLayout {
            array_stride: input.format.size(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        })
        .collect();

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("aurora pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &vertex_module,
            entry_point: Some("main"),
            buffers: &vertex_buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: context.config.format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    });

    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(error.to_string());
    }

    let inputs = linked
        .inputs
        .iter()
        .map(|input| PipelineInput {
            location: input.location,
            stride: input.format.size(),
        })
        .collect();

    Ok(ProgramPipeline {
        pipeline,
        bind_group,
        blocks,
        inputs,
    })
}

fn draw_error(error: wgpu::SurfaceError) -> DrawError {
    match error {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => DrawError::SurfaceLost,
        wgpu::SurfaceError::Timeout => DrawError::Timeout,
        wgpu::SurfaceError::OutOfMemory => DrawError::OutOfMemory,
        other => DrawError::Backend(other.to_string()),
    }
}

impl GraphicsBackend for WgpuBackend {
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        self.objects.compile(stage, source)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.objects.delete_shader(shader);
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String> {
        let Some(context) = self.context.as_ref() else {
            return Err("graphics context has been destroyed".to_string());
        };
        let (id, linked) = self.objects.link(vertex, fragment)?;
        match build_pipeline(context, linked) {
            Ok(pipeline) => {
                self.pipelines.insert(id, pipeline);
                Ok(id)
            }
            Err(log) => {
                self.objects.delete_program(id);
                Err(log)
            }
        }
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.objects.delete_program(program);
        self.pipelines.remove(&program);
        if self.current == Some(program) {
            self.current = None;
        }
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

    fn create_vertex_buffer(&mut self, data: &[f32]) -> BufferId {
        let id = BufferId::new(self.objects.allocate_id());
        match &self.context {
            Some(context) => {
                let buffer = context
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("aurora vertices"),
                        contents: bytemuck::cast_slice(data),
                        usage: wgpu::BufferUsages::VERTEX,
                    });
                self.buffers.insert(id, buffer);
            }
            None => warn!("vertex buffer requested after the context was destroyed"),
        }
        id
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(buffer) = self.buffers.remove(&buffer) {
            buffer.destroy();
        }
        self.bindings.retain(|_, binding| binding.buffer != buffer);
    }

    fn max_surface_dimension(&self) -> u32 {
        self.context
            .as_ref()
            .map(|context| context.max_dimension)
            .unwrap_or_else(|| wgpu::Limits::downlevel_defaults().max_texture_dimension_2d)
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        if let Some(context) = self.context.as_mut() {
            context.resize(width, height);
            debug!(width, height, "reconfigured surface");
        }
    }

    fn clear(&mut self, color: [f32; 4]) {
        let [r, g, b, a] = color.map(f64::from);
        self.clear_color = wgpu::Color { r, g, b, a };
    }

    fn use_program(&mut self, program: ProgramId) {
        if self.pipelines.contains_key(&program) {
            self.current = Some(program);
        } else {
            warn!(program = program.raw(), "use of unknown program ignored");
        }
    }

    fn bind_vertex_attribute(
        &mut self,
        buffer: BufferId,
        location: AttributeLocation,
        layout: VertexLayout,
    ) {
        self.bindings
            .insert(location.raw(), VertexBinding { buffer, layout });
    }

    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32) {
        self.write_uniform(location, UniformValue::Float(value));
    }

    fn set_uniform_vec2(&mut self, location: UniformLocation, value: [f32; 2]) {
        self.write_uniform(location, UniformValue::Vec2(value));
    }

    fn draw_triangle_strip(&mut self, vertex_count: u32) -> Result<(), DrawError> {
        let Some(context) = self.context.as_mut() else {
            return Err(DrawError::Backend("graphics context has been destroyed".into()));
        };
        let Some(pipeline) = self
            .current
            .and_then(|program| self.pipelines.get_mut(&program))
        else {
            return Err(DrawError::Backend("no program in use".into()));
        };

        let mut vertex_buffers = Vec::with_capacity(pipeline.inputs.len());
        for input in &pipeline.inputs {
            let binding = self.bindings.get(&input.location).ok_or_else(|| {
                DrawError::Backend(format!("no vertex buffer bound at location {}", input.location))
            })?;
            if binding.layout.effective_stride() != input.stride {
                return Err(DrawError::Backend(format!(
                    "vertex buffer at location {} has stride {}, pipeline expects {}",
                    input.location,
                    binding.layout.effective_stride(),
                    input.stride
                )));
            }
            let buffer = self.buffers.get(&binding.buffer).ok_or_else(|| {
                DrawError::Backend(format!("vertex buffer {} is not alive", binding.buffer.raw()))
            })?;
            vertex_buffers.push((buffer, binding.layout.offset));
        }

        for block in &mut pipeline.blocks {
            if block.staging.take_dirty() {
                context
                    .queue
                    .write_buffer(&block.buffer, 0, block.staging.bytes());
            }
        }

        let frame = context.surface.get_current_texture().map_err(draw_error)?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("aurora encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("aurora pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&pipeline.pipeline);
            if let Some(bind_group) = &pipeline.bind_group {
                render_pass.set_bind_group(0, bind_group, &[]);
            }
            for (slot, (buffer, offset)) in vertex_buffers.iter().enumerate() {
                render_pass.set_vertex_buffer(slot as u32, buffer.slice(*offset..));
            }
            render_pass.set_viewport(
                0.0,
                0.0,
                context.config.width as f32,
                context.config.height as f32,
                0.0,
                1.0,
            );
            render_pass.draw(0..vertex_count, 0..1);
        }

        context.queue.submit(std::iter::once(encoder.finish()));
        let suboptimal = frame.suboptimal;
        frame.present();
        if suboptimal {
            trace!("surface reported suboptimal; reconfiguring");
            context.reconfigure();
        }
        Ok(())
    }

    fn destroy(&mut self) {
        self.current = None;
        self.bindings.clear();
        self.pipelines.clear();
        for (_, buffer) in self.buffers.drain() {
            buffer.destroy();
        }
        self.objects.clear();
        if self.context.take().is_some() {
            info!("graphics context destroyed");
        }
    }
}
