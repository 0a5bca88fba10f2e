//! wgpu 图形后端
//!
//! 把前端的资源描述和已解析的绘制命令翻译为 wgpu 调用：
//! - 着色器模块、绑定组布局、顶点/索引缓冲、纹理与采样器
//! - 按 (程序, 顶点布局, 图元, 目标格式) 缓存渲染管线
//! - 帧内命令先累积，`present` 时统一编码；每次清屏开启新的渲染通道
//!
//! uniform 值在绘制时快照进独立的 uniform 缓冲，同一帧内修改 uniform 不影响之前的绘制。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};
use wgpu::util::DeviceExt;

use crate::core::config::GraphicsConfig;
use crate::core::error::{GraphicsError, GraphicsResult};
use crate::gfx::backend::{BufferDesc, GraphicsBackend, ProgramDesc, ShaderDesc, TextureDesc};
use crate::gfx::wgpu::context::{Gpu, WgpuContext};
use crate::math::{Color, Extent2D};
use crate::renderer::buffer::IndexFormat;
use crate::renderer::command::{BoundResource, DrawCall, DrawRange, PrimitiveKind, Viewport};
use crate::renderer::resource::ResourceId;
use crate::renderer::shader::{SlotKind, UniformSlot};
use crate::renderer::surface::{ColorSpace, SurfaceHandle};
use crate::renderer::texture::{FilterMode, TextureSettings2D, WrapMode};
use crate::renderer::vertex::{DataType, VertexAttribute};

/// uniform 缓冲按 16 字节对齐
const UNIFORM_ALIGNMENT: usize = 16;

struct GpuProgram {
    vertex: Arc<wgpu::ShaderModule>,
    fragment: Arc<wgpu::ShaderModule>,
    vertex_entry: String,
    fragment_entry: String,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
}

#[derive(Clone)]
struct GpuBuffer {
    vertices: Arc<wgpu::Buffer>,
    indices: Option<(Arc<wgpu::Buffer>, wgpu::IndexFormat)>,
    layout: Arc<[VertexAttribute]>,
    stride: u32,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

/// 渲染管线缓存键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ResourceId,
    layout: Arc<[VertexAttribute]>,
    stride: u32,
    primitive: PrimitiveKind,
    strip_index_format: Option<wgpu::IndexFormat>,
    target: wgpu::TextureFormat,
}

/// 准备好的绘制，持有编码所需的全部 GPU 对象
struct PreparedDraw {
    pipeline: Arc<wgpu::RenderPipeline>,
    bind_group: wgpu::BindGroup,
    vertices: Arc<wgpu::Buffer>,
    indices: Option<(Arc<wgpu::Buffer>, wgpu::IndexFormat)>,
    range: DrawRange,
    viewport: Viewport,
}

enum FrameCommand {
    Clear(Color),
    Draw(PreparedDraw),
}

/// 一个渲染通道：起始的加载操作加上其后的绘制
struct PassSegment<'a> {
    load: wgpu::LoadOp<wgpu::Color>,
    draws: Vec<&'a PreparedDraw>,
}

/// wgpu 图形后端
pub struct WgpuBackend {
    context: WgpuContext,
    shaders: HashMap<ResourceId, Arc<wgpu::ShaderModule>>,
    programs: HashMap<ResourceId, GpuProgram>,
    buffers: HashMap<ResourceId, GpuBuffer>,
    textures: HashMap<ResourceId, GpuTexture>,
    pipelines: HashMap<PipelineKey, Arc<wgpu::RenderPipeline>>,
    frame: Option<Vec<FrameCommand>>,
}

impl WgpuBackend {
    pub fn new(config: &GraphicsConfig) -> GraphicsResult<Self> {
        Ok(Self {
            context: WgpuContext::new(config)?,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            pipelines: HashMap::new(),
            frame: None,
        })
    }

    fn frame_mut(&mut self) -> GraphicsResult<&mut Vec<FrameCommand>> {
        self.frame
            .as_mut()
            .ok_or_else(|| GraphicsError::InvalidState("no frame in progress".to_string()))
    }

    fn pipeline(
        &mut self,
        call: &DrawCall,
        buffer: &GpuBuffer,
        strip_index_format: Option<wgpu::IndexFormat>,
    ) -> GraphicsResult<Arc<wgpu::RenderPipeline>> {
        let target = self
            .context
            .surface_format()
            .ok_or_else(|| GraphicsError::InvalidState("no surface attached".to_string()))?;
        let key = PipelineKey {
            program: call.program,
            layout: Arc::clone(&buffer.layout),
            stride: buffer.stride,
            primitive: call.primitive,
            strip_index_format,
            target,
        };
        if let Some(pipeline) = self.pipelines.get(&key) {
            return Ok(Arc::clone(pipeline));
        }

        let program = self
            .programs
            .get(&call.program)
            .ok_or_else(|| GraphicsError::InvalidState(format!("{} is not allocated", call.program)))?;
        let gpu = self.context.gpu()?;
        let pipeline = Arc::new(create_pipeline(gpu, program, &key)?);
        debug!(program = %call.program, primitive = ?call.primitive, ?target, "Render pipeline created");
        self.pipelines.insert(key, Arc::clone(&pipeline));
        Ok(pipeline)
    }
}

impl GraphicsBackend for WgpuBackend {
    fn backend_name(&self) -> &'static str {
        "wgpu"
    }

    fn attach_surface(&mut self, surface: &SurfaceHandle, color_space: ColorSpace) -> GraphicsResult<()> {
        self.context.attach_surface(surface, color_space)
    }

    fn detach_surface(&mut self) {
        self.frame = None;
        self.context.detach_surface();
    }

    fn resize_surface(&mut self, size: Extent2D) -> GraphicsResult<()> {
        self.context.resize(size)
    }

    fn set_color_space(&mut self, color_space: ColorSpace) -> GraphicsResult<()> {
        self.context.set_color_space(color_space)
    }

    fn create_shader(&mut self, id: ResourceId, desc: &ShaderDesc<'_>) -> GraphicsResult<()> {
        let gpu = self.context.ensure_gpu()?;
        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.kind.name()),
            source: wgpu::ShaderSource::Wgsl(desc.source.into()),
        });
        if let Some(e) = pollster::block_on(gpu.device.pop_error_scope()) {
            return Err(GraphicsError::Compile {
                stage: desc.kind,
                log: e.to_string(),
            });
        }

        trace!(%id, stage = desc.kind.name(), "Shader module created");
        self.shaders.insert(id, Arc::new(module));
        Ok(())
    }

    fn create_program(&mut self, id: ResourceId, desc: &ProgramDesc<'_>) -> GraphicsResult<()> {
        let module = |stage: ResourceId| {
            self.shaders
                .get(&stage)
                .cloned()
                .ok_or_else(|| GraphicsError::InvalidState(format!("{stage} is not allocated")))
        };
        let vertex = module(desc.vertex)?;
        let fragment = module(desc.fragment)?;

        let gpu = self.context.gpu()?;
        let entries: Vec<wgpu::BindGroupLayoutEntry> = desc.slots.iter().map(layout_entry).collect();

        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group_layout = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Program Bind Group Layout"),
            entries: &entries,
        });
        let pipeline_layout = gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Program Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        if let Some(e) = pollster::block_on(gpu.device.pop_error_scope()) {
            return Err(GraphicsError::Link { log: e.to_string() });
        }

        trace!(%id, slots = desc.slots.len(), "Program created");
        self.programs.insert(
            id,
            GpuProgram {
                vertex,
                fragment,
                vertex_entry: desc.vertex_entry.to_string(),
                fragment_entry: desc.fragment_entry.to_string(),
                bind_group_layout,
                pipeline_layout,
            },
        );
        Ok(())
    }

    fn create_buffer(&mut self, id: ResourceId, desc: &BufferDesc<'_>) -> GraphicsResult<()> {
        let gpu = self.context.ensure_gpu()?;

        // wgpu 没有使用频率提示，三种用法都映射为可写的顶点缓冲
        gpu.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let vertices = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: desc.vertices,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let indices = desc.indices.map(|(bytes, format)| {
            let buffer = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytes,
                usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            });
            (Arc::new(buffer), index_format(format))
        });
        if let Some(e) = pollster::block_on(gpu.device.pop_error_scope()) {
            return Err(GraphicsError::ResourceCreation(format!("vertex buffer: {e}")));
        }

        trace!(%id, usage = ?desc.usage, bytes = desc.vertices.len(), "Vertex buffer created");
        self.buffers.insert(
            id,
            GpuBuffer {
                vertices: Arc::new(vertices),
                indices,
                layout: desc.layout.into(),
                stride: desc.stride,
            },
        );
        Ok(())
    }

    fn create_texture(&mut self, id: ResourceId, desc: &TextureDesc<'_>) -> GraphicsResult<()> {
        let gpu = self.context.ensure_gpu()?;
        let max = gpu.device.limits().max_texture_dimension_2d;
        if desc.width > max || desc.height > max {
            return Err(GraphicsError::ResourceCreation(format!(
                "{}x{} texture exceeds the maximum dimension {max}",
                desc.width, desc.height
            )));
        }

        let format = if desc.settings.target_format.is_srgb() {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };

        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Texture 2D"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        gpu.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            desc.pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * desc.width),
                rows_per_image: Some(desc.height),
            },
            size,
        );
        let sampler = create_sampler(gpu, desc.settings);
        if let Some(e) = pollster::block_on(gpu.device.pop_error_scope()) {
            return Err(GraphicsError::ResourceCreation(format!("texture: {e}")));
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        trace!(%id, width = desc.width, height = desc.height, ?format, "Texture created");
        self.textures.insert(
            id,
            GpuTexture {
                _texture: texture,
                view,
                sampler,
            },
        );
        Ok(())
    }

    fn release(&mut self, id: ResourceId) {
        let released = self.shaders.remove(&id).is_some()
            || self.buffers.remove(&id).is_some()
            || self.textures.remove(&id).is_some()
            || match self.programs.remove(&id) {
                Some(_) => {
                    self.pipelines.retain(|key, _| key.program != id);
                    true
                }
                None => false,
            };
        if released {
            trace!(%id, "wgpu resource released");
        }
    }

    fn begin_frame(&mut self) -> GraphicsResult<()> {
        self.context.gpu()?;
        self.frame = Some(Vec::new());
        Ok(())
    }

    fn clear(&mut self, color: Color) -> GraphicsResult<()> {
        self.frame_mut()?.push(FrameCommand::Clear(color));
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall) -> GraphicsResult<()> {
        let buffer = self
            .buffers
            .get(&call.buffer)
            .cloned()
            .ok_or_else(|| GraphicsError::InvalidState(format!("{} is not allocated", call.buffer)))?;
        let prepared = self.prepare_draw(call, &buffer)?;
        self.frame_mut()?.push(FrameCommand::Draw(prepared));
        Ok(())
    }

    fn present(&mut self) -> GraphicsResult<()> {
        let commands = self
            .frame
            .take()
            .ok_or_else(|| GraphicsError::InvalidState("no frame in progress".to_string()))?;
        let output = self.context.acquire()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let gpu = self.context.gpu()?;

        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });
        for segment in split_passes(&commands) {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: segment.load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for draw in segment.draws {
                let Viewport { origin, size } = draw.viewport;
                pass.set_viewport(
                    origin.x as f32,
                    origin.y as f32,
                    size.width as f32,
                    size.height as f32,
                    0.0,
                    1.0,
                );
                pass.set_pipeline(&draw.pipeline);
                pass.set_bind_group(0, &draw.bind_group, &[]);
                pass.set_vertex_buffer(0, draw.vertices.slice(..));
                match (draw.range, &draw.indices) {
                    (DrawRange::Vertices { first, count }, _) => pass.draw(first..first + count, 0..1),
                    (DrawRange::Indexed { count }, Some((indices, format))) => {
                        pass.set_index_buffer(indices.slice(..), *format);
                        pass.draw_indexed(0..count, 0, 0..1);
                    }
                    (DrawRange::Indexed { .. }, None) => {
                        warn!("Indexed draw without an index buffer skipped");
                    }
                }
            }
        }

        gpu.queue.submit(Some(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl WgpuBackend {
    fn prepare_draw(&mut self, call: &DrawCall, buffer: &GpuBuffer) -> GraphicsResult<PreparedDraw> {
        let indices = match call.range {
            DrawRange::Indexed { .. } => buffer.indices.clone(),
            DrawRange::Vertices { .. } => None,
        };
        let strip_index_format = match &indices {
            Some((_, format)) if call.primitive.is_strip() => Some(*format),
            _ => None,
        };
        let pipeline = self.pipeline(call, buffer, strip_index_format)?;

        let program = self
            .programs
            .get(&call.program)
            .ok_or_else(|| GraphicsError::InvalidState(format!("{} is not allocated", call.program)))?;
        let gpu = self.context.gpu()?;

        let uniforms: Vec<Option<wgpu::Buffer>> = call
            .bindings
            .iter()
            .map(|binding| match &binding.resource {
                BoundResource::Uniform(data) => {
                    let mut bytes = data.to_bytes();
                    bytes.resize(bytes.len().next_multiple_of(UNIFORM_ALIGNMENT), 0);
                    Some(gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(binding.name.as_str()),
                        contents: &bytes,
                        usage: wgpu::BufferUsages::UNIFORM,
                    }))
                }
                _ => None,
            })
            .collect();

        let textures = &self.textures;
        let texture = |id: ResourceId| {
            textures
                .get(&id)
                .ok_or_else(|| GraphicsError::InvalidState(format!("{id} is not allocated")))
        };
        let entries = call
            .bindings
            .iter()
            .zip(&uniforms)
            .map(|(binding, uniform)| {
                let resource = match (&binding.resource, uniform) {
                    (BoundResource::Texture { texture: id, .. }, _) => {
                        wgpu::BindingResource::TextureView(&texture(*id)?.view)
                    }
                    (BoundResource::Sampler { texture: id }, _) => {
                        wgpu::BindingResource::Sampler(&texture(*id)?.sampler)
                    }
                    (BoundResource::Uniform(_), Some(buffer)) => buffer.as_entire_binding(),
                    (BoundResource::Uniform(_), None) => {
                        return Err(GraphicsError::InvalidState(format!(
                            "uniform '{}' has no buffer",
                            binding.name
                        )));
                    }
                };
                Ok(wgpu::BindGroupEntry {
                    binding: binding.binding,
                    resource,
                })
            })
            .collect::<GraphicsResult<Vec<_>>>()?;

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Bind Group"),
            layout: &program.bind_group_layout,
            entries: &entries,
        });

        Ok(PreparedDraw {
            pipeline,
            bind_group,
            vertices: Arc::clone(&buffer.vertices),
            indices,
            range: call.range,
            viewport: call.viewport,
        })
    }
}

/// 在每次清屏处切分渲染通道
fn split_passes(commands: &[FrameCommand]) -> Vec<PassSegment<'_>> {
    let mut segments = Vec::new();
    let mut current = PassSegment {
        load: wgpu::LoadOp::Load,
        draws: Vec::new(),
    };

    for command in commands {
        match command {
            FrameCommand::Clear(color) => {
                let load = wgpu::LoadOp::Clear(wgpu::Color {
                    r: color.r as f64,
                    g: color.g as f64,
                    b: color.b as f64,
                    a: color.a as f64,
                });
                if current.draws.is_empty() {
                    current.load = load;
                } else {
                    segments.push(std::mem::replace(
                        &mut current,
                        PassSegment { load, draws: Vec::new() },
                    ));
                }
            }
            FrameCommand::Draw(draw) => current.draws.push(draw),
        }
    }

    // 只有 Load 且没有绘制的通道什么也不做
    if !current.draws.is_empty() || matches!(current.load, wgpu::LoadOp::Clear(_)) {
        segments.push(current);
    }
    segments
}

fn layout_entry(slot: &UniformSlot) -> wgpu::BindGroupLayoutEntry {
    let ty = match slot.kind {
        SlotKind::Value(_) => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        SlotKind::Texture => wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        SlotKind::Sampler { .. } => wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
    };
    wgpu::BindGroupLayoutEntry {
        binding: slot.binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty,
        count: None,
    }
}

fn create_pipeline(gpu: &Gpu, program: &GpuProgram, key: &PipelineKey) -> GraphicsResult<wgpu::RenderPipeline> {
    let attributes: Vec<wgpu::VertexAttribute> = key
        .layout
        .iter()
        .enumerate()
        .map(|(location, attribute)| wgpu::VertexAttribute {
            format: vertex_format(attribute),
            offset: attribute.offset as wgpu::BufferAddress,
            shader_location: location as u32,
        })
        .collect();

    gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = gpu.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Render Pipeline"),
        layout: Some(&program.pipeline_layout),
        vertex: wgpu::VertexState {
            module: &program.vertex,
            entry_point: &program.vertex_entry,
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: key.stride as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module: &program.fragment,
            entry_point: &program.fragment_entry,
            targets: &[Some(wgpu::ColorTargetState {
                format: key.target,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: topology(key.primitive),
            strip_index_format: key.strip_index_format,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    });
    match pollster::block_on(gpu.device.pop_error_scope()) {
        Some(e) => Err(GraphicsError::ResourceCreation(format!("render pipeline: {e}"))),
        None => Ok(pipeline),
    }
}

fn create_sampler(gpu: &Gpu, settings: &TextureSettings2D) -> wgpu::Sampler {
    let border_supported = gpu.supports_clamp_to_border();
    let address_mode = |wrap: WrapMode| match wrap {
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        WrapMode::ClampToBorder if border_supported => wgpu::AddressMode::ClampToBorder,
        WrapMode::ClampToBorder => {
            warn!("ClampToBorder is not supported by this adapter, using ClampToEdge");
            wgpu::AddressMode::ClampToEdge
        }
    };
    let address_mode_u = address_mode(settings.wrap_s);
    let address_mode_v = address_mode(settings.wrap_t);
    let uses_border = address_mode_u == wgpu::AddressMode::ClampToBorder
        || address_mode_v == wgpu::AddressMode::ClampToBorder;

    gpu.device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Texture Sampler"),
        address_mode_u,
        address_mode_v,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter_mode(settings.mag_filter),
        min_filter: filter_mode(settings.min_filter),
        mipmap_filter: wgpu::FilterMode::Nearest,
        border_color: uses_border.then(|| border_color(settings.border_color.unwrap_or(Color::TRANSPARENT))),
        ..Default::default()
    })
}

/// wgpu 只支持三种边框色，取最接近的一种
fn border_color(color: Color) -> wgpu::SamplerBorderColor {
    if color.a < 0.5 {
        wgpu::SamplerBorderColor::TransparentBlack
    } else if (color.r + color.g + color.b) / 3.0 >= 0.5 {
        wgpu::SamplerBorderColor::OpaqueWhite
    } else {
        wgpu::SamplerBorderColor::OpaqueBlack
    }
}

fn filter_mode(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

fn topology(primitive: PrimitiveKind) -> wgpu::PrimitiveTopology {
    match primitive {
        PrimitiveKind::Points => wgpu::PrimitiveTopology::PointList,
        PrimitiveKind::Lines => wgpu::PrimitiveTopology::LineList,
        PrimitiveKind::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        PrimitiveKind::Triangles => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveKind::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

fn index_format(format: IndexFormat) -> wgpu::IndexFormat {
    match format {
        IndexFormat::U16 => wgpu::IndexFormat::Uint16,
        IndexFormat::U32 => wgpu::IndexFormat::Uint32,
    }
}

fn vertex_format(attribute: &VertexAttribute) -> wgpu::VertexFormat {
    use wgpu::VertexFormat as F;
    match (attribute.data_type, attribute.components) {
        (DataType::Float32, 1) => F::Float32,
        (DataType::Float32, 2) => F::Float32x2,
        (DataType::Float32, 3) => F::Float32x3,
        (DataType::Float32, _) => F::Float32x4,
        (DataType::Int32, 1) => F::Sint32,
        (DataType::Int32, 2) => F::Sint32x2,
        (DataType::Int32, 3) => F::Sint32x3,
        (DataType::Int32, _) => F::Sint32x4,
        (DataType::UInt32, 1) => F::Uint32,
        (DataType::UInt32, 2) => F::Uint32x2,
        (DataType::UInt32, 3) => F::Uint32x3,
        (DataType::UInt32, _) => F::Uint32x4,
    }
}
