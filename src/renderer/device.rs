//! 图形设备
//!
//! `GraphicsDevice` 持有图形后端和所有资源记录，并负责创建渲染器、
//! 着色器、顶点缓冲和纹理。
//!
//! # 资源模型
//!
//! - 设备状态保存在 `Rc<DeviceShared>` 中，每个资源句柄和渲染器都持有一份引用，
//!   因此设备一定比它们活得更久
//! - 资源句柄是独占的 RAII 对象：drop（或 `destroy`）时移除记录并释放后端对象
//! - 所有参数校验都在调用后端之前完成，校验失败不会产生任何后端分配
//!
//! 设备是单线程的（`Rc` + `RefCell`），不实现 `Send`。

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, info, warn};

use crate::core::config::{GraphicsBackendKind, GraphicsConfig};
use crate::core::error::{GraphicsError, GraphicsResult};
use crate::gfx::backend::{BufferDesc, GraphicsBackend, ProgramDesc, ShaderDesc, TextureDesc};
use crate::gfx::headless::HeadlessBackend;
use crate::gfx::wgpu::WgpuBackend;
use crate::renderer::buffer::{self, BufferUsage, IndexData, IndexFormat, VertexBuffer};
use crate::renderer::resource::{GpuResource, ResourceId, ResourceKind, ResourceRegistry};
use crate::renderer::shader::{
    self, ProgramLayout, Shader, ShaderKind, ShaderProgram, ShaderReflection, ShaderSource,
    UniformData,
};
use crate::renderer::surface::{ColorSpace, SurfaceHandle};
use crate::renderer::texture::{self, ImageSource, Texture2D, TextureSettings2D};
use crate::renderer::vertex::{VertexAttribute, VertexData};
use crate::renderer::Renderer;

static NEXT_DEVICE_SERIAL: AtomicU32 = AtomicU32::new(1);

/// 着色器阶段记录
#[derive(Debug)]
pub(crate) struct ShaderRecord {
    pub reflection: ShaderReflection,
}

/// 着色器程序记录，保存当前 uniform 值
#[derive(Debug)]
pub(crate) struct ProgramRecord {
    pub layout: ProgramLayout,
    /// 与 `layout.slots` 一一对应；None 表示未设置（按零值处理）
    pub values: Vec<Option<UniformData>>,
}

/// 顶点缓冲记录
#[derive(Debug)]
pub(crate) struct BufferRecord {
    pub vertex_count: u32,
    pub index: Option<(u32, IndexFormat)>,
    pub layout: Vec<VertexAttribute>,
}

/// 纹理记录（尺寸与设置保存在句柄上）
#[derive(Debug)]
pub(crate) struct TextureRecord;

/// 设备拥有的全部资源记录
#[derive(Debug)]
pub(crate) struct ResourceTables {
    pub shaders: ResourceRegistry<ShaderRecord>,
    pub programs: ResourceRegistry<ProgramRecord>,
    pub buffers: ResourceRegistry<BufferRecord>,
    pub textures: ResourceRegistry<TextureRecord>,
}

impl ResourceTables {
    fn new() -> Self {
        Self {
            shaders: ResourceRegistry::new(ResourceKind::Shader),
            programs: ResourceRegistry::new(ResourceKind::Program),
            buffers: ResourceRegistry::new(ResourceKind::Buffer),
            textures: ResourceRegistry::new(ResourceKind::Texture),
        }
    }

    fn live(&self) -> usize {
        self.shaders.len() + self.programs.len() + self.buffers.len() + self.textures.len()
    }

    fn remove(&mut self, id: ResourceId) -> bool {
        match id.kind() {
            ResourceKind::Shader => self.shaders.remove(id).is_some(),
            ResourceKind::Program => self.programs.remove(id).is_some(),
            ResourceKind::Buffer => self.buffers.remove(id).is_some(),
            ResourceKind::Texture => self.textures.remove(id).is_some(),
        }
    }
}

/// 设备共享状态
pub(crate) struct DeviceShared {
    serial: u32,
    backend: RefCell<Box<dyn GraphicsBackend>>,
    resources: RefCell<ResourceTables>,
    renderer_attached: Cell<bool>,
    color_space: Cell<ColorSpace>,
}

impl DeviceShared {
    /// 进程内唯一的设备编号
    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn backend_mut(&self) -> RefMut<'_, Box<dyn GraphicsBackend>> {
        self.backend.borrow_mut()
    }

    pub fn resources(&self) -> Ref<'_, ResourceTables> {
        self.resources.borrow()
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space.get()
    }

    pub fn set_color_space(&self, color_space: ColorSpace) {
        self.color_space.set(color_space);
    }

    pub fn with_program<R>(&self, id: ResourceId, f: impl FnOnce(&ProgramRecord) -> R) -> Option<R> {
        self.resources.borrow().programs.get(id).map(f)
    }

    pub fn with_program_mut<R>(
        &self,
        id: ResourceId,
        f: impl FnOnce(&mut ProgramRecord) -> R,
    ) -> Option<R> {
        self.resources.borrow_mut().programs.get_mut(id).map(f)
    }

    /// 释放资源：移除记录并通知后端
    pub fn release(&self, id: ResourceId) {
        let removed = match self.resources.try_borrow_mut() {
            Ok(mut resources) => resources.remove(id),
            Err(_) => {
                warn!(%id, "Resource tables busy during release");
                return;
            }
        };
        if !removed {
            return;
        }

        match self.backend.try_borrow_mut() {
            Ok(mut backend) => backend.release(id),
            Err(_) => warn!(%id, "Backend busy during release; GPU object leaked"),
        }
        debug!(%id, "Resource released");
    }

    /// 渲染器销毁时调用
    pub fn detach_renderer(&self) {
        if let Ok(mut backend) = self.backend.try_borrow_mut() {
            backend.detach_surface();
        }
        self.renderer_attached.set(false);
    }

    /// 检查另一个句柄是否属于本设备
    pub fn ensure_owned(self: &Rc<Self>, owner: &Rc<DeviceShared>, what: ResourceId) -> GraphicsResult<()> {
        if Rc::ptr_eq(self, owner) {
            Ok(())
        } else {
            Err(GraphicsError::BindingMismatch(format!(
                "{what} belongs to a different graphics device"
            )))
        }
    }
}

/// 图形设备
///
/// 克隆开销很小，所有克隆共享同一组资源。
#[derive(Clone)]
pub struct GraphicsDevice {
    shared: Rc<DeviceShared>,
}

impl GraphicsDevice {
    /// 按配置选择后端并创建设备
    pub fn new(config: &GraphicsConfig) -> GraphicsResult<Self> {
        let backend: Box<dyn GraphicsBackend> = match config.backend {
            GraphicsBackendKind::Wgpu => Box::new(WgpuBackend::new(config)?),
            GraphicsBackendKind::Headless => Box::new(HeadlessBackend::new()),
        };
        Ok(Self::with_backend(
            backend,
            ColorSpace::from_srgb_flag(config.srgb_framebuffer),
        ))
    }

    /// 使用指定的后端创建设备
    pub fn with_backend(backend: Box<dyn GraphicsBackend>, color_space: ColorSpace) -> Self {
        info!(backend = backend.backend_name(), ?color_space, "Graphics device created");
        Self {
            shared: Rc::new(DeviceShared {
                serial: NEXT_DEVICE_SERIAL.fetch_add(1, Ordering::Relaxed),
                backend: RefCell::new(backend),
                resources: RefCell::new(ResourceTables::new()),
                renderer_attached: Cell::new(false),
                color_space: Cell::new(color_space),
            }),
        }
    }

    /// 后端名称
    pub fn backend_name(&self) -> &'static str {
        self.shared.backend.borrow().backend_name()
    }

    /// 帧缓冲颜色空间
    pub fn color_space(&self) -> ColorSpace {
        self.shared.color_space()
    }

    /// 存活的资源数量（着色器、程序、缓冲、纹理）
    pub fn live_resources(&self) -> usize {
        self.shared.resources().live()
    }

    /// 为表面创建渲染器
    ///
    /// 每个设备同时只能有一个渲染器。
    pub fn create_renderer(&self, surface: SurfaceHandle) -> GraphicsResult<Renderer> {
        if self.shared.renderer_attached.get() {
            return Err(GraphicsError::ContextCreation(
                "a renderer already exists for this device".to_string(),
            ));
        }
        surface.validate()?;

        self.shared
            .backend_mut()
            .attach_surface(&surface, self.shared.color_space())?;
        self.shared.renderer_attached.set(true);

        let size = surface.size();
        info!(width = size.width, height = size.height, "Renderer created");
        Ok(Renderer::new(Rc::clone(&self.shared), size))
    }

    /// 编译单个着色器阶段
    pub fn create_shader(&self, kind: ShaderKind, source: &str) -> GraphicsResult<Shader> {
        let reflection = shader::reflect(kind, source).map_err(|e| {
            warn!(stage = kind.name(), error = %e, "Shader compilation failed");
            e
        })?;

        let id = self.shared.resources.borrow_mut().shaders.reserve();
        self.shared.backend_mut().create_shader(
            id,
            &ShaderDesc {
                kind,
                source,
                entry_point: &reflection.entry_point,
            },
        )?;
        self.shared
            .resources
            .borrow_mut()
            .shaders
            .insert(id, ShaderRecord { reflection });

        debug!(%id, stage = kind.name(), "Shader created");
        Ok(Shader::new(Rc::clone(&self.shared), id, kind))
    }

    /// 链接着色器程序
    ///
    /// 需要恰好一个顶点阶段和一个片段阶段。
    pub fn create_shader_program(&self, shaders: &[&Shader]) -> GraphicsResult<ShaderProgram> {
        for shader in shaders {
            self.shared.ensure_owned(shader.device(), shader.id())?;
        }

        let reflections: Vec<ShaderReflection> = {
            let resources = self.shared.resources();
            shaders
                .iter()
                .map(|shader| {
                    resources
                        .shaders
                        .get(shader.id())
                        .map(|record| record.reflection.clone())
                        .ok_or_else(|| {
                            GraphicsError::InvalidState(format!("{} has been destroyed", shader.id()))
                        })
                })
                .collect::<GraphicsResult<_>>()?
        };

        let stages: Vec<&ShaderReflection> = reflections.iter().collect();
        let layout = shader::link(&stages).map_err(|log| {
            warn!(error = %log, "Shader program link failed");
            GraphicsError::Link { log }
        })?;

        // 链接成功意味着两个阶段各有且仅有一个
        let stage_id = |kind: ShaderKind| {
            shaders
                .iter()
                .find(|shader| shader.kind() == kind)
                .map(|shader| shader.id())
                .ok_or_else(|| GraphicsError::Link {
                    log: format!("missing {} stage", kind.name()),
                })
        };
        let vertex = stage_id(ShaderKind::Vertex)?;
        let fragment = stage_id(ShaderKind::Fragment)?;

        let id = self.shared.resources.borrow_mut().programs.reserve();
        self.shared.backend_mut().create_program(
            id,
            &ProgramDesc {
                vertex,
                fragment,
                vertex_entry: &layout.vertex_entry,
                fragment_entry: &layout.fragment_entry,
                slots: &layout.slots,
            },
        )?;

        let slot_count = layout.slots.len();
        self.shared.resources.borrow_mut().programs.insert(
            id,
            ProgramRecord {
                layout,
                values: vec![None; slot_count],
            },
        );

        debug!(%id, slots = slot_count, "Shader program linked");
        Ok(ShaderProgram::new(Rc::clone(&self.shared), id))
    }

    /// 从源码直接创建程序
    ///
    /// 中间的着色器阶段在返回前全部释放，无论成功与否。
    pub fn create_shader_program_from_sources(
        &self,
        sources: &[ShaderSource<'_>],
    ) -> GraphicsResult<ShaderProgram> {
        let shaders = sources
            .iter()
            .map(|source| self.create_shader(source.kind, source.source))
            .collect::<GraphicsResult<Vec<_>>>()?;
        let refs: Vec<&Shader> = shaders.iter().collect();
        self.create_shader_program(&refs)
    }

    /// 创建非索引顶点缓冲
    pub fn create_vertex_buffer(
        &self,
        vertices: VertexData<'_>,
        usage: BufferUsage,
        layout: &[VertexAttribute],
    ) -> GraphicsResult<VertexBuffer> {
        self.create_buffer(vertices, None, usage, layout)
    }

    /// 创建带索引的顶点缓冲
    pub fn create_vertex_buffer_indexed(
        &self,
        vertices: VertexData<'_>,
        indices: IndexData<'_>,
        usage: BufferUsage,
        layout: &[VertexAttribute],
    ) -> GraphicsResult<VertexBuffer> {
        self.create_buffer(vertices, Some(indices), usage, layout)
    }

    fn create_buffer(
        &self,
        vertices: VertexData<'_>,
        indices: Option<IndexData<'_>>,
        usage: BufferUsage,
        layout: &[VertexAttribute],
    ) -> GraphicsResult<VertexBuffer> {
        let vertex_count = buffer::validate_buffer(&vertices, indices.as_ref(), layout)
            .map_err(|reason| {
                warn!(%reason, "Vertex buffer rejected");
                GraphicsError::ResourceCreation(reason)
            })?;
        let index = indices.map(|i| (i.len() as u32, i.format()));

        let id = self.shared.resources.borrow_mut().buffers.reserve();
        self.shared.backend_mut().create_buffer(
            id,
            &BufferDesc {
                vertices: vertices.bytes(),
                indices: indices.map(|i| (i.bytes(), i.format())),
                usage,
                layout,
                stride: vertices.record_size() as u32,
            },
        )?;
        self.shared.resources.borrow_mut().buffers.insert(
            id,
            BufferRecord {
                vertex_count,
                index,
                layout: layout.to_vec(),
            },
        );

        debug!(%id, vertex_count, ?index, ?usage, "Vertex buffer created");
        Ok(VertexBuffer::new(
            Rc::clone(&self.shared),
            id,
            usage,
            vertex_count,
            index,
            layout.to_vec(),
        ))
    }

    /// 创建二维纹理
    pub fn create_texture_2d(
        &self,
        settings: &TextureSettings2D,
        source: ImageSource<'_>,
    ) -> GraphicsResult<Texture2D> {
        let image = texture::load_rgba(settings, source).map_err(|reason| {
            warn!(%reason, "Texture rejected");
            GraphicsError::ResourceCreation(reason)
        })?;

        let id = self.shared.resources.borrow_mut().textures.reserve();
        self.shared.backend_mut().create_texture(
            id,
            &TextureDesc {
                width: image.width,
                height: image.height,
                pixels: &image.pixels,
                settings,
            },
        )?;
        self.shared.resources.borrow_mut().textures.insert(id, TextureRecord);

        debug!(%id, width = image.width, height = image.height, "Texture created");
        Ok(Texture2D::new(
            Rc::clone(&self.shared),
            id,
            image.width,
            image.height,
            *settings,
        ))
    }
}

impl fmt::Debug for GraphicsDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("serial", &self.shared.serial)
            .field("color_space", &self.shared.color_space())
            .field("live_resources", &self.live_resources())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::headless::FrameRecorder;
    use crate::math::Extent2D;
    use crate::renderer::shaders;
    use crate::renderer::texture::PixelFormat;
    use crate::renderer::vertex::{DataType, Vertex, VertexPositionTexture};

    const TRIANGLE: [f32; 9] = [-0.5, -0.5, 0.0, 0.0, -0.5, 0.0, -0.5, 0.5, 0.0];

    fn headless_device() -> (GraphicsDevice, FrameRecorder) {
        let backend = HeadlessBackend::new();
        let recorder = backend.recorder();
        (GraphicsDevice::with_backend(Box::new(backend), ColorSpace::Srgb), recorder)
    }

    fn float3(stride: u32) -> Vec<VertexAttribute> {
        vec![VertexAttribute::new(3, DataType::Float32, stride, 0)]
    }

    #[test]
    fn test_vertex_buffer_reports_vertex_count() {
        let (device, _) = headless_device();

        let buffer = device
            .create_vertex_buffer(VertexData::from_flat(&TRIANGLE, 12), BufferUsage::StaticDraw, &float3(12))
            .unwrap();
        assert_eq!(buffer.vertex_count(), 3);
        assert!(!buffer.is_indexed());

        let quad = [
            VertexPositionTexture { position: [-0.5, -0.5, 0.0], tex_coord: [0.0, 0.0] },
            VertexPositionTexture { position: [0.5, -0.5, 0.0], tex_coord: [1.0, 0.0] },
            VertexPositionTexture { position: [0.5, 0.5, 0.0], tex_coord: [1.0, 1.0] },
            VertexPositionTexture { position: [-0.5, 0.5, 0.0], tex_coord: [0.0, 1.0] },
        ];
        let indices: &[u16] = &[0, 1, 2, 0, 2, 3];
        let buffer = device
            .create_vertex_buffer_indexed(
                VertexData::from_records(&quad),
                indices.into(),
                BufferUsage::StaticDraw,
                &VertexPositionTexture::layout(),
            )
            .unwrap();
        assert_eq!(buffer.vertex_count(), 4);
        assert_eq!(buffer.index_count(), Some(6));
        assert_eq!(buffer.index_format(), Some(IndexFormat::U16));
        assert_eq!(device.live_resources(), 2);
    }

    #[test]
    fn test_stride_mismatch_allocates_nothing() {
        let (device, recorder) = headless_device();

        for stride in [8, 16, 24] {
            let err = device
                .create_vertex_buffer(
                    VertexData::from_flat(&TRIANGLE, 12),
                    BufferUsage::StaticDraw,
                    &float3(stride),
                )
                .unwrap_err();
            assert!(matches!(err, GraphicsError::ResourceCreation(_)));
        }

        let empty: [f32; 0] = [];
        let err = device
            .create_vertex_buffer(VertexData::from_flat(&empty, 12), BufferUsage::StaticDraw, &float3(12))
            .unwrap_err();
        assert!(matches!(err, GraphicsError::ResourceCreation(_)));

        assert_eq!(recorder.total_allocations(), 0);
        assert_eq!(device.live_resources(), 0);
    }

    #[test]
    fn test_destroy_releases_backend_allocation() {
        let (device, recorder) = headless_device();
        let buffer = device
            .create_vertex_buffer(VertexData::from_flat(&TRIANGLE, 12), BufferUsage::DynamicDraw, &float3(12))
            .unwrap();
        assert!(recorder.is_live(buffer.id()));
        let id = buffer.id();

        buffer.destroy();
        assert!(!recorder.is_live(id));
        assert_eq!(device.live_resources(), 0);
    }

    #[test]
    fn test_program_from_sources_releases_stages() {
        let (device, recorder) = headless_device();
        let program = device
            .create_shader_program_from_sources(&[
                ShaderSource::vertex(shaders::PLAIN_VERTEX),
                ShaderSource::fragment(shaders::PLAIN_FRAGMENT),
            ])
            .unwrap();

        assert_eq!(device.live_resources(), 1);
        assert_eq!(recorder.live_allocations(), 1);
        assert!(program.uniforms().is_empty());
    }

    #[test]
    fn test_link_failures() {
        let (device, _) = headless_device();
        let vertex = device.create_shader(ShaderKind::Vertex, shaders::PLAIN_VERTEX).unwrap();
        let fragment = device.create_shader(ShaderKind::Fragment, shaders::PLAIN_FRAGMENT).unwrap();

        let err = device.create_shader_program(&[&vertex]).unwrap_err();
        assert!(matches!(err, GraphicsError::Link { .. }));
        let err = device.create_shader_program(&[&fragment]).unwrap_err();
        assert!(matches!(err, GraphicsError::Link { .. }));

        let program = device.create_shader_program(&[&vertex, &fragment]).unwrap();
        // 程序不依赖已释放的阶段
        vertex.destroy();
        fragment.destroy();
        assert_eq!(device.live_resources(), 1);
        drop(program);
        assert_eq!(device.live_resources(), 0);
    }

    #[test]
    fn test_compile_error_is_reported() {
        let (device, recorder) = headless_device();
        let err = device
            .create_shader(ShaderKind::Vertex, "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return 1; }")
            .unwrap_err();
        assert!(matches!(err, GraphicsError::Compile { stage: ShaderKind::Vertex, .. }));
        assert_eq!(recorder.total_allocations(), 0);
    }

    #[test]
    fn test_shader_from_other_device_rejected() {
        let (device_a, _) = headless_device();
        let (device_b, _) = headless_device();
        let vertex = device_a.create_shader(ShaderKind::Vertex, shaders::PLAIN_VERTEX).unwrap();
        let fragment = device_b.create_shader(ShaderKind::Fragment, shaders::PLAIN_FRAGMENT).unwrap();

        let err = device_a.create_shader_program(&[&vertex, &fragment]).unwrap_err();
        assert!(matches!(err, GraphicsError::BindingMismatch(_)));
    }

    #[test]
    fn test_texture_creation() {
        let (device, _) = headless_device();
        let settings = TextureSettings2D {
            source_format: PixelFormat::Rgb,
            ..Default::default()
        };

        let texture = device
            .create_texture_2d(
                &settings,
                ImageSource::Raw { width: 2, height: 2, pixels: &[128; 12] },
            )
            .unwrap();
        assert_eq!((texture.width(), texture.height()), (2, 2));
        assert_eq!(texture.settings().source_format, PixelFormat::Rgb);

        let err = device
            .create_texture_2d(&settings, ImageSource::Encoded(b"not an image"))
            .unwrap_err();
        assert!(matches!(err, GraphicsError::ResourceCreation(_)));
        assert_eq!(device.live_resources(), 1);
    }

    #[test]
    fn test_one_renderer_per_device() {
        let (device, recorder) = headless_device();
        let surface = SurfaceHandle::headless(Extent2D::new(320, 240));

        let renderer = device.create_renderer(surface.clone()).unwrap();
        assert_eq!(recorder.surface_size(), Some(Extent2D::new(320, 240)));
        assert!(matches!(
            device.create_renderer(surface.clone()),
            Err(GraphicsError::ContextCreation(_))
        ));

        drop(renderer);
        assert_eq!(recorder.surface_size(), None);
        assert!(device.create_renderer(surface).is_ok());
    }

    #[test]
    fn test_zero_area_surface_rejected() {
        let (device, _) = headless_device();
        let err = device
            .create_renderer(SurfaceHandle::headless(Extent2D::new(640, 0)))
            .unwrap_err();
        assert!(matches!(err, GraphicsError::ContextCreation(_)));

        // 失败后仍然可以创建
        assert!(device.create_renderer(SurfaceHandle::headless(Extent2D::new(640, 480))).is_ok());
    }
}
