//! 渲染器模块
//!
//! 本模块提供了统一的渲染接口，封装了不同图形后端的具体实现。
//! 应用程序通过 `GraphicsDevice` 创建资源，通过 `Renderer` 按帧提交绘制，
//! 而不需要关心具体使用的是哪个后端。
//!
//! # 架构设计
//!
//! - `GraphicsDevice`：持有后端与全部资源记录，负责资源创建
//! - `Renderer`：每帧的命令序列器，维护绑定状态并在抽象层完成绘制校验
//! - 底层实现在 `gfx` 模块中，按后端分类组织
//!
//! # 每帧调用顺序
//!
//! ```text
//! begin → clear → use_shader / use_vertex_buffer / use_textures → draw* → swap_buffers
//! ```

use std::fmt;
use std::rc::Rc;

use tracing::{debug, info, trace};

use crate::core::error::{GraphicsError, GraphicsResult};
use crate::math::{Color, Extent2D, Offset2D};

pub mod buffer;
pub mod command;
pub mod device;
pub mod resource;
pub mod shader;
pub mod shaders;
pub mod surface;
pub mod texture;
pub mod vertex;

pub use buffer::{BufferUsage, IndexData, IndexFormat, VertexBuffer};
pub use command::{FrameState, PrimitiveKind, Viewport};
pub use device::GraphicsDevice;
pub use resource::{GpuResource, ResourceId};
pub use shader::{Shader, ShaderKind, ShaderProgram, ShaderSource, UniformHandle, UniformValue};
pub use surface::{ColorSpace, SurfaceHandle};
pub use texture::{ImageSource, Texture2D, TextureSettings2D};
pub use vertex::{VertexAttribute, VertexData};

use command::{BoundResource, DrawCall, DrawRange, FrameOp, FrameTracker, ResolvedBinding};
use device::DeviceShared;
use shader::{SlotKind, UniformData};

/// 渲染器
///
/// 持有每帧的管线状态：当前着色器、顶点缓冲、纹理列表、清屏颜色和视口。
/// 绑定只记录资源 id，资源在绘制时才解析；绑定后被销毁的资源会在绘制时报错。
pub struct Renderer {
    device: Rc<DeviceShared>,
    frame: FrameTracker,
    surface_size: Extent2D,
    clear_color: Color,
    viewport: Viewport,
    shader: Option<ResourceId>,
    buffer: Option<ResourceId>,
    textures: Vec<ResourceId>,
}

impl Renderer {
    pub(crate) fn new(device: Rc<DeviceShared>, surface_size: Extent2D) -> Self {
        Self {
            device,
            frame: FrameTracker::new(FrameState::Ready),
            surface_size,
            clear_color: Color::BLACK,
            viewport: Viewport::full(surface_size),
            shader: None,
            buffer: None,
            textures: Vec::new(),
        }
    }

    /// 当前帧状态
    pub fn state(&self) -> FrameState {
        self.frame.state()
    }

    /// 当前表面尺寸
    pub fn surface_size(&self) -> Extent2D {
        self.surface_size
    }

    /// 已呈现的帧数
    pub fn frames_presented(&self) -> u64 {
        self.frame.frames_presented()
    }

    /// 当前设置的视口（未裁剪）
    pub fn current_viewport(&self) -> Viewport {
        self.viewport
    }

    // ------------------------------------------------------------------
    // 持久状态
    // ------------------------------------------------------------------

    /// 设置之后 `clear()` 使用的颜色
    pub fn clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    /// 设置视口（像素）
    ///
    /// 表面尺寸变化后需要重新设置；绘制时视口会被裁剪到表面范围内。
    pub fn viewport(&mut self, origin: Offset2D, size: Extent2D) {
        self.viewport = Viewport::new(origin, size);
    }

    /// 绑定着色器程序
    pub fn use_shader(&mut self, program: &ShaderProgram) -> GraphicsResult<()> {
        self.device.ensure_owned(program.device(), program.id())?;
        self.shader = Some(program.id());
        Ok(())
    }

    /// 绑定顶点缓冲
    pub fn use_vertex_buffer(&mut self, buffer: &VertexBuffer) -> GraphicsResult<()> {
        self.device.ensure_owned(buffer.device(), buffer.id())?;
        self.buffer = Some(buffer.id());
        Ok(())
    }

    /// 绑定单张纹理到单元 0
    pub fn use_texture(&mut self, texture: &Texture2D) -> GraphicsResult<()> {
        self.use_textures(&[texture])
    }

    /// 按顺序绑定纹理：第 i 张纹理对应纹理单元 i
    pub fn use_textures(&mut self, textures: &[&Texture2D]) -> GraphicsResult<()> {
        for texture in textures {
            self.device.ensure_owned(texture.device(), texture.id())?;
        }
        self.textures = textures.iter().map(|texture| texture.id()).collect();
        Ok(())
    }

    /// 切换到 sRGB 帧缓冲
    pub fn use_srgb_framebuffer(&mut self) -> GraphicsResult<()> {
        if self.frame.state().in_frame() {
            return Err(GraphicsError::InvalidState(
                "framebuffer color space cannot change inside an active frame".to_string(),
            ));
        }
        if self.device.color_space() == ColorSpace::Srgb {
            return Ok(());
        }

        self.device.backend_mut().set_color_space(ColorSpace::Srgb)?;
        self.device.set_color_space(ColorSpace::Srgb);
        info!("Switched to sRGB framebuffer");
        Ok(())
    }

    /// 表面尺寸变化
    ///
    /// 面积为 0（例如窗口最小化）时渲染器进入 `Uninitialized`，恢复尺寸后回到 `Ready`。
    pub fn resize(&mut self, size: Extent2D) -> GraphicsResult<()> {
        if self.frame.state().in_frame() {
            return Err(GraphicsError::InvalidState(
                "surface cannot be resized inside an active frame".to_string(),
            ));
        }

        self.device.backend_mut().resize_surface(size)?;
        self.frame.surface_resized(size)?;
        self.surface_size = size;
        debug!(width = size.width, height = size.height, "Surface resized");
        Ok(())
    }

    // ------------------------------------------------------------------
    // 帧操作
    // ------------------------------------------------------------------

    /// 开始一帧
    pub fn begin(&mut self) -> GraphicsResult<()> {
        let next = self.frame.next(FrameOp::Begin)?;
        self.device.backend_mut().begin_frame()?;
        self.frame.commit(next);
        Ok(())
    }

    /// 用当前清屏颜色清屏
    pub fn clear(&mut self) -> GraphicsResult<()> {
        let next = self.frame.next(FrameOp::Clear)?;
        self.device.backend_mut().clear(self.clear_color)?;
        self.frame.commit(next);
        Ok(())
    }

    /// 非索引绘制
    pub fn draw_vertex_buffer(
        &mut self,
        primitive: PrimitiveKind,
        first_vertex: u32,
        vertex_count: u32,
    ) -> GraphicsResult<()> {
        self.draw(
            primitive,
            DrawRange::Vertices {
                first: first_vertex,
                count: vertex_count,
            },
        )
    }

    /// 从索引 0 开始的索引绘制
    pub fn draw_vertex_buffer_indexed(
        &mut self,
        primitive: PrimitiveKind,
        index_count: u32,
    ) -> GraphicsResult<()> {
        self.draw(primitive, DrawRange::Indexed { count: index_count })
    }

    /// 呈现当前帧，必须是一帧中的最后一个调用
    pub fn swap_buffers(&mut self) -> GraphicsResult<()> {
        let next = self.frame.next(FrameOp::Present)?;
        if let Err(e) = self.device.backend_mut().present() {
            self.frame.abandon();
            return Err(e);
        }
        self.frame.commit(next);
        trace!(frame = self.frame.frames_presented(), "Frame presented");
        Ok(())
    }

    fn draw(&mut self, primitive: PrimitiveKind, range: DrawRange) -> GraphicsResult<()> {
        let next = self.frame.next(FrameOp::Draw)?;
        match self.resolve_draw(primitive, range)? {
            Some(call) => self.device.backend_mut().draw(&call)?,
            None => trace!(viewport = ?self.viewport, "Viewport outside the surface; draw skipped"),
        }
        self.frame.commit(next);
        Ok(())
    }

    /// 校验绑定状态并生成绘制命令
    ///
    /// 视口与表面没有交集时返回 None。
    fn resolve_draw(
        &self,
        primitive: PrimitiveKind,
        range: DrawRange,
    ) -> GraphicsResult<Option<DrawCall>> {
        let program_id = self
            .shader
            .ok_or_else(|| GraphicsError::BindingMismatch("no shader program bound".to_string()))?;
        let buffer_id = self
            .buffer
            .ok_or_else(|| GraphicsError::BindingMismatch("no vertex buffer bound".to_string()))?;

        let resources = self.device.resources();
        let program = resources.programs.get(program_id).ok_or_else(|| {
            GraphicsError::InvalidState(format!("bound {program_id} has been destroyed"))
        })?;
        let buffer = resources.buffers.get(buffer_id).ok_or_else(|| {
            GraphicsError::InvalidState(format!("bound {buffer_id} has been destroyed"))
        })?;

        buffer::check_layout_compat(&program.layout.vertex_inputs, &buffer.layout)
            .map_err(GraphicsError::BindingMismatch)?;

        match range {
            DrawRange::Vertices { first, count } => {
                if first as u64 + count as u64 > buffer.vertex_count as u64 {
                    return Err(GraphicsError::BindingMismatch(format!(
                        "vertices {first}..{} exceed the {} vertices of {buffer_id}",
                        first as u64 + count as u64,
                        buffer.vertex_count
                    )));
                }
            }
            DrawRange::Indexed { count } => match buffer.index {
                None => {
                    return Err(GraphicsError::BindingMismatch(format!(
                        "indexed draw with {buffer_id}, which has no index data"
                    )));
                }
                Some((index_count, _)) if count > index_count => {
                    return Err(GraphicsError::BindingMismatch(format!(
                        "{count} indices requested but {buffer_id} has {index_count}"
                    )));
                }
                Some(_) => {}
            },
        }

        // 先解析值与纹理，再让采样器跟随各自的纹理
        let slots = &program.layout.slots;
        let mut resolved: Vec<Option<BoundResource>> = Vec::with_capacity(slots.len());
        for (slot, value) in slots.iter().zip(&program.values) {
            let resource = match slot.kind {
                SlotKind::Value(ty) => Some(BoundResource::Uniform(
                    value.unwrap_or_else(|| UniformData::zeroed(ty)),
                )),
                SlotKind::Texture => {
                    let unit = match value {
                        Some(UniformData::Int(unit)) => *unit,
                        _ => 0,
                    };
                    let texture = usize::try_from(unit)
                        .ok()
                        .and_then(|unit| self.textures.get(unit))
                        .copied()
                        .ok_or_else(|| {
                            GraphicsError::BindingMismatch(format!(
                                "'{}' selects texture unit {unit} but {} texture(s) are bound",
                                slot.name,
                                self.textures.len()
                            ))
                        })?;
                    if !resources.textures.contains(texture) {
                        return Err(GraphicsError::InvalidState(format!(
                            "{texture} bound to unit {unit} has been destroyed"
                        )));
                    }
                    Some(BoundResource::Texture {
                        unit: unit as u32,
                        texture,
                    })
                }
                SlotKind::Sampler { .. } => None,
            };
            resolved.push(resource);
        }

        let mut bindings = Vec::with_capacity(slots.len());
        for (slot, resource) in slots.iter().zip(&resolved) {
            let resource = match (slot.kind, resource) {
                (SlotKind::Sampler { texture: texture_binding }, _) => {
                    let texture = slots
                        .iter()
                        .zip(&resolved)
                        .find_map(|(other, resource)| match resource {
                            Some(BoundResource::Texture { texture, .. })
                                if other.binding == texture_binding =>
                            {
                                Some(*texture)
                            }
                            _ => None,
                        })
                        .ok_or_else(|| {
                            GraphicsError::BindingMismatch(format!(
                                "sampler '{}' has no texture to follow",
                                slot.name
                            ))
                        })?;
                    BoundResource::Sampler { texture }
                }
                (_, Some(resource)) => resource.clone(),
                (_, None) => {
                    return Err(GraphicsError::BindingMismatch(format!(
                        "'{}' could not be resolved",
                        slot.name
                    )));
                }
            };
            bindings.push(ResolvedBinding {
                binding: slot.binding,
                name: slot.name.clone(),
                resource,
            });
        }

        let Some(viewport) = self.viewport.clamp_to(self.surface_size) else {
            return Ok(None);
        };

        Ok(Some(DrawCall {
            program: program_id,
            buffer: buffer_id,
            primitive,
            range,
            bindings,
            viewport,
        }))
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("state", &self.frame.state())
            .field("surface_size", &self.surface_size)
            .field("viewport", &self.viewport)
            .field("shader", &self.shader)
            .field("buffer", &self.buffer)
            .field("textures", &self.textures)
            .finish()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.device.detach_renderer();
        debug!(frames = self.frame.frames_presented(), "Renderer destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::headless::{FrameRecorder, HeadlessBackend, RecordedOp};
    use crate::renderer::texture::PixelFormat;
    use crate::renderer::vertex::{DataType, Vertex, VertexPositionColor, VertexPositionTexture};

    const TRIANGLE: [f32; 9] = [-0.5, -0.5, 0.0, 0.0, -0.5, 0.0, -0.5, 0.5, 0.0];

    struct Fixture {
        recorder: FrameRecorder,
        renderer: Renderer,
        device: GraphicsDevice,
    }

    fn fixture(width: u32, height: u32) -> Fixture {
        let backend = HeadlessBackend::new();
        let recorder = backend.recorder();
        let device = GraphicsDevice::with_backend(Box::new(backend), ColorSpace::Linear);
        let renderer = device
            .create_renderer(SurfaceHandle::headless(Extent2D::new(width, height)))
            .unwrap();
        Fixture { recorder, renderer, device }
    }

    fn plain_program(device: &GraphicsDevice) -> ShaderProgram {
        device
            .create_shader_program_from_sources(&[
                ShaderSource::vertex(shaders::PLAIN_VERTEX),
                ShaderSource::fragment(shaders::PLAIN_FRAGMENT),
            ])
            .unwrap()
    }

    fn triangle_buffer(device: &GraphicsDevice) -> VertexBuffer {
        device
            .create_vertex_buffer(
                VertexData::from_flat(&TRIANGLE, 12),
                BufferUsage::StaticDraw,
                &[VertexAttribute::new(3, DataType::Float32, 12, 0)],
            )
            .unwrap()
    }

    fn texture(device: &GraphicsDevice, shade: u8) -> Texture2D {
        let settings = TextureSettings2D {
            source_format: PixelFormat::Luminance,
            ..Default::default()
        };
        device
            .create_texture_2d(&settings, ImageSource::Raw { width: 1, height: 1, pixels: &[shade] })
            .unwrap()
    }

    #[test]
    fn test_frame_cycle_is_repeatable() {
        let Fixture { recorder, mut renderer, device } = fixture(800, 600);
        let program = plain_program(&device);
        let buffer = triangle_buffer(&device);

        for _ in 0..5 {
            renderer.begin().unwrap();
            renderer.clear().unwrap();
            renderer.use_shader(&program).unwrap();
            renderer.use_vertex_buffer(&buffer).unwrap();
            renderer.draw_vertex_buffer(PrimitiveKind::Triangles, 0, 3).unwrap();
            renderer.swap_buffers().unwrap();
            assert_eq!(renderer.state(), FrameState::Ready);
        }

        assert_eq!(renderer.frames_presented(), 5);
        assert_eq!(recorder.frame_count(), 5);
        let frame = recorder.last_frame().unwrap();
        assert_eq!(frame.ops.len(), 2);
        let draw = frame.draws().next().unwrap();
        assert_eq!(draw.program, program.id());
        assert_eq!(draw.buffer, buffer.id());
        assert_eq!(draw.range, DrawRange::Vertices { first: 0, count: 3 });
    }

    #[test]
    fn test_frame_order_enforced() {
        let Fixture { mut renderer, device, .. } = fixture(64, 64);
        let program = plain_program(&device);
        let buffer = triangle_buffer(&device);
        renderer.use_shader(&program).unwrap();
        renderer.use_vertex_buffer(&buffer).unwrap();

        let invalid = |result: GraphicsResult<()>| matches!(result, Err(GraphicsError::InvalidState(_)));
        assert!(invalid(renderer.clear()));
        assert!(invalid(renderer.draw_vertex_buffer(PrimitiveKind::Triangles, 0, 3)));
        assert!(invalid(renderer.swap_buffers()));

        renderer.begin().unwrap();
        assert!(invalid(renderer.begin()));
        assert!(invalid(renderer.resize(Extent2D::new(32, 32))));
        assert!(invalid(renderer.use_srgb_framebuffer()));
        renderer.swap_buffers().unwrap();
        assert_eq!(renderer.state(), FrameState::Ready);
    }

    #[test]
    fn test_clear_uses_persistent_color() {
        let Fixture { recorder, mut renderer, .. } = fixture(64, 64);
        let color = Color::new(0.2, 0.1, 0.2, 0.1);
        renderer.clear_color(color);

        for _ in 0..2 {
            renderer.begin().unwrap();
            renderer.clear().unwrap();
            renderer.swap_buffers().unwrap();
        }
        for frame in recorder.frames() {
            assert_eq!(frame.ops, vec![RecordedOp::Clear(color)]);
        }
    }

    #[test]
    fn test_draw_without_bindings() {
        let Fixture { mut renderer, device, .. } = fixture(64, 64);
        renderer.begin().unwrap();

        let err = renderer.draw_vertex_buffer(PrimitiveKind::Triangles, 0, 3).unwrap_err();
        assert!(matches!(err, GraphicsError::BindingMismatch(_)));

        let program = plain_program(&device);
        renderer.use_shader(&program).unwrap();
        let err = renderer.draw_vertex_buffer(PrimitiveKind::Triangles, 0, 3).unwrap_err();
        assert!(matches!(err, GraphicsError::BindingMismatch(_)));

        // 失败的绘制不改变帧状态
        assert_eq!(renderer.state(), FrameState::Begun);
    }

    #[test]
    fn test_destroyed_buffer_is_rejected() {
        let Fixture { recorder, mut renderer, device } = fixture(64, 64);
        let program = plain_program(&device);
        let buffer = triangle_buffer(&device);

        renderer.use_shader(&program).unwrap();
        renderer.use_vertex_buffer(&buffer).unwrap();
        buffer.destroy();

        // 同一槽位被新缓冲复用也不能让旧绑定复活
        let _replacement = triangle_buffer(&device);

        renderer.begin().unwrap();
        let err = renderer.draw_vertex_buffer(PrimitiveKind::Triangles, 0, 3).unwrap_err();
        assert!(matches!(err, GraphicsError::InvalidState(_)));
        renderer.swap_buffers().unwrap();

        assert_eq!(recorder.last_frame().unwrap().draws().count(), 0);
    }

    #[test]
    fn test_destroyed_program_is_rejected() {
        let Fixture { mut renderer, device, .. } = fixture(64, 64);
        let program = plain_program(&device);
        let buffer = triangle_buffer(&device);
        renderer.use_shader(&program).unwrap();
        renderer.use_vertex_buffer(&buffer).unwrap();
        drop(program);

        renderer.begin().unwrap();
        let err = renderer.draw_vertex_buffer(PrimitiveKind::Triangles, 0, 3).unwrap_err();
        assert!(matches!(err, GraphicsError::InvalidState(_)));
    }

    #[test]
    fn test_layout_mismatch_and_ranges() {
        let Fixture { mut renderer, device, .. } = fixture(64, 64);
        let colored = device
            .create_shader_program_from_sources(&[
                ShaderSource::vertex(shaders::COLORED_VERTEX),
                ShaderSource::fragment(shaders::COLORED_FRAGMENT),
            ])
            .unwrap();
        let buffer = triangle_buffer(&device);

        renderer.begin().unwrap();
        renderer.use_shader(&colored).unwrap();
        renderer.use_vertex_buffer(&buffer).unwrap();
        let err = renderer.draw_vertex_buffer(PrimitiveKind::Triangles, 0, 3).unwrap_err();
        assert!(matches!(err, GraphicsError::BindingMismatch(_)));

        let program = plain_program(&device);
        renderer.use_shader(&program).unwrap();
        assert!(renderer.draw_vertex_buffer(PrimitiveKind::Triangles, 1, 2).is_ok());
        let err = renderer.draw_vertex_buffer(PrimitiveKind::Triangles, 1, 3).unwrap_err();
        assert!(matches!(err, GraphicsError::BindingMismatch(_)));

        // 非索引缓冲不能做索引绘制
        let err = renderer.draw_vertex_buffer_indexed(PrimitiveKind::Triangles, 3).unwrap_err();
        assert!(matches!(err, GraphicsError::BindingMismatch(_)));
    }

    #[test]
    fn test_indexed_draw() {
        let Fixture { recorder, mut renderer, device } = fixture(64, 64);
        let program = device
            .create_shader_program_from_sources(&[
                ShaderSource::vertex(shaders::COLORED_VERTEX),
                ShaderSource::fragment(shaders::COLORED_FRAGMENT),
            ])
            .unwrap();
        let vertices = [
            VertexPositionColor::new(crate::math::Vector3::new(0.0, -0.5, 0.0), Color::RED),
            VertexPositionColor::new(crate::math::Vector3::new(-0.5, 0.5, 0.0), Color::GREEN),
            VertexPositionColor::new(crate::math::Vector3::new(0.5, 0.5, 0.0), Color::BLUE),
        ];
        let indices: &[u32] = &[0, 1, 2];
        let buffer = device
            .create_vertex_buffer_indexed(
                VertexData::from_records(&vertices),
                indices.into(),
                BufferUsage::StaticDraw,
                &VertexPositionColor::layout(),
            )
            .unwrap();

        let multiplicator = program.get_uniform::<f32>("multiplicator").unwrap();

        renderer.begin().unwrap();
        renderer.use_shader(&program).unwrap();
        renderer.use_vertex_buffer(&buffer).unwrap();

        // 未设置的 uniform 为零值
        renderer.draw_vertex_buffer_indexed(PrimitiveKind::Triangles, 3).unwrap();
        program.set_uniform(&multiplicator, 0.5).unwrap();
        renderer.draw_vertex_buffer_indexed(PrimitiveKind::Triangles, 3).unwrap();
        let err = renderer.draw_vertex_buffer_indexed(PrimitiveKind::Triangles, 4).unwrap_err();
        assert!(matches!(err, GraphicsError::BindingMismatch(_)));
        renderer.swap_buffers().unwrap();

        let frame = recorder.last_frame().unwrap();
        let values: Vec<_> = frame
            .draws()
            .map(|draw| draw.binding("multiplicator").cloned())
            .collect();
        assert_eq!(
            values,
            vec![
                Some(BoundResource::Uniform(UniformData::Float(0.0))),
                Some(BoundResource::Uniform(UniformData::Float(0.5))),
            ]
        );
    }

    #[test]
    fn test_texture_units_follow_bind_order() {
        let Fixture { recorder, mut renderer, device } = fixture(64, 64);
        let program = device
            .create_shader_program_from_sources(&[
                ShaderSource::vertex(shaders::TEXTURED_VERTEX),
                ShaderSource::fragment(shaders::TEXTURED_FRAGMENT),
            ])
            .unwrap();
        let quad = [VertexPositionTexture::default(); 3];
        let buffer = device
            .create_vertex_buffer(
                VertexData::from_records(&quad),
                BufferUsage::StaticDraw,
                &VertexPositionTexture::layout(),
            )
            .unwrap();
        let t0 = texture(&device, 10);
        let t1 = texture(&device, 20);

        let tex = program.get_uniform::<i32>("tex").unwrap();
        let tex2 = program.get_uniform::<i32>("tex2").unwrap();
        program.set_uniform(&tex, 0).unwrap();
        program.set_uniform(&tex2, 1).unwrap();

        renderer.use_shader(&program).unwrap();
        renderer.use_vertex_buffer(&buffer).unwrap();
        renderer.use_textures(&[&t0, &t1]).unwrap();

        renderer.begin().unwrap();
        renderer.draw_vertex_buffer(PrimitiveKind::Triangles, 0, 3).unwrap();

        // 交换纹理单元
        program.set_uniform(&tex, 1).unwrap();
        program.set_uniform(&tex2, 0).unwrap();
        renderer.draw_vertex_buffer(PrimitiveKind::Triangles, 0, 3).unwrap();
        renderer.swap_buffers().unwrap();

        let frame = recorder.last_frame().unwrap();
        let draws: Vec<_> = frame.draws().collect();

        assert_eq!(
            draws[0].binding("tex"),
            Some(&BoundResource::Texture { unit: 0, texture: t0.id() })
        );
        assert_eq!(draws[0].binding("tex_sampler"), Some(&BoundResource::Sampler { texture: t0.id() }));
        assert_eq!(
            draws[0].binding("tex2"),
            Some(&BoundResource::Texture { unit: 1, texture: t1.id() })
        );
        assert_eq!(draws[0].binding("tex2_sampler"), Some(&BoundResource::Sampler { texture: t1.id() }));

        assert_eq!(
            draws[1].binding("tex"),
            Some(&BoundResource::Texture { unit: 1, texture: t1.id() })
        );
        assert_eq!(draws[1].binding("tex2_sampler"), Some(&BoundResource::Sampler { texture: t0.id() }));
    }

    #[test]
    fn test_texture_unit_out_of_range() {
        let Fixture { mut renderer, device, .. } = fixture(64, 64);
        let program = device
            .create_shader_program_from_sources(&[
                ShaderSource::vertex(shaders::TEXTURED_VERTEX),
                ShaderSource::fragment(shaders::TEXTURED_FRAGMENT),
            ])
            .unwrap();
        let quad = [VertexPositionTexture::default(); 3];
        let buffer = device
            .create_vertex_buffer(
                VertexData::from_records(&quad),
                BufferUsage::StaticDraw,
                &VertexPositionTexture::layout(),
            )
            .unwrap();
        let t0 = texture(&device, 10);

        let tex2 = program.get_uniform::<i32>("tex2").unwrap();
        program.set_uniform(&tex2, 1).unwrap();

        renderer.use_shader(&program).unwrap();
        renderer.use_vertex_buffer(&buffer).unwrap();
        renderer.use_texture(&t0).unwrap();
        renderer.begin().unwrap();
        let err = renderer.draw_vertex_buffer(PrimitiveKind::Triangles, 0, 3).unwrap_err();
        assert!(matches!(err, GraphicsError::BindingMismatch(_)));

        // 单元号合法但纹理已被销毁
        program.set_uniform(&tex2, 0).unwrap();
        t0.destroy();
        let err = renderer.draw_vertex_buffer(PrimitiveKind::Triangles, 0, 3).unwrap_err();
        assert!(matches!(err, GraphicsError::InvalidState(_)));
    }

    #[test]
    fn test_uniform_contract() {
        let Fixture { device, .. } = fixture(64, 64);
        let colored = device
            .create_shader_program_from_sources(&[
                ShaderSource::vertex(shaders::COLORED_VERTEX),
                ShaderSource::fragment(shaders::COLORED_FRAGMENT),
            ])
            .unwrap();
        let other = device
            .create_shader_program_from_sources(&[
                ShaderSource::vertex(shaders::COLORED_VERTEX),
                ShaderSource::fragment(shaders::COLORED_FRAGMENT),
            ])
            .unwrap();

        assert!(matches!(
            colored.get_uniform::<f32>("missing"),
            Err(GraphicsError::UniformNotFound(_))
        ));
        assert!(matches!(
            colored.get_uniform::<i32>("multiplicator"),
            Err(GraphicsError::UniformTypeMismatch {
                requested: shader::UniformType::Int,
                actual: shader::UniformType::Float,
                ..
            })
        ));

        let handle = colored.get_uniform::<f32>("multiplicator").unwrap();
        assert_eq!(handle.name(), "multiplicator");
        assert_eq!(handle.program(), colored.id());
        assert_ne!(handle.program(), other.id());
        assert!(colored.set_uniform(&handle, 1.0).is_ok());
        assert!(matches!(
            other.set_uniform(&handle, 1.0),
            Err(GraphicsError::CrossProgramUniform { .. })
        ));
    }

    #[test]
    fn test_resize_and_viewport_clamp() {
        let Fixture { recorder, mut renderer, device } = fixture(800, 600);
        let program = plain_program(&device);
        let buffer = triangle_buffer(&device);
        renderer.use_shader(&program).unwrap();
        renderer.use_vertex_buffer(&buffer).unwrap();

        let draw_viewport = |renderer: &mut Renderer| {
            renderer.begin().unwrap();
            renderer.draw_vertex_buffer(PrimitiveKind::Triangles, 0, 3).unwrap();
            renderer.swap_buffers().unwrap();
            recorder.last_frame().unwrap().draws().next().map(|draw| draw.viewport)
        };

        assert_eq!(draw_viewport(&mut renderer), Some(Viewport::full(Extent2D::new(800, 600))));

        // 缩小表面：旧视口被裁剪
        renderer.resize(Extent2D::new(400, 300)).unwrap();
        assert_eq!(renderer.surface_size(), Extent2D::new(400, 300));
        assert_eq!(draw_viewport(&mut renderer), Some(Viewport::full(Extent2D::new(400, 300))));
        // 保存的视口本身不变，只在绘制时裁剪
        assert_eq!(renderer.current_viewport(), Viewport::full(Extent2D::new(800, 600)));

        // 放大表面并重新设置视口，无需重建缓冲和着色器
        renderer.resize(Extent2D::new(1024, 768)).unwrap();
        renderer.viewport(Offset2D::ZERO, Extent2D::new(1024, 768));
        assert_eq!(draw_viewport(&mut renderer), Some(Viewport::full(Extent2D::new(1024, 768))));

        // 完全在表面之外的视口跳过绘制
        renderer.viewport(Offset2D::new(2000, 0), Extent2D::new(10, 10));
        assert_eq!(
            renderer.current_viewport(),
            Viewport::new(Offset2D::new(2000, 0), Extent2D::new(10, 10))
        );
        assert_eq!(draw_viewport(&mut renderer), None);
    }

    #[test]
    fn test_zero_area_resize() {
        let Fixture { mut renderer, .. } = fixture(64, 64);
        renderer.resize(Extent2D::new(0, 0)).unwrap();
        assert_eq!(renderer.state(), FrameState::Uninitialized);
        assert!(matches!(renderer.begin(), Err(GraphicsError::InvalidState(_))));

        renderer.resize(Extent2D::new(64, 64)).unwrap();
        assert!(renderer.begin().is_ok());
    }

    #[test]
    fn test_srgb_switch() {
        let Fixture { recorder, mut renderer, device } = fixture(64, 64);
        assert_eq!(device.color_space(), ColorSpace::Linear);
        renderer.use_srgb_framebuffer().unwrap();
        assert_eq!(device.color_space(), ColorSpace::Srgb);
        assert_eq!(recorder.color_space(), Some(ColorSpace::Srgb));
    }

    #[test]
    fn test_resources_from_other_device_rejected() {
        let Fixture { mut renderer, .. } = fixture(64, 64);
        let Fixture { device: other, .. } = fixture(64, 64);
        let program = plain_program(&other);
        let buffer = triangle_buffer(&other);

        assert!(matches!(renderer.use_shader(&program), Err(GraphicsError::BindingMismatch(_))));
        assert!(matches!(
            renderer.use_vertex_buffer(&buffer),
            Err(GraphicsError::BindingMismatch(_))
        ));
    }
}
