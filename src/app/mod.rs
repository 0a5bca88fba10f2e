//! 宿主生命周期与演示场景
//!
//! 宿主（窗口事件循环或 headless 驱动）通过 `SurfaceLifecycle` 通知场景：
//! 表面就绪、每帧更新、尺寸变化、即将关闭。
//!
//! `DemoScene` 绘制三个三角形：
//! - 纯色三角形（无 uniform）
//! - 双纹理混合的四边形（索引绘制，纹理单元由 uniform 选择）
//! - 顶点色三角形，颜色乘以逐帧递增的 `multiplicator`

use std::path::Path;

use tracing::{debug, info, trace, warn};

use crate::core::config::DemoConfig;
use crate::core::error::{GraphicsError, GraphicsResult};
use crate::math::{utils, Color, Extent2D, Offset2D, Vector2, Vector3};
use crate::renderer::shader::ShaderKind;
use crate::renderer::texture::{FilterMode, PixelFormat, TextureFormat, WrapMode};
use crate::renderer::vertex::{DataType, Vertex, VertexPositionColor, VertexPositionTexture};
use crate::renderer::{
    shaders, BufferUsage, FrameState, GraphicsDevice, ImageSource, PrimitiveKind, Renderer,
    ShaderProgram, ShaderSource, SurfaceHandle, Texture2D, TextureSettings2D, UniformHandle,
    VertexAttribute, VertexBuffer, VertexData,
};

/// 程序生成纹理的边长
const CHECKER_SIZE: u32 = 64;
/// 棋盘格单元边长
const CHECKER_CELL: u32 = 8;

/// 宿主生命周期回调
pub trait SurfaceLifecycle {
    /// 表面创建完成，初始化渲染器与全部资源
    fn on_surface_ready(&mut self, surface: SurfaceHandle) -> GraphicsResult<()>;

    /// 绘制一帧
    fn on_frame(&mut self) -> GraphicsResult<()>;

    /// 表面尺寸变化
    fn on_surface_resized(&mut self, size: Extent2D) -> GraphicsResult<()>;

    /// 表面即将销毁，释放全部资源
    fn on_surface_closing(&mut self);
}

/// 场景持有的全部资源
struct SceneResources {
    renderer: Renderer,
    plain: ShaderProgram,
    colored: ShaderProgram,
    textured: ShaderProgram,
    brick: Texture2D,
    moss: Texture2D,
    triangle: VertexBuffer,
    quad: VertexBuffer,
    colored_triangle: VertexBuffer,
    multiplicator: UniformHandle<f32>,
    tex: UniformHandle<i32>,
    tex2: UniformHandle<i32>,
    value: f32,
}

impl SceneResources {
    /// 先释放子资源，最后释放渲染器
    fn release(self) {
        let SceneResources {
            renderer,
            plain,
            colored,
            textured,
            brick,
            moss,
            triangle,
            quad,
            colored_triangle,
            ..
        } = self;

        brick.destroy();
        moss.destroy();

        textured.destroy();
        colored.destroy();
        plain.destroy();

        triangle.destroy();
        quad.destroy();
        colored_triangle.destroy();

        drop(renderer);
    }
}

/// 三角形演示场景
pub struct DemoScene {
    device: GraphicsDevice,
    config: DemoConfig,
    resources: Option<SceneResources>,
}

impl DemoScene {
    pub fn new(device: GraphicsDevice, config: DemoConfig) -> Self {
        Self {
            device,
            config,
            resources: None,
        }
    }

    pub fn device(&self) -> &GraphicsDevice {
        &self.device
    }

    /// 表面是否已初始化
    pub fn is_ready(&self) -> bool {
        self.resources.is_some()
    }

    /// 当前的 multiplicator 值
    pub fn multiplicator(&self) -> Option<f32> {
        self.resources.as_ref().map(|scene| scene.value)
    }

    /// 已呈现的帧数
    pub fn frames_presented(&self) -> u64 {
        self.resources
            .as_ref()
            .map_or(0, |scene| scene.renderer.frames_presented())
    }

    fn build(&self, surface: SurfaceHandle) -> GraphicsResult<SceneResources> {
        let size = surface.size();
        let mut renderer = self.device.create_renderer(surface)?;
        renderer.use_srgb_framebuffer()?;

        let plain = self.device.create_shader_program_from_sources(&[
            ShaderSource::vertex(shaders::PLAIN_VERTEX),
            ShaderSource::fragment(shaders::PLAIN_FRAGMENT),
        ])?;

        // 手动创建着色器阶段，程序创建后立即释放
        let colored = {
            let vertex = self.device.create_shader(ShaderKind::Vertex, shaders::COLORED_VERTEX)?;
            let fragment = self
                .device
                .create_shader(ShaderKind::Fragment, shaders::COLORED_FRAGMENT)?;
            self.device.create_shader_program(&[&vertex, &fragment])?
        };

        let textured = self.device.create_shader_program_from_sources(&[
            ShaderSource::vertex(shaders::TEXTURED_VERTEX),
            ShaderSource::fragment(shaders::TEXTURED_FRAGMENT),
        ])?;

        let settings = TextureSettings2D::new(
            TextureFormat::Srgb8,
            PixelFormat::Bgr,
            WrapMode::MirroredRepeat,
            WrapMode::MirroredRepeat,
            FilterMode::Linear,
            FilterMode::Linear,
            None,
        );
        let brick = self.load_texture(
            &settings,
            self.config.brick_texture.as_deref(),
            [40, 60, 150],
            [150, 160, 170],
        )?;
        let moss = self.load_texture(
            &settings,
            self.config.moss_texture.as_deref(),
            [30, 110, 60],
            [20, 60, 40],
        )?;
        let tex = textured.get_uniform::<i32>("tex")?;
        let tex2 = textured.get_uniform::<i32>("tex2")?;

        let multiplicator = colored.get_uniform::<f32>("multiplicator")?;
        let value = 0.0;
        colored.set_uniform(&multiplicator, value)?;

        let triangle = self.create_triangle()?;
        let quad = self.create_quad()?;
        let colored_triangle = self.create_colored_triangle()?;

        renderer.clear_color(Color::new(0.2, 0.1, 0.2, 0.1));
        renderer.viewport(Offset2D::ZERO, size);

        Ok(SceneResources {
            renderer,
            plain,
            colored,
            textured,
            brick,
            moss,
            triangle,
            quad,
            colored_triangle,
            multiplicator,
            tex,
            tex2,
            value,
        })
    }

    /// 从配置的路径加载纹理；未配置或文件不存在时生成 BGR 棋盘格
    fn load_texture(
        &self,
        settings: &TextureSettings2D,
        path: Option<&str>,
        dark: [u8; 3],
        light: [u8; 3],
    ) -> GraphicsResult<Texture2D> {
        match path {
            Some(path) if Path::new(path).exists() => {
                info!(path, "Loading texture");
                self.device.create_texture_2d(settings, ImageSource::from_path(path))
            }
            Some(path) => {
                warn!(path, "Texture file not found, using generated texture");
                self.generated_texture(settings, dark, light)
            }
            None => {
                debug!("No texture configured, using generated texture");
                self.generated_texture(settings, dark, light)
            }
        }
    }

    fn generated_texture(
        &self,
        settings: &TextureSettings2D,
        dark: [u8; 3],
        light: [u8; 3],
    ) -> GraphicsResult<Texture2D> {
        let pixels = checkerboard(CHECKER_SIZE, CHECKER_CELL, dark, light);
        self.device.create_texture_2d(
            settings,
            ImageSource::Raw {
                width: CHECKER_SIZE,
                height: CHECKER_SIZE,
                pixels: &pixels,
            },
        )
    }

    /// 只含位置的扁平 float 数组
    fn create_triangle(&self) -> GraphicsResult<VertexBuffer> {
        let vertices: [f32; 9] = [
            -0.5, -0.5, 0.0, //
            0.0, -0.5, 0.0, //
            -0.5, 0.5, 0.0,
        ];
        let attribute = VertexAttribute::new(3, DataType::Float32, 3 * 4, 0);
        self.device.create_vertex_buffer(
            VertexData::from_flat(&vertices, 3 * 4),
            BufferUsage::StaticDraw,
            &[attribute],
        )
    }

    /// 位置 + 纹理坐标的索引四边形
    fn create_quad(&self) -> GraphicsResult<VertexBuffer> {
        let vertices = [
            VertexPositionTexture::new(Vector3::new(0.0, -0.5, 0.0), Vector2::new(0.0, 1.0)),
            VertexPositionTexture::new(Vector3::new(0.5, -0.5, 0.0), Vector2::new(1.0, 1.0)),
            VertexPositionTexture::new(Vector3::new(0.5, 0.5, 0.0), Vector2::new(1.0, 0.0)),
            VertexPositionTexture::new(Vector3::new(0.0, 0.5, 0.0), Vector2::new(0.0, 0.0)),
        ];
        let indices: &[u32] = &[0, 1, 2, 0, 2, 3];
        self.device.create_vertex_buffer_indexed(
            VertexData::from_records(&vertices),
            indices.into(),
            BufferUsage::StaticDraw,
            &VertexPositionTexture::layout(),
        )
    }

    /// 位置 + 颜色的索引三角形
    fn create_colored_triangle(&self) -> GraphicsResult<VertexBuffer> {
        let vertices = [
            VertexPositionColor::new(Vector3::new(0.0, -0.5, 0.0), Color::RED),
            VertexPositionColor::new(Vector3::new(-0.5, 0.5, 0.0), Color::GREEN),
            VertexPositionColor::new(Vector3::new(0.0, 0.5, 0.0), Color::BLUE),
        ];
        let indices: &[u16] = &[0, 1, 2];
        self.device.create_vertex_buffer_indexed(
            VertexData::from_records(&vertices),
            indices.into(),
            BufferUsage::StaticDraw,
            &VertexPositionColor::layout(),
        )
    }
}

impl SurfaceLifecycle for DemoScene {
    fn on_surface_ready(&mut self, surface: SurfaceHandle) -> GraphicsResult<()> {
        if self.resources.is_some() {
            return Err(GraphicsError::InvalidState(
                "surface is already initialized".to_string(),
            ));
        }

        info!(backend = self.device.backend_name(), size = ?surface.size(), "Initializing demo scene");
        let scene = self.build(surface)?;
        info!(resources = self.device.live_resources(), "Demo scene ready");
        self.resources = Some(scene);
        Ok(())
    }

    fn on_frame(&mut self) -> GraphicsResult<()> {
        let scene = self
            .resources
            .as_mut()
            .ok_or_else(|| GraphicsError::InvalidState("surface is not initialized".to_string()))?;
        let renderer = &mut scene.renderer;

        // 最小化时表面面积为 0，跳过本帧
        if renderer.state() == FrameState::Uninitialized {
            trace!("Surface has zero area, frame skipped");
            return Ok(());
        }

        renderer.begin()?;
        if let Err(e) = draw_scene(scene) {
            // 结束本帧，避免渲染器停留在帧内
            warn!(error = %e, "Frame failed, finishing it early");
            if let Err(present) = scene.renderer.swap_buffers() {
                debug!(error = %present, "Present after failed frame also failed");
            }
            return Err(e);
        }
        scene.renderer.swap_buffers()
    }

    fn on_surface_resized(&mut self, size: Extent2D) -> GraphicsResult<()> {
        let Some(scene) = self.resources.as_mut() else {
            return Ok(());
        };
        scene.renderer.resize(size)?;
        scene.renderer.viewport(Offset2D::ZERO, size);
        Ok(())
    }

    fn on_surface_closing(&mut self) {
        if let Some(scene) = self.resources.take() {
            scene.release();
            info!(remaining = self.device.live_resources(), "Demo scene released");
        }
    }
}

impl Drop for DemoScene {
    fn drop(&mut self) {
        self.on_surface_closing();
    }
}

/// 清屏并依次绘制三个对象，调用前必须已经 `begin()`
fn draw_scene(scene: &mut SceneResources) -> GraphicsResult<()> {
    let renderer = &mut scene.renderer;
    renderer.clear()?;

    renderer.use_shader(&scene.plain)?;
    renderer.use_vertex_buffer(&scene.triangle)?;
    renderer.draw_vertex_buffer(PrimitiveKind::Triangles, 0, 3)?;

    // 纹理单元顺序由 use_textures 决定，uniform 选择单元
    renderer.use_shader(&scene.textured)?;
    renderer.use_vertex_buffer(&scene.quad)?;
    renderer.use_textures(&[&scene.brick, &scene.moss])?;
    scene.textured.set_uniform(&scene.tex, 0)?;
    scene.textured.set_uniform(&scene.tex2, 1)?;
    renderer.draw_vertex_buffer_indexed(PrimitiveKind::Triangles, 6)?;

    scene.value = utils::saturate(scene.value + 0.01);
    scene.colored.set_uniform(&scene.multiplicator, scene.value)?;

    renderer.use_shader(&scene.colored)?;
    renderer.use_vertex_buffer(&scene.colored_triangle)?;
    renderer.draw_vertex_buffer_indexed(PrimitiveKind::Triangles, 3)?;

    Ok(())
}

/// 生成 BGR 棋盘格像素
fn checkerboard(size: u32, cell: u32, dark: [u8; 3], light: [u8; 3]) -> Vec<u8> {
    (0..size * size)
        .flat_map(|i| {
            let (x, y) = (i % size, i / size);
            let [r, g, b] = if (x / cell + y / cell) % 2 == 0 { dark } else { light };
            [b, g, r]
        })
        .collect()
}
