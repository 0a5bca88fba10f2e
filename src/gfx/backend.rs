//! 图形后端的统一抽象接口
//!
//! 本模块定义了所有图形后端（wgpu、headless）必须实现的统一接口。
//! `GraphicsDevice` 与 `Renderer` 在调用后端之前已经完成全部参数校验，
//! 后端收到的描述符和绘制命令一定是合法的，只需要处理 API 自身的失败。
//!
//! 资源由前端分配的 `ResourceId` 标识，后端用它索引自己的 GPU 对象。

use crate::core::error::GraphicsResult;
use crate::math::{Color, Extent2D};
use crate::renderer::buffer::{BufferUsage, IndexFormat};
use crate::renderer::command::DrawCall;
use crate::renderer::resource::ResourceId;
use crate::renderer::shader::{ShaderKind, UniformSlot};
use crate::renderer::surface::{ColorSpace, SurfaceHandle};
use crate::renderer::texture::TextureSettings2D;
use crate::renderer::vertex::VertexAttribute;

/// 着色器阶段描述
#[derive(Debug, Clone, Copy)]
pub struct ShaderDesc<'a> {
    pub kind: ShaderKind,
    pub source: &'a str,
    pub entry_point: &'a str,
}

/// 着色器程序描述
#[derive(Debug, Clone, Copy)]
pub struct ProgramDesc<'a> {
    pub vertex: ResourceId,
    pub fragment: ResourceId,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    /// `@group(0)` 中的全部槽位
    pub slots: &'a [UniformSlot],
}

/// 顶点缓冲描述
#[derive(Debug, Clone, Copy)]
pub struct BufferDesc<'a> {
    pub vertices: &'a [u8],
    pub indices: Option<(&'a [u8], IndexFormat)>,
    pub usage: BufferUsage,
    pub layout: &'a [VertexAttribute],
    /// 顶点记录大小（字节）
    pub stride: u32,
}

/// 纹理描述，像素已转换为 RGBA8
#[derive(Debug, Clone, Copy)]
pub struct TextureDesc<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u8],
    pub settings: &'a TextureSettings2D,
}

/// 图形后端的统一接口
///
/// # 调用顺序
///
/// ```text
/// attach_surface → (begin_frame → clear/draw* → present)* → detach_surface
/// ```
///
/// 资源创建与释放可以发生在任意时刻（帧内除外由前端保证）。
pub trait GraphicsBackend {
    /// 获取后端的名称，用于日志输出和调试
    fn backend_name(&self) -> &'static str;

    /// 为渲染器绑定表面
    fn attach_surface(&mut self, surface: &SurfaceHandle, color_space: ColorSpace) -> GraphicsResult<()>;

    /// 渲染器销毁时解除表面
    fn detach_surface(&mut self);

    /// 表面尺寸变化；尺寸为 0 时后端不应再配置交换链
    fn resize_surface(&mut self, size: Extent2D) -> GraphicsResult<()>;

    /// 切换帧缓冲颜色空间
    fn set_color_space(&mut self, color_space: ColorSpace) -> GraphicsResult<()>;

    /// 创建着色器阶段
    fn create_shader(&mut self, id: ResourceId, desc: &ShaderDesc<'_>) -> GraphicsResult<()>;

    /// 创建着色器程序；引用的阶段在本调用期间一定存活
    fn create_program(&mut self, id: ResourceId, desc: &ProgramDesc<'_>) -> GraphicsResult<()>;

    /// 创建顶点缓冲
    fn create_buffer(&mut self, id: ResourceId, desc: &BufferDesc<'_>) -> GraphicsResult<()>;

    /// 创建纹理
    fn create_texture(&mut self, id: ResourceId, desc: &TextureDesc<'_>) -> GraphicsResult<()>;

    /// 释放资源；未知的 id 直接忽略
    fn release(&mut self, id: ResourceId);

    /// 开始一帧
    fn begin_frame(&mut self) -> GraphicsResult<()>;

    /// 以指定颜色清屏
    fn clear(&mut self, color: Color) -> GraphicsResult<()>;

    /// 执行一次已解析的绘制
    fn draw(&mut self, call: &DrawCall) -> GraphicsResult<()>;

    /// 提交并呈现当前帧
    fn present(&mut self) -> GraphicsResult<()>;
}
