//! Vyr - 保留模式渲染抽象层
//!
//! 提供图形设备/渲染器契约：创建着色器程序、顶点缓冲（扁平与索引）、纹理和 uniform，
//! 并按帧提交绘制命令。支持 wgpu 与 headless 两种后端。
//!
//! # 模块结构
//!
//! - `core`: 核心功能模块（日志、配置、错误处理）
//! - `math`: 数学类型（nalgebra 别名、颜色、尺寸）
//! - `renderer`: 设备、资源句柄与渲染器
//! - `gfx`: 图形后端实现
//! - `app`: 宿主生命周期与演示场景
//!
//! # 使用示例
//!
//! ```no_run
//! use vyr_render::gfx::HeadlessBackend;
//! use vyr_render::math::Extent2D;
//! use vyr_render::renderer::{shaders, ColorSpace, GraphicsDevice, ShaderSource, SurfaceHandle};
//!
//! let device = GraphicsDevice::with_backend(Box::new(HeadlessBackend::new()), ColorSpace::Linear);
//! let mut renderer = device.create_renderer(SurfaceHandle::headless(Extent2D::new(800, 600)))?;
//! let program = device.create_shader_program_from_sources(&[
//!     ShaderSource::vertex(shaders::PLAIN_VERTEX),
//!     ShaderSource::fragment(shaders::PLAIN_FRAGMENT),
//! ])?;
//!
//! renderer.begin()?;
//! renderer.clear()?;
//! renderer.use_shader(&program)?;
//! renderer.swap_buffers()?;
//! # Ok::<(), vyr_render::core::GraphicsError>(())
//! ```

pub mod app;
pub mod core;
pub mod gfx;
pub mod math;
pub mod renderer;
