//! wgpu 图形后端实现
//!
//! 本模块实现了基于 wgpu 的图形后端，wgpu 是一个跨平台的图形 API，
//! 可以在 Vulkan、Metal、DirectX 12、OpenGL 等多种后端上运行。
//!
//! # 模块结构
//!
//! - `context` - WgpuContext（实例、适配器、设备和表面管理）
//! - `backend` - WgpuBackend（资源与帧命令的翻译）

mod backend;
mod context;

pub use backend::WgpuBackend;
pub use context::WgpuContext;
