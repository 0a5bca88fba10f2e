//! 图形后端模块
//!
//! 本模块封装了不同图形 API 的底层实现，包括：
//! - wgpu：跨平台的高层图形抽象（支持 Vulkan、Metal、DX12、OpenGL）
//! - headless：不访问 GPU 的记录后端，用于测试与 CI
//!
//! 所有后端都实现了统一的 `GraphicsBackend` trait，
//! 确保可以在不同的图形 API 之间无缝切换。

pub mod backend;
pub mod headless;
pub mod wgpu;

pub use backend::GraphicsBackend;
pub use headless::{FrameRecorder, HeadlessBackend};
pub use self::wgpu::WgpuBackend;
