//! 渲染表面
//!
//! `SurfaceHandle` 是宿主窗口系统交给渲染器的表面：原生窗口句柄加像素尺寸。
//! headless 后端不需要原生窗口，用 `SurfaceHandle::headless` 即可。

use std::fmt;
use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::core::error::{GraphicsError, GraphicsResult};
use crate::math::Extent2D;

/// 可以提供原生窗口句柄的对象（例如 `winit::window::Window`）
pub trait WindowSource: HasWindowHandle + HasDisplayHandle + Send + Sync {}

impl<T: HasWindowHandle + HasDisplayHandle + Send + Sync> WindowSource for T {}

/// 帧缓冲的颜色空间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// 线性帧缓冲，着色器输出原样写入
    Linear,
    /// sRGB 帧缓冲，写入时做 gamma 编码
    Srgb,
}

impl ColorSpace {
    pub fn from_srgb_flag(srgb: bool) -> Self {
        if srgb {
            ColorSpace::Srgb
        } else {
            ColorSpace::Linear
        }
    }
}

/// 渲染表面句柄
#[derive(Clone)]
pub struct SurfaceHandle {
    window: Option<Arc<dyn WindowSource>>,
    size: Extent2D,
}

impl SurfaceHandle {
    /// 由原生窗口创建
    pub fn from_window<W: WindowSource + 'static>(window: Arc<W>, size: Extent2D) -> Self {
        let window: Arc<dyn WindowSource> = window;
        Self {
            window: Some(window),
            size,
        }
    }

    /// 没有原生窗口的表面，只能用于 headless 后端
    pub fn headless(size: Extent2D) -> Self {
        Self { window: None, size }
    }

    pub fn size(&self) -> Extent2D {
        self.size
    }

    pub fn window(&self) -> Option<&Arc<dyn WindowSource>> {
        self.window.as_ref()
    }

    /// 检查尺寸与原生句柄是否可用
    pub(crate) fn validate(&self) -> GraphicsResult<()> {
        if self.size.is_empty() {
            return Err(GraphicsError::ContextCreation(format!(
                "surface has zero area ({}x{})",
                self.size.width, self.size.height
            )));
        }

        if let Some(window) = &self.window {
            window.window_handle().map_err(|e| {
                GraphicsError::ContextCreation(format!("window handle is unavailable: {e}"))
            })?;
            window.display_handle().map_err(|e| {
                GraphicsError::ContextCreation(format!("display handle is unavailable: {e}"))
            })?;
        }

        Ok(())
    }
}

impl fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceHandle")
            .field("native", &self.window.is_some())
            .field("size", &self.size)
            .finish()
    }
}
