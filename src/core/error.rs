//! 错误处理模块
//!
//! 定义了引擎中使用的统一错误类型，使用 `thiserror` 提供友好的错误消息。
//!
//! # 错误分类
//!
//! - `ContextCreation`：没有可用的设备/上下文，致命
//! - `Compile` / `Link`：着色器源码有误，启动阶段致命
//! - `ResourceCreation`：单个资源创建失败，设备仍可继续使用
//! - `InvalidState` / `BindingMismatch` / `CrossProgramUniform`：调用方用法错误，立即返回

use thiserror::Error;

use crate::renderer::shader::{ShaderKind, UniformType};

/// 引擎统一的 Result 类型
pub type Result<T> = std::result::Result<T, EngineError>;

/// 图形层的 Result 类型
///
/// 渲染抽象层的所有操作都返回这个类型，调用方可以直接对 `GraphicsError` 做模式匹配。
pub type GraphicsResult<T> = std::result::Result<T, GraphicsError>;

/// 引擎顶层错误
#[derive(Debug, Error)]
pub enum EngineError {
    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 配置相关的错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件未找到
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    /// 配置文件解析失败
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// 配置值无效
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 图形 API 相关的错误
#[derive(Debug, Error)]
pub enum GraphicsError {
    /// 无法为表面创建渲染上下文
    #[error("Context creation failed: {0}")]
    ContextCreation(String),

    /// 着色器编译失败
    #[error("{stage:?} shader compilation failed:\n{log}")]
    Compile { stage: ShaderKind, log: String },

    /// 着色器程序链接失败
    #[error("Shader program link failed: {log}")]
    Link { log: String },

    /// 资源创建失败
    #[error("Resource creation failed: {0}")]
    ResourceCreation(String),

    /// 在错误的状态下调用（帧外绘制、使用已销毁的资源等）
    #[error("Invalid renderer state: {0}")]
    InvalidState(String),

    /// 绑定状态与绘制调用不匹配
    #[error("Binding mismatch: {0}")]
    BindingMismatch(String),

    /// 在另一个程序上使用了 uniform 句柄
    #[error("Uniform '{name}' belongs to a different shader program")]
    CrossProgramUniform { name: String },

    /// 程序中不存在该 uniform
    #[error("Uniform '{0}' not found")]
    UniformNotFound(String),

    /// uniform 类型与请求的类型不一致
    #[error("Uniform '{name}' is {actual:?}, requested {requested:?}")]
    UniformTypeMismatch {
        name: String,
        requested: UniformType,
        actual: UniformType,
    },

    /// 交换链/表面错误
    #[error("Surface error: {0}")]
    Surface(String),
}

impl GraphicsError {
    /// 是否为调用方用法错误（非资源或设备故障）
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            GraphicsError::InvalidState(_)
                | GraphicsError::BindingMismatch(_)
                | GraphicsError::CrossProgramUniform { .. }
        )
    }
}
