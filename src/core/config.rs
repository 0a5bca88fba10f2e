//! 配置管理模块
//!
//! 提供引擎配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [window]
//! width = 800
//! height = 600
//! title = "Vyr"
//! resizable = true
//!
//! [graphics]
//! backend = "wgpu"            # 或 "headless"
//! vsync = true
//! srgb_framebuffer = true
//! power_preference = "high"   # 或 "low"
//!
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = false
//!
//! [demo]
//! headless_frames = 3
//! brick_texture = "assets/brick.jpg"
//! moss_texture = "assets/moss.jpg"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};

/// 引擎配置
///
/// 包含了引擎运行所需的所有配置项。
/// 可以从配置文件加载，也可以通过代码构建。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,

    /// 演示场景配置
    #[serde(default)]
    pub demo: DemoConfig,
}

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 窗口宽度
    #[serde(default = "default_width")]
    pub width: u32,

    /// 窗口高度
    #[serde(default = "default_height")]
    pub height: u32,

    /// 窗口标题
    #[serde(default = "default_title")]
    pub title: String,

    /// 是否可调整大小
    #[serde(default = "default_resizable")]
    pub resizable: bool,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 图形后端选择
    #[serde(default = "default_backend")]
    pub backend: GraphicsBackendKind,

    /// 垂直同步
    #[serde(default = "default_vsync")]
    pub vsync: bool,

    /// 是否使用 sRGB 帧缓冲
    #[serde(default = "default_srgb")]
    pub srgb_framebuffer: bool,

    /// 适配器选择偏好
    #[serde(default = "default_power_preference")]
    pub power_preference: PowerPreference,
}

/// 图形后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphicsBackendKind {
    /// wgpu 后端（支持 Vulkan、Metal、DX12、OpenGL）
    Wgpu,
    /// 无 GPU 的记录后端，用于测试与 CI
    Headless,
}

/// 适配器功耗偏好
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerPreference {
    /// 优先独立显卡
    High,
    /// 优先集成显卡
    Low,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// 演示场景配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// headless 后端下运行的帧数
    #[serde(default = "default_headless_frames")]
    pub headless_frames: u32,

    /// 砖墙纹理路径（不存在时使用程序生成的纹理）
    #[serde(default)]
    pub brick_texture: Option<String>,

    /// 苔藓纹理路径（不存在时使用程序生成的纹理）
    #[serde(default)]
    pub moss_texture: Option<String>,
}

// 默认值函数
fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_title() -> String { "Vyr".to_string() }
fn default_resizable() -> bool { true }
fn default_backend() -> GraphicsBackendKind { GraphicsBackendKind::Wgpu }
fn default_vsync() -> bool { true }
fn default_srgb() -> bool { true }
fn default_power_preference() -> PowerPreference { PowerPreference::High }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "vyr.log".to_string() }
fn default_headless_frames() -> u32 { 3 }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
            resizable: default_resizable(),
        }
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            vsync: default_vsync(),
            srgb_framebuffer: default_srgb(),
            power_preference: default_power_preference(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            headless_frames: default_headless_frames(),
            brick_texture: None,
            moss_texture: None,
        }
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 参数
    ///
    /// * `path` - 配置文件路径
    ///
    /// # 返回值
    ///
    /// 成功返回 `Config` 实例，失败返回错误
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        Self::from_toml_str(&contents)
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--headless`: 使用无 GPU 的记录后端
    /// - `--wgpu`: 使用 wgpu 后端
    /// - `--width <value>`: 设置窗口宽度
    /// - `--height <value>`: 设置窗口高度
    /// - `--frames <value>`: headless 模式下运行的帧数
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if args.iter().any(|a| a == "--headless") {
            self.graphics.backend = GraphicsBackendKind::Headless;
        }

        if args.iter().any(|a| a == "--wgpu") {
            self.graphics.backend = GraphicsBackendKind::Wgpu;
        }

        if let Some(width) = parse_flag_value(&args, "--width") {
            self.window.width = width;
        }

        if let Some(height) = parse_flag_value(&args, "--height") {
            self.window.height = height;
        }

        if let Some(frames) = parse_flag_value(&args, "--frames") {
            self.demo.headless_frames = frames;
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window.width/height".to_string(),
                reason: "Window dimensions must be greater than 0".to_string(),
            }
            .into());
        }

        if self.graphics.backend == GraphicsBackendKind::Headless && self.demo.headless_frames == 0 {
            return Err(ConfigError::InvalidValue {
                field: "demo.headless_frames".to_string(),
                reason: "Headless runs need at least one frame".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

fn parse_flag_value(args: &[String], flag: &str) -> Option<u32> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1)?.parse().ok()
}

impl GraphicsBackendKind {
    /// 获取后端名称
    pub fn name(&self) -> &'static str {
        match self {
            GraphicsBackendKind::Wgpu => "wgpu",
            GraphicsBackendKind::Headless => "headless",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.graphics.backend, GraphicsBackendKind::Wgpu);
        assert!(config.graphics.srgb_framebuffer);
        assert_eq!(config.demo.headless_frames, 3);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.window.width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.graphics.backend = GraphicsBackendKind::Headless;
        config.demo.headless_frames = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            [graphics]
            backend = "headless"
            srgb_framebuffer = false

            [demo]
            moss_texture = "assets/moss.jpg"
            "#,
        )
        .unwrap();

        assert_eq!(config.graphics.backend, GraphicsBackendKind::Headless);
        assert!(!config.graphics.srgb_framebuffer);
        assert!(config.graphics.vsync);
        assert_eq!(config.window.title, "Vyr");
        assert_eq!(config.demo.moss_texture.as_deref(), Some("assets/moss.jpg"));
        assert_eq!(config.demo.brick_texture, None);
    }

    #[test]
    fn test_parse_invalid_toml() {
        assert!(Config::from_toml_str("[graphics]\nbackend = \"dx9\"").is_err());
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.apply_args(["vyr_render", "--headless", "--width", "320", "--frames", "7"]);

        assert_eq!(config.graphics.backend, GraphicsBackendKind::Headless);
        assert_eq!(config.window.width, 320);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.demo.headless_frames, 7);

        // 无法解析的值保持原样
        config.apply_args(["--height", "tall"]);
        assert_eq!(config.window.height, 600);
    }
}
