//! 内置着色器
//!
//! 演示场景使用的三组 WGSL 着色器，编译期通过 `include_str!` 嵌入。
//! 入口函数统一为 `vs_main` / `fs_main`。
//!
//! # 着色器组
//!
//! - **plain**：只有位置输入，输出固定颜色
//! - **colored**：位置 + 顶点颜色，颜色乘以 `multiplicator` uniform
//! - **textured**：位置 + 纹理坐标，混合 `tex` 与 `tex2` 两张纹理

/// 顶点着色器
///
/// # 输入
///
/// - `position`：顶点位置（location = 0）
pub const PLAIN_VERTEX: &str = include_str!("shaders/plain.vert.wgsl");

/// 片段着色器，输出固定的橙色
pub const PLAIN_FRAGMENT: &str = include_str!("shaders/plain.frag.wgsl");

/// 顶点着色器
///
/// # 输入
///
/// - `position`：顶点位置（location = 0）
/// - `color`：顶点颜色（location = 1）
///
/// # 输出
///
/// - `color`：传递给片段着色器的颜色（location = 0）
pub const COLORED_VERTEX: &str = include_str!("shaders/colored.vert.wgsl");

/// 片段着色器
///
/// # Uniform
///
/// - `multiplicator`（f32，binding 0）：RGB 通道的缩放系数
pub const COLORED_FRAGMENT: &str = include_str!("shaders/colored.frag.wgsl");

/// 顶点着色器
///
/// # 输入
///
/// - `position`：顶点位置（location = 0）
/// - `tex_coord`：纹理坐标（location = 1）
pub const TEXTURED_VERTEX: &str = include_str!("shaders/textured.vert.wgsl");

/// 片段着色器
///
/// # 绑定
///
/// - `tex` / `tex_sampler`：binding 0 / 1，纹理单元由 `tex` 的值决定
/// - `tex2` / `tex2_sampler`：binding 2 / 3
pub const TEXTURED_FRAGMENT: &str = include_str!("shaders/textured.frag.wgsl");
