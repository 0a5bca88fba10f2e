//! Vyr 演示程序
//!
//! 加载配置、初始化日志，然后在窗口（wgpu 后端）中运行三角形演示场景，
//! 或在 headless 后端上运行固定帧数。
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件
//! cargo run
//!
//! # headless 运行 10 帧（命令行覆盖）
//! cargo run -- --headless --frames 10
//! ```

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, error, info, warn};
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use vyr_render::app::{DemoScene, SurfaceLifecycle};
use vyr_render::core::config::GraphicsBackendKind;
use vyr_render::core::{log, Config, GraphicsError};
use vyr_render::math::Extent2D;
use vyr_render::renderer::{GraphicsDevice, SurfaceHandle};

fn main() -> anyhow::Result<()> {
    // 1. 加载配置（在初始化日志之前）
    let mut config = Config::from_file_or_default("config.toml");

    // 2. 应用命令行参数
    config.apply_args(std::env::args().skip(1));

    // 3. 验证配置
    config.validate().context("Invalid configuration")?;

    // 4. 初始化日志系统
    let log_file = config
        .logging
        .file_output
        .then_some(config.logging.log_file.as_str());
    log::init_logger(config.logging.level, config.logging.file_output, log_file);
    info!(version = env!("CARGO_PKG_VERSION"), "Vyr starting...");
    info!(
        backend = config.graphics.backend.name(),
        width = config.window.width,
        height = config.window.height,
        vsync = config.graphics.vsync,
        srgb = config.graphics.srgb_framebuffer,
        "Graphics configuration"
    );

    // 5. 创建图形设备与场景
    let device = GraphicsDevice::new(&config.graphics).context("Failed to create graphics device")?;
    let scene = DemoScene::new(device, config.demo.clone());

    match config.graphics.backend {
        GraphicsBackendKind::Headless => run_headless(&config, scene),
        GraphicsBackendKind::Wgpu => run_windowed(&config, scene),
    }
}

/// 在 headless 后端上运行固定帧数
fn run_headless(config: &Config, mut scene: DemoScene) -> anyhow::Result<()> {
    let size = Extent2D::new(config.window.width, config.window.height);
    scene
        .on_surface_ready(SurfaceHandle::headless(size))
        .context("Failed to initialize demo scene")?;

    for frame in 0..config.demo.headless_frames {
        scene.on_frame().with_context(|| format!("Frame {frame} failed"))?;
    }

    info!(frames = scene.frames_presented(), "Headless run finished");
    scene.on_surface_closing();
    Ok(())
}

/// 打开窗口并进入事件循环
fn run_windowed(config: &Config, mut scene: DemoScene) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;

    debug!("Creating window");
    let title = format!("{} [{}]", config.window.title, config.graphics.backend.name());
    let window = WindowBuilder::new()
        .with_title(title)
        .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
        .with_resizable(config.window.resizable)
        .build(&event_loop)
        .context("Failed to create window")?;
    let window = Arc::new(window);

    let size = window.inner_size();
    scene
        .on_surface_ready(SurfaceHandle::from_window(
            Arc::clone(&window),
            Extent2D::new(size.width, size.height),
        ))
        .context("Failed to initialize demo scene")?;

    info!("Entering main loop...");
    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down...");
                scene.on_surface_closing();
                elwt.exit();
            }
            WindowEvent::Resized(new_size) => {
                debug!(width = new_size.width, height = new_size.height, "Window resized");
                if let Err(e) = scene.on_surface_resized(Extent2D::new(new_size.width, new_size.height)) {
                    error!("Resize failed: {}", e);
                    elwt.exit();
                }
            }
            WindowEvent::RedrawRequested => match scene.on_frame() {
                Ok(()) => {}
                // 交换链暂时不可用（超时等），下一帧重试
                Err(GraphicsError::Surface(reason)) => warn!(%reason, "Frame skipped"),
                Err(e) => {
                    error!("Draw failed: {}", e);
                    scene.on_surface_closing();
                    elwt.exit();
                }
            },
            _ => (),
        },
        Event::AboutToWait => window.request_redraw(),
        _ => (),
    })?;

    Ok(())
}
