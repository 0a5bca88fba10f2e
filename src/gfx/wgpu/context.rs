//! wgpu 设备与表面管理
//!
//! 本模块负责 wgpu 图形设备的初始化和管理，包括：
//! - 创建 wgpu 实例
//! - 选择适配器、创建逻辑设备和命令队列（首次需要时）
//! - 创建和配置窗口表面

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::core::config::{GraphicsConfig, PowerPreference};
use crate::core::error::{GraphicsError, GraphicsResult};
use crate::math::Extent2D;
use crate::renderer::surface::{ColorSpace, SurfaceHandle};

/// 适配器、逻辑设备与命令队列
pub struct Gpu {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl Gpu {
    /// 是否可以使用 `ClampToBorder` 寻址
    pub fn supports_clamp_to_border(&self) -> bool {
        self.device
            .features()
            .contains(wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER)
    }
}

/// 已绑定的窗口表面
struct SurfaceState {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    /// 面积为 0 时不配置交换链
    configured: bool,
}

/// wgpu 上下文
pub struct WgpuContext {
    instance: wgpu::Instance,
    power_preference: wgpu::PowerPreference,
    present_mode: wgpu::PresentMode,
    gpu: Option<Gpu>,
    surface: Option<SurfaceState>,
}

impl WgpuContext {
    pub fn new(config: &GraphicsConfig) -> GraphicsResult<Self> {
        info!("Initializing wgpu backend");

        debug!("Creating wgpu instance");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            dx12_shader_compiler: Default::default(),
            flags: wgpu::InstanceFlags::default(),
            gles_minor_version: wgpu::Gles3MinorVersion::Automatic,
        });

        let power_preference = match config.power_preference {
            PowerPreference::High => wgpu::PowerPreference::HighPerformance,
            PowerPreference::Low => wgpu::PowerPreference::LowPower,
        };
        let present_mode = if config.vsync {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::Immediate
        };

        Ok(Self {
            instance,
            power_preference,
            present_mode,
            gpu: None,
            surface: None,
        })
    }

    /// 获取设备，尚未创建时以无表面的方式创建
    pub fn ensure_gpu(&mut self) -> GraphicsResult<&Gpu> {
        if self.gpu.is_none() {
            let gpu = request_gpu(&self.instance, self.power_preference, None)?;
            self.gpu = Some(gpu);
        }
        self.gpu()
    }

    /// 获取已创建的设备
    pub fn gpu(&self) -> GraphicsResult<&Gpu> {
        self.gpu
            .as_ref()
            .ok_or_else(|| GraphicsError::InvalidState("wgpu device has not been created".to_string()))
    }

    /// 创建窗口表面并配置交换链
    pub fn attach_surface(&mut self, handle: &SurfaceHandle, color_space: ColorSpace) -> GraphicsResult<()> {
        let window = handle.window().ok_or_else(|| {
            GraphicsError::ContextCreation("the wgpu backend needs a window surface".to_string())
        })?;

        debug!("Creating surface");
        let surface = self
            .instance
            .create_surface(Arc::clone(window))
            .map_err(|e| GraphicsError::ContextCreation(format!("Failed to create surface: {e}")))?;

        if self.gpu.is_none() {
            let gpu = request_gpu(&self.instance, self.power_preference, Some(&surface))?;
            self.gpu = Some(gpu);
        }
        let gpu = self.gpu()?;
        if !gpu.adapter.is_surface_supported(&surface) {
            return Err(GraphicsError::ContextCreation(
                "selected adapter cannot present to this surface".to_string(),
            ));
        }

        let caps = surface.get_capabilities(&gpu.adapter);
        let format = pick_format(&caps.formats, color_space)?;
        let size = handle.size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: self.present_mode,
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let mut state = SurfaceState {
            surface,
            config,
            configured: false,
        };
        configure(gpu, &mut state);
        info!(?format, width = size.width, height = size.height, "wgpu surface configured");
        self.surface = Some(state);
        Ok(())
    }

    pub fn detach_surface(&mut self) {
        if self.surface.take().is_some() {
            debug!("wgpu surface released");
        }
    }

    /// 重新配置表面（用于窗口调整）
    pub fn resize(&mut self, size: Extent2D) -> GraphicsResult<()> {
        let gpu = self.gpu.as_ref();
        let (Some(gpu), Some(state)) = (gpu, self.surface.as_mut()) else {
            return Err(GraphicsError::InvalidState("no surface attached".to_string()));
        };
        state.config.width = size.width;
        state.config.height = size.height;
        configure(gpu, state);
        Ok(())
    }

    /// 切换交换链格式
    pub fn set_color_space(&mut self, color_space: ColorSpace) -> GraphicsResult<()> {
        let gpu = self.gpu.as_ref();
        let (Some(gpu), Some(state)) = (gpu, self.surface.as_mut()) else {
            return Err(GraphicsError::InvalidState("no surface attached".to_string()));
        };
        let caps = state.surface.get_capabilities(&gpu.adapter);
        state.config.format = pick_format(&caps.formats, color_space)?;
        if state.config.format.is_srgb() != (color_space == ColorSpace::Srgb) {
            warn!(format = ?state.config.format, ?color_space, "Surface has no matching format");
        }
        configure(gpu, state);
        Ok(())
    }

    /// 当前交换链格式
    pub fn surface_format(&self) -> Option<wgpu::TextureFormat> {
        self.surface.as_ref().map(|state| state.config.format)
    }

    /// 获取下一帧的交换链纹理；表面过期或丢失时重新配置后重试一次
    pub fn acquire(&mut self) -> GraphicsResult<wgpu::SurfaceTexture> {
        let gpu = self.gpu.as_ref();
        let (Some(gpu), Some(state)) = (gpu, self.surface.as_mut()) else {
            return Err(GraphicsError::InvalidState("no surface attached".to_string()));
        };
        if !state.configured {
            return Err(GraphicsError::Surface("surface has zero area".to_string()));
        }

        match state.surface.get_current_texture() {
            Ok(frame) => Ok(frame),
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                warn!("Surface outdated, reconfiguring");
                configure(gpu, state);
                state
                    .surface
                    .get_current_texture()
                    .map_err(|e| GraphicsError::Surface(format!("Failed to acquire next image: {e}")))
            }
            Err(e) => Err(GraphicsError::Surface(format!("Failed to acquire next image: {e}"))),
        }
    }
}

fn request_gpu(
    instance: &wgpu::Instance,
    power_preference: wgpu::PowerPreference,
    surface: Option<&wgpu::Surface<'static>>,
) -> GraphicsResult<Gpu> {
    debug!("Requesting adapter");
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference,
        compatible_surface: surface,
        force_fallback_adapter: false,
    }))
    .ok_or_else(|| GraphicsError::ContextCreation("Failed to find suitable adapter".to_string()))?;

    info!("Selected adapter: {:?}", adapter.get_info());

    debug!("Requesting device and queue");
    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("Main Device"),
            required_features: adapter.features() & wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER,
            required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
        },
        None,
    ))
    .map_err(|e| GraphicsError::ContextCreation(format!("Failed to create device: {e}")))?;

    device.on_uncaptured_error(Box::new(|e| error!("wgpu uncaptured error: {e}")));

    Ok(Gpu { adapter, device, queue })
}

fn pick_format(formats: &[wgpu::TextureFormat], color_space: ColorSpace) -> GraphicsResult<wgpu::TextureFormat> {
    let want_srgb = color_space == ColorSpace::Srgb;
    formats
        .iter()
        .copied()
        .find(|format| format.is_srgb() == want_srgb)
        .or_else(|| formats.first().copied())
        .ok_or_else(|| GraphicsError::ContextCreation("surface reports no supported formats".to_string()))
}

fn configure(gpu: &Gpu, state: &mut SurfaceState) {
    state.configured = state.config.width > 0 && state.config.height > 0;
    if state.configured {
        state.surface.configure(&gpu.device, &state.config);
    }
}
