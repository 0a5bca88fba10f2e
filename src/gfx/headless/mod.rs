//! headless 图形后端
//!
//! 不访问 GPU，只记录每一帧的清屏与绘制命令，用于测试与 CI 冒烟运行。
//! 通过 `FrameRecorder` 可以在后端被设备接管之后继续查看记录结果。
//!
//! 资源只登记 id；绘制时仍会检查引用的资源是否存活，
//! 这样前端的任何遗漏都会以错误的形式暴露出来。

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::core::error::{GraphicsError, GraphicsResult};
use crate::gfx::backend::{BufferDesc, GraphicsBackend, ProgramDesc, ShaderDesc, TextureDesc};
use crate::math::{Color, Extent2D};
use crate::renderer::command::{BoundResource, DrawCall};
use crate::renderer::resource::ResourceId;
use crate::renderer::surface::{ColorSpace, SurfaceHandle};

/// 与 wgpu 默认限制一致
pub const MAX_TEXTURE_DIMENSION: u32 = 8192;

/// 记录下来的帧内操作
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedOp {
    Clear(Color),
    Draw(DrawCall),
}

/// 一帧的记录
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameRecord {
    pub ops: Vec<RecordedOp>,
}

impl FrameRecord {
    /// 本帧的全部绘制
    pub fn draws(&self) -> impl Iterator<Item = &DrawCall> {
        self.ops.iter().filter_map(|op| match op {
            RecordedOp::Draw(call) => Some(call),
            RecordedOp::Clear(_) => None,
        })
    }

    /// 本帧的全部清屏颜色
    pub fn clears(&self) -> impl Iterator<Item = Color> + '_ {
        self.ops.iter().filter_map(|op| match op {
            RecordedOp::Clear(color) => Some(*color),
            RecordedOp::Draw(_) => None,
        })
    }
}

#[derive(Debug, Default)]
struct RecorderState {
    frames: Vec<FrameRecord>,
    live: HashSet<ResourceId>,
    total_allocations: usize,
    surface: Option<Extent2D>,
    color_space: Option<ColorSpace>,
}

/// headless 后端的共享记录
#[derive(Debug, Clone, Default)]
pub struct FrameRecorder {
    state: Rc<RefCell<RecorderState>>,
}

impl FrameRecorder {
    /// 已呈现的全部帧
    pub fn frames(&self) -> Vec<FrameRecord> {
        self.state.borrow().frames.clone()
    }

    /// 最近呈现的一帧
    pub fn last_frame(&self) -> Option<FrameRecord> {
        self.state.borrow().frames.last().cloned()
    }

    pub fn frame_count(&self) -> usize {
        self.state.borrow().frames.len()
    }

    /// 当前存活的后端分配数
    pub fn live_allocations(&self) -> usize {
        self.state.borrow().live.len()
    }

    /// 累计分配次数（含已释放的）
    pub fn total_allocations(&self) -> usize {
        self.state.borrow().total_allocations
    }

    pub fn is_live(&self, id: ResourceId) -> bool {
        self.state.borrow().live.contains(&id)
    }

    /// 已绑定表面的尺寸
    pub fn surface_size(&self) -> Option<Extent2D> {
        self.state.borrow().surface
    }

    pub fn color_space(&self) -> Option<ColorSpace> {
        self.state.borrow().color_space
    }
}

/// headless 图形后端
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    recorder: FrameRecorder,
    current: Option<FrameRecord>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取记录器（可在后端移交给设备前克隆保留）
    pub fn recorder(&self) -> FrameRecorder {
        self.recorder.clone()
    }

    fn allocate(&mut self, id: ResourceId) {
        let mut state = self.recorder.state.borrow_mut();
        state.live.insert(id);
        state.total_allocations += 1;
    }

    fn require_live(&self, id: ResourceId) -> GraphicsResult<()> {
        if self.recorder.is_live(id) {
            Ok(())
        } else {
            Err(GraphicsError::InvalidState(format!(
                "{id} is not allocated on the headless backend"
            )))
        }
    }

    fn current_frame(&mut self) -> GraphicsResult<&mut FrameRecord> {
        self.current
            .as_mut()
            .ok_or_else(|| GraphicsError::InvalidState("no frame in progress".to_string()))
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn backend_name(&self) -> &'static str {
        "headless"
    }

    fn attach_surface(&mut self, surface: &SurfaceHandle, color_space: ColorSpace) -> GraphicsResult<()> {
        debug!(
            width = surface.size().width,
            height = surface.size().height,
            ?color_space,
            "Headless surface attached"
        );
        let mut state = self.recorder.state.borrow_mut();
        state.surface = Some(surface.size());
        state.color_space = Some(color_space);
        Ok(())
    }

    fn detach_surface(&mut self) {
        self.current = None;
        self.recorder.state.borrow_mut().surface = None;
    }

    fn resize_surface(&mut self, size: Extent2D) -> GraphicsResult<()> {
        self.recorder.state.borrow_mut().surface = Some(size);
        Ok(())
    }

    fn set_color_space(&mut self, color_space: ColorSpace) -> GraphicsResult<()> {
        self.recorder.state.borrow_mut().color_space = Some(color_space);
        Ok(())
    }

    fn create_shader(&mut self, id: ResourceId, desc: &ShaderDesc<'_>) -> GraphicsResult<()> {
        trace!(%id, stage = desc.kind.name(), entry = desc.entry_point, "Headless shader created");
        self.allocate(id);
        Ok(())
    }

    fn create_program(&mut self, id: ResourceId, desc: &ProgramDesc<'_>) -> GraphicsResult<()> {
        self.require_live(desc.vertex)?;
        self.require_live(desc.fragment)?;
        trace!(%id, slots = desc.slots.len(), "Headless program created");
        self.allocate(id);
        Ok(())
    }

    fn create_buffer(&mut self, id: ResourceId, desc: &BufferDesc<'_>) -> GraphicsResult<()> {
        trace!(
            %id,
            bytes = desc.vertices.len(),
            indexed = desc.indices.is_some(),
            "Headless buffer created"
        );
        self.allocate(id);
        Ok(())
    }

    fn create_texture(&mut self, id: ResourceId, desc: &TextureDesc<'_>) -> GraphicsResult<()> {
        if desc.width > MAX_TEXTURE_DIMENSION || desc.height > MAX_TEXTURE_DIMENSION {
            return Err(GraphicsError::ResourceCreation(format!(
                "{}x{} texture exceeds the maximum dimension {MAX_TEXTURE_DIMENSION}",
                desc.width, desc.height
            )));
        }
        trace!(%id, width = desc.width, height = desc.height, "Headless texture created");
        self.allocate(id);
        Ok(())
    }

    fn release(&mut self, id: ResourceId) {
        if self.recorder.state.borrow_mut().live.remove(&id) {
            trace!(%id, "Headless resource released");
        }
    }

    fn begin_frame(&mut self) -> GraphicsResult<()> {
        self.current = Some(FrameRecord::default());
        Ok(())
    }

    fn clear(&mut self, color: Color) -> GraphicsResult<()> {
        self.current_frame()?.ops.push(RecordedOp::Clear(color));
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall) -> GraphicsResult<()> {
        self.require_live(call.program)?;
        self.require_live(call.buffer)?;
        for binding in &call.bindings {
            match binding.resource {
                BoundResource::Texture { texture, .. } | BoundResource::Sampler { texture } => {
                    self.require_live(texture)?
                }
                BoundResource::Uniform(_) => {}
            }
        }

        self.current_frame()?.ops.push(RecordedOp::Draw(call.clone()));
        Ok(())
    }

    fn present(&mut self) -> GraphicsResult<()> {
        let frame = self
            .current
            .take()
            .ok_or_else(|| GraphicsError::InvalidState("no frame in progress".to_string()))?;
        self.recorder.state.borrow_mut().frames.push(frame);
        Ok(())
    }
}
