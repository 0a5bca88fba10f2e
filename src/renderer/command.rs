//! 帧命令模块
//!
//! 定义渲染器每帧的状态机以及提交给后端的绘制命令。
//!
//! # 帧状态机
//!
//! ```text
//! Uninitialized ──resize(>0)──► Ready ──begin──► Begun ──clear──► Cleared
//!       ▲                         ▲                 │                │
//!       └──────resize(0)──────────┤                 └──draw──► Drawing ◄─┘
//!                                 └────────swap_buffers───────────┘
//! ```
//!
//! `clear` 和绘制只能在 `begin` 与 `swap_buffers` 之间调用。

use crate::core::error::{GraphicsError, GraphicsResult};
use crate::math::{Extent2D, Offset2D};
use crate::renderer::resource::ResourceId;
use crate::renderer::shader::UniformData;

/// 渲染器帧状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// 表面面积为 0（例如窗口最小化），不能开始新帧
    Uninitialized,
    /// 空闲，可以开始新帧
    Ready,
    /// 已调用 begin
    Begun,
    /// 已清屏
    Cleared,
    /// 已提交至少一次绘制
    Drawing,
}

impl FrameState {
    /// 是否处于一帧之中
    pub fn in_frame(&self) -> bool {
        matches!(self, FrameState::Begun | FrameState::Cleared | FrameState::Drawing)
    }
}

/// 帧操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOp {
    Begin,
    Clear,
    Draw,
    Present,
}

/// 帧状态跟踪器
///
/// 只负责判定状态转移是否合法；渲染器先询问下一个状态，
/// 后端调用成功后再提交转移，失败时状态保持不变。
#[derive(Debug)]
pub struct FrameTracker {
    state: FrameState,
    frames_presented: u64,
}

impl FrameTracker {
    pub fn new(state: FrameState) -> Self {
        Self { state, frames_presented: 0 }
    }

    /// 当前状态
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// 已呈现的帧数
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// 计算执行 `op` 之后的状态
    pub fn next(&self, op: FrameOp) -> GraphicsResult<FrameState> {
        match (op, self.state) {
            (FrameOp::Begin, FrameState::Ready) => Ok(FrameState::Begun),
            (FrameOp::Begin, FrameState::Uninitialized) => Err(GraphicsError::InvalidState(
                "begin() called while the surface has zero area".to_string(),
            )),
            (FrameOp::Begin, _) => Err(GraphicsError::InvalidState(
                "begin() called inside an active frame; call swap_buffers() first".to_string(),
            )),
            (FrameOp::Clear, state) if state.in_frame() => Ok(FrameState::Cleared),
            (FrameOp::Draw, state) if state.in_frame() => Ok(FrameState::Drawing),
            (FrameOp::Present, state) if state.in_frame() => Ok(FrameState::Ready),
            (op, state) => Err(GraphicsError::InvalidState(format!(
                "{op:?} requires an active frame (current state: {state:?})"
            ))),
        }
    }

    /// 提交状态转移
    pub fn commit(&mut self, next: FrameState) {
        if self.state.in_frame() && next == FrameState::Ready {
            self.frames_presented += 1;
        }
        self.state = next;
    }

    /// 放弃当前帧（呈现失败时），不计入已呈现帧数
    pub fn abandon(&mut self) {
        if self.state.in_frame() {
            self.state = FrameState::Ready;
        }
    }

    /// 表面尺寸变化：面积为 0 时进入 Uninitialized
    pub fn surface_resized(&mut self, size: Extent2D) -> GraphicsResult<()> {
        if self.state.in_frame() {
            return Err(GraphicsError::InvalidState(
                "surface cannot be resized inside an active frame".to_string(),
            ));
        }
        self.state = if size.is_empty() {
            FrameState::Uninitialized
        } else {
            FrameState::Ready
        };
        Ok(())
    }
}

/// 图元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

impl PrimitiveKind {
    /// 带状图元在索引绘制时需要指定重启索引格式
    pub fn is_strip(&self) -> bool {
        matches!(self, PrimitiveKind::LineStrip | PrimitiveKind::TriangleStrip)
    }
}

/// 视口矩形（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub origin: Offset2D,
    pub size: Extent2D,
}

impl Viewport {
    pub fn new(origin: Offset2D, size: Extent2D) -> Self {
        Self { origin, size }
    }

    /// 覆盖整个表面的视口
    pub fn full(surface: Extent2D) -> Self {
        Self::new(Offset2D::ZERO, surface)
    }

    /// 与表面矩形求交；交集为空时返回 None
    pub fn clamp_to(&self, surface: Extent2D) -> Option<Viewport> {
        let left = (self.origin.x as i64).max(0);
        let top = (self.origin.y as i64).max(0);
        let right = (self.origin.x as i64 + self.size.width as i64).min(surface.width as i64);
        let bottom = (self.origin.y as i64 + self.size.height as i64).min(surface.height as i64);

        if right <= left || bottom <= top {
            return None;
        }

        Some(Viewport::new(
            Offset2D::new(left as i32, top as i32),
            Extent2D::new((right - left) as u32, (bottom - top) as u32),
        ))
    }
}

/// 绘制范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawRange {
    /// 非索引绘制
    Vertices { first: u32, count: u32 },
    /// 从索引 0 开始的索引绘制
    Indexed { count: u32 },
}

/// 绑定到某个 binding 槽位上的资源
#[derive(Debug, Clone, PartialEq)]
pub enum BoundResource {
    /// uniform 值（按绘制时刻快照）
    Uniform(UniformData),
    /// 纹理，`unit` 为它在 use_textures 中的位置
    Texture { unit: u32, texture: ResourceId },
    /// 使用 `texture` 的采样设置
    Sampler { texture: ResourceId },
}

/// 已解析的程序槽位
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBinding {
    pub binding: u32,
    pub name: String,
    pub resource: BoundResource,
}

/// 完整解析后的绘制命令
///
/// 前端完成全部校验后才生成；后端拿到的命令一定引用存活的资源。
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub program: ResourceId,
    pub buffer: ResourceId,
    pub primitive: PrimitiveKind,
    pub range: DrawRange,
    pub bindings: Vec<ResolvedBinding>,
    /// 已裁剪到表面范围内的视口
    pub viewport: Viewport,
}

impl DrawCall {
    /// 查找指定名称的槽位
    pub fn binding(&self, name: &str) -> Option<&BoundResource> {
        self.bindings.iter().find(|b| b.name == name).map(|b| &b.resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_state_machine() {
        let mut tracker = FrameTracker::new(FrameState::Ready);

        let next = tracker.next(FrameOp::Begin).unwrap();
        tracker.commit(next);
        assert_eq!(tracker.state(), FrameState::Begun);

        // 不能重复开始
        assert!(tracker.next(FrameOp::Begin).is_err());

        for (op, expected) in [
            (FrameOp::Clear, FrameState::Cleared),
            (FrameOp::Draw, FrameState::Drawing),
            (FrameOp::Draw, FrameState::Drawing),
            (FrameOp::Present, FrameState::Ready),
        ] {
            let next = tracker.next(op).unwrap();
            tracker.commit(next);
            assert_eq!(tracker.state(), expected);
        }

        assert_eq!(tracker.frames_presented(), 1);

        let next = tracker.next(FrameOp::Begin).unwrap();
        tracker.commit(next);
        tracker.abandon();
        assert_eq!(tracker.state(), FrameState::Ready);
        assert_eq!(tracker.frames_presented(), 1);
    }

    #[test]
    fn test_ops_outside_frame_rejected() {
        let tracker = FrameTracker::new(FrameState::Ready);
        for op in [FrameOp::Clear, FrameOp::Draw, FrameOp::Present] {
            assert!(matches!(tracker.next(op), Err(GraphicsError::InvalidState(_))));
        }
    }

    #[test]
    fn test_zero_area_surface() {
        let mut tracker = FrameTracker::new(FrameState::Ready);
        tracker.surface_resized(Extent2D::new(0, 0)).unwrap();
        assert_eq!(tracker.state(), FrameState::Uninitialized);
        assert!(tracker.next(FrameOp::Begin).is_err());

        tracker.surface_resized(Extent2D::new(640, 480)).unwrap();
        assert_eq!(tracker.state(), FrameState::Ready);

        let next = tracker.next(FrameOp::Begin).unwrap();
        tracker.commit(next);
        assert!(tracker.surface_resized(Extent2D::new(1, 1)).is_err());
    }

    #[test]
    fn test_viewport_clamp() {
        let surface = Extent2D::new(400, 300);

        let full = Viewport::full(Extent2D::new(800, 600));
        assert_eq!(full.clamp_to(surface), Some(Viewport::full(surface)));

        let shifted = Viewport::new(Offset2D::new(-50, 100), Extent2D::new(200, 500));
        assert_eq!(
            shifted.clamp_to(surface),
            Some(Viewport::new(Offset2D::new(0, 100), Extent2D::new(150, 200)))
        );

        let outside = Viewport::new(Offset2D::new(400, 0), Extent2D::new(10, 10));
        assert_eq!(outside.clamp_to(surface), None);
    }
}
