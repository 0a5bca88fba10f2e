//! 顶点缓冲
//!
//! `VertexBuffer` 持有一份 GPU 顶点数据（可选索引数据）及其顶点布局。
//! 所有校验都在分配 GPU 内存之前完成，失败时不会留下任何分配。

use std::fmt;
use std::rc::Rc;

use crate::renderer::device::DeviceShared;
use crate::renderer::resource::{GpuResource, ResourceId, ResourceKind};
use crate::renderer::shader::{InterfaceVar, ScalarType};
use crate::renderer::vertex::{self, DataType, VertexAttribute, VertexData};

/// 使用方式提示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferUsage {
    /// 上传一次，多次绘制
    #[default]
    StaticDraw,
    /// 经常更新
    DynamicDraw,
    /// 每帧更新
    StreamDraw,
}

/// 索引格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    U16,
    U32,
}

/// CPU 端索引数据
#[derive(Debug, Clone, Copy)]
pub enum IndexData<'a> {
    U16(&'a [u16]),
    U32(&'a [u32]),
}

impl<'a> IndexData<'a> {
    pub fn len(&self) -> usize {
        match self {
            IndexData::U16(indices) => indices.len(),
            IndexData::U32(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn format(&self) -> IndexFormat {
        match self {
            IndexData::U16(_) => IndexFormat::U16,
            IndexData::U32(_) => IndexFormat::U32,
        }
    }

    pub fn bytes(&self) -> &'a [u8] {
        match self {
            IndexData::U16(indices) => bytemuck::cast_slice(indices),
            IndexData::U32(indices) => bytemuck::cast_slice(indices),
        }
    }

    /// 最大的索引值
    pub fn max_index(&self) -> Option<u32> {
        match self {
            IndexData::U16(indices) => indices.iter().max().map(|&i| i as u32),
            IndexData::U32(indices) => indices.iter().max().copied(),
        }
    }
}

impl<'a> From<&'a [u16]> for IndexData<'a> {
    fn from(indices: &'a [u16]) -> Self {
        IndexData::U16(indices)
    }
}

impl<'a> From<&'a [u32]> for IndexData<'a> {
    fn from(indices: &'a [u32]) -> Self {
        IndexData::U32(indices)
    }
}

/// 校验顶点/索引数据与布局，返回顶点数量
pub(crate) fn validate_buffer(
    vertices: &VertexData<'_>,
    indices: Option<&IndexData<'_>>,
    layout: &[VertexAttribute],
) -> Result<u32, String> {
    let vertex_count = vertices.vertex_count()?;
    vertex::validate_layout(layout, vertices.record_size())?;

    if let Some(indices) = indices {
        let max = indices.max_index().ok_or_else(|| "index data is empty".to_string())?;
        if max >= vertex_count {
            return Err(format!(
                "index {max} is out of range for {vertex_count} vertices"
            ));
        }
    }

    Ok(vertex_count)
}

/// 检查缓冲布局能否喂给程序的顶点输入
///
/// 第 i 个属性对应 `@location(i)`，分量数与标量类型必须完全一致。
pub(crate) fn check_layout_compat(
    inputs: &[InterfaceVar],
    layout: &[VertexAttribute],
) -> Result<(), String> {
    for input in inputs {
        let attribute = layout.get(input.location as usize).ok_or_else(|| {
            format!(
                "shader reads @location({}) but the buffer layout has {} attribute(s)",
                input.location,
                layout.len()
            )
        })?;

        let scalar_matches = matches!(
            (input.scalar, attribute.data_type),
            (ScalarType::Float, DataType::Float32)
                | (ScalarType::Int, DataType::Int32)
                | (ScalarType::UInt, DataType::UInt32)
        );
        if !scalar_matches || input.components != attribute.components {
            return Err(format!(
                "@location({}) expects {:?}x{} but the buffer provides {:?}x{}",
                input.location,
                input.scalar,
                input.components,
                attribute.data_type,
                attribute.components
            ));
        }
    }
    Ok(())
}

/// GPU 顶点缓冲（可带索引）
pub struct VertexBuffer {
    device: Rc<DeviceShared>,
    id: ResourceId,
    usage: BufferUsage,
    vertex_count: u32,
    index: Option<(u32, IndexFormat)>,
    layout: Vec<VertexAttribute>,
}

impl VertexBuffer {
    pub(crate) fn new(
        device: Rc<DeviceShared>,
        id: ResourceId,
        usage: BufferUsage,
        vertex_count: u32,
        index: Option<(u32, IndexFormat)>,
        layout: Vec<VertexAttribute>,
    ) -> Self {
        Self {
            device,
            id,
            usage,
            vertex_count,
            index,
            layout,
        }
    }

    pub(crate) fn device(&self) -> &Rc<DeviceShared> {
        &self.device
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// 顶点数量
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// 索引数量（非索引缓冲为 None）
    pub fn index_count(&self) -> Option<u32> {
        self.index.map(|(count, _)| count)
    }

    pub fn index_format(&self) -> Option<IndexFormat> {
        self.index.map(|(_, format)| format)
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    pub fn layout(&self) -> &[VertexAttribute] {
        &self.layout
    }

    /// 显式释放
    pub fn destroy(self) {}
}

impl GpuResource for VertexBuffer {
    const KIND: ResourceKind = ResourceKind::Buffer;

    fn id(&self) -> ResourceId {
        self.id
    }
}

impl fmt::Debug for VertexBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexBuffer")
            .field("id", &self.id)
            .field("usage", &self.usage)
            .field("vertex_count", &self.vertex_count)
            .field("index", &self.index)
            .finish()
    }
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        self.device.release(self.id);
    }
}
