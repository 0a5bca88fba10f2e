//! 顶点数据定义
//!
//! 本模块定义顶点布局描述（`VertexAttribute`）、CPU 端顶点数据视图（`VertexData`），
//! 以及两种常用的预定义顶点结构。
//!
//! # 设计说明
//!
//! - 使用 `#[repr(C)]` 确保内存布局与着色器输入一致
//! - 实现 `Pod` 和 `Zeroable` trait 以支持零拷贝上传到 GPU
//! - 第 i 个属性对应着色器中的 `@location(i)`

use bytemuck::{Pod, Zeroable};

use crate::math::{Color, Vector2, Vector3};

/// 顶点分量的数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 32 位浮点
    Float32,
    /// 32 位有符号整数
    Int32,
    /// 32 位无符号整数
    UInt32,
}

impl DataType {
    /// 单个分量的字节数
    pub fn size(&self) -> u32 {
        match self {
            DataType::Float32 | DataType::Int32 | DataType::UInt32 => 4,
        }
    }
}

/// 顶点属性描述
///
/// 描述交错顶点记录中的一个字段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// 分量数（1-4）
    pub components: u8,
    /// 分量类型
    pub data_type: DataType,
    /// 顶点记录的跨度（字节）
    pub stride: u32,
    /// 在记录中的偏移（字节）
    pub offset: u32,
}

impl VertexAttribute {
    pub fn new(components: u8, data_type: DataType, stride: u32, offset: u32) -> Self {
        Self {
            components,
            data_type,
            stride,
            offset,
        }
    }

    /// 属性占用的字节数
    pub fn byte_size(&self) -> u32 {
        self.components as u32 * self.data_type.size()
    }
}

/// 校验顶点布局
///
/// 每个属性的 stride 必须等于顶点记录大小，且属性完整落在记录之内。
pub fn validate_layout(layout: &[VertexAttribute], record_size: usize) -> Result<(), String> {
    if layout.is_empty() {
        return Err("vertex layout has no attributes".to_string());
    }

    for (location, attribute) in layout.iter().enumerate() {
        if !(1..=4).contains(&attribute.components) {
            return Err(format!(
                "attribute {location}: component count {} is outside 1..=4",
                attribute.components
            ));
        }
        if attribute.stride as usize != record_size {
            return Err(format!(
                "attribute {location}: stride {} does not match the vertex record size {record_size}",
                attribute.stride
            ));
        }
        if attribute.offset as usize + attribute.byte_size() as usize > record_size {
            return Err(format!(
                "attribute {location}: {} bytes at offset {} overflow the {record_size}-byte record",
                attribute.byte_size(),
                attribute.offset
            ));
        }
    }

    Ok(())
}

/// CPU 端顶点数据
///
/// 字节视图加上每个顶点记录的大小。
#[derive(Debug, Clone, Copy)]
pub struct VertexData<'a> {
    bytes: &'a [u8],
    record_size: usize,
}

impl<'a> VertexData<'a> {
    /// 从顶点结构数组创建，记录大小为 `size_of::<V>()`
    pub fn from_records<V: Pod>(records: &'a [V]) -> Self {
        Self {
            bytes: bytemuck::cast_slice(records),
            record_size: std::mem::size_of::<V>(),
        }
    }

    /// 从扁平的标量数组创建（例如每 3 个 f32 一个顶点）
    pub fn from_flat<T: Pod>(values: &'a [T], record_size: usize) -> Self {
        Self {
            bytes: bytemuck::cast_slice(values),
            record_size,
        }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// 校验数据并返回顶点数量
    pub fn vertex_count(&self) -> Result<u32, String> {
        if self.bytes.is_empty() {
            return Err("vertex data is empty".to_string());
        }
        if self.record_size == 0 {
            return Err("vertex record size is zero".to_string());
        }
        if self.bytes.len() % self.record_size != 0 {
            return Err(format!(
                "{} bytes of vertex data is not a whole number of {}-byte records",
                self.bytes.len(),
                self.record_size
            ));
        }
        Ok((self.bytes.len() / self.record_size) as u32)
    }
}

/// 带固定布局的顶点结构
pub trait Vertex: Pod {
    /// 该结构对应的顶点布局
    fn layout() -> Vec<VertexAttribute>;
}

/// 位置 + 纹理坐标顶点
///
/// # 内存布局
///
/// - `position`：12 字节（3 个 f32）
/// - `tex_coord`：8 字节（2 个 f32）
///
/// 总大小：20 字节
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VertexPositionTexture {
    pub position: [f32; 3],
    pub tex_coord: [f32; 2],
}

impl VertexPositionTexture {
    pub fn new(position: Vector3, tex_coord: Vector2) -> Self {
        Self {
            position: [position.x, position.y, position.z],
            tex_coord: [tex_coord.x, tex_coord.y],
        }
    }
}

impl Vertex for VertexPositionTexture {
    fn layout() -> Vec<VertexAttribute> {
        let stride = std::mem::size_of::<Self>() as u32;
        vec![
            VertexAttribute::new(3, DataType::Float32, stride, 0),
            VertexAttribute::new(2, DataType::Float32, stride, 12),
        ]
    }
}

/// 位置 + 颜色顶点
///
/// # 内存布局
///
/// - `position`：12 字节（3 个 f32）
/// - `color`：16 字节（RGBA，4 个 f32）
///
/// 总大小：28 字节
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VertexPositionColor {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl VertexPositionColor {
    pub fn new(position: Vector3, color: Color) -> Self {
        Self {
            position: [position.x, position.y, position.z],
            color: color.to_array(),
        }
    }
}

impl Vertex for VertexPositionColor {
    fn layout() -> Vec<VertexAttribute> {
        let stride = std::mem::size_of::<Self>() as u32;
        vec![
            VertexAttribute::new(3, DataType::Float32, stride, 0),
            VertexAttribute::new(4, DataType::Float32, stride, 12),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn test_vertex_layout_sizes() {
        assert_eq!(mem::size_of::<VertexPositionTexture>(), 20);
        assert_eq!(mem::size_of::<VertexPositionColor>(), 28);

        assert!(validate_layout(&VertexPositionTexture::layout(), 20).is_ok());
        assert!(validate_layout(&VertexPositionColor::layout(), 28).is_ok());
    }

    #[test]
    fn test_stride_mismatch() {
        let layout = [VertexAttribute::new(3, DataType::Float32, 16, 0)];
        let err = validate_layout(&layout, 12).unwrap_err();
        assert!(err.contains("stride 16"));
    }

    #[test]
    fn test_attribute_overflow() {
        let layout = [
            VertexAttribute::new(3, DataType::Float32, 20, 0),
            VertexAttribute::new(3, DataType::Float32, 20, 12),
        ];
        assert!(validate_layout(&layout, 20).is_err());
    }

    #[test]
    fn test_component_count_range() {
        let layout = [VertexAttribute::new(5, DataType::Float32, 20, 0)];
        assert!(validate_layout(&layout, 20).is_err());
        assert!(validate_layout(&[], 20).is_err());
    }

    #[test]
    fn test_flat_vertex_data() {
        let values = [-0.5f32, -0.5, 0.0, 0.0, -0.5, 0.0, -0.5, 0.5, 0.0];
        let data = VertexData::from_flat(&values, 12);
        assert_eq!(data.vertex_count(), Ok(3));

        let partial = VertexData::from_flat(&values[..8], 12);
        assert!(partial.vertex_count().is_err());

        let empty: [f32; 0] = [];
        assert!(VertexData::from_flat(&empty, 12).vertex_count().is_err());
    }

    #[test]
    fn test_record_vertex_data() {
        let vertices = [
            VertexPositionColor::new(Vector3::new(0.0, -0.5, 0.0), Color::RED),
            VertexPositionColor::new(Vector3::new(-0.5, 0.5, 0.0), Color::GREEN),
        ];
        let data = VertexData::from_records(&vertices);
        assert_eq!(data.record_size(), 28);
        assert_eq!(data.vertex_count(), Ok(2));
        assert_eq!(data.bytes().len(), 56);
    }
}
