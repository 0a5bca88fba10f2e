//! 着色器与着色器程序
//!
//! 着色器源码为 WGSL。编译阶段在前端用 `naga` 解析与校验，并反射出：
//! - 入口函数名
//! - 阶段输入/输出（`@location(n)`）
//! - `@group(0)` 中的 uniform / 纹理 / 采样器槽位
//!
//! 链接阶段只依赖反射结果，因此所有后端的编译与链接错误完全一致。
//!
//! # 纹理与采样器
//!
//! 纹理槽位的 uniform 值是一个 `i32` 纹理单元号，对应 `use_textures` 中的位置。
//! 名为 `<纹理名>_sampler` 的采样器与同名纹理配对，使用该纹理的采样设置。

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use naga::{AddressSpace, Binding, ImageDimension, ScalarKind, TypeInner, VectorSize};

use crate::core::error::{GraphicsError, GraphicsResult};
use crate::math::Matrix4;
use crate::renderer::device::DeviceShared;
use crate::renderer::resource::{GpuResource, ResourceId, ResourceKind};

/// 着色器阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

impl ShaderKind {
    fn naga_stage(&self) -> naga::ShaderStage {
        match self {
            ShaderKind::Vertex => naga::ShaderStage::Vertex,
            ShaderKind::Fragment => naga::ShaderStage::Fragment,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShaderKind::Vertex => "vertex",
            ShaderKind::Fragment => "fragment",
        }
    }
}

/// 一段着色器源码及其阶段
#[derive(Debug, Clone, Copy)]
pub struct ShaderSource<'a> {
    pub kind: ShaderKind,
    pub source: &'a str,
}

impl<'a> ShaderSource<'a> {
    pub fn vertex(source: &'a str) -> Self {
        Self { kind: ShaderKind::Vertex, source }
    }

    pub fn fragment(source: &'a str) -> Self {
        Self { kind: ShaderKind::Fragment, source }
    }
}

// ---------------------------------------------------------------------------
// uniform 类型
// ---------------------------------------------------------------------------

/// uniform 的值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Int,
    UInt,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

/// uniform 的值
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformData {
    Float(f32),
    Int(i32),
    UInt(u32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// 列主序
    Mat4([f32; 16]),
}

impl UniformData {
    /// 指定类型的零值
    pub fn zeroed(ty: UniformType) -> Self {
        match ty {
            UniformType::Float => UniformData::Float(0.0),
            UniformType::Int => UniformData::Int(0),
            UniformType::UInt => UniformData::UInt(0),
            UniformType::Vec2 => UniformData::Vec2([0.0; 2]),
            UniformType::Vec3 => UniformData::Vec3([0.0; 3]),
            UniformType::Vec4 => UniformData::Vec4([0.0; 4]),
            UniformType::Mat4 => UniformData::Mat4([0.0; 16]),
        }
    }

    pub fn uniform_type(&self) -> UniformType {
        match self {
            UniformData::Float(_) => UniformType::Float,
            UniformData::Int(_) => UniformType::Int,
            UniformData::UInt(_) => UniformType::UInt,
            UniformData::Vec2(_) => UniformType::Vec2,
            UniformData::Vec3(_) => UniformType::Vec3,
            UniformData::Vec4(_) => UniformType::Vec4,
            UniformData::Mat4(_) => UniformType::Mat4,
        }
    }

    /// 按 WGSL uniform 布局序列化（小端）
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            UniformData::Float(v) => bytemuck::bytes_of(v).to_vec(),
            UniformData::Int(v) => bytemuck::bytes_of(v).to_vec(),
            UniformData::UInt(v) => bytemuck::bytes_of(v).to_vec(),
            UniformData::Vec2(v) => bytemuck::cast_slice(v).to_vec(),
            UniformData::Vec3(v) => bytemuck::cast_slice(v).to_vec(),
            UniformData::Vec4(v) => bytemuck::cast_slice(v).to_vec(),
            UniformData::Mat4(v) => bytemuck::cast_slice(v).to_vec(),
        }
    }
}

/// 可以写入 uniform 的 Rust 类型
pub trait UniformValue: Copy + fmt::Debug {
    const TYPE: UniformType;

    fn into_data(self) -> UniformData;
}

impl UniformValue for f32 {
    const TYPE: UniformType = UniformType::Float;

    fn into_data(self) -> UniformData {
        UniformData::Float(self)
    }
}

impl UniformValue for i32 {
    const TYPE: UniformType = UniformType::Int;

    fn into_data(self) -> UniformData {
        UniformData::Int(self)
    }
}

impl UniformValue for u32 {
    const TYPE: UniformType = UniformType::UInt;

    fn into_data(self) -> UniformData {
        UniformData::UInt(self)
    }
}

impl UniformValue for [f32; 2] {
    const TYPE: UniformType = UniformType::Vec2;

    fn into_data(self) -> UniformData {
        UniformData::Vec2(self)
    }
}

impl UniformValue for [f32; 3] {
    const TYPE: UniformType = UniformType::Vec3;

    fn into_data(self) -> UniformData {
        UniformData::Vec3(self)
    }
}

impl UniformValue for [f32; 4] {
    const TYPE: UniformType = UniformType::Vec4;

    fn into_data(self) -> UniformData {
        UniformData::Vec4(self)
    }
}

impl UniformValue for Matrix4 {
    const TYPE: UniformType = UniformType::Mat4;

    fn into_data(self) -> UniformData {
        let mut columns = [0.0; 16];
        columns.copy_from_slice(self.as_slice());
        UniformData::Mat4(columns)
    }
}

/// 程序中的一个槽位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    pub name: String,
    /// `@group(0) @binding(n)`
    pub binding: u32,
    pub kind: SlotKind,
}

/// 槽位类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// 普通 uniform 值
    Value(UniformType),
    /// 二维纹理，值为纹理单元号（i32）
    Texture,
    /// 采样器，跟随 `texture` 绑定的纹理
    Sampler { texture: u32 },
}

impl SlotKind {
    /// 通过 `get_uniform` 访问时的值类型；采样器不可直接设置
    pub fn value_type(&self) -> Option<UniformType> {
        match self {
            SlotKind::Value(ty) => Some(*ty),
            SlotKind::Texture => Some(UniformType::Int),
            SlotKind::Sampler { .. } => None,
        }
    }
}

/// 类型化的 uniform 句柄
///
/// 只能用在创建它的程序上。
#[derive(Debug, Clone)]
pub struct UniformHandle<T: UniformValue> {
    device: u32,
    program: ResourceId,
    slot: usize,
    name: String,
    _marker: PhantomData<T>,
}

impl<T: UniformValue> UniformHandle<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> ResourceId {
        self.program
    }
}

// ---------------------------------------------------------------------------
// 反射
// ---------------------------------------------------------------------------

/// 接口变量的标量类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Float,
    Int,
    UInt,
    Bool,
}

/// 阶段输入/输出变量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceVar {
    pub location: u32,
    pub scalar: ScalarType,
    pub components: u8,
}

/// 全局资源绑定的类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BindingType {
    Uniform(UniformType),
    Texture,
    Sampler,
    /// 不支持的类型，保存描述用于链接错误
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GlobalBinding {
    pub group: u32,
    pub binding: u32,
    pub name: String,
    pub ty: BindingType,
}

/// 单个着色器阶段的反射结果
#[derive(Debug, Clone)]
pub(crate) struct ShaderReflection {
    pub kind: ShaderKind,
    pub entry_point: String,
    pub inputs: Vec<InterfaceVar>,
    pub outputs: Vec<InterfaceVar>,
    pub bindings: Vec<GlobalBinding>,
}

/// 链接后的程序布局
#[derive(Debug, Clone)]
pub(crate) struct ProgramLayout {
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub vertex_inputs: Vec<InterfaceVar>,
    pub slots: Vec<UniformSlot>,
}

impl ProgramLayout {
    pub fn slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.name == name)
    }
}

/// 解析、校验并反射一个着色器阶段
pub(crate) fn reflect(kind: ShaderKind, source: &str) -> GraphicsResult<ShaderReflection> {
    let compile_error = |log: String| GraphicsError::Compile { stage: kind, log };

    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| compile_error(e.emit_to_string(source)))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    );
    validator
        .validate(&module)
        .map_err(|e| compile_error(format!("Validation error: {e}")))?;

    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == kind.naga_stage())
        .ok_or_else(|| compile_error(format!("no {} entry point found", kind.name())))?;

    let mut inputs = Vec::new();
    for argument in &entry.function.arguments {
        collect_interface(&module, argument.binding.as_ref(), argument.ty, &mut inputs)
            .map_err(compile_error)?;
    }

    let mut outputs = Vec::new();
    if let Some(result) = &entry.function.result {
        collect_interface(&module, result.binding.as_ref(), result.ty, &mut outputs)
            .map_err(compile_error)?;
    }

    let mut bindings = Vec::new();
    for (_, global) in module.global_variables.iter() {
        let Some(resource) = &global.binding else {
            continue;
        };
        let name = global
            .name
            .clone()
            .unwrap_or_else(|| format!("binding{}", resource.binding));
        bindings.push(GlobalBinding {
            group: resource.group,
            binding: resource.binding,
            name,
            ty: binding_type(&module.types[global.ty].inner, global.space),
        });
    }

    tracing::debug!(
        stage = kind.name(),
        entry = %entry.name,
        inputs = inputs.len(),
        bindings = bindings.len(),
        "Shader reflected"
    );

    Ok(ShaderReflection {
        kind,
        entry_point: entry.name.clone(),
        inputs,
        outputs,
        bindings,
    })
}

fn collect_interface(
    module: &naga::Module,
    binding: Option<&Binding>,
    ty: naga::Handle<naga::Type>,
    out: &mut Vec<InterfaceVar>,
) -> Result<(), String> {
    let inner = &module.types[ty].inner;
    match binding {
        Some(Binding::Location { location, .. }) => {
            let (scalar, components) = interface_type(inner)
                .ok_or_else(|| format!("@location({location}) has an unsupported type"))?;
            out.push(InterfaceVar {
                location: *location,
                scalar,
                components,
            });
        }
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = inner {
                for member in members {
                    collect_interface(module, member.binding.as_ref(), member.ty, out)?;
                }
            }
        }
    }
    Ok(())
}

fn scalar_type(inner: &TypeInner) -> Option<ScalarType> {
    match inner.scalar_kind()? {
        ScalarKind::Float => Some(ScalarType::Float),
        ScalarKind::Sint => Some(ScalarType::Int),
        ScalarKind::Uint => Some(ScalarType::UInt),
        ScalarKind::Bool => Some(ScalarType::Bool),
        _ => None,
    }
}

fn interface_type(inner: &TypeInner) -> Option<(ScalarType, u8)> {
    match inner {
        TypeInner::Scalar { .. } => Some((scalar_type(inner)?, 1)),
        TypeInner::Vector { size, .. } => Some((scalar_type(inner)?, *size as u8)),
        _ => None,
    }
}

fn binding_type(inner: &TypeInner, space: AddressSpace) -> BindingType {
    match (space, inner) {
        (AddressSpace::Uniform, TypeInner::Scalar { .. }) => match scalar_type(inner) {
            Some(ScalarType::Float) => BindingType::Uniform(UniformType::Float),
            Some(ScalarType::Int) => BindingType::Uniform(UniformType::Int),
            Some(ScalarType::UInt) => BindingType::Uniform(UniformType::UInt),
            _ => BindingType::Unsupported("non-numeric scalar".to_string()),
        },
        (AddressSpace::Uniform, TypeInner::Vector { size, .. })
            if scalar_type(inner) == Some(ScalarType::Float) =>
        {
            match size {
                VectorSize::Bi => BindingType::Uniform(UniformType::Vec2),
                VectorSize::Tri => BindingType::Uniform(UniformType::Vec3),
                VectorSize::Quad => BindingType::Uniform(UniformType::Vec4),
            }
        }
        (
            AddressSpace::Uniform,
            TypeInner::Matrix {
                columns: VectorSize::Quad,
                rows: VectorSize::Quad,
                ..
            },
        ) => BindingType::Uniform(UniformType::Mat4),
        (AddressSpace::Uniform, TypeInner::Struct { .. }) => {
            BindingType::Unsupported("struct".to_string())
        }
        (AddressSpace::Uniform, other) => BindingType::Unsupported(format!("{other:?}")),
        (
            AddressSpace::Handle,
            TypeInner::Image {
                dim: ImageDimension::D2,
                arrayed: false,
                ..
            },
        ) => BindingType::Texture,
        (AddressSpace::Handle, TypeInner::Image { .. }) => {
            BindingType::Unsupported("non-2D texture".to_string())
        }
        (AddressSpace::Handle, TypeInner::Sampler { .. }) => BindingType::Sampler,
        (space, _) => BindingType::Unsupported(format!("{space:?} binding")),
    }
}

/// 后缀约定：`tex_sampler` 采样 `tex`
const SAMPLER_SUFFIX: &str = "_sampler";

fn find_stage<'a>(
    stages: &[&'a ShaderReflection],
    kind: ShaderKind,
) -> Result<&'a ShaderReflection, String> {
    let mut matching = stages.iter().copied().filter(|s| s.kind == kind);
    let first = matching
        .next()
        .ok_or_else(|| format!("missing {} stage", kind.name()))?;
    if matching.next().is_some() {
        return Err(format!("more than one {} stage", kind.name()));
    }
    Ok(first)
}

/// 链接一组已反射的阶段
pub(crate) fn link(stages: &[&ShaderReflection]) -> Result<ProgramLayout, String> {
    let vertex = find_stage(stages, ShaderKind::Vertex)?;
    let fragment = find_stage(stages, ShaderKind::Fragment)?;

    for input in &fragment.inputs {
        let output = vertex
            .outputs
            .iter()
            .find(|o| o.location == input.location)
            .ok_or_else(|| {
                format!(
                    "fragment input @location({}) is not written by the vertex stage",
                    input.location
                )
            })?;
        if output.scalar != input.scalar || output.components != input.components {
            return Err(format!(
                "@location({}) is {:?}x{} in the vertex stage but {:?}x{} in the fragment stage",
                input.location,
                output.scalar,
                output.components,
                input.scalar,
                input.components
            ));
        }
    }

    // 两个阶段的绑定按 binding 号合并
    let mut merged: BTreeMap<u32, &GlobalBinding> = BTreeMap::new();
    for binding in vertex.bindings.iter().chain(&fragment.bindings) {
        if binding.group != 0 {
            return Err(format!(
                "'{}' uses @group({}); only @group(0) is supported",
                binding.name, binding.group
            ));
        }
        match merged.get(&binding.binding) {
            Some(existing) if existing.name != binding.name || existing.ty != binding.ty => {
                return Err(format!(
                    "@binding({}) is declared as '{}' and '{}' with different types or names",
                    binding.binding, existing.name, binding.name
                ));
            }
            Some(_) => {}
            None => {
                merged.insert(binding.binding, binding);
            }
        }
    }

    let mut slots = Vec::with_capacity(merged.len());
    for binding in merged.values() {
        if slots.iter().any(|s: &UniformSlot| s.name == binding.name) {
            return Err(format!("'{}' is bound more than once", binding.name));
        }

        let kind = match &binding.ty {
            BindingType::Uniform(ty) => SlotKind::Value(*ty),
            BindingType::Texture => SlotKind::Texture,
            BindingType::Sampler => {
                let texture = binding
                    .name
                    .strip_suffix(SAMPLER_SUFFIX)
                    .and_then(|texture_name| {
                        merged.values().find(|b| {
                            b.name == texture_name && b.ty == BindingType::Texture
                        })
                    })
                    .ok_or_else(|| {
                        format!(
                            "sampler '{}' has no matching texture (expected '<texture>{SAMPLER_SUFFIX}')",
                            binding.name
                        )
                    })?;
                SlotKind::Sampler { texture: texture.binding }
            }
            BindingType::Unsupported(description) => {
                return Err(format!(
                    "'{}' has an unsupported uniform type ({description})",
                    binding.name
                ));
            }
        };

        slots.push(UniformSlot {
            name: binding.name.clone(),
            binding: binding.binding,
            kind,
        });
    }

    Ok(ProgramLayout {
        vertex_entry: vertex.entry_point.clone(),
        fragment_entry: fragment.entry_point.clone(),
        vertex_inputs: vertex.inputs.clone(),
        slots,
    })
}

// ---------------------------------------------------------------------------
// 资源句柄
// ---------------------------------------------------------------------------

/// 单个已编译的着色器阶段
///
/// 释放时（drop 或 `destroy`）归还 GPU 资源。
pub struct Shader {
    device: Rc<DeviceShared>,
    id: ResourceId,
    kind: ShaderKind,
}

impl Shader {
    pub(crate) fn new(device: Rc<DeviceShared>, id: ResourceId, kind: ShaderKind) -> Self {
        Self { device, id, kind }
    }

    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    pub(crate) fn device(&self) -> &Rc<DeviceShared> {
        &self.device
    }

    /// 显式释放
    pub fn destroy(self) {}
}

impl GpuResource for Shader {
    const KIND: ResourceKind = ResourceKind::Shader;

    fn id(&self) -> ResourceId {
        self.id
    }
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.device.release(self.id);
    }
}

/// 链接后的着色器程序
pub struct ShaderProgram {
    device: Rc<DeviceShared>,
    id: ResourceId,
}

impl ShaderProgram {
    pub(crate) fn new(device: Rc<DeviceShared>, id: ResourceId) -> Self {
        Self { device, id }
    }

    pub(crate) fn device(&self) -> &Rc<DeviceShared> {
        &self.device
    }

    /// 程序的全部槽位（按 binding 排序）
    pub fn uniforms(&self) -> Vec<UniformSlot> {
        self.device
            .with_program(self.id, |program| program.layout.slots.clone())
            .unwrap_or_default()
    }

    /// 按名称解析 uniform
    ///
    /// 纹理槽位以 `i32` 访问，值为纹理单元号。
    pub fn get_uniform<T: UniformValue>(&self, name: &str) -> GraphicsResult<UniformHandle<T>> {
        let (slot, kind) = self
            .device
            .with_program(self.id, |program| {
                program
                    .layout
                    .slot_index(name)
                    .map(|index| (index, program.layout.slots[index].kind))
            })
            .flatten()
            .ok_or_else(|| GraphicsError::UniformNotFound(name.to_string()))?;

        let actual = kind
            .value_type()
            .ok_or_else(|| GraphicsError::UniformNotFound(name.to_string()))?;
        if actual != T::TYPE {
            return Err(GraphicsError::UniformTypeMismatch {
                name: name.to_string(),
                requested: T::TYPE,
                actual,
            });
        }

        Ok(UniformHandle {
            device: self.device.serial(),
            program: self.id,
            slot,
            name: name.to_string(),
            _marker: PhantomData,
        })
    }

    /// 写入 uniform 值，在之后的绘制中生效
    pub fn set_uniform<T: UniformValue>(
        &self,
        handle: &UniformHandle<T>,
        value: T,
    ) -> GraphicsResult<()> {
        if handle.program != self.id || handle.device != self.device.serial() {
            return Err(GraphicsError::CrossProgramUniform {
                name: handle.name.clone(),
            });
        }

        self.device
            .with_program_mut(self.id, |program| {
                program.values[handle.slot] = Some(value.into_data());
            })
            .ok_or_else(|| {
                GraphicsError::InvalidState(format!("{} has been destroyed", self.id))
            })
    }

    /// 显式释放
    pub fn destroy(self) {}
}

impl GpuResource for ShaderProgram {
    const KIND: ResourceKind = ResourceKind::Program;

    fn id(&self) -> ResourceId {
        self.id
    }
}

impl fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram").field("id", &self.id).finish()
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.device.release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::shaders;

    const VS_POS_UV: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) uv: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(position, 1.0);
    out.uv = uv;
    return out;
}
"#;

    const FS_WRONG_INPUT: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 1.0);
}
"#;

    fn reflect_ok(kind: ShaderKind, source: &str) -> ShaderReflection {
        reflect(kind, source).unwrap()
    }

    #[test]
    fn test_reflect_vertex_inputs() {
        let reflection = reflect_ok(ShaderKind::Vertex, VS_POS_UV);
        assert_eq!(reflection.entry_point, "vs_main");
        assert_eq!(
            reflection.inputs,
            vec![
                InterfaceVar { location: 0, scalar: ScalarType::Float, components: 3 },
                InterfaceVar { location: 1, scalar: ScalarType::Float, components: 2 },
            ]
        );
        // builtin position 不属于阶段间接口
        assert_eq!(reflection.outputs.len(), 1);
    }

    #[test]
    fn test_syntax_error_is_compile_error() {
        let err = reflect(ShaderKind::Vertex, "@vertex fn vs_main( -> {").unwrap_err();
        assert!(matches!(err, GraphicsError::Compile { stage: ShaderKind::Vertex, .. }));
    }

    #[test]
    fn test_missing_entry_point_is_compile_error() {
        let err = reflect(ShaderKind::Fragment, VS_POS_UV).unwrap_err();
        match err {
            GraphicsError::Compile { stage, log } => {
                assert_eq!(stage, ShaderKind::Fragment);
                assert!(log.contains("no fragment entry point"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_link_demo_programs() {
        let vs = reflect_ok(ShaderKind::Vertex, shaders::COLORED_VERTEX);
        let fs = reflect_ok(ShaderKind::Fragment, shaders::COLORED_FRAGMENT);
        let layout = link(&[&vs, &fs]).unwrap();
        assert_eq!(
            layout.slots,
            vec![UniformSlot {
                name: "multiplicator".to_string(),
                binding: 0,
                kind: SlotKind::Value(UniformType::Float),
            }]
        );

        let vs = reflect_ok(ShaderKind::Vertex, shaders::TEXTURED_VERTEX);
        let fs = reflect_ok(ShaderKind::Fragment, shaders::TEXTURED_FRAGMENT);
        let layout = link(&[&vs, &fs]).unwrap();
        let kinds: Vec<_> = layout.slots.iter().map(|s| (s.name.as_str(), s.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("tex", SlotKind::Texture),
                ("tex_sampler", SlotKind::Sampler { texture: 0 }),
                ("tex2", SlotKind::Texture),
                ("tex2_sampler", SlotKind::Sampler { texture: 2 }),
            ]
        );
    }

    #[test]
    fn test_link_requires_both_stages() {
        let vs = reflect_ok(ShaderKind::Vertex, shaders::PLAIN_VERTEX);
        let fs = reflect_ok(ShaderKind::Fragment, shaders::PLAIN_FRAGMENT);

        assert_eq!(link(&[&vs]).unwrap_err(), "missing fragment stage");
        assert_eq!(link(&[&fs]).unwrap_err(), "missing vertex stage");
        assert!(link(&[&vs, &vs, &fs]).unwrap_err().contains("more than one vertex"));
        assert!(link(&[&fs, &vs]).is_ok());
    }

    #[test]
    fn test_link_interface_mismatch() {
        let vs = reflect_ok(ShaderKind::Vertex, VS_POS_UV);
        let fs = reflect_ok(ShaderKind::Fragment, FS_WRONG_INPUT);
        assert!(link(&[&vs, &fs]).unwrap_err().contains("@location(0)"));

        // 片段阶段读取了顶点阶段没有写出的变量
        let vs = reflect_ok(ShaderKind::Vertex, shaders::PLAIN_VERTEX);
        let fs = reflect_ok(ShaderKind::Fragment, shaders::COLORED_FRAGMENT);
        assert!(link(&[&vs, &fs]).unwrap_err().contains("not written"));
    }

    #[test]
    fn test_link_rejects_unpaired_sampler_and_struct_uniform() {
        let fs = reflect_ok(
            ShaderKind::Fragment,
            r#"
@group(0) @binding(0) var albedo: texture_2d<f32>;
@group(0) @binding(1) var smp: sampler;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return textureSample(albedo, smp, vec2<f32>(0.5, 0.5));
}
"#,
        );
        let vs = reflect_ok(ShaderKind::Vertex, shaders::PLAIN_VERTEX);
        assert!(link(&[&vs, &fs]).unwrap_err().contains("sampler 'smp'"));

        let fs = reflect_ok(
            ShaderKind::Fragment,
            r#"
struct Params { tint: vec4<f32> }
@group(0) @binding(0) var<uniform> params: Params;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return params.tint;
}
"#,
        );
        assert!(link(&[&vs, &fs]).unwrap_err().contains("unsupported uniform type"));
    }

    #[test]
    fn test_uniform_data_bytes() {
        assert_eq!(UniformData::Float(1.0).to_bytes(), 1.0f32.to_le_bytes().to_vec());
        assert_eq!(UniformData::zeroed(UniformType::Vec3).to_bytes().len(), 12);

        let data = UniformValue::into_data(Matrix4::identity());
        assert_eq!(data.uniform_type(), UniformType::Mat4);
        assert_eq!(data.to_bytes().len(), 64);
        if let UniformData::Mat4(m) = data {
            assert_eq!(m[0], 1.0);
            assert_eq!(m[5], 1.0);
            assert_eq!(m[1], 0.0);
        }
    }
}
