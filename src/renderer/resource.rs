//! 资源管理模块
//!
//! 提供统一的资源标识与存储，用于管理着色器、缓冲区、纹理等 GPU 资源。
//!
//! 每个资源由 `ResourceId` 标识：槽位索引 + 代数（generation）。
//! 资源销毁后槽位会被复用，但代数递增，旧 id 永远不会再解析成功，
//! 因此“使用已销毁资源”可以在抽象层被检测出来。

use std::fmt;

/// 资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// 单个着色器阶段
    Shader,
    /// 链接后的着色器程序
    Program,
    /// 顶点缓冲（可带索引）
    Buffer,
    /// 二维纹理
    Texture,
}

impl ResourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Shader => "shader",
            ResourceKind::Program => "shader program",
            ResourceKind::Buffer => "vertex buffer",
            ResourceKind::Texture => "texture",
        }
    }
}

/// 资源标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId {
    kind: ResourceKind,
    index: u32,
    generation: u32,
}

impl ResourceId {
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}v{}", self.kind.name(), self.index, self.generation)
    }
}

/// 所有 GPU 资源句柄共享的接口
pub trait GpuResource {
    /// 资源类型
    const KIND: ResourceKind;

    /// 资源标识
    fn id(&self) -> ResourceId;
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// 按代数管理的资源表
#[derive(Debug)]
pub struct ResourceRegistry<T> {
    kind: ResourceKind,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> ResourceRegistry<T> {
    /// 创建空的资源表
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// 预留一个 id（不插入数据）
    ///
    /// 后端需要在记录插入前就拿到 id 来创建 GPU 对象；
    /// 若后端失败，调用方不调用 `insert` 即可，槽位会在下次预留时复用。
    pub fn reserve(&mut self) -> ResourceId {
        let index = match self.free.last() {
            Some(&index) => index,
            None => {
                self.slots.push(Slot { generation: 0, value: None });
                let index = (self.slots.len() - 1) as u32;
                self.free.push(index);
                index
            }
        };

        ResourceId {
            kind: self.kind,
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    /// 把数据写入预留的 id
    ///
    /// 只接受最近一次 `reserve` 返回的 id。
    pub fn insert(&mut self, id: ResourceId, value: T) {
        debug_assert_eq!(id.kind, self.kind);
        debug_assert_eq!(self.free.last(), Some(&id.index), "id was not reserved");

        self.free.pop();
        let slot = &mut self.slots[id.index as usize];
        debug_assert_eq!(slot.generation, id.generation);
        slot.value = Some(value);
        self.live += 1;
    }

    /// 查找资源
    pub fn get(&self, id: ResourceId) -> Option<&T> {
        if id.kind != self.kind {
            return None;
        }
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    /// 查找资源（可变）
    pub fn get_mut(&mut self, id: ResourceId) -> Option<&mut T> {
        if id.kind != self.kind {
            return None;
        }
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// id 是否仍指向一个存活的资源
    pub fn contains(&self, id: ResourceId) -> bool {
        self.get(id).is_some()
    }

    /// 移除资源，槽位代数递增
    pub fn remove(&mut self, id: ResourceId) -> Option<T> {
        if !self.contains(id) {
            return None;
        }

        let slot = &mut self.slots[id.index as usize];
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);

        // 已预留但未使用的槽位必须保持在栈顶
        let top = self.free.pop();
        self.free.push(id.index);
        if let Some(top) = top {
            self.free.push(top);
        }

        self.live -= 1;
        value
    }

    /// 存活资源数量
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert<T>(registry: &mut ResourceRegistry<T>, value: T) -> ResourceId {
        let id = registry.reserve();
        registry.insert(id, value);
        id
    }

    #[test]
    fn test_insert_and_get() {
        let mut registry = ResourceRegistry::new(ResourceKind::Buffer);
        let a = insert(&mut registry, "a");
        let b = insert(&mut registry, "b");

        assert_ne!(a, b);
        assert_eq!(registry.get(a), Some(&"a"));
        assert_eq!(registry.get(b), Some(&"b"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_stale_id_after_remove() {
        let mut registry = ResourceRegistry::new(ResourceKind::Texture);
        let old = insert(&mut registry, 1);

        assert_eq!(registry.remove(old), Some(1));
        assert!(registry.get(old).is_none());
        assert!(registry.remove(old).is_none());

        // 槽位复用，但旧 id 仍然失效
        let new = insert(&mut registry, 2);
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());
        assert!(registry.get(old).is_none());
        assert_eq!(registry.get(new), Some(&2));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reserve_without_insert_is_reused() {
        let mut registry: ResourceRegistry<u8> = ResourceRegistry::new(ResourceKind::Shader);
        let first = registry.reserve();
        assert!(!registry.contains(first));

        let second = registry.reserve();
        assert_eq!(first, second);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_while_reserved() {
        let mut registry = ResourceRegistry::new(ResourceKind::Program);
        let a = insert(&mut registry, 'a');
        let reserved = registry.reserve();

        registry.remove(a);
        // 预留的 id 依然可以插入
        registry.insert(reserved, 'r');
        assert_eq!(registry.get(reserved), Some(&'r'));
        assert_eq!(insert(&mut registry, 'c').index(), a.index());
    }

    #[test]
    fn test_kind_mismatch() {
        let mut buffers = ResourceRegistry::new(ResourceKind::Buffer);
        let textures: ResourceRegistry<()> = ResourceRegistry::new(ResourceKind::Texture);
        let id = insert(&mut buffers, ());
        assert!(!textures.contains(id));
        assert_eq!(id.to_string(), "vertex buffer#0v0");
    }
}
