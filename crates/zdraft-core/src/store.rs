//! 图形存储与历史记录的边界接口
//!
//! 核心只通过这些 trait 读写图形集合，具体存储和撤销实现由外部提供。
//! [`MemoryStore`] 和 [`EditHistory`] 是内存中的默认实现。

use crate::error::StoreError;
use crate::geometry::Geometry;
use crate::shape::{LayerId, Shape, ShapeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 对单个图形的局部修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeUpdate {
    pub id: ShapeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<LayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
}

impl ShapeUpdate {
    /// 空修改
    pub fn new(id: ShapeId) -> Self {
        Self {
            id,
            geometry: None,
            layer_id: None,
            visible: None,
            locked: None,
        }
    }

    /// 只替换几何数据
    pub fn geometry(id: ShapeId, geometry: Geometry) -> Self {
        Self {
            geometry: Some(geometry),
            ..Self::new(id)
        }
    }

    fn apply_to(&self, shape: &mut Shape) {
        if let Some(geometry) = &self.geometry {
            shape.geometry = geometry.clone();
        }
        if let Some(layer_id) = &self.layer_id {
            shape.layer_id = layer_id.clone();
        }
        if let Some(visible) = self.visible {
            shape.visible = visible;
        }
        if let Some(locked) = self.locked {
            shape.locked = locked;
        }
    }

    /// 记录修改前的值，用于生成逆操作
    fn capture(&self, shape: &Shape) -> ShapeUpdate {
        ShapeUpdate {
            id: shape.id.clone(),
            geometry: self.geometry.as_ref().map(|_| shape.geometry.clone()),
            layer_id: self.layer_id.as_ref().map(|_| shape.layer_id.clone()),
            visible: self.visible.map(|_| shape.visible),
            locked: self.locked.map(|_| shape.locked),
        }
    }
}

/// 一次原子编辑（对应一条撤销记录）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Edit {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub updates: Vec<ShapeUpdate>,
    #[serde(default)]
    pub added: Vec<Shape>,
    #[serde(default)]
    pub deleted: Vec<ShapeId>,
    /// `added` 中各图形在绘制顺序中的插入位置；缺省时追加到末尾
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<usize>,
}

impl Edit {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_updates(mut self, updates: Vec<ShapeUpdate>) -> Self {
        self.updates = updates;
        self
    }

    pub fn with_added(mut self, added: Vec<Shape>) -> Self {
        self.added = added;
        self
    }

    pub fn with_deleted(mut self, deleted: Vec<ShapeId>) -> Self {
        self.deleted = deleted;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.added.is_empty() && self.deleted.is_empty()
    }
}

/// 只读访问图形集合
pub trait ShapeLookup {
    fn get_shape(&self, id: &ShapeId) -> Option<&Shape>;

    /// 按绘制顺序（由底到顶）遍历所有图形
    fn shapes(&self) -> Box<dyn Iterator<Item = &Shape> + '_>;

    /// 每次修改后递增的版本号，用于判断缓存是否失效
    fn revision(&self) -> u64;

    fn shape_count(&self) -> usize {
        self.shapes().count()
    }
}

/// 可写的图形存储
pub trait ShapeStore: ShapeLookup {
    /// 原子地应用一次编辑；成功时返回逆操作
    fn apply_edit(&mut self, edit: &Edit) -> Result<Edit, StoreError>;

    fn update_shape(&mut self, update: ShapeUpdate) -> Result<Edit, StoreError> {
        self.apply_edit(&Edit::new("update").with_updates(vec![update]))
    }

    fn add_shapes(&mut self, shapes: Vec<Shape>) -> Result<Edit, StoreError> {
        self.apply_edit(&Edit::new("add").with_added(shapes))
    }

    fn delete_shapes(&mut self, ids: Vec<ShapeId>) -> Result<Edit, StoreError> {
        self.apply_edit(&Edit::new("delete").with_deleted(ids))
    }
}

/// 选择集接口
pub trait SelectionState {
    fn selected_shape_ids(&self) -> &[ShapeId];
    fn select_shapes(&mut self, ids: &[ShapeId]);
    fn deselect_all(&mut self);
}

/// 撤销/重做接口
pub trait History {
    /// 记录一次已提交的编辑及其逆操作
    fn record(&mut self, forward: Edit, inverse: Edit);
    /// 取出需要应用的逆操作
    fn undo(&mut self) -> Option<Edit>;
    /// 取出需要重新应用的编辑
    fn redo(&mut self) -> Option<Edit>;
    fn can_undo(&self) -> bool;
    fn can_redo(&self) -> bool;
}

/// 内存图形存储，保持插入顺序
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    order: Vec<ShapeId>,
    shapes: HashMap<ShapeId, Shape>,
    revision: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_shapes(shapes: impl IntoIterator<Item = Shape>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        store.add_shapes(shapes.into_iter().collect())?;
        Ok(store)
    }

    fn check(&self, edit: &Edit) -> Result<(), StoreError> {
        for update in &edit.updates {
            if !self.shapes.contains_key(&update.id) {
                return Err(StoreError::ShapeNotFound(update.id.clone()));
            }
        }
        for id in &edit.deleted {
            if !self.shapes.contains_key(id) {
                return Err(StoreError::ShapeNotFound(id.clone()));
            }
        }
        let mut fresh = std::collections::HashSet::new();
        for shape in &edit.added {
            if (self.shapes.contains_key(&shape.id) && !edit.deleted.contains(&shape.id))
                || !fresh.insert(&shape.id)
            {
                return Err(StoreError::DuplicateId(shape.id.clone()));
            }
            shape.validate().map_err(|source| StoreError::InvalidGeometry {
                id: shape.id.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

impl ShapeLookup for MemoryStore {
    fn get_shape(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.get(id)
    }

    fn shapes(&self) -> Box<dyn Iterator<Item = &Shape> + '_> {
        Box::new(self.order.iter().filter_map(|id| self.shapes.get(id)))
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn shape_count(&self) -> usize {
        self.order.len()
    }
}

impl ShapeStore for MemoryStore {
    fn apply_edit(&mut self, edit: &Edit) -> Result<Edit, StoreError> {
        self.check(edit)?;

        let mut inverse = Edit::new(format!("undo {}", edit.description));

        for update in &edit.updates {
            if let Some(shape) = self.shapes.get_mut(&update.id) {
                inverse.updates.push(update.capture(shape));
                update.apply_to(shape);
            }
        }
        // 逆操作需按相反顺序恢复
        inverse.updates.reverse();

        for id in &edit.deleted {
            if let Some(shape) = self.shapes.remove(id) {
                if let Some(index) = self.order.iter().position(|o| o == id) {
                    self.order.remove(index);
                    inverse.positions.push(index);
                } else {
                    inverse.positions.push(self.order.len());
                }
                inverse.added.push(shape);
            }
        }
        // 按删除的相反顺序插回，每个位置都对应插入时的顺序
        inverse.added.reverse();
        inverse.positions.reverse();

        for (i, shape) in edit.added.iter().enumerate() {
            match edit.positions.get(i) {
                Some(&index) if index <= self.order.len() => {
                    self.order.insert(index, shape.id.clone())
                }
                _ => self.order.push(shape.id.clone()),
            }
            self.shapes.insert(shape.id.clone(), shape.clone());
            inverse.deleted.push(shape.id.clone());
        }

        self.revision += 1;
        tracing::trace!(
            revision = self.revision,
            updated = edit.updates.len(),
            added = edit.added.len(),
            deleted = edit.deleted.len(),
            "applied edit: {}",
            edit.description
        );
        Ok(inverse)
    }
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    forward: Edit,
    inverse: Edit,
}

/// 线性撤销历史
#[derive(Debug, Clone)]
pub struct EditHistory {
    entries: Vec<HistoryEntry>,
    /// 指向最后一条已应用记录，-1 表示空
    index: i32,
    limit: usize,
}

impl EditHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: -1,
            limit: limit.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = -1;
    }
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::new(100)
    }
}

impl History for EditHistory {
    fn record(&mut self, forward: Edit, inverse: Edit) {
        // 截断 redo 历史
        let new_len = (self.index + 1) as usize;
        self.entries.truncate(new_len);

        self.entries.push(HistoryEntry { forward, inverse });
        if self.entries.len() > self.limit {
            self.entries.remove(0);
        }
        self.index = self.entries.len() as i32 - 1;
    }

    fn undo(&mut self) -> Option<Edit> {
        if !self.can_undo() {
            return None;
        }
        let entry = &self.entries[self.index as usize];
        self.index -= 1;
        Some(entry.inverse.clone())
    }

    fn redo(&mut self) -> Option<Edit> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        Some(self.entries[self.index as usize].forward.clone())
    }

    fn can_undo(&self) -> bool {
        self.index >= 0
    }

    fn can_redo(&self) -> bool {
        (self.index + 1) < self.entries.len() as i32
    }
}
