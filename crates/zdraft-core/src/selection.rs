//! 选择引擎
//!
//! - 窗口选择：图形的所有分解边都完全落在框内
//! - 交叉选择：任一分解边与框相交，或有端点在框内
//!
//! 没有边分解的图形（文本、点）按包围盒判断。锁定、隐藏和不在当前图纸上的图形不可选。

use crate::math::{BoundingBox2, Point2, EPSILON};
use crate::shape::{DrawingId, Shape, ShapeId};
use crate::spatial::Quadtree;
use crate::store::{SelectionState, ShapeLookup};
use crate::viewport::Viewport;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 框选模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// 完全包含
    Window,
    /// 相交或包含
    Crossing,
}

impl SelectionMode {
    /// 从左向右拖动为窗口选择，从右向左为交叉选择
    pub fn from_drag(start: Point2<f64>, end: Point2<f64>) -> Self {
        if end.x >= start.x {
            SelectionMode::Window
        } else {
            SelectionMode::Crossing
        }
    }
}

/// 屏幕空间的拖拽框
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionBox {
    pub start: Point2<f64>,
    pub end: Point2<f64>,
    pub mode: SelectionMode,
}

impl SelectionBox {
    pub fn new(start: Point2<f64>, end: Point2<f64>) -> Self {
        Self {
            start,
            end,
            mode: SelectionMode::from_drag(start, end),
        }
    }

    /// 转换为世界坐标的范围
    pub fn world_bounds(&self, viewport: &Viewport) -> BoundingBox2 {
        viewport.screen_rect_to_world(self.start, self.end)
    }
}

/// 图形在当前图纸上是否可选
pub fn is_selectable(shape: &Shape, drawing_id: &DrawingId) -> bool {
    shape.visible && !shape.locked && &shape.drawing_id == drawing_id
}

/// 窗口模式：所有边都在框内
pub fn inside_window(shape: &Shape, bounds: &BoundingBox2) -> bool {
    match shape.geometry.edges() {
        Some(edges) if !edges.is_empty() => edges
            .iter()
            .all(|e| bounds.contains(&e.start) && bounds.contains(&e.end)),
        _ => bounds.contains_box(&shape.geometry.bounding_box()),
    }
}

/// 交叉模式：任一边与框相交
pub fn crosses_box(shape: &Shape, bounds: &BoundingBox2) -> bool {
    match shape.geometry.edges() {
        Some(edges) if !edges.is_empty() => edges.iter().any(|e| {
            bounds.contains(&e.start)
                || bounds.contains(&e.end)
                || segment_intersects_box(e.start, e.end, bounds)
        }),
        _ => bounds.intersects(&shape.geometry.bounding_box()),
    }
}

/// Liang–Barsky 线段裁剪：线段与矩形是否有交集
pub fn segment_intersects_box(a: Point2<f64>, b: Point2<f64>, bounds: &BoundingBox2) -> bool {
    let d = b - a;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    let checks = [
        (-d.x, a.x - bounds.min.x),
        (d.x, bounds.max.x - a.x),
        (-d.y, a.y - bounds.min.y),
        (d.y, bounds.max.y - a.y),
    ];

    for (p, q) in checks {
        if p.abs() < EPSILON {
            // 平行于该边界且在外侧
            if q < 0.0 {
                return false;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return false;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return false;
                }
                t1 = t1.min(r);
            }
        }
    }

    t0 <= t1
}

/// 框选，结果按图形的 z 序排列
pub fn box_select(
    store: &dyn ShapeLookup,
    index: &Quadtree,
    drawing_id: &DrawingId,
    bounds: &BoundingBox2,
    mode: SelectionMode,
) -> Vec<ShapeId> {
    let candidates: HashSet<ShapeId> = index.query_region(bounds).into_iter().collect();

    let selected: Vec<ShapeId> = store
        .shapes()
        .filter(|s| candidates.contains(&s.id) && is_selectable(s, drawing_id))
        .filter(|s| match mode {
            SelectionMode::Window => inside_window(s, bounds),
            SelectionMode::Crossing => crosses_box(s, bounds),
        })
        .map(|s| s.id.clone())
        .collect();

    tracing::debug!(
        ?mode,
        candidates = candidates.len(),
        selected = selected.len(),
        "box selection"
    );
    selected
}

/// 点选：返回容差内最上层的图形
pub fn pick_at(
    store: &dyn ShapeLookup,
    index: &Quadtree,
    drawing_id: &DrawingId,
    point: &Point2<f64>,
    tolerance: f64,
) -> Option<ShapeId> {
    let candidates: HashSet<ShapeId> = index.query_point(point, tolerance).into_iter().collect();
    if candidates.is_empty() {
        return None;
    }

    store
        .shapes()
        .filter(|s| candidates.contains(&s.id) && is_selectable(s, drawing_id))
        .filter(|s| s.geometry.contains_point(point, tolerance))
        .last()
        .map(|s| s.id.clone())
}

/// 有序选择集
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionSet {
    ids: Vec<ShapeId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ShapeId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// 应用一次选择结果；`additive` 时与现有选择合并，否则替换
    pub fn apply(&mut self, ids: &[ShapeId], additive: bool) {
        if !additive {
            self.ids.clear();
        }
        self.select_shapes(ids);
    }

    /// 切换单个图形的选中状态
    pub fn toggle(&mut self, id: &ShapeId) {
        if let Some(pos) = self.ids.iter().position(|x| x == id) {
            self.ids.remove(pos);
        } else {
            self.ids.push(id.clone());
        }
    }

    /// 移除已不存在的图形
    pub fn retain_existing(&mut self, store: &dyn ShapeLookup) {
        self.ids.retain(|id| store.get_shape(id).is_some());
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShapeId> {
        self.ids.iter()
    }
}

impl SelectionState for SelectionSet {
    fn selected_shape_ids(&self) -> &[ShapeId] {
        &self.ids
    }

    /// 追加到选择集，已选中的保持原位置
    fn select_shapes(&mut self, ids: &[ShapeId]) {
        for id in ids {
            if !self.ids.contains(id) {
                self.ids.push(id.clone());
            }
        }
    }

    fn deselect_all(&mut self) {
        self.ids.clear();
    }
}
