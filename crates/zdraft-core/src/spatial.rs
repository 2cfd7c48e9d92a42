//! 空间索引
//!
//! 基于四叉树，按图纸从图形包围盒构建，支持：
//! - 点击测试（带容差）
//! - 范围查询
//!
//! 索引只做保守的候选裁剪：查询永远不会漏掉真正命中的图形，
//! 但可能返回假阳性，调用方需要再做精确几何判断。

use crate::math::{BoundingBox2, Point2};
use crate::shape::{DrawingId, Shape, ShapeId};
use crate::store::ShapeLookup;
use serde::{Deserialize, Serialize};

/// 四叉树参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadtreeConfig {
    /// 节点分裂前可容纳的条目数
    pub max_items: usize,
    /// 最大深度，避免重合图形导致无限细分
    pub max_depth: usize,
}

impl Default for QuadtreeConfig {
    fn default() -> Self {
        Self {
            max_items: 8,
            max_depth: 8,
        }
    }
}

/// 索引统计信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuadtreeStats {
    pub total_nodes: usize,
    pub total_items: usize,
    pub max_depth: usize,
}

#[derive(Debug, Clone)]
struct Entry {
    id: ShapeId,
    bbox: BoundingBox2,
}

#[derive(Debug, Clone)]
struct Node {
    bounds: BoundingBox2,
    depth: usize,
    items: Vec<Entry>,
    children: Option<Box<[Node; 4]>>,
}

impl Node {
    fn new(bounds: BoundingBox2, depth: usize) -> Self {
        Self {
            bounds,
            depth,
            items: Vec::new(),
            children: None,
        }
    }

    fn child_bounds(&self) -> [BoundingBox2; 4] {
        let c = self.bounds.center();
        let (min, max) = (self.bounds.min, self.bounds.max);
        [
            BoundingBox2::new(min, c),
            BoundingBox2::new(Point2::new(c.x, min.y), Point2::new(max.x, c.y)),
            BoundingBox2::new(Point2::new(min.x, c.y), Point2::new(c.x, max.y)),
            BoundingBox2::new(c, max),
        ]
    }

    /// 找到完整容纳包围盒的子节点
    fn fitting_child(&self, bbox: &BoundingBox2) -> Option<usize> {
        let children = self.children.as_ref()?;
        children.iter().position(|c| c.bounds.contains_box(bbox))
    }

    fn insert(&mut self, entry: Entry, config: &QuadtreeConfig) {
        if let Some(i) = self.fitting_child(&entry.bbox) {
            if let Some(children) = self.children.as_mut() {
                children[i].insert(entry, config);
                return;
            }
        }

        self.items.push(entry);

        if self.children.is_none()
            && self.items.len() > config.max_items
            && self.depth < config.max_depth
        {
            self.subdivide(config);
        }
    }

    fn subdivide(&mut self, config: &QuadtreeConfig) {
        let depth = self.depth + 1;
        let [b0, b1, b2, b3] = self.child_bounds();
        self.children = Some(Box::new([
            Node::new(b0, depth),
            Node::new(b1, depth),
            Node::new(b2, depth),
            Node::new(b3, depth),
        ]));

        // 重新分配能放进子节点的条目
        let items = std::mem::take(&mut self.items);
        for entry in items {
            match self.fitting_child(&entry.bbox) {
                Some(i) => {
                    if let Some(children) = self.children.as_mut() {
                        children[i].insert(entry, config);
                    }
                }
                None => self.items.push(entry),
            }
        }
    }

    fn query(&self, area: &BoundingBox2, hit: &dyn Fn(&BoundingBox2) -> bool, out: &mut Vec<ShapeId>) {
        for entry in &self.items {
            if hit(&entry.bbox) {
                out.push(entry.id.clone());
            }
        }
        if let Some(children) = &self.children {
            for child in children.iter() {
                if child.bounds.intersects(area) {
                    child.query(area, hit, out);
                }
            }
        }
    }

    fn collect_stats(&self, stats: &mut QuadtreeStats) {
        stats.total_nodes += 1;
        stats.total_items += self.items.len();
        stats.max_depth = stats.max_depth.max(self.depth);
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.collect_stats(stats);
            }
        }
    }
}

/// 四叉树空间索引
#[derive(Debug, Clone)]
pub struct Quadtree {
    root: Node,
    config: QuadtreeConfig,
    len: usize,
}

impl Quadtree {
    /// 创建覆盖指定范围的空索引
    pub fn new(bounds: BoundingBox2, config: QuadtreeConfig) -> Self {
        Self {
            root: Node::new(bounds, 0),
            config,
            len: 0,
        }
    }

    /// 从图形集合构建，根节点覆盖所有图形的包围盒
    pub fn build<'a>(shapes: impl IntoIterator<Item = &'a Shape>, config: QuadtreeConfig) -> Self {
        let entries: Vec<Entry> = shapes
            .into_iter()
            .map(|s| Entry {
                id: s.id.clone(),
                bbox: s.geometry.bounding_box(),
            })
            .collect();

        let extent = entries
            .iter()
            .fold(BoundingBox2::empty(), |acc, e| acc.union(&e.bbox));
        let bounds = if extent.is_empty() {
            BoundingBox2::new(Point2::new(-1.0, -1.0), Point2::new(1.0, 1.0))
        } else {
            // 留出余量，避免边界上的图形全部滞留在根节点
            let margin = (extent.width().max(extent.height()) * 0.01).max(1.0);
            extent.expanded(margin)
        };

        let mut tree = Self::new(bounds, config);
        for entry in entries {
            tree.insert_entry(entry);
        }
        tree
    }

    /// 插入一个条目；超出根节点范围的条目留在根节点，查询时总会被检查
    pub fn insert(&mut self, id: ShapeId, bbox: BoundingBox2) {
        self.insert_entry(Entry { id, bbox });
    }

    fn insert_entry(&mut self, entry: Entry) {
        if self.root.bounds.contains_box(&entry.bbox) {
            self.root.insert(entry, &self.config);
        } else {
            self.root.items.push(entry);
        }
        self.len += 1;
    }

    /// 点击测试：包围盒（按容差扩展后）包含该点的候选图形
    pub fn query_point(&self, point: &Point2<f64>, tolerance: f64) -> Vec<ShapeId> {
        let area = BoundingBox2::new(*point, *point).expanded(tolerance);
        let mut result = Vec::new();
        let hit = |bbox: &BoundingBox2| bbox.expanded(tolerance).contains(point);
        self.root.query(&area, &hit, &mut result);
        result
    }

    /// 范围查询：包围盒与指定区域相交的候选图形
    pub fn query_region(&self, region: &BoundingBox2) -> Vec<ShapeId> {
        let mut result = Vec::new();
        let hit = |bbox: &BoundingBox2| bbox.intersects(region);
        self.root.query(region, &hit, &mut result);
        result
    }

    pub fn stats(&self) -> QuadtreeStats {
        let mut stats = QuadtreeStats::default();
        self.root.collect_stats(&mut stats);
        stats
    }

    pub fn bounds(&self) -> &BoundingBox2 {
        &self.root.bounds
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 清空索引
    pub fn clear(&mut self) {
        self.root = Node::new(self.root.bounds, 0);
        self.len = 0;
    }
}

/// 按图纸缓存的四叉树
///
/// 存储版本号不变时复用已有索引，否则重建。
#[derive(Debug, Clone)]
pub struct IndexedDrawing {
    drawing_id: DrawingId,
    config: QuadtreeConfig,
    cached: Option<(u64, Quadtree)>,
}

impl IndexedDrawing {
    pub fn new(drawing_id: DrawingId, config: QuadtreeConfig) -> Self {
        Self {
            drawing_id,
            config,
            cached: None,
        }
    }

    pub fn drawing_id(&self) -> &DrawingId {
        &self.drawing_id
    }

    /// 切换图纸，丢弃缓存
    pub fn set_drawing(&mut self, drawing_id: DrawingId) {
        if drawing_id != self.drawing_id {
            self.drawing_id = drawing_id;
            self.cached = None;
        }
    }

    /// 获取最新的索引，必要时重建
    pub fn index(&mut self, store: &dyn ShapeLookup) -> &Quadtree {
        let revision = store.revision();
        if !matches!(&self.cached, Some((rev, _)) if *rev == revision) {
            self.cached = None;
        }
        let (drawing_id, config) = (&self.drawing_id, self.config);
        let (_, tree) = self.cached.get_or_insert_with(|| {
            let tree = Quadtree::build(
                store.shapes().filter(|s| &s.drawing_id == drawing_id),
                config,
            );
            tracing::debug!(
                drawing = %drawing_id,
                revision,
                shapes = tree.len(),
                "rebuilt quadtree"
            );
            (revision, tree)
        });
        tree
    }

    /// 更换索引参数，丢弃缓存
    pub fn set_config(&mut self, config: QuadtreeConfig) {
        if config != self.config {
            self.config = config;
            self.cached = None;
        }
    }

    /// 使缓存失效
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Geometry, Line};
    use crate::shape::ShapeId;
    use crate::store::{MemoryStore, ShapeStore};

    fn bbox(x0: f64, y0: f64, x1: f64, y1: f64) -> BoundingBox2 {
        BoundingBox2::new(Point2::new(x0, y0), Point2::new(x1, y1))
    }

    #[test]
    fn test_query_region() {
        let mut index = Quadtree::new(bbox(-100.0, -100.0, 200.0, 200.0), QuadtreeConfig::default());

        index.insert("a".into(), bbox(0.0, 0.0, 5.0, 5.0));
        index.insert("b".into(), bbox(10.0, 10.0, 15.0, 15.0));
        index.insert("c".into(), bbox(100.0, 100.0, 105.0, 105.0));

        let result = index.query_region(&bbox(0.0, 0.0, 20.0, 20.0));

        assert_eq!(result.len(), 2);
        assert!(result.contains(&ShapeId::new("a")));
        assert!(result.contains(&ShapeId::new("b")));
        assert!(!result.contains(&ShapeId::new("c")));
    }

    #[test]
    fn test_query_point_with_tolerance() {
        let mut index = Quadtree::new(bbox(-100.0, -100.0, 100.0, 100.0), QuadtreeConfig::default());
        index.insert("a".into(), bbox(0.0, 0.0, 10.0, 10.0));

        assert!(index.query_point(&Point2::new(5.0, 5.0), 0.0).contains(&"a".into()));
        assert!(index.query_point(&Point2::new(10.5, 5.0), 1.0).contains(&"a".into()));
        assert!(index.query_point(&Point2::new(12.0, 5.0), 1.0).is_empty());
    }

    #[test]
    fn test_subdivision_and_stats() {
        let mut index = Quadtree::new(bbox(0.0, 0.0, 1000.0, 1000.0), QuadtreeConfig::default());
        for i in 0..200 {
            let x = (i % 20) as f64 * 50.0;
            let y = (i / 20) as f64 * 50.0;
            index.insert(ShapeId::new(format!("s{i}")), bbox(x + 1.0, y + 1.0, x + 4.0, y + 4.0));
        }
        let stats = index.stats();
        assert!(stats.total_nodes > 1);
        assert_eq!(stats.total_items, 200);
        assert!(stats.max_depth <= QuadtreeConfig::default().max_depth);

        let hits = index.query_point(&Point2::new(2.0, 2.0), 0.5);
        assert_eq!(hits, vec![ShapeId::new("s0")]);
    }

    #[test]
    fn test_coincident_shapes_respect_max_depth() {
        let config = QuadtreeConfig {
            max_items: 2,
            max_depth: 3,
        };
        let mut index = Quadtree::new(bbox(0.0, 0.0, 64.0, 64.0), config);
        for i in 0..50 {
            index.insert(ShapeId::new(format!("p{i}")), bbox(1.0, 1.0, 1.0, 1.0));
        }
        assert!(index.stats().max_depth <= 3);
        assert_eq!(index.query_point(&Point2::new(1.0, 1.0), 0.0).len(), 50);
    }

    #[test]
    fn test_entries_outside_root_are_found() {
        let mut index = Quadtree::new(bbox(0.0, 0.0, 10.0, 10.0), QuadtreeConfig::default());
        index.insert("far".into(), bbox(500.0, 500.0, 510.0, 510.0));
        assert!(index.query_point(&Point2::new(505.0, 505.0), 0.0).contains(&"far".into()));
    }

    #[test]
    fn test_indexed_drawing_rebuilds_on_revision() {
        let line = |id: &str, x: f64| {
            Shape::new(
                id,
                Geometry::Line(Line::new(Point2::new(x, 0.0), Point2::new(x + 1.0, 0.0))),
            )
        };
        let mut store = MemoryStore::from_shapes([
            line("a", 0.0),
            line("other", 0.0).in_drawing("sheet-1"),
        ])
        .unwrap();
        let mut cache = IndexedDrawing::new(DrawingId::default(), QuadtreeConfig::default());

        assert_eq!(cache.index(&store).len(), 1);
        store.add_shapes(vec![line("b", 50.0)]).unwrap();
        let hits = cache.index(&store).query_point(&Point2::new(50.5, 0.0), 0.1);
        assert_eq!(hits, vec![ShapeId::new("b")]);
    }
}
