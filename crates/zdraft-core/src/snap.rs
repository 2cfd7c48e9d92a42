//! 对象捕捉系统
//!
//! 实现 CAD 标准的对象捕捉功能。
//!
//! 支持的捕捉类型：
//! - 端点 (Endpoint)
//! - 中点 (Midpoint)
//! - 圆心 (Center)
//! - 象限点 (Quadrant)
//! - 交点 (Intersection)
//! - 垂足 (Perpendicular)
//! - 切点 (Tangent)
//! - 最近点 (Nearest)
//! - 网格点 (Grid)
//!
//! 最近点和网格点属于兜底类型：容差内存在其他类型的捕捉点时不参与竞争。

use crate::geometry::{Arc, Circle, Ellipse, Geometry, Line, Polyline, PolylineSegment};
use crate::math::{BoundingBox2, Point2, Vector2, EPSILON};
use crate::shape::{Shape, ShapeId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::f64::consts::{FRAC_PI_2, PI};

const QUADRANT_ANGLES: [f64; 4] = [0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2];

/// 捕捉类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapType {
    /// 端点捕捉
    Endpoint,
    /// 中点捕捉
    Midpoint,
    /// 圆心捕捉
    Center,
    /// 交点捕捉
    Intersection,
    /// 垂足捕捉
    Perpendicular,
    /// 切点捕捉
    Tangent,
    /// 最近点捕捉
    Nearest,
    /// 网格点捕捉
    Grid,
    /// 象限点（圆/弧的0°, 90°, 180°, 270°位置）
    Quadrant,
}

impl SnapType {
    pub const ALL: [SnapType; 9] = [
        SnapType::Endpoint,
        SnapType::Midpoint,
        SnapType::Center,
        SnapType::Intersection,
        SnapType::Perpendicular,
        SnapType::Tangent,
        SnapType::Nearest,
        SnapType::Grid,
        SnapType::Quadrant,
    ];

    /// 获取捕捉类型的名称
    pub fn name(&self) -> &'static str {
        match self {
            SnapType::Endpoint => "端点",
            SnapType::Midpoint => "中点",
            SnapType::Center => "圆心",
            SnapType::Intersection => "交点",
            SnapType::Perpendicular => "垂足",
            SnapType::Tangent => "切点",
            SnapType::Nearest => "最近点",
            SnapType::Grid => "网格点",
            SnapType::Quadrant => "象限点",
        }
    }

    /// 获取捕捉类型的快捷键
    pub fn shortcut(&self) -> &'static str {
        match self {
            SnapType::Endpoint => "END",
            SnapType::Midpoint => "MID",
            SnapType::Center => "CEN",
            SnapType::Intersection => "INT",
            SnapType::Perpendicular => "PER",
            SnapType::Tangent => "TAN",
            SnapType::Nearest => "NEA",
            SnapType::Grid => "GRI",
            SnapType::Quadrant => "QUA",
        }
    }

    /// 从快捷键解析（不区分大小写）
    pub fn from_shortcut(s: &str) -> Option<SnapType> {
        let upper = s.trim().to_uppercase();
        Self::ALL.into_iter().find(|t| t.shortcut() == upper)
    }

    /// 兜底类型只在没有其他捕捉点时生效
    pub fn is_fallback(&self) -> bool {
        matches!(self, SnapType::Nearest | SnapType::Grid)
    }

    fn bit(&self) -> u16 {
        match self {
            SnapType::Endpoint => SnapMask::ENDPOINT,
            SnapType::Midpoint => SnapMask::MIDPOINT,
            SnapType::Center => SnapMask::CENTER,
            SnapType::Intersection => SnapMask::INTERSECTION,
            SnapType::Perpendicular => SnapMask::PERPENDICULAR,
            SnapType::Tangent => SnapMask::TANGENT,
            SnapType::Nearest => SnapMask::NEAREST,
            SnapType::Grid => SnapMask::GRID,
            SnapType::Quadrant => SnapMask::QUADRANT,
        }
    }
}

/// 捕捉点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapPoint {
    /// 捕捉到的世界坐标
    pub point: Point2<f64>,
    /// 捕捉类型
    pub snap_type: SnapType,
    /// 来源图形（交点和网格点没有单一来源）
    pub source_shape_id: Option<ShapeId>,
    /// 到光标的世界距离（用于排序）
    pub distance: f64,
}

impl SnapPoint {
    pub fn new(
        point: Point2<f64>,
        snap_type: SnapType,
        source_shape_id: Option<ShapeId>,
        distance: f64,
    ) -> Self {
        Self {
            point,
            snap_type,
            source_shape_id,
            distance,
        }
    }
}

/// 捕捉配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// 对象捕捉总开关
    pub enabled: bool,
    /// 捕捉容差（屏幕像素）
    pub tolerance: f64,
    /// 启用的捕捉类型
    pub enabled_types: SnapMask,
    /// 网格间距
    pub grid_spacing: f64,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tolerance: 10.0, // 10像素
            enabled_types: SnapMask::default(),
            grid_spacing: 10.0,
        }
    }
}

/// 捕捉掩码（位域，用于快速启用/禁用捕捉类型）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapMask {
    bits: u16,
}

impl SnapMask {
    pub const ENDPOINT: u16 = 1 << 0;
    pub const MIDPOINT: u16 = 1 << 1;
    pub const CENTER: u16 = 1 << 2;
    pub const INTERSECTION: u16 = 1 << 3;
    pub const PERPENDICULAR: u16 = 1 << 4;
    pub const TANGENT: u16 = 1 << 5;
    pub const NEAREST: u16 = 1 << 6;
    pub const GRID: u16 = 1 << 7;
    pub const QUADRANT: u16 = 1 << 8;

    pub const NONE: SnapMask = SnapMask { bits: 0 };
    pub const ALL: SnapMask = SnapMask { bits: 0x01FF };

    pub fn new(bits: u16) -> Self {
        Self { bits }
    }

    pub fn from_types(types: &[SnapType]) -> Self {
        let mut mask = Self::NONE;
        for t in types {
            mask.set(*t, true);
        }
        mask
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    pub fn is_enabled(&self, snap_type: SnapType) -> bool {
        self.bits & snap_type.bit() != 0
    }

    pub fn set(&mut self, snap_type: SnapType, enabled: bool) {
        let bit = snap_type.bit();
        if enabled {
            self.bits |= bit;
        } else {
            self.bits &= !bit;
        }
    }

    pub fn toggle(&mut self, snap_type: SnapType) {
        let enabled = self.is_enabled(snap_type);
        self.set(snap_type, !enabled);
    }
}

impl Default for SnapMask {
    fn default() -> Self {
        // 默认启用常用的捕捉类型
        Self {
            bits: Self::ENDPOINT
                | Self::MIDPOINT
                | Self::CENTER
                | Self::INTERSECTION
                | Self::PERPENDICULAR,
        }
    }
}

/// 求交用的基本曲线片段
#[derive(Debug, Clone)]
enum Piece {
    Segment(Line),
    Circle(Circle),
    Arc(Arc),
}

impl Piece {
    fn from_polyline(polyline: &Polyline, out: &mut Vec<Piece>) {
        for seg in polyline.segments() {
            out.push(match seg {
                PolylineSegment::Straight(line) => Piece::Segment(line),
                PolylineSegment::Curved(arc) => Piece::Arc(arc),
            });
        }
    }

    /// 几何分解为可求交片段；椭圆和样条不参与交点捕捉
    fn decompose(geometry: &Geometry) -> Vec<Piece> {
        let mut out = Vec::new();
        match geometry {
            Geometry::Line(l) => out.push(Piece::Segment(l.clone())),
            Geometry::Circle(c) => out.push(Piece::Circle(c.clone())),
            Geometry::Arc(a) => out.push(Piece::Arc(a.clone())),
            Geometry::Polyline(pl) => Self::from_polyline(pl, &mut out),
            Geometry::Rectangle(_) | Geometry::Hatch(_) => {
                out.extend(geometry.line_segments().into_iter().map(Piece::Segment));
            }
            Geometry::Dimension(d) => out.extend(d.edges().into_iter().map(Piece::Segment)),
            Geometry::Point(_)
            | Geometry::Ellipse(_)
            | Geometry::Spline(_)
            | Geometry::Text(_) => {}
        }
        out
    }
}

/// 捕捉引擎
///
/// 负责计算和管理对象捕捉
#[derive(Debug, Clone)]
pub struct SnapEngine {
    config: SnapConfig,
    /// 缓存的候选捕捉点
    candidates: Vec<SnapPoint>,
}

impl SnapEngine {
    pub fn new(config: SnapConfig) -> Self {
        Self {
            config,
            candidates: Vec::with_capacity(64),
        }
    }

    /// 获取配置
    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    /// 获取配置（可变）
    pub fn config_mut(&mut self) -> &mut SnapConfig {
        &mut self.config
    }

    /// 本次查询收集到的候选点
    pub fn candidates(&self) -> &[SnapPoint] {
        &self.candidates
    }

    /// 寻找最佳捕捉点
    ///
    /// # 参数
    /// - `cursor`: 待修正点的世界坐标
    /// - `shapes`: 要搜索的图形列表
    /// - `tolerance`: 世界坐标容差
    /// - `reference_point`: 参考点（用于垂足、切点等计算）
    pub fn find_snap_point(
        &mut self,
        cursor: Point2<f64>,
        shapes: &[&Shape],
        tolerance: f64,
        reference_point: Option<Point2<f64>>,
    ) -> Option<SnapPoint> {
        self.candidates.clear();

        if !self.config.enabled {
            return None;
        }

        // 1. 网格捕捉
        if self.config.enabled_types.is_enabled(SnapType::Grid) {
            if let Some(snap) = self.snap_to_grid(cursor, tolerance) {
                self.candidates.push(snap);
            }
        }

        // 2. 收集附近图形的捕捉点
        let search = BoundingBox2::new(cursor, cursor).expanded(tolerance);
        let nearby: Vec<&Shape> = shapes
            .iter()
            .copied()
            .filter(|s| s.visible && s.geometry.bounding_box().expanded(tolerance).intersects(&search))
            .collect();

        // 圆弧圆心可能落在包围盒之外，逐个图形收集时不做包围盒裁剪
        for shape in shapes.iter().filter(|s| s.visible) {
            self.collect_shape_snap_points(shape, cursor, tolerance, reference_point);
        }

        // 3. 交点捕捉（需要成对的图形）
        if self.config.enabled_types.is_enabled(SnapType::Intersection) {
            self.collect_intersection_points(&nearby, cursor, tolerance);
        }

        // 4. 找到最近的捕捉点，兜底类型最后考虑
        let best = |fallback: bool| {
            self.candidates
                .iter()
                .filter(|p| p.distance <= tolerance && p.snap_type.is_fallback() == fallback)
                .min_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal))
                .cloned()
        };
        let result = best(false).or_else(|| best(true));
        if let Some(snap) = &result {
            tracing::trace!(
                snap_type = ?snap.snap_type,
                x = snap.point.x,
                y = snap.point.y,
                "object snap"
            );
        }
        result
    }

    fn offer(
        &mut self,
        point: Point2<f64>,
        snap_type: SnapType,
        shape_id: Option<&ShapeId>,
        cursor: Point2<f64>,
        tolerance: f64,
    ) {
        if !self.config.enabled_types.is_enabled(snap_type) {
            return;
        }
        let dist = (point - cursor).norm();
        if dist <= tolerance {
            self.candidates
                .push(SnapPoint::new(point, snap_type, shape_id.cloned(), dist));
        }
    }

    /// 收集单个图形的捕捉点
    fn collect_shape_snap_points(
        &mut self,
        shape: &Shape,
        cursor: Point2<f64>,
        tolerance: f64,
        reference_point: Option<Point2<f64>>,
    ) {
        let id = &shape.id;
        match &shape.geometry {
            Geometry::Point(p) => {
                self.offer(p.position, SnapType::Endpoint, Some(id), cursor, tolerance);
            }
            Geometry::Line(line) => {
                self.collect_line_snap_points(line, id, cursor, tolerance, reference_point, true);
            }
            Geometry::Rectangle(rect) => {
                for edge in rect.edges() {
                    self.collect_line_snap_points(&edge, id, cursor, tolerance, reference_point, false);
                }
                for corner in rect.corners() {
                    self.offer(corner, SnapType::Endpoint, Some(id), cursor, tolerance);
                }
                self.offer(rect.center(), SnapType::Center, Some(id), cursor, tolerance);
            }
            Geometry::Circle(circle) => {
                self.collect_circle_snap_points(circle, id, cursor, tolerance, reference_point);
            }
            Geometry::Arc(arc) => {
                self.collect_arc_snap_points(arc, id, cursor, tolerance, reference_point);
            }
            Geometry::Ellipse(ellipse) => {
                self.collect_ellipse_snap_points(ellipse, id, cursor, tolerance);
                self.collect_nearest_on_edges(&shape.geometry, id, cursor, tolerance);
            }
            Geometry::Polyline(polyline) => {
                self.collect_polyline_snap_points(polyline, id, cursor, tolerance, reference_point);
            }
            Geometry::Spline(spline) => {
                // 样条只捕捉首末控制点，最近点按控制多边形计算
                if let (Some(first), Some(last)) =
                    (spline.control_points.first(), spline.control_points.last())
                {
                    self.offer(*first, SnapType::Endpoint, Some(id), cursor, tolerance);
                    self.offer(*last, SnapType::Endpoint, Some(id), cursor, tolerance);
                }
                self.collect_nearest_on_edges(&shape.geometry, id, cursor, tolerance);
            }
            Geometry::Text(text) => {
                // 文本只捕捉插入点
                self.offer(text.position, SnapType::Endpoint, Some(id), cursor, tolerance);
            }
            Geometry::Dimension(dim) => {
                // 标注捕捉定义点
                for pt in [dim.definition_point1, dim.definition_point2] {
                    self.offer(pt, SnapType::Endpoint, Some(id), cursor, tolerance);
                }
            }
            Geometry::Hatch(hatch) => {
                for pt in &hatch.boundary {
                    self.offer(*pt, SnapType::Endpoint, Some(id), cursor, tolerance);
                }
            }
        }
    }

    /// 线段的捕捉点
    fn collect_line_snap_points(
        &mut self,
        line: &Line,
        shape_id: &ShapeId,
        cursor: Point2<f64>,
        tolerance: f64,
        reference_point: Option<Point2<f64>>,
        with_endpoints: bool,
    ) {
        let id = Some(shape_id);

        // 端点
        if with_endpoints {
            self.offer(line.start, SnapType::Endpoint, id, cursor, tolerance);
            self.offer(line.end, SnapType::Endpoint, id, cursor, tolerance);
        }

        // 中点
        self.offer(line.midpoint(), SnapType::Midpoint, id, cursor, tolerance);

        // 垂足
        if let Some(ref_point) = reference_point {
            if let Some(perp) = perpendicular_to_line(line, ref_point) {
                self.offer(perp, SnapType::Perpendicular, id, cursor, tolerance);
            }
        }

        // 最近点
        self.offer(line.closest_point(&cursor), SnapType::Nearest, id, cursor, tolerance);
    }

    /// 圆的捕捉点
    fn collect_circle_snap_points(
        &mut self,
        circle: &Circle,
        shape_id: &ShapeId,
        cursor: Point2<f64>,
        tolerance: f64,
        reference_point: Option<Point2<f64>>,
    ) {
        let id = Some(shape_id);

        // 圆心
        self.offer(circle.center, SnapType::Center, id, cursor, tolerance);

        // 象限点
        for angle in QUADRANT_ANGLES {
            self.offer(circle.point_at_angle(angle), SnapType::Quadrant, id, cursor, tolerance);
        }

        if let Some(ref_point) = reference_point {
            // 切点
            for tangent in tangent_points_to_circle(circle.center, circle.radius, ref_point) {
                self.offer(tangent, SnapType::Tangent, id, cursor, tolerance);
            }
            // 垂足（参考点与圆心连线和圆的两个交点）
            for perp in radial_points(circle.center, circle.radius, ref_point) {
                self.offer(perp, SnapType::Perpendicular, id, cursor, tolerance);
            }
        }

        // 最近点（圆上）
        if let Some(nearest) = radial_points(circle.center, circle.radius, cursor).first() {
            self.offer(*nearest, SnapType::Nearest, id, cursor, tolerance);
        }
    }

    /// 圆弧的捕捉点
    fn collect_arc_snap_points(
        &mut self,
        arc: &Arc,
        shape_id: &ShapeId,
        cursor: Point2<f64>,
        tolerance: f64,
        reference_point: Option<Point2<f64>>,
    ) {
        let id = Some(shape_id);

        // 端点
        self.offer(arc.start_point(), SnapType::Endpoint, id, cursor, tolerance);
        self.offer(arc.end_point(), SnapType::Endpoint, id, cursor, tolerance);

        // 圆心
        self.offer(arc.center, SnapType::Center, id, cursor, tolerance);

        // 中点（弧的中点）
        self.offer(arc.mid_point(), SnapType::Midpoint, id, cursor, tolerance);

        // 落在弧上的象限点
        for angle in QUADRANT_ANGLES {
            if arc.contains_angle(angle) {
                self.offer(arc.point_at_angle(angle), SnapType::Quadrant, id, cursor, tolerance);
            }
        }

        if let Some(ref_point) = reference_point {
            for tangent in tangent_points_to_circle(arc.center, arc.radius, ref_point) {
                if arc.contains_point_angle(&tangent) {
                    self.offer(tangent, SnapType::Tangent, id, cursor, tolerance);
                }
            }
            for perp in radial_points(arc.center, arc.radius, ref_point) {
                if arc.contains_point_angle(&perp) {
                    self.offer(perp, SnapType::Perpendicular, id, cursor, tolerance);
                }
            }
        }

        if let Some(nearest) = radial_points(arc.center, arc.radius, cursor).first() {
            if arc.contains_point_angle(nearest) {
                self.offer(*nearest, SnapType::Nearest, id, cursor, tolerance);
            }
        }
    }

    /// 椭圆的捕捉点
    fn collect_ellipse_snap_points(
        &mut self,
        ellipse: &Ellipse,
        shape_id: &ShapeId,
        cursor: Point2<f64>,
        tolerance: f64,
    ) {
        let id = Some(shape_id);
        self.offer(ellipse.center, SnapType::Center, id, cursor, tolerance);
        for angle in QUADRANT_ANGLES {
            self.offer(ellipse.point_at(angle), SnapType::Quadrant, id, cursor, tolerance);
        }
    }

    /// 多段线的捕捉点
    fn collect_polyline_snap_points(
        &mut self,
        polyline: &Polyline,
        shape_id: &ShapeId,
        cursor: Point2<f64>,
        tolerance: f64,
        reference_point: Option<Point2<f64>>,
    ) {
        // 顶点（端点）
        for vertex in &polyline.vertices {
            self.offer(vertex.point, SnapType::Endpoint, Some(shape_id), cursor, tolerance);
        }

        for segment in polyline.segments() {
            match segment {
                PolylineSegment::Straight(line) => {
                    self.collect_line_snap_points(
                        &line,
                        shape_id,
                        cursor,
                        tolerance,
                        reference_point,
                        false,
                    );
                }
                PolylineSegment::Curved(arc) => {
                    let id = Some(shape_id);
                    self.offer(arc.mid_point(), SnapType::Midpoint, id, cursor, tolerance);
                    self.offer(arc.center, SnapType::Center, id, cursor, tolerance);
                    if let Some(nearest) = radial_points(arc.center, arc.radius, cursor).first() {
                        if arc.contains_point_angle(nearest) {
                            self.offer(*nearest, SnapType::Nearest, id, cursor, tolerance);
                        }
                    }
                }
            }
        }
    }

    /// 按边分解计算最近点
    fn collect_nearest_on_edges(
        &mut self,
        geometry: &Geometry,
        shape_id: &ShapeId,
        cursor: Point2<f64>,
        tolerance: f64,
    ) {
        if !self.config.enabled_types.is_enabled(SnapType::Nearest) {
            return;
        }
        let nearest = geometry.edges().and_then(|edges| {
            edges
                .iter()
                .map(|e| e.closest_point(&cursor))
                .min_by(|a, b| {
                    (a - cursor)
                        .norm()
                        .partial_cmp(&(b - cursor).norm())
                        .unwrap_or(Ordering::Equal)
                })
        });
        if let Some(p) = nearest {
            self.offer(p, SnapType::Nearest, Some(shape_id), cursor, tolerance);
        }
    }

    /// 收集交点
    fn collect_intersection_points(&mut self, shapes: &[&Shape], cursor: Point2<f64>, tolerance: f64) {
        let pieces: Vec<Vec<Piece>> = shapes.iter().map(|s| Piece::decompose(&s.geometry)).collect();

        // 双重循环检查所有图形对
        for i in 0..pieces.len() {
            for j in (i + 1)..pieces.len() {
                for a in &pieces[i] {
                    for b in &pieces[j] {
                        for point in find_intersections(a, b) {
                            // 交点涉及两个图形，没有单一来源
                            self.offer(point, SnapType::Intersection, None, cursor, tolerance);
                        }
                    }
                }
            }
        }
    }

    /// 网格捕捉
    fn snap_to_grid(&self, cursor: Point2<f64>, tolerance: f64) -> Option<SnapPoint> {
        let spacing = self.config.grid_spacing;
        if !(spacing.is_finite() && spacing > EPSILON) {
            return None;
        }

        let grid_x = (cursor.x / spacing).round() * spacing;
        let grid_y = (cursor.y / spacing).round() * spacing;
        let grid_point = Point2::new(grid_x, grid_y);

        let dist = (grid_point - cursor).norm();
        if dist <= tolerance {
            Some(SnapPoint::new(grid_point, SnapType::Grid, None, dist))
        } else {
            None
        }
    }
}

impl Default for SnapEngine {
    fn default() -> Self {
        Self::new(SnapConfig::default())
    }
}

// ========== 几何计算辅助函数 ==========

/// 计算从参考点到线段的垂足（垂足必须在线段上）
pub fn perpendicular_to_line(line: &Line, ref_point: Point2<f64>) -> Option<Point2<f64>> {
    let v = line.end - line.start;
    let w = ref_point - line.start;

    let c1 = w.dot(&v);
    let c2 = v.dot(&v);

    if c2 < EPSILON {
        return None;
    }

    let b = c1 / c2;
    if (0.0..=1.0).contains(&b) {
        Some(line.start + v * b)
    } else {
        None
    }
}

/// 过圆心与给定点的直线和圆的交点，靠近给定点的在前
fn radial_points(center: Point2<f64>, radius: f64, point: Point2<f64>) -> Vec<Point2<f64>> {
    let d = point - center;
    let len = d.norm();
    if len < EPSILON {
        return vec![];
    }
    let dir = d / len;
    vec![center + dir * radius, center - dir * radius]
}

/// 计算从点到圆的切点
pub fn tangent_points_to_circle(
    center: Point2<f64>,
    radius: f64,
    point: Point2<f64>,
) -> Vec<Point2<f64>> {
    let d = (point - center).norm();

    // 点在圆内，没有切点
    if d <= radius || d < EPSILON {
        return vec![];
    }

    // 切点相对连线的夹角
    let angle = (radius / d).acos();
    let base_angle = (point.y - center.y).atan2(point.x - center.x);

    [base_angle + angle, base_angle - angle]
        .into_iter()
        .map(|a| Point2::new(center.x + radius * a.cos(), center.y + radius * a.sin()))
        .collect()
}

/// 计算两个片段的交点
fn find_intersections(a: &Piece, b: &Piece) -> Vec<Point2<f64>> {
    match (a, b) {
        (Piece::Segment(l1), Piece::Segment(l2)) => {
            line_line_intersection(l1, l2).into_iter().collect()
        }
        (Piece::Segment(line), Piece::Circle(circle))
        | (Piece::Circle(circle), Piece::Segment(line)) => {
            line_circle_intersection(line, circle.center, circle.radius)
        }
        (Piece::Segment(line), Piece::Arc(arc)) | (Piece::Arc(arc), Piece::Segment(line)) => {
            line_circle_intersection(line, arc.center, arc.radius)
                .into_iter()
                .filter(|p| arc.contains_point_angle(p))
                .collect()
        }
        (Piece::Circle(c1), Piece::Circle(c2)) => {
            circle_circle_intersection(c1.center, c1.radius, c2.center, c2.radius)
        }
        (Piece::Circle(circle), Piece::Arc(arc)) | (Piece::Arc(arc), Piece::Circle(circle)) => {
            circle_circle_intersection(circle.center, circle.radius, arc.center, arc.radius)
                .into_iter()
                .filter(|p| arc.contains_point_angle(p))
                .collect()
        }
        (Piece::Arc(a1), Piece::Arc(a2)) => {
            circle_circle_intersection(a1.center, a1.radius, a2.center, a2.radius)
                .into_iter()
                .filter(|p| a1.contains_point_angle(p) && a2.contains_point_angle(p))
                .collect()
        }
    }
}

/// 线段-线段交点
pub fn line_line_intersection(l1: &Line, l2: &Line) -> Option<Point2<f64>> {
    let d1 = l1.end - l1.start;
    let d2 = l2.end - l2.start;

    let cross = d1.x * d2.y - d1.y * d2.x;

    // 平行
    if cross.abs() < EPSILON {
        return None;
    }

    let d = l2.start - l1.start;
    let t1 = (d.x * d2.y - d.y * d2.x) / cross;
    let t2 = (d.x * d1.y - d.y * d1.x) / cross;

    // 检查交点是否在两条线段上
    if (0.0..=1.0).contains(&t1) && (0.0..=1.0).contains(&t2) {
        Some(l1.start + d1 * t1)
    } else {
        None
    }
}

/// 线段-圆交点
fn line_circle_intersection(line: &Line, center: Point2<f64>, radius: f64) -> Vec<Point2<f64>> {
    let d = line.end - line.start;
    let f = line.start - center;

    let a = d.dot(&d);
    if a < EPSILON {
        return vec![];
    }
    let b = 2.0 * f.dot(&d);
    let c = f.dot(&f) - radius * radius;

    let discriminant = b * b - 4.0 * a * c;

    if discriminant < 0.0 {
        return vec![];
    }

    let ts = if discriminant.abs() < EPSILON {
        // 一个交点（相切）
        vec![-b / (2.0 * a)]
    } else {
        // 两个交点
        let sqrt_disc = discriminant.sqrt();
        vec![(-b - sqrt_disc) / (2.0 * a), (-b + sqrt_disc) / (2.0 * a)]
    };

    ts.into_iter()
        .filter(|t| (0.0..=1.0).contains(t))
        .map(|t| line.start + d * t)
        .collect()
}

/// 圆-圆交点
fn circle_circle_intersection(
    c1: Point2<f64>,
    r1: f64,
    c2: Point2<f64>,
    r2: f64,
) -> Vec<Point2<f64>> {
    let d = (c2 - c1).norm();

    // 不相交情况
    if d > r1 + r2 || d < (r1 - r2).abs() || d < EPSILON {
        return vec![];
    }

    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h = (r1 * r1 - a * a).max(0.0).sqrt();

    let dir = (c2 - c1) / d;
    let p = c1 + dir * a;
    let perp = Vector2::new(-dir.y, dir.x);

    if h < EPSILON {
        // 一个交点（相切）
        vec![p]
    } else {
        // 两个交点
        vec![p + perp * h, p - perp * h]
    }
}
