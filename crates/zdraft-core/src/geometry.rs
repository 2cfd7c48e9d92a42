//! 几何图元定义
//!
//! 支持的基本图元：
//! - 点 (Point)
//! - 线段 (Line)
//! - 矩形 (Rectangle)
//! - 圆 (Circle)
//! - 圆弧 (Arc)
//! - 椭圆 (Ellipse)
//! - 多段线 (Polyline)
//! - 样条曲线 (Spline)
//! - 文本 (Text)
//! - 尺寸标注 (Dimension)
//! - 填充 (Hatch)

use crate::math::{
    closest_point_on_segment, distance_to_segment, midpoint, normalize_angle, BoundingBox2,
    Point2, Vector2, EPSILON, TAU,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

/// 曲线离散化的段数（圆、弧、椭圆）
pub const CURVE_SEGMENTS: usize = 32;

/// 几何类型枚举
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Geometry {
    Point(Point),
    Line(Line),
    Rectangle(Rectangle),
    Circle(Circle),
    Arc(Arc),
    Ellipse(Ellipse),
    Polyline(Polyline),
    Spline(Spline),
    Text(Text),
    Dimension(Dimension),
    Hatch(Hatch),
}

impl Geometry {
    /// 获取几何的包围盒
    pub fn bounding_box(&self) -> BoundingBox2 {
        match self {
            Geometry::Point(p) => p.bounding_box(),
            Geometry::Line(l) => l.bounding_box(),
            Geometry::Rectangle(r) => r.bounding_box(),
            Geometry::Circle(c) => c.bounding_box(),
            Geometry::Arc(a) => a.bounding_box(),
            Geometry::Ellipse(e) => e.bounding_box(),
            Geometry::Polyline(pl) => pl.bounding_box(),
            Geometry::Spline(s) => s.bounding_box(),
            Geometry::Text(t) => t.bounding_box(),
            Geometry::Dimension(d) => d.bounding_box(),
            Geometry::Hatch(h) => h.bounding_box(),
        }
    }

    /// 获取几何的类型名称
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::Line(_) => "Line",
            Geometry::Rectangle(_) => "Rectangle",
            Geometry::Circle(_) => "Circle",
            Geometry::Arc(_) => "Arc",
            Geometry::Ellipse(_) => "Ellipse",
            Geometry::Polyline(_) => "Polyline",
            Geometry::Spline(_) => "Spline",
            Geometry::Text(_) => "Text",
            Geometry::Dimension(_) => "Dimension",
            Geometry::Hatch(_) => "Hatch",
        }
    }

    /// 点到几何的最短距离（文本按包围盒计算）
    pub fn distance_to_point(&self, point: &Point2<f64>) -> f64 {
        match self {
            Geometry::Point(p) => (p.position - point).norm(),
            Geometry::Line(l) => l.distance_to_point(point),
            Geometry::Circle(c) => c.distance_to_point(point).abs(),
            Geometry::Arc(a) => a.distance_to_point(point),
            Geometry::Polyline(pl) => pl.distance_to_point(point),
            Geometry::Text(t) => box_distance(&t.bounding_box(), point),
            Geometry::Rectangle(_)
            | Geometry::Ellipse(_)
            | Geometry::Spline(_)
            | Geometry::Dimension(_)
            | Geometry::Hatch(_) => self
                .edges()
                .map(|edges| {
                    edges
                        .iter()
                        .map(|e| e.distance_to_point(point))
                        .fold(f64::MAX, f64::min)
                })
                .unwrap_or(f64::MAX),
        }
    }

    /// 检查点是否在几何上（考虑容差）
    pub fn contains_point(&self, point: &Point2<f64>, tolerance: f64) -> bool {
        self.distance_to_point(point) <= tolerance
    }

    /// 直线段分解（捕捉和追踪使用，不含曲线离散化）
    pub fn line_segments(&self) -> Vec<Line> {
        match self {
            Geometry::Line(l) => vec![l.clone()],
            Geometry::Rectangle(r) => r.edges().to_vec(),
            Geometry::Polyline(pl) => pl.straight_segments(),
            Geometry::Hatch(h) => closed_ring(&h.boundary),
            _ => vec![],
        }
    }

    /// 边分解（框选使用）
    ///
    /// 曲线按 [`CURVE_SEGMENTS`] 离散化；文本和点没有分解，返回 `None`，
    /// 调用方回退到包围盒判断。
    pub fn edges(&self) -> Option<Vec<Line>> {
        match self {
            Geometry::Point(_) | Geometry::Text(_) => None,
            Geometry::Line(l) => Some(vec![l.clone()]),
            Geometry::Rectangle(r) => Some(r.edges().to_vec()),
            Geometry::Circle(c) => Some(polygon_edges(&c.tessellate(), true)),
            Geometry::Arc(a) => Some(polygon_edges(&a.tessellate(), false)),
            Geometry::Ellipse(e) => Some(polygon_edges(&e.tessellate(), true)),
            Geometry::Polyline(pl) => Some(pl.tessellated_edges()),
            Geometry::Spline(s) => Some(polygon_edges(&s.control_points, s.closed)),
            Geometry::Dimension(d) => Some(d.edges()),
            Geometry::Hatch(h) => Some(closed_ring(&h.boundary)),
        }
    }
}

/// 点到包围盒的距离（盒内为 0）
fn box_distance(bbox: &BoundingBox2, point: &Point2<f64>) -> f64 {
    let dx = (bbox.min.x - point.x).max(0.0).max(point.x - bbox.max.x);
    let dy = (bbox.min.y - point.y).max(0.0).max(point.y - bbox.max.y);
    (dx * dx + dy * dy).sqrt()
}

fn polygon_edges(points: &[Point2<f64>], closed: bool) -> Vec<Line> {
    if points.len() < 2 {
        return points.iter().map(|p| Line::new(*p, *p)).collect();
    }
    let mut edges: Vec<Line> = points
        .windows(2)
        .map(|w| Line::new(w[0], w[1]))
        .collect();
    if closed {
        edges.push(Line::new(points[points.len() - 1], points[0]));
    }
    edges
}

fn closed_ring(points: &[Point2<f64>]) -> Vec<Line> {
    polygon_edges(points, points.len() > 2)
}

/// 点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub position: Point2<f64>,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            position: Point2::new(x, y),
        }
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::new(self.position, self.position)
    }
}

/// 线段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub start: Point2<f64>,
    pub end: Point2<f64>,
}

impl Line {
    pub fn new(start: Point2<f64>, end: Point2<f64>) -> Self {
        Self { start, end }
    }

    /// 计算线段长度
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    /// 计算线段方向向量（单位向量），零长度线段返回 `None`
    pub fn direction(&self) -> Option<Vector2<f64>> {
        let d = self.end - self.start;
        let len = d.norm();
        if len < EPSILON {
            None
        } else {
            Some(d / len)
        }
    }

    /// 计算线段中点
    pub fn midpoint(&self) -> Point2<f64> {
        midpoint(self.start, self.end)
    }

    /// 计算点到线段的距离
    pub fn distance_to_point(&self, point: &Point2<f64>) -> f64 {
        distance_to_segment(*point, self.start, self.end)
    }

    /// 线段上距离给定点最近的点
    pub fn closest_point(&self, point: &Point2<f64>) -> Point2<f64> {
        closest_point_on_segment(*point, self.start, self.end)
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::from_points([self.start, self.end])
    }
}

/// 矩形
///
/// `top_left` 是锚点角，宽度沿 `rotation` 方向展开，高度沿其左法向展开。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub top_left: Point2<f64>,
    pub width: f64,
    pub height: f64,
    /// 旋转角度（弧度）
    #[serde(default)]
    pub rotation: f64,
}

impl Rectangle {
    pub fn new(top_left: Point2<f64>, width: f64, height: f64) -> Self {
        Self {
            top_left,
            width,
            height,
            rotation: 0.0,
        }
    }

    /// 宽度方向和高度方向的单位向量
    pub fn axes(&self) -> (Vector2<f64>, Vector2<f64>) {
        let (sin, cos) = self.rotation.sin_cos();
        (Vector2::new(cos, sin), Vector2::new(-sin, cos))
    }

    /// 四个角点，按锚点开始逆时针排列
    pub fn corners(&self) -> [Point2<f64>; 4] {
        let (u, v) = self.axes();
        let p0 = self.top_left;
        let p1 = p0 + u * self.width;
        let p2 = p1 + v * self.height;
        let p3 = p0 + v * self.height;
        [p0, p1, p2, p3]
    }

    pub fn center(&self) -> Point2<f64> {
        let c = self.corners();
        midpoint(c[0], c[2])
    }

    pub fn edges(&self) -> [Line; 4] {
        let [p0, p1, p2, p3] = self.corners();
        [
            Line::new(p0, p1),
            Line::new(p1, p2),
            Line::new(p2, p3),
            Line::new(p3, p0),
        ]
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::from_points(self.corners())
    }
}

/// 圆
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point2<f64>,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Point2<f64>, radius: f64) -> Self {
        Self { center, radius }
    }

    /// 计算点到圆的距离（负值表示在圆内）
    pub fn distance_to_point(&self, point: &Point2<f64>) -> f64 {
        (point - self.center).norm() - self.radius
    }

    /// 获取圆上指定角度的点
    pub fn point_at_angle(&self, angle: f64) -> Point2<f64> {
        Point2::new(
            self.center.x + self.radius * angle.cos(),
            self.center.y + self.radius * angle.sin(),
        )
    }

    pub fn tessellate(&self) -> Vec<Point2<f64>> {
        (0..CURVE_SEGMENTS)
            .map(|i| self.point_at_angle(TAU * i as f64 / CURVE_SEGMENTS as f64))
            .collect()
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::new(
            Point2::new(self.center.x - self.radius, self.center.y - self.radius),
            Point2::new(self.center.x + self.radius, self.center.y + self.radius),
        )
    }
}

/// 圆弧（从起始角逆时针扫到终止角）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub center: Point2<f64>,
    pub radius: f64,
    /// 起始角度（弧度）
    pub start_angle: f64,
    /// 终止角度（弧度）
    pub end_angle: f64,
}

impl Arc {
    pub fn new(center: Point2<f64>, radius: f64, start_angle: f64, end_angle: f64) -> Self {
        Self {
            center,
            radius,
            start_angle,
            end_angle,
        }
    }

    /// 从三点创建圆弧（起点、弧上一点、终点）
    ///
    /// 三点共线（行列式接近零）时返回 `None`。
    pub fn from_three_points(p1: Point2<f64>, p2: Point2<f64>, p3: Point2<f64>) -> Option<Self> {
        let d = 2.0 * (p1.x * (p2.y - p3.y) + p2.x * (p3.y - p1.y) + p3.x * (p1.y - p2.y));

        if d.abs() < EPSILON {
            return None; // 三点共线
        }

        let s1 = p1.x * p1.x + p1.y * p1.y;
        let s2 = p2.x * p2.x + p2.y * p2.y;
        let s3 = p3.x * p3.x + p3.y * p3.y;
        let ux = (s1 * (p2.y - p3.y) + s2 * (p3.y - p1.y) + s3 * (p1.y - p2.y)) / d;
        let uy = (s1 * (p3.x - p2.x) + s2 * (p1.x - p3.x) + s3 * (p2.x - p1.x)) / d;

        let center = Point2::new(ux, uy);
        let radius = (p1 - center).norm();

        let a1 = (p1.y - center.y).atan2(p1.x - center.x);
        let a2 = (p2.y - center.y).atan2(p2.x - center.x);
        let a3 = (p3.y - center.y).atan2(p3.x - center.x);

        // 中间点必须落在弧上；否则方向是顺时针，交换起止角
        let ccw = Self::new(center, radius, a1, a3);
        if ccw.contains_angle(a2) {
            Some(ccw)
        } else {
            Some(Self::new(center, radius, a3, a1))
        }
    }

    /// 计算弧长
    pub fn length(&self) -> f64 {
        self.sweep_angle() * self.radius
    }

    /// 计算扫过的角度，范围 [0, 2π)
    pub fn sweep_angle(&self) -> f64 {
        normalize_angle(self.end_angle - self.start_angle)
    }

    pub fn point_at_angle(&self, angle: f64) -> Point2<f64> {
        Point2::new(
            self.center.x + self.radius * angle.cos(),
            self.center.y + self.radius * angle.sin(),
        )
    }

    /// 获取起点
    pub fn start_point(&self) -> Point2<f64> {
        self.point_at_angle(self.start_angle)
    }

    /// 获取终点
    pub fn end_point(&self) -> Point2<f64> {
        self.point_at_angle(self.end_angle)
    }

    /// 弧的中点
    pub fn mid_point(&self) -> Point2<f64> {
        self.point_at_angle(self.start_angle + self.sweep_angle() / 2.0)
    }

    /// 计算点到圆弧的距离
    pub fn distance_to_point(&self, point: &Point2<f64>) -> f64 {
        let angle = (point.y - self.center.y).atan2(point.x - self.center.x);

        if self.contains_angle(angle) {
            ((point - self.center).norm() - self.radius).abs()
        } else {
            // 返回到端点的最小距离
            let d1 = (point - self.start_point()).norm();
            let d2 = (point - self.end_point()).norm();
            d1.min(d2)
        }
    }

    /// 检查角度是否在弧的范围内
    pub fn contains_angle(&self, angle: f64) -> bool {
        let offset = normalize_angle(angle - self.start_angle);
        offset <= self.sweep_angle() + EPSILON || normalize_angle(angle - self.end_angle) < EPSILON
    }

    /// 检查点是否在弧的角度范围内
    pub fn contains_point_angle(&self, point: &Point2<f64>) -> bool {
        self.contains_angle((point.y - self.center.y).atan2(point.x - self.center.x))
    }

    pub fn tessellate(&self) -> Vec<Point2<f64>> {
        let sweep = self.sweep_angle();
        (0..=CURVE_SEGMENTS)
            .map(|i| self.point_at_angle(self.start_angle + sweep * i as f64 / CURVE_SEGMENTS as f64))
            .collect()
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        let mut bbox = BoundingBox2::from_points([self.start_point(), self.end_point()]);

        // 检查象限点
        for angle in [0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2] {
            if self.contains_angle(angle) {
                bbox.expand_to_include(&self.point_at_angle(angle));
            }
        }

        bbox
    }
}

/// 椭圆
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub center: Point2<f64>,
    pub radius_x: f64,
    pub radius_y: f64,
    /// 长轴旋转角度（弧度）
    #[serde(default)]
    pub rotation: f64,
}

impl Ellipse {
    pub fn new(center: Point2<f64>, radius_x: f64, radius_y: f64) -> Self {
        Self {
            center,
            radius_x,
            radius_y,
            rotation: 0.0,
        }
    }

    /// 参数 t 处的点
    pub fn point_at(&self, t: f64) -> Point2<f64> {
        let (sin_r, cos_r) = self.rotation.sin_cos();
        let x = self.radius_x * t.cos();
        let y = self.radius_y * t.sin();
        Point2::new(
            self.center.x + x * cos_r - y * sin_r,
            self.center.y + x * sin_r + y * cos_r,
        )
    }

    pub fn tessellate(&self) -> Vec<Point2<f64>> {
        (0..CURVE_SEGMENTS)
            .map(|i| self.point_at(TAU * i as f64 / CURVE_SEGMENTS as f64))
            .collect()
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        let (sin_r, cos_r) = self.rotation.sin_cos();
        let hw = ((self.radius_x * cos_r).powi(2) + (self.radius_y * sin_r).powi(2)).sqrt();
        let hh = ((self.radius_x * sin_r).powi(2) + (self.radius_y * cos_r).powi(2)).sqrt();
        BoundingBox2::new(
            Point2::new(self.center.x - hw, self.center.y - hh),
            Point2::new(self.center.x + hw, self.center.y + hh),
        )
    }
}

/// 多段线顶点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolylineVertex {
    pub point: Point2<f64>,
    /// 凸度（bulge）- 用于弧线段，0表示直线
    #[serde(default)]
    pub bulge: f64,
}

impl PolylineVertex {
    pub fn new(point: Point2<f64>) -> Self {
        Self { point, bulge: 0.0 }
    }

    pub fn with_bulge(point: Point2<f64>, bulge: f64) -> Self {
        Self { point, bulge }
    }
}

/// 多段线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub vertices: Vec<PolylineVertex>,
    /// 是否闭合
    #[serde(default)]
    pub closed: bool,
}

/// 多段线的一段
#[derive(Debug, Clone)]
pub enum PolylineSegment {
    Straight(Line),
    Curved(Arc),
}

impl Polyline {
    pub fn new(vertices: Vec<PolylineVertex>, closed: bool) -> Self {
        Self { vertices, closed }
    }

    /// 从点列表创建（所有顶点都是直线连接）
    pub fn from_points(points: impl IntoIterator<Item = Point2<f64>>, closed: bool) -> Self {
        Self {
            vertices: points.into_iter().map(PolylineVertex::new).collect(),
            closed,
        }
    }

    /// 线段数量
    pub fn segment_count(&self) -> usize {
        if self.vertices.len() < 2 {
            return 0;
        }
        if self.closed {
            self.vertices.len()
        } else {
            self.vertices.len() - 1
        }
    }

    /// 按顺序返回每一段（直线或圆弧）
    pub fn segments(&self) -> Vec<PolylineSegment> {
        (0..self.segment_count())
            .map(|i| {
                let v1 = &self.vertices[i];
                let v2 = &self.vertices[(i + 1) % self.vertices.len()];
                if v1.bulge.abs() < EPSILON {
                    PolylineSegment::Straight(Line::new(v1.point, v2.point))
                } else {
                    match Self::vertex_pair_to_arc(v1, v2) {
                        Some(arc) => PolylineSegment::Curved(arc),
                        None => PolylineSegment::Straight(Line::new(v1.point, v2.point)),
                    }
                }
            })
            .collect()
    }

    /// 只返回直线段
    pub fn straight_segments(&self) -> Vec<Line> {
        self.segments()
            .into_iter()
            .filter_map(|s| match s {
                PolylineSegment::Straight(line) => Some(line),
                PolylineSegment::Curved(_) => None,
            })
            .collect()
    }

    /// 所有段的边分解，弧段离散化
    pub fn tessellated_edges(&self) -> Vec<Line> {
        if self.vertices.len() == 1 {
            let p = self.vertices[0].point;
            return vec![Line::new(p, p)];
        }
        let mut edges = Vec::new();
        for segment in self.segments() {
            match segment {
                PolylineSegment::Straight(line) => edges.push(line),
                PolylineSegment::Curved(arc) => {
                    edges.extend(polygon_edges(&arc.tessellate(), false));
                }
            }
        }
        edges
    }

    /// 计算总长度
    pub fn length(&self) -> f64 {
        self.segments()
            .iter()
            .map(|s| match s {
                PolylineSegment::Straight(line) => line.length(),
                PolylineSegment::Curved(arc) => arc.length(),
            })
            .sum()
    }

    /// 计算点到多段线的距离
    pub fn distance_to_point(&self, point: &Point2<f64>) -> f64 {
        match self.vertices.len() {
            0 => f64::MAX,
            1 => (point - self.vertices[0].point).norm(),
            _ => self
                .segments()
                .iter()
                .map(|s| match s {
                    PolylineSegment::Straight(line) => line.distance_to_point(point),
                    PolylineSegment::Curved(arc) => arc.distance_to_point(point),
                })
                .fold(f64::MAX, f64::min),
        }
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        let mut bbox = BoundingBox2::from_points(self.vertices.iter().map(|v| v.point));
        for segment in self.segments() {
            if let PolylineSegment::Curved(arc) = segment {
                bbox = bbox.union(&arc.bounding_box());
            }
        }
        bbox
    }

    /// 爆炸为独立的线段/圆弧
    pub fn explode(&self) -> Vec<Geometry> {
        self.segments()
            .into_iter()
            .map(|s| match s {
                PolylineSegment::Straight(line) => Geometry::Line(line),
                PolylineSegment::Curved(arc) => Geometry::Arc(arc),
            })
            .collect()
    }

    /// 将顶点对转换为圆弧
    ///
    /// 正凸度为逆时针弧，负凸度为顺时针弧（返回的圆弧起止角互换，保持逆时针约定）。
    fn vertex_pair_to_arc(v1: &PolylineVertex, v2: &PolylineVertex) -> Option<Arc> {
        let chord = v2.point - v1.point;
        let chord_len = chord.norm();

        if chord_len < EPSILON {
            return None;
        }

        let bulge = v1.bulge;
        let s = chord_len / 2.0;
        let h = s * bulge.abs(); // 弧高

        let mid = midpoint(v1.point, v2.point);
        let radius = (s * s + h * h) / (2.0 * h);
        let d = radius - h; // 圆心到弦的距离（可为负，表示大弧）

        // 弦的左法向
        let left = Vector2::new(-chord.y, chord.x) / chord_len;
        let center = if bulge > 0.0 { mid + left * d } else { mid - left * d };

        let a1 = (v1.point.y - center.y).atan2(v1.point.x - center.x);
        let a2 = (v2.point.y - center.y).atan2(v2.point.x - center.x);

        if bulge > 0.0 {
            Some(Arc::new(center, radius, a1, a2))
        } else {
            Some(Arc::new(center, radius, a2, a1))
        }
    }
}

/// 样条曲线（以控制点表示，命中测试和框选使用控制多边形）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spline {
    pub control_points: Vec<Point2<f64>>,
    #[serde(default)]
    pub closed: bool,
}

impl Spline {
    pub fn new(control_points: Vec<Point2<f64>>, closed: bool) -> Self {
        Self {
            control_points,
            closed,
        }
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::from_points(self.control_points.iter().copied())
    }
}

/// 文本对齐方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TextAlignment {
    /// 左对齐（默认）
    #[default]
    Left,
    /// 居中对齐
    Center,
    /// 右对齐
    Right,
}

/// 文本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    /// 插入点
    pub position: Point2<f64>,
    /// 文本内容
    pub content: String,
    /// 文本高度
    pub height: f64,
    /// 旋转角度（弧度）
    #[serde(default)]
    pub rotation: f64,
    /// 对齐方式
    #[serde(default)]
    pub alignment: TextAlignment,
}

impl Text {
    /// 创建新的文本对象
    pub fn new(position: Point2<f64>, content: impl Into<String>, height: f64) -> Self {
        Self {
            position,
            content: content.into(),
            height,
            rotation: 0.0,
            alignment: TextAlignment::Left,
        }
    }

    /// 设置对齐方式
    pub fn with_alignment(mut self, alignment: TextAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// 估算文本宽度（简化计算，假设每个字符宽度约为高度的0.6倍，CJK字符为1倍）
    pub fn estimated_width(&self) -> f64 {
        let char_count = self.content.chars().count();
        let cjk_count = self.content.chars().filter(|c| Self::is_cjk(*c)).count();
        let ascii_count = char_count - cjk_count;

        (cjk_count as f64 * self.height) + (ascii_count as f64 * self.height * 0.6)
    }

    fn is_cjk(c: char) -> bool {
        matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}')
    }

    /// 文本框的四个角点（考虑对齐和旋转）
    pub fn corners(&self) -> [Point2<f64>; 4] {
        let width = self.estimated_width();
        let offset = match self.alignment {
            TextAlignment::Left => 0.0,
            TextAlignment::Center => -width / 2.0,
            TextAlignment::Right => -width,
        };
        let (sin_r, cos_r) = self.rotation.sin_cos();
        let local = [
            (offset, 0.0),
            (offset + width, 0.0),
            (offset + width, self.height),
            (offset, self.height),
        ];
        local.map(|(x, y)| {
            Point2::new(
                self.position.x + x * cos_r - y * sin_r,
                self.position.y + x * sin_r + y * cos_r,
            )
        })
    }

    /// 获取包围盒
    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::from_points(self.corners())
    }
}

/// 标注类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DimensionType {
    /// 对齐标注 (Aligned) - 默认
    #[default]
    Aligned,
    /// 线性标注 (Linear) - 水平或垂直
    Linear,
    /// 半径标注
    Radius,
    /// 直径标注
    Diameter,
}

/// 尺寸标注
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// 第一个测量点
    pub definition_point1: Point2<f64>,
    /// 第二个测量点
    pub definition_point2: Point2<f64>,
    /// 标注线位置点 (决定标注线的高度/距离)
    pub line_location: Point2<f64>,
    #[serde(default)]
    pub dim_type: DimensionType,
    /// 覆盖文本 (如果为空则显示测量值)
    #[serde(default)]
    pub text_override: Option<String>,
    pub text_height: f64,
    /// 文本位置 (如果为None，则自动计算默认位置)
    #[serde(default)]
    pub text_position: Option<Point2<f64>>,
}

impl Dimension {
    pub fn new(p1: Point2<f64>, p2: Point2<f64>, location: Point2<f64>) -> Self {
        Self {
            definition_point1: p1,
            definition_point2: p2,
            line_location: location,
            dim_type: DimensionType::Aligned,
            text_override: None,
            text_height: 10.0,
            text_position: None,
        }
    }

    /// 获取测量值
    pub fn measurement(&self) -> f64 {
        let d = self.definition_point2 - self.definition_point1;
        match self.dim_type {
            DimensionType::Aligned | DimensionType::Radius => d.norm(),
            DimensionType::Linear => d.x.abs().max(d.y.abs()),
            DimensionType::Diameter => d.norm() * 2.0,
        }
    }

    /// 标注线两端点（对齐/线性标注），径向标注为两定义点
    pub fn dimension_line(&self) -> Line {
        match self.dim_type {
            DimensionType::Aligned | DimensionType::Linear => {
                let chord = self.definition_point2 - self.definition_point1;
                let len = chord.norm();
                if len < EPSILON {
                    return Line::new(self.definition_point1, self.definition_point2);
                }
                let perp = Vector2::new(-chord.y, chord.x) / len;
                let offset = perp * (self.line_location - self.definition_point1).dot(&perp);
                Line::new(
                    self.definition_point1 + offset,
                    self.definition_point2 + offset,
                )
            }
            DimensionType::Radius | DimensionType::Diameter => {
                Line::new(self.definition_point1, self.definition_point2)
            }
        }
    }

    /// 标注的线条：两条尺寸界线和标注线
    pub fn edges(&self) -> Vec<Line> {
        let dim_line = self.dimension_line();
        match self.dim_type {
            DimensionType::Aligned | DimensionType::Linear => vec![
                Line::new(self.definition_point1, dim_line.start),
                Line::new(self.definition_point2, dim_line.end),
                dim_line,
            ],
            DimensionType::Radius | DimensionType::Diameter => {
                vec![dim_line, Line::new(self.definition_point2, self.line_location)]
            }
        }
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        let dim_line = self.dimension_line();
        let mut bbox = BoundingBox2::from_points([
            self.definition_point1,
            self.definition_point2,
            self.line_location,
            dim_line.start,
            dim_line.end,
        ]);
        if let Some(pos) = self.text_position {
            bbox.expand_to_include(&pos);
        }
        bbox
    }
}

/// 填充
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hatch {
    /// 边界多边形（隐式闭合）
    pub boundary: Vec<Point2<f64>>,
    /// 图案名称
    #[serde(default = "Hatch::default_pattern")]
    pub pattern: String,
    /// 图案角度（弧度）
    #[serde(default)]
    pub pattern_angle: f64,
    #[serde(default = "Hatch::default_scale")]
    pub pattern_scale: f64,
}

impl Hatch {
    pub fn new(boundary: Vec<Point2<f64>>) -> Self {
        Self {
            boundary,
            pattern: Self::default_pattern(),
            pattern_angle: 0.0,
            pattern_scale: Self::default_scale(),
        }
    }

    fn default_pattern() -> String {
        "SOLID".to_string()
    }

    fn default_scale() -> f64 {
        1.0
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::from_points(self.boundary.iter().copied())
    }
}
