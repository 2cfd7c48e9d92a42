//! 图形实体
//!
//! `Shape` = 唯一标识 + 归属（图层、图纸）+ 显示属性 + 几何数据。
//! ID 一旦分配即不可变，由可注入的 [`IdGenerator`] 生成。

use crate::error::GeometryError;
use crate::geometry::Geometry;
use crate::math::{Point2, Vector2, EPSILON};
use crate::transform::Transform2D;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// 图形ID
    ShapeId
);
string_id!(
    /// 图层ID
    LayerId
);
string_id!(
    /// 图纸ID
    DrawingId
);

impl Default for LayerId {
    fn default() -> Self {
        Self::new("0")
    }
}

impl Default for DrawingId {
    fn default() -> Self {
        Self::new("model")
    }
}

/// 线型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LineType {
    #[default]
    Continuous,
    Dashed,
    Dotted,
    DashDot,
}

/// 显示样式（变换时保持不变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// 颜色（#RRGGBB）
    pub color: String,
    #[serde(default)]
    pub line_type: LineType,
    /// 线宽（毫米）
    #[serde(default = "Style::default_weight")]
    pub line_weight: f64,
}

impl Style {
    fn default_weight() -> f64 {
        0.25
    }
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: "#ffffff".to_string(),
            line_type: LineType::Continuous,
            line_weight: Self::default_weight(),
        }
    }
}

/// 图形
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    #[serde(default)]
    pub layer_id: LayerId,
    #[serde(default)]
    pub drawing_id: DrawingId,
    #[serde(default)]
    pub style: Style,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    pub geometry: Geometry,
}

fn default_true() -> bool {
    true
}

impl Shape {
    /// 在默认图层和模型空间中创建图形
    pub fn new(id: impl Into<ShapeId>, geometry: Geometry) -> Self {
        Self {
            id: id.into(),
            layer_id: LayerId::default(),
            drawing_id: DrawingId::default(),
            style: Style::default(),
            visible: true,
            locked: false,
            geometry,
        }
    }

    pub fn on_layer(mut self, layer_id: impl Into<LayerId>) -> Self {
        self.layer_id = layer_id.into();
        self
    }

    pub fn in_drawing(mut self, drawing_id: impl Into<DrawingId>) -> Self {
        self.drawing_id = drawing_id.into();
        self
    }

    /// 是否可以被选择和编辑
    pub fn is_editable(&self) -> bool {
        self.visible && !self.locked
    }

    /// 返回应用变换后的副本（ID 不变）
    pub fn transformed(&self, transform: &Transform2D) -> Shape {
        Shape {
            geometry: transform.apply(&self.geometry),
            ..self.clone()
        }
    }

    /// 深拷贝并分配新 ID，可选平移
    pub fn clone_with(&self, ids: &mut dyn IdGenerator, offset: Option<Vector2<f64>>) -> Shape {
        let geometry = match offset {
            Some(v) => Transform2D::Translate(v).apply(&self.geometry),
            None => self.geometry.clone(),
        };
        Shape {
            id: ids.next_id(),
            geometry,
            ..self.clone()
        }
    }

    /// 检查几何数据是否满足不变量
    pub fn validate(&self) -> Result<(), GeometryError> {
        validate_geometry(&self.geometry)
    }
}

fn validate_geometry(geometry: &Geometry) -> Result<(), GeometryError> {
    let name = geometry.type_name();

    match geometry {
        Geometry::Point(p) => check_finite(name, [p.position]),
        Geometry::Line(l) => check_finite(name, [l.start, l.end]),
        Geometry::Rectangle(r) => {
            if r.width < 0.0 || r.height < 0.0 {
                return Err(GeometryError::NegativeSize(name));
            }
            check_finite(name, [r.top_left])
        }
        Geometry::Circle(c) => {
            if c.radius < 0.0 {
                return Err(GeometryError::NegativeRadius(c.radius));
            }
            check_finite(name, [c.center])
        }
        Geometry::Arc(a) => {
            if a.radius < 0.0 {
                return Err(GeometryError::NegativeRadius(a.radius));
            }
            check_finite(name, [a.center])
        }
        Geometry::Ellipse(e) => {
            if e.radius_x < 0.0 || e.radius_y < 0.0 {
                return Err(GeometryError::NegativeRadius(e.radius_x.min(e.radius_y)));
            }
            check_finite(name, [e.center])
        }
        Geometry::Polyline(pl) => {
            if pl.vertices.is_empty() {
                return Err(GeometryError::EmptyPoints(name));
            }
            check_finite(name, pl.vertices.iter().map(|v| v.point))
        }
        Geometry::Spline(s) => {
            if s.control_points.is_empty() {
                return Err(GeometryError::EmptyPoints(name));
            }
            check_finite(name, s.control_points.iter().copied())
        }
        Geometry::Text(t) => {
            if t.height < 0.0 {
                return Err(GeometryError::NegativeSize(name));
            }
            check_finite(name, [t.position])
        }
        Geometry::Dimension(d) => check_finite(
            name,
            [d.definition_point1, d.definition_point2, d.line_location],
        ),
        Geometry::Hatch(h) => {
            if h.boundary.is_empty() {
                return Err(GeometryError::EmptyPoints(name));
            }
            check_finite(name, h.boundary.iter().copied())
        }
    }
}

fn check_finite(
    name: &'static str,
    points: impl IntoIterator<Item = Point2<f64>>,
) -> Result<(), GeometryError> {
    for p in points {
        if !(p.x.is_finite() && p.y.is_finite()) {
            return Err(GeometryError::NonFinite(name));
        }
    }
    Ok(())
}

/// 图形ID生成器
///
/// 只要求进程内唯一，不假设具体算法。闭包 `FnMut() -> ShapeId` 也实现了该 trait。
pub trait IdGenerator {
    fn next_id(&mut self) -> ShapeId;
}

impl<F> IdGenerator for F
where
    F: FnMut() -> ShapeId,
{
    fn next_id(&mut self) -> ShapeId {
        self()
    }
}

/// 基于 UUID v4 的生成器
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self) -> ShapeId {
        ShapeId::new(uuid::Uuid::new_v4().to_string())
    }
}

/// 前缀 + 递增序号，结果可预测，适合测试和回放
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> ShapeId {
        let id = ShapeId::new(format!("{}{}", self.prefix, self.next));
        self.next += 1;
        id
    }
}

/// 两个几何在容差内是否相等（用于测试和去重）
pub fn geometry_approx_eq(a: &Geometry, b: &Geometry, tol: f64) -> bool {
    use crate::geometry::Geometry as G;
    use crate::math::angle_difference;

    let pt = |p: &crate::math::Point2<f64>, q: &crate::math::Point2<f64>| (p - q).norm() <= tol;
    let num = |x: f64, y: f64| (x - y).abs() <= tol;
    let ang = |x: f64, y: f64| angle_difference(x, y) <= tol.max(EPSILON);

    match (a, b) {
        (G::Point(p), G::Point(q)) => pt(&p.position, &q.position),
        (G::Line(p), G::Line(q)) => pt(&p.start, &q.start) && pt(&p.end, &q.end),
        (G::Rectangle(p), G::Rectangle(q)) => {
            pt(&p.top_left, &q.top_left)
                && num(p.width, q.width)
                && num(p.height, q.height)
                && ang(p.rotation, q.rotation)
        }
        (G::Circle(p), G::Circle(q)) => pt(&p.center, &q.center) && num(p.radius, q.radius),
        (G::Arc(p), G::Arc(q)) => {
            pt(&p.center, &q.center)
                && num(p.radius, q.radius)
                && ang(p.start_angle, q.start_angle)
                && ang(p.end_angle, q.end_angle)
        }
        (G::Ellipse(p), G::Ellipse(q)) => {
            pt(&p.center, &q.center)
                && num(p.radius_x, q.radius_x)
                && num(p.radius_y, q.radius_y)
                && ang(p.rotation, q.rotation)
        }
        (G::Polyline(p), G::Polyline(q)) => {
            p.closed == q.closed
                && p.vertices.len() == q.vertices.len()
                && p.vertices
                    .iter()
                    .zip(&q.vertices)
                    .all(|(v, w)| pt(&v.point, &w.point) && num(v.bulge, w.bulge))
        }
        (G::Spline(p), G::Spline(q)) => {
            p.closed == q.closed
                && p.control_points.len() == q.control_points.len()
                && p.control_points.iter().zip(&q.control_points).all(|(v, w)| pt(v, w))
        }
        (G::Text(p), G::Text(q)) => {
            p.content == q.content
                && pt(&p.position, &q.position)
                && num(p.height, q.height)
                && ang(p.rotation, q.rotation)
        }
        (G::Dimension(p), G::Dimension(q)) => {
            p.dim_type == q.dim_type
                && pt(&p.definition_point1, &q.definition_point1)
                && pt(&p.definition_point2, &q.definition_point2)
                && pt(&p.line_location, &q.line_location)
                && match (&p.text_position, &q.text_position) {
                    (Some(a), Some(b)) => pt(a, b),
                    (None, None) => true,
                    _ => false,
                }
        }
        (G::Hatch(p), G::Hatch(q)) => {
            p.boundary.len() == q.boundary.len()
                && p.boundary.iter().zip(&q.boundary).all(|(v, w)| pt(v, w))
                && ang(p.pattern_angle, q.pattern_angle)
                && num(p.pattern_scale, q.pattern_scale)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Circle, Line, Polyline};
    use crate::math::Point2;

    #[test]
    fn test_sequential_ids() {
        let mut ids = SequentialIds::new("S");
        assert_eq!(ids.next_id(), ShapeId::new("S1"));
        assert_eq!(ids.next_id(), ShapeId::new("S2"));
    }

    #[test]
    fn test_closure_id_generator() {
        let mut n = 0;
        let mut next = || {
            n += 1;
            ShapeId::new(format!("c{n}"))
        };
        assert_eq!(next.next_id().as_str(), "c1");
    }

    #[test]
    fn test_clone_with_offset() {
        let shape = Shape::new(
            "L1",
            Geometry::Line(Line::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0))),
        )
        .on_layer("walls");
        let mut ids = SequentialIds::new("copy-");
        let copy = shape.clone_with(&mut ids, Some(Vector2::new(1.0, 2.0)));

        assert_eq!(copy.id.as_str(), "copy-1");
        assert_eq!(copy.layer_id, shape.layer_id);
        let Geometry::Line(line) = &copy.geometry else {
            panic!("expected line");
        };
        assert_eq!(line.start, Point2::new(1.0, 2.0));
        assert_eq!(line.end, Point2::new(11.0, 2.0));
    }

    #[test]
    fn test_validate_negative_radius() {
        let shape = Shape::new("C1", Geometry::Circle(Circle::new(Point2::origin(), -1.0)));
        assert_eq!(shape.validate(), Err(GeometryError::NegativeRadius(-1.0)));
    }

    #[test]
    fn test_validate_non_finite_points() {
        let pl = Polyline::from_points(vec![Point2::origin(), Point2::new(f64::NAN, 1.0)], false);
        let shape = Shape::new("P1", Geometry::Polyline(pl));
        assert_eq!(shape.validate(), Err(GeometryError::NonFinite("Polyline")));

        let line = Shape::new(
            "L1",
            Geometry::Line(Line::new(Point2::origin(), Point2::new(3.0, f64::INFINITY))),
        );
        assert!(line.validate().is_err());
        assert!(Shape::new("L2", Geometry::Line(Line::new(Point2::origin(), Point2::new(3.0, 4.0))))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_shape_json_defaults() {
        let json = r#"{"id":"L1","geometry":{"type":"line","start":[0.0,0.0],"end":[10.0,0.0]}}"#;
        let shape: Shape = serde_json::from_str(json).unwrap();
        assert!(shape.visible);
        assert!(!shape.locked);
        assert_eq!(shape.drawing_id, DrawingId::default());
    }
}
