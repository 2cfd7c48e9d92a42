//! 几何变换
//!
//! 平移、旋转、缩放、镜像四种变换，作用于点以及每一种几何图元。
//! 所有变换都是纯函数：输入几何不变，返回变换后的新几何。
//!
//! 约定：
//! - 带旋转字段的图元（矩形、椭圆、文本、填充图案）旋转时累加有符号角度；
//! - 镜像会翻转方向性数据：圆弧起止角互换、多段线凸度取反；
//! - 非法参数（缩放系数 ≤ 0、镜像线长度为零）返回原几何，不产生 NaN。

use crate::geometry::{
    Arc, Circle, Dimension, Ellipse, Geometry, Hatch, Line, Point, Polyline, PolylineVertex,
    Rectangle, Spline, Text,
};
use crate::math::{is_degenerate_segment, mirror_point, rotate_point, Point2, Vector2, EPSILON};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// 二维变换
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Transform2D {
    /// 按向量平移
    Translate(Vector2<f64>),
    /// 绕中心旋转（弧度，逆时针为正）
    Rotate { center: Point2<f64>, angle: f64 },
    /// 以中心缩放
    Scale {
        center: Point2<f64>,
        sx: f64,
        sy: f64,
    },
    /// 以过 p1、p2 的直线为轴镜像
    Mirror { p1: Point2<f64>, p2: Point2<f64> },
}

impl Transform2D {
    pub fn translate(dx: f64, dy: f64) -> Self {
        Transform2D::Translate(Vector2::new(dx, dy))
    }

    pub fn rotate(center: Point2<f64>, angle: f64) -> Self {
        Transform2D::Rotate { center, angle }
    }

    /// 等比缩放
    pub fn scale(center: Point2<f64>, factor: f64) -> Self {
        Transform2D::Scale {
            center,
            sx: factor,
            sy: factor,
        }
    }

    pub fn mirror(p1: Point2<f64>, p2: Point2<f64>) -> Self {
        Transform2D::Mirror { p1, p2 }
    }

    /// 参数是否有效；无效变换作用后几何保持不变
    pub fn is_valid(&self) -> bool {
        match *self {
            Transform2D::Translate(v) => v.x.is_finite() && v.y.is_finite(),
            Transform2D::Rotate { angle, .. } => angle.is_finite(),
            Transform2D::Scale { sx, sy, .. } => {
                sx.is_finite() && sy.is_finite() && sx > EPSILON && sy > EPSILON
            }
            Transform2D::Mirror { p1, p2 } => !is_degenerate_segment(p1, p2),
        }
    }

    /// 逆变换
    pub fn inverse(&self) -> Self {
        match *self {
            Transform2D::Translate(v) => Transform2D::Translate(-v),
            Transform2D::Rotate { center, angle } => Transform2D::Rotate {
                center,
                angle: -angle,
            },
            Transform2D::Scale { center, sx, sy } => Transform2D::Scale {
                center,
                sx: 1.0 / sx,
                sy: 1.0 / sy,
            },
            mirror @ Transform2D::Mirror { .. } => mirror,
        }
    }

    /// 变换一个点
    pub fn apply_point(&self, p: Point2<f64>) -> Point2<f64> {
        if !self.is_valid() {
            return p;
        }
        match *self {
            Transform2D::Translate(v) => p + v,
            Transform2D::Rotate { center, angle } => rotate_point(p, center, angle),
            Transform2D::Scale { center, sx, sy } => Point2::new(
                center.x + (p.x - center.x) * sx,
                center.y + (p.y - center.y) * sy,
            ),
            Transform2D::Mirror { p1, p2 } => mirror_point(p, p1, p2),
        }
    }

    /// 变换一个方向向量（不受平移影响）
    pub fn apply_vector(&self, v: Vector2<f64>) -> Vector2<f64> {
        let origin = Point2::origin();
        self.apply_point(origin + v) - self.apply_point(origin)
    }

    /// 镜像线的倾角
    fn mirror_angle(p1: Point2<f64>, p2: Point2<f64>) -> f64 {
        (p2.y - p1.y).atan2(p2.x - p1.x)
    }

    /// 角度字段的变换：旋转累加，镜像取 2θ - r，平移和缩放不变
    fn apply_angle(&self, angle: f64) -> f64 {
        match *self {
            Transform2D::Rotate { angle: a, .. } => angle + a,
            Transform2D::Mirror { p1, p2 } => 2.0 * Self::mirror_angle(p1, p2) - angle,
            Transform2D::Translate(_) | Transform2D::Scale { .. } => angle,
        }
    }

    /// 长度的缩放系数（非等比缩放取几何平均）
    fn length_factor(&self) -> f64 {
        match *self {
            Transform2D::Scale { sx, sy, .. } => (sx * sy).sqrt(),
            _ => 1.0,
        }
    }

    /// 变换几何
    pub fn apply(&self, geometry: &Geometry) -> Geometry {
        if !self.is_valid() {
            return geometry.clone();
        }
        match geometry {
            Geometry::Point(p) => Geometry::Point(Point {
                position: self.apply_point(p.position),
            }),
            Geometry::Line(l) => {
                Geometry::Line(Line::new(self.apply_point(l.start), self.apply_point(l.end)))
            }
            Geometry::Rectangle(r) => Geometry::Rectangle(self.apply_rectangle(r)),
            Geometry::Circle(c) => Geometry::Circle(Circle::new(
                self.apply_point(c.center),
                c.radius * self.length_factor(),
            )),
            Geometry::Arc(a) => Geometry::Arc(self.apply_arc(a)),
            Geometry::Ellipse(e) => Geometry::Ellipse(self.apply_ellipse(e)),
            Geometry::Polyline(pl) => Geometry::Polyline(self.apply_polyline(pl)),
            Geometry::Spline(s) => Geometry::Spline(Spline::new(
                s.control_points.iter().map(|p| self.apply_point(*p)).collect(),
                s.closed,
            )),
            Geometry::Text(t) => Geometry::Text(Text {
                position: self.apply_point(t.position),
                content: t.content.clone(),
                height: t.height * self.length_factor(),
                rotation: self.apply_angle(t.rotation),
                alignment: t.alignment,
            }),
            Geometry::Dimension(d) => Geometry::Dimension(Dimension {
                definition_point1: self.apply_point(d.definition_point1),
                definition_point2: self.apply_point(d.definition_point2),
                line_location: self.apply_point(d.line_location),
                dim_type: d.dim_type,
                text_override: d.text_override.clone(),
                text_height: d.text_height * self.length_factor(),
                text_position: d.text_position.map(|p| self.apply_point(p)),
            }),
            Geometry::Hatch(h) => Geometry::Hatch(Hatch {
                boundary: h.boundary.iter().map(|p| self.apply_point(*p)).collect(),
                pattern: h.pattern.clone(),
                pattern_angle: self.apply_angle(h.pattern_angle),
                pattern_scale: h.pattern_scale * self.length_factor(),
            }),
        }
    }

    fn apply_rectangle(&self, r: &Rectangle) -> Rectangle {
        match *self {
            Transform2D::Translate(_) | Transform2D::Rotate { .. } => Rectangle {
                top_left: self.apply_point(r.top_left),
                width: r.width,
                height: r.height,
                rotation: self.apply_angle(r.rotation),
            },
            Transform2D::Scale { sx, sy, .. } => {
                // 沿矩形自身的轴缩放，旋转矩形在非等比缩放下取轴向投影系数
                let (sin, cos) = r.rotation.sin_cos();
                let fu = ((sx * cos).powi(2) + (sy * sin).powi(2)).sqrt();
                let fv = ((sx * sin).powi(2) + (sy * cos).powi(2)).sqrt();
                Rectangle {
                    top_left: self.apply_point(r.top_left),
                    width: r.width * fu,
                    height: r.height * fv,
                    rotation: r.rotation,
                }
            }
            Transform2D::Mirror { p1, p2 } => {
                // 镜像后坐标系变为左手系：以原宽度方向的另一端为新锚点，宽度方向反向
                let (u, _) = r.axes();
                let far = r.top_left + u * r.width;
                Rectangle {
                    top_left: mirror_point(far, p1, p2),
                    width: r.width,
                    height: r.height,
                    rotation: 2.0 * Self::mirror_angle(p1, p2) - r.rotation + PI,
                }
            }
        }
    }

    fn apply_arc(&self, a: &Arc) -> Arc {
        let center = self.apply_point(a.center);
        let radius = a.radius * self.length_factor();
        match *self {
            Transform2D::Mirror { p1, p2 } => {
                // 镜像反转扫掠方向：新起点是旧终点的镜像
                let theta2 = 2.0 * Self::mirror_angle(p1, p2);
                Arc::new(center, radius, theta2 - a.end_angle, theta2 - a.start_angle)
            }
            Transform2D::Scale { sx, sy, .. } if (sx - sy).abs() > EPSILON => {
                // 非等比缩放：按端点方向重新计算角度
                let start = self.apply_point(a.start_point()) - center;
                let end = self.apply_point(a.end_point()) - center;
                Arc::new(center, radius, start.y.atan2(start.x), end.y.atan2(end.x))
            }
            _ => Arc::new(
                center,
                radius,
                self.apply_angle(a.start_angle),
                self.apply_angle(a.end_angle),
            ),
        }
    }

    fn apply_ellipse(&self, e: &Ellipse) -> Ellipse {
        match *self {
            Transform2D::Scale { sx, sy, .. } => {
                let (sin, cos) = e.rotation.sin_cos();
                let fx = ((sx * cos).powi(2) + (sy * sin).powi(2)).sqrt();
                let fy = ((sx * sin).powi(2) + (sy * cos).powi(2)).sqrt();
                Ellipse {
                    center: self.apply_point(e.center),
                    radius_x: e.radius_x * fx,
                    radius_y: e.radius_y * fy,
                    rotation: e.rotation,
                }
            }
            _ => Ellipse {
                center: self.apply_point(e.center),
                radius_x: e.radius_x,
                radius_y: e.radius_y,
                rotation: self.apply_angle(e.rotation),
            },
        }
    }

    fn apply_polyline(&self, pl: &Polyline) -> Polyline {
        let flip = matches!(self, Transform2D::Mirror { .. });
        Polyline::new(
            pl.vertices
                .iter()
                .map(|v| {
                    PolylineVertex::with_bulge(
                        self.apply_point(v.point),
                        if flip { -v.bulge } else { v.bulge },
                    )
                })
                .collect(),
            pl.closed,
        )
    }
}

impl Geometry {
    /// 平移
    pub fn translated(&self, dx: f64, dy: f64) -> Geometry {
        Transform2D::translate(dx, dy).apply(self)
    }

    /// 绕中心旋转
    pub fn rotated(&self, center: Point2<f64>, angle: f64) -> Geometry {
        Transform2D::rotate(center, angle).apply(self)
    }

    /// 以中心缩放
    pub fn scaled(&self, center: Point2<f64>, sx: f64, sy: f64) -> Geometry {
        Transform2D::Scale { center, sx, sy }.apply(self)
    }

    /// 镜像
    pub fn mirrored(&self, p1: Point2<f64>, p2: Point2<f64>) -> Geometry {
        Transform2D::mirror(p1, p2).apply(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{DimensionType, TextAlignment};
    use crate::math::normalize_angle;
    use crate::shape::geometry_approx_eq;
    use std::f64::consts::FRAC_PI_2;

    const TOL: f64 = 1e-9;

    fn samples() -> Vec<Geometry> {
        let p = Point2::new;
        let mut rect = Rectangle::new(p(1.0, 2.0), 4.0, 3.0);
        rect.rotation = 0.3;
        let mut ellipse = Ellipse::new(p(-3.0, 5.0), 6.0, 2.0);
        ellipse.rotation = 0.7;
        vec![
            Geometry::Point(Point::new(3.0, -1.0)),
            Geometry::Line(Line::new(p(0.0, 0.0), p(10.0, 0.0))),
            Geometry::Rectangle(rect),
            Geometry::Circle(Circle::new(p(5.0, 5.0), 2.5)),
            Geometry::Arc(Arc::new(p(1.0, 1.0), 3.0, 0.2, 2.0)),
            Geometry::Ellipse(ellipse),
            Geometry::Polyline(Polyline::new(
                vec![
                    PolylineVertex::with_bulge(p(0.0, 0.0), 0.5),
                    PolylineVertex::new(p(4.0, 0.0)),
                    PolylineVertex::with_bulge(p(4.0, 4.0), -0.25),
                ],
                true,
            )),
            Geometry::Spline(Spline::new(vec![p(0.0, 0.0), p(1.0, 3.0), p(4.0, 2.0)], false)),
            Geometry::Text(
                Text::new(p(2.0, 2.0), "ZD", 2.5).with_alignment(TextAlignment::Center),
            ),
            Geometry::Dimension(Dimension {
                dim_type: DimensionType::Aligned,
                text_position: Some(p(5.0, 6.0)),
                ..Dimension::new(p(0.0, 0.0), p(10.0, 0.0), p(5.0, 4.0))
            }),
            Geometry::Hatch(Hatch::new(vec![p(0.0, 0.0), p(5.0, 0.0), p(5.0, 5.0)])),
        ]
    }

    #[test]
    fn test_translate_round_trip() {
        for g in samples() {
            let back = g.translated(7.5, -3.25).translated(-7.5, 3.25);
            assert!(geometry_approx_eq(&g, &back, TOL), "{}", g.type_name());
        }
    }

    #[test]
    fn test_rotation_composition() {
        let center = Point2::new(2.0, -1.0);
        let (a, b) = (0.4, 1.3);
        for g in samples() {
            let twice = g.rotated(center, a).rotated(center, b);
            let once = g.rotated(center, a + b);
            assert!(geometry_approx_eq(&twice, &once, TOL), "{}", g.type_name());
        }
    }

    #[test]
    fn test_mirror_involution() {
        let (p1, p2) = (Point2::new(-1.0, 2.0), Point2::new(3.0, 5.0));
        for g in samples() {
            let back = g.mirrored(p1, p2).mirrored(p1, p2);
            assert!(geometry_approx_eq(&g, &back, TOL), "{}", g.type_name());
        }
    }

    #[test]
    fn test_rotate_accumulates_rectangle_rotation() {
        let rect = Geometry::Rectangle(Rectangle::new(Point2::new(1.0, 0.0), 2.0, 1.0));
        let Geometry::Rectangle(r) = rect.rotated(Point2::origin(), FRAC_PI_2) else {
            panic!("expected rectangle");
        };
        assert!((r.rotation - FRAC_PI_2).abs() < TOL);
        assert!((r.top_left - Point2::new(0.0, 1.0)).norm() < TOL);
    }

    #[test]
    fn test_mirror_arc_keeps_geometry() {
        // 上半圆关于 x 轴镜像后为下半圆
        let arc = Geometry::Arc(Arc::new(Point2::origin(), 1.0, 0.0, PI));
        let Geometry::Arc(m) = arc.mirrored(Point2::origin(), Point2::new(1.0, 0.0)) else {
            panic!("expected arc");
        };
        assert!((normalize_angle(m.start_angle) - PI).abs() < TOL);
        assert!(normalize_angle(m.end_angle).abs() < TOL || (normalize_angle(m.end_angle) - 2.0 * PI).abs() < TOL);
        assert!(m.contains_angle(-FRAC_PI_2));
        assert!(!m.contains_angle(FRAC_PI_2));
    }

    #[test]
    fn test_mirror_rectangle_corners() {
        let rect = Rectangle::new(Point2::new(1.0, 1.0), 3.0, 2.0);
        let Geometry::Rectangle(m) = Geometry::Rectangle(rect.clone())
            .mirrored(Point2::origin(), Point2::new(0.0, 1.0))
        else {
            panic!("expected rectangle");
        };
        // 镜像后的角点集合应该等于原角点逐个镜像
        let mirrored: Vec<_> = rect
            .corners()
            .iter()
            .map(|c| mirror_point(*c, Point2::origin(), Point2::new(0.0, 1.0)))
            .collect();
        for c in m.corners() {
            assert!(mirrored.iter().any(|q| (q - c).norm() < TOL));
        }
    }

    #[test]
    fn test_mirror_negates_bulge() {
        let pl = Geometry::Polyline(Polyline::new(
            vec![
                PolylineVertex::with_bulge(Point2::new(0.0, 0.0), 0.5),
                PolylineVertex::new(Point2::new(2.0, 0.0)),
            ],
            false,
        ));
        let Geometry::Polyline(m) = pl.mirrored(Point2::origin(), Point2::new(1.0, 0.0)) else {
            panic!("expected polyline");
        };
        assert!((m.vertices[0].bulge + 0.5).abs() < TOL);
    }

    #[test]
    fn test_invalid_transforms_leave_geometry_unchanged() {
        for g in samples() {
            assert_eq!(g.scaled(Point2::origin(), 0.0, 0.0), g);
            assert_eq!(g.scaled(Point2::origin(), -2.0, -2.0), g);
            assert_eq!(g.mirrored(Point2::new(1.0, 1.0), Point2::new(1.0, 1.0)), g);
        }
    }

    #[test]
    fn test_short_mirror_line_reflects_points_and_angles_together() {
        let (p1, p2) = (Point2::origin(), Point2::new(0.0, 1e-6));
        assert!(Transform2D::mirror(p1, p2).is_valid());

        let Geometry::Arc(a) = Geometry::Arc(Arc::new(Point2::new(5.0, 0.0), 1.0, 0.0, 1.0))
            .mirrored(p1, p2)
        else {
            panic!("expected arc");
        };
        assert!((a.center - Point2::new(-5.0, 0.0)).norm() < TOL);
        assert!((normalize_angle(a.start_angle) - (PI - 1.0)).abs() < TOL);

        let Geometry::Line(l) = Geometry::Line(Line::new(Point2::new(5.0, 0.0), Point2::new(6.0, 0.0)))
            .mirrored(p1, p2)
        else {
            panic!("expected line");
        };
        assert!((l.start - Point2::new(-5.0, 0.0)).norm() < TOL);
        assert!((l.end - Point2::new(-6.0, 0.0)).norm() < TOL);

        let rect = Rectangle::new(Point2::new(5.0, 0.0), 2.0, 1.0);
        let Geometry::Rectangle(m) = Geometry::Rectangle(rect.clone()).mirrored(p1, p2) else {
            panic!("expected rectangle");
        };
        let expected: Vec<_> = rect.corners().iter().map(|c| mirror_point(*c, p1, p2)).collect();
        for c in m.corners() {
            assert!(expected.iter().any(|q| (q - c).norm() < TOL));
        }

        // 低于退化阈值时所有图元保持不变
        let tiny = Point2::new(0.0, 1e-11);
        assert!(!Transform2D::mirror(p1, tiny).is_valid());
        for g in samples() {
            assert_eq!(g.mirrored(p1, tiny), g);
        }
    }

    #[test]
    fn test_scale_circle_and_degenerate_line() {
        let c = Geometry::Circle(Circle::new(Point2::new(2.0, 0.0), 1.0));
        let Geometry::Circle(s) = c.scaled(Point2::origin(), 3.0, 3.0) else {
            panic!("expected circle");
        };
        assert!((s.center - Point2::new(6.0, 0.0)).norm() < TOL);
        assert!((s.radius - 3.0).abs() < TOL);

        // 零长度线段可以变换
        let l = Geometry::Line(Line::new(Point2::new(1.0, 1.0), Point2::new(1.0, 1.0)));
        let Geometry::Line(r) = l.rotated(Point2::origin(), PI) else {
            panic!("expected line");
        };
        assert!((r.start - Point2::new(-1.0, -1.0)).norm() < TOL);
    }

    #[test]
    fn test_inverse_transform() {
        let t = Transform2D::Scale {
            center: Point2::new(1.0, 1.0),
            sx: 2.0,
            sy: 4.0,
        };
        let p = Point2::new(3.0, -2.0);
        let back = t.inverse().apply_point(t.apply_point(p));
        assert!((back - p).norm() < TOL);
    }
}
