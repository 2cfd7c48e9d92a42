//! 夹点编辑
//!
//! 每种图形暴露一组夹点，拖动夹点得到更新后的几何。
//! 无法构造有效几何时（例如三点共线的圆弧）返回 `None`，原图形保持不变。

use crate::geometry::{Arc, Geometry, Line};
use crate::math::{Point2, EPSILON};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GripKind {
    /// 端点或角点
    Endpoint,
    /// 中点（整体平移或弧上的第三点）
    Midpoint,
    /// 圆心（整体平移）
    Center,
    /// 多段线、样条、填充的顶点
    Vertex,
    /// 圆/椭圆的半径夹点
    Quadrant,
    /// 文本或点的插入点
    Insertion,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grip {
    pub index: usize,
    pub point: Point2<f64>,
    pub kind: GripKind,
}

fn list(items: impl IntoIterator<Item = (Point2<f64>, GripKind)>) -> Vec<Grip> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, (point, kind))| Grip { index, point, kind })
        .collect()
}

/// 几何的全部夹点
pub fn grips(geometry: &Geometry) -> Vec<Grip> {
    use GripKind::*;
    match geometry {
        Geometry::Point(p) => list([(p.position, Insertion)]),
        Geometry::Line(l) => list([(l.start, Endpoint), (l.end, Endpoint), (l.midpoint(), Midpoint)]),
        Geometry::Rectangle(r) => {
            let mut items: Vec<_> = r.corners().into_iter().map(|c| (c, Endpoint)).collect();
            items.push((r.center(), Center));
            list(items)
        }
        Geometry::Circle(c) => {
            let mut items = vec![(c.center, Center)];
            items.extend([0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2].map(|a| (c.point_at_angle(a), Quadrant)));
            list(items)
        }
        Geometry::Arc(a) => list([
            (a.start_point(), Endpoint),
            (a.end_point(), Endpoint),
            (a.mid_point(), Midpoint),
            (a.center, Center),
        ]),
        Geometry::Ellipse(e) => list([
            (e.center, Center),
            (e.point_at(0.0), Quadrant),
            (e.point_at(FRAC_PI_2), Quadrant),
        ]),
        Geometry::Polyline(pl) => list(pl.vertices.iter().map(|v| (v.point, Vertex))),
        Geometry::Spline(s) => list(s.control_points.iter().map(|p| (*p, Vertex))),
        Geometry::Text(t) => list([(t.position, Insertion)]),
        Geometry::Dimension(d) => list([
            (d.definition_point1, Endpoint),
            (d.definition_point2, Endpoint),
            (d.line_location, Midpoint),
        ]),
        Geometry::Hatch(h) => list(h.boundary.iter().map(|p| (*p, Vertex))),
    }
}

/// 拖动夹点到新位置
pub fn drag_grip(geometry: &Geometry, index: usize, to: Point2<f64>) -> Option<Geometry> {
    if !(to.x.is_finite() && to.y.is_finite()) {
        return None;
    }
    let grip = grips(geometry).into_iter().find(|g| g.index == index)?;
    let delta = to - grip.point;

    let updated = match geometry {
        Geometry::Point(p) => {
            let mut p = p.clone();
            p.position = to;
            Geometry::Point(p)
        }
        Geometry::Line(l) => match index {
            0 => Geometry::Line(Line::new(to, l.end)),
            1 => Geometry::Line(Line::new(l.start, to)),
            _ => Geometry::Line(Line::new(l.start + delta, l.end + delta)),
        },
        Geometry::Rectangle(r) => {
            let mut r = r.clone();
            if index == 4 {
                r.top_left += delta;
            } else {
                // 对角点固定，在矩形自身坐标系中重新张开
                let corners = r.corners();
                let fixed = corners[(index + 2) % 4];
                let (u, v) = r.axes();
                let d = to - fixed;
                let (du, dv) = (d.dot(&u), d.dot(&v));
                r.top_left = fixed + u * du.min(0.0) + v * dv.min(0.0);
                r.width = du.abs();
                r.height = dv.abs();
            }
            Geometry::Rectangle(r)
        }
        Geometry::Circle(c) => {
            let mut c = c.clone();
            if index == 0 {
                c.center = to;
            } else {
                c.radius = (to - c.center).norm();
            }
            Geometry::Circle(c)
        }
        Geometry::Arc(a) => match index {
            0 => Geometry::Arc(Arc::from_three_points(to, a.mid_point(), a.end_point())?),
            1 => Geometry::Arc(Arc::from_three_points(a.start_point(), a.mid_point(), to)?),
            2 => Geometry::Arc(Arc::from_three_points(a.start_point(), to, a.end_point())?),
            _ => {
                let mut a = a.clone();
                a.center = to;
                Geometry::Arc(a)
            }
        },
        Geometry::Ellipse(e) => {
            let mut e = e.clone();
            match index {
                0 => e.center = to,
                1 => e.radius_x = (to - e.center).norm(),
                _ => e.radius_y = (to - e.center).norm(),
            }
            Geometry::Ellipse(e)
        }
        Geometry::Polyline(pl) => {
            let mut pl = pl.clone();
            pl.vertices[index].point = to;
            Geometry::Polyline(pl)
        }
        Geometry::Spline(s) => {
            let mut s = s.clone();
            s.control_points[index] = to;
            Geometry::Spline(s)
        }
        Geometry::Text(t) => {
            let mut t = t.clone();
            t.position = to;
            Geometry::Text(t)
        }
        Geometry::Dimension(d) => {
            let mut d = d.clone();
            match index {
                0 => d.definition_point1 = to,
                1 => d.definition_point2 = to,
                _ => d.line_location = to,
            }
            Geometry::Dimension(d)
        }
        Geometry::Hatch(h) => {
            let mut h = h.clone();
            h.boundary[index] = to;
            Geometry::Hatch(h)
        }
    };

    Some(updated)
}

/// 离给定点最近且在容差内的夹点
pub fn grip_at(geometry: &Geometry, point: &Point2<f64>, tolerance: f64) -> Option<Grip> {
    grips(geometry)
        .into_iter()
        .map(|g| ((g.point - point).norm(), g))
        .filter(|(d, _)| *d <= tolerance + EPSILON)
        .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, g)| g)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Circle, Polyline, Rectangle};

    #[test]
    fn test_line_endpoint_and_midpoint() {
        let g = Geometry::Line(Line::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)));
        let moved = drag_grip(&g, 1, Point2::new(10.0, 5.0)).unwrap();
        assert_eq!(moved, Geometry::Line(Line::new(Point2::new(0.0, 0.0), Point2::new(10.0, 5.0))));

        let shifted = drag_grip(&g, 2, Point2::new(5.0, 3.0)).unwrap();
        assert_eq!(
            shifted,
            Geometry::Line(Line::new(Point2::new(0.0, 3.0), Point2::new(10.0, 3.0)))
        );
    }

    #[test]
    fn test_arc_midpoint_rebuilds_through_three_points() {
        let arc = Arc::new(Point2::new(0.0, 0.0), 10.0, 0.0, PI);
        let g = Geometry::Arc(arc);
        let updated = drag_grip(&g, 2, Point2::new(0.0, 5.0)).unwrap();
        let Geometry::Arc(a) = updated else {
            panic!("expected arc");
        };
        assert!((a.start_point() - Point2::new(10.0, 0.0)).norm() < 1e-9);
        assert!((a.end_point() - Point2::new(-10.0, 0.0)).norm() < 1e-9);
        assert!((a.mid_point() - Point2::new(0.0, 5.0)).norm() < 1e-9);
    }

    #[test]
    fn test_arc_collinear_is_noop() {
        let g = Geometry::Arc(Arc::new(Point2::new(0.0, 0.0), 10.0, 0.0, PI));
        assert!(drag_grip(&g, 2, Point2::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_rectangle_corner_keeps_opposite_fixed() {
        let g = Geometry::Rectangle(Rectangle::new(Point2::new(0.0, 0.0), 10.0, 5.0));
        let Some(Geometry::Rectangle(r)) = drag_grip(&g, 2, Point2::new(4.0, 8.0)) else {
            panic!("expected rectangle");
        };
        assert_eq!(r.top_left, Point2::new(0.0, 0.0));
        assert!((r.width - 4.0).abs() < 1e-12);
        assert!((r.height - 8.0).abs() < 1e-12);

        // 越过对角点时翻转
        let Some(Geometry::Rectangle(r)) = drag_grip(&g, 0, Point2::new(12.0, 7.0)) else {
            panic!("expected rectangle");
        };
        assert_eq!(r.top_left, Point2::new(10.0, 5.0));
        assert!((r.width - 2.0).abs() < 1e-12);
        assert!((r.height - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_circle_radius_grip() {
        let g = Geometry::Circle(Circle::new(Point2::new(0.0, 0.0), 5.0));
        let Some(Geometry::Circle(c)) = drag_grip(&g, 3, Point2::new(-8.0, 0.0)) else {
            panic!("expected circle");
        };
        assert!((c.radius - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_index() {
        let g = Geometry::Polyline(Polyline::from_points(
            [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)],
            false,
        ));
        assert!(drag_grip(&g, 5, Point2::new(0.0, 0.0)).is_none());
        assert_eq!(grip_at(&g, &Point2::new(0.9, 0.1), 0.5).map(|g| g.index), Some(1));
    }
}
