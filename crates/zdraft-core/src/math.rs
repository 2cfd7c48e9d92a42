//! 数学基础类型
//!
//! 点和向量直接使用 nalgebra 的类型，这里补充包围盒和常用的二维运算。

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub use nalgebra::{Point2, Vector2};

/// 几何比较的默认容差
pub const EPSILON: f64 = 1e-10;

/// 2π
pub const TAU: f64 = 2.0 * PI;

/// 将角度归一化到 [0, 2π)
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    // rem_euclid 在极小负数时可能返回 TAU 本身
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// 两个角度之间的最小差值（模 2π）
pub fn angle_difference(a: f64, b: f64) -> f64 {
    let d = normalize_angle(a - b);
    d.min(TAU - d)
}

/// 绕中心点旋转一个点
pub fn rotate_point(point: Point2<f64>, center: Point2<f64>, angle: f64) -> Point2<f64> {
    let (sin, cos) = angle.sin_cos();
    let v = point - center;
    Point2::new(
        center.x + v.x * cos - v.y * sin,
        center.y + v.x * sin + v.y * cos,
    )
}

/// 两点是否重合到无法确定一条直线（距离小于 `EPSILON`）
pub fn is_degenerate_segment(p1: Point2<f64>, p2: Point2<f64>) -> bool {
    (p2 - p1).norm_squared() < EPSILON * EPSILON
}

/// 以直线 (p1, p2) 为轴镜像一个点
///
/// 镜像线退化（见 [`is_degenerate_segment`]）时返回原点。
pub fn mirror_point(point: Point2<f64>, p1: Point2<f64>, p2: Point2<f64>) -> Point2<f64> {
    if is_degenerate_segment(p1, p2) {
        return point;
    }
    let d = p2 - p1;
    let len_sq = d.norm_squared();
    let t = (point - p1).dot(&d) / len_sq;
    let foot = p1 + d * t;
    Point2::new(2.0 * foot.x - point.x, 2.0 * foot.y - point.y)
}

/// 二维叉积（z 分量）
pub fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// 两点的中点
pub fn midpoint(a: Point2<f64>, b: Point2<f64>) -> Point2<f64> {
    Point2::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// 点到线段的最近点
pub fn closest_point_on_segment(
    point: Point2<f64>,
    start: Point2<f64>,
    end: Point2<f64>,
) -> Point2<f64> {
    let v = end - start;
    let w = point - start;

    let c1 = w.dot(&v);
    if c1 <= 0.0 {
        return start;
    }

    let c2 = v.dot(&v);
    if c2 <= c1 {
        return end;
    }

    start + v * (c1 / c2)
}

/// 点到线段的距离
pub fn distance_to_segment(point: Point2<f64>, start: Point2<f64>, end: Point2<f64>) -> f64 {
    (point - closest_point_on_segment(point, start, end)).norm()
}

/// 二维轴对齐包围盒
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox2 {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl BoundingBox2 {
    /// 由两个角点创建（自动排序）
    pub fn new(a: Point2<f64>, b: Point2<f64>) -> Self {
        Self {
            min: Point2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// 空包围盒（min > max，与任何东西都不相交）
    pub fn empty() -> Self {
        Self {
            min: Point2::new(f64::INFINITY, f64::INFINITY),
            max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Point2<f64>>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.expand_to_include(&p);
        }
        bbox
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn expand_to_include(&mut self, point: &Point2<f64>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    /// 合并两个包围盒
    pub fn union(&self, other: &BoundingBox2) -> BoundingBox2 {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        BoundingBox2 {
            min: Point2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// 向四周扩展指定距离
    pub fn expanded(&self, margin: f64) -> BoundingBox2 {
        BoundingBox2 {
            min: Point2::new(self.min.x - margin, self.min.y - margin),
            max: Point2::new(self.max.x + margin, self.max.y + margin),
        }
    }

    pub fn contains(&self, point: &Point2<f64>) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// 是否完全包含另一个包围盒
    pub fn contains_box(&self, other: &BoundingBox2) -> bool {
        !other.is_empty()
            && other.min.x >= self.min.x
            && other.max.x <= self.max.x
            && other.min.y >= self.min.y
            && other.max.y <= self.max.y
    }

    pub fn intersects(&self, other: &BoundingBox2) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn center(&self) -> Point2<f64> {
        midpoint(self.min, self.max)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}
