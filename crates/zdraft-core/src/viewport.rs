//! 视口
//!
//! 屏幕坐标与世界坐标的换算。屏幕 y 轴向下，世界 y 轴向上。

use crate::math::{BoundingBox2, Point2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// 缩放（屏幕像素 / 世界单位）
    pub zoom: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl Viewport {
    pub fn new(zoom: f64, offset_x: f64, offset_y: f64) -> Self {
        Self {
            zoom,
            offset_x,
            offset_y,
        }
    }

    /// 有效缩放，非正或非有限值按 1.0 处理
    fn scale(&self) -> f64 {
        if self.zoom.is_finite() && self.zoom > 0.0 {
            self.zoom
        } else {
            1.0
        }
    }

    pub fn screen_to_world(&self, screen: Point2<f64>) -> Point2<f64> {
        let s = self.scale();
        Point2::new(
            (screen.x - self.offset_x) / s,
            -(screen.y - self.offset_y) / s,
        )
    }

    pub fn world_to_screen(&self, world: Point2<f64>) -> Point2<f64> {
        let s = self.scale();
        Point2::new(world.x * s + self.offset_x, -world.y * s + self.offset_y)
    }

    /// 屏幕像素容差换算为世界单位
    pub fn world_tolerance(&self, screen_tolerance: f64) -> f64 {
        screen_tolerance / self.scale()
    }

    /// 屏幕矩形对应的世界包围盒
    pub fn screen_rect_to_world(&self, a: Point2<f64>, b: Point2<f64>) -> BoundingBox2 {
        BoundingBox2::new(self.screen_to_world(a), self.screen_to_world(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let vp = Viewport::new(2.5, 100.0, 300.0);
        let world = Point2::new(12.0, -7.5);
        let back = vp.screen_to_world(vp.world_to_screen(world));
        assert!((back - world).norm() < 1e-9);
    }

    #[test]
    fn test_world_tolerance() {
        let vp = Viewport::new(20.0, 0.0, 0.0);
        assert!((vp.world_tolerance(10.0) - 0.5).abs() < 1e-12);
        assert_eq!(Viewport::new(0.0, 0.0, 0.0).world_tolerance(10.0), 10.0);
    }

    #[test]
    fn test_screen_y_points_down() {
        let vp = Viewport::default();
        let p = vp.screen_to_world(Point2::new(0.0, 10.0));
        assert_eq!(p, Point2::new(0.0, -10.0));
    }
}
