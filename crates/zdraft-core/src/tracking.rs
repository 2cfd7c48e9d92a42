//! 追踪与点解析
//!
//! 极轴追踪、正交模式和对象追踪生成以基点为起点的追踪射线，
//! [`resolve`] 把原始光标位置修正为最终输入点：
//!
//! 1. 两条邻近追踪射线的交点（按构造顺序取第一对）
//! 2. 否则取垂直距离最近的邻近追踪射线上的投影点
//! 3. 在上述候选点（或原始光标）处做对象捕捉，命中时优先
//! 4. 都没有命中时返回原始光标

use crate::math::{Point2, Vector2, EPSILON};
use crate::settings::EditorSettings;
use crate::shape::{Shape, ShapeId};
use crate::snap::{SnapEngine, SnapPoint};
use crate::viewport::Viewport;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 极轴增量角下限（度），最多 360 条极轴线
pub const MIN_POLAR_INCREMENT_DEG: f64 = 1.0;

/// 追踪配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// 极轴追踪
    pub polar_tracking: bool,
    /// 正交模式（只追踪 0°/90°/180°/270°）
    pub ortho_mode: bool,
    /// 对象追踪
    pub object_tracking: bool,
    /// 极轴增量角（度）
    pub polar_increment_deg: f64,
    /// 对象追踪搜索范围（捕捉容差的倍数）
    pub object_tracking_factor: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            polar_tracking: true,
            ortho_mode: false,
            object_tracking: false,
            polar_increment_deg: 45.0,
            object_tracking_factor: 5.0,
        }
    }
}

impl TrackingConfig {
    pub fn is_active(&self) -> bool {
        self.polar_tracking || self.ortho_mode || self.object_tracking
    }

    /// 当前生效的角度增量（度）
    fn increment_deg(&self) -> Option<f64> {
        let deg = if self.ortho_mode {
            90.0
        } else if self.polar_tracking {
            self.polar_increment_deg
        } else {
            return None;
        };
        deg.is_finite().then(|| deg.max(MIN_POLAR_INCREMENT_DEG))
    }
}

/// 追踪线类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingKind {
    Polar,
    Parallel,
    Perpendicular,
    Extension,
}

/// 追踪射线，只有正方向半线有效
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingLine {
    pub origin: Point2<f64>,
    /// 单位方向
    pub direction: Vector2<f64>,
    /// 方向角（弧度）
    pub angle: f64,
    pub kind: TrackingKind,
    pub source_shape_id: Option<ShapeId>,
}

impl TrackingLine {
    pub fn new(
        origin: Point2<f64>,
        angle: f64,
        kind: TrackingKind,
        source_shape_id: Option<ShapeId>,
    ) -> Self {
        Self {
            origin,
            direction: Vector2::new(angle.cos(), angle.sin()),
            angle,
            kind,
            source_shape_id,
        }
    }

    fn from_direction(
        origin: Point2<f64>,
        direction: Vector2<f64>,
        kind: TrackingKind,
        source_shape_id: Option<ShapeId>,
    ) -> Self {
        Self::new(origin, direction.y.atan2(direction.x), kind, source_shape_id)
    }

    /// 点在射线上的投影参数
    pub fn parameter(&self, point: &Point2<f64>) -> f64 {
        (point - self.origin).dot(&self.direction)
    }

    /// 点在正方向半线上的投影；在起点之后返回 `None`
    pub fn project(&self, point: &Point2<f64>) -> Option<Point2<f64>> {
        let t = self.parameter(point);
        if t < 0.0 {
            None
        } else {
            Some(self.origin + self.direction * t)
        }
    }

    /// 点到正方向半线的垂直距离
    pub fn distance_to(&self, point: &Point2<f64>) -> Option<f64> {
        self.project(point).map(|foot| (point - foot).norm())
    }

    /// 两条射线的交点（两条射线的参数都必须非负）
    pub fn intersection(&self, other: &TrackingLine) -> Option<Point2<f64>> {
        let denom = self.direction.x * other.direction.y - self.direction.y * other.direction.x;
        if denom.abs() < EPSILON {
            return None;
        }
        let d = other.origin - self.origin;
        let t1 = (d.x * other.direction.y - d.y * other.direction.x) / denom;
        let t2 = (d.x * self.direction.y - d.y * self.direction.x) / denom;
        if t1 < -EPSILON || t2 < -EPSILON {
            return None;
        }
        Some(self.origin + self.direction * t1.max(0.0))
    }

    fn same_ray(&self, other: &TrackingLine) -> bool {
        (self.origin - other.origin).norm() < EPSILON
            && (self.direction - other.direction).norm() < 1e-9
    }
}

/// 解析结果来源
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapResultKind {
    /// 原始光标，没有捕捉或追踪
    Raw,
    /// 对象捕捉
    Object(SnapPoint),
    /// 落在单条追踪线上
    Tracking { line: TrackingLine },
    /// 两条追踪线的交点
    TrackingIntersection {
        first: TrackingLine,
        second: TrackingLine,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapResult {
    pub point: Point2<f64>,
    pub kind: SnapResultKind,
}

impl SnapResult {
    pub fn raw(point: Point2<f64>) -> Self {
        Self {
            point,
            kind: SnapResultKind::Raw,
        }
    }

    pub fn snap_point(&self) -> Option<&SnapPoint> {
        match &self.kind {
            SnapResultKind::Object(snap) => Some(snap),
            _ => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self.kind, SnapResultKind::Raw)
    }
}

fn push_unique(lines: &mut Vec<TrackingLine>, line: TrackingLine) {
    if !lines.iter().any(|l| l.same_ray(&line)) {
        lines.push(line);
    }
}

/// 生成以基点为起点的追踪射线，顺序即构造顺序：极轴线在前，对象追踪线在后
pub fn tracking_lines(
    base_point: Point2<f64>,
    shapes: &[&Shape],
    config: &TrackingConfig,
    tolerance: f64,
) -> Vec<TrackingLine> {
    let mut lines = Vec::new();

    if let Some(increment) = config.increment_deg() {
        let count = (360.0 / increment - EPSILON).ceil() as usize;
        for k in 0..count {
            lines.push(TrackingLine::new(
                base_point,
                (increment * k as f64).to_radians(),
                TrackingKind::Polar,
                None,
            ));
        }
    }

    if config.object_tracking {
        let reach = tolerance * config.object_tracking_factor.max(1.0);
        for shape in shapes.iter().filter(|s| s.visible) {
            for segment in shape.geometry.line_segments() {
                if segment.distance_to_point(&base_point) > reach {
                    continue;
                }
                let Some(dir) = segment.direction() else {
                    continue;
                };
                let normal = Vector2::new(-dir.y, dir.x);
                let id = Some(shape.id.clone());

                for d in [dir, -dir] {
                    push_unique(
                        &mut lines,
                        TrackingLine::from_direction(base_point, d, TrackingKind::Parallel, id.clone()),
                    );
                }
                for d in [normal, -normal] {
                    push_unique(
                        &mut lines,
                        TrackingLine::from_direction(
                            base_point,
                            d,
                            TrackingKind::Perpendicular,
                            id.clone(),
                        ),
                    );
                }
                push_unique(
                    &mut lines,
                    TrackingLine::from_direction(segment.end, dir, TrackingKind::Extension, id.clone()),
                );
                push_unique(
                    &mut lines,
                    TrackingLine::from_direction(segment.start, -dir, TrackingKind::Extension, id),
                );
            }
        }
    }

    lines
}

/// 把光标解析为最终输入点
///
/// 每次调用都重新计算，不跨调用缓存。没有任何命中时返回原始光标。
pub fn resolve(
    cursor: Point2<f64>,
    base_point: Option<Point2<f64>>,
    shapes: &[&Shape],
    settings: &EditorSettings,
    viewport: &Viewport,
) -> SnapResult {
    let tolerance = viewport.world_tolerance(settings.snap.tolerance);
    let tracked = match base_point {
        Some(base) if settings.tracking.is_active() => {
            let lines = tracking_lines(base, shapes, &settings.tracking, tolerance);
            track(cursor, &lines, tolerance)
        }
        _ => None,
    };

    let probe = tracked.as_ref().map(|r| r.point).unwrap_or(cursor);

    // 对象捕捉优先于追踪
    let mut engine = SnapEngine::new(settings.snap.clone());
    if let Some(snap) = engine.find_snap_point(probe, shapes, tolerance, base_point) {
        return SnapResult {
            point: snap.point,
            kind: SnapResultKind::Object(snap),
        };
    }

    tracked.unwrap_or_else(|| SnapResult::raw(cursor))
}

/// 追踪线上的候选点
fn track(cursor: Point2<f64>, lines: &[TrackingLine], tolerance: f64) -> Option<SnapResult> {
    let near: Vec<(&TrackingLine, Point2<f64>, f64)> = lines
        .iter()
        .filter_map(|line| {
            let foot = line.project(&cursor)?;
            let dist = (cursor - foot).norm();
            (dist <= tolerance).then_some((line, foot, dist))
        })
        .collect();

    // 交点优先：构造顺序中的第一对，共起点的射线不构成有意义的交点
    for (i, (first, _, _)) in near.iter().enumerate() {
        for (second, _, _) in &near[i + 1..] {
            if (first.origin - second.origin).norm() < EPSILON {
                continue;
            }
            if let Some(p) = first.intersection(second) {
                if (p - cursor).norm() <= 2.0 * tolerance {
                    return Some(SnapResult {
                        point: p,
                        kind: SnapResultKind::TrackingIntersection {
                            first: (*first).clone(),
                            second: (*second).clone(),
                        },
                    });
                }
            }
        }
    }

    near.into_iter()
        .min_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal))
        .map(|(line, foot, _)| SnapResult {
            point: foot,
            kind: SnapResultKind::Tracking { line: line.clone() },
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Geometry, Line};
    use crate::snap::{SnapMask, SnapType};
    use std::f64::consts::PI;

    fn line(id: &str, x1: f64, y1: f64, x2: f64, y2: f64) -> Shape {
        Shape::new(id, Geometry::Line(Line::new(Point2::new(x1, y1), Point2::new(x2, y2))))
    }

    #[test]
    fn test_polar_tracking_snaps_to_vertical() {
        let settings = EditorSettings::default();
        let result = resolve(
            Point2::new(0.3, 48.0),
            Some(Point2::new(0.0, 0.0)),
            &[],
            &settings,
            &Viewport::default(),
        );

        assert!((result.point - Point2::new(0.0, 48.0)).norm() < 1e-9);
        match result.kind {
            SnapResultKind::Tracking { line } => {
                assert_eq!(line.kind, TrackingKind::Polar);
                assert!((line.angle - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_ortho_lines() {
        let config = TrackingConfig {
            ortho_mode: true,
            ..TrackingConfig::default()
        };
        let lines = tracking_lines(Point2::new(1.0, 1.0), &[], &config, 1.0);
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| l.kind == TrackingKind::Polar));
    }

    #[test]
    fn test_tracking_ignores_points_behind_origin() {
        let settings = EditorSettings {
            tracking: TrackingConfig {
                ortho_mode: true,
                ..TrackingConfig::default()
            },
            ..EditorSettings::default()
        };
        let base = Point2::new(0.0, 0.0);
        let cases = [
            (Point2::new(-30.0, 2.0), PI, Point2::new(-30.0, 0.0)),
            (Point2::new(3.0, -40.0), 1.5 * PI, Point2::new(0.0, -40.0)),
            (Point2::new(25.0, 1.0), 0.0, Point2::new(25.0, 0.0)),
        ];
        for (cursor, angle, expected) in cases {
            let result = resolve(cursor, Some(base), &[], &settings, &Viewport::default());
            let SnapResultKind::Tracking { line } = &result.kind else {
                panic!("{cursor:?} not tracked: {:?}", result.kind);
            };
            // 落在射线正方向上，而不是反向延长线
            assert!((line.angle - angle).abs() < 1e-12, "{cursor:?}");
            assert!((result.point - line.origin).dot(&line.direction) >= 0.0);
            assert!((result.point - expected).norm() < 1e-9);
        }

        // 离所有射线都超出容差
        let far = Point2::new(20.0, 20.0);
        assert!(resolve(far, Some(base), &[], &settings, &Viewport::default()).is_raw());
    }

    #[test]
    fn test_polar_increment_has_lower_bound() {
        let config = TrackingConfig {
            polar_increment_deg: 1e-9,
            ..TrackingConfig::default()
        };
        let lines = tracking_lines(Point2::origin(), &[], &config, 1.0);
        assert_eq!(lines.len(), 360);
    }

    #[test]
    fn test_raw_without_base_point() {
        let settings = EditorSettings::default();
        let cursor = Point2::new(13.0, 7.0);
        let result = resolve(cursor, None, &[], &settings, &Viewport::default());
        assert!(result.is_raw());
        assert_eq!(result.point, cursor);
    }

    #[test]
    fn test_object_snap_beats_tracking() {
        let settings = EditorSettings::default();
        let l1 = line("L1", 2.0, 50.0, 20.0, 50.0);
        let result = resolve(
            Point2::new(1.0, 49.0),
            Some(Point2::new(0.0, 0.0)),
            &[&l1],
            &settings,
            &Viewport::default(),
        );
        let snap = result.snap_point().unwrap();
        assert_eq!(snap.snap_type, SnapType::Endpoint);
        assert_eq!(result.point, Point2::new(2.0, 50.0));
    }

    #[test]
    fn test_extension_and_polar_intersection() {
        // 水平线的延长线与基点的竖直极轴线相交于 (0, 10)
        let mut settings = EditorSettings::default();
        settings.tracking.object_tracking = true;
        settings.tracking.polar_increment_deg = 90.0;
        settings.snap.enabled_types = SnapMask::NONE;
        settings.snap.tolerance = 2.0;

        let l1 = line("L1", 5.0, 10.0, 20.0, 10.0);
        let lines = tracking_lines(Point2::new(0.0, 0.0), &[&l1], &settings.tracking, 2.0);
        assert!(lines.iter().all(|l| l.kind == TrackingKind::Polar));

        // 基点靠近线段时才生成对象追踪线
        let base = Point2::new(0.0, 9.0);
        let result = resolve(
            Point2::new(0.5, 10.5),
            Some(base),
            &[&l1],
            &settings,
            &Viewport::new(0.5, 0.0, 0.0),
        );
        match &result.kind {
            SnapResultKind::TrackingIntersection { first, second } => {
                assert_eq!(first.kind, TrackingKind::Polar);
                assert_eq!(second.kind, TrackingKind::Extension);
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!((result.point - Point2::new(0.0, 10.0)).norm() < 1e-9);
    }

    #[test]
    fn test_ray_intersection_requires_positive_parameters() {
        let a = TrackingLine::new(Point2::new(0.0, 0.0), 0.0, TrackingKind::Polar, None);
        let b = TrackingLine::new(Point2::new(5.0, 5.0), -std::f64::consts::FRAC_PI_2, TrackingKind::Polar, None);
        assert!((a.intersection(&b).unwrap() - Point2::new(5.0, 0.0)).norm() < 1e-9);

        let c = TrackingLine::new(Point2::new(5.0, 5.0), std::f64::consts::FRAC_PI_2, TrackingKind::Polar, None);
        assert!(a.intersection(&c).is_none());
    }
}
