//! ZDRAFT 核心几何引擎
//!
//! 提供2D几何图元、变换操作、空间查询、对象捕捉与追踪、选择和夹点编辑。
//!
//! # 架构设计
//!
//! - `Shape`: 带稳定 ID 的图形，几何数据放在 `Geometry` 枚举中
//! - `Transform2D`: 平移、旋转、缩放、镜像，纯函数
//! - `Quadtree`: 按图纸构建的保守空间索引
//! - `tracking::resolve`: 光标到输入点的解析（追踪 + 对象捕捉）
//! - `store`: 图形存储、选择集、撤销历史的接口与内存实现
//!
//! # 示例
//!
//! ```rust
//! use zdraft_core::prelude::*;
//!
//! // 创建一条线段
//! let line = Line::new(Point2::origin(), Point2::new(100.0, 50.0));
//!
//! // 计算长度
//! println!("Length: {}", line.length());
//! ```

pub mod error;
pub mod geometry;
pub mod grips;
pub mod math;
pub mod selection;
pub mod settings;
pub mod shape;
pub mod snap;
pub mod spatial;
pub mod store;
pub mod tracking;
pub mod transform;
pub mod viewport;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::error::{ConfigError, GeometryError, StoreError};
    pub use crate::geometry::{
        Arc, Circle, Dimension, Ellipse, Geometry, Hatch, Line, Point, Polyline, PolylineVertex,
        Rectangle, Spline, Text, TextAlignment,
    };
    pub use crate::grips::{drag_grip, grips, Grip, GripKind};
    pub use crate::math::{BoundingBox2, Point2, Vector2};
    pub use crate::selection::{box_select, pick_at, SelectionBox, SelectionMode, SelectionSet};
    pub use crate::settings::EditorSettings;
    pub use crate::shape::{
        DrawingId, IdGenerator, LayerId, SequentialIds, Shape, ShapeId, Style, UuidIds,
    };
    pub use crate::snap::{SnapConfig, SnapEngine, SnapMask, SnapPoint, SnapType};
    pub use crate::spatial::{IndexedDrawing, Quadtree, QuadtreeConfig};
    pub use crate::store::{
        Edit, EditHistory, History, MemoryStore, SelectionState, ShapeLookup, ShapeStore,
        ShapeUpdate,
    };
    pub use crate::tracking::{resolve, SnapResult, SnapResultKind, TrackingConfig, TrackingLine};
    pub use crate::transform::Transform2D;
    pub use crate::viewport::Viewport;
}
