//! 核心错误定义

use crate::shape::ShapeId;
use thiserror::Error;

/// 图形数据不满足不变量
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("negative radius: {0}")]
    NegativeRadius(f64),

    #[error("non-finite coordinate in {0}")]
    NonFinite(&'static str),

    #[error("{0} requires at least one point")]
    EmptyPoints(&'static str),

    #[error("negative size in {0}")]
    NegativeSize(&'static str),
}

/// 图形存储错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Shape not found: {0}")]
    ShapeNotFound(ShapeId),

    #[error("Duplicate shape id: {0}")]
    DuplicateId(ShapeId),

    #[error("Invalid geometry for {id}: {source}")]
    InvalidGeometry {
        id: ShapeId,
        #[source]
        source: GeometryError,
    },
}

/// 配置加载错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
