//! 编辑器设置
//!
//! 捕捉、追踪和空间索引的参数，可从 JSON 加载。缺省字段使用默认值。

use crate::error::ConfigError;
use crate::snap::SnapConfig;
use crate::spatial::QuadtreeConfig;
use crate::tracking::{TrackingConfig, MIN_POLAR_INCREMENT_DEG};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub snap: SnapConfig,
    pub tracking: TrackingConfig,
    pub quadtree: QuadtreeConfig,
}

impl EditorSettings {
    /// 从 JSON 字符串解析并校验
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: EditorSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 检查数值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("snap.tolerance", self.snap.tolerance)?;
        positive("snap.grid_spacing", self.snap.grid_spacing)?;
        let increment = self.tracking.polar_increment_deg;
        if !(MIN_POLAR_INCREMENT_DEG..=360.0).contains(&increment) {
            return Err(ConfigError::Invalid {
                name: "tracking.polar_increment_deg",
                reason: format!("{increment} is outside [{MIN_POLAR_INCREMENT_DEG}, 360]"),
            });
        }
        positive("tracking.object_tracking_factor", self.tracking.object_tracking_factor)?;
        if self.quadtree.max_items == 0 {
            return Err(ConfigError::Invalid {
                name: "quadtree.max_items",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            name,
            reason: format!("expected a positive number, got {value}"),
        })
    }
}
