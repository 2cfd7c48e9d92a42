//! 命令状态机
//!
//! 每个编辑命令是一个无状态的转移函数：输入当前 [`CommandState`] 和一次用户输入，
//! 返回新的状态以及需要提交到图形存储的修改。命令本身从不直接修改存储，
//! 由会话把终结结果作为一次原子编辑提交。

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zdraft_core::math::Point2;
use zdraft_core::shape::{IdGenerator, Shape, ShapeId};
use zdraft_core::store::{Edit, ShapeLookup, ShapeUpdate};

/// 命令类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandId {
    Move,
    Copy,
    Rotate,
    Scale,
    Mirror,
    Erase,
}

impl CommandId {
    pub const ALL: [CommandId; 6] = [
        CommandId::Move,
        CommandId::Copy,
        CommandId::Rotate,
        CommandId::Scale,
        CommandId::Mirror,
        CommandId::Erase,
    ];

    /// 获取命令的名称
    pub fn name(&self) -> &'static str {
        match self {
            CommandId::Move => "MOVE",
            CommandId::Copy => "COPY",
            CommandId::Rotate => "ROTATE",
            CommandId::Scale => "SCALE",
            CommandId::Mirror => "MIRROR",
            CommandId::Erase => "ERASE",
        }
    }

    /// 获取快捷键
    pub fn shortcut(&self) -> &'static str {
        match self {
            CommandId::Move => "M",
            CommandId::Copy => "CO",
            CommandId::Rotate => "RO",
            CommandId::Scale => "SC",
            CommandId::Mirror => "MI",
            CommandId::Erase => "E",
        }
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 命令阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    /// 等待选择对象，回车确认
    Selecting,
    /// 等待第一个点（基点、中心、镜像线第一点）
    AwaitingPoint,
    AwaitingSecondPoint,
    AwaitingThirdPoint,
}

/// 命令输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CommandInput {
    /// 追加选择的图形
    Selection(Vec<ShapeId>),
    /// 回车：确认或进入下一阶段
    Enter,
    /// 世界坐标点
    Point(Point2<f64>),
    /// 命令选项，如 "Displacement"
    Option(String),
    /// 数值（角度、比例等）
    Value(f64),
    /// 取消
    Escape,
}

impl CommandInput {
    pub fn kind(&self) -> &'static str {
        match self {
            CommandInput::Selection(_) => "selection",
            CommandInput::Enter => "enter",
            CommandInput::Point(_) => "point",
            CommandInput::Option(_) => "option",
            CommandInput::Value(_) => "value",
            CommandInput::Escape => "escape",
        }
    }
}

/// 命令会话状态
///
/// 除公共字段外，还包含命令的中间数据（第二点、参考点、模式开关）。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommandState {
    pub active_command: Option<CommandId>,
    pub phase: Phase,
    /// 有序、无重复
    pub selected_ids: Vec<ShapeId>,
    pub base_point: Option<Point2<f64>>,
    pub prompt: String,
    pub options: Vec<String>,

    /// 第二个点（镜像线第二点等）
    pub second_point: Option<Point2<f64>>,
    /// 参考点（旋转参考角、缩放参考长度）
    pub reference_point: Option<Point2<f64>>,
    /// 保留原对象
    pub copy: bool,
    /// 镜像时删除源对象
    pub erase_source: bool,
    /// 复制多个
    pub multiple: bool,
    /// 下一个点作为位移
    pub displacement_mode: bool,
    /// 旋转参考模式
    pub reference_mode: bool,
    /// 多重复制已放置的次数
    pub placed: usize,
}

impl CommandState {
    /// 空闲状态
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// 追加选择，保持顺序并去重
    pub fn add_selection(&mut self, ids: &[ShapeId]) {
        for id in ids {
            if !self.selected_ids.contains(id) {
                self.selected_ids.push(id.clone());
            }
        }
    }
}

/// 命令错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("{command} does not accept {input} input while {phase:?}")]
    WrongPhase {
        command: CommandId,
        phase: Phase,
        input: &'static str,
    },

    #[error("No active command")]
    NoActiveCommand,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Nothing selected")]
    EmptySelection,

    #[error("Unknown option for {command}: {option}")]
    UnknownOption { command: CommandId, option: String },

    #[error("Scale factor must be positive, got {0}")]
    InvalidScaleFactor(f64),

    #[error("Reference length must be positive")]
    ZeroReference,

    #[error("Mirror line points must be distinct")]
    DegenerateMirrorLine,

    #[error("Shape not found: {0}")]
    UnknownShape(ShapeId),

    #[error("Invalid value: {0}")]
    InvalidValue(f64),
}

/// 命令执行上下文
pub struct CommandContext<'a> {
    /// 只读图形访问
    pub shapes: &'a dyn ShapeLookup,
    /// 复制命令生成新 ID
    pub ids: &'a mut dyn IdGenerator,
}

/// 一次转移的结果
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    pub success: bool,
    pub state: CommandState,
    pub shapes_to_update: Vec<ShapeUpdate>,
    pub shapes_to_add: Vec<Shape>,
    pub shapes_to_delete: Vec<ShapeId>,
    pub message: Option<String>,
}

impl CommandOutcome {
    /// 成功转移，没有修改
    pub fn advance(state: CommandState) -> Self {
        Self {
            success: true,
            state,
            shapes_to_update: Vec::new(),
            shapes_to_add: Vec::new(),
            shapes_to_delete: Vec::new(),
            message: None,
        }
    }

    /// 拒绝输入，状态保持不变
    pub fn rejected(state: &CommandState, error: CommandError) -> Self {
        Self {
            success: false,
            message: Some(error.to_string()),
            ..Self::advance(state.clone())
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn has_changes(&self) -> bool {
        !(self.shapes_to_update.is_empty()
            && self.shapes_to_add.is_empty()
            && self.shapes_to_delete.is_empty())
    }

    /// 转换为存储编辑
    pub fn to_edit(&self, description: impl Into<String>) -> Edit {
        Edit::new(description)
            .with_updates(self.shapes_to_update.clone())
            .with_added(self.shapes_to_add.clone())
            .with_deleted(self.shapes_to_delete.clone())
    }
}

/// 预览图形
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewShape {
    pub shape: Shape,
    /// 是否是参考线（虚线显示）
    pub is_reference: bool,
}

/// 预览图形 ID 的前缀
pub const PREVIEW_PREFIX: &str = "preview:";

impl PreviewShape {
    /// 源图形的变换预览
    pub fn ghost(mut shape: Shape) -> Self {
        shape.id = ShapeId::new(format!("{PREVIEW_PREFIX}{}", shape.id));
        Self {
            shape,
            is_reference: false,
        }
    }

    /// 参考线
    pub fn reference(name: &str, geometry: zdraft_core::geometry::Geometry) -> Self {
        Self {
            shape: Shape::new(format!("{PREVIEW_PREFIX}ref:{name}"), geometry),
            is_reference: true,
        }
    }
}

/// 编辑命令接口
pub trait Command {
    fn id(&self) -> CommandId;

    /// 开始命令；有预选对象时跳过选择阶段
    fn begin(&self, preselected: &[ShapeId]) -> CommandState {
        let mut state = CommandState {
            active_command: Some(self.id()),
            phase: if preselected.is_empty() {
                Phase::Selecting
            } else {
                Phase::AwaitingPoint
            },
            ..CommandState::default()
        };
        state.add_selection(preselected);
        self.with_prompt(state)
    }

    /// 处理一次输入
    fn handle_input(
        &self,
        state: &CommandState,
        input: CommandInput,
        ctx: &mut CommandContext<'_>,
    ) -> CommandOutcome;

    /// 生成预览，不修改任何图形
    fn preview(
        &self,
        state: &CommandState,
        cursor: Point2<f64>,
        shapes: &dyn ShapeLookup,
    ) -> Vec<PreviewShape>;

    /// 取消，回到空闲状态并清空选择
    fn cancel(&self, _state: &CommandState) -> CommandState {
        CommandState::idle()
    }

    /// 当前阶段的提示和可用选项
    fn prompt(&self, state: &CommandState) -> (String, Vec<String>);

    /// 填充提示文本
    fn with_prompt(&self, mut state: CommandState) -> CommandState {
        if state.is_idle() {
            state.prompt.clear();
            state.options.clear();
        } else {
            let (prompt, options) = self.prompt(&state);
            state.prompt = prompt;
            state.options = options;
        }
        state
    }
}

/// 选项匹配：完整名称或任意前缀（不区分大小写）
pub fn option_matches(input: &str, option: &str) -> bool {
    let input = input.trim().to_uppercase();
    !input.is_empty() && option.to_uppercase().starts_with(&input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_prefix_matching() {
        assert!(option_matches("d", "Displacement"));
        assert!(option_matches("DISP", "Displacement"));
        assert!(!option_matches("", "Displacement"));
        assert!(!option_matches("x", "Displacement"));
    }

    #[test]
    fn test_rejected_keeps_state() {
        let state = CommandState {
            active_command: Some(CommandId::Move),
            phase: Phase::Selecting,
            ..CommandState::default()
        };
        let outcome = CommandOutcome::rejected(&state, CommandError::EmptySelection);
        assert!(!outcome.success);
        assert_eq!(outcome.state, state);
        assert_eq!(outcome.message.as_deref(), Some("Nothing selected"));
    }

    #[test]
    fn test_preview_ids_are_tagged() {
        use zdraft_core::geometry::{Geometry, Point};
        let ghost = PreviewShape::ghost(Shape::new("L1", Geometry::Point(Point::new(0.0, 0.0))));
        assert_eq!(ghost.shape.id.as_str(), "preview:L1");
        assert!(!ghost.is_reference);
    }
}
