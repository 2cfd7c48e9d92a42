//! 编辑命令实现
//!
//! 所有命令共享同样的外层流程：
//! - `Escape` 在任何阶段都回到空闲并清空选择
//! - `Selecting` 阶段接收选择输入，回车确认后进入取点阶段
//! - 阶段不接受的输入被拒绝，状态保持不变

mod modify_copy;
mod modify_erase;
mod modify_mirror;
mod modify_move;
mod modify_rotate;
mod modify_scale;

pub use modify_copy::CopyCommand;
pub use modify_erase::EraseCommand;
pub use modify_mirror::MirrorCommand;
pub use modify_move::MoveCommand;
pub use modify_rotate::RotateCommand;
pub use modify_scale::ScaleCommand;

use crate::command::{
    Command, CommandContext, CommandError, CommandId, CommandInput, CommandOutcome, CommandState,
    Phase, PreviewShape,
};
use zdraft_core::geometry::{Geometry, Line};
use zdraft_core::math::Point2;
use zdraft_core::shape::Shape;
use zdraft_core::store::{ShapeLookup, ShapeUpdate};
use zdraft_core::transform::Transform2D;

/// 按类型获取命令实现
pub fn command_for(id: CommandId) -> &'static dyn Command {
    match id {
        CommandId::Move => &MoveCommand,
        CommandId::Copy => &CopyCommand,
        CommandId::Rotate => &RotateCommand,
        CommandId::Scale => &ScaleCommand,
        CommandId::Mirror => &MirrorCommand,
        CommandId::Erase => &EraseCommand,
    }
}

/// 阶段不接受该输入
pub(crate) fn wrong_phase(state: &CommandState, input: &CommandInput) -> CommandError {
    match state.active_command {
        Some(command) => CommandError::WrongPhase {
            command,
            phase: state.phase,
            input: input.kind(),
        },
        None => CommandError::NoActiveCommand,
    }
}

/// 命令不认识该选项
pub(crate) fn option_error(command: CommandId, option: &str) -> CommandError {
    CommandError::UnknownOption {
        command,
        option: option.to_string(),
    }
}

/// 公共的前置处理：取消、空闲阶段和选择阶段
///
/// 返回 `None` 时由具体命令处理输入。
pub(crate) fn preamble(
    command: &dyn Command,
    state: &CommandState,
    input: &CommandInput,
) -> Option<CommandOutcome> {
    if matches!(input, CommandInput::Escape) {
        tracing::debug!(command = ?state.active_command, phase = ?state.phase, "command cancelled");
        return Some(CommandOutcome::advance(command.cancel(state)).with_message("*取消*"));
    }

    if state.is_idle() || state.active_command != Some(command.id()) {
        return Some(CommandOutcome::rejected(state, CommandError::NoActiveCommand));
    }

    if state.phase != Phase::Selecting {
        return None;
    }

    match input {
        CommandInput::Selection(ids) => {
            let mut next = state.clone();
            next.add_selection(ids);
            Some(CommandOutcome::advance(command.with_prompt(next)))
        }
        CommandInput::Enter if command.id() != CommandId::Erase => {
            if state.selected_ids.is_empty() {
                return Some(CommandOutcome::rejected(state, CommandError::EmptySelection));
            }
            let mut next = state.clone();
            next.phase = Phase::AwaitingPoint;
            Some(CommandOutcome::advance(command.with_prompt(next)))
        }
        CommandInput::Enter => None,
        _ => Some(CommandOutcome::rejected(state, wrong_phase(state, input))),
    }
}

/// 收尾：填充提示，失败时保持原状态
pub(crate) fn finish(
    command: &dyn Command,
    state: &CommandState,
    result: Result<CommandOutcome, CommandError>,
) -> CommandOutcome {
    match result {
        Ok(mut outcome) => {
            outcome.state = command.with_prompt(outcome.state);
            tracing::debug!(
                command = %command.id(),
                from = ?state.phase,
                to = ?outcome.state.phase,
                "command transition"
            );
            outcome
        }
        Err(error) => {
            tracing::warn!(command = %command.id(), phase = ?state.phase, %error, "input rejected");
            CommandOutcome::rejected(state, error)
        }
    }
}

/// 选中且存在的可编辑图形；锁定的图形被跳过
pub(crate) fn selected_shapes<'a>(
    state: &CommandState,
    shapes: &'a dyn ShapeLookup,
) -> Result<Vec<&'a Shape>, CommandError> {
    let mut result = Vec::with_capacity(state.selected_ids.len());
    for id in &state.selected_ids {
        let shape = shapes
            .get_shape(id)
            .ok_or_else(|| CommandError::UnknownShape(id.clone()))?;
        if shape.locked {
            tracing::warn!(shape = %id, "skipping locked shape");
            continue;
        }
        result.push(shape);
    }
    Ok(result)
}

/// 对选择集应用变换，生成终结结果
///
/// `keep_source` 为真时生成新 ID 的副本，否则原位更新几何。
pub(crate) fn apply_to_selection(
    state: &CommandState,
    ctx: &mut CommandContext<'_>,
    transform: &Transform2D,
    keep_source: bool,
    next: CommandState,
) -> Result<CommandOutcome, CommandError> {
    let shapes = selected_shapes(state, ctx.shapes)?;
    let mut outcome = CommandOutcome::advance(next);
    for shape in shapes {
        if keep_source {
            let copy = shape.clone_with(&mut *ctx.ids, None).transformed(transform);
            outcome.shapes_to_add.push(copy);
        } else {
            outcome
                .shapes_to_update
                .push(ShapeUpdate::geometry(shape.id.clone(), transform.apply(&shape.geometry)));
        }
    }
    Ok(outcome)
}

/// 选择集的变换预览
pub(crate) fn ghosts(
    state: &CommandState,
    shapes: &dyn ShapeLookup,
    transform: &Transform2D,
) -> Vec<PreviewShape> {
    state
        .selected_ids
        .iter()
        .filter_map(|id| shapes.get_shape(id))
        .filter(|s| !s.locked)
        .map(|s| PreviewShape::ghost(s.transformed(transform)))
        .collect()
}

/// 两点之间的参考线
pub(crate) fn reference_line(name: &str, from: Point2<f64>, to: Point2<f64>) -> PreviewShape {
    PreviewShape::reference(name, Geometry::Line(Line::new(from, to)))
}

/// 中心到点的方向角
pub(crate) fn angle_from(center: Point2<f64>, point: Point2<f64>) -> f64 {
    (point.y - center.y).atan2(point.x - center.x)
}

#[cfg(test)]
pub(crate) mod testing {
    //! 命令测试的公共夹具
    use super::*;
    use zdraft_core::geometry::Line;
    use zdraft_core::shape::SequentialIds;
    use zdraft_core::store::MemoryStore;

    pub fn line(id: &str, x1: f64, y1: f64, x2: f64, y2: f64) -> Shape {
        Shape::new(id, Geometry::Line(Line::new(Point2::new(x1, y1), Point2::new(x2, y2))))
    }

    pub fn store(shapes: Vec<Shape>) -> MemoryStore {
        MemoryStore::from_shapes(shapes).unwrap()
    }

    /// 依次输入，每一步都必须成功，返回最后的结果
    pub fn run(
        command: &dyn Command,
        store: &MemoryStore,
        inputs: Vec<CommandInput>,
    ) -> CommandOutcome {
        let mut ids = SequentialIds::new("new");
        let mut state = command.begin(&[]);
        let mut last = CommandOutcome::advance(state.clone());
        for input in inputs {
            let mut ctx = CommandContext {
                shapes: store,
                ids: &mut ids,
            };
            last = command.handle_input(&state, input.clone(), &mut ctx);
            assert!(last.success, "{input:?} rejected: {:?}", last.message);
            state = last.state.clone();
        }
        last
    }

    pub fn step(
        command: &dyn Command,
        store: &MemoryStore,
        state: &CommandState,
        input: CommandInput,
    ) -> CommandOutcome {
        let mut ids = SequentialIds::new("new");
        let mut ctx = CommandContext {
            shapes: store,
            ids: &mut ids,
        };
        command.handle_input(state, input, &mut ctx)
    }

    pub fn geometry_of(outcome: &CommandOutcome, index: usize) -> &Geometry {
        outcome.shapes_to_update[index]
            .geometry
            .as_ref()
            .expect("update carries geometry")
    }

    pub fn pt(x: f64, y: f64) -> CommandInput {
        CommandInput::Point(Point2::new(x, y))
    }

    pub fn select(ids: &[&str]) -> CommandInput {
        CommandInput::Selection(ids.iter().map(|s| (*s).into()).collect())
    }
}
