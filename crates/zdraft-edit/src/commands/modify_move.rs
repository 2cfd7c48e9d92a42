//! 移动命令
//!
//! 选择对象 → 基点 → 目标点。
//! - `Displacement` 选项：下一个点直接作为位移向量
//! - 目标点阶段回车：把基点坐标当作位移

use super::{apply_to_selection, finish, ghosts, option_error, preamble, reference_line, wrong_phase};
use crate::command::{
    option_matches, Command, CommandContext, CommandId, CommandInput, CommandOutcome,
    CommandState, Phase, PreviewShape,
};
use zdraft_core::math::{Point2, Vector2};
use zdraft_core::store::ShapeLookup;
use zdraft_core::transform::Transform2D;

const DISPLACEMENT: &str = "Displacement";

/// 移动命令
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveCommand;

impl MoveCommand {
    fn commit(
        state: &CommandState,
        ctx: &mut CommandContext<'_>,
        offset: Vector2<f64>,
    ) -> Result<CommandOutcome, crate::command::CommandError> {
        let outcome = apply_to_selection(
            state,
            ctx,
            &Transform2D::Translate(offset),
            false,
            CommandState::idle(),
        )?;
        tracing::info!(count = outcome.shapes_to_update.len(), dx = offset.x, dy = offset.y, "move");
        Ok(outcome)
    }
}

impl Command for MoveCommand {
    fn id(&self) -> CommandId {
        CommandId::Move
    }

    fn handle_input(
        &self,
        state: &CommandState,
        input: CommandInput,
        ctx: &mut CommandContext<'_>,
    ) -> CommandOutcome {
        if let Some(outcome) = preamble(self, state, &input) {
            return outcome;
        }

        let result = match (state.phase, &input) {
            (Phase::AwaitingPoint, CommandInput::Option(opt)) if option_matches(opt, DISPLACEMENT) => {
                let mut next = state.clone();
                next.displacement_mode = true;
                Ok(CommandOutcome::advance(next))
            }
            (Phase::AwaitingPoint, CommandInput::Point(p)) if state.displacement_mode => {
                Self::commit(state, ctx, p.coords)
            }
            (Phase::AwaitingPoint, CommandInput::Point(p)) => {
                let mut next = state.clone();
                next.base_point = Some(*p);
                next.phase = Phase::AwaitingSecondPoint;
                Ok(CommandOutcome::advance(next))
            }
            (Phase::AwaitingSecondPoint, CommandInput::Point(p)) => match state.base_point {
                Some(base) => Self::commit(state, ctx, p - base),
                None => Err(wrong_phase(state, &input)),
            },
            (Phase::AwaitingSecondPoint, CommandInput::Enter) => match state.base_point {
                Some(base) => Self::commit(state, ctx, base.coords),
                None => Err(wrong_phase(state, &input)),
            },
            (_, CommandInput::Option(opt)) => Err(option_error(self.id(), opt)),
            _ => Err(wrong_phase(state, &input)),
        };

        finish(self, state, result)
    }

    fn preview(
        &self,
        state: &CommandState,
        cursor: Point2<f64>,
        shapes: &dyn ShapeLookup,
    ) -> Vec<PreviewShape> {
        let mut previews = Vec::new();

        if state.phase == Phase::AwaitingSecondPoint {
            if let Some(base) = state.base_point {
                // 绘制从基点到目标点的参考线
                previews.push(reference_line("displacement", base, cursor));
                previews.extend(ghosts(state, shapes, &Transform2D::Translate(cursor - base)));
            }
        } else if state.phase == Phase::AwaitingPoint && state.displacement_mode {
            previews.push(reference_line("displacement", Point2::origin(), cursor));
            previews.extend(ghosts(state, shapes, &Transform2D::Translate(cursor.coords)));
        }

        previews
    }

    fn prompt(&self, state: &CommandState) -> (String, Vec<String>) {
        match state.phase {
            Phase::Selecting => ("选择要移动的对象:".into(), vec![]),
            Phase::AwaitingPoint if state.displacement_mode => ("指定位移:".into(), vec![]),
            Phase::AwaitingPoint => ("指定基点 或 [位移(D)]:".into(), vec![DISPLACEMENT.into()]),
            _ => ("指定第二点 或 <使用第一点作为位移>:".into(), vec![]),
        }
    }
}
