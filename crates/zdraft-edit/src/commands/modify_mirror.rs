//! 镜像命令
//!
//! 选择对象 → 镜像线第一点 → 第二点。
//! 默认保留源对象并添加镜像副本；`Erase` 选项原位镜像。

use super::{apply_to_selection, finish, ghosts, option_error, preamble, reference_line, wrong_phase};
use crate::command::{
    option_matches, Command, CommandContext, CommandError, CommandId, CommandInput,
    CommandOutcome, CommandState, Phase, PreviewShape,
};
use zdraft_core::math::{is_degenerate_segment, Point2};
use zdraft_core::store::ShapeLookup;
use zdraft_core::transform::Transform2D;

const ERASE: &str = "Erase";

/// 镜像命令
#[derive(Debug, Clone, Copy, Default)]
pub struct MirrorCommand;

impl Command for MirrorCommand {
    fn id(&self) -> CommandId {
        CommandId::Mirror
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
            (Phase::AwaitingPoint | Phase::AwaitingSecondPoint, CommandInput::Option(opt))
                if option_matches(opt, ERASE) =>
            {
                let mut next = state.clone();
                next.erase_source = !state.erase_source;
                Ok(CommandOutcome::advance(next))
            }
            (Phase::AwaitingPoint, CommandInput::Point(p)) => {
                let mut next = state.clone();
                next.base_point = Some(*p);
                next.phase = Phase::AwaitingSecondPoint;
                Ok(CommandOutcome::advance(next))
            }
            (Phase::AwaitingSecondPoint, CommandInput::Point(p)) => match state.base_point {
                Some(first) if is_degenerate_segment(first, *p) => {
                    Err(CommandError::DegenerateMirrorLine)
                }
                Some(first) => {
                    let mut next = state.clone();
                    next.second_point = Some(*p);
                    apply_to_selection(
                        &next,
                        ctx,
                        &Transform2D::mirror(first, *p),
                        !state.erase_source,
                        CommandState::idle(),
                    )
                    .inspect(|outcome| {
                        tracing::info!(
                            added = outcome.shapes_to_add.len(),
                            updated = outcome.shapes_to_update.len(),
                            "mirror"
                        );
                    })
                }
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
        match (state.phase, state.base_point) {
            (Phase::AwaitingSecondPoint, Some(first)) => {
                let mut previews = vec![reference_line("mirror", first, cursor)];
                if !is_degenerate_segment(first, cursor) {
                    previews.extend(ghosts(state, shapes, &Transform2D::mirror(first, cursor)));
                }
                previews
            }
            _ => Vec::new(),
        }
    }

    fn prompt(&self, state: &CommandState) -> (String, Vec<String>) {
        match state.phase {
            Phase::Selecting => ("选择要镜像的对象:".into(), vec![]),
            Phase::AwaitingPoint => (
                "指定镜像线的第一点 或 [删除源对象(E)]:".into(),
                vec![ERASE.into()],
            ),
            _ => ("指定镜像线的第二点:".into(), vec![ERASE.into()]),
        }
    }
}
