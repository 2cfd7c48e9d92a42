//! 删除命令：选择对象，回车删除

use super::{finish, preamble, selected_shapes, wrong_phase};
use crate::command::{
    Command, CommandContext, CommandError, CommandId, CommandInput, CommandOutcome, CommandState,
    Phase, PreviewShape,
};
use zdraft_core::math::Point2;
use zdraft_core::shape::ShapeId;
use zdraft_core::store::ShapeLookup;

/// 删除命令
#[derive(Debug, Clone, Copy, Default)]
pub struct EraseCommand;

impl Command for EraseCommand {
    fn id(&self) -> CommandId {
        CommandId::Erase
    }

    /// 预选对象也停留在选择阶段，等待回车确认
    fn begin(&self, preselected: &[ShapeId]) -> CommandState {
        let mut state = CommandState {
            active_command: Some(self.id()),
            phase: Phase::Selecting,
            ..CommandState::default()
        };
        state.add_selection(preselected);
        self.with_prompt(state)
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
            (Phase::Selecting, CommandInput::Enter) if state.selected_ids.is_empty() => {
                Err(CommandError::EmptySelection)
            }
            (Phase::Selecting, CommandInput::Enter) => {
                selected_shapes(state, ctx.shapes).map(|shapes| {
                    let mut outcome = CommandOutcome::advance(CommandState::idle());
                    outcome.shapes_to_delete = shapes.iter().map(|s| s.id.clone()).collect();
                    tracing::info!(count = outcome.shapes_to_delete.len(), "erase");
                    outcome
                })
            }
            _ => Err(wrong_phase(state, &input)),
        };

        finish(self, state, result)
    }

    fn preview(
        &self,
        _state: &CommandState,
        _cursor: Point2<f64>,
        _shapes: &dyn ShapeLookup,
    ) -> Vec<PreviewShape> {
        Vec::new()
    }

    fn prompt(&self, _state: &CommandState) -> (String, Vec<String>) {
        ("选择要删除的对象:".into(), vec![])
    }
}
