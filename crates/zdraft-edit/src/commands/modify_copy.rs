//! 复制命令
//!
//! 流程与移动相同，但保留原对象并生成新 ID 的副本。
//! `Multiple` 选项下可以连续放置，回车结束。

use super::{apply_to_selection, finish, ghosts, option_error, preamble, reference_line, wrong_phase};
use crate::command::{
    option_matches, Command, CommandContext, CommandError, CommandId, CommandInput,
    CommandOutcome, CommandState, Phase, PreviewShape,
};
use zdraft_core::math::{Point2, Vector2};
use zdraft_core::store::ShapeLookup;
use zdraft_core::transform::Transform2D;

const DISPLACEMENT: &str = "Displacement";
const MULTIPLE: &str = "Multiple";

/// 复制命令
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyCommand;

impl CopyCommand {
    fn place(
        state: &CommandState,
        ctx: &mut CommandContext<'_>,
        offset: Vector2<f64>,
    ) -> Result<CommandOutcome, CommandError> {
        // 多重复制时留在取点阶段
        let next = if state.multiple {
            let mut next = state.clone();
            next.placed += 1;
            next
        } else {
            CommandState::idle()
        };
        let outcome =
            apply_to_selection(state, ctx, &Transform2D::Translate(offset), true, next)?;
        tracing::info!(count = outcome.shapes_to_add.len(), dx = offset.x, dy = offset.y, "copy");
        Ok(outcome)
    }
}

impl Command for CopyCommand {
    fn id(&self) -> CommandId {
        CommandId::Copy
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
            (Phase::AwaitingPoint | Phase::AwaitingSecondPoint, CommandInput::Option(opt))
                if option_matches(opt, MULTIPLE) =>
            {
                let mut next = state.clone();
                next.multiple = true;
                Ok(CommandOutcome::advance(next))
            }
            (Phase::AwaitingPoint, CommandInput::Point(p)) if state.displacement_mode => {
                let mut next = state.clone();
                next.multiple = false;
                Self::place(&next, ctx, p.coords)
            }
            (Phase::AwaitingPoint, CommandInput::Point(p)) => {
                let mut next = state.clone();
                next.base_point = Some(*p);
                next.phase = Phase::AwaitingSecondPoint;
                Ok(CommandOutcome::advance(next))
            }
            (Phase::AwaitingSecondPoint, CommandInput::Point(p)) => match state.base_point {
                Some(base) => Self::place(state, ctx, p - base),
                None => Err(wrong_phase(state, &input)),
            },
            // 已经放置过副本时回车结束
            (Phase::AwaitingSecondPoint, CommandInput::Enter) if state.placed > 0 => {
                Ok(CommandOutcome::advance(CommandState::idle()))
            }
            (Phase::AwaitingSecondPoint, CommandInput::Enter) => match state.base_point {
                Some(base) => {
                    let mut single = state.clone();
                    single.multiple = false;
                    Self::place(&single, ctx, base.coords)
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
            (Phase::AwaitingSecondPoint, Some(base)) => {
                let mut previews = vec![reference_line("displacement", base, cursor)];
                previews.extend(ghosts(state, shapes, &Transform2D::Translate(cursor - base)));
                previews
            }
            (Phase::AwaitingPoint, _) if state.displacement_mode => {
                ghosts(state, shapes, &Transform2D::Translate(cursor.coords))
            }
            _ => Vec::new(),
        }
    }

    fn prompt(&self, state: &CommandState) -> (String, Vec<String>) {
        match state.phase {
            Phase::Selecting => ("选择要复制的对象:".into(), vec![]),
            Phase::AwaitingPoint if state.displacement_mode => ("指定位移:".into(), vec![]),
            Phase::AwaitingPoint => (
                "指定基点 或 [位移(D)/多个(M)]:".into(),
                vec![DISPLACEMENT.into(), MULTIPLE.into()],
            ),
            _ if state.placed > 0 => ("指定第二点 或 <退出>:".into(), vec![]),
            _ => (
                "指定第二点 或 <使用第一点作为位移>:".into(),
                vec![MULTIPLE.into()],
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::*;
    use zdraft_core::geometry::{Geometry, Line};

    #[test]
    fn test_copy_adds_fresh_shape() {
        let store = store(vec![line("L1", 0.0, 0.0, 10.0, 0.0)]);
        let outcome = run(
            &CopyCommand,
            &store,
            vec![select(&["L1"]), CommandInput::Enter, pt(0.0, 0.0), pt(0.0, 5.0)],
        );

        assert!(outcome.state.is_idle());
        assert!(outcome.shapes_to_update.is_empty());
        assert_eq!(outcome.shapes_to_add.len(), 1);
        let copy = &outcome.shapes_to_add[0];
        assert_ne!(copy.id.as_str(), "L1");
        assert_eq!(
            copy.geometry,
            Geometry::Line(Line::new(Point2::new(0.0, 5.0), Point2::new(10.0, 5.0)))
        );
    }

    #[test]
    fn test_multiple_copies_until_enter() {
        let store = store(vec![line("L1", 0.0, 0.0, 10.0, 0.0)]);
        let outcome = run(
            &CopyCommand,
            &store,
            vec![
                select(&["L1"]),
                CommandInput::Enter,
                CommandInput::Option("M".into()),
                pt(0.0, 0.0),
                pt(0.0, 5.0),
            ],
        );
        assert_eq!(outcome.state.phase, Phase::AwaitingSecondPoint);
        assert_eq!(outcome.state.placed, 1);
        assert_eq!(outcome.shapes_to_add.len(), 1);

        let second = step(&CopyCommand, &store, &outcome.state, pt(0.0, 10.0));
        assert!(second.success);
        assert_eq!(second.state.placed, 2);
        assert_eq!(
            second.shapes_to_add[0].geometry,
            Geometry::Line(Line::new(Point2::new(0.0, 10.0), Point2::new(10.0, 10.0)))
        );

        let done = step(&CopyCommand, &store, &second.state, CommandInput::Enter);
        assert!(done.success);
        assert!(done.state.is_idle());
        assert!(!done.has_changes());
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let store = store(vec![line("L1", 0.0, 0.0, 10.0, 0.0)]);
        let state = CopyCommand.begin(&["L1".into()]);
        let outcome = step(&CopyCommand, &store, &state, CommandInput::Option("Q".into()));
        assert!(!outcome.success);
        assert_eq!(outcome.state, state);
    }
}
