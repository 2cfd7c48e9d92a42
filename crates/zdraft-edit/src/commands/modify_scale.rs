//! 缩放命令
//!
//! 选择对象 → 缩放中心 → 比例因子，或参考点 → 目标点。
//! 目标点到中心的距离与参考点到中心的距离之比即为比例。

use super::{apply_to_selection, finish, ghosts, option_error, preamble, reference_line, wrong_phase};
use crate::command::{
    option_matches, Command, CommandContext, CommandError, CommandId, CommandInput,
    CommandOutcome, CommandState, Phase, PreviewShape,
};
use zdraft_core::math::{Point2, Vector2, EPSILON};
use zdraft_core::store::ShapeLookup;
use zdraft_core::transform::Transform2D;

const COPY: &str = "Copy";
const REFERENCE: &str = "Reference";

/// 缩放命令
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaleCommand;

impl ScaleCommand {
    fn commit(
        state: &CommandState,
        ctx: &mut CommandContext<'_>,
        center: Point2<f64>,
        factor: f64,
    ) -> Result<CommandOutcome, CommandError> {
        if !factor.is_finite() || factor <= EPSILON {
            return Err(CommandError::InvalidScaleFactor(factor));
        }
        let outcome = apply_to_selection(
            state,
            ctx,
            &Transform2D::scale(center, factor),
            state.copy,
            CommandState::idle(),
        )?;
        tracing::info!(factor, copy = state.copy, "scale");
        Ok(outcome)
    }

    fn reference_length(state: &CommandState, center: Point2<f64>) -> Option<f64> {
        state
            .reference_point
            .map(|r| (r - center).norm())
            .filter(|len| *len > EPSILON)
    }

    fn with_reference(state: &CommandState, reference: Point2<f64>) -> CommandOutcome {
        let mut next = state.clone();
        next.reference_point = Some(reference);
        next.phase = Phase::AwaitingThirdPoint;
        CommandOutcome::advance(next)
    }
}

impl Command for ScaleCommand {
    fn id(&self) -> CommandId {
        CommandId::Scale
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

        let center = state.base_point;
        let result = match (state.phase, &input, center) {
            (Phase::AwaitingPoint, CommandInput::Point(p), _) => {
                let mut next = state.clone();
                next.base_point = Some(*p);
                next.phase = Phase::AwaitingSecondPoint;
                Ok(CommandOutcome::advance(next))
            }
            (Phase::AwaitingSecondPoint, CommandInput::Option(opt), _) if option_matches(opt, COPY) => {
                let mut next = state.clone();
                next.copy = !state.copy;
                Ok(CommandOutcome::advance(next))
            }
            (Phase::AwaitingSecondPoint, CommandInput::Option(opt), _)
                if option_matches(opt, REFERENCE) =>
            {
                let mut next = state.clone();
                next.reference_mode = true;
                Ok(CommandOutcome::advance(next))
            }
            (Phase::AwaitingSecondPoint, CommandInput::Point(p), Some(c)) => {
                if (p - c).norm() <= EPSILON {
                    Err(CommandError::ZeroReference)
                } else {
                    Ok(Self::with_reference(state, *p))
                }
            }
            // 参考模式下输入的数值是参考长度
            (Phase::AwaitingSecondPoint, CommandInput::Value(len), Some(c)) if state.reference_mode => {
                if len.is_finite() && *len > EPSILON {
                    Ok(Self::with_reference(state, c + Vector2::new(*len, 0.0)))
                } else {
                    Err(CommandError::ZeroReference)
                }
            }
            (Phase::AwaitingSecondPoint, CommandInput::Value(factor), Some(c)) => {
                Self::commit(state, ctx, c, *factor)
            }
            (Phase::AwaitingThirdPoint, CommandInput::Point(p), Some(c)) => {
                match Self::reference_length(state, c) {
                    Some(reference) => Self::commit(state, ctx, c, (p - c).norm() / reference),
                    None => Err(CommandError::ZeroReference),
                }
            }
            (Phase::AwaitingThirdPoint, CommandInput::Value(len), Some(c)) => {
                match Self::reference_length(state, c) {
                    Some(reference) => Self::commit(state, ctx, c, len / reference),
                    None => Err(CommandError::ZeroReference),
                }
            }
            (_, CommandInput::Option(opt), _) => Err(option_error(self.id(), opt)),
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
        let Some(center) = state.base_point else {
            return Vec::new();
        };
        let mut previews = vec![reference_line("scale", center, cursor)];

        if state.phase == Phase::AwaitingThirdPoint {
            if let Some(reference) = Self::reference_length(state, center) {
                let factor = (cursor - center).norm() / reference;
                if factor > EPSILON {
                    previews.extend(ghosts(state, shapes, &Transform2D::scale(center, factor)));
                }
            }
        }

        previews
    }

    fn prompt(&self, state: &CommandState) -> (String, Vec<String>) {
        match state.phase {
            Phase::Selecting => ("选择要缩放的对象:".into(), vec![]),
            Phase::AwaitingPoint => ("指定缩放中心:".into(), vec![]),
            Phase::AwaitingSecondPoint if state.reference_mode => {
                ("指定参考长度:".into(), vec![])
            }
            Phase::AwaitingSecondPoint => (
                "指定缩放比例 或 [复制(C)/参考(R)]:".into(),
                vec![COPY.into(), REFERENCE.into()],
            ),
            _ => ("指定第二点:".into(), vec![]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::*;
    use zdraft_core::geometry::{Geometry, Line};
    use zdraft_core::shape::geometry_approx_eq;

    #[test]
    fn test_scale_by_factor() {
        let store = store(vec![line("L1", 1.0, 0.0, 2.0, 0.0)]);
        let outcome = run(
            &ScaleCommand,
            &store,
            vec![
                select(&["L1"]),
                CommandInput::Enter,
                pt(0.0, 0.0),
                CommandInput::Value(2.0),
            ],
        );
        assert!(outcome.state.is_idle());
        assert_eq!(
            geometry_of(&outcome, 0),
            &Geometry::Line(Line::new(Point2::new(2.0, 0.0), Point2::new(4.0, 0.0)))
        );
    }

    #[test]
    fn test_scale_by_reference_and_target() {
        let store = store(vec![line("L1", 0.0, 0.0, 10.0, 0.0)]);
        let outcome = run(
            &ScaleCommand,
            &store,
            vec![
                select(&["L1"]),
                CommandInput::Enter,
                pt(0.0, 0.0),
                pt(10.0, 0.0),
                pt(0.0, 5.0),
            ],
        );
        assert!(geometry_approx_eq(
            geometry_of(&outcome, 0),
            &Geometry::Line(Line::new(Point2::new(0.0, 0.0), Point2::new(5.0, 0.0))),
            1e-12
        ));
    }

    #[test]
    fn test_non_positive_factor_is_rejected() {
        let store = store(vec![line("L1", 0.0, 0.0, 10.0, 0.0)]);
        let state = run(
            &ScaleCommand,
            &store,
            vec![select(&["L1"]), CommandInput::Enter, pt(0.0, 0.0)],
        )
        .state;

        for factor in [0.0, -2.0, f64::NAN] {
            let outcome = step(&ScaleCommand, &store, &state, CommandInput::Value(factor));
            assert!(!outcome.success);
            assert_eq!(outcome.state, state);
            assert!(!outcome.has_changes());
        }

        let zero_reference = step(&ScaleCommand, &store, &state, pt(0.0, 0.0));
        assert!(!zero_reference.success);
    }

    #[test]
    fn test_scale_copy_keeps_original() {
        let store = store(vec![line("L1", 0.0, 0.0, 10.0, 0.0)]);
        let outcome = run(
            &ScaleCommand,
            &store,
            vec![
                select(&["L1"]),
                CommandInput::Enter,
                pt(0.0, 0.0),
                CommandInput::Option("C".into()),
                CommandInput::Value(0.5),
            ],
        );
        assert!(outcome.shapes_to_update.is_empty());
        assert_eq!(
            outcome.shapes_to_add[0].geometry,
            Geometry::Line(Line::new(Point2::new(0.0, 0.0), Point2::new(5.0, 0.0)))
        );
    }
}
