//! 旋转命令
//!
//! 选择对象 → 旋转中心 → 角度点或输入角度（度）。
//! `Reference` 选项先指定参考方向，再指定新方向，旋转两者之差。

use super::{angle_from, apply_to_selection, finish, ghosts, option_error, preamble, reference_line, wrong_phase};
use crate::command::{
    option_matches, Command, CommandContext, CommandError, CommandId, CommandInput,
    CommandOutcome, CommandState, Phase, PreviewShape,
};
use zdraft_core::math::{Point2, Vector2, EPSILON};
use zdraft_core::store::ShapeLookup;
use zdraft_core::transform::Transform2D;

const COPY: &str = "Copy";
const REFERENCE: &str = "Reference";

/// 旋转命令
#[derive(Debug, Clone, Copy, Default)]
pub struct RotateCommand;

impl RotateCommand {
    fn commit(
        state: &CommandState,
        ctx: &mut CommandContext<'_>,
        center: Point2<f64>,
        angle: f64,
    ) -> Result<CommandOutcome, CommandError> {
        if !angle.is_finite() {
            return Err(CommandError::InvalidValue(angle));
        }
        let outcome = apply_to_selection(
            state,
            ctx,
            &Transform2D::rotate(center, angle),
            state.copy,
            CommandState::idle(),
        )?;
        tracing::info!(degrees = angle.to_degrees(), copy = state.copy, "rotate");
        Ok(outcome)
    }

    /// 参考方向的角度
    fn reference_angle(state: &CommandState, center: Point2<f64>) -> Option<f64> {
        state.reference_point.map(|r| angle_from(center, r))
    }
}

impl Command for RotateCommand {
    fn id(&self) -> CommandId {
        CommandId::Rotate
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
            (Phase::AwaitingSecondPoint, CommandInput::Point(p), Some(c)) if state.reference_mode => {
                if (p - c).norm() < EPSILON {
                    Err(CommandError::ZeroReference)
                } else {
                    let mut next = state.clone();
                    next.reference_point = Some(*p);
                    next.phase = Phase::AwaitingThirdPoint;
                    Ok(CommandOutcome::advance(next))
                }
            }
            // 参考模式下输入的数值是参考角度
            (Phase::AwaitingSecondPoint, CommandInput::Value(deg), Some(c)) if state.reference_mode => {
                if deg.is_finite() {
                    let rad = deg.to_radians();
                    let mut next = state.clone();
                    next.reference_point = Some(c + Vector2::new(rad.cos(), rad.sin()));
                    next.phase = Phase::AwaitingThirdPoint;
                    Ok(CommandOutcome::advance(next))
                } else {
                    Err(CommandError::InvalidValue(*deg))
                }
            }
            (Phase::AwaitingSecondPoint, CommandInput::Point(p), Some(c)) => {
                Self::commit(state, ctx, c, angle_from(c, *p))
            }
            (Phase::AwaitingSecondPoint, CommandInput::Value(deg), Some(c)) => {
                Self::commit(state, ctx, c, deg.to_radians())
            }
            (Phase::AwaitingThirdPoint, CommandInput::Point(p), Some(c)) => {
                match Self::reference_angle(state, c) {
                    Some(reference) => Self::commit(state, ctx, c, angle_from(c, *p) - reference),
                    None => Err(wrong_phase(state, &input)),
                }
            }
            (Phase::AwaitingThirdPoint, CommandInput::Value(deg), Some(c)) => {
                match Self::reference_angle(state, c) {
                    Some(reference) => Self::commit(state, ctx, c, deg.to_radians() - reference),
                    None => Err(wrong_phase(state, &input)),
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

        let angle = match state.phase {
            Phase::AwaitingSecondPoint if !state.reference_mode => angle_from(center, cursor),
            Phase::AwaitingThirdPoint => match Self::reference_angle(state, center) {
                Some(reference) => angle_from(center, cursor) - reference,
                None => return Vec::new(),
            },
            _ => return vec![reference_line("rotation", center, cursor)],
        };

        let mut previews = vec![reference_line("rotation", center, cursor)];
        previews.extend(ghosts(state, shapes, &Transform2D::rotate(center, angle)));
        previews
    }

    fn prompt(&self, state: &CommandState) -> (String, Vec<String>) {
        match state.phase {
            Phase::Selecting => ("选择要旋转的对象:".into(), vec![]),
            Phase::AwaitingPoint => ("指定旋转中心:".into(), vec![]),
            Phase::AwaitingSecondPoint if state.reference_mode => {
                ("指定参考角度:".into(), vec![])
            }
            Phase::AwaitingSecondPoint => (
                "指定旋转角度 或 [复制(C)/参考(R)]:".into(),
                vec![COPY.into(), REFERENCE.into()],
            ),
            _ => ("指定新角度:".into(), vec![]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::*;
    use zdraft_core::geometry::Geometry;
    use zdraft_core::shape::geometry_approx_eq;

    fn expected(x1: f64, y1: f64, x2: f64, y2: f64) -> Geometry {
        line("_", x1, y1, x2, y2).geometry
    }

    #[test]
    fn test_rotate_by_point() {
        let store = store(vec![line("L1", 0.0, 0.0, 10.0, 0.0)]);
        let outcome = run(
            &RotateCommand,
            &store,
            vec![select(&["L1"]), CommandInput::Enter, pt(0.0, 0.0), pt(0.0, 3.0)],
        );
        assert!(outcome.state.is_idle());
        assert!(geometry_approx_eq(
            geometry_of(&outcome, 0),
            &expected(0.0, 0.0, 0.0, 10.0),
            1e-9
        ));
    }

    #[test]
    fn test_rotate_by_typed_degrees_with_copy() {
        let store = store(vec![line("L1", 0.0, 0.0, 10.0, 0.0)]);
        let outcome = run(
            &RotateCommand,
            &store,
            vec![
                select(&["L1"]),
                CommandInput::Enter,
                pt(0.0, 0.0),
                CommandInput::Option("c".into()),
                CommandInput::Value(180.0),
            ],
        );
        assert!(outcome.shapes_to_update.is_empty());
        assert_eq!(outcome.shapes_to_add.len(), 1);
        assert!(geometry_approx_eq(
            &outcome.shapes_to_add[0].geometry,
            &expected(0.0, 0.0, -10.0, 0.0),
            1e-9
        ));
    }

    #[test]
    fn test_reference_rotation() {
        let store = store(vec![line("L1", 0.0, 0.0, 10.0, 10.0)]);
        // 参考方向 45°，新方向 90°，实际旋转 45°
        let outcome = run(
            &RotateCommand,
            &store,
            vec![
                select(&["L1"]),
                CommandInput::Enter,
                pt(0.0, 0.0),
                CommandInput::Option("R".into()),
                pt(5.0, 5.0),
                CommandInput::Value(90.0),
            ],
        );
        let s = 200.0_f64.sqrt();
        assert!(geometry_approx_eq(
            geometry_of(&outcome, 0),
            &expected(0.0, 0.0, 0.0, s),
            1e-9
        ));
    }

    #[test]
    fn test_reference_point_at_center_is_rejected() {
        let store = store(vec![line("L1", 0.0, 0.0, 10.0, 0.0)]);
        let state = run(
            &RotateCommand,
            &store,
            vec![
                select(&["L1"]),
                CommandInput::Enter,
                pt(1.0, 1.0),
                CommandInput::Option("Reference".into()),
            ],
        )
        .state;
        let outcome = step(&RotateCommand, &store, &state, pt(1.0, 1.0));
        assert!(!outcome.success);
        assert_eq!(outcome.state, state);
    }
}
