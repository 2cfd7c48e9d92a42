//! 端到端场景：命令、取消、捕捉和追踪经过编辑会话

use zdraft_core::geometry::{Geometry, Line};
use zdraft_core::math::Point2;
use zdraft_core::settings::EditorSettings;
use zdraft_core::shape::{geometry_approx_eq, SequentialIds, Shape, ShapeId};
use zdraft_core::snap::SnapType;
use zdraft_core::store::{EditHistory, MemoryStore, ShapeLookup};
use zdraft_core::tracking::{SnapResultKind, TrackingKind};
use zdraft_core::viewport::Viewport;
use zdraft_edit::{
    command_for, CommandContext, CommandId, CommandInput, CommandState, EditorSession, Phase,
};

fn line(id: &str, x1: f64, y1: f64, x2: f64, y2: f64) -> Shape {
    Shape::new(id, Geometry::Line(Line::new(Point2::new(x1, y1), Point2::new(x2, y2))))
}

fn session(shapes: Vec<Shape>) -> EditorSession {
    EditorSession::new(
        MemoryStore::from_shapes(shapes).unwrap(),
        EditHistory::default(),
        EditorSettings::default(),
    )
    .with_id_generator(SequentialIds::new("n"))
}

#[test]
fn move_line_by_five_five() {
    let mut s = session(vec![line("L1", 0.0, 0.0, 10.0, 0.0)]);
    s.start_command(CommandId::Move);
    for input in [
        CommandInput::Selection(vec!["L1".into()]),
        CommandInput::Enter,
        CommandInput::Point(Point2::new(0.0, 0.0)),
        CommandInput::Point(Point2::new(5.0, 5.0)),
    ] {
        let outcome = s.handle_input(input).unwrap();
        assert!(outcome.success, "{:?}", outcome.message);
    }

    assert_eq!(s.state().phase, Phase::Idle);
    assert_eq!(
        s.store().get_shape(&"L1".into()).unwrap().geometry,
        Geometry::Line(Line::new(Point2::new(5.0, 5.0), Point2::new(15.0, 5.0)))
    );
    assert_eq!(s.store().shape_count(), 1);
}

/// 每个命令在每个可达阶段按 Escape 都回到空闲并清空选择
#[test]
fn escape_cancels_from_every_phase() {
    let store = MemoryStore::from_shapes(vec![line("L1", 0.0, 0.0, 10.0, 0.0)]).unwrap();
    let mut ids = SequentialIds::new("n");

    let script = [
        CommandInput::Selection(vec!["L1".into()]),
        CommandInput::Enter,
        CommandInput::Point(Point2::new(1.0, 1.0)),
        CommandInput::Option("Reference".into()),
        CommandInput::Point(Point2::new(3.0, 1.0)),
    ];

    for id in CommandId::ALL {
        let command = command_for(id);
        let mut state = command.begin(&[]);
        let mut phases = Vec::new();

        for input in script.iter().cloned().map(Some).chain([None]) {
            if state.is_idle() {
                break;
            }
            if !phases.contains(&state.phase) {
                phases.push(state.phase);
                let mut ctx = CommandContext {
                    shapes: &store,
                    ids: &mut ids,
                };
                let cancelled = command.handle_input(&state, CommandInput::Escape, &mut ctx);
                assert!(cancelled.success, "{id} {:?}", state.phase);
                assert_eq!(cancelled.state, CommandState::idle(), "{id} {:?}", state.phase);
                assert!(!cancelled.has_changes());
            }

            let Some(input) = input else { break };
            let mut ctx = CommandContext {
                shapes: &store,
                ids: &mut ids,
            };
            let outcome = command.handle_input(&state, input, &mut ctx);
            if outcome.success {
                state = outcome.state;
            }
        }
        assert!(phases.contains(&Phase::Selecting), "{id}");
        if id == CommandId::Rotate {
            assert!(phases.contains(&Phase::AwaitingThirdPoint));
        }
    }

    // 参考缩放能到达第三个阶段
    let command = command_for(CommandId::Scale);
    let mut state = command.begin(&["L1".into()]);
    for input in [
        CommandInput::Point(Point2::new(0.0, 0.0)),
        CommandInput::Point(Point2::new(2.0, 0.0)),
    ] {
        let mut ctx = CommandContext {
            shapes: &store,
            ids: &mut ids,
        };
        state = command.handle_input(&state, input, &mut ctx).state;
    }
    assert_eq!(state.phase, Phase::AwaitingThirdPoint);
    let mut ctx = CommandContext {
        shapes: &store,
        ids: &mut ids,
    };
    let cancelled = command.handle_input(&state, CommandInput::Escape, &mut ctx);
    assert_eq!(cancelled.state, CommandState::idle());
    assert_eq!(store.revision(), 1);
}

#[test]
fn endpoint_snap_through_session() {
    let mut s = session(vec![line("L1", 0.0, 50.0, 100.0, 50.0)]);
    // 10 像素容差在 20 倍缩放下是 0.5 个世界单位
    let viewport = Viewport::new(20.0, 0.0, 0.0);
    s.set_viewport(viewport);

    let screen = viewport.world_to_screen(Point2::new(100.2, 49.9));
    let result = s.resolve_cursor(screen);

    assert!((result.point - Point2::new(100.0, 50.0)).norm() < 1e-9);
    let snap = result.snap_point().expect("object snap");
    assert_eq!(snap.snap_type, SnapType::Endpoint);
    assert_eq!(snap.source_shape_id, Some(ShapeId::from("L1")));
}

#[test]
fn polar_tracking_through_session() {
    let mut s = session(vec![line("L1", 0.0, 0.0, 10.0, 0.0)]);
    s.start_command(CommandId::Move);
    s.handle_input(CommandInput::Selection(vec!["L1".into()])).unwrap();
    s.handle_input(CommandInput::Enter).unwrap();
    s.handle_input(CommandInput::Point(Point2::new(0.0, 0.0))).unwrap();

    let screen = s.viewport().world_to_screen(Point2::new(0.3, 48.0));
    let result = s.resolve_cursor(screen);
    assert!((result.point - Point2::new(0.0, 48.0)).norm() < 1e-9);
    let SnapResultKind::Tracking { line } = &result.kind else {
        panic!("expected tracking, got {:?}", result.kind);
    };
    assert_eq!(line.kind, TrackingKind::Polar);
    assert!((line.angle - std::f64::consts::FRAC_PI_2).abs() < 1e-12);

    // 预览显示参考线和移动后的图形
    let previews = s.preview(screen);
    assert_eq!(previews.len(), 2);

    // 单击使用解析后的点
    s.click(screen, false).unwrap();
    assert!(geometry_approx_eq(
        &s.store().get_shape(&"L1".into()).unwrap().geometry,
        &Geometry::Line(Line::new(Point2::new(0.0, 48.0), Point2::new(10.0, 48.0))),
        1e-9
    ));
}

#[test]
fn mirror_and_undo_restore_shape_count() {
    let mut s = session(vec![line("L1", 1.0, 0.0, 3.0, 2.0)]);
    for text in ["MI", "", "0,-1", "0,1"] {
        if text.is_empty() {
            s.handle_input(CommandInput::Selection(vec!["L1".into()])).unwrap();
        }
        s.handle_text(text).unwrap();
    }
    assert!(s.state().is_idle());
    assert_eq!(s.store().shape_count(), 2);
    assert!(s.store().get_shape(&"n1".into()).is_some());

    assert!(s.handle_text("u").unwrap().success);
    assert_eq!(s.store().shape_count(), 1);
}

#[test]
fn starting_a_command_discards_the_active_one() {
    let mut s = session(vec![line("L1", 0.0, 0.0, 10.0, 0.0)]);
    s.start_command(CommandId::Rotate);
    s.handle_input(CommandInput::Selection(vec!["L1".into()])).unwrap();
    s.handle_input(CommandInput::Enter).unwrap();
    s.handle_input(CommandInput::Point(Point2::new(1.0, 1.0))).unwrap();
    assert_eq!(s.state().phase, Phase::AwaitingSecondPoint);

    // 选择集作为新命令的预选对象
    let state = s.start_command(CommandId::Copy).clone();
    assert_eq!(state.active_command, Some(CommandId::Copy));
    assert_eq!(state.phase, Phase::AwaitingPoint);
    assert_eq!(state.base_point, None);
    assert_eq!(state.selected_ids, vec![ShapeId::from("L1")]);

    s.handle_input(CommandInput::Escape).unwrap();
    assert!(s.state().is_idle());
    assert!(s.selection().is_empty());
}

#[test]
fn undo_erase_keeps_topmost_pick() {
    // 两条重叠线段，L2 在上
    let mut s = session(vec![
        line("L1", 0.0, 0.0, 10.0, 0.0),
        line("L2", 0.0, 0.0, 10.0, 0.0),
        line("L3", 50.0, 50.0, 60.0, 50.0),
    ]);
    let screen = s.viewport().world_to_screen(Point2::new(5.0, 0.0));
    assert_eq!(s.pick(screen), Some(ShapeId::from("L2")));

    s.start_command(CommandId::Erase);
    s.handle_input(CommandInput::Selection(vec!["L1".into()])).unwrap();
    s.handle_input(CommandInput::Enter).unwrap();
    assert_eq!(s.store().shape_count(), 2);

    assert!(s.undo().unwrap());
    let order: Vec<_> = s.store().shapes().map(|shape| shape.id.clone()).collect();
    assert_eq!(order, vec![ShapeId::from("L1"), "L2".into(), "L3".into()]);
    assert_eq!(s.pick(screen), Some(ShapeId::from("L2")));
}
