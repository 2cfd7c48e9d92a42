//! 编辑会话
//!
//! 把命令状态机、图形存储、选择集、撤销历史、捕捉追踪和视口连接在一起。
//! 事件按到达顺序同步处理；命令的终结结果作为一次编辑原子地提交并记录到历史。

use crate::command::{
    Command, CommandContext, CommandError, CommandId, CommandInput, CommandOutcome, CommandState,
    Phase, PreviewShape,
};
use crate::command_registry::CommandRegistry;
use crate::commands::command_for;
use crate::input_parser::{InputParser, ParseError};
use thiserror::Error;
use zdraft_core::error::StoreError;
use zdraft_core::grips::{self, Grip};
use zdraft_core::math::Point2;
use zdraft_core::selection::{self, SelectionBox, SelectionSet};
use zdraft_core::settings::EditorSettings;
use zdraft_core::shape::{DrawingId, IdGenerator, Shape, ShapeId, UuidIds};
use zdraft_core::spatial::IndexedDrawing;
use zdraft_core::store::{
    Edit, EditHistory, History, MemoryStore, SelectionState, ShapeLookup, ShapeStore, ShapeUpdate,
};
use zdraft_core::tracking::{self, SnapResult};
use zdraft_core::viewport::Viewport;

/// 会话错误
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// 编辑会话
pub struct EditorSession<S = MemoryStore, H = EditHistory> {
    store: S,
    history: H,
    selection: SelectionSet,
    settings: EditorSettings,
    viewport: Viewport,
    ids: Box<dyn IdGenerator>,
    registry: CommandRegistry,
    state: CommandState,
    index: IndexedDrawing,
    /// 上一次启动的命令，空输入时重复
    last_command: Option<CommandId>,
    /// 命令行历史
    command_history: Vec<String>,
    status_message: String,
}

impl EditorSession {
    /// 使用内存存储和默认设置创建会话
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new(), EditHistory::default(), EditorSettings::default())
    }
}

impl<S: ShapeStore, H: History> EditorSession<S, H> {
    pub fn new(store: S, history: H, settings: EditorSettings) -> Self {
        let index = IndexedDrawing::new(DrawingId::default(), settings.quadtree);
        Self {
            store,
            history,
            selection: SelectionSet::new(),
            settings,
            viewport: Viewport::default(),
            ids: Box::new(UuidIds),
            registry: CommandRegistry::new(),
            state: CommandState::idle(),
            index,
            last_command: None,
            command_history: Vec::new(),
            status_message: String::new(),
        }
    }

    /// 替换 ID 生成器
    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: EditorSettings) {
        self.index.set_config(settings.quadtree);
        self.settings = settings;
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    pub fn state(&self) -> &CommandState {
        &self.state
    }

    pub fn command_history(&self) -> &[String] {
        &self.command_history
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// 切换当前图纸
    pub fn set_drawing(&mut self, drawing_id: DrawingId) {
        self.index.set_drawing(drawing_id);
        self.selection.deselect_all();
    }

    /// 直接添加图形（加载文件、粘贴等），记录到历史
    pub fn add_shapes(&mut self, shapes: Vec<Shape>) -> Result<(), SessionError> {
        self.commit(Edit::new("add").with_added(shapes))
    }

    /// 启动命令
    ///
    /// 正在执行的命令被同步丢弃；当前选择集作为预选对象。
    pub fn start_command(&mut self, id: CommandId) -> &CommandState {
        if let Some(active) = self.state.active_command {
            tracing::debug!(command = %active, "discarding active command");
        }
        let command = command_for(id);
        self.state = command.begin(self.selection.selected_shape_ids());
        self.last_command = Some(id);
        self.status_message = self.state.prompt.clone();
        tracing::info!(command = %id, phase = ?self.state.phase, "command started");
        &self.state
    }

    /// 处理一次命令输入
    ///
    /// 成功的终结结果作为一次编辑提交；存储拒绝时命令状态保持不变。
    pub fn handle_input(&mut self, input: CommandInput) -> Result<CommandOutcome, SessionError> {
        let Some(id) = self.state.active_command else {
            if matches!(input, CommandInput::Escape) {
                self.selection.deselect_all();
                return Ok(CommandOutcome::advance(CommandState::idle()).with_message("*取消*"));
            }
            return Err(CommandError::NoActiveCommand.into());
        };

        let command = command_for(id);
        let outcome = {
            let mut ctx = CommandContext {
                shapes: &self.store,
                ids: &mut *self.ids,
            };
            command.handle_input(&self.state, input.clone(), &mut ctx)
        };

        if !outcome.success {
            if let Some(message) = &outcome.message {
                self.status_message = message.clone();
            }
            return Ok(outcome);
        }

        if outcome.has_changes() {
            self.commit(outcome.to_edit(id.name()))?;
        }

        if let CommandInput::Selection(ids) = &input {
            self.selection.select_shapes(ids);
        }
        self.state = outcome.state.clone();
        if self.state.is_idle() {
            self.selection.deselect_all();
        }
        self.status_message = outcome
            .message
            .clone()
            .unwrap_or_else(|| self.state.prompt.clone());
        Ok(outcome)
    }

    /// 处理命令行文本
    ///
    /// 空闲时解析为命令名（空行重复上一个命令）；命令执行中解析为坐标、数值或选项。
    pub fn handle_text(&mut self, text: &str) -> Result<CommandOutcome, SessionError> {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.command_history.push(trimmed.to_string());
        }

        if trimmed.eq_ignore_ascii_case("ESC") {
            return self.handle_input(CommandInput::Escape);
        }

        if !self.state.is_idle() {
            let input = InputParser::command_input(trimmed, self.state.base_point)?;
            return self.handle_input(input);
        }

        let upper = trimmed.to_uppercase();
        match upper.as_str() {
            "" => match self.last_command {
                Some(id) => Ok(CommandOutcome::advance(self.start_command(id).clone())),
                None => Err(CommandError::NoActiveCommand.into()),
            },
            "U" | "UNDO" => {
                let undone = self.undo()?;
                Ok(CommandOutcome::advance(self.state.clone())
                    .with_message(if undone { "撤销" } else { "没有可撤销的操作" }))
            }
            "REDO" => {
                let redone = self.redo()?;
                Ok(CommandOutcome::advance(self.state.clone())
                    .with_message(if redone { "重做" } else { "没有可重做的操作" }))
            }
            _ => match self.registry.lookup(&upper) {
                Some(id) => Ok(CommandOutcome::advance(self.start_command(id).clone())),
                None => {
                    self.status_message = format!("Unknown command: {trimmed}");
                    Err(CommandError::UnknownCommand(trimmed.to_string()).into())
                }
            },
        }
    }

    /// 当前图纸上可见的图形，按 z 序
    fn visible_shapes(&self) -> Vec<&Shape> {
        let drawing_id = self.index.drawing_id();
        self.store
            .shapes()
            .filter(|s| s.visible && &s.drawing_id == drawing_id)
            .collect()
    }

    /// 把屏幕光标解析为输入点（追踪 + 对象捕捉）
    pub fn resolve_cursor(&self, screen: Point2<f64>) -> SnapResult {
        let world = self.viewport.screen_to_world(screen);
        let base_point = match self.state.phase {
            Phase::AwaitingSecondPoint | Phase::AwaitingThirdPoint => self.state.base_point,
            _ => None,
        };
        let shapes = self.visible_shapes();
        tracking::resolve(world, base_point, &shapes, &self.settings, &self.viewport)
    }

    /// 当前命令在光标处的预览
    pub fn preview(&self, screen: Point2<f64>) -> Vec<PreviewShape> {
        match self.state.active_command {
            Some(id) => {
                let cursor = self.resolve_cursor(screen).point;
                command_for(id).preview(&self.state, cursor, &self.store)
            }
            None => Vec::new(),
        }
    }

    /// 点选：返回光标下最上层的图形
    pub fn pick(&mut self, screen: Point2<f64>) -> Option<ShapeId> {
        let world = self.viewport.screen_to_world(screen);
        let tolerance = self.viewport.world_tolerance(self.settings.snap.tolerance);
        let drawing_id = self.index.drawing_id().clone();
        let tree = self.index.index(&self.store);
        selection::pick_at(&self.store, tree, &drawing_id, &world, tolerance)
    }

    /// 鼠标单击
    ///
    /// - 空闲：点选图形（`additive` 时追加）
    /// - 选择阶段：把点中的图形交给命令
    /// - 取点阶段：解析后的点交给命令
    pub fn click(&mut self, screen: Point2<f64>, additive: bool) -> Result<CommandOutcome, SessionError> {
        match self.state.phase {
            Phase::Idle => {
                let hit = self.pick(screen);
                match &hit {
                    Some(id) if additive => self.selection.toggle(id),
                    Some(id) => self.selection.apply(std::slice::from_ref(id), false),
                    None if !additive => self.selection.deselect_all(),
                    None => {}
                }
                Ok(CommandOutcome::advance(self.state.clone()))
            }
            Phase::Selecting => match self.pick(screen) {
                Some(id) => self.handle_input(CommandInput::Selection(vec![id])),
                None => Ok(CommandOutcome::advance(self.state.clone())),
            },
            _ => {
                let point = self.resolve_cursor(screen).point;
                self.handle_input(CommandInput::Point(point))
            }
        }
    }

    /// 框选（屏幕坐标），方向决定窗口或交叉模式
    pub fn box_select(
        &mut self,
        start: Point2<f64>,
        end: Point2<f64>,
        additive: bool,
    ) -> Result<Vec<ShapeId>, SessionError> {
        let drag = SelectionBox::new(start, end);
        let bounds = drag.world_bounds(&self.viewport);
        let drawing_id = self.index.drawing_id().clone();
        let tree = self.index.index(&self.store);
        let ids = selection::box_select(&self.store, tree, &drawing_id, &bounds, drag.mode);

        if self.state.phase == Phase::Selecting {
            self.handle_input(CommandInput::Selection(ids.clone()))?;
        } else {
            self.selection.apply(&ids, additive);
        }
        Ok(ids)
    }

    /// 选中图形上离光标最近的夹点
    pub fn grip_at(&self, screen: Point2<f64>) -> Option<(ShapeId, Grip)> {
        let world = self.viewport.screen_to_world(screen);
        let tolerance = self.viewport.world_tolerance(self.settings.snap.tolerance);
        self.selection
            .iter()
            .filter_map(|id| self.store.get_shape(id))
            .filter(|s| s.is_editable())
            .filter_map(|s| grips::grip_at(&s.geometry, &world, tolerance).map(|g| (s.id.clone(), g)))
            .min_by(|a, b| {
                let da = (a.1.point - world).norm();
                let db = (b.1.point - world).norm();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// 拖动夹点到世界坐标点
    ///
    /// 几何无法构造时返回 `Ok(false)`，图形不变。
    pub fn drag_grip(&mut self, id: &ShapeId, index: usize, to: Point2<f64>) -> Result<bool, SessionError> {
        let shape = self
            .store
            .get_shape(id)
            .ok_or_else(|| StoreError::ShapeNotFound(id.clone()))?;
        if shape.locked {
            tracing::warn!(shape = %id, "grip drag on locked shape ignored");
            return Ok(false);
        }
        let Some(geometry) = grips::drag_grip(&shape.geometry, index, to) else {
            tracing::debug!(shape = %id, index, "grip drag produced no geometry");
            return Ok(false);
        };
        self.commit(Edit::new("grip").with_updates(vec![ShapeUpdate::geometry(id.clone(), geometry)]))?;
        Ok(true)
    }

    /// 撤销；正在执行的命令先被取消
    pub fn undo(&mut self) -> Result<bool, SessionError> {
        self.cancel_active();
        let Some(edit) = self.history.undo() else {
            return Ok(false);
        };
        self.store.apply_edit(&edit)?;
        self.selection.retain_existing(&self.store);
        tracing::info!(edit = %edit.description, "undo");
        Ok(true)
    }

    /// 重做
    pub fn redo(&mut self) -> Result<bool, SessionError> {
        self.cancel_active();
        let Some(edit) = self.history.redo() else {
            return Ok(false);
        };
        self.store.apply_edit(&edit)?;
        self.selection.retain_existing(&self.store);
        tracing::info!(edit = %edit.description, "redo");
        Ok(true)
    }

    fn cancel_active(&mut self) {
        if let Some(id) = self.state.active_command {
            self.state = command_for(id).cancel(&self.state);
        }
    }

    /// 原子地应用编辑并记录逆操作
    fn commit(&mut self, edit: Edit) -> Result<(), SessionError> {
        if edit.is_empty() {
            return Ok(());
        }
        let inverse = self.store.apply_edit(&edit).inspect_err(|error| {
            tracing::warn!(%error, edit = %edit.description, "edit rejected by store");
        })?;
        self.selection.retain_existing(&self.store);
        self.history.record(edit, inverse);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zdraft_core::geometry::{Geometry, Line};
    use zdraft_core::shape::SequentialIds;

    fn line(id: &str, x1: f64, y1: f64, x2: f64, y2: f64) -> Shape {
        Shape::new(id, Geometry::Line(Line::new(Point2::new(x1, y1), Point2::new(x2, y2))))
    }

    fn session(shapes: Vec<Shape>) -> EditorSession {
        let store = MemoryStore::from_shapes(shapes).unwrap();
        EditorSession::new(store, EditHistory::default(), EditorSettings::default())
            .with_id_generator(SequentialIds::new("s"))
    }

    fn geometry(session: &EditorSession, id: &str) -> Geometry {
        session.store().get_shape(&id.into()).unwrap().geometry.clone()
    }

    #[test]
    fn test_move_by_text_then_undo_redo() {
        let mut s = session(vec![line("L1", 0.0, 0.0, 10.0, 0.0)]);
        let original = geometry(&s, "L1");

        s.handle_text("m").unwrap();
        assert_eq!(s.state().phase, Phase::Selecting);
        s.handle_input(CommandInput::Selection(vec!["L1".into()])).unwrap();
        for text in ["", "0,0", "@5,5"] {
            let outcome = s.handle_text(text).unwrap();
            assert!(outcome.success, "{text:?}: {:?}", outcome.message);
        }

        assert!(s.state().is_idle());
        assert!(s.selection().is_empty());
        assert_eq!(
            geometry(&s, "L1"),
            Geometry::Line(Line::new(Point2::new(5.0, 5.0), Point2::new(15.0, 5.0)))
        );

        assert!(s.undo().unwrap());
        assert_eq!(geometry(&s, "L1"), original);
        assert!(s.redo().unwrap());
        assert_ne!(geometry(&s, "L1"), original);
        assert!(!s.redo().unwrap());
    }

    #[test]
    fn test_preselection_skips_selecting_phase() {
        let mut s = session(vec![line("L1", 0.0, 0.0, 10.0, 0.0)]);
        s.set_viewport(Viewport::new(1.0, 0.0, 0.0));

        // 屏幕 y 向下，世界 (5,0) 对应屏幕 (5,0)
        s.click(Point2::new(5.0, 0.0), false).unwrap();
        assert!(s.selection().contains(&"L1".into()));

        let state = s.start_command(CommandId::Erase).clone();
        assert_eq!(state.selected_ids, vec![ShapeId::from("L1")]);
        s.handle_input(CommandInput::Enter).unwrap();
        assert_eq!(s.store().shape_count(), 0);
        assert!(s.history().can_undo());
    }

    #[test]
    fn test_copy_uses_session_ids() {
        let mut s = session(vec![line("L1", 0.0, 0.0, 10.0, 0.0)]);
        s.start_command(CommandId::Copy);
        s.handle_input(CommandInput::Selection(vec!["L1".into()])).unwrap();
        s.handle_input(CommandInput::Enter).unwrap();
        s.handle_input(CommandInput::Point(Point2::new(0.0, 0.0))).unwrap();
        s.handle_input(CommandInput::Point(Point2::new(0.0, 20.0))).unwrap();

        assert_eq!(s.store().shape_count(), 2);
        let ids: Vec<_> = s.store().shapes().map(|sh| sh.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["L1".to_string(), "s1".to_string()]);
    }

    #[test]
    fn test_rejected_input_keeps_store_and_state() {
        let mut s = session(vec![line("L1", 0.0, 0.0, 10.0, 0.0)]);
        s.start_command(CommandId::Scale);
        let before = s.state().clone();
        let revision = s.store().revision();
        let outcome = s.handle_input(CommandInput::Value(2.0)).unwrap();
        assert!(!outcome.success);
        assert_eq!(s.state(), &before);
        assert_eq!(s.store().revision(), revision);
    }

    #[test]
    fn test_unknown_command_and_idle_input() {
        let mut s = session(vec![]);
        assert!(matches!(
            s.handle_text("LINE"),
            Err(SessionError::Command(CommandError::UnknownCommand(_)))
        ));
        assert!(matches!(
            s.handle_input(CommandInput::Enter),
            Err(SessionError::Command(CommandError::NoActiveCommand))
        ));
        assert!(s.handle_input(CommandInput::Escape).unwrap().success);
    }

    #[test]
    fn test_box_select_feeds_selecting_phase() {
        let mut s = session(vec![
            line("L1", 0.0, 0.0, 10.0, 0.0),
            line("L2", 0.0, -50.0, 10.0, -50.0),
        ]);
        s.start_command(CommandId::Erase);
        // 从左到右窗口选择，世界范围 x∈[-1,11], y∈[-1,1]
        let ids = s
            .box_select(Point2::new(-1.0, -1.0), Point2::new(11.0, 1.0), false)
            .unwrap();
        assert_eq!(ids, vec![ShapeId::from("L1")]);
        assert_eq!(s.state().selected_ids, ids);

        s.handle_text("").unwrap();
        assert_eq!(s.store().shape_count(), 1);
    }

    #[test]
    fn test_drag_grip_records_history() {
        let mut s = session(vec![line("L1", 0.0, 0.0, 10.0, 0.0)]);
        assert!(s.drag_grip(&"L1".into(), 1, Point2::new(10.0, 10.0)).unwrap());
        assert_eq!(
            geometry(&s, "L1"),
            Geometry::Line(Line::new(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0)))
        );
        assert!(s.undo().unwrap());
        assert!(matches!(
            s.drag_grip(&"missing".into(), 0, Point2::origin()),
            Err(SessionError::Store(StoreError::ShapeNotFound(_)))
        ));
    }
}
