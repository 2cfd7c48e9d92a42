//! ZDRAFT 会话回放程序
//!
//! 读取 JSON 会话脚本（设置、视口、图形、输入事件），通过编辑会话逐个回放事件，
//! 最后把图形以 JSON 输出到标准输出。
//!
//! 用法: `zdraft <script.json>`，路径为 `-` 或省略时从标准输入读取。

use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Read;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use zdraft_core::math::Point2;
use zdraft_core::settings::EditorSettings;
use zdraft_core::shape::{SequentialIds, Shape, ShapeId};
use zdraft_core::store::{EditHistory, MemoryStore, ShapeLookup};
use zdraft_core::viewport::Viewport;
use zdraft_edit::{CommandId, CommandInput, EditorSession};

/// 会话脚本
#[derive(Debug, Deserialize)]
struct Script {
    #[serde(default)]
    settings: EditorSettings,
    #[serde(default)]
    viewport: Viewport,
    #[serde(default)]
    shapes: Vec<Shape>,
    /// 新图形 ID 的前缀；省略时使用 UUID
    #[serde(default)]
    id_prefix: Option<String>,
    #[serde(default)]
    events: Vec<Event>,
}

/// 输入事件
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Event {
    /// 启动命令
    Command(CommandId),
    /// 命令行文本
    Text(String),
    /// 直接的命令输入
    Input(CommandInput),
    /// 屏幕坐标单击
    Click {
        point: Point2<f64>,
        #[serde(default)]
        additive: bool,
    },
    /// 屏幕坐标框选
    Select {
        start: Point2<f64>,
        end: Point2<f64>,
        #[serde(default)]
        additive: bool,
    },
    /// 拖动夹点到世界坐标
    Grip {
        shape: ShapeId,
        index: usize,
        to: Point2<f64>,
    },
    Undo,
    Redo,
}

fn read_script(path: Option<&str>) -> Result<Script> {
    let text = match path {
        None | Some("-") => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading script from stdin")?;
            text
        }
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?,
    };
    let script: Script = serde_json::from_str(&text).context("parsing session script")?;
    script.settings.validate()?;
    Ok(script)
}

fn replay(script: Script) -> Result<Vec<Shape>> {
    let store = MemoryStore::from_shapes(script.shapes)?;
    let mut session = EditorSession::new(store, EditHistory::default(), script.settings);
    if let Some(prefix) = script.id_prefix {
        session = session.with_id_generator(SequentialIds::new(prefix));
    }
    session.set_viewport(script.viewport);

    for (n, event) in script.events.into_iter().enumerate() {
        let result = match event {
            Event::Command(id) => {
                session.start_command(id);
                Ok(())
            }
            Event::Text(text) => session.handle_text(&text).map(|_| ()),
            Event::Input(input) => session.handle_input(input).map(|_| ()),
            Event::Click { point, additive } => session.click(point, additive).map(|_| ()),
            Event::Select {
                start,
                end,
                additive,
            } => session.box_select(start, end, additive).map(|_| ()),
            Event::Grip { shape, index, to } => session.drag_grip(&shape, index, to).map(|_| ()),
            Event::Undo => session.undo().map(|_| ()),
            Event::Redo => session.redo().map(|_| ()),
        };

        match result {
            Ok(()) => info!(event = n, status = session.status_message(), "event"),
            Err(error) => warn!(event = n, %error, "event failed"),
        }
    }

    Ok(session.store().shapes().cloned().collect())
}

fn main() -> Result<()> {
    // 日志输出到标准错误，标准输出只有结果
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(Level::INFO)
            .with_writer(std::io::stderr)
            .finish(),
    )?;

    let path = std::env::args().nth(1);
    let script = read_script(path.as_deref())?;
    info!(
        shapes = script.shapes.len(),
        events = script.events.len(),
        "replaying session"
    );

    let shapes = replay(script)?;
    println!("{}", serde_json::to_string_pretty(&shapes)?);
    Ok(())
}
