//! ZDRAFT 编辑命令
//!
//! 命令状态机（移动、复制、旋转、缩放、镜像、删除）、命令注册表、
//! 命令行输入解析，以及把它们接到图形存储上的编辑会话。

pub mod command;
pub mod command_registry;
pub mod commands;
pub mod input_parser;
pub mod session;

pub use command::{
    Command, CommandContext, CommandError, CommandId, CommandInput, CommandOutcome, CommandState,
    Phase, PreviewShape,
};
pub use command_registry::CommandRegistry;
pub use commands::command_for;
pub use input_parser::{InputParser, InputValue, ParseError};
pub use session::{EditorSession, SessionError};
