//! 命令注册表
//!
//! 完整命令名、短命令、用户别名到 [`CommandId`] 的映射，以及前缀补全。

use crate::command::CommandId;
use std::collections::HashMap;
use std::path::Path;
use zdraft_core::error::ConfigError;

/// 命令注册表
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    /// 完整命令 -> CommandId
    main_commands: HashMap<String, CommandId>,
    /// 短命令 -> CommandId
    short_commands: HashMap<String, CommandId>,
    /// 用户别名 -> 完整命令
    aliases: HashMap<String, String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            main_commands: HashMap::new(),
            short_commands: HashMap::new(),
            aliases: HashMap::new(),
        };

        for id in CommandId::ALL {
            registry.register(id, id.name(), &[id.shortcut()]);
        }
        registry.register(CommandId::Copy, "COPY", &["CP"]);
        registry.register(CommandId::Erase, "ERASE", &["DELETE"]);

        registry
    }

    /// 注册命令及其短命令
    pub fn register(&mut self, id: CommandId, full_cmd: &str, shortcuts: &[&str]) {
        self.main_commands.insert(full_cmd.to_uppercase(), id);
        for shortcut in shortcuts {
            self.short_commands.insert(shortcut.to_uppercase(), id);
        }
    }

    /// 查找命令：完整名 → 短命令 → 别名
    pub fn lookup(&self, input: &str) -> Option<CommandId> {
        let key = input.trim().to_uppercase();

        if let Some(&id) = self.main_commands.get(&key) {
            return Some(id);
        }
        if let Some(&id) = self.short_commands.get(&key) {
            return Some(id);
        }
        self.aliases
            .get(&key)
            .and_then(|cmd| self.main_commands.get(cmd))
            .copied()
    }

    /// Tab 补全，返回以 prefix 开头的完整命令（已排序）
    pub fn complete(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.trim().to_uppercase();
        let mut results: Vec<String> = self
            .main_commands
            .keys()
            .filter(|cmd| cmd.starts_with(&prefix))
            .cloned()
            .collect();
        results.sort();
        results
    }

    /// 添加用户别名
    ///
    /// 不能覆盖已有的完整命令，目标命令必须存在。
    pub fn add_alias(&mut self, alias: &str, command: &str) -> bool {
        let alias = alias.to_uppercase();
        let command = command.to_uppercase();

        if self.main_commands.contains_key(&alias) || !self.main_commands.contains_key(&command) {
            tracing::warn!(%alias, %command, "alias ignored");
            return false;
        }
        self.aliases.insert(alias, command);
        true
    }

    pub fn remove_alias(&mut self, alias: &str) {
        self.aliases.remove(&alias.to_uppercase());
    }

    /// 解析别名文本
    ///
    /// 每行 "alias command"，以 # 开头的行是注释。返回接受的别名数。
    pub fn parse_aliases(&mut self, content: &str) -> usize {
        let mut accepted = 0;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            if let (Some(alias), Some(command)) = (parts.next(), parts.next()) {
                if self.add_alias(alias, command) {
                    accepted += 1;
                }
            }
        }
        accepted
    }

    /// 从文件加载别名
    pub fn load_aliases(&mut self, path: &Path) -> Result<usize, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let accepted = self.parse_aliases(&content);
        tracing::info!(path = %path.display(), accepted, "loaded command aliases");
        Ok(accepted)
    }

    /// 别名文件内容
    pub fn alias_file(&self) -> String {
        let mut entries: Vec<_> = self.aliases.iter().collect();
        entries.sort();

        let mut content = String::from("# ZDRAFT Command Aliases\n# Format: alias\\tcommand\n\n");
        for (alias, command) in entries {
            content.push_str(&format!("{}\t{}\n", alias.to_lowercase(), command.to_lowercase()));
        }
        content
    }

    /// 保存别名到文件
    pub fn save_aliases(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.alias_file())?;
        Ok(())
    }

    /// 所有完整命令（已排序）
    pub fn commands(&self) -> Vec<(&str, CommandId)> {
        let mut all: Vec<_> = self
            .main_commands
            .iter()
            .map(|(cmd, &id)| (cmd.as_str(), id))
            .collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let registry = CommandRegistry::new();

        assert_eq!(registry.lookup("MOVE"), Some(CommandId::Move));
        assert_eq!(registry.lookup("move"), Some(CommandId::Move));
        assert_eq!(registry.lookup("m"), Some(CommandId::Move));
        assert_eq!(registry.lookup("CP"), Some(CommandId::Copy));
        assert_eq!(registry.lookup(" mi "), Some(CommandId::Mirror));
        assert_eq!(registry.lookup("NOTEXIST"), None);
    }

    #[test]
    fn test_complete() {
        let registry = CommandRegistry::new();
        assert_eq!(registry.complete("M"), vec!["MIRROR".to_string(), "MOVE".to_string()]);
        assert_eq!(registry.complete("s"), vec!["SCALE".to_string()]);
    }

    #[test]
    fn test_alias() {
        let mut registry = CommandRegistry::new();

        assert!(registry.add_alias("MV", "MOVE"));
        assert_eq!(registry.lookup("mv"), Some(CommandId::Move));
        assert!(!registry.add_alias("MOVE", "ERASE"));
        assert!(!registry.add_alias("ZZ", "LINE"));

        registry.remove_alias("MV");
        assert_eq!(registry.lookup("MV"), None);
    }

    #[test]
    fn test_parse_aliases() {
        let mut registry = CommandRegistry::new();
        let accepted = registry.parse_aliases("# comment\n\nrr\trotate\nxx unknown\ndd erase\n");
        assert_eq!(accepted, 2);
        assert_eq!(registry.lookup("RR"), Some(CommandId::Rotate));
        assert!(registry.alias_file().contains("dd\terase\n"));
    }
}
