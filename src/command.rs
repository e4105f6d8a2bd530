//! Command text and the per-command defaults.
//!
//! The server answers every command with a newline-terminated line, but
//! some replies (most of all `showplayers`) come back cut short and need
//! several reads. How many attempts a command gets by default, and how a
//! successful reply starts, lives in [COMMANDS].
use std::fmt;

/// Attempt budget for commands without an entry in [COMMANDS].
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub default_attempts: u32,
    /// What a successful reply starts with.
    pub success_prefix: &'static str,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "shutdown",
        default_attempts: 1,
        success_prefix: "The",
    },
    CommandSpec {
        name: "doexit",
        default_attempts: 1,
        success_prefix: "Shutdown",
    },
    CommandSpec {
        name: "broadcast",
        default_attempts: 1,
        success_prefix: "Broadcasted:",
    },
    CommandSpec {
        name: "kickplayer",
        default_attempts: 1,
        success_prefix: "Kicked:",
    },
    // sic, that's what the server prints
    CommandSpec {
        name: "banplayer",
        default_attempts: 1,
        success_prefix: "Baned:",
    },
    // player uids are filled in late after a join, the list needs a few reads
    CommandSpec {
        name: "showplayers",
        default_attempts: 10,
        success_prefix: "name",
    },
    CommandSpec {
        name: "info",
        default_attempts: 1,
        success_prefix: "Welcome",
    },
    CommandSpec {
        name: "save",
        default_attempts: 1,
        success_prefix: "Complete",
    },
];

pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

/// The server splits arguments on spaces, so free text has to be glued
/// together with underscores.
pub fn safe_message(message: &str) -> String {
    message.replace(' ', "_")
}

/// Normalized text of a command, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    text: String,
}

impl Command {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let text = match text.strip_prefix('/') {
            Some(rest) => rest.to_string(),
            None => text,
        };
        Command { text }
    }

    /// Joins separate words into one command line.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = words
            .into_iter()
            .map(|word| word.as_ref().to_string())
            .collect::<Vec<String>>()
            .join(" ");
        Command::new(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// First word, lowercased, without slashes.
    pub fn name(&self) -> String {
        self.text
            .split(' ')
            .next()
            .unwrap_or_default()
            .replace('/', "")
            .to_lowercase()
    }

    pub fn spec(&self) -> Option<&'static CommandSpec> {
        lookup(&self.name())
    }

    pub fn default_attempts(&self) -> u32 {
        self.spec()
            .map(|spec| spec.default_attempts)
            .unwrap_or(DEFAULT_MAX_ATTEMPTS)
    }

    pub fn success_prefix(&self) -> &'static str {
        self.spec().map(|spec| spec.success_prefix).unwrap_or("")
    }

    pub fn shutdown(seconds: u32, message: &str) -> Self {
        let mut text = format!("shutdown {}", seconds.max(1));
        if !message.is_empty() {
            text.push(' ');
            text.push_str(&safe_message(message));
        }
        Command::new(text)
    }

    pub fn exit() -> Self {
        Command::new("doexit")
    }

    pub fn broadcast(message: &str) -> Self {
        Command::new(format!("broadcast {}", safe_message(message)))
    }

    pub fn kick_player(steam_id: impl fmt::Display) -> Self {
        Command::new(format!("kickplayer {steam_id}"))
    }

    pub fn ban_player(steam_id: impl fmt::Display) -> Self {
        Command::new(format!("banplayer {steam_id}"))
    }

    pub fn list_players() -> Self {
        Command::new("showplayers")
    }

    pub fn info() -> Self {
        Command::new("info")
    }

    pub fn save() -> Self {
        Command::new("save")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for Command {
    fn from(text: &str) -> Self {
        Command::new(text)
    }
}

impl From<String> for Command {
    fn from(text: String) -> Self {
        Command::new(text)
    }
}

impl From<&String> for Command {
    fn from(text: &String) -> Self {
        Command::new(text.as_str())
    }
}

impl From<&[&str]> for Command {
    fn from(words: &[&str]) -> Self {
        Command::from_words(words)
    }
}

impl<const N: usize> From<[&str; N]> for Command {
    fn from(words: [&str; N]) -> Self {
        Command::from_words(words)
    }
}

impl From<Vec<String>> for Command {
    fn from(words: Vec<String>) -> Self {
        Command::from_words(words)
    }
}

impl From<&[String]> for Command {
    fn from(words: &[String]) -> Self {
        Command::from_words(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_slash_is_dropped() {
        assert_eq!(Command::from("/info").as_str(), "info");
        assert_eq!(Command::from("info").as_str(), "info");
    }

    #[test]
    fn words_are_joined() {
        let command = Command::from(["/kickplayer", "steam_123"]);
        assert_eq!(command.as_str(), "kickplayer steam_123");
        assert_eq!(command.name(), "kickplayer");

        let owned = Command::from(vec!["broadcast".to_string(), "hi".to_string()]);
        assert_eq!(owned.as_str(), "broadcast hi");
    }

    #[test]
    fn name_is_lowercased() {
        assert_eq!(Command::from("ShowPlayers").name(), "showplayers");
        assert_eq!(Command::from("").name(), "");
    }

    #[test]
    fn player_list_gets_a_larger_budget() {
        let list = Command::list_players().default_attempts();
        let info = Command::info().default_attempts();
        assert_eq!(list, 10);
        assert_eq!(info, 1);
        assert!(list > info);
        assert_eq!(Command::from("whatever").default_attempts(), DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn success_prefixes() {
        assert_eq!(Command::broadcast("x").success_prefix(), "Broadcasted:");
        assert_eq!(Command::ban_player(1).success_prefix(), "Baned:");
        assert_eq!(Command::from("unknown").success_prefix(), "");
    }

    #[test]
    fn facade_formatting() {
        assert_eq!(Command::broadcast("hello world").as_str(), "broadcast hello_world");
        assert_eq!(Command::shutdown(0, "").as_str(), "shutdown 1");
        assert_eq!(
            Command::shutdown(30, "back soon").as_str(),
            "shutdown 30 back_soon"
        );
        assert_eq!(Command::kick_player(76561198000000000u64).as_str(), "kickplayer 76561198000000000");
        assert_eq!(Command::exit().as_str(), "doexit");
    }
}
