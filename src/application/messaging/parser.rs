//! Command parser - Splits raw chat text into a command invocation

use once_cell::sync::Lazy;
use regex_lite::Regex;

static COMMAND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/([A-Za-z0-9_-]{1,32})(?:@(\S+))?(?:\s+([\s\S]*))?$").expect("command pattern is valid")
});

/// A command parsed out of a chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    /// Bot username in `/cmd@bot` form
    pub mention: Option<String>,
    pub args: Vec<String>,
}

impl ParsedCommand {
    /// True if the command is meant for the bot called `username`
    pub fn is_for(&self, username: &str) -> bool {
        self.mention
            .as_deref()
            .map(|m| m.eq_ignore_ascii_case(username))
            .unwrap_or(true)
    }
}

/// Parse `/name[@bot] arg1 arg2`; `None` for anything that is not a command
pub fn parse_command(text: &str) -> Option<ParsedCommand> {
    let caps = COMMAND_RE.captures(text.trim())?;

    let args = caps
        .get(3)
        .map(|m| m.as_str().split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    Some(ParsedCommand {
        name: caps[1].to_string(),
        mention: caps.get(2).map(|m| m.as_str().to_string()),
        args,
    })
}
