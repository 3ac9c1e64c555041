//! Console stand-in for the login screen's controls.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Username field now holds this text (possibly empty).
    Username(String),
    /// Username field cleared.
    ClearUsername,
    Password(String),
    ToggleRemember,
    Login,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  user <text>      set the username field (no text = empty field)
  clear            clear the username field
  password <text>  set the password field
  remember         toggle \"remember me\"
  login            tap the login button
  help             show this help
  quit             exit";

pub fn parse_command(line: &str) -> Option<ConsoleCommand> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (word, rest) = match line.trim_start().split_once(' ') {
        Some((word, rest)) => (word, rest),
        None => (line.trim(), ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "user" | "username" => ConsoleCommand::Username(rest.to_string()),
        "clear" => ConsoleCommand::ClearUsername,
        "password" | "pass" => ConsoleCommand::Password(rest.to_string()),
        "remember" => ConsoleCommand::ToggleRemember,
        "login" => ConsoleCommand::Login,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        _ => return None,
    };
    Some(command)
}

pub fn checkbox(checked: bool) -> &'static str {
    if checked {
        "[x]"
    } else {
        "[ ]"
    }
}
