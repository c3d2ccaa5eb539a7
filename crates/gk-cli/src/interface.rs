//! Chat input parsing.

use gk_core::ApprovalId;

/// Commands the chat loop understands.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Approve and execute one request.
    Approve(ApprovalId),

    /// Deny one request.
    Deny(ApprovalId),

    ApproveAll,

    DenyAll,

    /// Remove processed entries from the approval store.
    ClearProcessed,

    /// Show approval statistics.
    Stats,

    /// Show or set approval mode.
    Mode(Option<bool>),

    ListTools,

    /// Drop transcript, approvals and held answers.
    Reset,

    Help,

    Quit,
}

/// Input from the user.
#[derive(Debug, Clone, PartialEq)]
pub enum UserInput {
    /// A regular message for the agent.
    Message(String),

    Command(ChatCommand),

    /// A slash command that could not be parsed.
    Invalid(String),

    /// No input (e.g., empty line).
    Empty,
}

fn parse_id(cmd: &str, arg: &str) -> Result<ApprovalId, String> {
    if arg.is_empty() {
        return Err(format!("Usage: {} <id>", cmd));
    }
    arg.parse::<ApprovalId>()
        .map_err(|_| format!("Not a request id: {}", arg))
}

/// Parse a slash command.
///
/// Returns None if the input is not a slash command.
pub fn parse_command(input: &str) -> Option<Result<ChatCommand, String>> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let parts: Vec<&str> = trimmed.splitn(2, char::is_whitespace).collect();
    let cmd = parts[0].to_lowercase();
    let arg = parts.get(1).map(|s| s.trim()).unwrap_or_default();

    let parsed = match cmd.as_str() {
        "/approve" | "/a" => parse_id(&cmd, arg).map(ChatCommand::Approve),
        "/deny" | "/d" => parse_id(&cmd, arg).map(ChatCommand::Deny),
        "/approve-all" => Ok(ChatCommand::ApproveAll),
        "/deny-all" => Ok(ChatCommand::DenyAll),
        "/clear" | "/c" => Ok(ChatCommand::ClearProcessed),
        "/stats" | "/s" => Ok(ChatCommand::Stats),
        "/mode" | "/m" => match arg.to_lowercase().as_str() {
            "" => Ok(ChatCommand::Mode(None)),
            "on" | "true" | "1" => Ok(ChatCommand::Mode(Some(true))),
            "off" | "false" | "0" => Ok(ChatCommand::Mode(Some(false))),
            other => Err(format!("Unknown mode '{}': use on or off", other)),
        },
        "/tools" | "/t" => Ok(ChatCommand::ListTools),
        "/reset" => Ok(ChatCommand::Reset),
        "/help" | "/?" => Ok(ChatCommand::Help),
        "/quit" | "/exit" | "/q" => Ok(ChatCommand::Quit),
        _ => Err(format!("Unknown command: {} (try /help)", cmd)),
    };
    Some(parsed)
}

/// Parse user input into a UserInput enum.
pub fn parse_user_input(input: &str) -> UserInput {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return UserInput::Empty;
    }

    match parse_command(trimmed) {
        Some(Ok(cmd)) => UserInput::Command(cmd),
        Some(Err(msg)) => UserInput::Invalid(msg),
        None => UserInput::Message(trimmed.to_string()),
    }
}

pub const HELP_TEXT: &str = "\
Commands:
  /approve <id>   Approve and run a pending request
  /deny <id>      Deny a pending request
  /approve-all    Approve every pending request
  /deny-all       Deny every pending request
  /clear          Remove processed requests
  /stats          Show approval statistics
  /mode [on|off]  Show or toggle approval mode
  /tools          List tools
  /reset          Start a fresh session
  /help           Show this help
  /quit           Exit

Try: calculate 15 * 23; time; note buy milk; notes; random fact;
     analyze The quick brown fox.; list .; read Cargo.toml";
