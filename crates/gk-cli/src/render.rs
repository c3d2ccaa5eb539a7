//! Terminal rendering for the chat loop.
//!
//! Every function here draws from a snapshot handed in by the caller; none
//! of them reads session state on its own.

use std::io::Write;

use chrono::{DateTime, Duration, Utc};
use crossterm::style::{Color, ResetColor, SetForegroundColor};
use crossterm::terminal::size;
use crossterm::ExecutableCommand;

use gk_core::{
    ApprovalPanel, ApprovalRequest, ApprovalStatus, PendingCard, Resolution, RiskLevel,
    StatusCounts, ToolDefinition, ToolRegistry, TurnId,
};

/// Short human age: `just now`, `42s ago`, `3m ago`, `2h ago`.
pub fn format_age(age: Duration) -> String {
    let secs = age.num_seconds().max(0);
    if secs < 5 {
        "just now".to_string()
    } else if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

pub fn format_card(card: &PendingCard, now: DateTime<Utc>) -> String {
    format!(
        "#{} [{}] {} ({})",
        card.id.value(),
        card.risk.label(),
        card.description,
        format_age(now - card.created_at)
    )
}

pub fn format_processed(request: &ApprovalRequest) -> String {
    let detail = match request.status {
        ApprovalStatus::Executed => request.result.clone().unwrap_or_default(),
        ApprovalStatus::Error => request.error.clone().unwrap_or_default(),
        _ => String::new(),
    };
    let mut line = format!("#{} {}: {}", request.id.value(), request.status, request.description);
    if !detail.is_empty() {
        let first = detail.lines().next().unwrap_or_default();
        line.push_str(&format!(" -> {}", first));
    }
    line
}

pub fn format_stats(counts: &StatusCounts, enabled: bool, awaiting: &[TurnId]) -> Vec<String> {
    vec![
        format!("Approval mode: {}", if enabled { "on" } else { "off" }),
        format!(
            "Requests: {} total, {} pending, {} executed, {} denied, {} failed",
            counts.total(),
            counts.pending,
            counts.executed,
            counts.denied,
            counts.error
        ),
        format!("Turns awaiting decisions: {}", awaiting.len()),
    ]
}

fn risk_color(risk: RiskLevel) -> Color {
    match risk {
        RiskLevel::Low => Color::Green,
        RiskLevel::Medium => Color::Yellow,
        RiskLevel::High => Color::Red,
        RiskLevel::Unknown => Color::DarkGrey,
    }
}

fn print_colored(color: Color, text: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.execute(SetForegroundColor(color))?;
    println!("{}", text);
    stdout.execute(ResetColor)?;
    stdout.flush()
}

/// Print a section header with styling.
pub fn print_section_header(title: &str) -> std::io::Result<()> {
    let width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let title_len = title.len() + 2;
    let remaining = width.saturating_sub(title_len).saturating_sub(1);
    let left_len = remaining / 2;
    let right_len = remaining - left_len;

    let mut stdout = std::io::stdout();
    stdout.execute(SetForegroundColor(Color::DarkGrey))?;
    print!("{} ", "─".repeat(left_len));
    stdout.execute(SetForegroundColor(Color::Cyan))?;
    print!("{}", title);
    stdout.execute(SetForegroundColor(Color::DarkGrey))?;
    println!(" {}", "─".repeat(right_len));
    stdout.execute(ResetColor)?;
    stdout.flush()
}

/// Draw the approval section. Draws nothing when the panel is hidden.
pub fn print_panel(panel: &ApprovalPanel) -> std::io::Result<()> {
    if !panel.visible {
        return Ok(());
    }

    print_section_header(&format!("Approvals ({} pending)", panel.pending.len()))?;
    if panel.newly_raised && !panel.pending.is_empty() {
        print_colored(Color::Yellow, "New request(s) need your decision")?;
    }

    let now = Utc::now();
    for card in &panel.pending {
        print_colored(risk_color(card.risk), &format_card(card, now))?;
        print_colored(Color::DarkGrey, &format!("    {}", card.risk.hint()))?;
    }

    match panel.pending.len() {
        0 => print_colored(Color::DarkGrey, "Nothing waiting for approval")?,
        1 => {
            let id = panel.pending[0].id.value();
            print_colored(Color::DarkGrey, &format!("/approve {} · /deny {}", id, id))?;
        }
        _ => print_colored(
            Color::DarkGrey,
            "/approve <id> · /deny <id> · /approve-all · /deny-all",
        )?,
    }

    if !panel.processed.is_empty() {
        print_colored(
            Color::DarkGrey,
            &format!("{} processed · /clear to remove", panel.processed.len()),
        )?;
    }
    Ok(())
}

pub fn print_processed(requests: &[ApprovalRequest]) -> std::io::Result<()> {
    for request in requests {
        let color = match request.status {
            ApprovalStatus::Executed => Color::Green,
            ApprovalStatus::Error => Color::Red,
            _ => Color::DarkGrey,
        };
        print_colored(color, &format_processed(request))?;
    }
    Ok(())
}

pub fn print_resolution(resolution: &Resolution) -> std::io::Result<()> {
    match resolution {
        Resolution::Executed { id, .. } => {
            print_colored(Color::Green, &format!("✓ #{} approved and executed", id.value()))
        }
        Resolution::Failed { id, error } => {
            print_colored(Color::Red, &format!("✗ #{} failed: {}", id.value(), error))
        }
        Resolution::Denied { id } => {
            print_colored(Color::Yellow, &format!("✗ #{} denied", id.value()))
        }
        Resolution::Stale { id, reason } => {
            print_colored(Color::DarkGrey, &format!("#{} unchanged: {}", id.value(), reason))
        }
    }
}

pub fn print_answer(turn: Option<TurnId>, content: &str) -> std::io::Result<()> {
    let title = match turn {
        Some(turn) => format!("Answer (turn {})", turn),
        None => "Answer".to_string(),
    };
    print_section_header(&title)?;
    println!("{}", content);
    std::io::stdout().flush()
}

pub fn print_stats(
    counts: &StatusCounts,
    enabled: bool,
    awaiting: &[TurnId],
) -> std::io::Result<()> {
    print_section_header("Stats")?;
    for line in format_stats(counts, enabled, awaiting) {
        print_colored(Color::Cyan, &line)?;
    }
    Ok(())
}

/// Call signature for a tool: required parameters first, optional ones
/// bracketed.
pub fn format_signature(definition: &ToolDefinition) -> String {
    let params = &definition.parameters;
    let mut parts = params.required.clone();
    parts.extend(
        params
            .properties
            .keys()
            .filter(|k| !params.required.contains(k))
            .map(|k| format!("[{}]", k)),
    );
    format!("{}({})", definition.name, parts.join(", "))
}

pub fn print_tools(tools: &ToolRegistry) -> std::io::Result<()> {
    for (info, definition) in tools.info().iter().zip(tools.definitions()) {
        let marker = if info.requires_approval { " [approval]" } else { "" };
        println!("  {}{}", format_signature(&definition), marker);
        print_colored(Color::DarkGrey, &format!("    {}", info.description))?;
    }
    Ok(())
}

/// Print a status message.
pub fn print_status(msg: &str) -> std::io::Result<()> {
    print_colored(Color::Cyan, msg)
}

/// Print the prompt hint.
pub fn print_prompt_hint() -> std::io::Result<()> {
    print_colored(Color::DarkGrey, "/help · /quit or Ctrl+D")
}

/// Print an error message.
pub fn print_error(msg: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.execute(SetForegroundColor(Color::Red))?;
    eprintln!("Error: {}", msg);
    stdout.execute(ResetColor)?;
    stdout.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gk_core::ApprovalId;

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::seconds(2)), "just now");
        assert_eq!(format_age(Duration::seconds(-3)), "just now");
        assert_eq!(format_age(Duration::seconds(42)), "42s ago");
        assert_eq!(format_age(Duration::seconds(185)), "3m ago");
        assert_eq!(format_age(Duration::seconds(7300)), "2h ago");
    }

    #[test]
    fn test_format_card() {
        let now = Utc::now();
        let card = PendingCard {
            id: ApprovalId::new(7),
            description: "Calculate: 15 * 23".to_string(),
            risk: RiskLevel::Low,
            created_at: now - Duration::seconds(90),
        };
        assert_eq!(format_card(&card, now), "#7 [low risk] Calculate: 15 * 23 (1m ago)");
    }

    #[test]
    fn test_format_processed() {
        let request = ApprovalRequest {
            id: ApprovalId::new(2),
            description: "Calculate: 1 / 0".to_string(),
            status: ApprovalStatus::Error,
            result: None,
            error: Some("Calculation error: division by zero".to_string()),
            turn: TurnId::new(1),
            created_at: Utc::now(),
            resolved_at: Some(Utc::now()),
        };
        assert_eq!(
            format_processed(&request),
            "#2 error: Calculate: 1 / 0 -> Calculation error: division by zero"
        );

        let denied = ApprovalRequest {
            status: ApprovalStatus::Denied,
            error: None,
            ..request
        };
        assert_eq!(format_processed(&denied), "#2 denied: Calculate: 1 / 0");
    }

    #[test]
    fn test_format_signature() {
        use gk_core::{PropertySchema, ToolParameters};

        let definition = ToolDefinition::new("file_operations", "files").with_parameters(
            ToolParameters::new()
                .add_property("operation", PropertySchema::string("op"), true)
                .add_property("path", PropertySchema::string("path"), false)
                .add_property("content", PropertySchema::string("content"), false),
        );
        assert_eq!(
            format_signature(&definition),
            "file_operations(operation, [content], [path])"
        );

        let bare = ToolDefinition::new("get_notes", "notes");
        assert_eq!(format_signature(&bare), "get_notes()");
    }

    #[test]
    fn test_format_stats() {
        let counts = StatusCounts {
            pending: 1,
            executed: 2,
            denied: 1,
            ..Default::default()
        };
        let lines = format_stats(&counts, true, &[TurnId::new(3)]);
        assert_eq!(lines[0], "Approval mode: on");
        assert_eq!(
            lines[1],
            "Requests: 4 total, 1 pending, 2 executed, 1 denied, 0 failed"
        );
        assert_eq!(lines[2], "Turns awaiting decisions: 1");
    }
}
