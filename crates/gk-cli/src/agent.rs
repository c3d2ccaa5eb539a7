//! Keyword-routed agent.
//!
//! Splits a message into clauses on `;` and newlines and routes each clause
//! to one tool call. Gated tools answer with a placeholder, which ends up in
//! the draft answer and is replaced once the request is decided.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use gk_core::{AgentExecutor, Error, ToolRegistry};

const CALC_CHARS: &str = "0123456789+-*/.() ";

/// A routed tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub tool: &'static str,
    pub arguments: Value,
}

impl Route {
    fn new(tool: &'static str, arguments: Value) -> Self {
        Self { tool, arguments }
    }
}

fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(text[prefix.len()..].trim())
    } else {
        None
    }
}

/// Map one clause to a tool call, if any tool fits.
pub fn route(clause: &str) -> Option<Route> {
    // Text to analyze keeps its trailing punctuation.
    let raw = clause.trim();
    for prefix in ["analyze this text:", "analyze text:", "analyze:", "analyze "] {
        if let Some(rest) = strip_prefix_ci(raw, prefix) {
            if !rest.is_empty() {
                return Some(Route::new("text_analyzer", json!({ "text": rest })));
            }
        }
    }

    let clause = raw.trim_end_matches(['?', '!']);
    let lower = clause.to_lowercase();

    if lower == "fact" || lower.contains("random fact") || lower.contains("fun fact") {
        return Some(Route::new("random_fact", json!({})));
    }

    for prefix in ["calculate ", "calc ", "compute ", "what is "] {
        if let Some(rest) = strip_prefix_ci(clause, prefix) {
            if !rest.is_empty() {
                return Some(Route::new("calculator", json!({ "expression": rest })));
            }
        }
    }
    if clause.chars().any(|c| c.is_ascii_digit())
        && clause.chars().all(|c| CALC_CHARS.contains(c))
    {
        return Some(Route::new("calculator", json!({ "expression": clause })));
    }

    if lower == "time"
        || lower == "date"
        || lower.contains("what time")
        || lower.contains("current time")
    {
        return Some(Route::new("get_current_time", json!({})));
    }

    if matches!(lower.as_str(), "notes" | "show notes" | "get notes" | "list notes") {
        return Some(Route::new("get_notes", json!({})));
    }
    if let Some(rest) = strip_prefix_ci(clause, "note ") {
        return Some(Route::new("note_taker", json!({ "note": rest })));
    }

    if let Some(rest) = strip_prefix_ci(clause, "read ") {
        return Some(Route::new(
            "file_operations",
            json!({ "operation": "read", "path": rest }),
        ));
    }
    if let Some(rest) = strip_prefix_ci(clause, "write ") {
        let (path, content) = rest.split_once(':')?;
        return Some(Route::new(
            "file_operations",
            json!({ "operation": "write", "path": path.trim(), "content": content.trim_start() }),
        ));
    }
    if lower == "list" || lower == "ls" {
        return Some(Route::new(
            "file_operations",
            json!({ "operation": "list", "path": "." }),
        ));
    }
    if let Some(rest) = strip_prefix_ci(clause, "list ") {
        return Some(Route::new(
            "file_operations",
            json!({ "operation": "list", "path": rest }),
        ));
    }

    None
}

fn unrouted(clause: &str) -> String {
    format!(
        "I can't help with \"{}\". Try: calculate 15 * 23; time; note <text>; notes; \
         analyze <text>; random fact; read <path>; write <path>: <text>; list <dir>",
        clause
    )
}

/// Deterministic executor over the tool registry.
#[derive(Debug, Default)]
pub struct KeywordAgent;

impl KeywordAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentExecutor for KeywordAgent {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn run_turn(&self, input: &str, tools: &ToolRegistry) -> Result<String, Error> {
        let clauses: Vec<&str> = input
            .split([';', '\n'])
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();
        if clauses.is_empty() {
            return Err(Error::agent("Nothing to do"));
        }

        let mut lines = Vec::with_capacity(clauses.len());
        for clause in clauses {
            match route(clause) {
                Some(Route { tool, arguments }) if tools.get(tool).is_some() => {
                    debug!(tool, clause, "Routed clause");
                    let output = tools.execute(tool, arguments).await;
                    if output.is_error {
                        lines.push(format!("Error: {}", output.content));
                    } else {
                        lines.push(output.content);
                    }
                }
                Some(Route { tool, .. }) => {
                    lines.push(format!("The {} tool is disabled.", tool));
                }
                None => lines.push(unrouted(clause)),
            }
        }
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gk_core::approval::is_placeholder;
    use gk_core::{ApprovalGate, ApprovalStore};
    use gk_tools::{create_default_tools, ToolsConfig};
    use std::sync::Arc;

    fn registry(enabled: bool) -> (ToolRegistry, ApprovalGate) {
        let gate = ApprovalGate::new(Arc::new(ApprovalStore::new()), enabled);
        let config = ToolsConfig {
            enable_files: false,
            ..Default::default()
        };
        (create_default_tools(&config, &gate).unwrap(), gate)
    }

    #[test]
    fn test_route_calculator() {
        assert_eq!(
            route("calculate 15 * 23"),
            Some(Route::new("calculator", json!({"expression": "15 * 23"})))
        );
        assert_eq!(
            route("What is 2 ** 8?"),
            Some(Route::new("calculator", json!({"expression": "2 ** 8"})))
        );
        assert_eq!(
            route("(1 + 2) * 3"),
            Some(Route::new("calculator", json!({"expression": "(1 + 2) * 3"})))
        );
        assert_eq!(route("+-"), None);
    }

    #[test]
    fn test_route_other_tools() {
        assert_eq!(route("time").unwrap().tool, "get_current_time");
        assert_eq!(route("What time is it?").unwrap().tool, "get_current_time");
        assert_eq!(route("notes").unwrap().tool, "get_notes");
        assert_eq!(
            route("note buy milk"),
            Some(Route::new("note_taker", json!({"note": "buy milk"})))
        );
        assert_eq!(
            route("write out.txt: a: b"),
            Some(Route::new(
                "file_operations",
                json!({"operation": "write", "path": "out.txt", "content": "a: b"})
            ))
        );
        assert_eq!(route("write nocolon"), None);
        assert_eq!(route("list").unwrap().arguments["path"], ".");
        assert_eq!(route("read Cargo.toml").unwrap().arguments["operation"], "read");
        assert_eq!(route("hello there"), None);
    }

    #[test]
    fn test_route_text_and_facts() {
        assert_eq!(
            route("Analyze this text: Hello world!"),
            Some(Route::new("text_analyzer", json!({"text": "Hello world!"})))
        );
        assert_eq!(
            route("analyze The cat sat."),
            Some(Route::new("text_analyzer", json!({"text": "The cat sat."})))
        );
        assert_eq!(route("analyze"), None);
        assert_eq!(route("Tell me a random fact!").unwrap().tool, "random_fact");
        assert_eq!(route("fact").unwrap().tool, "random_fact");
    }

    #[tokio::test]
    async fn test_local_tools_run_without_approval() {
        let (tools, gate) = registry(true);
        let answer = KeywordAgent::new()
            .run_turn("analyze One two three.; random fact", &tools)
            .await
            .unwrap();

        let mut parts = answer.splitn(2, "Random fact: ");
        assert!(parts.next().unwrap().starts_with("Text analysis:"));
        assert!(parts.next().is_some());
        assert!(gate.store().is_empty());
    }

    #[tokio::test]
    async fn test_gated_clause_yields_placeholder() {
        let (tools, gate) = registry(true);
        let answer = KeywordAgent::new()
            .run_turn("calculate 15 * 23; note hi", &tools)
            .await
            .unwrap();

        let lines: Vec<&str> = answer.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(is_placeholder(lines[0]));
        assert!(lines[1].starts_with("Note #1 saved at "));
        assert_eq!(gate.store().pending_count(), 1);
    }

    #[tokio::test]
    async fn test_ungated_clause_runs_inline() {
        let (tools, gate) = registry(false);
        let answer = KeywordAgent::new()
            .run_turn("15 * 23", &tools)
            .await
            .unwrap();

        assert_eq!(answer, "Calculation result: 345");
        assert!(gate.store().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_and_unknown_clauses() {
        let (tools, _) = registry(true);
        let answer = KeywordAgent::new()
            .run_turn("list .\nsing a song", &tools)
            .await
            .unwrap();

        assert!(answer.starts_with("The file_operations tool is disabled."));
        assert!(answer.contains("I can't help with \"sing a song\""));
    }

    #[tokio::test]
    async fn test_empty_input_is_an_error() {
        let (tools, _) = registry(true);
        assert!(KeywordAgent::new().run_turn(" ; ", &tools).await.is_err());
    }
}
