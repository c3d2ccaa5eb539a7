//! Approval audit log.
//!
//! Writes JSON lines recording every request created, every decision taken
//! and every held answer released.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde::Serialize;

use gk_core::{ApprovalRequest, FinalAnswer, Resolution};

/// Audit logger that appends JSON lines to a file.
pub struct AuditLogger {
    writer: Mutex<BufWriter<File>>,
}

impl AuditLogger {
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    fn log<T: Serialize>(&self, event_type: &str, data: T) {
        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339(),
            event_type: event_type.to_string(),
            data: serde_json::to_value(data).unwrap_or_default(),
        };

        if let Ok(mut writer) = self.writer.lock() {
            if let Ok(json) = serde_json::to_string(&entry) {
                let _ = writeln!(writer, "{}", json);
                let _ = writer.flush();
            }
        }
    }

    pub fn log_created(&self, request: &ApprovalRequest) {
        self.log(
            "approval_created",
            CreatedEvent {
                id: request.id.value(),
                turn: request.turn.value(),
                description: &request.description,
            },
        );
    }

    pub fn log_resolution(&self, resolution: &Resolution) {
        let event = match resolution {
            Resolution::Executed { id, result } => DecisionEvent {
                id: id.value(),
                outcome: "executed",
                detail: Some(result),
            },
            Resolution::Failed { id, error } => DecisionEvent {
                id: id.value(),
                outcome: "error",
                detail: Some(error),
            },
            Resolution::Denied { id } => DecisionEvent {
                id: id.value(),
                outcome: "denied",
                detail: None,
            },
            Resolution::Stale { id, reason } => DecisionEvent {
                id: id.value(),
                outcome: "stale",
                detail: Some(reason),
            },
        };
        self.log("approval_decided", event);
    }

    pub fn log_released(&self, answer: &FinalAnswer) {
        self.log(
            "answer_released",
            ReleasedEvent {
                turn: answer.turn.value(),
                request_ids: answer.outcomes.iter().map(|(id, _)| id.value()).collect(),
                content_length: answer.content.len(),
            },
        );
    }

    pub fn log_mode(&self, enabled: bool) {
        self.log("approval_mode", ModeEvent { enabled });
    }

    pub fn log_reset(&self) {
        self.log("session_reset", serde_json::json!({}));
    }
}

#[derive(Serialize)]
struct LogEntry {
    timestamp: String,
    event_type: String,
    data: serde_json::Value,
}

#[derive(Serialize)]
struct CreatedEvent<'a> {
    id: u64,
    turn: u64,
    description: &'a str,
}

#[derive(Serialize)]
struct DecisionEvent<'a> {
    id: u64,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a String>,
}

#[derive(Serialize)]
struct ReleasedEvent {
    turn: u64,
    request_ids: Vec<u64>,
    content_length: usize,
}

#[derive(Serialize)]
struct ModeEvent {
    enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use gk_core::{ApprovalId, Outcome, TurnId};
    use tempfile::TempDir;

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_audit_events() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit").join("log.jsonl");
        let logger = AuditLogger::new(&path).unwrap();

        logger.log_resolution(&Resolution::Denied {
            id: ApprovalId::new(3),
        });
        logger.log_resolution(&Resolution::Failed {
            id: ApprovalId::new(4),
            error: "boom".to_string(),
        });
        logger.log_released(&FinalAnswer {
            turn: TurnId::new(2),
            content: "done".to_string(),
            outcomes: vec![(ApprovalId::new(3), Outcome::Denied)],
        });
        logger.log_mode(false);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["event_type"], "approval_decided");
        assert_eq!(lines[0]["data"]["outcome"], "denied");
        assert!(lines[0]["data"].get("detail").is_none());
        assert_eq!(lines[1]["data"]["detail"], "boom");
        assert_eq!(lines[2]["data"]["request_ids"], serde_json::json!([3]));
        assert_eq!(lines[3]["data"]["enabled"], false);
        assert!(lines[0]["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_appends_across_loggers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.jsonl");

        AuditLogger::new(&path).unwrap().log_reset();
        AuditLogger::new(&path).unwrap().log_reset();

        assert_eq!(read_lines(&path).len(), 2);
    }
}
