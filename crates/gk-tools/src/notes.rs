//! Note tools backed by SQLite.

use async_trait::async_trait;
use chrono::Local;
use rusqlite::{params, Connection};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use gk_core::{Error, PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: i64,
    pub content: String,
    pub created_at: String,
}

/// Note storage backed by SQLite
pub struct NoteStore {
    conn: Mutex<Connection>,
}

impl NoteStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = db_path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::tool("notes", format!("Failed to create directory: {}", e)))?;
        }

        let conn = Connection::open(&path)
            .map_err(|e| Error::tool("notes", format!("Failed to open database: {}", e)))?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().map_err(|e| {
            Error::tool("notes", format!("Failed to create in-memory database: {}", e))
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, Error> {
        conn.execute(SCHEMA, [])
            .map_err(|e| Error::tool("notes", format!("Failed to create table: {}", e)))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.conn
            .lock()
            .map_err(|_| Error::tool("notes", "Note database lock poisoned"))
    }

    pub fn add(&self, content: &str) -> Result<Note, Error> {
        let created_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO notes (content, created_at) VALUES (?, ?)",
            params![content, created_at],
        )
        .map_err(|e| Error::tool("notes", format!("Failed to save note: {}", e)))?;

        Ok(Note {
            id: conn.last_insert_rowid(),
            content: content.to_string(),
            created_at,
        })
    }

    pub fn list(&self) -> Result<Vec<Note>, Error> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, content, created_at FROM notes ORDER BY id")
            .map_err(|e| Error::tool("notes", e.to_string()))?;

        let notes = stmt
            .query_map([], |row| {
                Ok(Note {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })
            .map_err(|e| Error::tool("notes", e.to_string()))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(notes)
    }
}

// =============================================================================
// Note Taker Tool
// =============================================================================

pub struct NoteTakerTool {
    store: Arc<NoteStore>,
}

impl NoteTakerTool {
    pub fn new(store: Arc<NoteStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct NoteTakerArgs {
    note: String,
}

#[async_trait]
impl Tool for NoteTakerTool {
    fn name(&self) -> &str {
        "note_taker"
    }

    fn description(&self) -> &str {
        "Save a note with automatic timestamp and ID for later reference."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(
            ToolParameters::new().add_property(
                "note",
                PropertySchema::string("Note content to save"),
                true,
            ),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, Error> {
        let args: NoteTakerArgs = serde_json::from_value(arguments)
            .map_err(|e| Error::tool("note_taker", format!("Invalid arguments: {}", e)))?;

        let content = args.note.trim();
        if content.is_empty() {
            return Ok(ToolOutput::error("Please provide note content to save"));
        }

        let note = self.store.add(content)?;
        Ok(ToolOutput::success(format!(
            "Note #{} saved at {}: {}",
            note.id, note.created_at, note.content
        )))
    }
}

// =============================================================================
// Get Notes Tool
// =============================================================================

pub struct GetNotesTool {
    store: Arc<NoteStore>,
}

impl GetNotesTool {
    pub fn new(store: Arc<NoteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetNotesTool {
    fn name(&self) -> &str {
        "get_notes"
    }

    fn description(&self) -> &str {
        "Retrieve all saved notes with timestamps and IDs."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(ToolParameters::new())
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolOutput, Error> {
        let notes = self.store.list()?;
        if notes.is_empty() {
            return Ok(ToolOutput::success("No notes saved yet."));
        }

        let lines: Vec<String> = notes
            .iter()
            .map(|n| format!("#{} [{}]: {}", n.id, n.created_at, n.content))
            .collect();
        Ok(ToolOutput::success(format!(
            "Your saved notes ({} total):\n\n{}",
            notes.len(),
            lines.join("\n")
        )))
    }
}

/// Create both note tools over one store
pub fn create_note_tools(store: Arc<NoteStore>) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(NoteTakerTool::new(store.clone())),
        Box::new(GetNotesTool::new(store)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_take_and_list_notes() {
        let store = Arc::new(NoteStore::in_memory().unwrap());
        let taker = NoteTakerTool::new(store.clone());
        let getter = GetNotesTool::new(store.clone());

        let empty = getter.execute(serde_json::json!({})).await.unwrap();
        assert_eq!(empty.content, "No notes saved yet.");

        let out = taker
            .execute(serde_json::json!({"note": "  buy milk  "}))
            .await
            .unwrap();
        assert!(out.content.starts_with("Note #1 saved at "));
        assert!(out.content.ends_with(": buy milk"));

        taker
            .execute(serde_json::json!({"note": "call home"}))
            .await
            .unwrap();

        let listed = getter.execute(serde_json::json!({})).await.unwrap();
        assert!(listed.content.starts_with("Your saved notes (2 total):"));
        assert!(listed.content.contains("]: buy milk"));
        assert!(listed.content.contains("#2 ["));
    }

    #[tokio::test]
    async fn test_blank_note_rejected() {
        let store = Arc::new(NoteStore::in_memory().unwrap());
        let taker = NoteTakerTool::new(store.clone());

        let out = taker.execute(serde_json::json!({"note": "   "})).await.unwrap();
        assert!(out.is_error);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_notes_persist_across_opens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("notes.db");

        NoteStore::new(&path).unwrap().add("first").unwrap();
        let reopened = NoteStore::new(&path).unwrap();

        let notes = reopened.list().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, "first");
    }
}
