//! gk-tools: Built-in tools for gatekeep
//!
//! This crate provides the tools available to the agent:
//! - Calculator: arithmetic expressions (gated)
//! - Clock: current date and time
//! - Files: read, write and list under a root directory (gated)
//! - Notes: persistent notes in SQLite
//! - Text analyzer: word, sentence and readability statistics
//! - Random fact

pub mod calculator;
pub mod clock;
pub mod facts;
pub mod files;
pub mod notes;
pub mod text;

use std::path::PathBuf;
use std::sync::Arc;

use gk_core::{ApprovalGate, Error, ToolRegistry};
use tracing::debug;

pub use calculator::{evaluate, format_number, CalculatorTool};
pub use clock::{describe_time, CurrentTimeTool};
pub use facts::{random_fact, RandomFactTool};
pub use files::{FileOperation, FileOperationsTool, FileSystemConfig};
pub use notes::{create_note_tools, GetNotesTool, Note, NoteStore, NoteTakerTool};
pub use text::{analyze, TextAnalyzerTool, TextStats};

/// Which tools to build and where they keep their state.
#[derive(Debug, Clone)]
pub struct ToolsConfig {
    pub root: PathBuf,
    pub allow_write: bool,
    /// `None` keeps notes in memory for the session only.
    pub notes_db: Option<PathBuf>,
    pub enable_calculator: bool,
    pub enable_clock: bool,
    pub enable_files: bool,
    pub enable_notes: bool,
    pub enable_text: bool,
    pub enable_facts: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            allow_write: false,
            notes_db: None,
            enable_calculator: true,
            enable_clock: true,
            enable_files: true,
            enable_notes: true,
            enable_text: true,
            enable_facts: true,
        }
    }
}

/// Build the registry of enabled tools. Gated tools share `gate`.
pub fn create_default_tools(
    config: &ToolsConfig,
    gate: &ApprovalGate,
) -> Result<ToolRegistry, Error> {
    let mut registry = ToolRegistry::new();

    if config.enable_calculator {
        registry.register(Box::new(CalculatorTool::new(gate.clone())));
    }
    if config.enable_clock {
        registry.register(Box::new(CurrentTimeTool));
    }
    if config.enable_files {
        let fs_config = FileSystemConfig::new(&config.root).with_write(config.allow_write);
        registry.register(Box::new(FileOperationsTool::new(fs_config, gate.clone())));
    }
    if config.enable_notes {
        let store = match &config.notes_db {
            Some(path) => NoteStore::new(path)?,
            None => NoteStore::in_memory()?,
        };
        for tool in create_note_tools(Arc::new(store)) {
            registry.register(tool);
        }
    }
    if config.enable_text {
        registry.register(Box::new(TextAnalyzerTool));
    }
    if config.enable_facts {
        registry.register(Box::new(RandomFactTool));
    }

    debug!(tools = ?registry.names(), "Tools registered");
    Ok(registry)
}
