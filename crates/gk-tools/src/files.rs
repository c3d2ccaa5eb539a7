//! File operations tool (gated).
//!
//! Paths are resolved and checked against the root before the request is
//! gated, so the approval card always names the real target.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use gk_core::{
    Action, ApprovalGate, Error, PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters,
};

/// Max bytes returned by a read.
const MAX_READ_BYTES: usize = 64 * 1024;

/// Base path for file operations (security boundary)
#[derive(Debug, Clone)]
pub struct FileSystemConfig {
    pub root: PathBuf,
    pub allow_write: bool,
}

impl Default for FileSystemConfig {
    fn default() -> Self {
        Self {
            root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            allow_write: false,
        }
    }
}

impl FileSystemConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            allow_write: false,
        }
    }

    pub fn with_write(mut self, allow: bool) -> Self {
        self.allow_write = allow;
        self
    }

    /// Resolve and validate a path is within the root
    fn resolve_path(&self, path: &str) -> Result<PathBuf, Error> {
        let requested = Path::new(path);
        let resolved = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.root.join(requested)
        };

        let canonical = canonicalize_existing(&resolved).map_err(|e| {
            Error::tool("file_operations", format!("Invalid path '{}': {}", path, e))
        })?;

        let canonical_root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        if !canonical.starts_with(&canonical_root) {
            return Err(Error::tool(
                "file_operations",
                format!("Path '{}' is outside allowed root", path),
            ));
        }

        Ok(canonical)
    }
}

/// Canonicalize the nearest existing ancestor of `path` and re-join the
/// missing tail. The tail may only hold plain names, so `..` can never
/// climb out of the canonical prefix.
fn canonicalize_existing(path: &Path) -> std::io::Result<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(canonical) => {
                return Ok(missing
                    .iter()
                    .rev()
                    .fold(canonical, |acc, name| acc.join(name)));
            }
            Err(err) => match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name.to_os_string());
                    existing = parent;
                }
                _ => return Err(err),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOperation {
    Read,
    Write,
    List,
}

impl FileOperation {
    fn as_str(self) -> &'static str {
        match self {
            FileOperation::Read => "read",
            FileOperation::Write => "write",
            FileOperation::List => "list",
        }
    }
}

fn read_file(path: &Path, display: &str) -> Result<String, Error> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::action(format!("File not found: {}", display)),
        _ => Error::action(format!("Failed to read '{}': {}", display, e)),
    })?;
    let text = String::from_utf8(bytes).map_err(|_| {
        Error::action(format!(
            "Cannot read file: {} (encoding error - file may be binary)",
            display
        ))
    })?;

    if text.len() > MAX_READ_BYTES {
        let mut cut = MAX_READ_BYTES;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        Ok(format!(
            "{}\n\n[truncated: showing {} of {} bytes]",
            &text[..cut],
            cut,
            text.len()
        ))
    } else {
        Ok(text)
    }
}

fn write_file(path: &Path, display: &str, content: &str) -> Result<String, Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::action(format!("Failed to create directory: {}", e)))?;
    }
    std::fs::write(path, content)
        .map_err(|e| Error::action(format!("Failed to write '{}': {}", display, e)))?;
    Ok(format!("Wrote {} bytes to {}", content.len(), display))
}

fn list_dir(path: &Path, display: &str) -> Result<String, Error> {
    let entries = std::fs::read_dir(path)
        .map_err(|e| Error::action(format!("Failed to list '{}': {}", display, e)))?;

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                format!("{}/", name)
            } else {
                name
            }
        })
        .collect();
    names.sort();

    if names.is_empty() {
        Ok(format!("{} is empty", display))
    } else {
        Ok(names.join("\n"))
    }
}

pub struct FileOperationsTool {
    config: FileSystemConfig,
    gate: ApprovalGate,
}

impl FileOperationsTool {
    pub fn new(config: FileSystemConfig, gate: ApprovalGate) -> Self {
        Self { config, gate }
    }
}

#[derive(Deserialize)]
struct FileOperationsArgs {
    operation: FileOperation,
    #[serde(default = "default_path")]
    path: String,
    #[serde(default)]
    content: Option<String>,
}

fn default_path() -> String {
    ".".to_string()
}

#[async_trait]
impl Tool for FileOperationsTool {
    fn name(&self) -> &str {
        "file_operations"
    }

    fn description(&self) -> &str {
        "Read, write, or list files inside the workspace root."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(
            ToolParameters::new()
                .add_property(
                    "operation",
                    PropertySchema::enum_string(
                        "Operation to perform",
                        vec!["read".to_string(), "write".to_string(), "list".to_string()],
                    ),
                    true,
                )
                .add_property("path", PropertySchema::string("Path relative to the root"), false)
                .add_property("content", PropertySchema::string("Content for write"), false),
        )
    }

    fn requires_approval(&self) -> bool {
        true
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, Error> {
        let args: FileOperationsArgs = serde_json::from_value(arguments)
            .map_err(|e| Error::tool("file_operations", format!("Invalid arguments: {}", e)))?;

        if args.operation == FileOperation::Write && !self.config.allow_write {
            return Ok(ToolOutput::error("Write operations are disabled"));
        }

        let path = self.config.resolve_path(&args.path)?;
        let display = args.path.clone();
        let description = format!("File {}: {}", args.operation.as_str(), display);

        let action = match args.operation {
            FileOperation::Read => Action::new(move || read_file(&path, &display)),
            FileOperation::List => Action::new(move || list_dir(&path, &display)),
            FileOperation::Write => {
                let content = args.content.ok_or_else(|| {
                    Error::tool("file_operations", "Write requires 'content'")
                })?;
                Action::new(move || write_file(&path, &display, &content))
            }
        };

        Ok(ToolOutput::success(self.gate.request(description, action)))
    }
}
