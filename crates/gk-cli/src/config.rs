use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use gk_tools::ToolsConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub approval: ApprovalConfig,

    #[serde(default)]
    pub tools: ToolsConfigEntry,
}

/// Approval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Gate sensitive tools behind human approval
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// JSON-lines audit log of approval events (supports $HOME, ~)
    #[serde(default)]
    pub audit_file: Option<String>,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            audit_file: None,
        }
    }
}

/// Tools configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfigEntry {
    /// Root directory for file operations (supports $PWD, $HOME, ~)
    #[serde(default)]
    pub root: Option<String>,

    /// Path to notes database (supports $HOME, ~). Unset keeps notes in memory.
    #[serde(default)]
    pub notes_db: Option<String>,

    /// Allow write operations for the file tool
    #[serde(default)]
    pub allow_write: bool,

    #[serde(default = "default_true")]
    pub enable_calculator: bool,

    #[serde(default = "default_true")]
    pub enable_clock: bool,

    #[serde(default = "default_true")]
    pub enable_files: bool,

    #[serde(default = "default_true")]
    pub enable_notes: bool,

    #[serde(default = "default_true")]
    pub enable_text: bool,

    #[serde(default = "default_true")]
    pub enable_facts: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ToolsConfigEntry {
    fn default() -> Self {
        Self {
            root: None, // Will default to $PWD at runtime
            notes_db: None,
            allow_write: false,
            enable_calculator: true,
            enable_clock: true,
            enable_files: true,
            enable_notes: true,
            enable_text: true,
            enable_facts: true,
        }
    }
}

impl ToolsConfigEntry {
    /// Resolve paths into the settings the tools crate consumes.
    pub fn to_tools_config(&self) -> Result<ToolsConfig> {
        let root = match &self.root {
            Some(root) => expand_path(root),
            None => std::env::current_dir().context("Could not determine working directory")?,
        };

        Ok(ToolsConfig {
            root,
            allow_write: self.allow_write,
            notes_db: self.notes_db.as_deref().map(expand_path),
            enable_calculator: self.enable_calculator,
            enable_clock: self.enable_clock,
            enable_files: self.enable_files,
            enable_notes: self.enable_notes,
            enable_text: self.enable_text,
            enable_facts: self.enable_facts,
        })
    }
}

/// Expand environment variables in a path string
/// Supports: $VAR, ${VAR}, ~
pub fn expand_path(path: &str) -> PathBuf {
    let mut result = path.to_string();

    // Expand ~ at the start
    if result.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            result = format!("{}{}", home.display(), &result[1..]);
        }
    } else if result == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }

    // Expand $VAR and ${VAR}
    let expanded = match regex::Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?") {
        Ok(re) => re
            .replace_all(&result, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
            })
            .to_string(),
        Err(_) => result,
    };

    PathBuf::from(expanded)
}

impl Config {
    /// Defaults, then the config file if present, then `GK_` variables
    /// (`GK_APPROVAL__ENABLED=false`).
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("GK_").split("__"))
            .extract()
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("gk"))
    }

    /// Audit file from config, with paths expanded.
    pub fn audit_file(&self) -> Option<PathBuf> {
        self.approval.audit_file.as_deref().map(expand_path)
    }
}
