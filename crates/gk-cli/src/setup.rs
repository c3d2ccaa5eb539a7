use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use crate::config::Config;

const CONFIG_TEMPLATE: &str = r#"# gk configuration
#
# Every key can also be set from the environment, e.g.
#   GK_APPROVAL__ENABLED=false
#   GK_TOOLS__ALLOW_WRITE=true

# ── Approval ─────────────────────────────────────────────────────
# Sensitive tools (calculator, file_operations) wait for a human
# decision before they run. Toggle at runtime with /mode on|off.

[approval]
enabled = true
# audit_file = "~/.config/gk/audit.jsonl"

# ── Tools ────────────────────────────────────────────────────────

[tools]
# root = "$PWD"                   # file_operations cannot leave this directory
# notes_db = "~/.config/gk/notes.db"   # unset keeps notes in memory
allow_write = false
enable_calculator = true
enable_clock = true
enable_files = true
enable_notes = true
enable_text = true
enable_facts = true
"#;

pub fn run() -> Result<()> {
    let config_dir = Config::config_dir()?;
    let config_path = config_dir.join("config.toml");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;

    if config_path.exists() {
        println!("Existing config file found:");
        println!("  {}", config_path.display());
        print!("\nOverwrite? (Existing file will be backed up) [y/N] ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Setup cancelled.");
            return Ok(());
        }

        backup_file(&config_path)?;
    }

    std::fs::write(&config_path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("Created {}", config_path.display());

    println!("\nNext steps:");
    println!("  1. Start chatting:    gk");
    println!("  2. Or ask once:       gk ask \"calculate 15 * 23\" --auto approve");

    Ok(())
}

/// Back up a file to <name>.bak, appending a timestamp if .bak already exists.
fn backup_file(path: &Path) -> Result<()> {
    let mut backup = path.with_extension("toml.bak");

    if backup.exists() {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        backup = path.with_extension(format!("toml.bak.{}", timestamp));
    }

    std::fs::rename(path, &backup)
        .with_context(|| format!("Failed to back up {} to {}", path.display(), backup.display()))?;
    println!("  Backed up to {}", backup.display());

    Ok(())
}
