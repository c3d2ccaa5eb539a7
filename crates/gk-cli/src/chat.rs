//! Interactive chat loop.
//!
//! Each line the user enters is one full cycle: apply the input, print any
//! answers that became complete, then rebuild the approval section from the
//! session. Nothing on screen is kept between cycles.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::ValueEnum;
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::{Config, Editor};
use tracing::{debug, info};

use gk_core::{AgentExecutor, DecisionReport, Role, Session, TurnOutcome};

use crate::agent::KeywordAgent;
use crate::audit_log::AuditLogger;
use crate::interface::{parse_user_input, ChatCommand, UserInput, HELP_TEXT};
use crate::render;

/// Decision applied to every pending request in one-shot mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AutoDecision {
    Approve,
    Deny,
}

/// Whether the loop keeps going after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct ChatLoop {
    session: Session,
    agent: Arc<dyn AgentExecutor>,
    audit: Option<AuditLogger>,
    /// Transcript entries already printed.
    printed: usize,
}

impl ChatLoop {
    pub fn new(session: Session, audit: Option<AuditLogger>) -> Self {
        Self::with_agent(session, Arc::new(KeywordAgent::new()), audit)
    }

    pub fn with_agent(
        session: Session,
        agent: Arc<dyn AgentExecutor>,
        audit: Option<AuditLogger>,
    ) -> Self {
        debug!(agent = agent.name(), "Chat loop ready");
        Self {
            session,
            agent,
            audit,
            printed: 0,
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run one cycle for `input` and redraw.
    pub async fn cycle(&mut self, input: UserInput) -> Result<Flow> {
        let flow = self.handle(input).await?;
        self.flush_answers()?;
        self.redraw()?;
        Ok(flow)
    }

    async fn handle(&mut self, input: UserInput) -> Result<Flow> {
        match input {
            UserInput::Empty => {}
            UserInput::Invalid(msg) => render::print_error(&msg)?,
            UserInput::Message(text) => self.submit(&text).await?,
            UserInput::Command(cmd) => return self.command(cmd),
        }
        Ok(Flow::Continue)
    }

    async fn submit(&mut self, text: &str) -> Result<()> {
        let result = self.session.run_turn(self.agent.as_ref(), text).await;
        self.audit_created();

        match result {
            Ok(TurnOutcome::Answered(_)) => {}
            Ok(TurnOutcome::AwaitingApproval { turn, pending }) => {
                render::print_status(&format!(
                    "Turn {} is waiting on {} approval(s)",
                    turn, pending
                ))?;
            }
            Err(err) => render::print_error(&err.to_string())?,
        }
        Ok(())
    }

    fn command(&mut self, cmd: ChatCommand) -> Result<Flow> {
        match cmd {
            ChatCommand::Approve(id) => {
                let report = self.session.approve(id);
                self.report(&report)?;
            }
            ChatCommand::Deny(id) => {
                let report = self.session.deny(id);
                self.report(&report)?;
            }
            ChatCommand::ApproveAll => {
                let report = self.session.approve_all();
                if report.resolutions.is_empty() {
                    render::print_status("Nothing to approve")?;
                }
                self.report(&report)?;
            }
            ChatCommand::DenyAll => {
                let report = self.session.deny_all();
                if report.resolutions.is_empty() {
                    render::print_status("Nothing to deny")?;
                }
                self.report(&report)?;
            }
            ChatCommand::ClearProcessed => {
                let removed = self.session.clear_processed();
                render::print_status(&format!("Removed {} processed request(s)", removed))?;
            }
            ChatCommand::Stats => {
                let store = self.session.store();
                render::print_stats(
                    &store.counts(),
                    self.session.gate().is_enabled(),
                    &self.session.awaiting_turns(),
                )?;
                if let Some(age) = store.oldest_pending_age(chrono::Utc::now()) {
                    render::print_status(&format!(
                        "Oldest pending request: {}",
                        render::format_age(age)
                    ))?;
                }
                let processed: Vec<_> = store
                    .list(None)
                    .into_iter()
                    .filter(|r| r.is_terminal())
                    .collect();
                render::print_processed(&processed)?;
            }
            ChatCommand::Mode(None) => {
                let state = if self.session.gate().is_enabled() { "on" } else { "off" };
                render::print_status(&format!("Approval mode is {}", state))?;
            }
            ChatCommand::Mode(Some(enabled)) => {
                self.session.set_approval_enabled(enabled);
                if let Some(audit) = &self.audit {
                    audit.log_mode(enabled);
                }
                let state = if enabled { "on" } else { "off" };
                render::print_status(&format!("Approval mode {}", state))?;
                let pending = self.session.store().pending_count();
                if !enabled && pending > 0 {
                    render::print_status(&format!(
                        "{} request(s) still need a decision",
                        pending
                    ))?;
                }
            }
            ChatCommand::ListTools => render::print_tools(self.session.tools())?,
            ChatCommand::Reset => {
                self.session.reset();
                self.printed = 0;
                if let Some(audit) = &self.audit {
                    audit.log_reset();
                }
                render::print_status("Session reset")?;
            }
            ChatCommand::Help => println!("{}", HELP_TEXT),
            ChatCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn report(&self, report: &DecisionReport) -> Result<()> {
        for resolution in &report.resolutions {
            render::print_resolution(resolution)?;
            if let Some(audit) = &self.audit {
                audit.log_resolution(resolution);
            }
        }
        if let Some(audit) = &self.audit {
            for answer in &report.released {
                audit.log_released(answer);
            }
        }
        Ok(())
    }

    fn audit_created(&self) {
        let Some(audit) = &self.audit else {
            return;
        };
        let store = self.session.store();
        for request in store.list_turn(store.current_turn()) {
            audit.log_created(&request);
        }
    }

    /// Print assistant entries appended since the last cycle.
    fn flush_answers(&mut self) -> Result<()> {
        let transcript = self.session.transcript();
        for message in &transcript[self.printed.min(transcript.len())..] {
            if message.role == Role::Assistant {
                render::print_answer(message.turn, &message.content)?;
            }
        }
        self.printed = transcript.len();
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let panel = self.session.redraw();
        render::print_panel(&panel)?;
        Ok(())
    }

    /// Read-eval-redraw until the user quits.
    pub async fn run(mut self) -> Result<()> {
        let config = Config::builder()
            .history_ignore_space(true)
            .history_ignore_dups(true)?
            .build();
        let mut editor: Editor<(), FileHistory> = Editor::with_config(config)?;
        let history_path = get_history_path();
        if let Some(ref path) = history_path {
            let _ = editor.load_history(path);
        }

        render::print_section_header("gk")?;
        render::print_status(&format!(
            "{} tools loaded · approval mode {}",
            self.session.tools().len(),
            if self.session.gate().is_enabled() { "on" } else { "off" }
        ))?;
        self.redraw()?;

        loop {
            let _ = render::print_prompt_hint();
            let input = match editor.readline("you> ") {
                Ok(line) => {
                    let _ = editor.add_history_entry(&line);
                    parse_user_input(&line)
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Goodbye!");
                    break;
                }
                Err(e) => return Err(anyhow::anyhow!("Error reading input: {}", e)),
            };

            if self.cycle(input).await? == Flow::Quit {
                break;
            }
        }

        if let Some(ref path) = history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = editor.save_history(path);
        }
        let pending = self.session.store().pending_count();
        if pending > 0 {
            info!(pending, "Exiting with undecided requests");
        }
        Ok(())
    }

    /// One-shot mode: run `message` as a single turn and settle its
    /// approvals with `auto`, or by asking on a terminal.
    pub async fn ask(mut self, message: &str, auto: Option<AutoDecision>) -> Result<()> {
        self.submit(message).await?;

        if self.session.store().pending_count() > 0 {
            match auto {
                Some(AutoDecision::Approve) => {
                    let report = self.session.approve_all();
                    self.report(&report)?;
                }
                Some(AutoDecision::Deny) => {
                    let report = self.session.deny_all();
                    self.report(&report)?;
                }
                None if atty::is(atty::Stream::Stdin) => self.decide_interactively()?,
                None => {
                    anyhow::bail!(
                        "{} request(s) need approval; rerun with --auto approve|deny",
                        self.session.store().pending_count()
                    );
                }
            }
        }

        self.flush_answers()
    }

    fn decide_interactively(&mut self) -> Result<()> {
        let panel = self.session.redraw();
        render::print_panel(&panel)?;

        for card in panel.pending {
            print!("Approve #{} ({})? [y/N] ", card.id.value(), card.description);
            std::io::stdout().flush()?;

            let mut input = String::new();
            std::io::stdin().read_line(&mut input)?;
            let report = if input.trim().eq_ignore_ascii_case("y") {
                self.session.approve(card.id)
            } else {
                self.session.deny(card.id)
            };
            debug!(id = %card.id, "Decided interactively");
            self.report(&report)?;
        }
        Ok(())
    }
}

fn get_history_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gk").join("chat_history"))
}
