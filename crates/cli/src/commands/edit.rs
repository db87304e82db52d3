// `docsync edit`: line-oriented editor with autosave.
//
// Plain input lines are appended to the document. Lines starting with `:`
// are commands; `::` escapes a literal leading colon.

use anyhow::Context;
use clap::Args;
use docsync_engine::session::{LeaveDecision, LeavePolicy, Session, SessionSnapshot};
use docsync_engine::store::HttpStore;
use docsync_engine::view::EditorView;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use super::CliContext;
use crate::exit_code::UnsavedChanges;
use crate::output::{self, OutputFormat};

const HELP: &str = "\
Lines are appended to the document. Commands:
  :title <text>   set and save the title (empty clears it)
  :set <text>     replace the whole content
  :w              save now
  :status         show save status
  :p              print the document
  :q              quit (refuses with unsaved changes)
  :wq             save, wait, then quit
  :q!             quit and discard unsaved changes
  ::text          append a line starting with `:`";

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Document id.
    pub id: Uuid,
}

// ── Input parsing ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditCommand<'a> {
    Append(&'a str),
    SetContent(&'a str),
    Title(&'a str),
    Write,
    Status,
    Print,
    Quit,
    WriteQuit,
    ForceQuit,
    Help,
    Unknown(&'a str),
}

pub fn parse_line(line: &str) -> EditCommand<'_> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.starts_with("::") {
        return EditCommand::Append(&line[1..]);
    }
    let Some(command) = line.strip_prefix(':') else {
        return EditCommand::Append(line);
    };

    let (name, arg) = command.split_once(' ').unwrap_or((command, ""));
    match name {
        "w" => EditCommand::Write,
        "q" => EditCommand::Quit,
        "wq" | "x" => EditCommand::WriteQuit,
        "q!" => EditCommand::ForceQuit,
        "title" | "t" => EditCommand::Title(arg),
        "set" => EditCommand::SetContent(arg),
        "status" => EditCommand::Status,
        "p" | "print" => EditCommand::Print,
        "help" | "h" => EditCommand::Help,
        other => EditCommand::Unknown(other),
    }
}

// ── Command ────────────────────────────────────────────────────────

pub async fn run(args: EditArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let result = edit(args, ctx).await;
    if let Err(e) = &result {
        output::print_anyhow_error(OutputFormat::Human, e);
    }
    result
}

async fn edit(args: EditArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let documents = ctx.documents()?;
    let mut view = EditorView::new(documents, ctx.config.autosave);
    let result = edit_session(view.open(args.id)).await;
    view.close();
    result
}

async fn edit_session(session: &Session<HttpStore>) -> anyhow::Result<()> {
    let loaded = session.settled().await;
    if let Some(error) = loaded.error {
        return Err(error.into());
    }
    if let Some(failure) = loaded.last_failure.as_deref() {
        eprintln!("[load failed] {failure}; edits are kept and the load will be retried");
    } else {
        println!("{}", format_document(&loaded));
    }
    eprintln!("Type :help for commands.");

    let reporter = tokio::spawn(report_status(session.subscribe()));
    let result = input_loop(session).await;
    reporter.abort();
    result
}

async fn input_loop(session: &Session<HttpStore>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            debug!(doc_id = %session.id(), "input closed");
            return finish(session).await;
        };

        match parse_line(&line) {
            EditCommand::Append(text) => {
                let mut content = session.content();
                content.push_str(text);
                content.push('\n');
                session.update_content(content);
            }
            EditCommand::SetContent(text) => session.update_content(text),
            EditCommand::Title(title) => session.save_title(title),
            EditCommand::Write => session.save(),
            EditCommand::Status => println!("{}", format_status(&session.snapshot())),
            EditCommand::Print => println!("{}", format_document(&session.snapshot())),
            EditCommand::Quit => match session.before_leave(LeavePolicy::Confirm) {
                LeaveDecision::Proceed => return Ok(()),
                LeaveDecision::ConfirmDiscard => {
                    eprintln!("Unsaved changes. Use :wq to save or :q! to discard.");
                }
            },
            EditCommand::WriteQuit => return finish(session).await,
            EditCommand::ForceQuit => {
                if session.has_unsaved_changes() {
                    warn!(doc_id = %session.id(), "discarding unsaved changes");
                }
                return Ok(());
            }
            EditCommand::Help => println!("{HELP}"),
            EditCommand::Unknown(name) => eprintln!("Unknown command `:{name}`. Type :help."),
        }
    }
}

/// Save, wait for the outcome, and only report success if nothing is left
/// unsaved.
async fn finish(session: &Session<HttpStore>) -> anyhow::Result<()> {
    session.save();
    let snapshot = session.settled().await;
    if let Some(error) = snapshot.error {
        return Err(error.into());
    }
    if session.has_unsaved_changes() {
        let reason = snapshot.last_failure.unwrap_or_else(|| "save did not complete".into());
        return Err(anyhow::Error::new(UnsavedChanges).context(reason));
    }
    Ok(())
}

// ── Status reporting ───────────────────────────────────────────────

async fn report_status(mut rx: watch::Receiver<SessionSnapshot>) {
    let mut prev = rx.borrow_and_update().clone();
    while rx.changed().await.is_ok() {
        let next = rx.borrow_and_update().clone();
        if let Some(line) = describe_change(&prev, &next) {
            eprintln!("{line}");
        }
        prev = next;
    }
}

/// One status line for a snapshot transition, or `None` when nothing the
/// user cares about changed.
pub fn describe_change(prev: &SessionSnapshot, next: &SessionSnapshot) -> Option<String> {
    if next.error != prev.error {
        if let Some(error) = &next.error {
            return Some(format!("[error] {error}; autosave stopped"));
        }
    }
    if next.last_failure != prev.last_failure {
        if let Some(failure) = &next.last_failure {
            return Some(format!("[save failed] {failure}; will retry"));
        }
    }
    if next.status != prev.status {
        return Some(format!("[{}]", next.status.label()));
    }
    None
}

fn format_document(snapshot: &SessionSnapshot) -> String {
    let title = if snapshot.title.trim().is_empty() { "Untitled" } else { &snapshot.title };
    if snapshot.content.is_empty() {
        format!("# {title}")
    } else {
        format!("# {title}\n\n{}", snapshot.content.trim_end_matches('\n'))
    }
}

fn format_status(snapshot: &SessionSnapshot) -> String {
    let yes_no = |flag: bool| if flag { "yes" } else { "no" };
    let mut lines = vec![
        format!("Status:        {}", snapshot.status.label()),
        format!("Unsaved edits: {}", yes_no(snapshot.dirty)),
        format!("Title pending: {}", yes_no(snapshot.pending_title)),
    ];
    if let Some(failure) = &snapshot.last_failure {
        lines.push(format!("Last failure:  {failure}"));
    }
    if let Some(error) = &snapshot.error {
        lines.push(format!("Error:         {error}"));
    }
    lines.join("\n")
}
