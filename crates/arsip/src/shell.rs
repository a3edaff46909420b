//! Line-oriented archive session.
//!
//! Each input line is split with shell quoting rules and parsed as one
//! command. Commands run to completion one at a time, except prints, which
//! are spawned and keep running while the session accepts more input.
//! Failed commands are reported and the session carries on.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::archive::{Archive, Submitted};
use crate::attachment::SelectedFile;
use crate::cli::ThemeCommand;
use crate::error::Result;
use crate::form::FormValues;
use crate::print::{PrintDispatcher, PrintHost, PrintReport};
use crate::record::{RecordId, RecordSummary};
use crate::resolver::HandleProvider;
use crate::storage::KeyValueStore;
use crate::theme::{Theme, ThemeToggle};

const PROMPT: &str = "arsip> ";

#[derive(Debug, Parser)]
#[command(name = "arsip", no_binary_name = true)]
#[command(disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Debug, Subcommand)]
enum ShellCommand {
    /// Save the form as a new record, or apply the edit in progress
    Save(SaveArgs),

    /// Load a record into the form
    Edit {
        /// Record id
        id: RecordId,
    },

    /// Clear the form and leave edit mode
    Cancel,

    /// Delete a record
    Delete {
        /// Record id
        id: RecordId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Print a record in the background
    Print {
        /// Record id
        id: RecordId,
    },

    /// Wait for background prints to finish
    Wait,

    /// Show the records
    #[command(alias = "ls")]
    List {
        /// Write the table as an HTML page
        #[arg(long, value_name = "FILE")]
        html: Option<PathBuf>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show or change the color theme
    Theme {
        #[command(subcommand)]
        action: Option<ThemeCommand>,
    },

    /// Show the form contents
    Form,

    /// End the session
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, Args)]
struct SaveArgs {
    /// Title (kept from the form when omitted)
    #[arg(short, long)]
    title: Option<String>,

    /// Category (kept from the form when omitted)
    #[arg(short, long)]
    category: Option<String>,

    /// Date (kept from the form when omitted)
    #[arg(short, long)]
    date: Option<String>,

    /// File to attach
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// MIME type of the file, instead of guessing from its extension
    #[arg(long, requires = "file")]
    mime: Option<String>,
}

enum Flow {
    Continue,
    Quit,
}

/// An interactive archive session.
pub struct Session<P, H, S> {
    archive: Archive<P>,
    dispatcher: Arc<PrintDispatcher<H>>,
    theme: ThemeToggle<S>,
    prints: JoinSet<Result<PrintReport>>,
    assume_yes: bool,
    interactive: bool,
}

impl<P, H, S> std::fmt::Debug for Session<P, H, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("prints_in_flight", &self.prints.len())
            .field("assume_yes", &self.assume_yes)
            .field("interactive", &self.interactive)
            .finish_non_exhaustive()
    }
}

impl<P, H, S> Session<P, H, S>
where
    P: HandleProvider,
    H: PrintHost + 'static,
    S: KeyValueStore,
{
    /// Create a session.
    #[must_use]
    pub fn new(archive: Archive<P>, dispatcher: PrintDispatcher<H>, theme: ThemeToggle<S>) -> Self {
        Self {
            archive,
            dispatcher: Arc::new(dispatcher),
            theme,
            prints: JoinSet::new(),
            assume_yes: false,
            interactive: false,
        }
    }

    /// Answer yes to every confirmation.
    #[must_use]
    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    /// Show a prompt before reading each line.
    #[must_use]
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// The archive behind the session.
    #[must_use]
    pub fn archive(&self) -> &Archive<P> {
        &self.archive
    }

    /// The active theme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme.current()
    }

    /// Read commands until `quit` or end of input, then wait for prints
    /// and revoke every display handle.
    ///
    /// # Errors
    ///
    /// Returns an error only if reading input or writing output fails.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        if self.interactive {
            writeln!(out, "arsip session. Type `help` for commands.")?;
        }

        loop {
            if self.interactive {
                write!(out, "{PROMPT}")?;
                out.flush()?;
            }
            let Some(line) = lines.next_line().await? else {
                break;
            };
            match self.execute(&line, &mut lines, out).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(e) => {
                    debug!(error = %e, line, "Command failed");
                    writeln!(out, "error: {e}")?;
                }
            }
        }

        self.finish(out).await
    }

    async fn execute<R, W>(&mut self, line: &str, lines: &mut Lines<R>, out: &mut W) -> Result<Flow>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(Flow::Continue);
        }
        let Some(words) = shlex::split(trimmed) else {
            writeln!(out, "error: unbalanced quotes")?;
            return Ok(Flow::Continue);
        };
        let parsed = match ShellLine::try_parse_from(words) {
            Ok(parsed) => parsed,
            Err(e) => {
                write!(out, "{}", e.render())?;
                return Ok(Flow::Continue);
            }
        };

        match parsed.command {
            ShellCommand::Save(args) => {
                let values = self.merge_form(args)?;
                match self.archive.submit(values)? {
                    Submitted::Created(id) => writeln!(out, "Saved record {id}")?,
                    Submitted::Updated(id) => writeln!(out, "Updated record {id}")?,
                }
                write!(out, "{}", self.archive.table().render_text())?;
            }
            ShellCommand::Edit { id } => {
                let form = self.archive.begin_edit(id)?;
                writeln!(out, "Editing record {id}")?;
                write_form(out, &form.values(), form.submit_label())?;
            }
            ShellCommand::Cancel => {
                self.archive.cancel();
                writeln!(out, "Form cleared")?;
            }
            ShellCommand::Delete { id, yes } => {
                let title = self.archive.store().get(id)?.title.clone();
                if !(yes || self.assume_yes) && !confirm(&title, id, lines, out).await? {
                    writeln!(out, "Kept record {id}")?;
                    return Ok(Flow::Continue);
                }
                self.archive.delete(id)?;
                writeln!(out, "Deleted record {id}")?;
                write!(out, "{}", self.archive.table().render_text())?;
            }
            ShellCommand::Print { id } => {
                let job = self.archive.print_job(id)?;
                let dispatcher = Arc::clone(&self.dispatcher);
                self.prints
                    .spawn(async move { dispatcher.print_record(job).await });
                writeln!(out, "Printing record {id}")?;
            }
            ShellCommand::Wait => self.wait_for_prints(out).await?,
            ShellCommand::List { html, json } => self.list(html, json, out)?,
            ShellCommand::Theme { action } => {
                let theme = match action {
                    None | Some(ThemeCommand::Show) => self.theme.current(),
                    Some(ThemeCommand::Toggle) => self.theme.toggle()?,
                    Some(ThemeCommand::Set { theme }) => self.theme.set(theme.into())?,
                };
                writeln!(out, "Theme: {theme}")?;
            }
            ShellCommand::Form => {
                let form = self.archive.form();
                write_form(out, &form.values(), form.submit_label())?;
            }
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Form values with the given flags applied on top.
    fn merge_form(&self, args: SaveArgs) -> Result<FormValues> {
        let mut values = self.archive.form().values();
        if let Some(title) = args.title {
            values.title = title;
        }
        if let Some(category) = args.category {
            values.category = category;
        }
        if let Some(date) = args.date {
            values.date = date;
        }
        if let Some(path) = args.file {
            values.file = Some(SelectedFile::from_path(&path, args.mime.as_deref())?);
        }
        Ok(values)
    }

    fn list<W: Write>(&self, html: Option<PathBuf>, json: bool, out: &mut W) -> Result<()> {
        let table = self.archive.table();
        if let Some(path) = html {
            std::fs::write(&path, table.render_html(self.theme.current()))?;
            writeln!(out, "Wrote {}", path.display())?;
        } else if json {
            let summaries: Vec<RecordSummary> =
                self.archive.store().iter().map(RecordSummary::from).collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&summaries)?)?;
        } else {
            write!(out, "{}", table.render_text())?;
        }
        Ok(())
    }

    async fn wait_for_prints<W: Write>(&mut self, out: &mut W) -> Result<()> {
        while let Some(joined) = self.prints.join_next().await {
            match joined {
                Ok(Ok(report)) => writeln!(
                    out,
                    "Printed record {} ({}) to {}",
                    report.record, report.kind, report.location
                )?,
                Ok(Err(e)) => writeln!(out, "error: {e}")?,
                Err(e) => {
                    warn!(error = %e, "Print task did not complete");
                    writeln!(out, "error: print task did not complete: {e}")?;
                }
            }
        }
        Ok(())
    }

    async fn finish<W: Write>(&mut self, out: &mut W) -> Result<()> {
        self.wait_for_prints(out).await?;
        let revoked = self.archive.shutdown();
        info!(
            records = self.archive.store().len(),
            revoked, "Session ended"
        );
        Ok(())
    }
}

fn write_form<W: Write>(out: &mut W, values: &FormValues, label: &str) -> Result<()> {
    writeln!(out, "  title:    {}", values.title)?;
    writeln!(out, "  category: {}", values.category)?;
    writeln!(out, "  date:     {}", values.date)?;
    writeln!(out, "  file:     (choose with --file)")?;
    writeln!(out, "Run `save` to {label}, or `cancel`.")?;
    Ok(())
}

async fn confirm<R, W>(title: &str, id: RecordId, lines: &mut Lines<R>, out: &mut W) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    write!(out, "Delete record {id} \"{title}\"? [y/N] ")?;
    out.flush()?;
    let answer = lines.next_line().await?.unwrap_or_default();
    writeln!(out)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
