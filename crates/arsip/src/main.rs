//! `arsip` - CLI for the archive record manager
//!
//! This binary wires configuration, logging, preference storage and the
//! print host together and hands control to the requested command.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;

use arsip::cli::{Cli, Command, ConfigCommand, SessionCommand, ThemeCommand};
use arsip::storage::PreferenceStore;
use arsip::{
    init_logging, Archive, Config, DocxHtmlConverter, FilePrintHost, PrintDispatcher, Session,
    SpoolHandleProvider, ThemeToggle,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    match cli.command {
        Command::Config(config_cmd) => handle_config(cli.config, config_cmd),
        Command::Theme(theme_cmd) => {
            let config = Config::load_from(cli.config)?;
            handle_theme(&config, theme_cmd)
        }
        Command::Session(session_cmd) => {
            let config = Config::load_from(cli.config)?;
            handle_session(&config, session_cmd).await
        }
    }
}

async fn handle_session(config: &Config, cmd: SessionCommand) -> anyhow::Result<()> {
    let spool = Arc::new(SpoolHandleProvider::open(config.spool_dir())?);
    let host = FilePrintHost::from_config(config)?;
    let dispatcher = PrintDispatcher::new(
        host,
        Arc::new(DocxHtmlConverter::new()),
        config.pdf_settle(),
    );
    let prefs = PreferenceStore::open(config.preferences_path())?;
    let theme = ThemeToggle::load(prefs)?;

    let mut session = Session::new(Archive::new(Arc::clone(&spool)), dispatcher, theme)
        .assume_yes(cmd.yes);
    let mut out = std::io::stdout();

    match cmd.script {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("cannot open script {}", path.display()))?;
            session.run(BufReader::new(file), &mut out).await?;
        }
        None => {
            let interactive = std::io::stdin().is_terminal();
            session = session.interactive(interactive);
            session
                .run(BufReader::new(tokio::io::stdin()), &mut out)
                .await?;
        }
    }

    let leftover = spool.revoke_all();
    if leftover > 0 {
        tracing::warn!(leftover, "Spool files removed after session end");
    }
    // Only succeeds when the spool directory is empty.
    let _ = std::fs::remove_dir(spool.dir());
    Ok(())
}

fn handle_theme(config: &Config, cmd: ThemeCommand) -> anyhow::Result<()> {
    let prefs = PreferenceStore::open(config.preferences_path())?;
    let mut theme = ThemeToggle::load(prefs)?;
    let current = match cmd {
        ThemeCommand::Show => theme.current(),
        ThemeCommand::Toggle => theme.toggle()?,
        ThemeCommand::Set { theme: choice } => theme.set(choice.into())?,
    };
    println!("{current}");
    Ok(())
}

fn handle_config(path: Option<std::path::PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Print]");
                println!("  Output dir:     {}", config.print_output_dir().display());
                println!("  PDF settle ms:  {}", config.print.pdf_settle_ms);
                println!(
                    "  Command:        {}",
                    config.print.command.as_deref().unwrap_or("(none, documents are only written)")
                );
                println!();
                println!("[Attachments]");
                println!("  Spool dir:      {}", config.spool_dir().display());
                println!();
                println!("[Preferences]");
                println!("  Database path:  {}", config.preferences_path().display());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.or(path).unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
