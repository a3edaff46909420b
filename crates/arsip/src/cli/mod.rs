//! Command-line interface for arsip.
//!
//! This module provides the CLI structure for the `arsip` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, SessionCommand, ThemeArg, ThemeCommand};

/// arsip - Keep an archive of titled, dated records with attachments
///
/// Records live for the length of a session. Attachments can be printed as
/// HTML documents; images, PDFs and DOCX files are previewed inline.
#[derive(Debug, Parser)]
#[command(name = "arsip")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start an interactive archive session
    Session(SessionCommand),

    /// View or change the color theme
    #[command(subcommand)]
    Theme(ThemeCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Theme(ThemeCommand::Show),
        }
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "arsip");
    }

    #[test]
    fn test_verbosity_levels() {
        use crate::logging::Verbosity;

        assert_eq!(cli(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(cli(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(cli(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(cli(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_session() {
        let cli = Cli::try_parse_from(["arsip", "session", "--script", "demo.txt", "--yes"]).unwrap();
        match cli.command {
            Command::Session(cmd) => {
                assert_eq!(cmd.script, Some(PathBuf::from("demo.txt")));
                assert!(cmd.yes);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_theme_set() {
        let cli = Cli::try_parse_from(["arsip", "theme", "set", "dark"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Theme(ThemeCommand::Set {
                theme: ThemeArg::Dark
            })
        ));
    }

    #[test]
    fn test_parse_theme_rejects_unknown() {
        assert!(Cli::try_parse_from(["arsip", "theme", "set", "sepia"]).is_err());
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = Cli::try_parse_from(["arsip", "config", "validate", "--file", "a.toml"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = Cli::try_parse_from(["arsip", "-c", "/custom/config.toml", "theme", "show"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_with_verbose_and_quiet() {
        let cli = Cli::try_parse_from(["arsip", "-vv", "config", "path"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let cli = Cli::try_parse_from(["arsip", "-q", "config", "path"]).unwrap();
        assert!(cli.quiet);
    }
}
