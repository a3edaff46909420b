//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::theme::Theme;

/// Interactive session arguments.
#[derive(Debug, Args)]
pub struct SessionCommand {
    /// Read commands from this file instead of standard input
    #[arg(short, long, value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Answer yes to every delete confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Theme preference commands.
#[derive(Debug, Subcommand)]
pub enum ThemeCommand {
    /// Show the saved theme
    Show,

    /// Switch between light and dark
    Toggle,

    /// Select a theme
    Set {
        /// Theme to select
        #[arg(value_enum)]
        theme: ThemeArg,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Theme argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeArg {
    /// Light background
    Light,
    /// Dark background
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Light => Self::Light,
            ThemeArg::Dark => Self::Dark,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_arg_conversion() {
        assert_eq!(Theme::from(ThemeArg::Light), Theme::Light);
        assert_eq!(Theme::from(ThemeArg::Dark), Theme::Dark);
    }

    #[test]
    fn test_session_command_debug() {
        let cmd = SessionCommand {
            script: Some(PathBuf::from("demo.txt")),
            yes: true,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("demo.txt"));
        assert!(debug_str.contains("yes"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
