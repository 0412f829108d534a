//! CLI command definitions for the `adraft` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod draft;
pub mod watch;

use std::path::PathBuf;

use autodraft_types::draft::Resolution;
use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Inspect and manage locally autosaved form drafts.
#[derive(Parser)]
#[command(name = "adraft", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Data directory (defaults to $AUTODRAFT_DATA_DIR or ~/.autodraft).
    #[arg(long, global = true, env = "AUTODRAFT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the stored draft for a key.
    Show {
        /// Draft key.
        key: String,
    },

    /// Save a draft immediately (value is JSON; plain text is stored as a string).
    Save {
        /// Draft key.
        key: String,

        /// Draft content.
        value: String,
    },

    /// Remove the stored draft for a key.
    #[command(alias = "rm")]
    Clear {
        /// Draft key.
        key: String,
    },

    /// List all stored drafts.
    #[command(alias = "ls")]
    List,

    /// Autosave JSON states read line by line from stdin, debounced.
    Watch {
        /// Draft key.
        key: String,

        /// Debounce window in milliseconds (defaults to config).
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Compare the stored draft against a server snapshot.
    Check {
        /// Draft key.
        key: String,

        /// Server content as JSON. Without it, no conflict is possible.
        #[arg(long)]
        server: Option<String>,
    },

    /// Resolve a conflict between the stored draft and a server snapshot.
    Resolve {
        /// Draft key.
        key: String,

        /// Server content as JSON.
        #[arg(long)]
        server: String,

        /// Which version wins: local or server.
        #[arg(long)]
        keep: Resolution,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Parse a CLI value as JSON, falling back to a JSON string.
///
/// `adraft save k "Alice"` stores the string `"Alice"`, while
/// `adraft save k '{"title":"A"}'` stores the parsed object.
pub fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_value_accepts_json_and_text() {
        assert_eq!(parse_value(r#"{"title":"A"}"#), json!({"title": "A"}));
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("Alice"), json!("Alice"));
    }

    #[test]
    fn resolve_parses_keep_flag() {
        let cli = Cli::try_parse_from([
            "adraft",
            "resolve",
            "conflict-draft",
            "--server",
            r#"{"content":"Server changes"}"#,
            "--keep",
            "server",
        ])
        .unwrap();

        match cli.command {
            Commands::Resolve { key, keep, .. } => {
                assert_eq!(key, "conflict-draft");
                assert_eq!(keep, Resolution::KeepServer);
            }
            _ => panic!("expected resolve"),
        }
    }

    #[test]
    fn resolve_rejects_unknown_keep() {
        let result = Cli::try_parse_from([
            "adraft", "resolve", "k", "--server", "{}", "--keep", "both",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["adraft", "list", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::List));
    }
}
