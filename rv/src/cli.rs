//! CLI argument parsing for rv

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rv")]
#[command(author, version, about = "Tag and group rendezvous driver", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print the coordinator snapshot as JSON when done
    #[arg(long, global = true)]
    pub inspect: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Join a group several times, then resolve every member with one dispatch
    Group {
        /// Group name
        #[arg(short, long, default_value = "friends")]
        name: String,

        /// Number of members to join
        #[arg(short, long, default_value = "5")]
        members: usize,

        /// Value to dispatch (JSON, or a plain string)
        #[arg(long, default_value = "go")]
        value: String,
    },

    /// Wait on a tag with wait-for-any and dispatch a value to it
    Tag {
        /// Tag name
        #[arg(short, long, default_value = "ready")]
        tag: String,

        /// Value to dispatch (JSON, or a plain string)
        #[arg(long, default_value = "true")]
        value: String,

        /// Dispatch before waiting, so the value is served from the cache
        #[arg(short, long)]
        early: bool,
    },
}

/// Parse a CLI value as JSON, falling back to a plain string
pub fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}
