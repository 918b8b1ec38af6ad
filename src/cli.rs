// Command-line surface. Parsing only; `ui::run` does the work.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gost", version, about = "Create, list, view, update and delete gists from the terminal")]
pub struct Cli {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Credential file to use instead of ~/.gost
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Cmd {
    /// List your gists, or a single one by id
    List { id: Option<String> },

    /// Create a gist from local files
    Create {
        #[arg(short, long, default_value = "")]
        description: String,

        /// Make the gist public regardless of the stored default
        #[arg(long, conflicts_with = "secret")]
        public: bool,

        /// Make the gist secret regardless of the stored default
        #[arg(long)]
        secret: bool,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Delete a gist, or one file from it
    Delete {
        id: String,

        #[arg(short, long)]
        file: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Print a gist's files, or open it in the browser
    View {
        id: String,

        #[arg(short, long)]
        file: Option<String>,

        #[arg(short, long)]
        browser: bool,
    },

    /// Download a gist's files
    #[command(alias = "download")]
    Save {
        id: String,

        #[arg(short, long)]
        file: Option<String>,

        /// Directory to write into
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Change a gist's description or files
    Update {
        id: String,

        #[arg(short, long)]
        description: Option<String>,

        /// Add or replace a file (repeatable)
        #[arg(short = 'f', long = "file")]
        files: Vec<PathBuf>,

        /// Remove a file by name (repeatable)
        #[arg(short = 'r', long = "remove")]
        remove: Vec<String>,
    },

    /// Log in again and replace the stored token
    Login,
}

/// Visibility override from `--public` / `--secret`.
pub fn visibility(public: bool, secret: bool) -> Option<bool> {
    match (public, secret) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}
