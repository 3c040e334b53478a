// Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "playerport")]
#[command(about = "Import club players from CSV, matching them to teams")]
#[command(version)]
pub struct Cli {
    /// Directory containing config/ and defaults/
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Organization id, overriding the configured one
    #[arg(long, global = true)]
    pub org: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write the blank import template
    Template {
        /// File or directory to write to
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Print the built-in sample CSV
    Sample,

    /// Parse a CSV and show how its rows match the organization's teams
    Parse {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Parse a CSV and import every matched player
    Import {
        #[command(flatten)]
        input: InputArgs,

        /// Create a team for every missing bucket before importing
        #[arg(long)]
        create_missing: bool,

        /// Create-player calls in flight at once
        #[arg(short, long)]
        concurrency: Option<usize>,
    },

    /// List or create the organization's teams
    Teams {
        #[command(subcommand)]
        action: TeamsCommand,
    },

    /// Show recent import runs
    History {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Debug, Subcommand)]
pub enum TeamsCommand {
    /// List the organization's teams
    List,

    /// Create a team
    Add {
        #[arg(long)]
        sport: String,

        #[arg(long)]
        age_group: String,

        /// Boys, Girls or Mixed (Male/Female and similar are accepted)
        #[arg(long)]
        gender: String,

        /// Defaults to the current year
        #[arg(long)]
        season: Option<String>,

        /// Defaults to "<age group> <gender>"
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// CSV file to read
    #[arg(required_unless_present = "sample")]
    pub file: Option<PathBuf>,

    /// Use the built-in sample data instead of a file
    #[arg(long, conflicts_with = "file")]
    pub sample: bool,
}
