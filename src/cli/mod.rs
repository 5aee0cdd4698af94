//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// bzsync - push Braze email templates and content blocks into Transifex
#[derive(Parser, Debug)]
#[command(name = "bzsync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (default: ~/.bzsync/config.json)
    #[arg(long, global = true, env = "BZSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Back up Transifex, then sync every Braze item into it
    Run(RunArgs),

    /// Export the Transifex project as TMX without syncing
    Backup(BackupArgs),

    /// Inspect the resolved configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Skip the pre-flight TMX backup
    #[arg(long)]
    pub no_backup: bool,

    /// Whether to take the pre-flight backup (true/false)
    #[arg(
        long = "backup",
        env = "BZSYNC_BACKUP_ENABLED",
        value_parser = clap::builder::BoolishValueParser::new(),
        hide = true
    )]
    pub backup_enabled: Option<bool>,

    /// Directory for TMX backups (default: Downloads)
    #[arg(long, env = "BZSYNC_BACKUP_DIR")]
    pub backup_dir: Option<PathBuf>,

    /// Keep syncing when the backup fails
    #[arg(long)]
    pub fail_open: bool,

    /// Items upserted concurrently (1-16, default 4)
    #[arg(long, short = 'p')]
    pub parallelism: Option<usize>,

    /// Do not wait for Transifex to confirm each source upload
    #[arg(long)]
    pub no_verify_uploads: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct BackupArgs {
    /// Directory for the TMX file (default: Downloads)
    #[arg(long, env = "BZSYNC_BACKUP_DIR")]
    pub backup_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigCommands {
    /// Print the resolved configuration with secrets redacted
    Show,
    /// Print the settings file location
    Path,
}

/// Supported shells for completions.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}
