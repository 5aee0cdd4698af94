//! bzsync CLI entry point.

use clap::Parser;
use bzsync::cli::commands;
use bzsync::cli::{Cli, Commands};
use bzsync::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    // Run the command and handle errors
    match run(&cli, json) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("bzsync=info,warn"),
            2 => EnvFilter::new("bzsync=debug,info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Dispatch the command. `Ok` carries the exit code.
fn run(cli: &Cli, json: bool) -> Result<u8, Error> {
    let config = cli.config.as_deref();

    match &cli.command {
        Commands::Run(args) => commands::run::execute(args, config, json, cli.quiet),
        Commands::Backup(args) => {
            commands::backup::execute(args, config, json, cli.quiet).map(|()| 0)
        }
        Commands::Config { command } => {
            commands::config::execute(*command, config, json).map(|()| 0)
        }
        Commands::Version => commands::version::execute(json).map(|()| 0),
        Commands::Completions { shell } => commands::completions::execute(*shell).map(|()| 0),
    }
}
