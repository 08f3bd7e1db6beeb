//! mealy - finite-state transducer toolkit
//!
//! Validates, formats and runs machines written in the line-oriented state
//! format, either one-shot or from an interactive shell.

mod commands;
mod config;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mealy")]
#[command(about = "Build, check and run finite-state transducers")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive shell
    Repl {
        /// Machine file to load on start
        machine: Option<PathBuf>,
    },

    /// Validate a machine and report lints
    Check {
        /// Machine file (.json for raw states, text otherwise)
        machine: PathBuf,

        /// Skip unparseable lines instead of failing
        #[arg(long)]
        lenient: bool,
    },

    /// Run a machine over an input string
    Run {
        /// Machine file (.json for raw states, text otherwise)
        machine: PathBuf,

        /// Input string
        input: String,

        /// Record visited states
        #[arg(long)]
        history: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Skip unparseable lines instead of failing
        #[arg(long)]
        lenient: bool,
    },

    /// Run a machine one transition at a time, printing each step
    Step {
        /// Machine file (.json for raw states, text otherwise)
        machine: PathBuf,

        /// Input string
        input: String,

        /// Record visited states
        #[arg(long)]
        history: bool,

        /// Print one JSON snapshot per line
        #[arg(long)]
        json: bool,

        /// Skip unparseable lines instead of failing
        #[arg(long)]
        lenient: bool,
    },

    /// Print a machine in canonical form
    Fmt {
        /// Machine file (.json for raw states, text otherwise)
        machine: PathBuf,

        /// Print raw states as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Skip unparseable lines instead of failing
        #[arg(long)]
        lenient: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    };

    if !config.repl.color {
        colored::control::set_override(false);
    }

    match cli.command {
        None => repl::run(None, &config)?,
        Some(Commands::Repl { machine }) => repl::run(machine.as_deref(), &config)?,
        Some(cmd) => match commands::execute(cmd, &config) {
            Ok(output) => {
                println!("{}", output.text);
                if !output.success {
                    std::process::exit(1);
                }
            }
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
