use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use face_exp::cli;
use face_exp::io::config::DEFAULT_CONFIG_PATH;
use face_exp::logging;

#[derive(Parser)]
#[command(
    name = "face-exp",
    version,
    about = "Same/different face presentation experiment"
)]
struct Cli {
    /// Experiment config (TOML). Built-in defaults apply when the file is missing.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Seed for the stimulus shuffle. Omit for a fresh order every run.
    #[arg(long, global = true)]
    seed: Option<u64>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Present every stimulus and record responses (default).
    Run,
    /// Print the presentation order without opening a window.
    List,
    /// Summarize an existing results file.
    Report {
        /// Results file (default: the configured output path).
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Write the default config file.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let root = std::env::current_dir()?;
    match cli.command.unwrap_or(Command::Run) {
        Command::Run => cli::run_session(&root, &cli.config, cli.seed),
        Command::List => cli::list_stimuli(&root, &cli.config, cli.seed),
        Command::Report { input } => cli::report_results(&root, &cli.config, input.as_deref()),
        Command::Init { force } => cli::init_config(&root, &cli.config, force),
    }
}
