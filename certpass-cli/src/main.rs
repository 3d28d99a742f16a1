use std::{io, path::PathBuf};

use certpass_lib::{
    Repository,
    config::CoreConfig,
    repository::StoreError,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use sysexits::ExitCode;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod certificate;
mod render;

#[derive(Parser, Debug)]
#[command(name = "certpass")]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Override the configured certificate list file
    #[arg(short, long, global = true)]
    data_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    #[command(flatten)]
    Certificate(certificate::Command),
}

#[derive(Debug, Error)]
pub enum Failure {
    #[error(transparent)]
    Lib(#[from] certpass_lib::Error),
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to load configuration: {0}")]
    Config(io::Error),
    #[error("{0}")]
    Usage(String),
}

impl Failure {
    fn exit_code(&self) -> ExitCode {
        use certpass_lib::Error::*;

        match self {
            Failure::Lib(DuplicateCertificate | UnknownIdentity(_) | Decode(_)) => ExitCode::DataErr,
            Failure::Lib(Store(StoreError::Io(_))) => ExitCode::IoErr,
            Failure::Lib(Store(_)) => ExitCode::DataErr,
            Failure::Read { .. } => ExitCode::NoInput,
            Failure::Config(_) => ExitCode::Config,
            Failure::Usage(_) => ExitCode::Usage,
        }
    }
}

fn main() -> ExitCode {
    // Human friendly panicking in release mode
    human_panic::setup_panic!();

    // Logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::Ok,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            err.exit_code()
        }
    }
}

fn run(cli: &Cli) -> Result<(), Failure> {
    let mut cfg = CoreConfig::load().map_err(Failure::Config)?;
    if let Some(data_file) = &cli.data_file {
        cfg.data_file = Some(data_file.clone());
    }

    let repo = Repository::new(&cfg.handle())?;

    match &cli.command {
        Command::Certificate(cmd) => certificate::handle(&repo, cmd),
    }
}
