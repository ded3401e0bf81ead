//! knit - generate Ninja files from Lua module definitions.

mod cmd;
mod config;
mod modules;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{GenArgs, cmd_gen, cmd_graph};
use knit_lib::consts::DEFINITIONS_FILE;
use output::OutputFormat;

/// knit - meta-build system generating Ninja files
#[derive(Parser)]
#[command(name = "knit")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Generate a Ninja file from the definition files
  Gen(GenArgs),

  /// Show modules in generation order with their dependencies
  Graph {
    /// Root definition file
    #[arg(default_value = DEFINITIONS_FILE)]
    file: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Gen(args) => cmd_gen(&args),
    Commands::Graph { file, format } => cmd_graph(&file, format),
  }
}
