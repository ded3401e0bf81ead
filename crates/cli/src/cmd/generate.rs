//! Implementation of the `knit gen` command.
//!
//! Loads the definition files, runs every module pass and writes the
//! resulting Ninja file. Nothing is written if any module reported an
//! error.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use tracing::info;

use knit_lib::consts::{DEFINITIONS_FILE, NINJA_FILE};
use knit_lib::diag::Diagnostic;
use knit_lib::graph::{GenerateOptions, ModuleGraph};
use knit_lib::lua::load_definitions;
use knit_lib::ninja::{NinjaWriter, Regenerate, WriterOptions};

use crate::config::BuildConfig;
use crate::modules::module_types;
use crate::output::{print_error, print_stat, print_success, shell_quote};

#[derive(Debug, Clone, Args)]
pub struct GenArgs {
  /// Root definition file
  #[arg(default_value = DEFINITIONS_FILE)]
  pub file: PathBuf,

  /// Ninja file to write
  #[arg(short, long, default_value = NINJA_FILE)]
  pub output: PathBuf,

  /// Number of modules to generate in parallel (default: number of CPUs)
  #[arg(short, long)]
  pub jobs: Option<usize>,

  /// Print the Ninja file instead of writing it
  #[arg(long)]
  pub dry_run: bool,

  #[command(flatten)]
  pub config: BuildConfig,
}

impl GenArgs {
  /// Shell command that reruns this generation.
  fn command_line(&self) -> String {
    let mut args = vec![
      "knit".to_string(),
      "gen".to_string(),
      self.file.display().to_string(),
      "-o".to_string(),
      self.output.display().to_string(),
    ];
    args.extend(self.config.to_args());
    args.iter().map(|a| shell_quote(a)).collect::<Vec<_>>().join(" ")
  }
}

pub fn cmd_gen(args: &GenArgs) -> Result<()> {
  let types = module_types().context("Failed to set up module types")?;
  let loaded = load_definitions(&args.file, &types)
    .with_context(|| format!("Failed to load definitions: {}", args.file.display()))?;

  let (graph, graph_diagnostics) = ModuleGraph::from_decls(&loaded.decls, &types);

  let mut options = GenerateOptions::default();
  if let Some(jobs) = args.jobs {
    options = options.with_parallelism(jobs);
  }
  let result = graph
    .generate(&args.config, &options)
    .context("Failed to generate build actions")?;

  let diagnostics: Vec<&Diagnostic> = loaded
    .diagnostics
    .iter()
    .chain(&graph_diagnostics)
    .chain(result.diagnostics())
    .collect();
  for diagnostic in &diagnostics {
    print_error(&diagnostic.to_string());
  }
  let mut faults = 0;
  for (module, fault) in result.faults() {
    print_error(&format!("module {:?} aborted: {}", module, fault));
    faults += 1;
  }
  if !diagnostics.is_empty() || faults > 0 {
    bail!(
      "{} error(s) and {} aborted module(s), not writing {}",
      diagnostics.len(),
      faults,
      args.output.display()
    );
  }

  let regenerate = Regenerate {
    command: args.command_line(),
    output: args.output.display().to_string(),
    inputs: loaded
      .files
      .iter()
      .map(|file| definition_path(&loaded.root_dir, file))
      .collect(),
  };
  let mut writer = NinjaWriter::new(Vec::new(), WriterOptions::default().with_regenerate(regenerate));
  writer
    .write(&graph, &result)
    .context("Failed to render the Ninja file")?;
  let content = String::from_utf8(writer.into_inner()).context("Generated Ninja file is not UTF-8")?;

  if args.dry_run {
    print!("{}", content);
    return Ok(());
  }

  fs::write(&args.output, &content).with_context(|| format!("Failed to write {}", args.output.display()))?;
  info!(path = %args.output.display(), bytes = content.len(), "wrote ninja file");

  print_success(&format!("Wrote {}", args.output.display()));
  print_stat("Modules", &result.modules.len().to_string());
  print_stat("Definition files", &loaded.files.len().to_string());
  Ok(())
}

/// Path of a loaded definition file as Ninja sees it from the working
/// directory.
fn definition_path(root_dir: &Path, file: &Path) -> String {
  if root_dir == Path::new(".") {
    file.display().to_string()
  } else {
    root_dir.join(file).display().to_string()
  }
}
