//! Implementation of the `knit graph` command.
//!
//! Prints every module in generation order together with its direct
//! dependencies, without running any module pass.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use knit_lib::graph::ModuleGraph;
use knit_lib::lua::load_definitions;
use knit_lib::position::Position;

use crate::modules::module_types;
use crate::output::{OutputFormat, print_json, print_warning, symbols};

#[derive(Debug, Serialize)]
struct GraphEntry<'a> {
  name: &'a str,
  module_type: &'a str,
  pos: &'a Position,
  wave: usize,
  deps: Vec<&'a str>,
}

pub fn cmd_graph(file: &Path, format: OutputFormat) -> Result<()> {
  let types = module_types().context("Failed to set up module types")?;
  let loaded =
    load_definitions(file, &types).with_context(|| format!("Failed to load definitions: {}", file.display()))?;
  let (graph, diagnostics) = ModuleGraph::from_decls(&loaded.decls, &types);

  for diagnostic in loaded.diagnostics.iter().chain(&diagnostics) {
    print_warning(&diagnostic.to_string());
  }

  let waves = graph.waves().context("Failed to order modules")?;
  let mut entries = Vec::with_capacity(graph.len());
  for (wave, modules) in waves.iter().enumerate() {
    for &id in modules {
      let Some(info) = graph.info(id) else {
        continue;
      };
      let deps = graph
        .dependencies(id)
        .iter()
        .filter_map(|&dep| graph.info(dep).map(|info| info.name.as_str()))
        .collect();
      entries.push(GraphEntry {
        name: &info.name,
        module_type: &info.module_type,
        pos: &info.pos,
        wave,
        deps,
      });
    }
  }

  if format.is_json() {
    return print_json(&entries);
  }

  for entry in &entries {
    println!(
      "{} {} {}",
      entry.name.if_supports_color(Stream::Stdout, |s| s.bold()),
      format!("({})", entry.module_type).if_supports_color(Stream::Stdout, |s| s.dimmed()),
      entry.pos.if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
    for dep in &entry.deps {
      println!("  {} {}", symbols::ARROW, dep);
    }
  }
  Ok(())
}
