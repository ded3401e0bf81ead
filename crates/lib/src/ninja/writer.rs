//! The Ninja file writer.
//!
//! Output layout:
//!
//! 1. a header and `ninja_required_version`
//! 2. one section per package with static declarations, imported packages
//!    before the packages importing them
//! 3. one section per module, in generation order, with its variables,
//!    rules and build edges in the order they were declared
//! 4. the optional regeneration edge
//! 5. a `default` statement naming the outputs of every non-optional edge

use std::collections::HashSet;
use std::io::{self, Write};

use thiserror::Error;
use tracing::info;

use crate::actions::BuildDef;
use crate::consts::NINJA_REQUIRED_VERSION;
use crate::graph::{GenerateResult, ModuleGraph, ModuleResult, NamespaceError, check_namespace};
use crate::ninja_string::{NinjaString, escape_path, escape_value};
use crate::scope::{Declaration, Package, Pool, Rule, Variable};

/// Name of the rule behind the regeneration edge. Declared names are always
/// qualified, so this cannot collide with them.
pub const REGENERATE_RULE: &str = "knit_regenerate";

const SECTION_RULE: &str = "# # # # # # # # # # # # # # # # # # # # # # # # # # # # # # # # # # # # # # #";

/// Errors that can occur while writing a Ninja file.
#[derive(Debug, Error)]
pub enum WriteError {
  #[error("namespace collision: {0}")]
  Namespace(#[from] NamespaceError),

  #[error("io error: {0}")]
  Io(#[from] io::Error),
}

/// An edge that re-runs the generator when its inputs change.
#[derive(Debug, Clone)]
pub struct Regenerate {
  /// Shell command regenerating the file.
  pub command: String,
  /// The Ninja file itself.
  pub output: String,
  /// Definition files read to produce it. Module file dependencies are
  /// added automatically.
  pub inputs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct WriterOptions {
  pub required_version: String,
  pub regenerate: Option<Regenerate>,
}

impl Default for WriterOptions {
  fn default() -> Self {
    Self {
      required_version: NINJA_REQUIRED_VERSION.to_string(),
      regenerate: None,
    }
  }
}

impl WriterOptions {
  pub fn with_regenerate(mut self, regenerate: Regenerate) -> Self {
    self.regenerate = Some(regenerate);
    self
  }
}

pub struct NinjaWriter<W: Write> {
  out: W,
  options: WriterOptions,
}

impl<W: Write> NinjaWriter<W> {
  pub fn new(out: W, options: WriterOptions) -> Self {
    Self { out, options }
  }

  pub fn into_inner(self) -> W {
    self.out
  }

  /// Write everything `result` holds. The namespace is checked first and
  /// nothing is written if it has collisions.
  pub fn write<C>(&mut self, graph: &ModuleGraph<C>, result: &GenerateResult) -> Result<(), WriteError> {
    check_namespace(result)?;

    writeln!(self.out, "# Generated by knit. Do not edit.")?;
    writeln!(self.out)?;
    writeln!(self.out, "ninja_required_version = {}", self.options.required_version)?;
    writeln!(self.out)?;

    let packages = result.packages();
    for package in packages.iter().filter(|p| !p.declarations().is_empty()) {
      self.package(package)?;
    }

    let mut defaults = Vec::new();
    for module in result.modules.iter().filter(|m| !m.output.actions.is_empty()) {
      self.module(graph, module)?;
      defaults.extend(
        module
          .output
          .actions
          .builds
          .iter()
          .filter(|b| !b.optional)
          .flat_map(|b| b.outputs.iter().map(NinjaString::value)),
      );
    }

    if let Some(regenerate) = self.options.regenerate.clone() {
      self.regenerate(&regenerate, result)?;
    }

    if !defaults.is_empty() {
      writeln!(self.out, "default {}", defaults.join(" "))?;
    }
    self.out.flush()?;

    info!(
      packages = packages.len(),
      modules = result.modules.len(),
      defaults = defaults.len(),
      "wrote ninja file"
    );
    Ok(())
  }

  fn package(&mut self, package: &Package) -> io::Result<()> {
    writeln!(self.out, "# Package: {}", package.name())?;
    writeln!(self.out)?;
    for decl in package.declarations() {
      match decl {
        Declaration::Variable(variable) => self.variable(variable)?,
        Declaration::Rule(rule) => self.rule(rule)?,
        Declaration::Pool(pool) => self.pool(pool)?,
      }
    }
    Ok(())
  }

  fn module<C>(&mut self, graph: &ModuleGraph<C>, module: &ModuleResult) -> io::Result<()> {
    writeln!(self.out, "{}", SECTION_RULE)?;
    writeln!(self.out, "# Module:  {}", module.name)?;
    if let Some(info) = graph.info(module.module()) {
      writeln!(self.out, "# Type:    {}", info.module_type)?;
      writeln!(self.out, "# Defined: {}", info.pos)?;
    }
    writeln!(self.out)?;

    let actions = &module.output.actions;
    for variable in &actions.variables {
      self.variable(variable)?;
    }
    for rule in &actions.rules {
      self.rule(rule)?;
    }
    for build in &actions.builds {
      self.build(build)?;
    }
    Ok(())
  }

  fn variable(&mut self, variable: &Variable) -> io::Result<()> {
    writeln!(self.out, "{} = {}", variable.qualified_name(), variable.value())?;
    writeln!(self.out)
  }

  fn pool(&mut self, pool: &Pool) -> io::Result<()> {
    writeln!(self.out, "pool {}", pool.qualified_name())?;
    writeln!(self.out, "  depth = {}", pool.depth())?;
    writeln!(self.out)
  }

  fn rule(&mut self, rule: &Rule) -> io::Result<()> {
    let Some(def) = rule.def() else {
      return Ok(());
    };

    if let Some(comment) = &def.comment {
      self.comment(comment)?;
    }
    writeln!(self.out, "rule {}", rule.qualified_name())?;
    writeln!(self.out, "  command = {}", def.command)?;
    if let Some(depfile) = &def.depfile {
      writeln!(self.out, "  depfile = {}", depfile)?;
    }
    if let Some(deps) = def.deps {
      writeln!(self.out, "  deps = {}", deps.as_str())?;
    }
    if let Some(description) = &def.description {
      writeln!(self.out, "  description = {}", description)?;
    }
    if def.generator {
      writeln!(self.out, "  generator = 1")?;
    }
    if def.restat {
      writeln!(self.out, "  restat = 1")?;
    }
    if let Some(rspfile) = &def.rspfile {
      writeln!(self.out, "  rspfile = {}", rspfile)?;
    }
    if let Some(content) = &def.rspfile_content {
      writeln!(self.out, "  rspfile_content = {}", content)?;
    }
    if let Some(pool) = &def.pool {
      writeln!(self.out, "  pool = {}", pool)?;
    }
    writeln!(self.out)
  }

  fn build(&mut self, build: &BuildDef) -> io::Result<()> {
    if let Some(comment) = &build.comment {
      self.comment(comment)?;
    }

    let mut line = format!("build {}", join(&build.outputs));
    if !build.implicit_outputs.is_empty() {
      line.push_str(&format!(" | {}", join(&build.implicit_outputs)));
    }
    line.push_str(&format!(": {}", build.rule.qualified_name()));
    if !build.inputs.is_empty() {
      line.push_str(&format!(" {}", join(&build.inputs)));
    }

    let command_deps: &[NinjaString] = build.rule.def().map(|d| d.command_deps.as_slice()).unwrap_or_default();
    if !build.implicits.is_empty() || !command_deps.is_empty() {
      let implicits: Vec<_> = build.implicits.iter().chain(command_deps).map(NinjaString::value).collect();
      line.push_str(&format!(" | {}", implicits.join(" ")));
    }
    if !build.order_only.is_empty() {
      line.push_str(&format!(" || {}", join(&build.order_only)));
    }

    writeln!(self.out, "{}", line)?;
    for (name, value) in &build.args {
      writeln!(self.out, "  {} = {}", name, value)?;
    }
    writeln!(self.out)
  }

  fn regenerate(&mut self, regenerate: &Regenerate, result: &GenerateResult) -> io::Result<()> {
    writeln!(self.out, "rule {}", REGENERATE_RULE)?;
    writeln!(self.out, "  command = {}", escape_value(&regenerate.command))?;
    writeln!(self.out, "  description = Regenerating $out")?;
    writeln!(self.out, "  generator = 1")?;
    writeln!(self.out)?;

    let mut seen = HashSet::new();
    let inputs: Vec<String> = regenerate
      .inputs
      .iter()
      .map(String::as_str)
      .chain(result.ninja_file_deps())
      .filter(|input| seen.insert(*input))
      .map(escape_path)
      .collect();

    let mut line = format!("build {}: {}", escape_path(&regenerate.output), REGENERATE_RULE);
    if !inputs.is_empty() {
      line.push_str(&format!(" {}", inputs.join(" ")));
    }
    writeln!(self.out, "{}", line)?;
    writeln!(self.out)
  }

  fn comment(&mut self, comment: &str) -> io::Result<()> {
    for line in comment.lines() {
      writeln!(self.out, "# {}", line)?;
    }
    Ok(())
  }
}

fn join(strings: &[NinjaString]) -> String {
  strings.iter().map(NinjaString::value).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::actions::BuildParams;
  use crate::graph::GenerateOptions;
  use crate::module::{FnModule, ModuleInfo};
  use crate::position::Position;
  use crate::scope::{Deps, PackageBuilder, RuleParams};

  fn render<C: Sync>(graph: &ModuleGraph<C>, config: &C, options: WriterOptions) -> String {
    let result = graph.generate(config, &GenerateOptions::default()).unwrap();
    let mut writer = NinjaWriter::new(Vec::new(), options);
    writer.write(graph, &result).unwrap();
    String::from_utf8(writer.into_inner()).unwrap()
  }

  fn cc_package() -> Arc<crate::scope::Package> {
    let mut cc = PackageBuilder::new("cc").unwrap();
    cc.variable("warnings", "-Wall").unwrap();
    cc.pool("link", 2).unwrap();
    cc.rule(
      "ar",
      &RuleParams::new("ar rcs $out $in").with_description("AR $out").with_pool("link"),
      &[],
    )
    .unwrap();
    cc.build()
  }

  #[test]
  fn writes_packages_then_modules() {
    let cc = cc_package();
    let app = PackageBuilder::new("app").unwrap().build();
    let mut graph = ModuleGraph::<()>::new();
    let helper = Arc::clone(&cc);
    graph
      .add_module(
        ModuleInfo::new("libfoo", "cc_library", Position::new("lib/knit.lua", 3, 1)),
        Box::new(FnModule::new(&app, move |ctx| {
          let app = Arc::clone(ctx.scope().package());
          ctx.variable(&app, "cflags", "-O2")?;
          let rule = ctx.rule(
            &helper,
            "cc",
            &RuleParams::new("gcc $warnings $cflags -c $in -o $out").with_depfile("$out.d", Deps::Gcc),
            &["cflags"],
          )?;
          ctx.build(
            &app,
            BuildParams::new(&rule)
              .with_outputs(&["foo.o"])
              .with_inputs(&["foo.c"])
              .with_arg("cflags", "$cflags")
              .with_comment("compile foo.c"),
          )?;
          Ok(())
        })),
      )
      .unwrap();

    let text = render(&graph, &(), WriterOptions::default());

    let expected = format!(
      "# Generated by knit. Do not edit.

ninja_required_version = {NINJA_REQUIRED_VERSION}

# Package: cc

g.cc.warnings = -Wall

pool g.cc.link
  depth = 2

rule g.cc.ar
  command = ar rcs ${{out}} ${{in}}
  description = AR ${{out}}
  pool = g.cc.link

{SECTION_RULE}
# Module:  libfoo
# Type:    cc_library
# Defined: lib/knit.lua:3:1

m.libfoo.app.cflags = -O2

rule m.libfoo.cc.cc
  command = gcc ${{g.cc.warnings}} ${{cflags}} -c ${{in}} -o ${{out}}
  depfile = ${{out}}.d
  deps = gcc

# compile foo.c
build foo.o: m.libfoo.cc.cc foo.c
  cflags = ${{m.libfoo.app.cflags}}

default foo.o
"
    );
    assert_eq!(text, expected);
  }
}
