//! The `toolchain` package and the helpers module types call to compile,
//! archive and link.
//!
//! The package itself declares the `warnings` variable, the `ar` and `link`
//! rules and a `linker` pool once for the whole graph. [`Toolchain::compile`]
//! declares a `cflags` variable and a `compile` rule per module, attributed
//! to this package rather than to the calling module's.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use knit_lib::actions::BuildParams;
use knit_lib::context::ModuleContext;
use knit_lib::diag::Fault;
use knit_lib::ninja_string::{escape_path, escape_value};
use knit_lib::scope::{Deps, Package, PackageBuilder, Rule, RuleParams, ScopeError};

use crate::config::BuildConfig;

pub const TOOLCHAIN_PACKAGE: &str = "toolchain";

const WARNINGS: &str = "-Wall -Wextra";
const LINK_JOBS: usize = 4;

pub struct Toolchain {
  package: Arc<Package>,
  archive: Arc<Rule>,
  link: Arc<Rule>,
}

impl Toolchain {
  pub fn new() -> Result<Self, ScopeError> {
    let mut builder = PackageBuilder::new(TOOLCHAIN_PACKAGE)?;
    builder.variable("warnings", WARNINGS)?;
    builder.pool("linker", LINK_JOBS)?;
    let archive = builder.rule(
      "ar",
      &RuleParams::new("rm -f $out && $ar crs $out $in").with_description("AR $out"),
      &["ar"],
    )?;
    let link = builder.rule(
      "link",
      &RuleParams::new("$cc -o $out $in $ldflags")
        .with_description("LINK $out")
        .with_pool("linker"),
      &["cc", "ldflags"],
    )?;

    Ok(Self {
      package: builder.build(),
      archive,
      link,
    })
  }

  pub fn package(&self) -> &Arc<Package> {
    &self.package
  }

  /// Compile `srcs`, given relative to the module's directory, into object
  /// files. Returns the object paths.
  ///
  /// Two sources that differ only in extension would write the same object.
  /// The later one is reported against `srcs` and skipped.
  ///
  /// Declares this module's `compile` rule, so it may only be called once
  /// per module pass.
  pub fn compile(
    &self,
    ctx: &mut ModuleContext<'_, BuildConfig>,
    srcs: &[String],
    cflags: &str,
  ) -> Result<Vec<String>, Fault> {
    let config = ctx.config();
    let flags: Vec<&str> = [config.cflags.as_str(), cflags]
      .into_iter()
      .filter(|f| !f.is_empty())
      .collect();

    ctx.variable(&self.package, "cflags", &escape_value(&flags.join(" ")))?;
    let rule = ctx.rule(
      &self.package,
      "compile",
      &RuleParams::new("$cc $cflags $warnings -MD -MF $out.d -c $in -o $out")
        .with_depfile("$out.d", Deps::Gcc)
        .with_description("CC $out"),
      &["cc"],
    )?;

    let dir = ctx.module_dir();
    let name = ctx.module_name().to_string();
    let mut objects = Vec::with_capacity(srcs.len());
    let mut owners: HashMap<String, &str> = HashMap::new();
    for given in srcs {
      let src = source_path(&dir, given);
      let object = format!(
        "{}/obj/{}/{}",
        config.out_dir,
        name,
        Path::new(&src).with_extension("o").display()
      );
      if let Some(first) = owners.get(&object) {
        let message = format!("sources {:?} and {:?} both compile to {:?}", first, given, object);
        ctx.property_error("srcs", message)?;
        continue;
      }
      owners.insert(object.clone(), given);
      ctx.build(
        &self.package,
        BuildParams::new(&rule)
          .with_outputs(&[escape_path(&object)])
          .with_inputs(&[escape_path(&src)])
          .with_arg("cc", &escape_value(&config.cc)),
      )?;
      objects.push(object);
    }
    Ok(objects)
  }

  /// Archive `objects` into this module's static library.
  pub fn archive(&self, ctx: &mut ModuleContext<'_, BuildConfig>, objects: &[String]) -> Result<String, Fault> {
    let config = ctx.config();
    let archive = archive_path(&config.out_dir, ctx.module_name());
    ctx.build(
      &self.package,
      BuildParams::new(&self.archive)
        .with_outputs(&[escape_path(&archive)])
        .with_inputs(&escaped(objects))
        .with_arg("ar", &escape_value(&config.ar)),
    )?;
    Ok(archive)
  }

  /// Link `objects` and `archives` into this module's executable.
  pub fn link(
    &self,
    ctx: &mut ModuleContext<'_, BuildConfig>,
    objects: &[String],
    archives: &[String],
    ldflags: &str,
  ) -> Result<String, Fault> {
    let config = ctx.config();
    let binary = format!("{}/bin/{}", config.out_dir, ctx.module_name());
    let inputs: Vec<String> = objects.iter().chain(archives).cloned().collect();
    ctx.build(
      &self.package,
      BuildParams::new(&self.link)
        .with_outputs(&[escape_path(&binary)])
        .with_inputs(&escaped(&inputs))
        .with_arg("cc", &escape_value(&config.cc))
        .with_arg("ldflags", &escape_value(ldflags)),
    )?;
    Ok(binary)
  }
}

/// Where the `cc_library` module `name` puts its archive.
pub fn archive_path(out_dir: &str, name: &str) -> String {
  format!("{}/lib/{}.a", out_dir, name)
}

fn source_path(dir: &str, src: &str) -> String {
  if dir == "." {
    src.to_string()
  } else {
    format!("{}/{}", dir, src)
  }
}

fn escaped(paths: &[String]) -> Vec<String> {
  paths.iter().map(|p| escape_path(p)).collect()
}
