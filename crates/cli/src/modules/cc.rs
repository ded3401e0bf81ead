//! `cc_library` and `cc_binary` module types.

use std::sync::Arc;

use knit_lib::context::ModuleContext;
use knit_lib::diag::{Diagnostic, Fault};
use knit_lib::module::{Module, ModuleDecl};
use knit_lib::scope::Package;

use super::toolchain::{Toolchain, archive_path};
use crate::config::BuildConfig;

pub const CC_LIBRARY: &str = "cc_library";
pub const CC_BINARY: &str = "cc_binary";

/// Properties both module types accept besides `name` and `deps`.
#[derive(Debug, Clone, Default)]
struct CcProperties {
  srcs: Vec<String>,
  cflags: String,
}

impl CcProperties {
  fn from_decl(decl: &ModuleDecl) -> Result<Self, Diagnostic> {
    Ok(Self {
      srcs: decl.properties.get_list("srcs")?,
      cflags: decl.properties.get_string("cflags")?.unwrap_or_default(),
    })
  }

  /// Report a module without sources. Returns false if there is nothing to
  /// compile.
  fn check_srcs(&self, ctx: &mut ModuleContext<'_, BuildConfig>) -> Result<bool, Fault> {
    if !self.srcs.is_empty() {
      return Ok(true);
    }
    if ctx.info().property_position("srcs").is_some() {
      ctx.property_error("srcs", "\"srcs\" must list at least one source file")?;
    } else {
      let message = format!("{} {:?} has no \"srcs\" property", ctx.info().module_type, ctx.module_name());
      ctx.module_error(message);
    }
    Ok(false)
  }
}

/// A static library.
pub struct CcLibrary {
  package: Arc<Package>,
  toolchain: Arc<Toolchain>,
  props: CcProperties,
}

impl CcLibrary {
  pub fn from_decl(decl: &ModuleDecl, package: &Arc<Package>, toolchain: &Arc<Toolchain>) -> Result<Self, Diagnostic> {
    Ok(Self {
      package: Arc::clone(package),
      toolchain: Arc::clone(toolchain),
      props: CcProperties::from_decl(decl)?,
    })
  }
}

impl Module<BuildConfig> for CcLibrary {
  fn package(&self) -> &Arc<Package> {
    &self.package
  }

  fn generate_build_actions(&self, ctx: &mut ModuleContext<'_, BuildConfig>) -> Result<(), Fault> {
    if !self.props.check_srcs(ctx)? {
      return Ok(());
    }
    let objects = self.toolchain.compile(ctx, &self.props.srcs, &self.props.cflags)?;
    self.toolchain.archive(ctx, &objects)?;
    Ok(())
  }
}

/// An executable linked against the `cc_library` modules it depends on.
pub struct CcBinary {
  package: Arc<Package>,
  toolchain: Arc<Toolchain>,
  props: CcProperties,
  ldflags: String,
}

impl CcBinary {
  pub fn from_decl(decl: &ModuleDecl, package: &Arc<Package>, toolchain: &Arc<Toolchain>) -> Result<Self, Diagnostic> {
    Ok(Self {
      package: Arc::clone(package),
      toolchain: Arc::clone(toolchain),
      props: CcProperties::from_decl(decl)?,
      ldflags: decl.properties.get_string("ldflags")?.unwrap_or_default(),
    })
  }
}

impl Module<BuildConfig> for CcBinary {
  fn package(&self) -> &Arc<Package> {
    &self.package
  }

  fn generate_build_actions(&self, ctx: &mut ModuleContext<'_, BuildConfig>) -> Result<(), Fault> {
    if !self.props.check_srcs(ctx)? {
      return Ok(());
    }
    let objects = self.toolchain.compile(ctx, &self.props.srcs, &self.props.cflags)?;
    let archives = library_archives(ctx)?;
    self.toolchain.link(ctx, &objects, &archives, &self.ldflags)?;
    Ok(())
  }
}

/// Archives of every `cc_library` reachable through `cc_library`
/// dependencies, dependents before their dependencies.
fn library_archives(ctx: &mut ModuleContext<'_, BuildConfig>) -> Result<Vec<String>, Fault> {
  let out_dir = &ctx.config().out_dir;
  let mut archives = Vec::new();
  ctx.visit_deps_depth_first_if(
    |ctx, dep| {
      ctx
        .other_module_info(dep)
        .is_ok_and(|info| info.module_type == CC_LIBRARY)
    },
    |ctx, dep| {
      archives.push(archive_path(out_dir, ctx.other_module_name(dep)?));
      Ok(())
    },
  )?;
  archives.reverse();
  Ok(archives)
}
