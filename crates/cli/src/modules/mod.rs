//! Module types built into the `knit` binary.
//!
//! # Submodules
//!
//! - [`cc`] - `cc_library` and `cc_binary`
//! - [`toolchain`] - the package of compile, archive and link helpers

pub mod cc;
pub mod toolchain;

use std::sync::Arc;

use knit_lib::module::ModuleTypes;
use knit_lib::scope::{PackageBuilder, ScopeError};

use crate::config::BuildConfig;
use cc::{CC_BINARY, CC_LIBRARY, CcBinary, CcLibrary};
use toolchain::Toolchain;

/// Package the C module types are defined in.
pub const CC_PACKAGE: &str = "cc";

/// Every module type a definition file may use.
pub fn module_types() -> Result<ModuleTypes<BuildConfig>, ScopeError> {
  let toolchain = Arc::new(Toolchain::new()?);
  let package = PackageBuilder::new(CC_PACKAGE)?.build();

  let mut types = ModuleTypes::new();
  {
    let toolchain = Arc::clone(&toolchain);
    let package = Arc::clone(&package);
    types.register(CC_LIBRARY, move |decl| {
      Ok(Box::new(CcLibrary::from_decl(decl, &package, &toolchain)?))
    });
  }
  types.register(CC_BINARY, move |decl| {
    Ok(Box::new(CcBinary::from_decl(decl, &package, &toolchain)?))
  });
  Ok(types)
}
