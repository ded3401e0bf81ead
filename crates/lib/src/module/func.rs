//! Modules backed by a closure.

use std::sync::Arc;

use crate::context::ModuleContext;
use crate::diag::Fault;
use crate::module::Module;
use crate::scope::Package;

type GenerateFn<C> = dyn Fn(&mut ModuleContext<'_, C>) -> Result<(), Fault> + Send + Sync;

/// A module whose build logic is a closure.
///
/// ```
/// use knit_lib::module::FnModule;
/// use knit_lib::scope::{PackageBuilder, RuleParams};
///
/// let pkg = PackageBuilder::new("app").unwrap().build();
/// let module = FnModule::<()>::new(&pkg, |ctx| {
///   let pkg = std::sync::Arc::clone(ctx.scope().package());
///   ctx.rule(&pkg, "touch", &RuleParams::new("touch $out"), &[])?;
///   Ok(())
/// });
/// # let _ = module;
/// ```
pub struct FnModule<C> {
  package: Arc<Package>,
  generate: Box<GenerateFn<C>>,
}

impl<C> FnModule<C> {
  pub fn new<F>(package: &Arc<Package>, generate: F) -> Self
  where
    F: Fn(&mut ModuleContext<'_, C>) -> Result<(), Fault> + Send + Sync + 'static,
  {
    Self {
      package: Arc::clone(package),
      generate: Box::new(generate),
    }
  }

  /// A module that declares nothing.
  pub fn empty(package: &Arc<Package>) -> Self {
    Self::new(package, |_| Ok(()))
  }
}

impl<C> Module<C> for FnModule<C> {
  fn package(&self) -> &Arc<Package> {
    &self.package
  }

  fn generate_build_actions(&self, ctx: &mut ModuleContext<'_, C>) -> Result<(), Fault> {
    (self.generate)(ctx)
  }
}
