//! Package scopes: named owners of static declarations.
//!
//! A package groups the variables, rules and pools that one body of code
//! (a helper library or a module type) declares once for the whole graph.
//! Static names are emitted as `g.<package>.<name>`. A package may import
//! other packages, which makes their variables reachable as
//! `${other.name}` and their rules usable in build edges.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use super::types::{
  Declaration, Pool, Rule, RuleDef, RuleParams, ScopeError, Variable, parse_arg_names, validate_name,
  validate_package_name,
};
use crate::ninja_string::{NinjaString, VariableResolver};

/// An immutable package scope.
#[derive(Debug)]
pub struct Package {
  name: String,
  imports: BTreeMap<String, Arc<Package>>,
  declarations: Vec<Declaration>,
  index: HashMap<String, usize>,
}

impl Package {
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Static declarations in the order they were made.
  pub fn declarations(&self) -> &[Declaration] {
    &self.declarations
  }

  /// Imported packages, ordered by name.
  pub fn imports(&self) -> impl Iterator<Item = &Arc<Package>> {
    self.imports.values()
  }

  /// Look up a static declaration by short name.
  pub fn lookup(&self, name: &str) -> Option<&Declaration> {
    self.index.get(name).map(|&i| &self.declarations[i])
  }

  pub fn declares(&self, name: &str) -> bool {
    self.index.contains_key(name)
  }

  pub fn imported(&self, name: &str) -> Option<&Arc<Package>> {
    self.imports.get(name)
  }

  /// Resolve a plain or `package.name` pool reference.
  pub fn lookup_pool(&self, reference: &str) -> Result<Arc<Pool>, ScopeError> {
    if reference == "console" {
      return Ok(Pool::console());
    }

    let declaration = match reference.split_once('.') {
      Some((package, name)) => self.imports.get(package).and_then(|p| p.lookup(name)),
      None => self.lookup(reference),
    };

    match declaration {
      Some(Declaration::Pool(pool)) => Ok(Arc::clone(pool)),
      _ => Err(ScopeError::UndefinedPool(reference.to_string())),
    }
  }

  /// A rule is visible from this package if the package or one of its
  /// imports declared it statically.
  pub fn is_rule_visible(&self, rule: &Arc<Rule>) -> bool {
    self.declares_rule(rule) || self.imports.values().any(|p| p.declares_rule(rule))
  }

  fn declares_rule(&self, rule: &Arc<Rule>) -> bool {
    matches!(self.lookup(rule.name()), Some(Declaration::Rule(r)) if Arc::ptr_eq(r, rule))
  }

  fn qualify(&self, name: &str) -> String {
    format!("g.{}.{}", self.name, name)
  }
}

impl VariableResolver for Package {
  fn resolve_variable(&self, reference: &str) -> Option<String> {
    let declaration = match reference.split_once('.') {
      Some((package, name)) => self.imports.get(package)?.lookup(name)?,
      None => self.lookup(reference)?,
    };
    match declaration {
      Declaration::Variable(v) => Some(v.qualified_name().to_string()),
      _ => None,
    }
  }
}

/// Collects the static declarations of a package before it is shared.
///
/// ```
/// use knit_lib::scope::{PackageBuilder, RuleParams};
///
/// let mut cc = PackageBuilder::new("cc").unwrap();
/// cc.variable("warnings", "-Wall").unwrap();
/// let ar = cc.rule("ar", &RuleParams::new("ar rcs $out $in"), &[]).unwrap();
/// let cc = cc.build();
///
/// assert_eq!(ar.qualified_name(), "g.cc.ar");
/// assert!(cc.is_rule_visible(&ar));
/// ```
#[derive(Debug)]
pub struct PackageBuilder {
  package: Package,
}

impl PackageBuilder {
  pub fn new(name: &str) -> Result<Self, ScopeError> {
    validate_package_name(name)?;
    Ok(Self {
      package: Package {
        name: name.to_string(),
        imports: BTreeMap::new(),
        declarations: Vec::new(),
        index: HashMap::new(),
      },
    })
  }

  /// Make `package`'s declarations reachable as `package.name`.
  pub fn import(&mut self, package: &Arc<Package>) -> Result<&mut Self, ScopeError> {
    if self.package.imports.contains_key(package.name()) {
      return Err(ScopeError::DuplicateImport(package.name().to_string()));
    }
    self
      .package
      .imports
      .insert(package.name().to_string(), Arc::clone(package));
    Ok(self)
  }

  pub fn variable(&mut self, name: &str, value: &str) -> Result<Arc<Variable>, ScopeError> {
    self.check_free(name)?;
    let value = NinjaString::parse(value, &self.package).map_err(|source| ScopeError::Value {
      name: name.to_string(),
      source,
    })?;

    let variable = Arc::new(Variable::new(
      name,
      self.package.qualify(name),
      &self.package.name,
      value,
    ));
    self.insert(name, Declaration::Variable(Arc::clone(&variable)));
    Ok(variable)
  }

  pub fn rule(&mut self, name: &str, params: &RuleParams, arg_names: &[&str]) -> Result<Arc<Rule>, ScopeError> {
    self.check_free(name)?;
    let args = parse_arg_names(name, arg_names)?;
    let pool = params
      .pool
      .as_deref()
      .map(|p| self.package.lookup_pool(p).map(|p| p.qualified_name().to_string()))
      .transpose()?;
    let def = RuleDef::parse(name, params, &args, pool, &self.package)?;

    let rule = Arc::new(Rule::new(name, self.package.qualify(name), &self.package.name, args, def));
    self.insert(name, Declaration::Rule(Arc::clone(&rule)));
    Ok(rule)
  }

  pub fn pool(&mut self, name: &str, depth: usize) -> Result<Arc<Pool>, ScopeError> {
    self.check_free(name)?;
    if depth == 0 {
      return Err(ScopeError::InvalidPoolDepth(name.to_string()));
    }

    let pool = Arc::new(Pool::new(name, self.package.qualify(name), &self.package.name, depth));
    self.insert(name, Declaration::Pool(Arc::clone(&pool)));
    Ok(pool)
  }

  pub fn build(self) -> Arc<Package> {
    debug!(
      package = %self.package.name,
      declarations = self.package.declarations.len(),
      imports = self.package.imports.len(),
      "package sealed"
    );
    Arc::new(self.package)
  }

  fn check_free(&self, name: &str) -> Result<(), ScopeError> {
    validate_name(name)?;
    match self.package.lookup(name) {
      Some(existing) => Err(ScopeError::AlreadyDefined {
        name: name.to_string(),
        kind: existing.kind(),
        package: self.package.name.clone(),
      }),
      None => Ok(()),
    }
  }

  fn insert(&mut self, name: &str, declaration: Declaration) {
    self
      .package
      .index
      .insert(name.to_string(), self.package.declarations.len());
    self.package.declarations.push(declaration);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ninja_string::NinjaStringError;

  fn base_package() -> Arc<Package> {
    let mut base = PackageBuilder::new("base").unwrap();
    base.variable("opt", "-O2").unwrap();
    base.pool("link", 2).unwrap();
    base.rule("touch", &RuleParams::new("touch $out"), &[]).unwrap();
    base.build()
  }

  mod declarations {
    use super::*;

    #[test]
    fn static_names_are_qualified_by_package() {
      let mut pkg = PackageBuilder::new("cc").unwrap();
      let v = pkg.variable("cflags", "-Wall").unwrap();

      assert_eq!(v.qualified_name(), "g.cc.cflags");
      assert_eq!(v.owner(), "cc");
      assert_eq!(v.value().value(), "-Wall");
    }

    #[test]
    fn one_object_per_name_regardless_of_kind() {
      let mut pkg = PackageBuilder::new("cc").unwrap();
      pkg.variable("cc", "gcc").unwrap();

      let err = pkg.rule("cc", &RuleParams::new("gcc"), &[]).unwrap_err();

      assert_eq!(
        err,
        ScopeError::AlreadyDefined {
          name: "cc".to_string(),
          kind: "variable",
          package: "cc".to_string(),
        }
      );
    }

    #[test]
    fn variables_reference_earlier_variables() {
      let mut pkg = PackageBuilder::new("cc").unwrap();
      pkg.variable("base", "-Wall").unwrap();
      let v = pkg.variable("cflags", "$base -Werror").unwrap();

      assert_eq!(v.value().value(), "${g.cc.base} -Werror");
    }

    #[test]
    fn undefined_reference_is_error() {
      let mut pkg = PackageBuilder::new("cc").unwrap();

      let err = pkg.variable("cflags", "$missing").unwrap_err();

      assert_eq!(
        err,
        ScopeError::Value {
          name: "cflags".to_string(),
          source: NinjaStringError::Undefined("missing".to_string()),
        }
      );
    }

    #[test]
    fn zero_depth_pool_is_error() {
      let mut pkg = PackageBuilder::new("cc").unwrap();
      assert_eq!(pkg.pool("link", 0), Err(ScopeError::InvalidPoolDepth("link".to_string())));
    }

    #[test]
    fn declarations_keep_insertion_order() {
      let pkg = base_package();
      let names: Vec<_> = pkg.declarations().iter().map(|d| d.qualified_name()).collect();
      assert_eq!(names, vec!["g.base.opt", "g.base.link", "g.base.touch"]);
    }
  }

  mod imports {
    use super::*;

    #[test]
    fn imported_variables_resolve_with_package_prefix() {
      let base = base_package();
      let mut pkg = PackageBuilder::new("cc").unwrap();
      pkg.import(&base).unwrap();

      let v = pkg.variable("cflags", "${base.opt} -g").unwrap();

      assert_eq!(v.value().value(), "${g.base.opt} -g");
    }

    #[test]
    fn imported_names_are_not_visible_unqualified() {
      let base = base_package();
      let mut pkg = PackageBuilder::new("cc").unwrap();
      pkg.import(&base).unwrap();

      assert!(pkg.variable("cflags", "$opt").is_err());
    }

    #[test]
    fn duplicate_import_is_error() {
      let base = base_package();
      let mut pkg = PackageBuilder::new("cc").unwrap();
      pkg.import(&base).unwrap();

      assert!(matches!(pkg.import(&base), Err(ScopeError::DuplicateImport(name)) if name == "base"));
    }

    #[test]
    fn imported_pools_resolve_in_rules() {
      let base = base_package();
      let mut pkg = PackageBuilder::new("ld").unwrap();
      pkg.import(&base).unwrap();

      let rule = pkg
        .rule("link", &RuleParams::new("ld -o $out $in").with_pool("base.link"), &[])
        .unwrap();

      assert_eq!(rule.def().unwrap().pool.as_deref(), Some("g.base.link"));
    }

    #[test]
    fn console_pool_is_always_visible() {
      let pkg = PackageBuilder::new("cc").unwrap().build();
      assert_eq!(pkg.lookup_pool("console").unwrap().qualified_name(), "console");
      assert_eq!(pkg.lookup_pool("nope"), Err(ScopeError::UndefinedPool("nope".to_string())));
    }

    #[test]
    fn rules_of_imports_are_visible() {
      let base = base_package();
      let Some(Declaration::Rule(touch)) = base.lookup("touch").cloned() else {
        panic!("expected touch rule");
      };

      let mut pkg = PackageBuilder::new("cc").unwrap();
      pkg.import(&base).unwrap();
      let pkg = pkg.build();
      let unrelated = PackageBuilder::new("other").unwrap().build();

      assert!(pkg.is_rule_visible(&touch));
      assert!(!unrelated.is_rule_visible(&touch));
      assert!(!pkg.is_rule_visible(&Rule::phony()));
    }
  }
}
