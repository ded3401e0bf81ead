use std::sync::{Arc, LazyLock};

use thiserror::Error;

use crate::ninja_string::{NinjaString, NinjaStringError, VariableResolver};

/// Variables Ninja defines for every build edge. Rule strings may reference
/// them unqualified.
pub const BUILTIN_RULE_VARIABLES: &[&str] = &["in", "in_newline", "out"];

/// Errors raised by scope declarations and lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
  #[error("invalid name {0:?}: names may only contain letters, digits, '_' and '-'")]
  InvalidName(String),

  #[error("invalid package name {0:?}")]
  InvalidPackageName(String),

  #[error("{name:?} is already defined as a {kind} in package {package:?}")]
  AlreadyDefined {
    name: String,
    kind: &'static str,
    package: String,
  },

  #[error("package {0:?} is already imported")]
  DuplicateImport(String),

  #[error("invalid value for {name:?}: {source}")]
  Value {
    name: String,
    #[source]
    source: NinjaStringError,
  },

  #[error("rule {0:?} has an empty command")]
  EmptyCommand(String),

  #[error("rule {rule:?} declares argument {arg:?} twice")]
  DuplicateArgument { rule: String, arg: String },

  #[error("undefined pool {0:?}")]
  UndefinedPool(String),

  #[error("pool {0:?} must have a depth of at least 1")]
  InvalidPoolDepth(String),
}

/// Check that `name` is usable as a short declaration name.
pub fn validate_name(name: &str) -> Result<(), ScopeError> {
  if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
    Ok(())
  } else {
    Err(ScopeError::InvalidName(name.to_string()))
  }
}

/// Check that `name` is usable as a package name (an identifier, so that
/// `${package.name}` references stay unambiguous).
pub fn validate_package_name(name: &str) -> Result<(), ScopeError> {
  let mut chars = name.chars();
  let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
  if valid {
    Ok(())
  } else {
    Err(ScopeError::InvalidPackageName(name.to_string()))
  }
}

/// A declared Ninja variable.
#[derive(Debug, PartialEq, Eq)]
pub struct Variable {
  name: String,
  qualified: String,
  owner: String,
  value: NinjaString,
}

impl Variable {
  pub(crate) fn new(name: &str, qualified: String, owner: &str, value: NinjaString) -> Self {
    Self {
      name: name.to_string(),
      qualified,
      owner: owner.to_string(),
      value,
    }
  }

  /// The short name it was declared with.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// The name emitted into the Ninja file.
  pub fn qualified_name(&self) -> &str {
    &self.qualified
  }

  /// The package that owns the declaration.
  pub fn owner(&self) -> &str {
    &self.owner
  }

  pub fn value(&self) -> &NinjaString {
    &self.value
  }
}

/// Dependency-file format for a rule's `deps` binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Deps {
  Gcc,
  Msvc,
}

impl Deps {
  pub fn as_str(self) -> &'static str {
    match self {
      Deps::Gcc => "gcc",
      Deps::Msvc => "msvc",
    }
  }
}

/// Parameters of a rule as written by module or package code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleParams {
  pub command: String,
  pub depfile: Option<String>,
  pub deps: Option<Deps>,
  pub description: Option<String>,
  pub generator: bool,
  pub restat: bool,
  pub rspfile: Option<String>,
  pub rspfile_content: Option<String>,
  pub pool: Option<String>,
  pub comment: Option<String>,
  pub command_deps: Vec<String>,
}

impl RuleParams {
  pub fn new(command: &str) -> Self {
    Self {
      command: command.to_string(),
      ..Self::default()
    }
  }

  pub fn with_description(mut self, description: &str) -> Self {
    self.description = Some(description.to_string());
    self
  }

  pub fn with_depfile(mut self, depfile: &str, deps: Deps) -> Self {
    self.depfile = Some(depfile.to_string());
    self.deps = Some(deps);
    self
  }

  pub fn with_rspfile(mut self, rspfile: &str, content: &str) -> Self {
    self.rspfile = Some(rspfile.to_string());
    self.rspfile_content = Some(content.to_string());
    self
  }

  pub fn with_pool(mut self, pool: &str) -> Self {
    self.pool = Some(pool.to_string());
    self
  }

  pub fn with_comment(mut self, comment: &str) -> Self {
    self.comment = Some(comment.to_string());
    self
  }

  pub fn with_command_deps(mut self, deps: &[&str]) -> Self {
    self.command_deps = deps.iter().map(|d| d.to_string()).collect();
    self
  }

  pub fn generator(mut self) -> Self {
    self.generator = true;
    self
  }

  pub fn restat(mut self) -> Self {
    self.restat = true;
    self
  }
}

/// Rule parameters with every string parsed and resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDef {
  pub command: NinjaString,
  pub depfile: Option<NinjaString>,
  pub deps: Option<Deps>,
  pub description: Option<NinjaString>,
  pub generator: bool,
  pub restat: bool,
  pub rspfile: Option<NinjaString>,
  pub rspfile_content: Option<NinjaString>,
  /// Emitted name of the pool, if any.
  pub pool: Option<String>,
  pub comment: Option<String>,
  pub command_deps: Vec<NinjaString>,
}

/// Resolves rule-local names (arguments and Ninja builtins) before falling
/// back to the enclosing scope.
struct RuleResolver<'a, R> {
  args: &'a [String],
  scope: &'a R,
}

impl<R: VariableResolver> VariableResolver for RuleResolver<'_, R> {
  fn resolve_variable(&self, name: &str) -> Option<String> {
    if BUILTIN_RULE_VARIABLES.contains(&name) || self.args.iter().any(|a| a == name) {
      Some(name.to_string())
    } else {
      self.scope.resolve_variable(name)
    }
  }
}

impl RuleDef {
  pub(crate) fn parse(
    name: &str,
    params: &RuleParams,
    args: &[String],
    pool: Option<String>,
    scope: &impl VariableResolver,
  ) -> Result<Self, ScopeError> {
    if params.command.trim().is_empty() {
      return Err(ScopeError::EmptyCommand(name.to_string()));
    }

    let resolver = RuleResolver { args, scope };
    let parse = |value: &str| {
      NinjaString::parse(value, &resolver).map_err(|source| ScopeError::Value {
        name: name.to_string(),
        source,
      })
    };
    let parse_opt = |value: &Option<String>| value.as_deref().map(parse).transpose();

    Ok(Self {
      command: parse(&params.command)?,
      depfile: parse_opt(&params.depfile)?,
      deps: params.deps,
      description: parse_opt(&params.description)?,
      generator: params.generator,
      restat: params.restat,
      rspfile: parse_opt(&params.rspfile)?,
      rspfile_content: parse_opt(&params.rspfile_content)?,
      pool,
      comment: params.comment.clone(),
      command_deps: params
        .command_deps
        .iter()
        .map(|d| parse(d))
        .collect::<Result<Vec<_>, _>>()?,
    })
  }
}

/// Validate argument names and return them owned.
pub(crate) fn parse_arg_names(rule: &str, arg_names: &[&str]) -> Result<Vec<String>, ScopeError> {
  let mut args: Vec<String> = Vec::with_capacity(arg_names.len());
  for &arg in arg_names {
    validate_name(arg)?;
    if args.iter().any(|a| a == arg) {
      return Err(ScopeError::DuplicateArgument {
        rule: rule.to_string(),
        arg: arg.to_string(),
      });
    }
    args.push(arg.to_string());
  }
  Ok(args)
}

/// A declared rule. Modules hold on to the returned `Arc<Rule>` and pass it
/// back when recording build edges.
#[derive(Debug, PartialEq, Eq)]
pub struct Rule {
  name: String,
  qualified: String,
  owner: Option<String>,
  arg_names: Vec<String>,
  def: Option<RuleDef>,
}

static PHONY: LazyLock<Arc<Rule>> = LazyLock::new(|| {
  Arc::new(Rule {
    name: "phony".to_string(),
    qualified: "phony".to_string(),
    owner: None,
    arg_names: Vec::new(),
    def: None,
  })
});

impl Rule {
  pub(crate) fn new(name: &str, qualified: String, owner: &str, arg_names: Vec<String>, def: RuleDef) -> Self {
    Self {
      name: name.to_string(),
      qualified,
      owner: Some(owner.to_string()),
      arg_names,
      def: Some(def),
    }
  }

  /// Ninja's builtin `phony` rule.
  pub fn phony() -> Arc<Rule> {
    Arc::clone(&PHONY)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn qualified_name(&self) -> &str {
    &self.qualified
  }

  /// Owning package; `None` for builtin rules.
  pub fn owner(&self) -> Option<&str> {
    self.owner.as_deref()
  }

  pub fn arg_names(&self) -> &[String] {
    &self.arg_names
  }

  pub fn has_arg(&self, name: &str) -> bool {
    self.arg_names.iter().any(|a| a == name)
  }

  /// Parsed parameters; `None` for builtin rules, which are never emitted.
  pub fn def(&self) -> Option<&RuleDef> {
    self.def.as_ref()
  }

  pub fn is_builtin(&self) -> bool {
    self.owner.is_none()
  }
}

/// A Ninja pool limiting how many edges run at once.
#[derive(Debug, PartialEq, Eq)]
pub struct Pool {
  name: String,
  qualified: String,
  owner: Option<String>,
  depth: usize,
}

static CONSOLE: LazyLock<Arc<Pool>> = LazyLock::new(|| {
  Arc::new(Pool {
    name: "console".to_string(),
    qualified: "console".to_string(),
    owner: None,
    depth: 1,
  })
});

impl Pool {
  pub(crate) fn new(name: &str, qualified: String, owner: &str, depth: usize) -> Self {
    Self {
      name: name.to_string(),
      qualified,
      owner: Some(owner.to_string()),
      depth,
    }
  }

  /// Ninja's builtin `console` pool.
  pub fn console() -> Arc<Pool> {
    Arc::clone(&CONSOLE)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn qualified_name(&self) -> &str {
    &self.qualified
  }

  pub fn owner(&self) -> Option<&str> {
    self.owner.as_deref()
  }

  pub fn depth(&self) -> usize {
    self.depth
  }

  pub fn is_builtin(&self) -> bool {
    self.owner.is_none()
  }
}

/// Anything a scope can map a name to.
#[derive(Debug, Clone)]
pub enum Declaration {
  Variable(Arc<Variable>),
  Rule(Arc<Rule>),
  Pool(Arc<Pool>),
}

impl Declaration {
  pub fn kind(&self) -> &'static str {
    match self {
      Declaration::Variable(_) => "variable",
      Declaration::Rule(_) => "rule",
      Declaration::Pool(_) => "pool",
    }
  }

  pub fn qualified_name(&self) -> &str {
    match self {
      Declaration::Variable(v) => v.qualified_name(),
      Declaration::Rule(r) => r.qualified_name(),
      Declaration::Pool(p) => p.qualified_name(),
    }
  }
}
