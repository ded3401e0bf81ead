use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::ninja_string::NinjaString;
use crate::scope::{Rule, ScopeError, Variable};

/// A build edge as requested by module code.
#[derive(Debug, Clone)]
pub struct BuildParams {
  pub rule: Arc<Rule>,
  pub outputs: Vec<String>,
  pub implicit_outputs: Vec<String>,
  pub inputs: Vec<String>,
  pub implicits: Vec<String>,
  pub order_only: Vec<String>,
  pub args: BTreeMap<String, String>,
  /// Optional edges are left out of the `default` target list.
  pub optional: bool,
  pub comment: Option<String>,
}

impl BuildParams {
  pub fn new(rule: &Arc<Rule>) -> Self {
    Self {
      rule: Arc::clone(rule),
      outputs: Vec::new(),
      implicit_outputs: Vec::new(),
      inputs: Vec::new(),
      implicits: Vec::new(),
      order_only: Vec::new(),
      args: BTreeMap::new(),
      optional: false,
      comment: None,
    }
  }

  pub fn with_outputs<S: AsRef<str>>(mut self, outputs: &[S]) -> Self {
    self.outputs.extend(outputs.iter().map(|s| s.as_ref().to_string()));
    self
  }

  pub fn with_implicit_outputs<S: AsRef<str>>(mut self, outputs: &[S]) -> Self {
    self.implicit_outputs.extend(outputs.iter().map(|s| s.as_ref().to_string()));
    self
  }

  pub fn with_inputs<S: AsRef<str>>(mut self, inputs: &[S]) -> Self {
    self.inputs.extend(inputs.iter().map(|s| s.as_ref().to_string()));
    self
  }

  pub fn with_implicits<S: AsRef<str>>(mut self, implicits: &[S]) -> Self {
    self.implicits.extend(implicits.iter().map(|s| s.as_ref().to_string()));
    self
  }

  pub fn with_order_only<S: AsRef<str>>(mut self, order_only: &[S]) -> Self {
    self.order_only.extend(order_only.iter().map(|s| s.as_ref().to_string()));
    self
  }

  pub fn with_arg(mut self, name: &str, value: &str) -> Self {
    self.args.insert(name.to_string(), value.to_string());
    self
  }

  pub fn with_comment(mut self, comment: &str) -> Self {
    self.comment = Some(comment.to_string());
    self
  }

  pub fn optional(mut self) -> Self {
    self.optional = true;
    self
  }
}

/// A build edge with every string parsed against the declaring scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDef {
  pub rule: Arc<Rule>,
  pub outputs: Vec<NinjaString>,
  pub implicit_outputs: Vec<NinjaString>,
  pub inputs: Vec<NinjaString>,
  pub implicits: Vec<NinjaString>,
  pub order_only: Vec<NinjaString>,
  pub args: BTreeMap<String, NinjaString>,
  pub optional: bool,
  pub comment: Option<String>,
}

/// Errors that can occur while parsing build parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildParamsError {
  #[error("build params must specify at least one output")]
  NoOutputs,

  #[error("rule {0:?} is not visible in this scope")]
  RuleNotVisible(String),

  #[error("rule {rule:?} has no argument {arg:?}")]
  UnknownArgument { rule: String, arg: String },

  #[error("invalid {field}: {source}")]
  Value {
    field: &'static str,
    #[source]
    source: ScopeError,
  },
}

/// The build actions one module produced during its pass.
///
/// Insertion order is preserved: it is the order the statements are
/// written in.
#[derive(Debug, Default, Clone)]
pub struct BuildActions {
  pub variables: Vec<Arc<Variable>>,
  pub rules: Vec<Arc<Rule>>,
  pub builds: Vec<BuildDef>,
}

impl BuildActions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.variables.is_empty() && self.rules.is_empty() && self.builds.is_empty()
  }

  /// Every name this set emits into the Ninja file.
  pub fn qualified_names(&self) -> impl Iterator<Item = &str> {
    self
      .variables
      .iter()
      .map(|v| v.qualified_name())
      .chain(self.rules.iter().map(|r| r.qualified_name()))
  }
}
