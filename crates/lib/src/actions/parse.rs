//! Conversion of [`BuildParams`] into a [`BuildDef`].

use std::collections::BTreeMap;

use super::types::{BuildDef, BuildParams, BuildParamsError};
use crate::ninja_string::NinjaString;
use crate::scope::{LocalScope, ScopeError};

/// Parse `params` against `scope`.
///
/// # Errors
///
/// - [`BuildParamsError::NoOutputs`] if no output is given
/// - [`BuildParamsError::RuleNotVisible`] if the rule was neither declared in
///   this scope nor is visible from the current package
/// - [`BuildParamsError::UnknownArgument`] for an argument the rule does not
///   declare
/// - [`BuildParamsError::Value`] if any string fails to parse or references
///   an undefined variable
pub fn parse_build_params(scope: &LocalScope, params: BuildParams) -> Result<BuildDef, BuildParamsError> {
  if params.outputs.is_empty() {
    return Err(BuildParamsError::NoOutputs);
  }

  let rule = params.rule;
  if !scope.is_rule_visible(&rule) {
    return Err(BuildParamsError::RuleNotVisible(rule.qualified_name().to_string()));
  }

  let parse_list = |field: &'static str, values: &[String]| {
    values
      .iter()
      .map(|value| parse_value(scope, field, value))
      .collect::<Result<Vec<_>, _>>()
  };

  let mut args = BTreeMap::new();
  for (name, value) in &params.args {
    if !rule.has_arg(name) {
      return Err(BuildParamsError::UnknownArgument {
        rule: rule.qualified_name().to_string(),
        arg: name.clone(),
      });
    }
    args.insert(name.clone(), parse_value(scope, "argument", value)?);
  }

  Ok(BuildDef {
    outputs: parse_list("output", &params.outputs)?,
    implicit_outputs: parse_list("implicit output", &params.implicit_outputs)?,
    inputs: parse_list("input", &params.inputs)?,
    implicits: parse_list("implicit input", &params.implicits)?,
    order_only: parse_list("order-only input", &params.order_only)?,
    args,
    optional: params.optional,
    comment: params.comment,
    rule,
  })
}

fn parse_value(scope: &LocalScope, field: &'static str, value: &str) -> Result<NinjaString, BuildParamsError> {
  NinjaString::parse(value, scope).map_err(|source| BuildParamsError::Value {
    field,
    source: ScopeError::Value {
      name: value.to_string(),
      source,
    },
  })
}
