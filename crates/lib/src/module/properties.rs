//! Property values set on modules by build definitions.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::diag::Diagnostic;
use crate::position::Position;

/// A property value. Definitions can only set strings, booleans and lists
/// of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
  Bool(bool),
  String(String),
  List(Vec<String>),
}

impl PropertyValue {
  pub fn type_name(&self) -> &'static str {
    match self {
      PropertyValue::Bool(_) => "bool",
      PropertyValue::String(_) => "string",
      PropertyValue::List(_) => "list of strings",
    }
  }
}

/// The properties of one module declaration, each with the position it was
/// set at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Properties {
  values: BTreeMap<String, PropertyValue>,
  #[serde(skip)]
  positions: BTreeMap<String, Position>,
}

impl Properties {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, name: &str, value: PropertyValue, pos: Position) {
    self.values.insert(name.to_string(), value);
    self.positions.insert(name.to_string(), pos);
  }

  pub fn get(&self, name: &str) -> Option<&PropertyValue> {
    self.values.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.values.contains_key(name)
  }

  pub fn position(&self, name: &str) -> Option<&Position> {
    self.positions.get(name)
  }

  pub fn positions(&self) -> &BTreeMap<String, Position> {
    &self.positions
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.values.keys().map(|k| k.as_str())
  }

  pub fn get_string(&self, name: &str) -> Result<Option<String>, Diagnostic> {
    match self.values.get(name) {
      None => Ok(None),
      Some(PropertyValue::String(s)) => Ok(Some(s.clone())),
      Some(other) => Err(self.mismatch(name, "string", other)),
    }
  }

  pub fn get_bool(&self, name: &str) -> Result<Option<bool>, Diagnostic> {
    match self.values.get(name) {
      None => Ok(None),
      Some(PropertyValue::Bool(b)) => Ok(Some(*b)),
      Some(other) => Err(self.mismatch(name, "bool", other)),
    }
  }

  /// An absent list property reads as empty.
  pub fn get_list(&self, name: &str) -> Result<Vec<String>, Diagnostic> {
    match self.values.get(name) {
      None => Ok(Vec::new()),
      Some(PropertyValue::List(items)) => Ok(items.clone()),
      Some(other) => Err(self.mismatch(name, "list of strings", other)),
    }
  }

  fn mismatch(&self, name: &str, expected: &str, actual: &PropertyValue) -> Diagnostic {
    Diagnostic::new(
      self.positions.get(name).cloned().unwrap_or_default(),
      format!(
        "property {:?} must be a {}, got a {}",
        name,
        expected,
        actual.type_name()
      ),
    )
  }
}
