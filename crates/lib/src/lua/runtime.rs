use std::cell::RefCell;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use mlua::prelude::*;
use tracing::debug;

use super::loader::LoaderState;
use crate::consts::DEFINITIONS_FILE;
use crate::diag::Diagnostic;
use crate::module::{ModuleDecl, Properties, PropertyValue};
use crate::position::Position;

/// Create a Lua runtime with the `knit` table and one global function per
/// module type.
pub fn create_runtime<'a>(
  state: Rc<RefCell<LoaderState>>,
  module_types: impl IntoIterator<Item = &'a str>,
) -> LuaResult<Lua> {
  let lua = Lua::new();

  let knit = lua.create_table()?;
  knit.set("dir", ".")?;
  let subdir_state = Rc::clone(&state);
  let subdir = lua.create_function(move |lua, dir: String| {
    let pos = call_site(lua, &subdir_state);
    let current = subdir_state.borrow().current_dir();
    let rel = match normalize(&current.join(&dir)) {
      Some(rel) => rel.join(DEFINITIONS_FILE),
      None => {
        subdir_state
          .borrow_mut()
          .diagnostics
          .push(Diagnostic::new(pos, format!("subdir {:?} leaves the source tree", dir)));
        return Ok(());
      }
    };
    load_file(lua, &subdir_state, &rel, Some(pos))
  })?;
  knit.set("subdir", subdir)?;
  lua.globals().set("knit", knit)?;

  for module_type in module_types {
    let type_state = Rc::clone(&state);
    let type_name = module_type.to_string();
    let declare = lua.create_function(move |lua, props: LuaValue| {
      let pos = call_site(lua, &type_state);
      let decl = module_decl(&type_name, props, pos);
      let mut state = type_state.borrow_mut();
      match decl {
        Ok(decl) => {
          let name = decl.name.clone();
          state.decls.push(decl);
          Ok(Some(name))
        }
        Err(diagnostic) => {
          state.diagnostics.push(diagnostic);
          Ok(None)
        }
      }
    })?;
    lua.globals().set(module_type, declare)?;
  }

  Ok(lua)
}

/// Evaluate the definition file at `rel` (relative to the root directory).
///
/// A missing or repeated file is reported as a diagnostic at `included_from`
/// when there is one; the root file itself must exist.
pub fn load_file(
  lua: &Lua,
  state: &Rc<RefCell<LoaderState>>,
  rel: &Path,
  included_from: Option<Position>,
) -> LuaResult<()> {
  let (path, seen) = {
    let state = state.borrow();
    (state.root_dir.join(rel), state.files.iter().any(|f| f == rel))
  };

  let problem = if seen {
    Some(format!("{} is already loaded", rel.display()))
  } else if !path.is_file() {
    Some(format!("{} does not exist", rel.display()))
  } else {
    None
  };
  if let Some(message) = problem {
    return match included_from {
      Some(pos) => {
        state.borrow_mut().diagnostics.push(Diagnostic::new(pos, message));
        Ok(())
      }
      None => Err(LuaError::external(message)),
    };
  }

  let content = fs::read_to_string(&path)
    .map_err(|e| LuaError::external(format!("cannot read '{}': {}", path.display(), e)))?;
  debug!(file = %rel.display(), "loading definitions");

  let knit: LuaTable = lua.globals().get("knit")?;
  let previous_dir: String = knit.get("dir")?;
  knit.set("dir", dir_of(rel).to_string_lossy().to_string())?;
  state.borrow_mut().enter(rel.to_path_buf());

  let result = lua
    .load(&content)
    .set_name(format!("@{}", rel.display()))
    .exec();

  state.borrow_mut().leave();
  knit.set("dir", previous_dir)?;
  result
}

/// Position of the Lua code calling the current Rust function.
fn call_site(lua: &Lua, state: &Rc<RefCell<LoaderState>>) -> Position {
  let line = lua
    .inspect_stack(1, |debug| debug.current_line())
    .flatten()
    .unwrap_or(0);
  let file = state
    .borrow()
    .current_file()
    .map(|f| f.to_string_lossy().to_string())
    .unwrap_or_default();
  Position::new(&file, line, 1)
}

fn module_decl(module_type: &str, props: LuaValue, pos: Position) -> Result<ModuleDecl, Diagnostic> {
  let type_name = props.type_name();
  let LuaValue::Table(table) = props else {
    return Err(Diagnostic::new(
      pos,
      format!("{} expects a table of properties, got {}", module_type, type_name),
    ));
  };

  let mut properties = Properties::new();
  for pair in table.pairs::<LuaValue, LuaValue>() {
    let (key, value) = pair.map_err(|e| Diagnostic::new(pos.clone(), e.to_string()))?;
    let key_type = key.type_name();
    let LuaValue::String(key) = key else {
      return Err(Diagnostic::new(
        pos,
        format!("{} property names must be strings, got {}", module_type, key_type),
      ));
    };
    let key = key.to_string_lossy().to_string();
    let value = property_value(&key, value).map_err(|message| Diagnostic::new(pos.clone(), message))?;
    properties.insert(&key, value, pos.clone());
  }

  let name = match properties.get_string("name")? {
    Some(name) => name,
    None => {
      return Err(Diagnostic::new(
        pos,
        format!("{} is missing the required \"name\" property", module_type),
      ));
    }
  };

  Ok(ModuleDecl {
    module_type: module_type.to_string(),
    name,
    pos,
    properties,
  })
}

fn property_value(name: &str, value: LuaValue) -> Result<PropertyValue, String> {
  match value {
    LuaValue::Boolean(b) => Ok(PropertyValue::Bool(b)),
    LuaValue::String(s) => Ok(PropertyValue::String(s.to_string_lossy().to_string())),
    LuaValue::Table(table) => {
      let len = table.raw_len();
      let mut items = Vec::with_capacity(len);
      for index in 1..=len {
        match table.raw_get::<LuaValue>(index) {
          Ok(LuaValue::String(s)) => items.push(s.to_string_lossy().to_string()),
          Ok(other) => {
            return Err(format!(
              "property {:?} must be a list of strings, found {} at index {}",
              name,
              other.type_name(),
              index
            ));
          }
          Err(e) => return Err(e.to_string()),
        }
      }
      let entries = table.pairs::<LuaValue, LuaValue>().count();
      if entries != len {
        return Err(format!("property {:?} must be a list, not a map", name));
      }
      Ok(PropertyValue::List(items))
    }
    other => Err(format!(
      "property {:?} has unsupported type {}; use a string, a bool or a list of strings",
      name,
      other.type_name()
    )),
  }
}

/// Resolve `.` and `..` without touching the filesystem. Returns `None` for
/// paths that climb above their start.
fn normalize(path: &Path) -> Option<PathBuf> {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        if !out.pop() {
          return None;
        }
      }
      Component::Normal(part) => out.push(part),
      Component::RootDir | Component::Prefix(_) => return None,
    }
  }
  Some(out)
}

fn dir_of(rel: &Path) -> PathBuf {
  match rel.parent() {
    Some(dir) if dir != Path::new("") => dir.to_path_buf(),
    _ => PathBuf::from("."),
  }
}
