//! Loading module declarations from Lua definition files.

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mlua::prelude::*;
use thiserror::Error;
use tracing::info;

use super::runtime;
use crate::diag::Diagnostic;
use crate::module::{ModuleDecl, ModuleTypes};

/// Errors that stop loading altogether. Problems with individual
/// declarations are diagnostics instead.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("cannot read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("lua error: {0}")]
  Lua(#[from] LuaError),
}

/// Everything the definition files declared.
#[derive(Debug, Default)]
pub struct LoadedDefinitions {
  pub decls: Vec<ModuleDecl>,
  /// Every file evaluated, relative to the root directory, in load order.
  pub files: Vec<PathBuf>,
  pub diagnostics: Vec<Diagnostic>,
  /// Directory the root file lives in. Positions and `files` are relative
  /// to it.
  pub root_dir: PathBuf,
}

/// Mutable state shared by the Lua callbacks during one load.
#[derive(Debug, Default)]
pub struct LoaderState {
  pub root_dir: PathBuf,
  pub decls: Vec<ModuleDecl>,
  pub files: Vec<PathBuf>,
  pub diagnostics: Vec<Diagnostic>,
  stack: Vec<PathBuf>,
}

impl LoaderState {
  pub fn new(root_dir: &Path) -> Self {
    Self {
      root_dir: root_dir.to_path_buf(),
      ..Self::default()
    }
  }

  /// The file currently being evaluated.
  pub fn current_file(&self) -> Option<&Path> {
    self.stack.last().map(PathBuf::as_path)
  }

  /// Directory of the file currently being evaluated, relative to the root.
  pub fn current_dir(&self) -> PathBuf {
    self
      .current_file()
      .and_then(Path::parent)
      .map(Path::to_path_buf)
      .unwrap_or_default()
  }

  pub(crate) fn enter(&mut self, file: PathBuf) {
    self.files.push(file.clone());
    self.stack.push(file);
  }

  pub(crate) fn leave(&mut self) {
    self.stack.pop();
  }
}

/// Evaluate `root_file` and every file it pulls in with `knit.subdir`.
///
/// Each registered module type is available as a global function taking a
/// property table:
///
/// ```lua
/// cc_library {
///   name = "libfoo",
///   srcs = { "foo.c" },
/// }
/// knit.subdir("tools")
/// ```
pub fn load_definitions<C>(root_file: &Path, module_types: &ModuleTypes<C>) -> Result<LoadedDefinitions, LoadError> {
  if let Err(source) = std::fs::metadata(root_file) {
    return Err(LoadError::Read {
      path: root_file.to_path_buf(),
      source,
    });
  }

  let root_dir = root_file
    .parent()
    .filter(|dir| !dir.as_os_str().is_empty())
    .map(Path::to_path_buf)
    .unwrap_or_else(|| PathBuf::from("."));
  let rel = PathBuf::from(root_file.file_name().unwrap_or(root_file.as_os_str()));

  let state = Rc::new(RefCell::new(LoaderState::new(&root_dir)));
  {
    let lua = runtime::create_runtime(Rc::clone(&state), module_types.names())?;
    runtime::load_file(&lua, &state, &rel, None)?;
  }

  let state = state.take();
  info!(
    files = state.files.len(),
    modules = state.decls.len(),
    diagnostics = state.diagnostics.len(),
    "loaded definitions"
  );

  Ok(LoadedDefinitions {
    decls: state.decls,
    files: state.files,
    diagnostics: state.diagnostics,
    root_dir,
  })
}
