//! knit-lib: the module-context core of the knit meta-build system.
//!
//! Build definitions declare *modules*; each module's logic runs against a
//! [`ModuleContext`](context::ModuleContext) that scopes its declarations,
//! records its build edges and collects its errors. The results are written
//! out as a Ninja file.
//!
//! - `lua`: evaluates definition files into module declarations
//! - `graph`: registers modules, orders them and runs their passes
//! - `context`: the per-module façade handed to module logic
//! - `scope`: packages, local scopes and name resolution
//! - `ninja`: renders everything as `build.ninja`

pub mod actions;
pub mod consts;
pub mod context;
pub mod diag;
pub mod graph;
pub mod lua;
pub mod module;
pub mod ninja;
pub mod ninja_string;
pub mod position;
pub mod scope;
