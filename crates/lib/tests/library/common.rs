//! Shared helpers for the integration tests.

use std::sync::Arc;

use knit_lib::context::ModuleContext;
use knit_lib::diag::Fault;
use knit_lib::graph::{GenerateOptions, GenerateResult, ModuleGraph};
use knit_lib::module::{FnModule, ModuleId, ModuleInfo};
use knit_lib::ninja::{NinjaWriter, WriterOptions};
use knit_lib::position::Position;
use knit_lib::scope::{Package, PackageBuilder};

pub fn package(name: &str) -> Arc<Package> {
  PackageBuilder::new(name).unwrap().build()
}

pub fn info(name: &str, line: usize) -> ModuleInfo {
  ModuleInfo::new(name, "test", Position::new("knit.lua", line, 1))
}

/// Register a closure-backed module in `package`.
pub fn add_module<F>(graph: &mut ModuleGraph<()>, info: ModuleInfo, package: &Arc<Package>, generate: F) -> ModuleId
where
  F: Fn(&mut ModuleContext<'_, ()>) -> Result<(), Fault> + Send + Sync + 'static,
{
  graph.add_module(info, Box::new(FnModule::new(package, generate))).unwrap()
}

pub fn generate(graph: &ModuleGraph<()>) -> GenerateResult {
  graph.generate(&(), &GenerateOptions::default()).unwrap()
}

pub fn render(graph: &ModuleGraph<()>, result: &GenerateResult) -> String {
  let mut writer = NinjaWriter::new(Vec::new(), WriterOptions::default());
  writer.write(graph, result).unwrap();
  String::from_utf8(writer.into_inner()).unwrap()
}
