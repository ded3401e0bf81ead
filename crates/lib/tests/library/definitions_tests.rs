//! Definition files through to the rendered Ninja file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use knit_lib::actions::BuildParams;
use knit_lib::graph::ModuleGraph;
use knit_lib::lua::load_definitions;
use knit_lib::module::{FnModule, ModuleTypes};
use knit_lib::scope::{PackageBuilder, RuleParams};
use tempfile::TempDir;

use super::common::{generate, render};

/// A single `stamp` module type: one `touch` edge per source.
fn stamp_types() -> ModuleTypes<()> {
  let mut builder = PackageBuilder::new("stamp").unwrap();
  let touch = builder
    .rule("touch", &RuleParams::new("touch $out").with_description("STAMP $out"), &[])
    .unwrap();
  let pkg = builder.build();

  let mut types = ModuleTypes::new();
  types.register("stamp", move |decl| {
    let srcs = decl.properties.get_list("srcs")?;
    let touch = Arc::clone(&touch);
    Ok(Box::new(FnModule::new(&pkg, move |ctx| {
      let pkg = Arc::clone(ctx.scope().package());
      for src in &srcs {
        let out = format!("{}.stamp", src.trim_end_matches(".c"));
        ctx.build(&pkg, BuildParams::new(&touch).with_outputs(&[out]).with_inputs(&[src]))?;
      }
      Ok(())
    })))
  });
  types
}

fn write(dir: &TempDir, rel: &str, content: &str) -> PathBuf {
  let path = dir.path().join(rel);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(&path, content).unwrap();
  path
}

fn render_tree(root: &Path) -> (String, Vec<String>) {
  let types = stamp_types();
  let loaded = load_definitions(root, &types).unwrap();
  let (graph, mut diagnostics) = ModuleGraph::from_decls(&loaded.decls, &types);
  diagnostics.extend(loaded.diagnostics);
  let result = generate(&graph);
  diagnostics.extend(result.diagnostics().cloned());
  (render(&graph, &result), diagnostics.iter().map(ToString::to_string).collect())
}

#[test]
fn nested_tree_renders_in_dependency_order() {
  let dir = TempDir::new().unwrap();
  let root = write(
    &dir,
    "knit.lua",
    r#"knit.subdir("lib")
stamp { name = "app", srcs = { "main.c" }, deps = { "libfoo" } }
"#,
  );
  write(&dir, "lib/knit.lua", "stamp { name = \"libfoo\", srcs = { knit.dir .. \"/foo.c\" } }\n");

  let (text, diagnostics) = render_tree(&root);

  assert!(diagnostics.is_empty(), "{:?}", diagnostics);
  assert!(text.starts_with("# Generated by knit. Do not edit.\n"));
  assert!(text.contains("# Package: stamp\n"));
  assert!(text.contains("rule g.stamp.touch\n  command = touch $out\n  description = STAMP $out\n"));
  let libfoo = text.find("# Module:  libfoo").unwrap();
  let app = text.find("# Module:  app").unwrap();
  assert!(libfoo < app);
  assert!(text.contains("# Defined: lib/knit.lua:1:1\n"));
  assert!(text.contains("build lib/foo.stamp: g.stamp.touch lib/foo.c\n"));
  assert!(text.contains("build main.stamp: g.stamp.touch main.c\n"));
  assert!(text.ends_with("default lib/foo.stamp main.stamp\n"));
}

#[test]
fn declaration_problems_do_not_stop_the_rest() {
  let dir = TempDir::new().unwrap();
  let root = write(
    &dir,
    "knit.lua",
    r#"stamp { name = "good", srcs = { "a.c" } }
stamp { name = "bad", srcs = "b.c" }
stamp { name = "lonely", deps = { "missing" } }
"#,
  );

  let (text, diagnostics) = render_tree(&root);

  assert_eq!(
    diagnostics,
    vec![
      "knit.lua:2:1: property \"srcs\" must be a list of strings, got a string".to_string(),
      "knit.lua:3:1: \"lonely\" depends on unknown module \"missing\"".to_string(),
    ]
  );
  assert!(text.contains("build a.stamp: g.stamp.touch a.c\n"));
  assert!(!text.contains("b.stamp"));
}
