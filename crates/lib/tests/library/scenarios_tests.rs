//! End-to-end module passes.

use std::sync::Arc;

use knit_lib::actions::BuildParams;
use knit_lib::context::ModuleContext;
use knit_lib::diag::{Diagnostic, Fault};
use knit_lib::graph::ModuleGraph;
use knit_lib::position::Position;
use knit_lib::scope::{Package, RuleParams};

use super::common::{add_module, generate, info, package, render};

mod single_module {
  use super::*;

  #[test]
  fn variable_rule_and_edge() {
    let app = package("app");
    let mut graph = ModuleGraph::new();
    add_module(&mut graph, info("m", 1), &app, |ctx| {
      let pkg = Arc::clone(ctx.scope().package());
      ctx.variable(&pkg, "cflags", "-O2")?;
      let cc = ctx.rule(&pkg, "cc", &RuleParams::new("gcc $cflags -c $in -o $out"), &["cflags"])?;
      ctx.build(
        &pkg,
        BuildParams::new(&cc)
          .with_outputs(&["out.o"])
          .with_inputs(&["in.c"])
          .with_arg("cflags", "$cflags"),
      )
    });

    let result = generate(&graph);

    let m = &result.modules[0];
    assert!(!m.failed());
    assert!(m.output.diagnostics.is_empty());
    assert_eq!(m.output.actions.variables.len(), 1);
    assert_eq!(m.output.actions.rules.len(), 1);
    assert_eq!(m.output.actions.builds.len(), 1);

    let text = render(&graph, &result);
    let variable = text.find("m.m.app.cflags = -O2").unwrap();
    let rule = text.find("rule m.m.app.cc").unwrap();
    let build = text.find("build out.o: m.m.app.cc in.c").unwrap();
    assert!(variable < rule && rule < build);
    assert!(text.contains("  cflags = ${m.m.app.cflags}\n"));
    assert!(text.ends_with("default out.o\n"));
  }

  #[test]
  fn property_error_keeps_earlier_declarations() {
    let app = package("app");
    let mut graph = ModuleGraph::new();
    add_module(
      &mut graph,
      info("n", 10).with_property_position("srcs", Position::new("knit.lua", 12, 1)),
      &app,
      |ctx| {
        let pkg = Arc::clone(ctx.scope().package());
        ctx.variable(&pkg, "cflags", "-O2")?;
        ctx.property_error("srcs", "empty list")?;
        assert!(ctx.failed());
        Ok(())
      },
    );

    let result = generate(&graph);

    let n = &result.modules[0];
    assert!(n.failed());
    assert!(n.fault.is_none());
    assert_eq!(
      n.output.diagnostics,
      vec![Diagnostic::new(Position::new("knit.lua", 12, 1), "empty list")]
    );
    assert_eq!(n.output.actions.variables.len(), 1);
    assert_eq!(
      result.diagnostics().map(ToString::to_string).collect::<Vec<_>>(),
      vec!["knit.lua:12:1: empty list".to_string()]
    );
  }

  #[test]
  fn unset_property_faults_without_failing() {
    let app = package("app");
    let mut graph = ModuleGraph::new();
    add_module(&mut graph, info("n", 1), &app, |ctx| {
      let fault = ctx.property_error("srcs", "empty list").unwrap_err();
      assert!(matches!(fault, Fault::UnsetProperty { .. }));
      assert!(!ctx.failed());
      Ok(())
    });

    let result = generate(&graph);

    assert!(!result.failed());
  }
}

mod helpers {
  use super::*;

  /// A helper shared by many module types. It declares under its own
  /// package whichever module calls it.
  fn compile(ctx: &mut ModuleContext<'_, ()>, helper: &Arc<Package>, src: &str) -> Result<(), Fault> {
    let flags = ctx.variable(helper, "flags", "-fPIC")?;
    let rule = ctx.rule(helper, "compile", &RuleParams::new("cc $flags -c $in -o $out"), &["flags"])?;
    ctx.build(
      helper,
      BuildParams::new(&rule)
        .with_outputs(&[format!("{}.o", src)])
        .with_inputs(&[src])
        .with_arg("flags", &format!("${}", flags.name())),
    )
  }

  #[test]
  fn same_short_name_from_module_and_helper() {
    let app = package("app");
    let cc = package("cc");
    let mut graph = ModuleGraph::new();
    let helper = Arc::clone(&cc);
    add_module(&mut graph, info("libfoo", 1), &app, move |ctx| {
      let own = Arc::clone(ctx.scope().package());
      ctx.variable(&own, "flags", "-O2")?;
      compile(ctx, &helper, "foo.c")
    });

    let result = generate(&graph);

    assert!(!result.failed(), "{:?}", result.faults().collect::<Vec<_>>());
    let names: Vec<_> = result.modules[0]
      .output
      .actions
      .variables
      .iter()
      .map(|v| (v.qualified_name().to_string(), v.owner().to_string()))
      .collect();
    assert_eq!(
      names,
      vec![
        ("m.libfoo.app.flags".to_string(), "app".to_string()),
        ("m.libfoo.cc.flags".to_string(), "cc".to_string()),
      ]
    );
    assert!(knit_lib::graph::check_namespace(&result).is_ok());
  }

  #[test]
  fn helper_called_twice_from_one_module_faults() {
    let app = package("app");
    let cc = package("cc");
    let mut graph = ModuleGraph::new();
    let helper = Arc::clone(&cc);
    add_module(&mut graph, info("libfoo", 1), &app, move |ctx| {
      compile(ctx, &helper, "a.c")?;
      compile(ctx, &helper, "b.c")
    });

    let result = generate(&graph);

    let libfoo = &result.modules[0];
    assert!(matches!(libfoo.fault, Some(Fault::Scope(_))));
    assert!(libfoo.output.actions.is_empty());
  }

  #[test]
  fn helper_shared_by_many_modules() {
    let app = package("app");
    let cc = package("cc");
    let mut graph = ModuleGraph::new();
    for (name, line) in [("liba", 1), ("libb", 5), ("libc", 9)] {
      let helper = Arc::clone(&cc);
      let src = format!("{}.c", name);
      add_module(&mut graph, info(name, line), &app, move |ctx| compile(ctx, &helper, &src));
    }

    let result = generate(&graph);

    assert!(!result.failed());
    assert!(knit_lib::graph::check_namespace(&result).is_ok());
    let text = render(&graph, &result);
    assert!(text.contains("rule m.liba.cc.compile"));
    assert!(text.contains("rule m.libc.cc.compile"));
    assert!(text.contains("default liba.c.o libb.c.o libc.c.o\n"));
  }
}

mod dependencies {
  use super::*;

  #[test]
  fn modules_see_dependency_names_in_post_order() {
    let app = package("app");
    let mut graph = ModuleGraph::new();
    let top = add_module(&mut graph, info("app", 1), &app, |ctx| {
      let mut seen = Vec::new();
      ctx.visit_deps_depth_first(|ctx, dep| {
        seen.push(ctx.other_module_name(dep)?.to_string());
        Ok(())
      })?;
      if seen != ["base", "libfoo"] {
        ctx.module_error(format!("unexpected order {:?}", seen));
      }
      Ok(())
    });
    let libfoo = add_module(&mut graph, info("libfoo", 5), &app, |_| Ok(()));
    let base = add_module(&mut graph, info("base", 9), &app, |_| Ok(()));
    graph.add_dependency(top, libfoo).unwrap();
    graph.add_dependency(libfoo, base).unwrap();

    let result = generate(&graph);

    assert!(!result.failed(), "{:?}", result.diagnostics().collect::<Vec<_>>());
    let order: Vec<_> = result.modules.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(order, vec!["base", "libfoo", "app"]);
  }

  #[test]
  fn other_module_error_blames_the_dependency() {
    let app = package("app");
    let mut graph = ModuleGraph::new();
    let top = add_module(&mut graph, info("app", 1), &app, |ctx| {
      ctx.visit_deps_depth_first_if(
        |ctx, dep| ctx.other_module_info(dep).is_ok_and(|info| info.name != "skipped"),
        |ctx, dep| ctx.other_module_error(dep, "not a library"),
      )
    });
    let dep = add_module(&mut graph, info("tool", 20), &app, |_| Ok(()));
    let skipped = add_module(&mut graph, info("skipped", 30), &app, |_| Ok(()));
    graph.add_dependency(top, dep).unwrap();
    graph.add_dependency(top, skipped).unwrap();

    let result = generate(&graph);

    assert_eq!(
      result.diagnostics().cloned().collect::<Vec<_>>(),
      vec![Diagnostic::new(Position::new("knit.lua", 20, 1), "not a library")]
    );
  }
}
