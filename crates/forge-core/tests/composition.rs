mod common;

use common::{blueprint, environment, host, noop, TestGenerator};
use forge_core::diagnostics::Diagnostic;
use forge_core::{
    BlueprintCatalog, Environment, GeneratorError, GeneratorInstance, GeneratorRegistry, Phase,
    PhaseRegistry, RunOptions, Task, TaskRegistry,
};
use serde_json::json;
use std::sync::Arc;

fn options(dir: &tempfile::TempDir) -> RunOptions {
    RunOptions::new(dir.path()).with_skip_install(true)
}

fn traced(report: &forge_core::RunReport) -> Vec<String> {
    report.trace()
}

#[tokio::test]
async fn test_phases_run_in_registry_order_regardless_of_declaration_order() {
    let dir = tempfile::tempdir().unwrap();
    let base = TestGenerator::new(|tasks| {
        for phase in Phase::ALL.iter().rev().filter(|p| **p != Phase::PreCommit) {
            tasks.register(*phase, noop(phase.name()))?;
        }
        Ok(())
    });

    let report = environment(base, BlueprintCatalog::new())
        .run("app", options(&dir))
        .await
        .unwrap();

    assert_eq!(
        traced(&report),
        vec![
            "initializing:forge:app:initializing",
            "prompting:forge:app:prompting",
            "configuring:forge:app:configuring",
            "composing:forge:app:composing",
            "loading:forge:app:loading",
            "preparing:forge:app:preparing",
            "default:forge:app:default",
            "writing:forge:app:writing",
            "postWriting:forge:app:postWriting",
            "install:forge:app:install",
            "postInstall:forge:app:postInstall",
            "end:forge:app:end",
        ]
    );
    let registry_order: Vec<String> = PhaseRegistry::global()
        .ordered()
        .iter()
        .filter(|spec| !spec.internal)
        .map(|spec| format!("{0}:forge:app:{0}", spec.phase))
        .collect();
    assert_eq!(traced(&report), registry_order);
}

#[tokio::test]
async fn test_tasks_within_a_phase_follow_composition_then_declaration_order() {
    let dir = tempfile::tempdir().unwrap();
    let base = TestGenerator::new(|tasks| {
        tasks.register(Phase::Writing, noop("first"))?;
        tasks.register(Phase::Writing, noop("second"))
    });
    let catalog = BlueprintCatalog::new()
        .with_package(blueprint(
            "generator-forge-a",
            "^7.0.0",
            "app",
            TestGenerator::new(|tasks| tasks.register(Phase::Writing, noop("a"))).side_by_side(),
        ))
        .with_package(blueprint(
            "generator-forge-b",
            "^7.0.0",
            "app",
            TestGenerator::new(|tasks| tasks.register(Phase::Writing, noop("b"))).side_by_side(),
        ));

    let report = environment(base, catalog)
        .run("app", options(&dir).with_blueprints(["b", "a"]))
        .await
        .unwrap();

    assert_eq!(
        traced(&report),
        vec![
            "writing:forge:app:first",
            "writing:forge:app:second",
            "writing:forge-b:app:b",
            "writing:forge-a:app:a",
        ]
    );
    let applied: Vec<_> = report.applied_blueprints.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(applied, vec!["generator-forge-b", "generator-forge-a"]);
}

#[tokio::test]
async fn test_delegate_blueprint_replaces_base_except_identity() {
    let dir = tempfile::tempdir().unwrap();
    let base = TestGenerator::new(|tasks| {
        tasks.register_identity(noop("identity"))?;
        tasks.register(Phase::Writing, noop("baseWrite"))?;
        tasks.register(Phase::End, noop("baseEnd"))
    });
    let catalog = BlueprintCatalog::new().with_package(blueprint(
        "generator-forge-takeover",
        ">=7 <8",
        "app",
        TestGenerator::new(|tasks| tasks.register(Phase::Writing, noop("blueprintWrite"))),
    ));

    let report = environment(base, catalog)
        .run("app", options(&dir).with_blueprints(["takeover"]))
        .await
        .unwrap();

    assert_eq!(
        traced(&report),
        vec![
            "initializing:forge:app:identity",
            "writing:forge-takeover:app:blueprintWrite",
        ]
    );
    assert_eq!(
        report.diagnostics,
        vec![Diagnostic::MissingPhaseImplementation {
            blueprint: forge_core::Namespace::new("forge-takeover:app"),
            phase: Phase::End,
        }]
    );
}

#[tokio::test]
async fn test_side_by_side_runs_both_and_shadows_templates() {
    let dir = tempfile::tempdir().unwrap();
    let base_root = tempfile::tempdir().unwrap();
    let blueprint_root = tempfile::tempdir().unwrap();
    std::fs::write(base_root.path().join("README.md.ejs"), "base readme").unwrap();
    std::fs::write(base_root.path().join("LICENSE.ejs"), "base license").unwrap();
    std::fs::write(blueprint_root.path().join("README.md.ejs"), "blueprint readme").unwrap();

    let base = TestGenerator::new(|tasks| {
        tasks.register(
            Phase::Writing,
            Task::new("render", |mut ctx| {
                Box::pin(async move {
                    ctx.render("README.md.ejs", "README.md").await?;
                    ctx.render("LICENSE.ejs", "LICENSE").await
                })
            }),
        )
    })
    .with_root(base_root.path());
    let catalog = BlueprintCatalog::new().with_package(blueprint(
        "generator-forge-overlay",
        "^7.1.0",
        "app",
        TestGenerator::new(|tasks| tasks.register(Phase::Writing, noop("extra")))
            .side_by_side()
            .with_root(blueprint_root.path()),
    ));

    let report = environment(base, catalog)
        .run("app", options(&dir).with_blueprints(["overlay"]))
        .await
        .unwrap();

    assert_eq!(
        traced(&report),
        vec!["writing:forge:app:render", "writing:forge-overlay:app:extra"]
    );
    assert!(report.diagnostics.is_empty());
    let readme = std::fs::read_to_string(dir.path().join("README.md")).unwrap();
    let license = std::fs::read_to_string(dir.path().join("LICENSE")).unwrap();
    assert_eq!(readme, "blueprint readme");
    assert_eq!(license, "base license");
}

#[tokio::test]
async fn test_composing_into_a_finished_phase_fails_the_task() {
    let dir = tempfile::tempdir().unwrap();
    let base = TestGenerator::new(|tasks| {
        tasks.register(
            Phase::Writing,
            Task::new("composeLate", |mut ctx| {
                Box::pin(async move {
                    let mut late = TaskRegistry::new();
                    late.register(Phase::Configuring, noop("configure"))?;
                    late.register(Phase::End, noop("finish"))?;
                    ctx.compose(GeneratorInstance::from_tasks("late:app", late))?;
                    Ok(())
                })
            }),
        )?;
        tasks.register(Phase::End, noop("baseEnd"))
    });

    let err = environment(base, BlueprintCatalog::new())
        .run("app", options(&dir))
        .await
        .unwrap_err();

    let (phase, namespace) = err.failed_at().unwrap();
    assert_eq!(phase, Phase::Writing);
    assert_eq!(namespace.as_str(), "forge:app");
    assert!(matches!(
        err.task_cause(),
        Some(GeneratorError::LateComposition {
            phase: Phase::Configuring,
            current: Phase::Writing,
            ..
        })
    ));
}

#[tokio::test]
async fn test_composing_into_the_current_or_later_phase_runs_it() {
    let dir = tempfile::tempdir().unwrap();
    let base = TestGenerator::new(|tasks| {
        tasks.register(
            Phase::Default,
            Task::new("composeNow", |mut ctx| {
                Box::pin(async move {
                    let mut extra = TaskRegistry::new();
                    extra.register(Phase::Default, noop("sameBucket"))?;
                    extra.register(Phase::Writing, noop("later"))?;
                    ctx.compose(GeneratorInstance::from_tasks("extra:app", extra))?;
                    Ok(())
                })
            }),
        )
    });

    let report = environment(base, BlueprintCatalog::new())
        .run("app", options(&dir))
        .await
        .unwrap();

    assert_eq!(
        traced(&report),
        vec![
            "default:forge:app:composeNow",
            "default:extra:app:sameBucket",
            "writing:extra:app:later",
        ]
    );
}

#[tokio::test]
async fn test_state_written_by_one_generator_is_seen_by_another() {
    let dir = tempfile::tempdir().unwrap();
    let base = TestGenerator::new(|tasks| {
        tasks.register(
            Phase::Configuring,
            Task::new("storeAnswer", |mut ctx| {
                Box::pin(async move {
                    ctx.control_mut()?.config_mut().set("database", json!("postgres"));
                    Ok(())
                })
            }),
        )?;
        tasks.register(
            Phase::Loading,
            Task::new("loadDatabase", |mut ctx| {
                Box::pin(async move {
                    let database = ctx.control()?.config().get("database").cloned();
                    ctx.application_mut()?
                        .set("database", database.unwrap_or_default());
                    Ok(())
                })
            }),
        )
    });
    let catalog = BlueprintCatalog::new().with_package(blueprint(
        "generator-forge-reader",
        "^7.0.0",
        "app",
        TestGenerator::new(|tasks| {
            tasks.register(
                Phase::Writing,
                Task::new("writeDatabase", |mut ctx| {
                    Box::pin(async move {
                        let database = ctx
                            .application()?
                            .get_str("database")
                            .unwrap_or("none")
                            .to_string();
                        ctx.fs_mut().write_destination("database.txt", database);
                        Ok(())
                    })
                }),
            )
        })
        .side_by_side(),
    ));

    environment(base, catalog)
        .run("app", options(&dir).with_blueprints(["reader"]))
        .await
        .unwrap();

    let written = std::fs::read_to_string(dir.path().join("database.txt")).unwrap();
    assert_eq!(written, "postgres");
}

#[tokio::test]
async fn test_repeated_blueprint_spellings_compose_once() {
    let dir = tempfile::tempdir().unwrap();
    let base = TestGenerator::new(|tasks| tasks.register(Phase::Writing, noop("base")));
    let catalog = BlueprintCatalog::new().with_package(blueprint(
        "generator-forge-foo",
        "^7.0.0",
        "app",
        TestGenerator::new(|tasks| tasks.register(Phase::Writing, noop("foo"))).side_by_side(),
    ));

    let report = environment(base, catalog)
        .run(
            "app",
            options(&dir).with_blueprints(["foo", "generator-forge-foo", " foo "]),
        )
        .await
        .unwrap();

    assert_eq!(
        traced(&report),
        vec!["writing:forge:app:base", "writing:forge-foo:app:foo"]
    );
    assert_eq!(report.applied_blueprints.len(), 1);
}

#[tokio::test]
async fn test_failing_task_stops_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let base = TestGenerator::new(|tasks| {
        tasks.register(
            Phase::Default,
            Task::new("explode", |_ctx| {
                Box::pin(async { Err(anyhow::anyhow!("disk on fire")) })
            }),
        )?;
        tasks.register(
            Phase::Writing,
            Task::new("write", |mut ctx| {
                Box::pin(async move {
                    ctx.fs_mut().write_destination("never.txt", "x");
                    Ok(())
                })
            }),
        )
    });

    let err = environment(base, BlueprintCatalog::new())
        .run("app", options(&dir))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("disk on fire"));
    assert!(err.to_string().contains("explode"));
    assert!(!dir.path().join("never.txt").exists());
}

#[tokio::test]
async fn test_composing_a_sub_command_twice_reuses_its_instance() {
    let dir = tempfile::tempdir().unwrap();
    let base = TestGenerator::new(|tasks| {
        tasks.register(
            Phase::Composing,
            Task::new("composeFirst", |mut ctx| {
                Box::pin(async move {
                    let instance = ctx.compose_with("common")?;
                    let address = Arc::as_ptr(&instance) as usize;
                    ctx.control_mut()?.set("commonInstance", json!(address));
                    Ok(())
                })
            }),
        )?;
        tasks.register(
            Phase::Composing,
            Task::new("composeSecond", |mut ctx| {
                Box::pin(async move {
                    let instance = ctx.compose_with("common")?;
                    let address = Arc::as_ptr(&instance) as usize;
                    let first = ctx.control()?.get("commonInstance").and_then(|v| v.as_u64());
                    anyhow::ensure!(first == Some(address as u64), "common composed twice");
                    Ok(())
                })
            }),
        )
    });
    let common = TestGenerator::new(|tasks| tasks.register(Phase::Writing, noop("writeCommon")));
    let env = Environment::builder(host())
        .generators(
            GeneratorRegistry::new()
                .with("app", Arc::new(base))
                .with("common", Arc::new(common)),
        )
        .build();

    let report = env.run("app", options(&dir)).await.unwrap();

    assert_eq!(
        traced(&report),
        vec![
            "composing:forge:app:composeFirst",
            "composing:forge:app:composeSecond",
            "writing:forge:common:writeCommon",
        ]
    );
}

fn adopting_base() -> TestGenerator {
    TestGenerator::new(|tasks| {
        tasks.register(
            Phase::Composing,
            Task::new("adoptBlueprints", |mut ctx| {
                Box::pin(async move {
                    ctx.compose_with_blueprints("extend")?;
                    Ok(())
                })
            }),
        )?;
        tasks.register(
            Phase::Writing,
            Task::new("baseWrite", |mut ctx| {
                Box::pin(async move {
                    ctx.render("README.md.ejs", "README.md").await
                })
            }),
        )?;
        tasks.register(Phase::End, noop("baseEnd"))
    })
}

fn readme_root(content: &str) -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("README.md.ejs"), content).unwrap();
    root
}

#[tokio::test]
async fn test_blueprints_composed_later_can_take_over() {
    let dir = tempfile::tempdir().unwrap();
    let base_root = readme_root("base readme");
    let catalog = BlueprintCatalog::new().with_package(blueprint(
        "generator-forge-takeover",
        "^7.0.0",
        "extend",
        TestGenerator::new(|tasks| {
            tasks.register(Phase::Writing, noop("blueprintWrite"))?;
            tasks.register(Phase::End, noop("blueprintEnd"))
        }),
    ));

    let report = environment(adopting_base().with_root(base_root.path()), catalog)
        .run("app", options(&dir).with_blueprints(["takeover"]))
        .await
        .unwrap();

    assert_eq!(
        traced(&report),
        vec![
            "composing:forge:app:adoptBlueprints",
            "writing:forge-takeover:extend:blueprintWrite",
            "end:forge-takeover:extend:blueprintEnd",
        ]
    );
    assert!(!dir.path().join("README.md").exists());
    assert_eq!(report.applied_blueprints[0].name, "generator-forge-takeover");
    assert!(report
        .warnings()
        .any(|d| matches!(d, Diagnostic::MissingPhaseImplementation { phase: Phase::Composing, .. })));
}

#[tokio::test]
async fn test_side_by_side_blueprints_composed_later_shadow_templates() {
    let dir = tempfile::tempdir().unwrap();
    let base_root = readme_root("base readme");
    let blueprint_root = readme_root("blueprint readme");
    let catalog = BlueprintCatalog::new().with_package(blueprint(
        "generator-forge-overlay",
        "^7.0.0",
        "extend",
        TestGenerator::new(|tasks| tasks.register(Phase::Writing, noop("extra")))
            .side_by_side()
            .with_root(blueprint_root.path()),
    ));

    let report = environment(adopting_base().with_root(base_root.path()), catalog)
        .run("app", options(&dir).with_blueprints(["overlay"]))
        .await
        .unwrap();

    assert_eq!(
        traced(&report),
        vec![
            "composing:forge:app:adoptBlueprints",
            "writing:forge:app:baseWrite",
            "writing:forge-overlay:extend:extra",
            "end:forge:app:baseEnd",
        ]
    );
    let readme = std::fs::read_to_string(dir.path().join("README.md")).unwrap();
    assert_eq!(readme, "blueprint readme");
}

#[tokio::test]
async fn test_rejected_late_blueprint_leaves_base_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let base = TestGenerator::new(|tasks| {
        tasks.register(
            Phase::Composing,
            Task::new("tryBlueprints", |mut ctx| {
                Box::pin(async move {
                    let outcome = ctx.compose_with_blueprints("extend");
                    anyhow::ensure!(
                        matches!(
                            outcome,
                            Err(GeneratorError::LateComposition {
                                phase: Phase::Configuring,
                                ..
                            })
                        ),
                        "late blueprint was accepted"
                    );
                    Ok(())
                })
            }),
        )?;
        tasks.register(Phase::Writing, noop("baseWrite"))
    });
    let catalog = BlueprintCatalog::new().with_package(blueprint(
        "generator-forge-early",
        "^7.0.0",
        "extend",
        TestGenerator::new(|tasks| {
            tasks.register(Phase::Configuring, noop("configure"))?;
            tasks.register(Phase::Writing, noop("blueprintWrite"))
        }),
    ));

    let report = environment(base, catalog)
        .run("app", options(&dir).with_blueprints(["early"]))
        .await
        .unwrap();

    assert_eq!(
        traced(&report),
        vec!["composing:forge:app:tryBlueprints", "writing:forge:app:baseWrite"]
    );
    assert!(report.applied_blueprints.is_empty());
}
