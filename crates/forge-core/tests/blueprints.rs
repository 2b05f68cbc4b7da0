mod common;

use common::{blueprint, environment, noop, TestGenerator, HOST_PACKAGE};
use forge_core::blueprint::PackageManifest;
use forge_core::diagnostics::Diagnostic;
use forge_core::{BlueprintCatalog, BlueprintPackage, GeneratorError, GeneratorRegistry, Phase, RunOptions};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn base() -> TestGenerator {
    TestGenerator::new(|tasks| tasks.register(Phase::Writing, noop("base")))
}

fn options(dir: &tempfile::TempDir) -> RunOptions {
    RunOptions::new(dir.path()).with_skip_install(true)
}

#[tokio::test]
async fn test_exact_range_mismatch_is_rejected_before_any_task_runs() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = BlueprintCatalog::new().with_package(blueprint(
        "generator-forge-old",
        "1.1.1",
        "app",
        TestGenerator::new(|tasks| tasks.register(Phase::Writing, noop("old"))),
    ));

    let err = environment(base(), catalog)
        .run("app", options(&dir).with_blueprints(["old"]))
        .await
        .unwrap_err();

    match err {
        GeneratorError::BlueprintVersionMismatch {
            blueprint,
            range,
            host_version,
            ..
        } => {
            assert_eq!(blueprint, "generator-forge-old");
            assert_eq!(range, "1.1.1");
            assert_eq!(host_version, "7.1.0");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join(".forge-config.json").exists());
}

#[tokio::test]
async fn test_skip_checks_turns_mismatch_into_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = BlueprintCatalog::new().with_package(blueprint(
        "generator-forge-old",
        "1.1.1",
        "app",
        TestGenerator::new(|tasks| tasks.register(Phase::Writing, noop("old"))).side_by_side(),
    ));

    let report = environment(base(), catalog)
        .run("app", options(&dir).with_blueprints(["old"]).with_skip_checks(true))
        .await
        .unwrap();

    assert_eq!(report.trace(), vec!["writing:forge:app:base", "writing:forge-old:app:old"]);
    assert!(report.diagnostics.contains(&Diagnostic::VersionCheckSkipped {
        blueprint: "generator-forge-old".into(),
        range: "1.1.1".into(),
        host_version: "7.1.0".into(),
    }));
}

#[tokio::test]
async fn test_host_cannot_be_its_own_blueprint() {
    let dir = tempfile::tempdir().unwrap();
    let err = environment(base(), BlueprintCatalog::new())
        .run("app", options(&dir).with_blueprints([HOST_PACKAGE]))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, GeneratorError::BlueprintDisallowed { name } if name == HOST_PACKAGE),
        "{err}"
    );
}

#[tokio::test]
async fn test_missing_blueprints_are_soft() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = BlueprintCatalog::new().with_package(blueprint(
        "generator-forge-other",
        "^7.0.0",
        "entity",
        TestGenerator::new(|tasks| tasks.register(Phase::Writing, noop("entity"))),
    ));

    let report = environment(base(), catalog)
        .run("app", options(&dir).with_blueprints(["absent", "other"]))
        .await
        .unwrap();

    assert_eq!(report.trace(), vec!["writing:forge:app:base"]);
    let misses: Vec<_> = report
        .diagnostics
        .iter()
        .filter_map(|d| match d {
            Diagnostic::BlueprintNotFound { blueprint, .. } => Some(blueprint.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(misses, vec!["generator-forge-absent", "generator-forge-other"]);
    assert!(report.applied_blueprints.is_empty());
}

#[tokio::test]
async fn test_blueprint_without_host_dependency_still_composes() {
    let dir = tempfile::tempdir().unwrap();
    let package = BlueprintPackage::new(
        "generator-forge-loose",
        PackageManifest::new("generator-forge-loose", "0.3.0"),
        GeneratorRegistry::new().with(
            "app",
            Arc::new(
                TestGenerator::new(|tasks| tasks.register(Phase::Writing, noop("loose")))
                    .side_by_side(),
            ),
        ),
    );

    let report = environment(base(), BlueprintCatalog::new().with_package(package))
        .run("app", options(&dir).with_blueprints(["loose"]))
        .await
        .unwrap();

    assert_eq!(report.trace(), vec!["writing:forge:app:base", "writing:forge-loose:app:loose"]);
    assert!(report.diagnostics.contains(&Diagnostic::NoHostDependency {
        blueprint: "generator-forge-loose".into()
    }));
}

fn write_disk_blueprint(root: &Path) {
    let package = root.join("generator-forge-docs");
    let generator = package.join("generators").join("app");
    fs::create_dir_all(generator.join("templates")).unwrap();
    fs::write(
        package.join("package.json"),
        r#"{
  "name": "generator-forge-docs",
  "version": "2.0.0",
  "dependencies": { "generator-forge": "7.x" }
}"#,
    )
    .unwrap();
    fs::write(
        generator.join("generator.yaml"),
        r#"
sideBySide: true
application:
  docsTitle: Handbook
files:
  - source: HANDBOOK.md.ejs
entityFiles:
  - source: entity.md.ejs
    dest: handbook/{entity}.md
"#,
    )
    .unwrap();
    fs::write(
        generator.join("templates").join("HANDBOOK.md.ejs"),
        "# <%= docsTitle %>\n",
    )
    .unwrap();
    fs::write(
        generator.join("templates").join("entity.md.ejs"),
        "<%= entity.name %> in <%= docsTitle %>\n",
    )
    .unwrap();
}

#[tokio::test]
async fn test_declarative_blueprint_from_search_path() {
    let dir = tempfile::tempdir().unwrap();
    let packages = tempfile::tempdir().unwrap();
    write_disk_blueprint(packages.path());
    fs::create_dir_all(dir.path().join(".forge")).unwrap();
    fs::write(dir.path().join(".forge").join("Book.json"), r#"{"pages": 3}"#).unwrap();

    let base = TestGenerator::new(|tasks| {
        tasks.register(
            Phase::Loading,
            forge_core::Task::new("loadEntities", |mut ctx| {
                Box::pin(async move {
                    let dir = ctx.destination().join(".forge");
                    ctx.entities_mut()?.load_dir(&dir)?;
                    Ok(())
                })
            }),
        )
    });
    let catalog = BlueprintCatalog::new().with_search_path(packages.path());

    let report = environment(base, catalog)
        .run("app", options(&dir).with_blueprints(["docs"]))
        .await
        .unwrap();

    assert_eq!(
        report.trace(),
        vec![
            "loading:forge:app:loadEntities",
            "loading:forge-docs:app:loadApplicationDefaults",
            "writing:forge-docs:app:writeFiles",
            "writing:forge-docs:app:writeEntityFiles",
        ]
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("HANDBOOK.md")).unwrap(),
        "# Handbook\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("handbook/Book.md")).unwrap(),
        "Book in Handbook\n"
    );
    assert_eq!(report.applied_blueprints[0].version.as_deref(), Some("2.0.0"));
}

#[tokio::test]
async fn test_regeneration_reuses_recorded_blueprints() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = BlueprintCatalog::new().with_package(blueprint(
        "generator-forge-foo",
        "^7.0.0",
        "app",
        TestGenerator::new(|tasks| tasks.register(Phase::Writing, noop("foo"))).side_by_side(),
    ));
    let env = environment(base(), catalog);

    env.run("app", options(&dir).with_blueprints(["foo"])).await.unwrap();
    let stored = fs::read_to_string(dir.path().join(".forge-config.json")).unwrap();
    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored["generatorVersion"], "7.1.0");
    assert_eq!(stored["blueprints"][0]["name"], "generator-forge-foo");

    let report = env.run("app", options(&dir)).await.unwrap();
    assert_eq!(report.trace(), vec!["writing:forge:app:base", "writing:forge-foo:app:foo"]);
}
