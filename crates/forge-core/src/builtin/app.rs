use super::{capitalized, kebab};
use crate::blueprint::version::less_than;
use crate::error::Result;
use crate::generator::{Generator, Task, TaskRegistry};
use crate::phase::Phase;
use crate::prompts::Question;
use crate::templates::TemplateRoot;
use colored::Colorize;
use serde_json::{json, Value};

/// Directory of entity definitions inside a destination
pub const ENTITIES_DIR: &str = ".forge";

/// Scaffolds a project: README, package manifest and one doc page per entity
pub struct AppGenerator {
    templates: TemplateRoot,
}

impl AppGenerator {
    pub fn new(templates: TemplateRoot) -> Self {
        Self { templates }
    }
}

impl Generator for AppGenerator {
    fn template_root(&self) -> Option<TemplateRoot> {
        Some(self.templates.clone())
    }

    fn register_tasks(&self, tasks: &mut TaskRegistry) -> Result<()> {
        tasks.register_identity(Task::new("recordStart", |mut ctx| {
            Box::pin(async move {
                let control = ctx.control_mut()?;
                let started = control.next_timestamp();
                control.set("startedAt", json!(started));
                Ok(())
            })
        }))?;

        tasks.register(
            Phase::Prompting,
            Task::new("askForProject", |mut ctx| {
                Box::pin(async move {
                    let default_name = ctx
                        .destination()
                        .file_name()
                        .map(|name| name.to_string_lossy().to_string())
                        .unwrap_or_else(|| "app".to_string());
                    let notices = ctx.control_mut()?.config_mut().migrate_legacy_keys();
                    for notice in notices {
                        ctx.diagnostic(notice);
                    }
                    ctx.prompt(&[
                        Question::input("baseName", "What is the base name of your application?", default_name),
                        Question::select(
                            "packageManager",
                            "Which package manager would you like to use?",
                            [("npm", "npm"), ("pnpm", "pnpm"), ("yarn", "yarn")],
                        ),
                    ])
                })
            }),
        )?;

        tasks.register(
            Phase::Configuring,
            Task::new("configureDefaults", |mut ctx| {
                Box::pin(async move {
                    let config = ctx.control_mut()?.config_mut();
                    config.set_default("baseName", json!("app"));
                    config.set_default("packageManager", json!("npm"));
                    Ok(())
                })
            }),
        )?;

        tasks.register(
            Phase::Composing,
            Task::new("composeCommon", |mut ctx| {
                Box::pin(async move {
                    ctx.compose_with("common")?;
                    Ok(())
                })
            }),
        )?;

        tasks.register(
            Phase::Loading,
            Task::new("loadApplication", |mut ctx| {
                Box::pin(async move {
                    let values = ctx.control()?.config().values().clone();
                    let application = ctx.application_mut()?;
                    for (key, value) in values {
                        application.set(key, value);
                    }

                    let dir = ctx.destination().join(ENTITIES_DIR);
                    let loaded = ctx.entities_mut()?.load_dir(&dir)?;
                    tracing::debug!(entities = loaded, "loaded entity definitions");
                    Ok(())
                })
            }),
        )?;

        tasks.register(
            Phase::Preparing,
            Task::new("deriveNames", |mut ctx| {
                Box::pin(async move {
                    let application = ctx.application_mut()?;
                    let base_name = application.get_str("baseName").unwrap_or("app").to_string();
                    application.set("baseNameCapitalized", json!(capitalized(&base_name)));
                    application.set("baseNameKebab", json!(kebab(&base_name)));
                    Ok(())
                })
            }),
        )?;

        tasks.register(
            Phase::Preparing,
            Task::each_entity("prepareEntity", |mut ctx| {
                Box::pin(async move {
                    let name = ctx.entity().name.clone();
                    let entity = ctx.entity_mut();
                    entity.data.insert("entityClass".into(), json!(capitalized(&name)));
                    entity.data.insert("entityFileName".into(), json!(kebab(&name)));
                    Ok(())
                })
            }),
        )?;

        tasks.register(
            Phase::Writing,
            Task::new("writeProjectFiles", |mut ctx| {
                Box::pin(async move {
                    ctx.render("README.md.ejs", "README.md").await?;
                    ctx.render("package.json.ejs", "package.json").await?;
                    Ok(())
                })
            }),
        )?;

        tasks.register(
            Phase::Writing,
            Task::each_entity("writeEntityDocs", |mut ctx| {
                Box::pin(async move {
                    let dest = format!("docs/{}.md", ctx.entity().name);
                    ctx.render("docs/entity.md.ejs", &dest).await
                })
            }),
        )?;

        tasks.register(
            Phase::Install,
            Task::new("installDependencies", |mut ctx| {
                Box::pin(async move {
                    let manager = ctx
                        .application()?
                        .get_str("packageManager")
                        .unwrap_or("npm")
                        .to_string();
                    ctx.spawn_command(&manager, &["install"]).await?;
                    Ok(())
                })
            }),
        )?;

        tasks.register(
            Phase::End,
            Task::new("printNextSteps", |ctx| {
                Box::pin(async move {
                    let current = ctx.host().version().to_string();
                    let control = ctx.control()?;
                    if let Some(previous) = control.old_version() {
                        if less_than(&previous.to_string(), &current) == Some(true) {
                            println!(
                                "{} {} -> {}",
                                "Regenerated with a newer version:".dimmed(),
                                previous,
                                current.green()
                            );
                        }
                    }

                    let base_name = ctx
                        .application()?
                        .get("baseName")
                        .and_then(Value::as_str)
                        .unwrap_or("app");
                    println!();
                    println!("{} {}", "Project ready:".green().bold(), base_name.bold());
                    println!("  cd {}", ctx.destination().display());
                    Ok(())
                })
            }),
        )?;

        Ok(())
    }
}
