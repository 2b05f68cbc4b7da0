use crate::error::Result;
use crate::fs::EditOptions;
use crate::generator::{Generator, Task, TaskRegistry};
use crate::phase::Phase;
use crate::templates::TemplateRoot;
use serde_json::json;

/// Source helper appending one line to `.gitignore`
pub const GITIGNORE_HELPER: &str = "addGitIgnoreEntry";

/// Shared dotfiles composed by `app`
pub struct CommonGenerator {
    templates: TemplateRoot,
}

impl CommonGenerator {
    pub fn new(templates: TemplateRoot) -> Self {
        Self { templates }
    }
}

impl Generator for CommonGenerator {
    fn template_root(&self) -> Option<TemplateRoot> {
        Some(self.templates.clone())
    }

    fn register_tasks(&self, tasks: &mut TaskRegistry) -> Result<()> {
        tasks.register(
            Phase::Preparing,
            Task::new("registerGitIgnoreHelper", |mut ctx| {
                Box::pin(async move {
                    let owner = ctx.namespace().clone();
                    ctx.source_mut()?.register(GITIGNORE_HELPER, owner, |fs, args| {
                        let entry = args
                            .get("entry")
                            .and_then(|v| v.as_str())
                            .ok_or_else(|| anyhow::anyhow!("`entry` must be a string"))?
                            .to_string();
                        let options = EditOptions {
                            create: true,
                            ..Default::default()
                        };
                        fs.edit(".gitignore", options, |content| {
                            if content.lines().any(|line| line.trim() == entry) {
                                return content.to_string();
                            }
                            let mut updated = content.to_string();
                            if !updated.is_empty() && !updated.ends_with('\n') {
                                updated.push('\n');
                            }
                            updated.push_str(&entry);
                            updated.push('\n');
                            updated
                        })?;
                        Ok(())
                    });
                    Ok(())
                })
            }),
        )?;

        tasks.register(
            Phase::Writing,
            Task::new("writeDotfiles", |mut ctx| {
                Box::pin(async move {
                    ctx.render("editorconfig.ejs", ".editorconfig").await?;
                    ctx.render("gitignore.ejs", ".gitignore").await?;
                    Ok(())
                })
            }),
        )?;

        tasks.register(
            Phase::PostWriting,
            Task::new("ignoreEntityDir", |mut ctx| {
                Box::pin(async move {
                    ctx.call_source(
                        GITIGNORE_HELPER,
                        &json!({ "entry": format!("{}/*.tmp", super::app::ENTITIES_DIR) }),
                    )
                })
            }),
        )?;

        Ok(())
    }
}
