//! Built-in generators shipped with the host
//!
//! `app` scaffolds a project and composes `common`, which owns the shared
//! dotfiles and offers the `addGitIgnoreEntry` source helper.

mod app;
mod common;

pub use app::AppGenerator;
pub use common::{CommonGenerator, GITIGNORE_HELPER};

use crate::generator::GeneratorRegistry;
use crate::templates::TemplateLocation;
use anyhow::Result;
use std::sync::Arc;

/// Sub-commands of the built-in generators
pub const BUILTIN_GENERATORS: &[&str] = &["app", "common"];

/// Registry of built-in generators with templates under `location`
pub fn registry(location: &TemplateLocation) -> Result<GeneratorRegistry> {
    Ok(GeneratorRegistry::new()
        .with("app", Arc::new(AppGenerator::new(location.root_for("app")?)))
        .with(
            "common",
            Arc::new(CommonGenerator::new(location.root_for("common")?)),
        ))
}

/// `my-shop app` -> `MyShopApp`
pub(crate) fn capitalized(name: &str) -> String {
    words(name)
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// `My Shop_App` -> `my-shop-app`
pub(crate) fn kebab(name: &str) -> String {
    words(name)
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn words(name: &str) -> impl Iterator<Item = &str> {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_name_forms() {
        assert_eq!(capitalized("my-shop app"), "MyShopApp");
        assert_eq!(kebab("My Shop_App"), "my-shop-app");
        assert_eq!(kebab("--"), "");
    }

    #[test]
    fn test_registry_has_both_generators() {
        let registry = registry(&TemplateLocation::local(PathBuf::from("templates"))).unwrap();
        let names: Vec<_> = registry.sub_commands().collect();
        assert_eq!(names, BUILTIN_GENERATORS);
    }
}
