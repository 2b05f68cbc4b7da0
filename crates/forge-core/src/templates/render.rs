//! Template rendering

use super::data::TemplateData;
use super::root::{TemplateRoot, TemplateStore};
use crate::error::{GeneratorError, Result};
use serde_json::Value;
use std::sync::Arc;

/// Extensions copied byte-for-byte instead of rendered
pub const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "ico", "webp", "woff", "woff2", "ttf", "eot", "jar", "zip",
    "gz", "pdf",
];

/// Suffix marking a file as a template; stripped from destinations
pub const TEMPLATE_SUFFIX: &str = ".ejs";

/// Turns template text plus data into file content
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, data: &TemplateData) -> anyhow::Result<String>;
}

/// Substitutes `<%= path %>` (HTML-escaped) and `<%- path %>` (raw) tags
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderRenderer;

impl TemplateRenderer for PlaceholderRenderer {
    fn render(&self, template: &str, data: &TemplateData) -> anyhow::Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("<%") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find("%>")
                .ok_or_else(|| anyhow::anyhow!("Unclosed template tag"))?;
            let tag = &after[..end];
            rest = &after[end + 2..];

            let mut chars = tag.chars();
            let kind = chars.next();
            let expr = chars.as_str().trim().trim_end_matches('-').trim();
            match kind {
                Some('=') => out.push_str(&escape_html(&self.value(expr, data)?)),
                Some('-') => out.push_str(&self.value(expr, data)?),
                Some('#') => {}
                _ => anyhow::bail!("Unsupported template tag `<%{}%>`", tag),
            }
        }

        out.push_str(rest);
        Ok(out)
    }
}

impl PlaceholderRenderer {
    fn value(&self, expr: &str, data: &TemplateData) -> anyhow::Result<String> {
        let value = data
            .lookup(expr)
            .ok_or_else(|| anyhow::anyhow!("`{}` is not defined in template data", expr))?;
        Ok(match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            Value::Bool(_) | Value::Number(_) => value.to_string(),
            other => serde_json::to_string(other)?,
        })
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Per-call rendering options
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Copy without templating regardless of extension
    pub binary: bool,
}

/// Destination path for a template: the template path without `.ejs`
pub fn destination_for(template: &str) -> &str {
    template.strip_suffix(TEMPLATE_SUFFIX).unwrap_or(template)
}

fn is_binary(path: &str) -> bool {
    let path = destination_for(path);
    path.rsplit_once('.')
        .map(|(_, ext)| BINARY_EXTENSIONS.iter().any(|b| b.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Lookup across template roots plus the renderer
pub struct TemplateEngine {
    store: TemplateStore,
    renderer: Arc<dyn TemplateRenderer>,
}

impl TemplateEngine {
    pub fn new(store: TemplateStore, renderer: Arc<dyn TemplateRenderer>) -> Self {
        Self { store, renderer }
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    /// Render `relative` from the first root that contains it.
    pub async fn render(
        &self,
        roots: &[TemplateRoot],
        relative: &str,
        data: &TemplateData,
        options: RenderOptions,
    ) -> Result<Vec<u8>> {
        let found = self
            .store
            .find(roots, relative)
            .await
            .map_err(|e| GeneratorError::Template(format!("{:#}", e)))?;
        let Some((root, bytes)) = found else {
            return Err(GeneratorError::Template(format!(
                "Template `{}` not found in {} root(s)",
                relative,
                roots.len()
            )));
        };

        if options.binary || is_binary(relative) {
            return Ok(bytes);
        }

        let text = String::from_utf8(bytes).map_err(|_| {
            GeneratorError::Template(format!("Template `{}` is not valid UTF-8", relative))
        })?;
        tracing::debug!(template = relative, root = ?root, "rendering template");
        self.renderer
            .render(&text, data)
            .map(String::into_bytes)
            .map_err(|e| GeneratorError::Template(format!("{}: {}", relative, e)))
    }
}
