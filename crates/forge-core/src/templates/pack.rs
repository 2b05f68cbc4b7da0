//! Template archive packaging
//!
//! Builds the zip a generator's templates are distributed as. Entries are
//! stored under `<name>/` so a remote `<name>.zip` root extracts cleanly.

use super::root::relative_slash_path;
use anyhow::{Context, Result};
use std::io::{Cursor, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Build a zip of every file under `template_dir`, stored as `<name>/<path>`
pub fn build_archive(template_dir: &Path, name: &str) -> Result<Vec<u8>> {
    if !template_dir.is_dir() {
        anyhow::bail!("Template directory not found: {}", template_dir.display());
    }

    let mut files: Vec<_> = WalkDir::new(template_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    // Stable entry order keeps archives reproducible
    files.sort();

    let mut zip_buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut zip_buffer));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for path in &files {
            let Some(relative) = relative_slash_path(template_dir, path) else {
                continue;
            };
            let content = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            zip.start_file(format!("{}/{}", name, relative), options)?;
            zip.write_all(&content)?;
        }

        zip.finish()?;
    }

    Ok(zip_buffer)
}

/// Build `<name>.zip` for every generator directory under `templates_dir`
pub fn build_archives(templates_dir: &Path, output_dir: &Path) -> Result<Vec<(String, usize)>> {
    let mut built = Vec::new();
    let mut generators: Vec<_> = std::fs::read_dir(templates_dir)
        .with_context(|| format!("Failed to read {}", templates_dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .collect();
    generators.sort_by_key(|entry| entry.file_name());

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    for entry in generators {
        let name = entry.file_name().to_string_lossy().to_string();
        let zip_bytes = build_archive(&entry.path(), &name)?;
        let zip_path = output_dir.join(format!("{}.zip", name));
        std::fs::write(&zip_path, &zip_bytes)
            .with_context(|| format!("Failed to write {}", zip_path.display()))?;
        built.push((name, zip_bytes.len()));
    }

    Ok(built)
}
