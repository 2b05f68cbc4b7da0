//! Template roots and lookup across them
//!
//! A generator's templates live in a directory or in a zip archive. Archives
//! are read from disk or fetched from a URL and extracted into memory once
//! per run. Lookup walks an ordered list of roots and the first root that
//! holds the requested file wins.

use crate::host::HostConfig;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use url::Url;
use zip::ZipArchive;

/// Where a generator's templates live
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateRoot {
    Directory(PathBuf),
    /// Zip archive on disk
    Archive(PathBuf),
    /// Zip archive fetched over HTTP
    Remote(Url),
}

impl TemplateRoot {
    /// Parse a root from a CLI/config string.
    pub fn parse(location: &str) -> Result<Self> {
        if location.starts_with("http://") || location.starts_with("https://") {
            let url =
                Url::parse(location).with_context(|| format!("Invalid template URL: {}", location))?;
            return Ok(Self::Remote(url));
        }
        let path = PathBuf::from(location);
        if path.extension().is_some_and(|ext| ext == "zip") {
            Ok(Self::Archive(path))
        } else {
            Ok(Self::Directory(path))
        }
    }

    /// Prefix stripped from archive entries: the archive's file stem
    fn archive_prefix(&self) -> Option<String> {
        let name = match self {
            TemplateRoot::Directory(_) => return None,
            TemplateRoot::Archive(path) => path.file_stem()?.to_string_lossy().to_string(),
            TemplateRoot::Remote(url) => {
                let last = url.path_segments()?.next_back()?;
                last.strip_suffix(".zip").unwrap_or(last).to_string()
            }
        };
        Some(format!("{}/", name))
    }
}

/// Location of the host's built-in templates, one root per generator
#[derive(Debug, Clone)]
pub enum TemplateLocation {
    Local(PathBuf),
    Remote(Url),
}

impl TemplateLocation {
    /// Remote location from the host config, overridable through its env var
    pub fn from_config<C: HostConfig>(config: &C) -> Result<Self> {
        let url_str = std::env::var(config.template_url_env())
            .unwrap_or_else(|_| config.default_template_url().to_string());
        if !url_str.starts_with("http://") && !url_str.starts_with("https://") {
            return Ok(Self::Local(PathBuf::from(url_str)));
        }
        let url =
            Url::parse(&url_str).with_context(|| format!("Invalid template URL: {}", url_str))?;
        Ok(Self::Remote(url))
    }

    pub fn local(path: PathBuf) -> Self {
        Self::Local(path)
    }

    /// Root holding the templates of `generator`
    pub fn root_for(&self, generator: &str) -> Result<TemplateRoot> {
        match self {
            TemplateLocation::Local(path) => Ok(TemplateRoot::Directory(path.join(generator))),
            TemplateLocation::Remote(base) => Ok(TemplateRoot::Remote(build_url(
                base,
                &format!("{}.zip", generator),
            )?)),
        }
    }
}

/// Build a URL by appending a path segment, preserving query parameters
fn build_url(base: &Url, path_segment: &str) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("URL cannot have path segments: {}", base))?
        .pop_if_empty()
        .push(path_segment);
    Ok(url)
}

/// Extracted archive contents keyed by relative path
#[derive(Debug, Default)]
struct ArchiveFiles {
    files: HashMap<String, Vec<u8>>,
}

/// Resolves template files across ordered roots
pub struct TemplateStore {
    client: reqwest::Client,
    archives: Mutex<HashMap<TemplateRoot, Arc<ArchiveFiles>>>,
}

impl TemplateStore {
    pub fn new(user_agent: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            archives: Mutex::new(HashMap::new()),
        }
    }

    /// Find `relative` in the first root that contains it.
    pub async fn find(
        &self,
        roots: &[TemplateRoot],
        relative: &str,
    ) -> Result<Option<(TemplateRoot, Vec<u8>)>> {
        for root in roots {
            if let Some(bytes) = self.read(root, relative).await? {
                return Ok(Some((root.clone(), bytes)));
            }
        }
        Ok(None)
    }

    /// Read one file from one root.
    pub async fn read(&self, root: &TemplateRoot, relative: &str) -> Result<Option<Vec<u8>>> {
        match root {
            TemplateRoot::Directory(dir) => {
                let path = dir.join(relative);
                match tokio::fs::read(&path).await {
                    Ok(bytes) => Ok(Some(bytes)),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                    Err(e) => {
                        Err(e).with_context(|| format!("Failed to read {}", path.display()))
                    }
                }
            }
            TemplateRoot::Archive(_) | TemplateRoot::Remote(_) => {
                let archive = self.archive(root).await?;
                Ok(archive.files.get(relative).cloned())
            }
        }
    }

    async fn archive(&self, root: &TemplateRoot) -> Result<Arc<ArchiveFiles>> {
        if let Some(cached) = self.cached(root) {
            return Ok(cached);
        }

        let zip_bytes = match root {
            TemplateRoot::Archive(path) => tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read template archive {}", path.display()))?,
            TemplateRoot::Remote(url) => {
                let response = self
                    .client
                    .get(url.clone())
                    .send()
                    .await
                    .with_context(|| format!("Failed to fetch template archive {}", url))?;

                if !response.status().is_success() {
                    anyhow::bail!(
                        "Failed to fetch template archive from {}: HTTP {}",
                        url,
                        response.status()
                    );
                }

                response.bytes().await?.to_vec()
            }
            TemplateRoot::Directory(dir) => {
                anyhow::bail!("{} is a directory, not an archive", dir.display())
            }
        };

        let prefix = root.archive_prefix().unwrap_or_default();
        let archive = Arc::new(extract_archive(&zip_bytes, &prefix)?);
        if let Ok(mut archives) = self.archives.lock() {
            archives.insert(root.clone(), archive.clone());
        }
        Ok(archive)
    }

    fn cached(&self, root: &TemplateRoot) -> Option<Arc<ArchiveFiles>> {
        self.archives.lock().ok()?.get(root).cloned()
    }
}

/// Extract a zip into memory, stripping `prefix` from entry paths
fn extract_archive(zip_bytes: &[u8], prefix: &str) -> Result<ArchiveFiles> {
    let mut archive =
        ZipArchive::new(Cursor::new(zip_bytes)).context("Failed to read template archive")?;
    let mut files = HashMap::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }

        let full_path = file.name().to_string();
        let relative_path = full_path
            .strip_prefix(prefix)
            .unwrap_or(&full_path)
            .to_string();

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        files.insert(relative_path, contents);
    }

    Ok(ArchiveFiles { files })
}

/// Relative path of `path` under `root`, with forward slashes
pub(crate) fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    Some(parts.join("/"))
}
