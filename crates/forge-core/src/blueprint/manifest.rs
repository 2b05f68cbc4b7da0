//! Blueprint package manifests (`package.json`)

use crate::error::{GeneratorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const MANIFEST_FILE: &str = "package.json";

/// Manifest fields consulted during blueprint resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub engines: BTreeMap<String, String>,
}

/// Manifest field a host range was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSource {
    Engines,
    Dependencies,
    PeerDependencies,
}

impl PackageManifest {
    /// Load `<dir>/package.json`. `None` when the directory has no manifest.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MANIFEST_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| GeneratorError::manifest(path, e))
    }

    /// Manifest with a name and version, for in-process packages
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            version: Some(version.into()),
            ..Default::default()
        }
    }

    /// Declare a dependency on `package`
    pub fn with_dependency(mut self, package: impl Into<String>, range: impl Into<String>) -> Self {
        self.dependencies.insert(package.into(), range.into());
        self
    }

    pub fn with_peer_dependency(
        mut self,
        package: impl Into<String>,
        range: impl Into<String>,
    ) -> Self {
        self.peer_dependencies.insert(package.into(), range.into());
        self
    }

    pub fn with_engine(mut self, package: impl Into<String>, range: impl Into<String>) -> Self {
        self.engines.insert(package.into(), range.into());
        self
    }

    /// Range declared for the host package, checked in order:
    /// `engines`, `dependencies`, `peerDependencies`.
    pub fn host_range(&self, host_package: &str) -> Option<(RangeSource, &str)> {
        [
            (RangeSource::Engines, &self.engines),
            (RangeSource::Dependencies, &self.dependencies),
            (RangeSource::PeerDependencies, &self.peer_dependencies),
        ]
        .into_iter()
        .find_map(|(source, table)| table.get(host_package).map(|r| (source, r.as_str())))
    }
}
