//! Orchestration metadata shared by every task of a run

use super::config_store::ConfigStore;
use serde_json::{Map, Value};
use semver::Version;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Base of reproducible timestamps (2020-01-01T00:00:00Z)
const REPRODUCIBLE_EPOCH: u64 = 1_577_836_800;

/// Per-run configuration, parsed once before the run starts
///
/// Frozen behind an `Arc` inside [`Control`]; no phase can redefine it.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Output directory
    pub destination: PathBuf,
    /// Configured blueprint names; empty means "reuse the recorded ones"
    pub blueprints: Vec<String>,
    /// Disable blueprint version checks
    pub skip_checks: bool,
    /// Skip install-phase commands
    pub skip_install: bool,
    /// Deterministic timestamps
    pub reproducible: bool,
    /// Ask questions instead of taking defaults
    pub interactive: bool,
}

impl RunOptions {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            blueprints: Vec::new(),
            skip_checks: false,
            skip_install: false,
            reproducible: false,
            interactive: false,
        }
    }

    pub fn with_blueprints<I, S>(mut self, blueprints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blueprints = blueprints.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_skip_checks(mut self, skip: bool) -> Self {
        self.skip_checks = skip;
        self
    }

    pub fn with_skip_install(mut self, skip: bool) -> Self {
        self.skip_install = skip;
        self
    }

    pub fn with_reproducible(mut self, reproducible: bool) -> Self {
        self.reproducible = reproducible;
        self
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Apply `FORGE_SKIP_CHECKS` from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var("FORGE_SKIP_CHECKS") {
            self.skip_checks = matches!(value.as_str(), "1" | "true" | "yes");
        }
        self
    }
}

/// The `control` sub-store
#[derive(Debug)]
pub struct Control {
    options: Arc<RunOptions>,
    config: ConfigStore,
    old_version: Option<Version>,
    values: Map<String, Value>,
    timestamps_issued: u64,
}

impl Control {
    pub fn new(options: RunOptions, config: ConfigStore) -> Self {
        let old_version = recorded_version(&config);
        Self {
            options: Arc::new(options),
            config,
            old_version,
            values: Map::new(),
            timestamps_issued: 0,
        }
    }

    /// Install the options and freshly loaded config store of a new run
    /// over a reused state. Values set with [`Control::set`] carry over.
    pub(crate) fn begin_run(&mut self, options: RunOptions, config: ConfigStore) {
        self.options = Arc::new(options);
        self.config = config;
        self.old_version = recorded_version(&self.config);
        self.timestamps_issued = 0;
    }

    pub fn options(&self) -> &Arc<RunOptions> {
        &self.options
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.config
    }

    /// Host version recorded before this run, if the destination was generated before
    pub fn old_version(&self) -> Option<&Version> {
        self.old_version.as_ref()
    }

    /// Whether this run regenerates an existing destination
    pub fn is_regeneration(&self) -> bool {
        self.old_version.is_some()
    }

    /// Blueprint names for this run: the configured ones, else the recorded ones
    pub fn blueprint_names(&self) -> Vec<String> {
        if !self.options.blueprints.is_empty() {
            return self.options.blueprints.clone();
        }
        self.config
            .blueprints()
            .iter()
            .map(|record| record.name.clone())
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Unix timestamp in seconds; consecutive calls in reproducible runs
    /// yield a fixed sequence one second apart.
    pub fn next_timestamp(&mut self) -> u64 {
        let issued = self.timestamps_issued;
        self.timestamps_issued += 1;
        if self.options.reproducible {
            return REPRODUCIBLE_EPOCH + issued;
        }
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(REPRODUCIBLE_EPOCH)
    }
}

fn recorded_version(config: &ConfigStore) -> Option<Version> {
    config
        .generator_version()
        .and_then(|v| Version::parse(v).ok())
}
