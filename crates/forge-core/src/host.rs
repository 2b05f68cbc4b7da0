//! Host tool identity
//!
//! The host is the generator package blueprints extend. Its package name is
//! what blueprints declare a compatible range against, and its namespace
//! prefix names the built-in generators (`forge:app`).

use crate::blueprint::version::parse_version;
use anyhow::Result;
use semver::Version;

/// Configuration trait for a host product
///
/// A binary implements this to define:
/// - Package identity (name, version) used for blueprint checks
/// - Template source location and its env override
/// - The on-disk config store name
pub trait HostConfig: Clone + Send + Sync + 'static {
    /// Package name blueprints depend on (e.g. `generator-forge`)
    fn package_name(&self) -> &'static str;

    /// Human-readable display name
    fn display_name(&self) -> &'static str;

    /// Running version of the host
    fn version(&self) -> &'static str;

    /// Default location of the built-in generator templates
    fn default_template_url(&self) -> &'static str;

    /// Environment variable name for overriding the template location
    fn template_url_env(&self) -> &'static str;

    /// Upgrade/install command shown in version errors
    fn upgrade_command(&self) -> &'static str;

    /// Config store file at the destination root
    fn config_file_name(&self) -> &'static str {
        ".forge-config.json"
    }

    /// User agent string for HTTP requests
    fn user_agent(&self) -> &'static str {
        self.package_name()
    }
}

/// The built-in host
#[derive(Clone)]
pub struct ForgeHost;

impl HostConfig for ForgeHost {
    fn package_name(&self) -> &'static str {
        "generator-forge"
    }

    fn display_name(&self) -> &'static str {
        "Forge"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn default_template_url(&self) -> &'static str {
        "https://raw.githubusercontent.com/forge-dev/forge/main/templates"
    }

    fn template_url_env(&self) -> &'static str {
        "FORGE_TEMPLATE_URL"
    }

    fn upgrade_command(&self) -> &'static str {
        "cargo install forge-cli --force"
    }
}

/// Resolved host identity used during composition
#[derive(Debug, Clone)]
pub struct HostInfo {
    package_name: String,
    namespace_prefix: String,
    version: Version,
    config_file_name: String,
    user_agent: String,
    upgrade_command: String,
}

impl HostInfo {
    pub fn new(package_name: &str, version: &str) -> Result<Self> {
        Ok(Self {
            package_name: package_name.to_string(),
            namespace_prefix: namespace_prefix(package_name),
            version: parse_version(version)?,
            config_file_name: ".forge-config.json".to_string(),
            user_agent: package_name.to_string(),
            upgrade_command: ForgeHost.upgrade_command().to_string(),
        })
    }

    pub fn from_config<C: HostConfig>(config: &C) -> Result<Self> {
        let mut info = Self::new(config.package_name(), config.version())?;
        info.config_file_name = config.config_file_name().to_string();
        info.user_agent = config.user_agent().to_string();
        info.upgrade_command = config.upgrade_command().to_string();
        Ok(info)
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Namespace prefix of the host's own generators (`forge`)
    pub fn namespace_prefix(&self) -> &str {
        &self.namespace_prefix
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn config_file_name(&self) -> &str {
        &self.config_file_name
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Command suggested when a blueprint needs another host version
    pub fn upgrade_command(&self) -> &str {
        &self.upgrade_command
    }
}

/// Namespace prefix for a package: the last path segment without `generator-`
///
/// `generator-forge-foo` -> `forge-foo`, `@acme/generator-forge-foo` -> `@acme/forge-foo`
pub fn namespace_prefix(package_name: &str) -> String {
    match package_name.rsplit_once('/') {
        Some((scope, name)) => {
            format!("{}/{}", scope, name.strip_prefix("generator-").unwrap_or(name))
        }
        None => package_name
            .strip_prefix("generator-")
            .unwrap_or(package_name)
            .to_string(),
    }
}
