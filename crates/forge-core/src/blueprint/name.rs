//! Blueprint package names
//!
//! Users may spell a blueprint as `foo`, `generator-forge-foo`, `@acme/foo`
//! or `@acme/generator-forge-foo`. All spellings resolve to one canonical
//! package name.

use crate::error::{GeneratorError, Result};
use crate::host::HostInfo;

/// Canonical package name of a blueprint for a host package
///
/// ```
/// use forge_core::blueprint::normalize_blueprint_name;
///
/// assert_eq!(normalize_blueprint_name("foo", "generator-forge"), "generator-forge-foo");
/// assert_eq!(normalize_blueprint_name("@acme/foo", "generator-forge"), "@acme/generator-forge-foo");
/// ```
pub fn normalize_blueprint_name(name: &str, host_package: &str) -> String {
    let name = name.trim();
    match name.strip_prefix('@') {
        Some(scoped) => match scoped.split_once('/') {
            Some((scope, package)) => {
                format!("@{}/{}", scope, prefixed(package, host_package))
            }
            None => format!("@{}/{}", scoped, host_package),
        },
        None => prefixed(name, host_package),
    }
}

fn prefixed(package: &str, host_package: &str) -> String {
    if package == host_package || package.starts_with(&format!("{}-", host_package)) {
        package.to_string()
    } else {
        format!("{}-{}", host_package, package)
    }
}

/// Reject a normalized name that is the host itself. Scoped packages
/// (`@acme/generator-forge`) are distinct packages and allowed.
pub fn ensure_not_host(normalized: &str, host: &HostInfo) -> Result<()> {
    if normalized == host.package_name() {
        return Err(GeneratorError::BlueprintDisallowed {
            name: normalized.to_string(),
        });
    }
    Ok(())
}
