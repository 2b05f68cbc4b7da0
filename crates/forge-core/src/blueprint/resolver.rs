//! Expanding a base generator into its blueprint instances

use super::catalog::BlueprintCatalog;
use super::name::{ensure_not_host, normalize_blueprint_name};
use super::version::{check_compatibility, Compatibility};
use crate::diagnostics::Diagnostic;
use crate::error::{GeneratorError, Result};
use crate::generator::{GeneratorInstance, Namespace};
use crate::host::{namespace_prefix, HostInfo};
use crate::state::BlueprintRecord;
use std::collections::BTreeSet;

/// One configured blueprint after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlueprintDescriptor {
    /// Normalized package name
    pub name: String,
    pub version: Option<String>,
    /// Declared host range, if any
    pub range: Option<String>,
    /// `None` when no range was declared
    pub compatibility: Option<Compatibility>,
}

impl BlueprintDescriptor {
    pub fn record(&self) -> BlueprintRecord {
        BlueprintRecord {
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }
}

/// A blueprint instantiated for one sub-command
#[derive(Debug, Clone)]
pub struct ResolvedBlueprint {
    pub descriptor: BlueprintDescriptor,
    pub instance: GeneratorInstance,
}

/// Output of [`BlueprintResolver::resolve`]
#[derive(Debug, Default)]
pub struct Resolution {
    /// In configured order
    pub blueprints: Vec<ResolvedBlueprint>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    /// Namespace and side-by-side flag of each instance
    pub fn identities(&self) -> Vec<(Namespace, bool)> {
        self.blueprints
            .iter()
            .map(|b| (b.instance.namespace().clone(), b.instance.is_side_by_side()))
            .collect()
    }

    pub fn into_instances(self) -> Vec<GeneratorInstance> {
        self.blueprints.into_iter().map(|b| b.instance).collect()
    }
}

pub struct BlueprintResolver<'a> {
    host: &'a HostInfo,
    catalog: &'a BlueprintCatalog,
    skip_checks: bool,
}

impl<'a> BlueprintResolver<'a> {
    pub fn new(host: &'a HostInfo, catalog: &'a BlueprintCatalog) -> Self {
        Self {
            host,
            catalog,
            skip_checks: false,
        }
    }

    /// Disable the host version gate
    pub fn skip_checks(mut self, skip: bool) -> Self {
        self.skip_checks = skip;
        self
    }

    /// Resolve `names` for `sub_command`, each instance augmenting `root`.
    pub fn resolve(
        &self,
        root: &GeneratorInstance,
        names: &[String],
        sub_command: &str,
    ) -> Result<Resolution> {
        let mut resolution = Resolution::default();
        let mut seen = BTreeSet::new();

        for raw in names {
            let name = normalize_blueprint_name(raw, self.host.package_name());
            if !seen.insert(name.clone()) {
                continue;
            }
            ensure_not_host(&name, self.host)?;

            let Some(package) = self.catalog.locate(&name)? else {
                self.soft(
                    &mut resolution,
                    Diagnostic::BlueprintNotFound {
                        blueprint: name.clone(),
                        sub_command: sub_command.to_string(),
                        reason: "package not found".to_string(),
                    },
                );
                continue;
            };

            let (range, compatibility) = self.version_gate(&name, &package, &mut resolution)?;

            let Some(generator) = package.generator(sub_command) else {
                self.soft(
                    &mut resolution,
                    Diagnostic::BlueprintNotFound {
                        blueprint: name.clone(),
                        sub_command: sub_command.to_string(),
                        reason: format!("package has no `{}` generator", sub_command),
                    },
                );
                continue;
            };

            let namespace = Namespace::from_parts(&namespace_prefix(&name), sub_command);
            let instance =
                GeneratorInstance::instantiate(namespace, generator.as_ref(), Some(root.as_augments()))?;
            tracing::debug!(
                blueprint = %name,
                namespace = %instance.namespace(),
                side_by_side = instance.is_side_by_side(),
                "resolved blueprint"
            );

            resolution.blueprints.push(ResolvedBlueprint {
                descriptor: BlueprintDescriptor {
                    name,
                    version: package.version().map(str::to_string),
                    range,
                    compatibility,
                },
                instance,
            });
        }

        Ok(resolution)
    }

    fn version_gate(
        &self,
        name: &str,
        package: &super::BlueprintPackage,
        resolution: &mut Resolution,
    ) -> Result<(Option<String>, Option<Compatibility>)> {
        let Some((_, range)) = package.manifest().host_range(self.host.package_name()) else {
            self.soft(
                resolution,
                Diagnostic::NoHostDependency {
                    blueprint: name.to_string(),
                },
            );
            return Ok((None, None));
        };

        let compatibility = check_compatibility(self.host.version(), range);
        match compatibility {
            Compatibility::Compatible => {}
            Compatibility::Incompatible if self.skip_checks => self.soft(
                resolution,
                Diagnostic::VersionCheckSkipped {
                    blueprint: name.to_string(),
                    range: range.to_string(),
                    host_version: self.host.version().to_string(),
                },
            ),
            Compatibility::Incompatible => {
                return Err(GeneratorError::BlueprintVersionMismatch {
                    blueprint: name.to_string(),
                    host_package: self.host.package_name().to_string(),
                    range: range.to_string(),
                    host_version: self.host.version().to_string(),
                    upgrade_command: self.host.upgrade_command().to_string(),
                })
            }
            Compatibility::Unparsable => self.soft(
                resolution,
                Diagnostic::UnparsableVersionRange {
                    blueprint: name.to_string(),
                    range: range.to_string(),
                },
            ),
        }
        Ok((Some(range.to_string()), Some(compatibility)))
    }

    fn soft(&self, resolution: &mut Resolution, diagnostic: Diagnostic) {
        diagnostic.emit();
        resolution.diagnostics.push(diagnostic);
    }
}
