//! Blueprint packages: naming, manifests, version gating, resolution and
//! the delegate/side-by-side protocol

pub mod catalog;
pub mod declarative;
pub mod manifest;
pub mod name;
pub mod negotiator;
pub mod resolver;
pub mod version;

pub use catalog::{BlueprintCatalog, BlueprintPackage};
pub use declarative::{DeclarativeGenerator, GeneratorManifest, TemplateFile};
pub use manifest::{PackageManifest, RangeSource};
pub use name::{ensure_not_host, normalize_blueprint_name};
pub use negotiator::{check_implements_expected_phases, negotiate, should_delegate, Negotiation};
pub use resolver::{BlueprintDescriptor, BlueprintResolver, Resolution, ResolvedBlueprint};
pub use version::{check_compatibility, Compatibility, NpmRange};
