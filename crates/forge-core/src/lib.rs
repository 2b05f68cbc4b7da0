//! Forge Core - Phase scheduler and blueprint composition for project generators
//!
//! A run composes generator modules into one shared run queue and executes
//! their tasks phase by phase against a single shared state per destination.
//! Blueprint packages extend or replace the built-in generators without
//! forking them.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! - **Layer 1: Core Types** - Phases and their order, tasks, generator instances, the shared run state
//! - **Layer 2: Composition** - Blueprint naming, version gating, resolution and delegate/side-by-side negotiation
//! - **Layer 3: Execution** - The scheduler, task contexts, the in-memory file store and template rendering
//! - **Layer 4: Environment** - Host identity, built-in generators and interactive prompts (feature-gated)
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables the cliclack-based terminal prompter
//!
//! # Example Usage
//!
//! ```ignore
//! use forge_core::{builtin, Environment, ForgeHost, HostInfo, RunOptions, TemplateLocation};
//!
//! let host = HostInfo::from_config(&ForgeHost)?;
//! let location = TemplateLocation::from_config(&ForgeHost)?;
//! let env = Environment::builder(host)
//!     .generators(builtin::registry(&location)?)
//!     .build();
//!
//! let options = RunOptions::new("./my-app").with_blueprints(["foo"]);
//! let report = env.run("app", options).await?;
//! ```

pub mod blueprint;
pub mod builtin;
pub mod diagnostics;
pub mod environment;
pub mod error;
pub mod fs;
pub mod generator;
pub mod host;
pub mod install;
pub mod phase;
pub mod prompts;
pub mod scheduler;
pub mod state;
pub mod templates;

// Re-export main types for convenience
pub use blueprint::{BlueprintCatalog, BlueprintPackage, BlueprintResolver};
pub use diagnostics::Diagnostic;
pub use environment::{Environment, EnvironmentBuilder, Services};
pub use error::{GeneratorError, Result};
pub use fs::MemFs;
pub use generator::{Generator, GeneratorInstance, GeneratorRegistry, Namespace, Task, TaskRegistry};
pub use host::{ForgeHost, HostConfig, HostInfo};
pub use phase::{Phase, PhaseRegistry};
pub use prompts::{DefaultsPrompter, Prompter, Question};
pub use scheduler::{EntityContext, RunReport, Scheduler, TaskContext};
pub use state::{RunOptions, SharedRunState};
pub use templates::{TemplateLocation, TemplateRoot};

#[cfg(feature = "tui")]
pub use prompts::TerminalPrompter;
