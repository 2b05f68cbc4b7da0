//! The run environment
//!
//! An [`Environment`] owns everything that outlives a single run: the host
//! identity, the built-in generators, the blueprint catalog, the template
//! engine and the run states keyed by destination. [`Environment::run`]
//! checks out the destination's state, composes the requested generator and
//! drives the scheduler to completion.

use crate::blueprint::BlueprintCatalog;
use crate::error::Result;
use crate::fs::MemFs;
use crate::generator::GeneratorRegistry;
use crate::host::HostInfo;
use crate::install::CommandRunner;
use crate::prompts::{DefaultsPrompter, Prompter};
use crate::scheduler::{RunReport, Scheduler};
use crate::state::{RunKey, RunOptions, SharedRunState, StateRegistry};
use crate::templates::{PlaceholderRenderer, TemplateEngine, TemplateRenderer, TemplateStore};
use std::sync::Arc;
use std::time::Duration;

/// Shared services handed to every task
pub struct Services {
    pub(crate) host: HostInfo,
    pub(crate) generators: GeneratorRegistry,
    pub(crate) catalog: BlueprintCatalog,
    pub(crate) templates: TemplateEngine,
    pub(crate) prompter: Arc<dyn Prompter>,
    pub(crate) commands: CommandRunner,
}

impl Services {
    pub fn host(&self) -> &HostInfo {
        &self.host
    }

    pub fn generators(&self) -> &GeneratorRegistry {
        &self.generators
    }

    pub fn catalog(&self) -> &BlueprintCatalog {
        &self.catalog
    }

    pub fn templates(&self) -> &TemplateEngine {
        &self.templates
    }

    pub fn commands(&self) -> &CommandRunner {
        &self.commands
    }
}

pub struct Environment {
    services: Arc<Services>,
    states: StateRegistry,
}

impl Environment {
    pub fn builder(host: HostInfo) -> EnvironmentBuilder {
        EnvironmentBuilder::new(host)
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    pub fn states(&self) -> &StateRegistry {
        &self.states
    }

    /// Generate `sub_command` into `options.destination`.
    ///
    /// The destination's state is returned to the registry whether or not
    /// the run succeeds. A later run for the same destination keeps its
    /// `control` values but reloads the config store from disk and starts
    /// with empty `source`, `application` and `entities`.
    pub async fn run(&self, sub_command: &str, options: RunOptions) -> Result<RunReport> {
        let key = RunKey::for_destination(&options.destination);
        let config_file = self.services.host.config_file_name().to_string();
        let mut state = self.states.checkout(&key, || {
            SharedRunState::load(options.clone(), &config_file)
        })?;
        if let Err(e) = state.begin_run(options.clone(), &config_file) {
            self.states.checkin(state);
            return Err(e);
        }
        tracing::info!(
            run = %key,
            generator = sub_command,
            destination = %options.destination.display(),
            "starting run"
        );

        let result = self.drive(sub_command, &options, &mut state).await;
        self.states.checkin(state);
        result
    }

    async fn drive(
        &self,
        sub_command: &str,
        options: &RunOptions,
        state: &mut SharedRunState,
    ) -> Result<RunReport> {
        let mut fs = MemFs::new(options.destination.clone());
        let mut scheduler = Scheduler::new(self.services.clone());
        scheduler.compose_root(sub_command, state)?;
        scheduler.run(state, &mut fs).await
    }
}

pub struct EnvironmentBuilder {
    host: HostInfo,
    generators: GeneratorRegistry,
    catalog: BlueprintCatalog,
    store: Option<TemplateStore>,
    renderer: Arc<dyn TemplateRenderer>,
    prompter: Arc<dyn Prompter>,
    commands: CommandRunner,
}

impl EnvironmentBuilder {
    pub fn new(host: HostInfo) -> Self {
        Self {
            host,
            generators: GeneratorRegistry::new(),
            catalog: BlueprintCatalog::new(),
            store: None,
            renderer: Arc::new(PlaceholderRenderer),
            prompter: Arc::new(DefaultsPrompter::new()),
            commands: CommandRunner::default(),
        }
    }

    pub fn generators(mut self, generators: GeneratorRegistry) -> Self {
        self.generators = generators;
        self
    }

    pub fn catalog(mut self, catalog: BlueprintCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn template_store(mut self, store: TemplateStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.commands = CommandRunner::new(timeout);
        self
    }

    pub fn build(self) -> Environment {
        let store = self
            .store
            .unwrap_or_else(|| TemplateStore::new(self.host.user_agent()));
        let services = Services {
            templates: TemplateEngine::new(store, self.renderer),
            host: self.host,
            generators: self.generators,
            catalog: self.catalog,
            prompter: self.prompter,
            commands: self.commands,
        };
        Environment {
            services: Arc::new(services),
            states: StateRegistry::new(),
        }
    }
}
