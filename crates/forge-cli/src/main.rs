//! Forge CLI - Project generation with blueprint support

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use forge_core::blueprint::{check_compatibility, Compatibility};
use forge_core::prompts::DefaultsPrompter;
use forge_core::templates::{build_archive, build_archives};
use forge_core::{
    builtin, BlueprintCatalog, Environment, ForgeHost, HostConfig, HostInfo, RunOptions,
    TemplateLocation,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "forge")]
#[command(about = "Generate projects from built-in generators and blueprints")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a generator into a destination directory
    Generate(GenerateArgs),
    /// List blueprint packages found on the search paths
    Blueprints(BlueprintsArgs),
    /// Build zip archives of template directories (for development use)
    Pack(PackArgs),
}

#[derive(Parser, Debug, Default)]
pub struct GenerateArgs {
    /// Generator sub-command to run
    #[arg(default_value = "app")]
    pub sub_command: String,

    /// Blueprints to apply (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub blueprints: Vec<String>,

    /// Disable blueprint version checks
    #[arg(long = "skip-checks")]
    pub skip_checks: bool,

    /// Skip install commands
    #[arg(long = "skip-install")]
    pub skip_install: bool,

    /// Destination directory
    #[arg(short, long, default_value = ".")]
    pub destination: PathBuf,

    /// Local directory to use for built-in templates instead of fetching from remote (for development use)
    #[arg(long = "template-dir")]
    pub template_dir: Option<PathBuf>,

    /// Directories holding blueprint packages
    #[arg(long = "blueprint-path")]
    pub blueprint_paths: Vec<PathBuf>,

    /// Take defaults for every question (non-interactive mode)
    #[arg(short, long)]
    pub yes: bool,

    /// Deterministic timestamps
    #[arg(long)]
    pub reproducible: bool,
}

#[derive(Parser, Debug)]
pub struct BlueprintsArgs {
    /// Directories holding blueprint packages
    #[arg(long = "blueprint-path", default_value = "node_modules")]
    pub blueprint_paths: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct PackArgs {
    /// Template directory; each sub-directory becomes one archive
    #[arg(long = "template-dir", default_value = "templates")]
    pub template_dir: PathBuf,

    /// Output directory for the archives
    #[arg(short, long, default_value = "dist")]
    pub output: PathBuf,

    /// Pack `template-dir` itself as one archive with this name
    #[arg(long)]
    pub name: Option<String>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("FORGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn catalog(paths: &[PathBuf]) -> BlueprintCatalog {
    paths
        .iter()
        .fold(BlueprintCatalog::new(), |catalog, path| catalog.with_search_path(path))
}

async fn generate(args: GenerateArgs) -> Result<()> {
    let config = ForgeHost;
    let host = HostInfo::from_config(&config)?;
    let location = match &args.template_dir {
        Some(dir) => TemplateLocation::local(dir.clone()),
        None => TemplateLocation::from_config(&config)?,
    };
    let interactive = !args.yes && console::Term::stdout().is_term();
    tracing::debug!(?location, interactive, "building environment");

    let mut builder = Environment::builder(host)
        .generators(builtin::registry(&location)?)
        .catalog(catalog(&args.blueprint_paths));
    builder = if interactive {
        builder.prompter(Arc::new(forge_core::TerminalPrompter))
    } else {
        builder.prompter(Arc::new(DefaultsPrompter::new()))
    };
    let env = builder.build();

    let options = RunOptions::new(&args.destination)
        .with_blueprints(args.blueprints)
        .with_skip_checks(args.skip_checks)
        .with_skip_install(args.skip_install)
        .with_reproducible(args.reproducible)
        .with_interactive(interactive)
        .with_env_overrides();

    if interactive {
        cliclack::intro(config.display_name())?;
    }

    let report = env.run(&args.sub_command, options).await?;

    for diagnostic in report.warnings() {
        eprintln!("{} {}", "warning:".yellow().bold(), diagnostic);
    }
    let summary = format!(
        "{} tasks run, {} files written",
        report.executed.len(),
        report.files_written
    );
    if interactive {
        cliclack::outro(summary)?;
    } else {
        println!("{}", summary.dimmed());
    }
    Ok(())
}

fn list_blueprints(args: BlueprintsArgs) -> Result<()> {
    let host = HostInfo::from_config(&ForgeHost)?;
    let packages = catalog(&args.blueprint_paths).discover()?;
    if packages.is_empty() {
        println!("{}", "No blueprint packages found".dimmed());
        return Ok(());
    }

    for package in packages {
        let version = package.version().unwrap_or("-");
        let status = match package.manifest().host_range(host.package_name()) {
            None => format!("no {} dependency", host.package_name()).yellow(),
            Some((_, range)) => match check_compatibility(host.version(), range) {
                Compatibility::Compatible => format!("compatible ({})", range).green(),
                Compatibility::Incompatible => format!("requires {}", range).red(),
                Compatibility::Unparsable => format!("unchecked ({})", range).yellow(),
            },
        };
        let generators: Vec<_> = package.sub_commands().collect();
        println!(
            "{} {} {} [{}]",
            package.name().bold(),
            version.dimmed(),
            status,
            generators.join(", ")
        );
    }
    Ok(())
}

fn pack(args: PackArgs) -> Result<()> {
    match args.name {
        Some(name) => {
            let bytes = build_archive(&args.template_dir, &name)?;
            std::fs::create_dir_all(&args.output)
                .with_context(|| format!("Failed to create {}", args.output.display()))?;
            let path = args.output.join(format!("{}.zip", name));
            std::fs::write(&path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} {} ({} bytes)", "Built".green(), path.display(), bytes.len());
        }
        None => {
            for (name, size) in build_archives(&args.template_dir, &args.output)? {
                println!("{} {}.zip ({} bytes)", "Built".green(), name, size);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    // Handle Ctrl+C gracefully
    ctrlc::set_handler(move || {
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(130);
    })
    .ok();

    init_logging();
    let args = Args::parse();

    let result = match args.command {
        Some(Command::Generate(generate_args)) => generate(generate_args).await,
        Some(Command::Blueprints(list_args)) => list_blueprints(list_args),
        Some(Command::Pack(pack_args)) => pack(pack_args),
        None => {
            generate(GenerateArgs {
                sub_command: "app".to_string(),
                destination: PathBuf::from("."),
                ..Default::default()
            })
            .await
        }
    };

    // Ensure cursor is visible on normal exit
    let _ = console::Term::stderr().show_cursor();

    if let Err(e) = &result {
        if let Some(failure) = e.downcast_ref::<forge_core::GeneratorError>() {
            if let Some((phase, namespace)) = failure.failed_at() {
                eprintln!("{} {} in {}", "Failed:".red().bold(), namespace, phase);
            }
        }
    }
    result
}
