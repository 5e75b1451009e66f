//! Devboy
//!
//! Scaffolds route handlers for serverless-style HTTP APIs, serves them
//! locally and validates the route registry before deployment.

mod config;
mod features;

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use devboy_types::Method;
use tracing::{error, info};

use crate::config::Settings;
use crate::features::deploy::{self, DeployError, PlanBackend};
use crate::features::dispatch::{DispatchTable, ProcessLoader};
use crate::features::prompt::Prompter;
use crate::features::registry::RegistryStore;
use crate::features::routes::scaffold::Scaffolded;
use crate::features::routes::{session, FunctionSelection, NewRoute, Registrar};

/// Devboy CLI for managing serverless API projects
#[derive(Parser)]
#[command(name = "devboy")]
#[command(version)]
#[command(about = "Devboy CLI for managing serverless API projects", long_about = None)]
struct Cli {
    /// Project root holding devboy.config.json (defaults to DEVBOY_PROJECT_DIR or the current directory)
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new API route (prompts for the details when --path and --method are omitted)
    #[command(name = "new-route", alias = "new:route")]
    NewRoute {
        /// Route path, e.g. /users/get_profile
        #[arg(long, requires = "method")]
        path: Option<String>,

        /// HTTP method
        #[arg(long, value_enum, ignore_case = true, requires = "path")]
        method: Option<CliMethod>,

        /// Attach the route to an existing function
        #[arg(long, conflicts_with = "new_function", requires = "path")]
        function: Option<String>,

        /// Create a new function for the route
        #[arg(long, requires = "path")]
        new_function: Option<String>,
    },
    /// Start the Devboy development server
    Start {
        /// Port to listen on (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Deploy the Devboy application
    Deploy,
    /// List registered routes by function
    Routes,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl From<CliMethod> for Method {
    fn from(method: CliMethod) -> Self {
        match method {
            CliMethod::Get => Method::Get,
            CliMethod::Post => Method::Post,
            CliMethod::Put => Method::Put,
            CliMethod::Delete => Method::Delete,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env()?;
    if let Some(dir) = cli.project_dir {
        settings.project_dir = dir;
    }

    match cli.command {
        Commands::NewRoute {
            path,
            method,
            function,
            new_function,
        } => match (path, method) {
            (Some(path), Some(method)) => {
                let selection = match (function, new_function) {
                    (_, Some(name)) => FunctionSelection::New(name),
                    (Some(name), None) => FunctionSelection::Existing(name),
                    (None, None) => FunctionSelection::Default,
                };
                new_route(
                    &settings,
                    NewRoute {
                        path,
                        method: method.into(),
                        function: selection,
                    },
                )
            }
            _ => new_route_interactive(&settings),
        },
        Commands::Start { port } => {
            if let Some(port) = port {
                settings.port = port;
            }
            start(&settings).await
        }
        Commands::Deploy => run_deploy(&settings),
        Commands::Routes => list_routes(&settings),
    }
}

fn new_route(settings: &Settings, req: NewRoute) -> Result<()> {
    let store = RegistryStore::new(settings.registry_path());
    let registrar = Registrar::new(store.clone(), &settings.project_dir);
    let registry = store.load()?;

    let added = match registrar.add_route(&registry, &req) {
        Ok(added) => added,
        Err(err) if err.is_recoverable() => {
            error!("{err}");
            bail!("route was not created, please enter a different route or function name")
        }
        Err(err) => return Err(err.into()),
    };

    if added.scaffolded == Scaffolded::AlreadyPresent {
        info!(handler = %added.route.handler_path, "kept existing handler file");
    }
    info!(
        registry = %registrar.store().path().display(),
        "route {} created successfully and added to {} function",
        added.route.path, added.function
    );
    if added.created_function {
        info!(
            functions = added.registry.functions().count(),
            "new function {} registered",
            added.function
        );
    }
    Ok(())
}

fn new_route_interactive(settings: &Settings) -> Result<()> {
    let store = RegistryStore::new(settings.registry_path());
    let registrar = Registrar::new(store.clone(), &settings.project_dir);
    let registry = store.load()?;

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());
    let created = session::run(&mut prompter, &registrar, registry)?;
    info!(created, registry = %store.path().display(), "route session finished");
    Ok(())
}

async fn start(settings: &Settings) -> Result<()> {
    info!("starting devboy development server");
    let registry = RegistryStore::new(settings.registry_path()).load()?;
    let loader = ProcessLoader::new(&settings.project_dir, &settings.runtime);
    let table = DispatchTable::build(&registry, &loader)?;
    features::server::serve(&settings.listen_addr(), table).await
}

fn run_deploy(settings: &Settings) -> Result<()> {
    let registry = RegistryStore::new(settings.registry_path()).load()?;

    match deploy::deploy(&registry, &settings.project_dir, &PlanBackend) {
        Ok(()) => {
            info!("deployment completed successfully");
            Ok(())
        }
        Err(DeployError::Blocked(violations)) => {
            error!("deployment failed, please fix the following errors:");
            for violation in &violations {
                error!("- {violation}");
            }
            bail!("deployment blocked by {} missing handler(s)", violations.len())
        }
        Err(err) => Err(err.into()),
    }
}

fn list_routes(settings: &Settings) -> Result<()> {
    let registry = RegistryStore::new(settings.registry_path()).load()?;
    for (name, function) in registry.functions() {
        println!("{name} ({})", function.handler_path);
        if function.routes.is_empty() {
            println!("  (no routes)");
        }
        for route in &function.routes {
            println!("  {:<6} {} -> {}", route.method.as_str(), route.path, route.handler_path);
        }
    }
    Ok(())
}
