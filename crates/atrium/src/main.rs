mod catalog; // Demo module catalog and delivery
mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use atrium_core::config::HostConfig;
use atrium_core::extension::StaticDiscovery;
use atrium_core::slots::{HostContext, SlotType};
use atrium_core::ui::{Props, Theme, View, THEME_DEPENDENCY};
use atrium_core::{Error, Host, HostBuilder, Result};
use clap::{CommandFactory, Parser, Subcommand};
use log::{error, info};

use crate::catalog::CatalogDelivery;

/// Atrium: extension host of the operations dashboard
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Simple ping command for testing
    #[arg(long)]
    ping: bool,

    /// Host configuration file (JSON, YAML or TOML). Uses the demo catalog when omitted.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect the module catalog
    Modules {
        #[command(subcommand)]
        command: ModulesCommand,
    },
    /// Resolve a module's main view and print it
    Load {
        /// The ID of the module to load
        module_id: String,
        /// Props passed to the main view, as a JSON object
        #[arg(long)]
        props: Option<String>,
    },
    /// Work with extension points
    Slot {
        #[command(subcommand)]
        command: SlotCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ModulesCommand {
    /// List known modules
    List {},
}

#[derive(Subcommand, Debug)]
enum SlotCommand {
    /// Render a slot once every pending load has finished
    Render {
        /// Slot name, e.g. context-panel
        slot: SlotType,
        /// Props passed to every widget, as a JSON object
        #[arg(long)]
        props: Option<String>,
        /// Role held by the current user
        #[arg(long = "role")]
        roles: Vec<String>,
        /// Current tenant
        #[arg(long)]
        tenant: Option<String>,
        /// Enabled feature flag
        #[arg(long = "flag")]
        flags: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if args.ping {
        println!("pong");
        return ExitCode::SUCCESS;
    }

    logging::init(args.verbose);

    let Some(command) = args.command else {
        if let Err(e) = CliArgs::command().print_help() {
            eprintln!("Error: {}", e);
        }
        return ExitCode::SUCCESS;
    };

    match run(args.config.as_deref(), command).await {
        Ok(code) => code,
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Option<&Path>, command: Commands) -> Result<ExitCode> {
    let context = match &command {
        Commands::Slot {
            command: SlotCommand::Render { roles, tenant, flags, .. },
        } => session_context(roles, tenant.as_deref(), flags),
        _ => HostContext::new(),
    };

    let mut host = start_host(config, context).await?;
    let outcome = match command {
        Commands::Modules {
            command: ModulesCommand::List {},
        } => {
            list_modules(&host);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Load { module_id, props } => load_module(&host, &module_id, props.as_deref()).await,
        Commands::Slot {
            command: SlotCommand::Render { slot, props, .. },
        } => render_slot(&host, slot, props.as_deref()).await,
    };
    host.shutdown().await?;
    outcome
}

async fn start_host(config: Option<&Path>, context: HostContext) -> Result<Host> {
    let builder = HostBuilder::new()
        .bundle_module(atrium_weather::MODULE_ID, atrium_weather::unit())
        .publish_instance(THEME_DEPENDENCY, catalog::THEME_VERSION, Arc::new(Theme::default()))?
        .delivery(CatalogDelivery::demo())
        .context(context);

    let builder = match config {
        Some(path) => builder.config(HostConfig::load(path).await?),
        None => {
            info!("No configuration given, using the demo catalog");
            builder.discovery(StaticDiscovery::new(catalog::demo_modules()))
        }
    };
    builder.start().await
}

fn session_context(roles: &[String], tenant: Option<&str>, flags: &[String]) -> HostContext {
    let mut context = HostContext::new();
    for role in roles {
        context = context.with_role(role);
    }
    if let Some(tenant) = tenant {
        context = context.with_tenant(tenant);
    }
    for flag in flags {
        context = context.with_feature_flag(flag);
    }
    context
}

fn parse_props(raw: Option<&str>) -> Result<Props> {
    match raw {
        None => Ok(Props::new()),
        Some(raw) => serde_json::from_str(raw).map_err(|e| Error::Other(format!("--props must be a JSON object: {}", e))),
    }
}

fn print_view(view: &View) -> Result<()> {
    let json = serde_json::to_string_pretty(view).map_err(|e| Error::Other(format!("cannot print view: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn list_modules(host: &Host) {
    let modules = host.modules().list_modules();
    if modules.is_empty() {
        println!("No modules registered.");
        return;
    }
    println!("Modules:");
    for module in modules {
        let origin = if module.is_local { "local" } else { "remote" };
        let slots: Vec<&str> = module.declared_slots.keys().map(SlotType::as_str).collect();
        println!(
            "  - {} ({}) [{}] slots: {}",
            module.id,
            module.display_name,
            origin,
            if slots.is_empty() { "-".to_string() } else { slots.join(", ") }
        );
    }
}

async fn load_module(host: &Host, module_id: &str, props: Option<&str>) -> Result<ExitCode> {
    let props = parse_props(props)?;
    match host.render_main(module_id, &props).await {
        Ok(view) => {
            print_view(&view)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e);
            if let Some(ids) = e.as_extension().map(|ext| ext.registered_ids()).filter(|ids| !ids.is_empty()) {
                eprintln!("Registered ids: {}", ids.join(", "));
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn render_slot(host: &Host, slot: SlotType, props: Option<&str>) -> Result<ExitCode> {
    let props = parse_props(props)?;
    // First pass mounts and starts loads, second pass shows the outcome.
    if host.render_slot(slot, &props).is_some() {
        host.settle().await;
    }
    match host.render_slot(slot, &props) {
        Some(view) => print_view(&view)?,
        None => println!("null"),
    }
    Ok(ExitCode::SUCCESS)
}
