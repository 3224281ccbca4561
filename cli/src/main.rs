use std::{fs, path::PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};
use miette::{Context as _, IntoDiagnostic as _, Result};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, prelude::*};
use trimana_blueprints::{BuiltGraph, Environment, Plan};
use trimana_store::MemoryStore;

#[derive(Parser)]
#[command(name = "trimana")]
#[command(version)]
#[command(about = "Trimana infrastructure CLI")]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv, -vvvv).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the resource graphs and emit their engine documents.
    Render(RenderArgs),
    /// Build the resource graphs and print their digests.
    Check(CheckArgs),
}

#[derive(Args)]
struct RenderArgs {
    /// Deployment-environment configuration (JSON object of string values).
    #[arg(long = "env-file", value_name = "FILE")]
    env_file: PathBuf,

    /// Render a single blueprint instead of the whole plan.
    #[arg(long = "blueprint", value_name = "NAME")]
    blueprint: Option<String>,

    /// Write `<name>.template.json` files here instead of stdout.
    #[arg(long = "out", value_name = "DIR")]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct CheckArgs {
    /// Deployment-environment configuration (JSON object of string values).
    #[arg(long = "env-file", value_name = "FILE")]
    env_file: PathBuf,
}

fn main() -> Result<()> {
    miette::set_panic_hook();
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Command::Render(args) => render(args),
        Command::Check(args) => check(args),
    }
}

fn init_tracing(verbose: u8) -> Result<()> {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::try_from_default_env().into_diagnostic()?
    } else {
        let level = match verbose {
            0 => "error",
            1 => "warn",
            2 => "info",
            3 => "debug",
            _ => "trace",
        };
        EnvFilter::new(format!("error,trimana={level},trimana_={level}"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_fmt::layer())
        .with(ErrorLayer::default())
        .init();

    Ok(())
}

fn load_env(path: &PathBuf) -> Result<Environment> {
    let raw = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .into_diagnostic()
        .wrap_err_with(|| format!("{} is not a JSON object of strings", path.display()))
}

fn build_plan(env_file: &PathBuf) -> Result<Vec<BuiltGraph>> {
    let env = load_env(env_file)?;
    let graphs = Plan::standard().build(&env, &mut MemoryStore::new())?;
    Ok(graphs)
}

fn render(args: RenderArgs) -> Result<()> {
    let mut graphs = build_plan(&args.env_file)?;

    if let Some(name) = &args.blueprint {
        graphs.retain(|graph| graph.name == *name);
        if graphs.is_empty() {
            let known = Plan::standard().names().join(", ");
            return Err(miette::miette!(
                "unknown blueprint `{name}` (known: {known})"
            ));
        }
    }

    if let Some(dir) = &args.out {
        fs::create_dir_all(dir)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to create {}", dir.display()))?;
        for graph in &graphs {
            let path = dir.join(format!("{}.template.json", graph.name));
            let json =
                serde_json::to_string_pretty(&graph.template.to_document()).into_diagnostic()?;
            fs::write(&path, json)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            tracing::info!(blueprint = graph.name, path = %path.display(), "rendered");
        }
        return Ok(());
    }

    let mut doc = serde_json::Map::new();
    for graph in &graphs {
        doc.insert(graph.name.to_string(), graph.template.to_document());
    }
    let json = serde_json::to_string_pretty(&serde_json::Value::Object(doc)).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

fn check(args: CheckArgs) -> Result<()> {
    let graphs = build_plan(&args.env_file)?;
    for graph in &graphs {
        println!("{}\t{}", graph.name, graph.template.digest());
    }
    Ok(())
}
