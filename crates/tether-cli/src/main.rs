use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tether_core::app::{EngineBuilder, EngineConfig};
use tether_core::domain::{TaskId, TaskStatus, UserId};
use tether_core::impls::InMemoryTaskStore;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Task dependency graph engine")]
struct Cli {
    /// JSON engine config (defaults: in-memory store, tracing sink)
    #[arg(long, global = true, env = "TETHER_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk through add / cycle rejection / completion against the configured store
    Demo,

    /// Print the effective configuration
    CheckConfig,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tether_core=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Tasks: A waits on B, B waits on C, D waits on C.
/// C -> A is refused, then completing B frees A only.
async fn demo(config: EngineConfig) -> Result<()> {
    let tasks = InMemoryTaskStore::new();
    let [a, b, c, d] = std::array::from_fn(|_| TaskId::random());
    tasks.insert(a, TaskStatus::Todo, Some(UserId::random())).await;
    tasks.insert(b, TaskStatus::InProgress, Some(UserId::random())).await;
    tasks.insert(c, TaskStatus::Todo, None).await;
    tasks.insert(d, TaskStatus::Todo, Some(UserId::random())).await;
    for (name, id) in [("A", a), ("B", b), ("C", c), ("D", d)] {
        println!("{name} = {id}");
    }

    let app = EngineBuilder::new(config)
        .task_store(Arc::new(tasks.clone()))
        .build()?;
    let engine = &app.engine;

    for (from, to, label) in [(a, b, "A -> B"), (b, c, "B -> C"), (d, c, "D -> C"), (c, a, "C -> A")] {
        match engine.add_dependency(from, to).await {
            Ok(edge) => info!(edge = %edge.id, "add {label}: ok"),
            Err(err) => warn!(
                status = err.kind().http_status(),
                error = %err,
                "add {label}: refused"
            ),
        }
    }

    println!("A blocked: {}", engine.is_blocked(a).await?);
    let old = tasks.set_status(b, TaskStatus::Completed).await;
    let report = app
        .lifecycle
        .task_status_changed(b, old, TaskStatus::Completed)
        .await?;
    println!("B completed: {}", serde_json::to_string(&report)?);
    println!("A blocked: {}", engine.is_blocked(a).await?);
    println!(
        "D status: {}",
        serde_json::to_string(&engine.status(d).await?)?
    );

    if let Some(recorded) = &app.recorded {
        for n in recorded.sent().await {
            println!("notification -> {}: {}", n.recipient, n.message);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = load_config(cli.config.as_ref())?;
    match cli.command {
        Commands::Demo => demo(config).await,
        Commands::CheckConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
