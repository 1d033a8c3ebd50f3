use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wallbox_core::{
    build_debug_registry, build_registry, BridgeConfig, MysqlStore, PosixQueue, RedisStore,
    Registry, Wallbox,
};

mod publisher;

#[derive(Debug, Parser)]
#[command(name = "wallbox-bridge")]
#[command(about = "Wallbox charger state as home-automation entities")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, global = true)]
    redis_url: Option<String>,

    #[arg(long, global = true)]
    mysql_url: Option<String>,

    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    #[arg(long, global = true)]
    queue_timeout_ms: Option<u64>,

    #[arg(long, global = true)]
    store_timeout_ms: Option<u64>,

    /// Also expose raw internal state codes.
    #[arg(long, global = true)]
    debug_entities: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    Identity,
    Entities,
    Once {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    Run,
    Set {
        entity: String,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

impl Cli {
    fn config(&self) -> BridgeConfig {
        let defaults = BridgeConfig::default();
        BridgeConfig {
            redis_url: self.redis_url.clone().unwrap_or(defaults.redis_url),
            mysql_url: self.mysql_url.clone().unwrap_or(defaults.mysql_url),
            poll_interval: self
                .interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            queue_send_timeout: self
                .queue_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.queue_send_timeout),
            store_timeout: self
                .store_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
            debug_entities: self.debug_entities || defaults.debug_entities,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    let kv = RedisStore::connect(&config.redis_url).await?;
    let db = Arc::new(MysqlStore::connect(&config.mysql_url)?);
    let queue = PosixQueue::new(config.queue_send_timeout);
    let wallbox = Wallbox::connect(
        Arc::new(kv),
        db.clone(),
        Arc::new(queue),
        config.store_timeout,
    )
    .await
    .context("failed to read charger identity")?;
    let wallbox = Arc::new(wallbox);

    let mut registry = build_registry(&wallbox);
    if config.debug_entities {
        registry.extend(build_debug_registry());
    }

    let outcome = execute(cli.command, &config, wallbox, Arc::new(registry)).await;
    db.close().await?;
    outcome
}

async fn execute(
    command: Command,
    config: &BridgeConfig,
    wallbox: Arc<Wallbox>,
    registry: Arc<Registry>,
) -> Result<()> {
    match command {
        Command::Identity => {
            println!("{}", serde_json::to_string_pretty(wallbox.info())?);
        }
        Command::Entities => {
            println!("{}", serde_json::to_string_pretty(&registry.descriptors())?);
        }
        Command::Once { format } => {
            wallbox.refresh().await?;
            print_values(&wallbox, &registry, format)?;
        }
        Command::Run => {
            info!(
                entities = registry.len(),
                interval_ms = %config.poll_interval.as_millis(),
                "publishing"
            );
            publisher::run_publisher(wallbox, registry, config.poll_interval).await?;
        }
        Command::Set { entity, value } => {
            registry
                .set(&wallbox, &entity, &value)
                .await
                .with_context(|| format!("failed to set {entity}"))?;
            let snapshot = wallbox.refresh().await?;
            if let Some(current) = registry.get(&entity) {
                println!("{entity} = {}", current.read(&snapshot));
            }
        }
    }

    Ok(())
}

fn print_values(wallbox: &Wallbox, registry: &Registry, format: OutputFormat) -> Result<()> {
    let snapshot = wallbox.snapshot();
    let values = registry.values(&snapshot);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&values)?);
        }
        OutputFormat::Human => {
            let info = wallbox.info();
            println!("=== Wallbox {} ({}) ===", info.serial_number, info.variant.as_str());
            if let Some(ts) = snapshot.refreshed_at {
                println!("Refreshed: {}", ts.to_rfc3339());
            }
            for entity in registry.iter() {
                let name = entity.metadata().get("name").unwrap_or(entity.id());
                let unit = entity
                    .metadata()
                    .get("unit_of_measurement")
                    .unwrap_or("");
                println!("  {name:<28} {} {unit}", values[entity.id()]);
            }
        }
    }

    Ok(())
}
