use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_cache::cache::{CacheKeyBuilder, CacheLayer, RedisStore, Resource};
use storefront_cache::invalidation::{plan_for, Action, EntityRef, Mutation, SubCollection};
use storefront_cache::{CacheConfig, RedisClient, RedisConfig};

#[derive(Parser)]
#[command(name = "storefront-cache")]
#[command(about = "Inspect and invalidate the storefront cache", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check Redis connectivity
    Health {
        /// Retry and fall back to PING on failure
        #[arg(long)]
        retry: bool,
    },

    /// Show the current version of a collection
    Version {
        /// Collection name, e.g. "orders:byClient"
        collection: String,
    },

    /// Increment the version of a collection
    Bump {
        /// Collection name, e.g. "clients"
        collection: String,
    },

    /// Print the invalidation plan for a mutation without applying it
    Plan(MutationArgs),

    /// Apply the invalidation plan for a mutation
    Invalidate(MutationArgs),
}

#[derive(Args)]
struct MutationArgs {
    /// Mutated resource (client, order, coupon, profile)
    resource: Resource,

    /// What happened (added, updated, deleted)
    action: Action,

    /// Id of the mutated entity
    id: i64,

    /// Embedded sub-collections changed by a client mutation
    #[arg(short, long)]
    touch: Vec<SubCollection>,

    /// Related entities to evict, as resource:id
    #[arg(short, long)]
    evict: Vec<EntityRef>,
}

impl MutationArgs {
    fn to_mutation(&self) -> Mutation {
        let mutation = self
            .touch
            .iter()
            .fold(Mutation::new(self.resource, self.action, self.id), |m, sub| {
                m.touching(*sub)
            });
        self.evict
            .iter()
            .fold(mutation, |m, r| m.evicting(r.resource, r.id))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "storefront_cache=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let cache_config = CacheConfig::from_env()?;

    match cli.command {
        Commands::Health { retry } => {
            let client = RedisClient::connect(RedisConfig::from_env()?).await?;
            let result = if retry {
                client.health_check_with_retry().await
            } else {
                client.health_check_detailed().await
            };

            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.status.is_operational() {
                bail!("Redis is {:?}", result.status);
            }
        }

        Commands::Version { ref collection } => {
            let layer = connect_layer(cache_config).await?;
            let version = layer.versions().try_get_version(collection).await?;
            println!("{} = {}", collection, version);
        }

        Commands::Bump { ref collection } => {
            let layer = connect_layer(cache_config).await?;
            let version = layer.versions().bump(collection).await?;
            println!("{} bumped to {}", collection, version);
        }

        Commands::Plan(ref args) => {
            let keys = CacheKeyBuilder::new(cache_config.max_page_size);
            let plan = plan_for(&keys, &args.to_mutation());
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }

        Commands::Invalidate(ref args) => {
            let layer = connect_layer(cache_config).await?;
            let plan = layer.coordinator().plan_for(&args.to_mutation());
            let report = layer.coordinator().apply(&plan).await;

            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_complete() {
                bail!("{} invalidation steps failed", report.failures.len());
            }
        }
    }

    Ok(())
}

async fn connect_layer(cache_config: CacheConfig) -> Result<CacheLayer> {
    let client = RedisClient::connect(RedisConfig::from_env()?).await?;
    Ok(CacheLayer::new(
        Arc::new(RedisStore::from_client(&client)),
        cache_config,
    ))
}
