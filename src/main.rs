use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use llm_layered_cache::cache::{ExactMatchCache, LayeredCache, LlmCache, SemanticCache};
use llm_layered_cache::config::CacheSettings;
use llm_layered_cache::embedding::GeminiEmbedder;
use llm_layered_cache::invoke::{speedup, CachedModel, TimedResponse};
use llm_layered_cache::llm::GeminiModel;
use llm_layered_cache::store::RedisStore;
use llm_layered_cache::vector::FlatVectorIndex;

type L1 = ExactMatchCache<Arc<RedisStore>>;
type L2 = SemanticCache<FlatVectorIndex<Arc<RedisStore>>, GeminiEmbedder>;
type Cache = LayeredCache<L1, L2>;

/// Log filter used when RUST_LOG is unset
const DEFAULT_LOG_FILTER: &str = "llm_layered_cache=info";

const DEMO_PROMPT: &str = "What is the capital city of France?";
const DEMO_PARAPHRASE: &str = "CAN YOU TELL ME THE CAPITAL CITY OF FRANCE?";

#[derive(Parser)]
#[command(name = "llm-layered-cache")]
#[command(about = "Two-level (exact + semantic) LLM response cache", long_about = None)]
struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the exact-match / semantic-match timing scenario
    Demo,

    /// Answer a single prompt through the cache
    Ask {
        /// Prompt to send
        prompt: String,
    },

    /// Remove every entry from both cache layers
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG may come from the env file, so load it before logging starts
    load_env(cli.env_file.as_deref())?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(log_filter()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = CacheSettings::from_env()?;
    let cached = build(&settings).await?;

    match cli.command {
        Commands::Demo => run_demo(&cached).await?,
        Commands::Ask { prompt } => {
            let response = cached.invoke(&prompt).await?;
            print_response(&response);
        }
        Commands::Clear => {
            cached.cache().clear().await?;
            println!(
                "Cleared '{}' and '{}'",
                settings.l1.prefix, settings.l2.prefix
            );
        }
    }

    Ok(())
}

fn load_env(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenv::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }
    Ok(())
}

fn log_filter() -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into())
}

async fn build(settings: &CacheSettings) -> Result<CachedModel<GeminiModel, Cache>> {
    let api_key = settings.require_api_key()?.to_string();

    let store = Arc::new(
        RedisStore::connect(&settings.redis_url)
            .await
            .context("failed to connect to the cache store")?,
    );

    let l1 = ExactMatchCache::new(store.clone(), settings.l1.clone());
    let embedder = GeminiEmbedder::new(api_key.clone(), settings.embedding_model.clone())?;
    let l2 = SemanticCache::with_store(
        store,
        embedder,
        settings.l2.clone(),
        settings.distance_metric,
        settings.distance_threshold,
    );

    let model = GeminiModel::new(api_key, settings.model.clone())?;
    Ok(CachedModel::new(model, LayeredCache::new(l1, l2)))
}

async fn run_demo(cached: &CachedModel<GeminiModel, Cache>) -> Result<()> {
    println!("Executing first time...");
    let first = cached.invoke(DEMO_PROMPT).await?;
    print_response(&first);

    println!("\nExecuting second time (exact match - should hit L1)...");
    let second = cached.invoke(DEMO_PROMPT).await?;
    print_response(&second);

    println!("\nExecuting third time (semantic similarity - should hit L2, then promote to L1)...");
    let third = cached.invoke(DEMO_PARAPHRASE).await?;
    print_response(&third);

    println!(
        "\nL1 speedup: {:.2}x faster",
        speedup(first.elapsed, second.elapsed)
    );
    println!(
        "L2 speedup: {:.2}x faster",
        speedup(first.elapsed, third.elapsed)
    );
    println!("\n{}", cached.cache().stats());

    Ok(())
}

fn print_response(response: &TimedResponse) {
    println!("{}", response.text());
    println!(
        "Time taken: {:.3} seconds{}",
        response.elapsed.as_secs_f64(),
        if response.from_cache { " (cached)" } else { "" }
    );
}
