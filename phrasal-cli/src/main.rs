//! Phrasal CLI
//!
//! Runs the resolution engine against a JSON-file store and an
//! OpenAI-compatible generator. Results are printed to stdout as JSON; logs go
//! to stderr. Input errors exit with status 2, invalid bundles in `validate`
//! with status 1.

mod config;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use phrasal_agent::backend::OpenAiBackend;
use phrasal_agent::{
    ContentGenerator, EngineConfig, InputError, LlmGenerator, MemoryStore, MockGenerator, Resolution,
    ResolutionEngine,
};
use phrasal_core::{sanitize_candidates, BundleValidator, LearningBundle};

use config::{Args, Command, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(&args);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let config = args.engine_config()?;
    debug!(layout = ?config.layout.keys(), max_attempts = config.max_attempts, "Engine configured");

    match &args.command {
        Command::Validate { file } => {
            let valid = validate_file(file, &config)?;
            if !valid {
                std::process::exit(1);
            }
        }
        Command::Slots => {
            let mut rng = match config.rng_seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            print_json(&slots_json(&config, &mut rng))?;
        }
        Command::Resolve { input } => {
            let (engine, store) = build_engine(&args, config).await?;
            let outcome = engine.resolve_tracked(input).await;
            finish(outcome, &store, args.store_path.as_deref()).await?;
        }
        Command::Disambiguate { input } => {
            let (engine, store) = build_engine(&args, config).await?;
            let outcome = engine.disambiguate_tracked(input).await;
            finish(outcome, &store, args.store_path.as_deref()).await?;
        }
        Command::Select { phrase, sense, domain } => {
            let (engine, store) = build_engine(&args, config).await?;
            let candidate = sanitize_candidates(&json!([{
                "id": "1", "phrase": phrase, "senseLabel": sense, "domains": [domain]
            }]))
            .into_iter()
            .next();
            let outcome = match candidate {
                Some(candidate) => engine.resolve_selection_tracked(&candidate).await,
                None => Err(InputError::Empty),
            };
            finish(outcome, &store, args.store_path.as_deref()).await?;
        }
    }

    Ok(())
}

fn init_tracing(args: &Args) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            format!("phrasal={0},phrasal_agent={0},warn", args.log_level).into()
        });

    let registry = tracing_subscriber::registry().with(filter);
    match args.log_format {
        LogFormat::Plain => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

async fn build_engine(args: &Args, config: EngineConfig) -> anyhow::Result<(ResolutionEngine, Arc<MemoryStore>)> {
    let store = Arc::new(open_store(args.store_path.as_deref()).await?);
    let engine = ResolutionEngine::new(store.clone(), build_generator(args)?).with_config(config)?;
    Ok((engine, store))
}

fn build_generator(args: &Args) -> anyhow::Result<Arc<dyn ContentGenerator>> {
    match (&args.generator_url, args.offline) {
        (Some(url), false) => {
            let backend = OpenAiBackend::new(
                url.clone(),
                args.generator_model.clone(),
                args.generator_api_key.clone(),
                Duration::from_secs(args.generator_timeout_secs),
            )?;
            info!(url = %url, model = %args.generator_model, "Using OpenAI-compatible generator");
            Ok(Arc::new(LlmGenerator::new(Arc::new(backend))))
        }
        _ => {
            info!("Offline: generation disabled");
            Ok(Arc::new(MockGenerator::new()))
        }
    }
}

async fn open_store(path: Option<&Path>) -> anyhow::Result<MemoryStore> {
    match path {
        Some(path) => MemoryStore::load(path)
            .await
            .with_context(|| format!("loading store from {}", path.display())),
        None => Ok(MemoryStore::new()),
    }
}

/// Print the result, wait for any persist and write the store back.
///
/// Input errors exit with status 2.
async fn finish(
    outcome: Result<Resolution, InputError>,
    store: &MemoryStore,
    store_path: Option<&Path>,
) -> anyhow::Result<()> {
    let resolution = match outcome {
        Ok(resolution) => resolution,
        Err(e) => {
            eprintln!("{}", json!({ "error": e.to_string() }));
            std::process::exit(2);
        }
    };
    print_json(&resolution.result)?;

    if let Some(task) = resolution.persist {
        if task.wait().await {
            if let Some(path) = store_path {
                store
                    .save(path)
                    .await
                    .with_context(|| format!("saving store to {}", path.display()))?;
                info!(path = %path.display(), bundles = store.len(), "Store saved");
            }
        }
    }
    Ok(())
}

fn validate_file(file: &Path, config: &EngineConfig) -> anyhow::Result<bool> {
    let content =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let bundle: LearningBundle =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", file.display()))?;

    let validation = BundleValidator::new(config.layout.clone())
        .with_similarity_threshold(config.similarity_threshold)
        .validate(&bundle);
    print_json(&validation)?;
    Ok(validation.is_valid())
}

/// Slots as a JSON array in page order, one `{key, topic, mood, setting}` per page.
fn slots_json(config: &EngineConfig, rng: &mut StdRng) -> serde_json::Value {
    config
        .slot_pools
        .allocate(&config.layout.keys(), rng)
        .into_iter()
        .map(|(key, slot)| {
            json!({ "key": key, "topic": slot.topic, "mood": slot.mood, "setting": slot.setting })
        })
        .collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
