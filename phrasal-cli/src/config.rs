//! Configuration for the Phrasal CLI
//!
//! CLI arguments and environment variable handling using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use phrasal_agent::EngineConfig;
use phrasal_core::BundleLayout;

/// Phrasal - resolve English expressions into learning bundles
#[derive(Parser, Debug, Clone)]
#[command(name = "phrasal")]
#[command(about = "Resolve English expressions into validated learning bundles")]
pub struct Args {
    /// Base URL of an OpenAI-compatible chat completions API
    #[arg(long, env = "GENERATOR_URL")]
    pub generator_url: Option<String>,

    /// Model name sent to the generator
    #[arg(long, env = "GENERATOR_MODEL", default_value = "gpt-4o-mini")]
    pub generator_model: String,

    /// Bearer token for the generator API
    #[arg(long, env = "GENERATOR_API_KEY", hide_env_values = true)]
    pub generator_api_key: Option<String>,

    /// Generator request timeout in seconds
    #[arg(long, env = "GENERATOR_TIMEOUT_SECS", default_value = "60")]
    pub generator_timeout_secs: u64,

    /// Run without a generator; anything not in the store resolves to invalid
    #[arg(long, env = "OFFLINE", default_value = "false")]
    pub offline: bool,

    /// JSON file holding stored bundles; written back after a run
    #[arg(long, env = "STORE_PATH")]
    pub store_path: Option<PathBuf>,

    /// YAML engine configuration
    #[arg(long, env = "PHRASAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Page layout, overriding the configuration file
    #[arg(long, env = "LAYOUT", value_enum)]
    pub layout: Option<LayoutArg>,

    /// Fixed RNG seed for slot allocation
    #[arg(long, env = "RNG_SEED")]
    pub seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Log format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "plain")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Resolve a query: store lookup, fuzzy candidates, then generation
    Resolve { input: String },

    /// Ask the generator to classify a query and generate when unambiguous
    Disambiguate { input: String },

    /// Generate content for a chosen sense
    Select {
        /// Expression to generate for
        #[arg(long)]
        phrase: String,
        /// Sense label the user picked
        #[arg(long)]
        sense: String,
        /// Domain tag of the sense
        #[arg(long, default_value = "general")]
        domain: String,
    },

    /// Validate a bundle JSON file
    Validate { file: PathBuf },

    /// Print diversity slots for the layout's pages
    Slots,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutArg {
    ThreeStep,
    SixStep,
}

impl LayoutArg {
    pub fn layout(self) -> BundleLayout {
        match self {
            LayoutArg::ThreeStep => BundleLayout::three_step(),
            LayoutArg::SixStep => BundleLayout::six_step(),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

impl Args {
    /// Whether the command needs a content generator.
    pub fn needs_generator(&self) -> bool {
        matches!(
            self.command,
            Command::Resolve { .. } | Command::Disambiguate { .. } | Command::Select { .. }
        )
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.needs_generator() && !self.offline && self.generator_url.is_none() {
            return Err("GENERATOR_URL is required unless --offline is set".to_string());
        }
        if self.generator_timeout_secs == 0 {
            return Err("GENERATOR_TIMEOUT_SECS must be positive".to_string());
        }
        Ok(())
    }

    /// Engine configuration from the YAML file (or defaults) with CLI overrides.
    pub fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };
        if let Some(layout) = self.layout {
            config.layout = layout.layout();
        }
        if let Some(seed) = self.seed {
            config.rng_seed = Some(seed);
        }
        config.validate()?;
        Ok(config)
    }
}
