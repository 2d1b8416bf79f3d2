//! Phrasal Agent - content resolution engine
//!
//! Resolves learner queries into validated learning bundles with:
//! - Exact and fuzzy lookup against an [`ExpressionStore`]
//! - Bounded, validator-gated generation through a [`ContentGenerator`]
//! - Trait-based LLM backends (OpenAI-compatible, mock)
//! - Background persistence of accepted bundles
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           ResolutionEngine              │
//! │  (normalize → exact → fuzzy → generate) │
//! └──────┬──────────────┬───────────────┬───┘
//!        │              │               │
//!        ▼              ▼               ▼
//! ┌─────────────┐ ┌─────────────┐ ┌─────────────┐
//! │ Expression  │ │  Content    │ │   Bundle    │
//! │ Store       │ │  Generator  │ │  Validator  │
//! │ (Memory)    │ │ (Llm/Mock)  │ │ (core)      │
//! └─────────────┘ └──────┬──────┘ └─────────────┘
//!                        ▼
//!                 ┌─────────────┐
//!                 │ LlmBackend  │
//!                 │ (OpenAI/    │
//!                 │  Mock)      │
//!                 └─────────────┘
//! ```

pub mod backend;
pub mod config;
pub mod engine;
pub mod generator;
pub mod persist;
pub mod prompt;
pub mod store;

// Re-export main types for convenience
pub use backend::traits::{CompletionRequest, CompletionResponse, LlmBackend, LlmError};
pub use config::{ConfigError, EngineConfig};
pub use engine::{Resolution, ResolutionEngine};
pub use generator::{ContentGenerator, GenerationRequest, GeneratorError, LlmGenerator, MockGenerator};
pub use persist::PersistTask;
pub use store::{ExpressionStore, MemoryStore, StoreError};

pub use phrasal_core::{InputError, LearningBundle, ResolutionResult, SenseCandidate};
