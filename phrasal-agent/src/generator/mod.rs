//! Content generators.
//!
//! - [`LlmGenerator`]: prompts an [`crate::backend::LlmBackend`] for JSON
//! - [`MockGenerator`]: scripted replies

pub mod llm;
pub mod mock;
pub mod traits;

pub use llm::{extract_json, LlmGenerator};
pub use mock::MockGenerator;
pub use traits::{ContentGenerator, GenerationRequest, GeneratorError, PageBrief};
