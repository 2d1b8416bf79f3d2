//! Phrasal Core - shared content rules
//!
//! Pure, I/O-free pieces of the content resolution pipeline. The server engine
//! (`phrasal-agent`) and the browser client (`phrasal-wasm`) both link this crate,
//! so a bundle accepted on one side is accepted on the other.
//!
//! - [`SlotPools`]: per-page (topic, mood, setting) diversity slots
//! - [`sanitize_candidates`]: untrusted candidate lists into well-formed senses
//! - [`BundleValidator`]: ordered structural and similarity checks
//! - [`assemble_bundle`]: untrusted generator JSON into a [`LearningBundle`]
//! - [`normalize_input`]: query trimming, casing and length limits
//!
//! # Example
//!
//! ```
//! use phrasal_core::{BundleValidator, LearningBundle};
//!
//! let validator = BundleValidator::default();
//! let result = validator.validate(&LearningBundle::default());
//! assert_eq!(result.code().as_deref(), Some("missing_story_step1"));
//! ```

pub mod assemble;
pub mod input;
pub mod layout;
pub mod result;
pub mod sanitize;
pub mod slots;
pub mod text;
pub mod types;
pub mod validate;

// Re-export main types
pub use assemble::assemble_bundle;
pub use input::{normalize_input, InputError, MAX_INPUT_CHARS};
pub use layout::{BundleLayout, PageSpec};
pub use result::{DisambiguationResponse, ResolutionResult};
pub use sanitize::{sanitize_candidates, MAX_CANDIDATES};
pub use slots::SlotPools;
pub use text::{jaccard, sentence_count, tokenize};
pub use types::*;
pub use validate::{BundleValidator, ReasonCode, Validation, DEFAULT_SIMILARITY_THRESHOLD};
