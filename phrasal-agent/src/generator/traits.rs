//! Content generator contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use phrasal_core::{BundleLayout, DiversitySlot, Domain, PageSpec, SlotPools};

use crate::backend::LlmError;

/// Error types for generation.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Underlying LLM call failed
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Output could not be read as JSON
    #[error("Malformed output: {0}")]
    Malformed(String),

    /// Generator is not reachable
    #[error("Generator unavailable: {0}")]
    Unavailable(String),
}

/// One page of a generation request: its sentence rule and its diversity slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageBrief {
    pub spec: PageSpec,
    pub slot: DiversitySlot,
}

/// Everything the generator needs for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Normalized expression
    pub expression: String,
    /// Chosen sense, when the user picked one
    pub sense_label: Option<String>,
    pub domain: Domain,
    /// Pages in layout order
    pub pages: Vec<PageBrief>,
}

impl GenerationRequest {
    /// Build a request with freshly allocated slots for every layout page.
    pub fn new<R: rand::Rng + ?Sized>(
        expression: impl Into<String>,
        layout: &BundleLayout,
        pools: &SlotPools,
        rng: &mut R,
    ) -> Self {
        let keys = layout.keys();
        let slots = pools.allocate(&keys, rng);
        let pages = layout
            .pages
            .iter()
            .cloned()
            .zip(slots)
            .map(|(spec, (_, slot))| PageBrief { spec, slot })
            .collect();

        Self {
            expression: expression.into(),
            sense_label: None,
            domain: Domain::General,
            pages,
        }
    }

    pub fn with_sense(mut self, sense_label: impl Into<String>, domain: Domain) -> Self {
        self.sense_label = Some(sense_label.into());
        self.domain = domain;
        self
    }
}

/// Source of new content.
///
/// Output is untrusted JSON; callers assemble and validate it.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Produce raw bundle JSON for one attempt.
    async fn generate_bundle(&self, request: &GenerationRequest) -> Result<Value, GeneratorError>;

    /// Ask for a disambiguation response (`status` of `invalid`, `needs_selection` or `ready`).
    async fn disambiguate(&self, input: &str) -> Result<Value, GeneratorError>;
}
