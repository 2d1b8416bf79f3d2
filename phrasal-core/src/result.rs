//! Resolution outcomes and the generator's disambiguation shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sanitize::{coerce_string, sanitize_candidates, MAX_CANDIDATES};
use crate::types::{Domain, LearningBundle, SelectionMeta, SenseCandidate};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Terminal outcome of one resolution.
///
/// Serialized with a `status` discriminator of `ready`, `needs_selection` or
/// `invalid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionResult {
    /// Content is available
    #[serde(rename_all = "camelCase")]
    Ready {
        expression: String,
        bundle: LearningBundle,
    },
    /// Input is ambiguous; the user must pick a sense
    #[serde(rename_all = "camelCase")]
    NeedsSelection {
        normalized_input: String,
        candidates: Vec<SenseCandidate>,
    },
    /// No usable content could be produced
    #[serde(rename_all = "camelCase")]
    Invalid {
        reason_message: String,
        retry_hint: String,
    },
}

impl ResolutionResult {
    pub fn ready(bundle: LearningBundle) -> Self {
        ResolutionResult::Ready {
            expression: bundle.expression.clone(),
            bundle,
        }
    }

    /// Candidates beyond [`MAX_CANDIDATES`] are dropped. Callers must not pass an
    /// empty list.
    pub fn needs_selection(normalized_input: impl Into<String>, mut candidates: Vec<SenseCandidate>) -> Self {
        debug_assert!(!candidates.is_empty(), "needs_selection requires candidates");
        candidates.truncate(MAX_CANDIDATES);
        ResolutionResult::NeedsSelection {
            normalized_input: normalized_input.into(),
            candidates,
        }
    }

    pub fn invalid(reason_message: impl Into<String>, retry_hint: impl Into<String>) -> Self {
        ResolutionResult::Invalid {
            reason_message: reason_message.into(),
            retry_hint: retry_hint.into(),
        }
    }

    /// Wire discriminator.
    pub fn status(&self) -> &'static str {
        match self {
            ResolutionResult::Ready { .. } => "ready",
            ResolutionResult::NeedsSelection { .. } => "needs_selection",
            ResolutionResult::Invalid { .. } => "invalid",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ResolutionResult::Ready { .. })
    }

    pub fn bundle(&self) -> Option<&LearningBundle> {
        match self {
            ResolutionResult::Ready { bundle, .. } => Some(bundle),
            _ => None,
        }
    }

    pub fn candidates(&self) -> &[SenseCandidate] {
        match self {
            ResolutionResult::NeedsSelection { candidates, .. } => candidates,
            _ => &[],
        }
    }
}

/// What the generator answered when asked to disambiguate a query.
///
/// Decided by the response's `status` field only.
#[derive(Debug, Clone, PartialEq)]
pub enum DisambiguationResponse {
    Invalid {
        reason_message: String,
        retry_hint: String,
    },
    /// Candidates are already sanitized and may be empty
    NeedsSelection { candidates: Vec<SenseCandidate> },
    /// The generator picked a sense and produced raw bundle content for it
    Ready { selection: SelectionMeta, bundle: Value },
    /// Missing or unknown status
    Unrecognized { status: String },
}

impl DisambiguationResponse {
    pub fn from_value(raw: &Value) -> Self {
        let field = |camel: &str, snake: &str| raw.get(camel).or_else(|| raw.get(snake));
        let status = coerce_string(raw.get("status")).to_lowercase();

        match status.as_str() {
            "invalid" => DisambiguationResponse::Invalid {
                reason_message: coerce_string(field("reasonMessage", "reason_message")),
                retry_hint: coerce_string(field("retryHint", "retry_hint")),
            },
            "needs_selection" => DisambiguationResponse::NeedsSelection {
                candidates: sanitize_candidates(raw.get("candidates").unwrap_or(&Value::Null)),
            },
            "ready" => {
                let selected = raw.get("selected").unwrap_or(&Value::Null);
                let selection = SelectionMeta {
                    selected_phrase: coerce_string(selected.get("phrase")),
                    selected_sense_label: coerce_string(
                        selected.get("senseLabel").or_else(|| selected.get("sense_label")),
                    ),
                    selected_domain: Domain::parse(&coerce_string(selected.get("domain")))
                        .as_str()
                        .to_string(),
                };
                let bundle = raw.get("bundle").cloned().unwrap_or_else(|| raw.clone());
                DisambiguationResponse::Ready { selection, bundle }
            }
            _ => DisambiguationResponse::Unrecognized { status },
        }
    }
}
