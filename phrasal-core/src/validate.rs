//! Bundle validation.
//!
//! Rules run in a fixed order and stop at the first failure, so a bundle that
//! breaks several rules always reports the same reason:
//!
//! 1. every page, in layout order: story present, then sentence count in range
//! 2. pairwise story similarity below the threshold
//! 3. meaning block present with all six fields
//! 4. selection metadata present with all three fields

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::layout::BundleLayout;
use crate::text::{jaccard_sets, sentence_count, tokenize};
use crate::types::{LearningBundle, MeaningField, PageKey, SelectionField};

/// Stories more similar than this are rejected.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.62;

/// Why a bundle was rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ReasonCode {
    MissingStory {
        page: PageKey,
    },
    SentenceCountInvalid {
        page: PageKey,
        count: usize,
        /// Literal reason configured for this page, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        literal: Option<String>,
    },
    StoriesTooSimilar {
        first: PageKey,
        second: PageKey,
        similarity: f64,
    },
    MeaningMissing,
    MeaningFieldMissing {
        #[serde(serialize_with = "serialize_meaning_field")]
        field: MeaningField,
    },
    SelectionMetaMissing,
    SelectionMetaFieldMissing {
        #[serde(serialize_with = "serialize_selection_field")]
        field: SelectionField,
    },
}

impl ReasonCode {
    /// Stable reason string callers and tests match on.
    pub fn code(&self) -> String {
        match self {
            ReasonCode::MissingStory { page } => format!("missing_story_{}", page),
            ReasonCode::SentenceCountInvalid { page, literal, .. } => literal
                .clone()
                .unwrap_or_else(|| format!("story_sentence_count_invalid_{}", page)),
            ReasonCode::StoriesTooSimilar { .. } => "stories_too_similar".to_string(),
            ReasonCode::MeaningMissing => "meaning_missing".to_string(),
            ReasonCode::MeaningFieldMissing { field } => format!("meaning_{}_missing", field.as_str()),
            ReasonCode::SelectionMetaMissing => "selection_meta_missing".to_string(),
            ReasonCode::SelectionMetaFieldMissing { field } => {
                format!("selection_meta_{}_missing", field.as_str())
            }
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

fn serialize_meaning_field<S: serde::Serializer>(
    field: &MeaningField,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(field.as_str())
}

fn serialize_selection_field<S: serde::Serializer>(
    field: &SelectionField,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(field.as_str())
}

/// Outcome of [`BundleValidator::validate`].
///
/// Serializes as `{"valid": true}` or `{"valid": false, "reason": "<code>", "detail": {..}}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Valid,
    Invalid { reason: ReasonCode },
}

impl Serialize for Validation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        match self {
            Validation::Valid => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("valid", &true)?;
                map.end()
            }
            Validation::Invalid { reason } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("valid", &false)?;
                map.serialize_entry("reason", &reason.code())?;
                map.serialize_entry("detail", reason)?;
                map.end()
            }
        }
    }
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }

    pub fn reason(&self) -> Option<&ReasonCode> {
        match self {
            Validation::Valid => None,
            Validation::Invalid { reason } => Some(reason),
        }
    }

    /// Reason as a code string, if invalid.
    pub fn code(&self) -> Option<String> {
        self.reason().map(ReasonCode::code)
    }
}

/// Validates bundles against a page layout.
#[derive(Debug, Clone)]
pub struct BundleValidator {
    layout: BundleLayout,
    similarity_threshold: f64,
}

impl Default for BundleValidator {
    fn default() -> Self {
        Self::new(BundleLayout::default())
    }
}

impl BundleValidator {
    pub fn new(layout: BundleLayout) -> Self {
        Self {
            layout,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn layout(&self) -> &BundleLayout {
        &self.layout
    }

    /// Run all rules in order and report the first failure.
    pub fn validate(&self, bundle: &LearningBundle) -> Validation {
        match self.first_failure(bundle) {
            Some(reason) => Validation::Invalid { reason },
            None => Validation::Valid,
        }
    }

    fn first_failure(&self, bundle: &LearningBundle) -> Option<ReasonCode> {
        self.check_pages(bundle)
            .or_else(|| self.check_similarity(bundle))
            .or_else(|| check_meaning(bundle))
            .or_else(|| check_selection(bundle))
    }

    fn check_pages(&self, bundle: &LearningBundle) -> Option<ReasonCode> {
        for spec in &self.layout.pages {
            let story = bundle.pages.get(&spec.key).map(|p| p.story.trim()).unwrap_or("");
            if story.is_empty() {
                return Some(ReasonCode::MissingStory {
                    page: spec.key.clone(),
                });
            }

            let count = sentence_count(story);
            if !spec.accepts(count) {
                return Some(ReasonCode::SentenceCountInvalid {
                    page: spec.key.clone(),
                    count,
                    literal: spec.count_reason.clone(),
                });
            }
        }
        None
    }

    fn check_similarity(&self, bundle: &LearningBundle) -> Option<ReasonCode> {
        let tokens: Vec<(&str, HashSet<String>)> = self
            .layout
            .pages
            .iter()
            .filter_map(|spec| {
                bundle
                    .pages
                    .get(&spec.key)
                    .map(|p| (spec.key.as_str(), tokenize(&p.story)))
            })
            .collect();

        for (i, (first, a)) in tokens.iter().enumerate() {
            for (second, b) in &tokens[i + 1..] {
                let similarity = jaccard_sets(a, b);
                if similarity > self.similarity_threshold {
                    return Some(ReasonCode::StoriesTooSimilar {
                        first: first.to_string(),
                        second: second.to_string(),
                        similarity,
                    });
                }
            }
        }
        None
    }
}

fn check_meaning(bundle: &LearningBundle) -> Option<ReasonCode> {
    let Some(meaning) = &bundle.meaning else {
        return Some(ReasonCode::MeaningMissing);
    };
    MeaningField::ORDER
        .into_iter()
        .find(|f| meaning.field(*f).trim().is_empty())
        .map(|field| ReasonCode::MeaningFieldMissing { field })
}

fn check_selection(bundle: &LearningBundle) -> Option<ReasonCode> {
    let Some(meta) = &bundle.selection_meta else {
        return Some(ReasonCode::SelectionMetaMissing);
    };
    SelectionField::ORDER
        .into_iter()
        .find(|f| meta.field(*f).trim().is_empty())
        .map(|field| ReasonCode::SelectionMetaFieldMissing { field })
}
