//! Page layouts: which pages a bundle has and how long each story may be.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Sentence-count rule for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PageSpec {
    /// Page key (e.g. `step1`)
    pub key: String,
    /// Minimum sentences, inclusive
    pub min_sentences: usize,
    /// Maximum sentences, inclusive
    pub max_sentences: usize,
    /// Reason code to report instead of `story_sentence_count_invalid_<key>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_reason: Option<String>,
}

impl PageSpec {
    pub fn new(key: impl Into<String>, min_sentences: usize, max_sentences: usize) -> Self {
        Self {
            key: key.into(),
            min_sentences,
            max_sentences,
            count_reason: None,
        }
    }

    pub fn with_count_reason(mut self, reason: impl Into<String>) -> Self {
        self.count_reason = Some(reason.into());
        self
    }

    pub fn accepts(&self, sentences: usize) -> bool {
        (self.min_sentences..=self.max_sentences).contains(&sentences)
    }

    /// Human-readable range, used in prompts.
    pub fn describe_range(&self) -> String {
        if self.min_sentences == self.max_sentences {
            match self.min_sentences {
                1 => "exactly 1 sentence".to_string(),
                n => format!("exactly {} sentences", n),
            }
        } else {
            format!("{}-{} sentences", self.min_sentences, self.max_sentences)
        }
    }
}

/// Ordered set of pages for a product variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct BundleLayout {
    pub pages: Vec<PageSpec>,
}

impl Default for BundleLayout {
    fn default() -> Self {
        Self::three_step()
    }
}

impl BundleLayout {
    /// Intro sentence, short scene, longer scene.
    pub fn three_step() -> Self {
        Self {
            pages: vec![
                PageSpec::new("step1", 1, 1).with_count_reason("step1_sentence_count_invalid"),
                PageSpec::new("step2", 2, 3),
                PageSpec::new("step3", 3, 4),
            ],
        }
    }

    pub fn six_step() -> Self {
        let mut pages =
            vec![PageSpec::new("step1", 1, 1).with_count_reason("step1_sentence_count_invalid")];
        for n in 2..=5 {
            pages.push(PageSpec::new(format!("step{}", n), 2, 3));
        }
        pages.push(PageSpec::new("step6", 3, 4));
        Self { pages }
    }

    pub fn keys(&self) -> Vec<String> {
        self.pages.iter().map(|p| p.key.clone()).collect()
    }

    pub fn page(&self, key: &str) -> Option<&PageSpec> {
        self.pages.iter().find(|p| p.key == key)
    }

    /// Check the layout is usable.
    pub fn check(&self) -> Result<(), String> {
        if self.pages.is_empty() {
            return Err("layout has no pages".to_string());
        }
        for (i, page) in self.pages.iter().enumerate() {
            if page.key.trim().is_empty() {
                return Err(format!("page {} has an empty key", i + 1));
            }
            if page.min_sentences > page.max_sentences {
                return Err(format!(
                    "page {} has min_sentences {} above max_sentences {}",
                    page.key, page.min_sentences, page.max_sentences
                ));
            }
            if self.pages[..i].iter().any(|p| p.key == page.key) {
                return Err(format!("duplicate page key {}", page.key));
            }
        }
        Ok(())
    }
}
