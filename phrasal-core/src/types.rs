//! Bundle data model shared by the server and the client.
//!
//! Field names serialize in camelCase to match the wire shape the client renders.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Key identifying a page within a bundle (e.g. `step1`).
pub type PageKey = String;

/// Subject domain a sense belongs to.
///
/// Closed set. Anything unrecognized collapses to [`Domain::General`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Domain {
    #[default]
    General,
    Tech,
    Art,
    Business,
    Science,
    Daily,
}

impl Domain {
    /// All domains, in declaration order.
    pub const ALL: [Domain; 6] = [
        Domain::General,
        Domain::Tech,
        Domain::Art,
        Domain::Business,
        Domain::Science,
        Domain::Daily,
    ];

    /// Wire tag for this domain.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::General => "general",
            Domain::Tech => "tech",
            Domain::Art => "art",
            Domain::Business => "business",
            Domain::Science => "science",
            Domain::Daily => "daily",
        }
    }

    /// Normalize a free-form tag. Unknown values map to `General`.
    pub fn parse(tag: &str) -> Self {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(tag))
            .unwrap_or_default()
    }
}

impl From<String> for Domain {
    fn from(tag: String) -> Self {
        Domain::parse(&tag)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of the narrative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase", default)]
pub struct Page {
    /// Example story text
    pub story: String,
    /// Topic the story was steered toward
    pub topic_tag: String,
    /// Mood the story was steered toward
    pub mood_tag: String,
}

impl Page {
    pub fn new(story: impl Into<String>) -> Self {
        Self {
            story: story.into(),
            ..Default::default()
        }
    }

    pub fn with_tags(mut self, topic: impl Into<String>, mood: impl Into<String>) -> Self {
        self.topic_tag = topic.into();
        self.mood_tag = mood.into();
        self
    }
}

/// Ordered page mapping.
///
/// Serialized as a JSON object whose key order is the page order. Inserting an
/// existing key replaces the page in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pages(Vec<(PageKey, Page)>);

impl Pages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<PageKey>, page: Page) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = page,
            None => self.0.push((key, page)),
        }
    }

    pub fn with(mut self, key: impl Into<PageKey>, page: Page) -> Self {
        self.insert(key, page);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Page> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, p)| p)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Page)> {
        self.0.iter().map(|(k, p)| (k.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(PageKey, Page)> for Pages {
    fn from_iter<I: IntoIterator<Item = (PageKey, Page)>>(iter: I) -> Self {
        let mut pages = Pages::new();
        for (key, page) in iter {
            pages.insert(key, page);
        }
        pages
    }
}

impl Serialize for Pages {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, page) in &self.0 {
            map.serialize_entry(key, page)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Pages {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PagesVisitor;

        impl<'de> Visitor<'de> for PagesVisitor {
            type Value = Pages;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of page key to page")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Pages, A::Error> {
                let mut pages = Pages::new();
                while let Some((key, page)) = access.next_entry::<PageKey, Page>()? {
                    pages.insert(key, page);
                }
                Ok(pages)
            }
        }

        deserializer.deserialize_map(PagesVisitor)
    }
}

/// Fields of the meaning block, in validation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeaningField {
    LiteralMeaning,
    RealUsage,
    Etymology,
    Nuance,
    ExampleTarget,
    ExampleNative,
}

impl MeaningField {
    pub const ORDER: [MeaningField; 6] = [
        MeaningField::LiteralMeaning,
        MeaningField::RealUsage,
        MeaningField::Etymology,
        MeaningField::Nuance,
        MeaningField::ExampleTarget,
        MeaningField::ExampleNative,
    ];

    /// Snake-case name used in reason codes.
    pub fn as_str(&self) -> &'static str {
        match self {
            MeaningField::LiteralMeaning => "literal_meaning",
            MeaningField::RealUsage => "real_usage",
            MeaningField::Etymology => "etymology",
            MeaningField::Nuance => "nuance",
            MeaningField::ExampleTarget => "example_target",
            MeaningField::ExampleNative => "example_native",
        }
    }
}

/// Descriptive block explaining the expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase", default)]
pub struct MeaningBlock {
    /// Word-by-word meaning
    pub literal_meaning: String,
    /// How the phrase is actually used
    pub real_usage: String,
    /// Where the phrase comes from
    pub etymology: String,
    /// Register, tone and connotation
    pub nuance: String,
    /// Short example in English
    pub example_target: String,
    /// Short example in the learner's language
    pub example_native: String,
}

impl MeaningBlock {
    pub fn field(&self, field: MeaningField) -> &str {
        match field {
            MeaningField::LiteralMeaning => &self.literal_meaning,
            MeaningField::RealUsage => &self.real_usage,
            MeaningField::Etymology => &self.etymology,
            MeaningField::Nuance => &self.nuance,
            MeaningField::ExampleTarget => &self.example_target,
            MeaningField::ExampleNative => &self.example_native,
        }
    }
}

/// Fields of the selection metadata, in validation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionField {
    SelectedPhrase,
    SelectedSenseLabel,
    SelectedDomain,
}

impl SelectionField {
    pub const ORDER: [SelectionField; 3] = [
        SelectionField::SelectedPhrase,
        SelectionField::SelectedSenseLabel,
        SelectionField::SelectedDomain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionField::SelectedPhrase => "selected_phrase",
            SelectionField::SelectedSenseLabel => "selected_sense_label",
            SelectionField::SelectedDomain => "selected_domain",
        }
    }
}

/// The disambiguation a bundle was generated against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionMeta {
    pub selected_phrase: String,
    pub selected_sense_label: String,
    /// Domain tag as received; see [`SelectionMeta::domain`]
    pub selected_domain: String,
}

impl SelectionMeta {
    pub fn new(phrase: impl Into<String>, sense_label: impl Into<String>, domain: Domain) -> Self {
        Self {
            selected_phrase: phrase.into(),
            selected_sense_label: sense_label.into(),
            selected_domain: domain.as_str().to_string(),
        }
    }

    pub fn field(&self, field: SelectionField) -> &str {
        match field {
            SelectionField::SelectedPhrase => &self.selected_phrase,
            SelectionField::SelectedSenseLabel => &self.selected_sense_label,
            SelectionField::SelectedDomain => &self.selected_domain,
        }
    }

    /// Normalized domain.
    pub fn domain(&self) -> Domain {
        Domain::parse(&self.selected_domain)
    }
}

/// Full multi-page content for one resolved expression sense.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct LearningBundle {
    /// Canonical (normalized) phrase
    pub expression: String,
    /// Pages in display order
    #[serde(default)]
    #[cfg_attr(feature = "typescript", ts(type = "Record<string, Page>"))]
    pub pages: Pages,
    /// Meaning block; absent when the source omitted it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meaning: Option<MeaningBlock>,
    /// Disambiguation metadata; absent when the source omitted it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_meta: Option<SelectionMeta>,
}

/// A (topic, mood, setting) triple steering one page's generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct DiversitySlot {
    pub topic: String,
    pub mood: String,
    pub setting: String,
}

/// One disambiguation option.
///
/// Only produced by [`crate::sanitize::sanitize_candidates`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct SenseCandidate {
    pub id: String,
    pub phrase: String,
    pub sense_label: String,
    pub short_hint: String,
    /// Never empty
    pub domains: Vec<Domain>,
}

impl SenseCandidate {
    /// First listed domain.
    pub fn primary_domain(&self) -> Domain {
        self.domains.first().copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_parse_is_lenient() {
        assert_eq!(Domain::parse("tech"), Domain::Tech);
        assert_eq!(Domain::parse("  Business "), Domain::Business);
        assert_eq!(Domain::parse("cooking"), Domain::General);
        assert_eq!(Domain::parse(""), Domain::General);
    }

    #[test]
    fn test_domain_deserializes_unknown_as_general() {
        let domains: Vec<Domain> = serde_json::from_str(r#"["ART", "poetry", "daily"]"#).unwrap();
        assert_eq!(domains, vec![Domain::Art, Domain::General, Domain::Daily]);
        assert_eq!(serde_json::to_string(&Domain::Science).unwrap(), "\"science\"");
    }

    #[test]
    fn test_pages_preserve_order_through_json() {
        let pages = Pages::new()
            .with("step3", Page::new("c."))
            .with("step1", Page::new("a."))
            .with("step2", Page::new("b."));

        let json = serde_json::to_string(&pages).unwrap();
        assert!(json.find("step3").unwrap() < json.find("step1").unwrap());

        let parsed: Pages = serde_json::from_str(&json).unwrap();
        let keys: Vec<&str> = parsed.keys().collect();
        assert_eq!(keys, vec!["step3", "step1", "step2"]);
    }

    #[test]
    fn test_pages_insert_replaces_in_place() {
        let mut pages = Pages::new().with("a", Page::new("one.")).with("b", Page::new("two."));
        pages.insert("a", Page::new("uno."));

        assert_eq!(pages.len(), 2);
        assert_eq!(pages.keys().next(), Some("a"));
        assert_eq!(pages.get("a").unwrap().story, "uno.");
    }

    #[test]
    fn test_bundle_camel_case_wire_shape() {
        let bundle = LearningBundle {
            expression: "put off".to_string(),
            pages: Pages::new().with("step1", Page::new("Hi.").with_tags("work", "calm")),
            meaning: None,
            selection_meta: Some(SelectionMeta::new("put off", "postpone", Domain::Daily)),
        };

        let value = serde_json::to_value(&bundle).unwrap();
        assert_eq!(value["pages"]["step1"]["topicTag"], "work");
        assert_eq!(value["selectionMeta"]["selectedDomain"], "daily");
        assert!(value.get("meaning").is_none());
    }
}
