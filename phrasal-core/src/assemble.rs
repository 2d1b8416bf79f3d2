//! Building a [`LearningBundle`] from untrusted generator output.
//!
//! Every field is optional on the way in. Missing values become empty strings or
//! absent blocks so the validator, not the parser, decides what is wrong.

use serde_json::{Map, Value};

use crate::layout::BundleLayout;
use crate::sanitize::coerce_string;
use crate::types::{LearningBundle, MeaningBlock, Page, Pages, SelectionMeta};

/// Build a bundle for `expression` from raw JSON.
///
/// Pages are taken in layout order from either an object keyed by page key or
/// an array in page order. Keys outside the layout are dropped. Blank selection
/// fields are filled from `fallback_selection` when one is given.
pub fn assemble_bundle(
    expression: &str,
    raw: &Value,
    layout: &BundleLayout,
    fallback_selection: Option<&SelectionMeta>,
) -> LearningBundle {
    let empty = Map::new();
    let obj = bundle_object(raw).unwrap_or(&empty);

    let pages: Pages = match obj.get("pages") {
        Some(Value::Object(by_key)) => layout
            .pages
            .iter()
            .map(|spec| (spec.key.clone(), page_from(by_key.get(&spec.key))))
            .collect(),
        Some(Value::Array(in_order)) => layout
            .pages
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.key.clone(), page_from(in_order.get(i))))
            .collect(),
        _ => layout
            .pages
            .iter()
            .map(|spec| (spec.key.clone(), Page::default()))
            .collect(),
    };

    let meaning = obj.get("meaning").and_then(Value::as_object).map(meaning_from);

    let selection = obj
        .get("selectionMeta")
        .or_else(|| obj.get("selection_meta"))
        .and_then(Value::as_object)
        .map(selection_from);
    let selection_meta = match (selection, fallback_selection) {
        (Some(meta), Some(fallback)) => Some(fill_blanks(meta, fallback)),
        (Some(meta), None) => Some(meta),
        (None, fallback) => fallback.cloned(),
    };

    LearningBundle {
        expression: expression.to_string(),
        pages,
        meaning,
        selection_meta,
    }
}

/// The object holding bundle fields; tolerates a `{"bundle": {...}}` wrapper.
fn bundle_object(raw: &Value) -> Option<&Map<String, Value>> {
    let obj = raw.as_object()?;
    if !obj.contains_key("pages") {
        if let Some(inner) = obj.get("bundle").and_then(Value::as_object) {
            return Some(inner);
        }
    }
    Some(obj)
}

fn get<'a>(obj: &'a Map<String, Value>, camel: &str, snake: &str) -> Option<&'a Value> {
    obj.get(camel).or_else(|| obj.get(snake))
}

fn page_from(value: Option<&Value>) -> Page {
    match value {
        Some(Value::Object(obj)) => Page {
            story: coerce_string(obj.get("story")),
            topic_tag: coerce_string(get(obj, "topicTag", "topic_tag")),
            mood_tag: coerce_string(get(obj, "moodTag", "mood_tag")),
        },
        // a bare string is taken as the story
        Some(Value::String(story)) => Page::new(story.trim()),
        _ => Page::default(),
    }
}

fn meaning_from(obj: &Map<String, Value>) -> MeaningBlock {
    MeaningBlock {
        literal_meaning: coerce_string(get(obj, "literalMeaning", "literal_meaning")),
        real_usage: coerce_string(get(obj, "realUsage", "real_usage")),
        etymology: coerce_string(obj.get("etymology")),
        nuance: coerce_string(obj.get("nuance")),
        example_target: coerce_string(get(obj, "exampleTarget", "example_target")),
        example_native: coerce_string(get(obj, "exampleNative", "example_native")),
    }
}

fn selection_from(obj: &Map<String, Value>) -> SelectionMeta {
    SelectionMeta {
        selected_phrase: coerce_string(get(obj, "selectedPhrase", "selected_phrase")),
        selected_sense_label: coerce_string(get(obj, "selectedSenseLabel", "selected_sense_label")),
        selected_domain: coerce_string(get(obj, "selectedDomain", "selected_domain")),
    }
}

fn fill_blanks(mut meta: SelectionMeta, fallback: &SelectionMeta) -> SelectionMeta {
    if meta.selected_phrase.is_empty() {
        meta.selected_phrase = fallback.selected_phrase.clone();
    }
    if meta.selected_sense_label.is_empty() {
        meta.selected_sense_label = fallback.selected_sense_label.clone();
    }
    if meta.selected_domain.is_empty() {
        meta.selected_domain = fallback.selected_domain.clone();
    }
    meta
}
