//! Candidate sanitization.
//!
//! Disambiguation candidates come from the store and from the generator, neither
//! of which is trusted. Every field is coerced; only items with no phrase or no
//! sense label are dropped. This never panics.

use serde_json::Value;

use crate::types::{Domain, SenseCandidate};

/// Most candidates ever shown to a user.
pub const MAX_CANDIDATES: usize = 6;

/// Normalize an arbitrary JSON value into at most [`MAX_CANDIDATES`] candidates.
///
/// Anything other than an array yields an empty list.
pub fn sanitize_candidates(raw: &Value) -> Vec<SenseCandidate> {
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| sanitize_one(item, i + 1))
        .take(MAX_CANDIDATES)
        .collect()
}

fn sanitize_one(item: &Value, position: usize) -> Option<SenseCandidate> {
    let obj = item.as_object()?;
    let field = |camel: &str, snake: &str| obj.get(camel).or_else(|| obj.get(snake));

    let phrase = coerce_string(obj.get("phrase"));
    let sense_label = coerce_string(field("senseLabel", "sense_label"));
    if phrase.is_empty() || sense_label.is_empty() {
        return None;
    }

    let id = match coerce_string(obj.get("id")) {
        id if id.is_empty() => format!("sense_{}", position),
        id => id,
    };

    Some(SenseCandidate {
        id,
        phrase,
        sense_label,
        short_hint: coerce_string(field("shortHint", "short_hint")),
        domains: coerce_domains(obj.get("domains")),
    })
}

/// Strings are trimmed, scalars stringified, everything else is empty.
pub(crate) fn coerce_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn coerce_domains(value: Option<&Value>) -> Vec<Domain> {
    let entries = match value.and_then(Value::as_array) {
        Some(entries) if !entries.is_empty() => entries,
        _ => return vec![Domain::General],
    };

    let mut domains = Vec::with_capacity(entries.len());
    for entry in entries {
        let domain = entry.as_str().map(Domain::parse).unwrap_or_default();
        if !domains.contains(&domain) {
            domains.push(domain);
        }
    }
    domains
}
