//! Property-based tests for the shared content rules.
//!
//! 1. Jaccard similarity is symmetric, bounded and reflexive
//! 2. The sanitizer accepts any JSON and never returns more than six senses
//! 3. Slot allocation never repeats a component within one pool length
//! 4. Validation is deterministic

use std::collections::HashSet;

use phrasal_core::*;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};

// ============================================================================
// Strategies
// ============================================================================

/// Short English-ish text with punctuation.
fn text_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z' .,!?]{0,80}"
}

/// Arbitrary JSON, a few levels deep.
fn json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z ]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::hash_map(
                prop_oneof![
                    Just("id".to_string()),
                    Just("phrase".to_string()),
                    Just("senseLabel".to_string()),
                    Just("shortHint".to_string()),
                    Just("domains".to_string()),
                    "[a-z]{1,6}",
                ],
                inner,
                0..6
            )
            .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// A raw candidate row that always has a phrase and sense label.
fn candidate_row_strategy() -> impl Strategy<Value = Value> {
    ("[a-z]{1,8}", "[a-z]{1,8}", prop::option::of("[a-z]{1,4}")).prop_map(|(phrase, label, id)| {
        match id {
            Some(id) => json!({"id": id, "phrase": phrase, "senseLabel": label}),
            None => json!({"phrase": phrase, "senseLabel": label}),
        }
    })
}

// ============================================================================
// Jaccard
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn jaccard_is_symmetric(a in text_strategy(), b in text_strategy()) {
        prop_assert_eq!(jaccard(&a, &b), jaccard(&b, &a));
    }

    #[test]
    fn jaccard_is_bounded(a in text_strategy(), b in text_strategy()) {
        let sim = jaccard(&a, &b);
        prop_assert!((0.0..=1.0).contains(&sim));
    }

    #[test]
    fn jaccard_is_reflexive_with_tokens(a in text_strategy()) {
        if tokenize(&a).is_empty() {
            prop_assert_eq!(jaccard(&a, &a), 0.0);
        } else {
            prop_assert_eq!(jaccard(&a, &a), 1.0);
        }
    }
}

// ============================================================================
// Sanitizer
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn sanitizer_never_panics(raw in json_strategy()) {
        let candidates = sanitize_candidates(&raw);
        prop_assert!(candidates.len() <= MAX_CANDIDATES);
        for c in &candidates {
            prop_assert!(!c.phrase.is_empty());
            prop_assert!(!c.sense_label.is_empty());
            prop_assert!(!c.id.is_empty());
            prop_assert!(!c.domains.is_empty());
        }
    }

    #[test]
    fn sanitizer_keeps_usable_rows_in_order(rows in prop::collection::vec(candidate_row_strategy(), 0..12)) {
        let candidates = sanitize_candidates(&Value::Array(rows.clone()));
        prop_assert_eq!(candidates.len(), rows.len().min(MAX_CANDIDATES));
        for (c, row) in candidates.iter().zip(rows.iter()) {
            prop_assert_eq!(Some(c.phrase.as_str()), row["phrase"].as_str());
        }
    }
}

// ============================================================================
// Slots
// ============================================================================

proptest! {
    #[test]
    fn slots_distinct_within_pool_length(seed in any::<u64>(), pages in 1usize..20) {
        let pools = SlotPools::default();
        let keys: Vec<String> = (0..pages).map(|i| format!("p{}", i)).collect();
        let slots = pools.allocate(&keys, &mut StdRng::seed_from_u64(seed));

        prop_assert_eq!(slots.len(), pages);

        let window = pages.min(pools.topics.len());
        let topics: HashSet<&str> = slots[..window].iter().map(|(_, s)| s.topic.as_str()).collect();
        prop_assert_eq!(topics.len(), window);

        let window = pages.min(pools.moods.len());
        let moods: HashSet<&str> = slots[..window].iter().map(|(_, s)| s.mood.as_str()).collect();
        prop_assert_eq!(moods.len(), window);

        let window = pages.min(pools.settings.len());
        let settings: HashSet<&str> = slots[..window].iter().map(|(_, s)| s.setting.as_str()).collect();
        prop_assert_eq!(settings.len(), window);
    }
}

// ============================================================================
// Validator
// ============================================================================

proptest! {
    #[test]
    fn validation_is_deterministic(s1 in text_strategy(), s2 in text_strategy(), s3 in text_strategy()) {
        let bundle = LearningBundle {
            expression: "x".into(),
            pages: Pages::new()
                .with("step1", Page::new(s1))
                .with("step2", Page::new(s2))
                .with("step3", Page::new(s3)),
            meaning: None,
            selection_meta: None,
        };
        let validator = BundleValidator::default();
        prop_assert_eq!(validator.validate(&bundle), validator.validate(&bundle));
        // meaning is absent, so validation can never succeed
        prop_assert!(!validator.validate(&bundle).is_valid());
    }
}
