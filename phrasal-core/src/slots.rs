//! Diversity slot allocation.
//!
//! Each generation attempt gets a fresh (topic, mood, setting) triple per page so
//! repeated generations for the same phrase drift apart instead of converging on
//! one scene. Pools are shuffled independently once per call; page `i` takes
//! entry `i mod len` from each shuffled pool, so the first `len` pages never share
//! a component.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{DiversitySlot, PageKey};

const DEFAULT_TOPICS: &[&str] = &[
    "work",
    "school",
    "family",
    "friendship",
    "travel",
    "health",
    "money",
    "hobbies",
    "food",
    "technology",
];

const DEFAULT_MOODS: &[&str] = &[
    "cheerful",
    "tense",
    "nostalgic",
    "humorous",
    "hopeful",
    "frustrated",
    "calm",
];

const DEFAULT_SETTINGS: &[&str] = &[
    "office",
    "kitchen",
    "train station",
    "park",
    "classroom",
    "cafe",
    "hospital",
    "airport",
    "apartment",
];

/// The three pools slots are drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPools {
    pub topics: Vec<String>,
    pub moods: Vec<String>,
    pub settings: Vec<String>,
}

impl Default for SlotPools {
    fn default() -> Self {
        fn owned(pool: &[&str]) -> Vec<String> {
            pool.iter().map(|s| s.to_string()).collect()
        }
        Self {
            topics: owned(DEFAULT_TOPICS),
            moods: owned(DEFAULT_MOODS),
            settings: owned(DEFAULT_SETTINGS),
        }
    }
}

impl SlotPools {
    /// Assign a slot to every page key, in key order.
    ///
    /// An empty pool yields an empty string for that component.
    pub fn allocate<K, R>(&self, page_keys: &[K], rng: &mut R) -> Vec<(PageKey, DiversitySlot)>
    where
        K: AsRef<str>,
        R: Rng + ?Sized,
    {
        let topics = shuffled(&self.topics, rng);
        let moods = shuffled(&self.moods, rng);
        let settings = shuffled(&self.settings, rng);

        page_keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let slot = DiversitySlot {
                    topic: cycle(&topics, i),
                    mood: cycle(&moods, i),
                    setting: cycle(&settings, i),
                };
                (key.as_ref().to_string(), slot)
            })
            .collect()
    }
}

fn shuffled<'a, R: Rng + ?Sized>(pool: &'a [String], rng: &mut R) -> Vec<&'a str> {
    let mut order: Vec<&str> = pool.iter().map(String::as_str).collect();
    order.shuffle(rng);
    order
}

fn cycle(pool: &[&str], i: usize) -> String {
    if pool.is_empty() {
        return String::new();
    }
    pool[i % pool.len()].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn keys(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("step{}", i)).collect()
    }

    #[test]
    fn test_one_slot_per_key_in_order() {
        let mut rng = StdRng::seed_from_u64(7);
        let slots = SlotPools::default().allocate(&keys(3), &mut rng);

        let got: Vec<&str> = slots.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(got, vec!["step1", "step2", "step3"]);
    }

    #[test]
    fn test_no_repeats_within_pool_length() {
        let pools = SlotPools::default();
        let mut rng = StdRng::seed_from_u64(42);
        let slots = pools.allocate(&keys(pools.moods.len()), &mut rng);

        let moods: HashSet<&str> = slots.iter().map(|(_, s)| s.mood.as_str()).collect();
        assert_eq!(moods.len(), pools.moods.len());
    }

    #[test]
    fn test_cycles_past_pool_length() {
        let pools = SlotPools {
            topics: vec!["a".into(), "b".into()],
            moods: vec!["m".into()],
            settings: vec![],
        };
        let mut rng = StdRng::seed_from_u64(1);
        let slots = pools.allocate(&keys(5), &mut rng);

        assert_eq!(slots.len(), 5);
        assert_eq!(slots[0].1.topic, slots[2].1.topic);
        assert_eq!(slots[1].1.topic, slots[3].1.topic);
        assert_ne!(slots[0].1.topic, slots[1].1.topic);
        assert!(slots.iter().all(|(_, s)| s.mood == "m"));
        assert!(slots.iter().all(|(_, s)| s.setting.is_empty()));
    }

    #[test]
    fn test_same_seed_same_slots() {
        let pools = SlotPools::default();
        let a = pools.allocate(&keys(6), &mut StdRng::seed_from_u64(99));
        let b = pools.allocate(&keys(6), &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_successive_calls_reshuffle() {
        let pools = SlotPools::default();
        let mut rng = StdRng::seed_from_u64(3);
        let draws: HashSet<Vec<(PageKey, DiversitySlot)>> =
            (0..8).map(|_| pools.allocate(&keys(3), &mut rng)).collect();
        assert!(draws.len() > 1);
    }
}
