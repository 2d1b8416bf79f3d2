//! Phrasal WASM - client-side content rules
//!
//! Runs the same validator, sanitizer, slot allocator and input normalization
//! as the server, so the browser can check a bundle or candidate list without a
//! round-trip. Every function takes and returns JSON text; failures come back
//! as `{"error": "..."}`.
//!
//! ## Usage in JavaScript
//!
//! ```javascript
//! import init, { validate_bundle, sanitize_candidates } from 'phrasal-wasm';
//!
//! await init();
//!
//! const verdict = JSON.parse(validate_bundle(JSON.stringify(bundle), "three_step"));
//! if (!verdict.valid) console.warn(verdict.reason);
//!
//! const senses = JSON.parse(sanitize_candidates(JSON.stringify(rawCandidates)));
//! ```
//!
//! ## Build
//!
//! ```bash
//! wasm-pack build --target web --out-dir pkg
//! ```

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::{json, Value};
use wasm_bindgen::prelude::*;

use phrasal_core::{BundleLayout, BundleValidator, InputError, LearningBundle, SlotPools, MAX_INPUT_CHARS};

// Initialize panic hook for better error messages in browser console
#[cfg(feature = "console_error_panic_hook")]
#[wasm_bindgen]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

// ============================================================================
// Helpers
// ============================================================================

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| error_json(&e.to_string()))
}

fn error_json(message: &str) -> String {
    json!({ "error": message }).to_string()
}

fn layout_named(name: &str) -> Option<BundleLayout> {
    match name {
        "" | "three_step" => Some(BundleLayout::three_step()),
        "six_step" => Some(BundleLayout::six_step()),
        _ => None,
    }
}

// ============================================================================
// Exports
// ============================================================================

/// Validate a bundle against a named layout (`three_step` or `six_step`).
///
/// Returns `{"valid": true}` or `{"valid": false, "reason": "<code>", "detail": {..}}`.
#[wasm_bindgen]
pub fn validate_bundle(bundle_json: &str, layout: &str) -> String {
    let Some(layout) = layout_named(layout) else {
        return error_json(&format!("unknown layout: {}", layout));
    };
    match serde_json::from_str::<LearningBundle>(bundle_json) {
        Ok(bundle) => to_json(&BundleValidator::new(layout).validate(&bundle)),
        Err(e) => error_json(&format!("bundle is not valid JSON: {}", e)),
    }
}

/// Sanitize an untrusted candidate list. Never fails on well-formed JSON.
#[wasm_bindgen]
pub fn sanitize_candidates(raw_json: &str) -> String {
    match serde_json::from_str::<Value>(raw_json) {
        Ok(raw) => to_json(&phrasal_core::sanitize_candidates(&raw)),
        Err(e) => error_json(&format!("candidates are not valid JSON: {}", e)),
    }
}

/// Allocate diversity slots for a JSON array of page keys.
///
/// Returns a JSON array of `{"key", "topic", "mood", "setting"}` objects in
/// page-key order. The same seed always yields the same slots.
#[wasm_bindgen]
pub fn allocate_slots(page_keys_json: &str, seed: u32) -> String {
    let keys: Vec<String> = match serde_json::from_str(page_keys_json) {
        Ok(keys) => keys,
        Err(e) => return error_json(&format!("page keys must be a JSON array of strings: {}", e)),
    };
    let mut rng = StdRng::seed_from_u64(u64::from(seed));
    let slots: Vec<Value> = SlotPools::default()
        .allocate(&keys, &mut rng)
        .into_iter()
        .map(|(key, slot)| {
            json!({ "key": key, "topic": slot.topic, "mood": slot.mood, "setting": slot.setting })
        })
        .collect();
    to_json(&slots)
}

/// Normalize a raw query the way the server does.
///
/// Returns `{"normalized": "..."}` or `{"error": "...", "code": "empty" | "too_long"}`.
#[wasm_bindgen]
pub fn normalize_input(raw: &str) -> String {
    match phrasal_core::normalize_input(raw, MAX_INPUT_CHARS) {
        Ok(normalized) => json!({ "normalized": normalized }).to_string(),
        Err(e) => {
            let code = match e {
                InputError::Empty => "empty",
                InputError::TooLong { .. } => "too_long",
            };
            json!({ "error": e.to_string(), "code": code }).to_string()
        }
    }
}

/// Get the library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// ============================================================================
// Tests
// ============================================================================
