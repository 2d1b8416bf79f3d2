//! Resolution engine.
//!
//! Turns a raw learner query into a [`ResolutionResult`]:
//!
//! 1. Normalize (trim, lowercase, length limit); failures are [`InputError`]s
//! 2. Exact store lookup; a hit is returned as stored
//! 3. Fuzzy store lookup; sanitized candidates ask the user to pick a sense
//! 4. Up to `max_attempts` sequential generation attempts, each with fresh
//!    diversity slots, each gated by the validator
//!
//! Store failures during lookup count as misses. A generated bundle that
//! validates is persisted in the background.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use phrasal_core::{
    assemble_bundle, normalize_input, sanitize_candidates, BundleValidator, DisambiguationResponse,
    InputError, LearningBundle, ResolutionResult, SelectionMeta, SenseCandidate, Validation,
};

use crate::config::{ConfigError, EngineConfig};
use crate::generator::{ContentGenerator, GenerationRequest};
use crate::persist::PersistTask;
use crate::store::ExpressionStore;

const RETRY_HINT: &str = "Try again, or rephrase the expression.";

/// A result together with the background persist it started, if any.
#[derive(Debug)]
pub struct Resolution {
    pub result: ResolutionResult,
    pub persist: Option<PersistTask>,
}

impl Resolution {
    fn done(result: ResolutionResult) -> Self {
        Self { result, persist: None }
    }
}

/// Orchestrates store, generator and validator.
pub struct ResolutionEngine {
    store: Arc<dyn ExpressionStore>,
    generator: Arc<dyn ContentGenerator>,
    config: EngineConfig,
    validator: BundleValidator,
}

impl ResolutionEngine {
    /// Create an engine with the default configuration.
    pub fn new(store: Arc<dyn ExpressionStore>, generator: Arc<dyn ContentGenerator>) -> Self {
        let config = EngineConfig::default();
        let validator = validator_for(&config);
        Self {
            store,
            generator,
            config,
            validator,
        }
    }

    /// Replace the configuration after validating it.
    pub fn with_config(mut self, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.validator = validator_for(&config);
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn validator(&self) -> &BundleValidator {
        &self.validator
    }

    /// Resolve a raw query. Any background persist keeps running after return.
    pub async fn resolve(&self, raw: &str) -> Result<ResolutionResult, InputError> {
        self.resolve_tracked(raw).await.map(|r| r.result)
    }

    /// Resolve a raw query and hand back the persist task.
    pub async fn resolve_tracked(&self, raw: &str) -> Result<Resolution, InputError> {
        let span = info_span!("resolve", resolution_id = %Uuid::new_v4());
        self.run_resolve(raw).instrument(span).await
    }

    async fn run_resolve(&self, raw: &str) -> Result<Resolution, InputError> {
        let input = normalize_input(raw, self.config.max_input_chars)?;
        debug!(input = %input, "Input normalized");

        if let Some(bundle) = self.lookup_exact(&input).await {
            info!(expression = %input, "Exact hit");
            return Ok(Resolution::done(ResolutionResult::ready(bundle)));
        }

        let candidates = self.lookup_fuzzy(&input).await;
        if !candidates.is_empty() {
            info!(input = %input, candidates = candidates.len(), "Needs selection");
            return Ok(Resolution::done(ResolutionResult::needs_selection(input, candidates)));
        }

        Ok(self.generate(&input, None).await)
    }

    /// Generate content for a sense the user picked from a `NeedsSelection`.
    pub async fn resolve_selection(&self, candidate: &SenseCandidate) -> Result<ResolutionResult, InputError> {
        self.resolve_selection_tracked(candidate).await.map(|r| r.result)
    }

    pub async fn resolve_selection_tracked(&self, candidate: &SenseCandidate) -> Result<Resolution, InputError> {
        let span = info_span!("resolve_selection", resolution_id = %Uuid::new_v4(), sense = %candidate.sense_label);
        self.run_selection(candidate).instrument(span).await
    }

    async fn run_selection(&self, candidate: &SenseCandidate) -> Result<Resolution, InputError> {
        let expression = normalize_input(&candidate.phrase, self.config.max_input_chars)?;

        if let Some(bundle) = self.lookup_exact(&expression).await {
            info!(expression = %expression, "Exact hit");
            return Ok(Resolution::done(ResolutionResult::ready(bundle)));
        }

        let selection = SelectionMeta::new(
            candidate.phrase.clone(),
            candidate.sense_label.clone(),
            candidate.primary_domain(),
        );
        Ok(self.generate(&expression, Some(&selection)).await)
    }

    /// Ask the generator to classify a query and, when it is unambiguous,
    /// produce content for it in the same call.
    pub async fn disambiguate(&self, raw: &str) -> Result<ResolutionResult, InputError> {
        self.disambiguate_tracked(raw).await.map(|r| r.result)
    }

    pub async fn disambiguate_tracked(&self, raw: &str) -> Result<Resolution, InputError> {
        let span = info_span!("disambiguate", resolution_id = %Uuid::new_v4());
        self.run_disambiguate(raw).instrument(span).await
    }

    async fn run_disambiguate(&self, raw: &str) -> Result<Resolution, InputError> {
        let input = normalize_input(raw, self.config.max_input_chars)?;

        if let Some(bundle) = self.lookup_exact(&input).await {
            info!(expression = %input, "Exact hit");
            return Ok(Resolution::done(ResolutionResult::ready(bundle)));
        }

        let raw_response = match self.generator.disambiguate(&input).await {
            Ok(value) => value,
            Err(e) => {
                warn!(input = %input, error = %e, "Disambiguation failed");
                return Ok(Resolution::done(ResolutionResult::invalid(
                    "The expression could not be checked right now.",
                    "Try again in a moment.",
                )));
            }
        };

        Ok(self.apply_disambiguation(&input, DisambiguationResponse::from_value(&raw_response)))
    }

    fn apply_disambiguation(&self, input: &str, response: DisambiguationResponse) -> Resolution {
        match response {
            DisambiguationResponse::Invalid {
                reason_message,
                retry_hint,
            } => {
                info!(input = %input, "Generator rejected input");
                Resolution::done(ResolutionResult::invalid(
                    non_blank(reason_message, "This does not look like an English expression."),
                    non_blank(retry_hint, "Check the spelling and try again."),
                ))
            }
            DisambiguationResponse::NeedsSelection { candidates } => {
                if candidates.is_empty() {
                    warn!(input = %input, "Generator offered no usable senses");
                    return Resolution::done(ResolutionResult::invalid(
                        "No usable meanings were found for this expression.",
                        RETRY_HINT,
                    ));
                }
                info!(input = %input, candidates = candidates.len(), "Needs selection");
                Resolution::done(ResolutionResult::needs_selection(input, candidates))
            }
            DisambiguationResponse::Ready { selection, bundle } => {
                let expression = normalize_input(&selection.selected_phrase, self.config.max_input_chars)
                    .unwrap_or_else(|_| input.to_string());
                let bundle = assemble_bundle(&expression, &bundle, &self.config.layout, Some(&selection));

                match self.validator.validate(&bundle) {
                    Validation::Valid => {
                        info!(expression = %expression, "Disambiguated bundle accepted");
                        let persist = self.persist(bundle.clone());
                        Resolution {
                            result: ResolutionResult::ready(bundle),
                            persist,
                        }
                    }
                    Validation::Invalid { reason } => {
                        warn!(expression = %expression, reason = %reason, "Disambiguated bundle rejected");
                        self.best_guess(input, &selection)
                    }
                }
            }
            DisambiguationResponse::Unrecognized { status } => {
                warn!(input = %input, status = %status, "Unrecognized disambiguation status");
                Resolution::done(ResolutionResult::invalid(
                    "The expression could not be checked right now.",
                    RETRY_HINT,
                ))
            }
        }
    }

    /// Single candidate built from the generator's chosen sense.
    fn best_guess(&self, input: &str, selection: &SelectionMeta) -> Resolution {
        let phrase = non_blank(selection.selected_phrase.clone(), input);
        let sense_label = non_blank(selection.selected_sense_label.clone(), &phrase);
        let candidates = sanitize_candidates(&json!([{
            "id": "1",
            "phrase": phrase,
            "senseLabel": sense_label,
            "shortHint": "",
            "domains": [selection.selected_domain],
        }]));

        if candidates.is_empty() {
            return Resolution::done(ResolutionResult::invalid(
                "No usable meanings were found for this expression.",
                RETRY_HINT,
            ));
        }
        Resolution::done(ResolutionResult::needs_selection(input, candidates))
    }

    /// Bounded generate-validate loop.
    async fn generate(&self, expression: &str, selection: Option<&SelectionMeta>) -> Resolution {
        let mut rng = self.rng();
        let layout = &self.config.layout;
        let mut last_failure = String::from("generation unavailable");

        for attempt in 1..=self.config.max_attempts {
            let mut request = GenerationRequest::new(expression, layout, &self.config.slot_pools, &mut rng);
            if let Some(selection) = selection {
                request = request.with_sense(selection.selected_sense_label.clone(), selection.domain());
            }

            let raw = match self.generator.generate_bundle(&request).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(expression = %expression, attempt, error = %e, "Generation attempt failed");
                    last_failure = String::from("generation unavailable");
                    continue;
                }
            };

            let bundle = assemble_bundle(expression, &raw, layout, selection);
            match self.validator.validate(&bundle) {
                Validation::Valid => {
                    info!(expression = %expression, attempt, "Generated bundle accepted");
                    let persist = self.persist(bundle.clone());
                    return Resolution {
                        result: ResolutionResult::ready(bundle),
                        persist,
                    };
                }
                Validation::Invalid { reason } => {
                    warn!(expression = %expression, attempt, reason = %reason, "Generated bundle rejected");
                    last_failure = reason.code();
                }
            }
        }

        info!(expression = %expression, last_failure = %last_failure, "Attempts exhausted");
        Resolution::done(ResolutionResult::invalid(
            format!("Could not create content for \"{}\" ({}).", expression, last_failure),
            RETRY_HINT,
        ))
    }

    async fn lookup_exact(&self, expression: &str) -> Option<LearningBundle> {
        match self.store.lookup_exact(expression).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(expression = %expression, error = %e, "Exact lookup failed, treating as miss");
                None
            }
        }
    }

    async fn lookup_fuzzy(&self, query: &str) -> Vec<SenseCandidate> {
        match self.store.lookup_fuzzy(query).await {
            Ok(rows) => sanitize_candidates(&serde_json::Value::Array(rows)),
            Err(e) => {
                warn!(query = %query, error = %e, "Fuzzy lookup failed, treating as miss");
                Vec::new()
            }
        }
    }

    fn persist(&self, bundle: LearningBundle) -> Option<PersistTask> {
        self.config
            .persist_generated
            .then(|| PersistTask::spawn(Arc::clone(&self.store), bundle))
    }

    fn rng(&self) -> StdRng {
        match self.config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

fn validator_for(config: &EngineConfig) -> BundleValidator {
    BundleValidator::new(config.layout.clone()).with_similarity_threshold(config.similarity_threshold)
}

fn non_blank(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::MockGenerator;
    use crate::store::MemoryStore;
    use phrasal_core::Domain;
    use serde_json::Value;

    fn valid_bundle_json(phrase: &str) -> Value {
        json!({
            "pages": {
                "step1": {"story": "Maria decided to put off her dentist appointment.", "topicTag": "health", "moodTag": "tense"},
                "step2": {"story": "The team put off the product launch. Nobody wanted to ship a broken release.", "topicTag": "work", "moodTag": "calm"},
                "step3": {"story": "Grandpa kept putting off his garden chores. Weeds covered the tomatoes by July. Finally his neighbor offered help. They spent Sunday pulling roots together.", "topicTag": "family", "moodTag": "hopeful"}
            },
            "meaning": {
                "literalMeaning": "to place something away",
                "realUsage": "to postpone or delay",
                "etymology": "from put + off, distance",
                "nuance": "neutral, often implies reluctance",
                "exampleTarget": "Don't put off your homework.",
                "exampleNative": "숙제를 미루지 마."
            },
            "selectionMeta": {
                "selectedPhrase": phrase,
                "selectedSenseLabel": "postpone",
                "selectedDomain": "daily"
            }
        })
    }

    fn stored(phrase: &str, sense: &str) -> LearningBundle {
        let mut bundle = assemble_bundle(phrase, &valid_bundle_json(phrase), &Default::default(), None);
        if let Some(meta) = bundle.selection_meta.as_mut() {
            meta.selected_sense_label = sense.to_string();
        }
        bundle
    }

    fn engine(store: Arc<MemoryStore>, generator: Arc<MockGenerator>) -> ResolutionEngine {
        ResolutionEngine::new(store, generator)
            .with_config(EngineConfig::default().with_seed(11))
            .unwrap()
    }

    #[tokio::test]
    async fn test_exact_hit_short_circuits() {
        let bundle = stored("put off", "postpone");
        let store = Arc::new(MemoryStore::with_bundles([bundle.clone()]));
        let generator = Arc::new(MockGenerator::new());

        let result = engine(store.clone(), generator.clone()).resolve("  Put Off ").await.unwrap();

        assert_eq!(result, ResolutionResult::ready(bundle));
        assert_eq!(store.exact_calls(), 1);
        assert_eq!(store.fuzzy_calls(), 0);
        assert_eq!(generator.bundle_calls(), 0);
        assert_eq!(store.persist_calls(), 0);
    }

    #[tokio::test]
    async fn test_disambiguate_exact_hit_skips_generator() {
        let bundle = stored("put off", "postpone");
        let store = Arc::new(MemoryStore::with_bundles([bundle.clone()]));
        let generator = Arc::new(MockGenerator::new());

        let resolution = engine(store.clone(), generator.clone())
            .disambiguate_tracked(" PUT OFF")
            .await
            .unwrap();

        assert_eq!(resolution.result, ResolutionResult::ready(bundle));
        assert!(resolution.persist.is_none());
        assert_eq!(store.exact_calls(), 1);
        assert_eq!(generator.disambiguate_calls(), 0);
        assert_eq!(generator.bundle_calls(), 0);
        assert_eq!(store.persist_calls(), 0);
    }

    #[tokio::test]
    async fn test_fuzzy_rows_become_candidates() {
        let store = Arc::new(MemoryStore::with_bundles([
            stored("put off", "postpone"),
            stored("put up with", "tolerate"),
        ]));
        let generator = Arc::new(MockGenerator::new());

        let result = engine(store, generator.clone()).resolve("put").await.unwrap();

        let candidates = result.candidates();
        assert_eq!(result.status(), "needs_selection");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, "1");
        assert_eq!(candidates[0].phrase, "put off");
        assert_eq!(candidates[1].sense_label, "tolerate");
        assert_eq!(generator.bundle_calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_input_is_an_error() {
        let engine = engine(Arc::new(MemoryStore::new()), Arc::new(MockGenerator::new()));

        assert_eq!(engine.resolve("").await, Err(InputError::Empty));
        assert_eq!(engine.resolve("   \t").await, Err(InputError::Empty));
        assert!(matches!(
            engine.resolve(&"a".repeat(101)).await,
            Err(InputError::TooLong { max: 100, actual: 101 })
        ));
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let store = Arc::new(MemoryStore::new());
        let generator = Arc::new(MockGenerator::new().with_bundle(json!({"pages": {}})));

        let result = engine(store.clone(), generator.clone()).resolve("put off").await.unwrap();

        assert_eq!(generator.bundle_calls(), 3);
        match result {
            ResolutionResult::Invalid { reason_message, .. } => {
                assert!(reason_message.contains("missing_story_step1"))
            }
            other => panic!("expected invalid, got {:?}", other),
        }
        assert_eq!(store.persist_calls(), 0);
    }

    #[tokio::test]
    async fn test_generator_errors_consume_attempts() {
        let generator = Arc::new(MockGenerator::new());
        let engine = engine(Arc::new(MemoryStore::new()), generator.clone());

        let result = engine.resolve("put off").await.unwrap();

        assert_eq!(generator.bundle_calls(), 3);
        match result {
            ResolutionResult::Invalid { reason_message, .. } => {
                assert!(reason_message.contains("generation unavailable"))
            }
            other => panic!("expected invalid, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success_on_second_attempt_persists() {
        let store = Arc::new(MemoryStore::new());
        let generator = Arc::new(
            MockGenerator::new()
                .then_fail_bundle("timeout")
                .with_bundle(valid_bundle_json("put off")),
        );

        let resolution = engine(store.clone(), generator.clone())
            .resolve_tracked("Put off")
            .await
            .unwrap();

        assert!(resolution.result.is_ready());
        assert_eq!(generator.bundle_calls(), 2);
        assert!(resolution.persist.unwrap().wait().await);
        assert!(store.get("put off").is_some());

        let requests = generator.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].pages.len(), 3);
        assert_eq!(requests[0].expression, "put off");
    }

    #[tokio::test]
    async fn test_persist_failure_is_swallowed() {
        let store = Arc::new(MemoryStore::new().with_failing_persist(true));
        let generator = Arc::new(MockGenerator::new().with_bundle(valid_bundle_json("put off")));

        let resolution = engine(store.clone(), generator).resolve_tracked("put off").await.unwrap();

        assert!(resolution.result.is_ready());
        assert!(!resolution.persist.unwrap().wait().await);
        assert_eq!(store.persist_calls(), 1);
    }

    #[tokio::test]
    async fn test_persist_can_be_disabled() {
        let store = Arc::new(MemoryStore::new());
        let generator = Arc::new(MockGenerator::new().with_bundle(valid_bundle_json("put off")));
        let mut config = EngineConfig::default();
        config.persist_generated = false;
        let engine = ResolutionEngine::new(store.clone(), generator).with_config(config).unwrap();

        let resolution = engine.resolve_tracked("put off").await.unwrap();
        assert!(resolution.result.is_ready());
        assert!(resolution.persist.is_none());
    }

    #[tokio::test]
    async fn test_lookup_failures_fall_through_to_generation() {
        let store = Arc::new(MemoryStore::new().with_failing_lookups(true));
        let generator = Arc::new(MockGenerator::new().with_bundle(valid_bundle_json("put off")));

        let result = engine(store.clone(), generator.clone()).resolve("put off").await.unwrap();

        assert!(result.is_ready());
        assert_eq!(store.fuzzy_calls(), 1);
        assert_eq!(generator.bundle_calls(), 1);
    }

    #[tokio::test]
    async fn test_selection_fills_missing_meta() {
        let mut raw = valid_bundle_json("ignored");
        raw.as_object_mut().unwrap().remove("selectionMeta");
        let generator = Arc::new(MockGenerator::new().with_bundle(raw));
        let engine = engine(Arc::new(MemoryStore::new()), generator.clone());

        let candidate = sanitize_candidates(&json!([
            {"id": "2", "phrase": "Put Off", "senseLabel": "repel", "domains": ["art"]}
        ]))
        .remove(0);
        let result = engine.resolve_selection(&candidate).await.unwrap();

        let bundle = result.bundle().unwrap();
        assert_eq!(bundle.expression, "put off");
        let meta = bundle.selection_meta.as_ref().unwrap();
        assert_eq!(meta.selected_sense_label, "repel");
        assert_eq!(meta.domain(), Domain::Art);

        let request = &generator.requests()[0];
        assert_eq!(request.sense_label.as_deref(), Some("repel"));
        assert_eq!(request.domain, Domain::Art);
    }

    #[tokio::test]
    async fn test_disambiguate_rejected_bundle_offers_best_guess() {
        let generator = Arc::new(MockGenerator::new().with_disambiguation(json!({
            "status": "ready",
            "selected": {"phrase": "put off", "senseLabel": "postpone", "domain": "business"},
            "bundle": {"pages": {"step1": {"story": "Too short"}}}
        })));
        let store = Arc::new(MemoryStore::new());

        let result = engine(store.clone(), generator).disambiguate("putoff").await.unwrap();

        match result {
            ResolutionResult::NeedsSelection {
                normalized_input,
                candidates,
            } => {
                assert_eq!(normalized_input, "putoff");
                assert_eq!(candidates.len(), 1);
                assert_eq!(candidates[0].phrase, "put off");
                assert_eq!(candidates[0].sense_label, "postpone");
                assert_eq!(candidates[0].domains, vec![Domain::Business]);
            }
            other => panic!("expected needs_selection, got {:?}", other),
        }
        assert_eq!(store.persist_calls(), 0);
    }

    #[tokio::test]
    async fn test_disambiguate_outcomes() {
        let generator = Arc::new(
            MockGenerator::new()
                .then_disambiguation(json!({"status": "invalid", "reasonMessage": "Not English"}))
                .then_disambiguation(json!({"status": "needs_selection", "candidates": [{"phrase": ""}]}))
                .then_disambiguation(json!({"status": "maybe"}))
                .then_fail_disambiguation("down")
                .then_disambiguation(json!({
                    "status": "ready",
                    "selected": {"phrase": "put off", "senseLabel": "postpone", "domain": "daily"},
                    "bundle": valid_bundle_json("put off")
                })),
        );
        let store = Arc::new(MemoryStore::new());
        let engine = engine(store.clone(), generator);

        match engine.disambiguate("xqz").await.unwrap() {
            ResolutionResult::Invalid {
                reason_message,
                retry_hint,
            } => {
                assert_eq!(reason_message, "Not English");
                assert!(!retry_hint.is_empty());
            }
            other => panic!("expected invalid, got {:?}", other),
        }
        assert_eq!(engine.disambiguate("xqz").await.unwrap().status(), "invalid");
        assert_eq!(engine.disambiguate("xqz").await.unwrap().status(), "invalid");
        assert_eq!(engine.disambiguate("xqz").await.unwrap().status(), "invalid");

        let resolution = engine.disambiguate_tracked("Put off").await.unwrap();
        assert!(resolution.result.is_ready());
        assert!(resolution.persist.unwrap().wait().await);
        assert!(store.get("put off").is_some());
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let engine = ResolutionEngine::new(Arc::new(MemoryStore::new()), Arc::new(MockGenerator::new()));
        assert!(engine
            .with_config(EngineConfig::default().with_max_attempts(5))
            .is_err());
    }
}
