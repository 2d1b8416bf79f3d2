//! Scripted generator for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::traits::{ContentGenerator, GenerationRequest, GeneratorError};

type Reply = Result<Value, String>;

/// Replies from per-operation queues, falling back to a default once a queue
/// is drained. With no default, an empty queue fails the call.
#[derive(Default)]
pub struct MockGenerator {
    bundles: Mutex<VecDeque<Reply>>,
    default_bundle: Option<Value>,
    disambiguations: Mutex<VecDeque<Reply>>,
    default_disambiguation: Option<Value>,
    requests: Mutex<Vec<GenerationRequest>>,
    bundle_calls: AtomicU32,
    disambiguate_calls: AtomicU32,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every bundle request with `bundle` once the queue is empty.
    pub fn with_bundle(mut self, bundle: Value) -> Self {
        self.default_bundle = Some(bundle);
        self
    }

    pub fn then_bundle(self, bundle: Value) -> Self {
        push(&self.bundles, Ok(bundle));
        self
    }

    pub fn then_fail_bundle(self, message: impl Into<String>) -> Self {
        push(&self.bundles, Err(message.into()));
        self
    }

    pub fn with_disambiguation(mut self, response: Value) -> Self {
        self.default_disambiguation = Some(response);
        self
    }

    pub fn then_disambiguation(self, response: Value) -> Self {
        push(&self.disambiguations, Ok(response));
        self
    }

    pub fn then_fail_disambiguation(self, message: impl Into<String>) -> Self {
        push(&self.disambiguations, Err(message.into()));
        self
    }

    pub fn bundle_calls(&self) -> u32 {
        self.bundle_calls.load(Ordering::SeqCst)
    }

    pub fn disambiguate_calls(&self) -> u32 {
        self.disambiguate_calls.load(Ordering::SeqCst)
    }

    /// Generation requests received so far.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

fn push(queue: &Mutex<VecDeque<Reply>>, reply: Reply) {
    if let Ok(mut queue) = queue.lock() {
        queue.push_back(reply);
    }
}

fn next(queue: &Mutex<VecDeque<Reply>>, default: &Option<Value>) -> Result<Value, GeneratorError> {
    let reply = queue.lock().ok().and_then(|mut q| q.pop_front());
    match reply {
        Some(Ok(value)) => Ok(value),
        Some(Err(message)) => Err(GeneratorError::Unavailable(message)),
        None => default
            .clone()
            .ok_or_else(|| GeneratorError::Unavailable("no scripted response".to_string())),
    }
}

#[async_trait]
impl ContentGenerator for MockGenerator {
    async fn generate_bundle(&self, request: &GenerationRequest) -> Result<Value, GeneratorError> {
        self.bundle_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        next(&self.bundles, &self.default_bundle)
    }

    async fn disambiguate(&self, _input: &str) -> Result<Value, GeneratorError> {
        self.disambiguate_calls.fetch_add(1, Ordering::SeqCst);
        next(&self.disambiguations, &self.default_disambiguation)
    }
}
