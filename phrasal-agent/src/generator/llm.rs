//! Generator backed by an [`LlmBackend`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::traits::{ContentGenerator, GenerationRequest, GeneratorError};
use crate::backend::{CompletionRequest, LlmBackend};
use crate::prompt::PromptAssembler;

/// Turns prompts into completions and completions into JSON.
pub struct LlmGenerator {
    backend: Arc<dyn LlmBackend>,
    max_tokens: u32,
    temperature: f32,
}

impl LlmGenerator {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            max_tokens: 2048,
            temperature: 0.9,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    async fn complete_json(&self, user_prompt: String, temperature: f32) -> Result<Value, GeneratorError> {
        let request = CompletionRequest::user(user_prompt)
            .with_system(PromptAssembler::build_system_prompt())
            .with_max_tokens(self.max_tokens)
            .with_temperature(temperature)
            .with_json_output();

        let completion = self.backend.complete(request).await?;
        debug!(
            backend = self.backend.id(),
            prompt_tokens = completion.usage.prompt_tokens,
            completion_tokens = completion.usage.completion_tokens,
            "Completion received"
        );

        extract_json(&completion.content)
    }
}

#[async_trait]
impl ContentGenerator for LlmGenerator {
    async fn generate_bundle(&self, request: &GenerationRequest) -> Result<Value, GeneratorError> {
        self.complete_json(PromptAssembler::build_bundle_prompt(request), self.temperature)
            .await
    }

    async fn disambiguate(&self, input: &str) -> Result<Value, GeneratorError> {
        // classification wants a steadier answer than story writing
        self.complete_json(PromptAssembler::build_disambiguation_prompt(input), 0.2)
            .await
    }
}

/// Read the first JSON object in `content`.
///
/// Models sometimes wrap JSON in code fences or add a sentence around it.
pub fn extract_json(content: &str) -> Result<Value, GeneratorError> {
    let trimmed = content.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let start = trimmed
        .find('{')
        .ok_or_else(|| GeneratorError::Malformed("no JSON object in output".to_string()))?;
    let end = trimmed
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| GeneratorError::Malformed("unterminated JSON object".to_string()))?;

    serde_json::from_str(&trimmed[start..=end]).map_err(|e| GeneratorError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use phrasal_core::{BundleLayout, SlotPools};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    #[test]
    fn test_extract_plain_and_fenced() {
        assert_eq!(extract_json(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
        assert_eq!(
            extract_json("```json\n{\"a\": [1, 2]}\n```").unwrap(),
            json!({"a": [1, 2]})
        );
        assert_eq!(
            extract_json("Here you go: {\"status\": \"invalid\"} Hope that helps.").unwrap(),
            json!({"status": "invalid"})
        );
    }

    #[test]
    fn test_extract_rejects_prose() {
        assert!(matches!(extract_json("I cannot help with that."), Err(GeneratorError::Malformed(_))));
        assert!(matches!(extract_json("} nope {"), Err(GeneratorError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_generate_sends_json_mode_prompt() {
        let backend = Arc::new(MockBackend::default().with_response(r#"{"pages": {}}"#));
        let generator = LlmGenerator::new(backend.clone());
        let request = GenerationRequest::new(
            "give up",
            &BundleLayout::three_step(),
            &SlotPools::default(),
            &mut StdRng::seed_from_u64(3),
        );

        let value = generator.generate_bundle(&request).await.unwrap();
        assert_eq!(value, json!({"pages": {}}));

        let sent = backend.last_request().unwrap();
        assert!(sent.json_output);
        assert!(sent.system_prompt.is_some());
        assert!(sent.messages[0].content.contains("\"give up\""));
    }

    #[tokio::test]
    async fn test_backend_failure_is_generator_error() {
        let backend = Arc::new(MockBackend::default().then_fail("overloaded"));
        let generator = LlmGenerator::new(backend);

        let result = generator.disambiguate("run").await;
        assert!(matches!(result, Err(GeneratorError::Llm(_))));
    }
}
