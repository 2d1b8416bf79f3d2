//! Prompt assembly for bundle generation and disambiguation.
//!
//! Wording is free to change; the response shapes requested here are the ones
//! [`phrasal_core::assemble_bundle`] and [`phrasal_core::DisambiguationResponse`] read.

use phrasal_core::{MeaningField, MAX_CANDIDATES};

use crate::generator::GenerationRequest;

/// Builds prompts for the LLM-backed generator.
pub struct PromptAssembler;

impl PromptAssembler {
    /// System prompt shared by every generation call.
    pub fn build_system_prompt() -> String {
        let mut prompt = String::new();

        prompt.push_str("# ROLE\n\n");
        prompt.push_str("You write short learning material for people studying English expressions.\n");
        prompt.push_str("Every story uses the expression naturally, in the requested sense.\n\n");

        prompt.push_str("## RULES\n\n");
        prompt.push_str("1. Respect each page's sentence count exactly\n");
        prompt.push_str("2. Each page is a different scene; do not reuse wording between pages\n");
        prompt.push_str("3. Fill every meaning field; never leave one blank\n");
        prompt.push_str("4. Reply with a single JSON object and nothing else\n");

        prompt
    }

    /// User prompt for one generation attempt.
    pub fn build_bundle_prompt(request: &GenerationRequest) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!("Expression: \"{}\"\n", request.expression));
        match &request.sense_label {
            Some(sense) => prompt.push_str(&format!("Sense: {} (domain: {})\n\n", sense, request.domain)),
            None => prompt.push_str("Sense: its most common meaning\n\n"),
        }

        prompt.push_str("## PAGES\n\n");
        for (i, page) in request.pages.iter().enumerate() {
            prompt.push_str(&format!(
                "{}. `{}`: {}; topic {}, mood {}, setting {}\n",
                i + 1,
                page.spec.key,
                page.spec.describe_range(),
                page.slot.topic,
                page.slot.mood,
                page.slot.setting
            ));
        }

        let page_keys: Vec<String> = request
            .pages
            .iter()
            .map(|p| format!("\"{}\": {{\"story\": \"...\", \"topicTag\": \"...\", \"moodTag\": \"...\"}}", p.spec.key))
            .collect();
        let meaning_keys: Vec<String> = MeaningField::ORDER
            .iter()
            .map(|f| format!("\"{}\": \"...\"", camel_case(f.as_str())))
            .collect();

        prompt.push_str("\n## RESPONSE\n\n");
        prompt.push_str(&format!(
            "{{\"pages\": {{{}}}, \"meaning\": {{{}}}, \"selectionMeta\": {{\"selectedPhrase\": \"...\", \"selectedSenseLabel\": \"...\", \"selectedDomain\": \"general|tech|art|business|science|daily\"}}}}\n",
            page_keys.join(", "),
            meaning_keys.join(", ")
        ));

        prompt
    }

    /// User prompt asking whether an input needs disambiguation.
    pub fn build_disambiguation_prompt(input: &str) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!("Learner input: \"{}\"\n\n", input));
        prompt.push_str("Decide which of these applies and answer with the matching JSON shape:\n\n");
        prompt.push_str("- Not a usable English expression:\n");
        prompt.push_str("  {\"status\": \"invalid\", \"reasonMessage\": \"...\", \"retryHint\": \"...\"}\n");
        prompt.push_str(&format!(
            "- Several plausible expressions or senses (at most {}):\n",
            MAX_CANDIDATES
        ));
        prompt.push_str("  {\"status\": \"needs_selection\", \"candidates\": [{\"id\": \"1\", \"phrase\": \"...\", \"senseLabel\": \"...\", \"shortHint\": \"...\", \"domains\": [\"general\"]}]}\n");
        prompt.push_str("- One clear sense:\n");
        prompt.push_str("  {\"status\": \"ready\", \"selected\": {\"phrase\": \"...\", \"senseLabel\": \"...\", \"domain\": \"general\"}, \"bundle\": {\"pages\": {...}, \"meaning\": {...}}}\n");

        prompt
    }
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
