//! OpenAI-compatible chat client for enrichment.
//!
//! Builds one prompt per batch (names enumerated 1-indexed, fixed JSON-schema
//! instruction), calls `/chat/completions`, strips Markdown code fences the
//! model may wrap its output in, and parses the remainder as a JSON list of
//! [`EnrichmentResult`]s. The raw response body is written to a debug
//! artifact before parsing, overwritten on every call, so the last malformed
//! response is always available for post-mortem inspection.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::config::ModelConfig;
use crate::enrich::{EnrichError, EnrichmentModel, EnrichmentResult};

const PROMPT_INSTRUCTION: &str = "For each of the following foods or dishes, return one JSON \
object with exactly these fields: \"name\", \"definition\" (at least two sentences), \
\"category\" (e.g. postres, carnes, bebidas), \"subcategory\", \"origin\" (country or \
region), \"preparation_method\", \"ingredients\" (list of strings), \"serving_style\" and \
\"equivalents\" (alternative names used in other countries, list of strings). Write all \
values in Spanish. Respond with a JSON list only, one object per food, in the same order. \
The foods are:\n";

pub struct OpenAiEnrichment {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    debug_artifact: Option<PathBuf>,
}

impl OpenAiEnrichment {
    pub fn new(config: &ModelConfig, api_key: &str) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing model API key");

        let mut headers = reqwest::header::HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .context("invalid model API key")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build model HTTP client")?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            debug_artifact: config.debug_artifact_path(),
        })
    }

    /// Persist the raw response for troubleshooting. Failure to write is a
    /// warning, never fatal to the call.
    fn write_debug_artifact(&self, content: &str) {
        if let Some(path) = &self.debug_artifact {
            if let Err(err) = std::fs::write(path, content) {
                warn!(path = %path.display(), error = %err, "failed to write debug artifact");
            }
        }
    }

    /// Persist the raw content, then parse it. The write comes first so the
    /// offending response survives for inspection when parsing fails.
    fn capture_and_parse(&self, content: &str) -> Result<Vec<EnrichmentResult>, EnrichError> {
        self.write_debug_artifact(content);
        parse_results(content).inspect_err(|err| {
            warn!(error = %err, raw = preview(content, 200), "model returned unparseable content");
        })
    }
}

impl EnrichmentModel for OpenAiEnrichment {
    fn enrich_batch(&self, names: &[String]) -> Result<Vec<EnrichmentResult>, EnrichError> {
        let prompt = build_prompt(names);
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|err| EnrichError::ModelCall(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EnrichError::ModelCall(format!(
                "model endpoint returned {status}: {text}"
            )));
        }

        let parsed: ChatResponse = response.json().map_err(|err| {
            EnrichError::ModelCall(format!("unreadable chat completion envelope: {err}"))
        })?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        self.capture_and_parse(&content)
    }
}

/// Enumerate the batch names 1-indexed under the fixed instruction.
fn build_prompt(names: &[String]) -> String {
    let mut prompt = String::from(PROMPT_INSTRUCTION);
    for (i, name) in names.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, name));
    }
    prompt
}

/// Parse fence-stripped model output as a JSON list of results.
fn parse_results(content: &str) -> Result<Vec<EnrichmentResult>, EnrichError> {
    let stripped = strip_code_fences(content);
    serde_json::from_str(stripped).map_err(|err| EnrichError::ResponseParse(err.to_string()))
}

/// Remove a surrounding Markdown code fence (```json ... ``` or ``` ... ```).
/// Content without a fence passes through trimmed.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the end of the opening line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => return trimmed,
    };
    let rest = rest.trim_end();
    rest.strip_suffix("```").map(str::trim_end).unwrap_or(rest)
}

fn preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn prompt_enumerates_names_one_indexed() {
        let names = vec!["Milanesa".to_string(), "Flan".to_string()];
        let prompt = build_prompt(&names);
        assert!(prompt.starts_with(PROMPT_INSTRUCTION));
        assert!(prompt.contains("1. Milanesa\n"));
        assert!(prompt.contains("2. Flan\n"));
    }

    #[test]
    fn fences_with_language_tag_are_stripped() {
        let content = "```json\n[{\"name\": \"Flan\"}]\n```";
        assert_eq!(strip_code_fences(content), "[{\"name\": \"Flan\"}]");
    }

    #[test]
    fn fences_without_language_tag_are_stripped() {
        let content = "```\n[]\n```";
        assert_eq!(strip_code_fences(content), "[]");
    }

    #[test]
    fn unfenced_content_passes_through_trimmed() {
        assert_eq!(strip_code_fences("  [1, 2]  \n"), "[1, 2]");
    }

    #[test]
    fn unterminated_fence_still_yields_inner_content() {
        let content = "```json\n[{\"name\": \"Flan\"}]";
        assert_eq!(strip_code_fences(content), "[{\"name\": \"Flan\"}]");
    }

    #[test]
    fn parse_results_accepts_fenced_list() {
        let content = "```json\n[{\"name\": \"Flan\", \"category\": \"postres\"}]\n```";
        let results = parse_results(content).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].category.as_deref(), Some("postres"));
    }

    #[test]
    fn parse_results_tolerates_unknown_fields() {
        let content = r#"[{"name": "Flan", "calorias": 300, "definition": "Postre."}]"#;
        let results = parse_results(content).unwrap();
        assert_eq!(results[0].definition.as_deref(), Some("Postre."));
    }

    #[test]
    fn parse_results_rejects_non_list_content() {
        let err = parse_results(r#"{"name": "Flan"}"#).unwrap_err();
        assert!(matches!(err, EnrichError::ResponseParse(_)));
    }

    #[test]
    fn parse_results_rejects_prose() {
        let err = parse_results("Lo siento, no puedo ayudar con eso.").unwrap_err();
        assert!(matches!(err, EnrichError::ResponseParse(_)));
    }

    #[test]
    fn chat_request_wire_shape() {
        let request = ChatRequest {
            model: "gpt-3.5-turbo",
            temperature: 0.7,
            max_tokens: 1500,
            messages: vec![ChatMessage {
                role: "user",
                content: "hola",
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-3.5-turbo");
        assert_eq!(value["max_tokens"], 1500);
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "hola");
    }

    #[test]
    fn preview_truncates_long_content() {
        let content = "x".repeat(300);
        let shown = preview(&content, 200);
        assert_eq!(shown.chars().count(), 203);
        assert!(shown.ends_with("..."));
        assert_eq!(preview("corto", 200), "corto");
    }

    #[test]
    fn debug_artifact_holds_the_raw_response_even_when_parsing_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last_model_response.txt");
        let config = ModelConfig {
            debug_artifact: path.to_string_lossy().into_owned(),
            ..ModelConfig::default()
        };
        let client = OpenAiEnrichment::new(&config, "sk-test").unwrap();

        let err = client
            .capture_and_parse("Lo siento, no puedo ayudar con eso.")
            .unwrap_err();
        assert!(matches!(err, EnrichError::ResponseParse(_)));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Lo siento, no puedo ayudar con eso."
        );

        // Overwritten on the next call, not appended
        let results = client.capture_and_parse("[]").unwrap();
        assert!(results.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }
}
