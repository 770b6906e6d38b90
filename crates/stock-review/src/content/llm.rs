//! Narrative generation backed by a text-generation provider

use super::{NarrativeGenerator, ReviewContext, fallback_sections, prompts};
use crate::config::ReviewConfig;
use crate::error::{Result, ReviewError};
use crate::schema::Section;
use async_trait::async_trait;
use review_llm::providers::{AnthropicProvider, OpenAIProvider};
use review_llm::{CompletionRequest, LLMError, LLMProvider, Message};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};

const DEFAULT_MAX_TOKENS: usize = 4000;

/// Narrative providers in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrativeBackend {
    Anthropic,
    OpenAI,
}

impl NarrativeBackend {
    pub const PRIORITY: [NarrativeBackend; 2] = [NarrativeBackend::Anthropic, NarrativeBackend::OpenAI];

    /// `None` when the backend has no credentials configured
    pub fn build(
        self,
        config: &ReviewConfig,
    ) -> Option<std::result::Result<LlmNarrativeGenerator, LLMError>> {
        match self {
            NarrativeBackend::Anthropic => {
                let key = config.anthropic_api_key.as_deref()?;
                Some(AnthropicProvider::new(key).map(|provider| {
                    LlmNarrativeGenerator::new(Arc::new(provider), config.anthropic_model.clone())
                        .with_temperature(0.3)
                }))
            }
            NarrativeBackend::OpenAI => {
                let key = config.openai_api_key.as_deref()?;
                Some(OpenAIProvider::new(key).map(|provider| {
                    LlmNarrativeGenerator::new(Arc::new(provider), config.openai_model.clone())
                        .with_temperature(0.7)
                        .with_json_output(true)
                }))
            }
        }
    }
}

/// Generates review sections through any [`LLMProvider`]
pub struct LlmNarrativeGenerator {
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
    max_tokens: usize,
    json_output: bool,
}

impl LlmNarrativeGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.3,
            max_tokens: DEFAULT_MAX_TOKENS,
            json_output: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Ask the provider for a JSON object response
    pub fn with_json_output(mut self, enabled: bool) -> Self {
        self.json_output = enabled;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request_sections(&self, ctx: &ReviewContext<'_>) -> Result<Vec<Section>> {
        let prompt = prompts::sections_prompt(ctx)?;

        let request = CompletionRequest::builder(&self.model)
            .system(prompts::system_prompt(ctx.lang))
            .add_message(Message::user(prompt))
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .json_output(self.json_output)
            .build();

        let response = self.provider.complete(request).await.map_err(|e| {
            ReviewError::Internal(format!("{} completion failed: {e}", self.provider.name()))
        })?;

        debug!(
            tokens = response.usage.total(),
            stop_reason = ?response.stop_reason,
            "Narrative completion received"
        );

        parse_sections(response.text())
    }
}

#[async_trait]
impl NarrativeGenerator for LlmNarrativeGenerator {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn generate_sections(&self, ctx: &ReviewContext<'_>) -> Vec<Section> {
        info!(provider = self.name(), symbol = ctx.symbol, "Generating narrative sections");

        match self.request_sections(ctx).await {
            Ok(sections) => sections,
            Err(e) => {
                error!(provider = self.name(), error = %e, "Narrative generation failed, using fallback");
                fallback_sections(ctx)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct SectionsPayload {
    #[serde(default)]
    sections: Vec<Section>,
}

/// Isolate the JSON document inside a model reply
///
/// Prefers a ```` ```json ```` fence, then any fence, then the whole text.
pub fn extract_json_payload(text: &str) -> &str {
    let body = if let Some((_, rest)) = text.split_once("```json") {
        rest.split_once("```").map_or(rest, |(body, _)| body)
    } else if let Some((_, rest)) = text.split_once("```") {
        rest.split_once("```").map_or(rest, |(body, _)| body)
    } else {
        text
    };
    body.trim()
}

/// Parse `{"sections": [...]}` out of a model reply
///
/// An empty section list counts as a failure.
pub fn parse_sections(text: &str) -> Result<Vec<Section>> {
    let payload = extract_json_payload(text);

    let parsed: SectionsPayload = match serde_json::from_str(payload) {
        Ok(parsed) => parsed,
        Err(first) => outermost_object(payload)
            .and_then(|object| serde_json::from_str(object).ok())
            .ok_or_else(|| {
                let preview: String = payload.chars().take(200).collect();
                debug!(response = %preview, "Unparsable narrative response");
                ReviewError::ContentParse(format!("Response is not valid sections JSON: {first}"))
            })?,
    };

    if parsed.sections.is_empty() {
        return Err(ReviewError::ContentParse(
            "Response contained no sections".to_string(),
        ));
    }

    Ok(parsed.sections)
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Distribution, PriceTargets, score_consensus};
    use crate::api::CompanyProfile;
    use crate::locale::Language;
    use crate::schema::KpiData;
    use review_llm::{CompletionResponse, StopReason, TokenUsage};
    use std::sync::Mutex;

    /// Replies with a scripted text or a scripted failure
    struct ScriptedProvider {
        reply: std::result::Result<String, String>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn complete(&self, request: CompletionRequest) -> review_llm::Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request);
            match &self.reply {
                Ok(text) => Ok(CompletionResponse {
                    message: Message::assistant(text.clone()),
                    stop_reason: StopReason::EndTurn,
                    usage: TokenUsage::default(),
                }),
                Err(message) => Err(LLMError::RequestFailed(message.clone())),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    async fn sections_from(provider: Arc<ScriptedProvider>) -> Vec<Section> {
        let profile = CompanyProfile::default();
        let kpi = KpiData {
            price: 50.0,
            ..KpiData::default()
        };
        let consensus = score_consensus(Distribution::default(), PriceTargets::default(), 50.0);
        let ctx = ReviewContext {
            symbol: "ACME",
            company_name: "Acme Corp",
            profile: &profile,
            kpi: &kpi,
            consensus: &consensus,
            lang: Language::English,
        };

        LlmNarrativeGenerator::new(provider, "test-model")
            .with_json_output(true)
            .generate_sections(&ctx)
            .await
    }

    #[test]
    fn test_extract_json_fence() {
        let text = "Here you go:\n```json\n{\"sections\": []}\n```\nEnjoy";
        assert_eq!(extract_json_payload(text), "{\"sections\": []}");

        let text = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json_payload(text), "{\"a\": 1}");

        assert_eq!(extract_json_payload("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_sections() {
        let sections = parse_sections(
            r#"```json
{"sections": [{"id": "tl_dr", "title": "In short", "html": "<p>ok</p>"}]}
```"#,
        )
        .unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].id, "tl_dr");
    }

    #[test]
    fn test_parse_sections_with_surrounding_prose() {
        let sections = parse_sections(
            r#"Sure! {"sections": [{"id": "risks", "title": "Risks", "html": "<ul></ul>"}]} Hope this helps."#,
        )
        .unwrap();
        assert_eq!(sections[0].id, "risks");
    }

    #[test]
    fn test_parse_sections_rejects_garbage_and_empty() {
        assert!(matches!(
            parse_sections("not json at all"),
            Err(ReviewError::ContentParse(_))
        ));
        assert!(matches!(
            parse_sections(r#"{"sections": []}"#),
            Err(ReviewError::ContentParse(_))
        ));
    }

    #[tokio::test]
    async fn test_valid_reply_passes_through() {
        let provider = Arc::new(ScriptedProvider::replying(
            r#"{"sections": [{"id": "tl_dr", "title": "In short", "html": "<p>Acme</p>"}, {"id": "risks", "title": "Risks", "html": "<ul></ul>"}]}"#,
        ));
        let sections = sections_from(provider.clone()).await;

        assert_eq!(sections.len(), 2);
        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "test-model");
        assert!(requests[0].json_output);
        assert!(requests[0].system.is_some());
    }

    #[tokio::test]
    async fn test_invalid_json_falls_back() {
        let sections = sections_from(Arc::new(ScriptedProvider::replying("{ broken"))).await;

        assert_eq!(sections.len(), 1);
        assert!(sections[0].html.contains("Acme Corp"));
        assert!(sections[0].html.contains("ACME"));
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back() {
        let sections = sections_from(Arc::new(ScriptedProvider::failing("boom"))).await;

        assert_eq!(sections.len(), 1);
        assert!(sections[0].html.contains("ACME"));
    }

    #[test]
    fn test_backend_requires_credentials() {
        let config = ReviewConfig::default();
        assert!(NarrativeBackend::Anthropic.build(&config).is_none());
        assert!(NarrativeBackend::OpenAI.build(&config).is_none());

        let config = ReviewConfig::builder().openai_api_key("sk-test").build().unwrap();
        let generator = NarrativeBackend::OpenAI.build(&config).unwrap().unwrap();
        assert_eq!(generator.model(), "gpt-4o");
    }
}
