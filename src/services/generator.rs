use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::models::report::{ReportContent, ReportKind};
use crate::models::stats::AggregatedStats;
use crate::services::claude::{ClaudeClient, CompletionClient, GenerationError};
use crate::services::prompt::{build_prompt, parse_content, SYSTEM_PROMPT};
use crate::services::template::TemplateStrategy;

/// Model identifier recorded when the template strategy produced a report.
pub const TEMPLATE_MODEL: &str = "template";

pub struct ExternalModelStrategy {
    client: Arc<dyn CompletionClient>,
    model: String,
}

impl ExternalModelStrategy {
    pub fn new(client: Arc<dyn CompletionClient>, model: String) -> Self {
        Self { client, model }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate(
        &self,
        stats: &AggregatedStats,
        kind: ReportKind,
    ) -> Result<ReportContent, GenerationError> {
        let prompt = build_prompt(stats, kind);
        let text = self.client.complete(SYSTEM_PROMPT, &prompt).await?;
        parse_content(&text)
    }
}

#[derive(Debug, Clone)]
pub struct Generated {
    pub content: ReportContent,
    pub model: String,
    pub used_external_model: bool,
}

/// Tries the external model when one is configured and falls back to the
/// template on any failure. The choice of strategy is fixed at construction.
#[derive(Clone, Default)]
pub struct ContentGenerator {
    external: Option<Arc<ExternalModelStrategy>>,
    template: TemplateStrategy,
}

impl ContentGenerator {
    pub fn template_only() -> Self {
        Self::default()
    }

    pub fn with_external(strategy: ExternalModelStrategy) -> Self {
        Self {
            external: Some(Arc::new(strategy)),
            template: TemplateStrategy,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let Some(api_key) = config.generation_api_key() else {
            tracing::info!("No model API key configured, reports use templates");
            return Self::template_only();
        };

        let timeout = Duration::from_secs(config.generation_timeout_secs);
        match ClaudeClient::new(api_key.to_string(), config.claude_model.clone(), timeout) {
            Ok(client) => {
                tracing::info!(model = %config.claude_model, "Model-backed report generation enabled");
                Self::with_external(ExternalModelStrategy::new(
                    Arc::new(client),
                    config.claude_model.clone(),
                ))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not build model client, reports use templates");
                Self::template_only()
            }
        }
    }

    pub fn is_generation_enabled(&self) -> bool {
        self.external.is_some()
    }

    pub fn model(&self) -> &str {
        self.external
            .as_ref()
            .map_or(TEMPLATE_MODEL, |e| e.model())
    }

    pub async fn generate(&self, stats: &AggregatedStats, kind: ReportKind) -> Generated {
        if let Some(external) = &self.external {
            match external.generate(stats, kind).await {
                Ok(content) => {
                    return Generated {
                        content,
                        model: external.model().to_string(),
                        used_external_model: true,
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Model generation failed, using template fallback");
                }
            }
        }
        self.generate_from_template(stats, kind)
    }

    pub fn generate_from_template(&self, stats: &AggregatedStats, kind: ReportKind) -> Generated {
        Generated {
            content: self.template.generate(stats, kind),
            model: TEMPLATE_MODEL.to_string(),
            used_external_model: false,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::aggregator::reduce;
    use crate::services::aggregator::tests::at;
    use crate::services::template::AFFIRMATIONS;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed reply (or failure), counts calls and keeps the prompts.
    pub(crate) struct StubClient {
        reply: Option<String>,
        pub calls: AtomicUsize,
        pub prompts: Mutex<Vec<String>>,
    }

    impl StubClient {
        pub(crate) fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.to_string()),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                reply: None,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for StubClient {
        async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerationError> {
            assert!(system.contains("NEVER diagnose"));
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().ok_or(GenerationError::Status {
                status: 503,
                body: "overloaded".into(),
            })
        }
    }

    fn stats() -> AggregatedStats {
        reduce(at(1, 0), at(8, 0), vec![], vec![], vec![])
    }

    #[tokio::test]
    async fn test_template_only_generator() {
        let generator = ContentGenerator::template_only();
        assert!(!generator.is_generation_enabled());
        assert_eq!(generator.model(), TEMPLATE_MODEL);

        let generated = generator.generate(&stats(), ReportKind::Weekly).await;
        assert!(!generated.used_external_model);
        assert_eq!(generated.model, TEMPLATE_MODEL);
        assert!(AFFIRMATIONS.contains(&generated.content.affirmation.as_str()));
    }

    #[tokio::test]
    async fn test_external_model_content_is_used() {
        let client = Arc::new(StubClient::replying(
            r#"Here you go: {"summary": "Steady week", "strengths": ["consistency"], "affirmation": "Keep it up"}"#,
        ));
        let generator = ContentGenerator::with_external(ExternalModelStrategy::new(
            client.clone(),
            "claude-test".into(),
        ));
        assert!(generator.is_generation_enabled());

        let generated = generator.generate(&stats(), ReportKind::Weekly).await;
        assert!(generated.used_external_model);
        assert_eq!(generated.model, "claude-test");
        assert_eq!(generated.content.summary, "Steady week");
        assert_eq!(generated.content.strengths, vec!["consistency"]);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_call_falls_back_to_template() {
        let client = Arc::new(StubClient::failing());
        let generator = ContentGenerator::with_external(ExternalModelStrategy::new(
            client.clone(),
            "claude-test".into(),
        ));

        let generated = generator.generate(&stats(), ReportKind::Weekly).await;
        assert!(!generated.used_external_model);
        assert_eq!(generated.model, TEMPLATE_MODEL);
        assert!(!generated.content.summary.is_empty());
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unparseable_reply_falls_back_to_template() {
        let generator = ContentGenerator::with_external(ExternalModelStrategy::new(
            Arc::new(StubClient::replying("I'd rather not answer in JSON.")),
            "claude-test".into(),
        ));

        let generated = generator.generate(&stats(), ReportKind::Weekly).await;
        assert!(!generated.used_external_model);
        assert!(generated.content.summary.starts_with("This week you logged 0"));
    }
}
