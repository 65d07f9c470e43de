//! Text refiner: ask a generative model to tidy raw OCR output.
//!
//! The prompt lives in [`crate::prompts`]; this module only drives the call.
//! [`TextGenerator`] is the seam between the pipeline and the model so the
//! pipeline can run against a canned generator in tests. [`LlmGenerator`] is
//! the production implementation on top of `edgequake-llm`.

use crate::config::{AppConfig, DEFAULT_PROVIDER};
use crate::error::HwOcrError;
use crate::prompts::refine_prompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, GeminiProvider, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// A prompt-in, text-out completion backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, HwOcrError>;
}

/// [`TextGenerator`] backed by any `edgequake-llm` provider.
pub struct LlmGenerator {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmGenerator {
    /// Wrap an already constructed provider.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AppConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }

    /// Create the configured provider.
    ///
    /// Gemini is built from `config.gemini_api_key` directly. Other
    /// providers go through [`ProviderFactory`], which reads their API keys
    /// from the environment.
    pub fn from_config(config: &AppConfig) -> Result<Self, HwOcrError> {
        let provider = build_provider(config)?;
        info!("Refine model: {}/{}", provider.name(), provider.model());
        Ok(Self::new(provider, config))
    }
}

fn build_provider(config: &AppConfig) -> Result<Arc<dyn LLMProvider>, HwOcrError> {
    if config.provider_name.eq_ignore_ascii_case(DEFAULT_PROVIDER) {
        let gemini = GeminiProvider::new(config.gemini_api_key.clone()).with_model(&config.model);
        return Ok(Arc::new(gemini));
    }
    ProviderFactory::create_llm_provider(&config.provider_name, &config.model).map_err(|e| {
        HwOcrError::ProviderNotConfigured {
            provider: config.provider_name.clone(),
            hint: format!("{e}"),
        }
    })
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, HwOcrError> {
        let messages = vec![ChatMessage::user(prompt)];
        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| HwOcrError::RefineFailed {
                detail: format!("{e}"),
            })?;
        debug!(
            "Refine call: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Build `CompletionOptions` from the app config.
fn build_options(config: &AppConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Refine `raw_text` through `generator`.
///
/// The answer is returned with surrounding whitespace trimmed. There is no
/// retry; a failure or a timeout ends the interaction and the user retries.
pub async fn refine(
    generator: &dyn TextGenerator,
    raw_text: &str,
    timeout_secs: u64,
) -> Result<String, HwOcrError> {
    let start = Instant::now();
    let prompt = refine_prompt(raw_text);
    info!("Refining {} chars of OCR text", raw_text.chars().count());

    let answer = timeout(Duration::from_secs(timeout_secs), generator.generate(&prompt))
        .await
        .map_err(|_| HwOcrError::Timeout {
            stage: "AI refinement",
            secs: timeout_secs,
        })?
        .inspect_err(|e| warn!("Refine failed after {:?}: {}", start.elapsed(), e))?;

    debug!("Refined text ready in {:?}", start.elapsed());
    Ok(answer.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_GEMINI_API_KEY;
    use std::sync::Mutex;

    struct Recording {
        answer: &'static str,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for Recording {
        async fn generate(&self, prompt: &str) -> Result<String, HwOcrError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.answer.to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl TextGenerator for Failing {
        async fn generate(&self, _: &str) -> Result<String, HwOcrError> {
            Err(HwOcrError::RefineFailed {
                detail: "503 Service Unavailable".into(),
            })
        }
    }

    #[test]
    fn build_options_defaults() {
        let config = AppConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[test]
    fn gemini_uses_configured_key_and_model() {
        let config = AppConfig::builder()
            .password("rahasia")
            .credentials_json("{}")
            .gemini_api_key("explicit-key")
            .model("gemini-2.5-pro")
            .build()
            .unwrap();
        let before = std::env::var(ENV_GEMINI_API_KEY).ok();

        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.model(), "gemini-2.5-pro");
        // the configured key is passed in, never read back from or written to the environment
        assert_eq!(std::env::var(ENV_GEMINI_API_KEY).ok(), before);
    }

    #[tokio::test]
    async fn answer_is_trimmed() {
        let gen = Recording {
            answer: "\n\n  Soal 1: Hitunglah.  \n",
            prompts: Mutex::new(Vec::new()),
        };
        assert_eq!(refine(&gen, "soal 1 hitunglah", 5).await.unwrap(), "Soal 1: Hitunglah.");
    }

    #[tokio::test]
    async fn prompt_embeds_raw_text() {
        let gen = Recording {
            answer: "ok",
            prompts: Mutex::new(Vec::new()),
        };
        refine(&gen, "catatan mentah", 5).await.unwrap();
        let prompts = gen.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0], refine_prompt("catatan mentah"));
    }

    #[tokio::test]
    async fn generator_error_propagates() {
        let err = refine(&Failing, "x", 5).await.unwrap_err();
        assert!(matches!(err, HwOcrError::RefineFailed { .. }));
    }
}
