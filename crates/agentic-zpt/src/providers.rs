//! Text generation and concept extraction capabilities.

use async_trait::async_trait;

use crate::keywords::extract_keywords;
use crate::types::{ZptError, ZptResult};

/// Options passed to a text generator.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub max_tokens: usize,
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: 400,
            temperature: 0.2,
        }
    }
}

/// An LLM-like text completion capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> ZptResult<String>;
}

/// Concept extraction capability.
#[async_trait]
pub trait ConceptExtractor: Send + Sync {
    async fn extract_concepts(&self, text: &str) -> ZptResult<Vec<String>>;
}

/// Generator used when no provider is configured. Always unavailable.
#[derive(Debug, Clone, Default)]
pub struct UnavailableGenerator;

#[async_trait]
impl TextGenerator for UnavailableGenerator {
    async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> ZptResult<String> {
        Err(ZptError::ServiceUnavailable(
            "no text generation provider is configured".to_string(),
        ))
    }
}

/// Frequency-based concept extraction with no external calls.
#[derive(Debug, Clone)]
pub struct KeywordConceptExtractor {
    pub limit: usize,
}

impl Default for KeywordConceptExtractor {
    fn default() -> Self {
        Self { limit: 8 }
    }
}

#[async_trait]
impl ConceptExtractor for KeywordConceptExtractor {
    async fn extract_concepts(&self, text: &str) -> ZptResult<Vec<String>> {
        Ok(extract_keywords(text, self.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unavailable_generator_reports_service_error() {
        let err = UnavailableGenerator
            .generate("hi", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "EXTERNAL_SERVICE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn keyword_extractor_limits_output() {
        let ex = KeywordConceptExtractor { limit: 2 };
        let concepts = ex
            .extract_concepts("graph graph memory memory zoom")
            .await
            .unwrap();
        assert_eq!(concepts, vec!["graph", "memory"]);
    }
}
