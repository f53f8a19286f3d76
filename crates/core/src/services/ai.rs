//! AI enrichment of policies: summary and pros/cons.
//!
//! The analyzer is optional. Any missing configuration, error or timeout
//! falls back to deterministic text so policy creation never fails here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use policyai_common::config::AiConfig;
use policyai_common::{AppError, AppResult};
use serde::Deserialize;

/// Summaries up to this many characters are used verbatim as fallback.
const FALLBACK_SUMMARY_CHARS: usize = 100;

/// Number of pros and cons kept from a generated analysis.
const POINTS_PER_SIDE: usize = 3;

const FALLBACK_PROS: [&str; 3] = [
    "Addresses an important issue",
    "Could benefit citizens",
    "Shows policy initiative",
];

const FALLBACK_CONS: [&str; 3] = [
    "Implementation details unclear",
    "Funding sources not specified",
    "Timeline not defined",
];

/// Generated arguments for and against a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProsCons {
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

impl ProsCons {
    /// Generic arguments used when no analysis is available.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            pros: FALLBACK_PROS.iter().map(ToString::to_string).collect(),
            cons: FALLBACK_CONS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Text generation backend.
#[async_trait]
pub trait PolicyAnalyzer: Send + Sync {
    /// Generate a short neutral summary.
    async fn generate_summary(
        &self,
        title: &str,
        description: &str,
        category: &str,
    ) -> AppResult<String>;

    /// Generate pros and cons.
    async fn generate_pros_cons(
        &self,
        title: &str,
        description: &str,
        category: &str,
    ) -> AppResult<ProsCons>;
}

/// Summary used when the analyzer is unavailable.
#[must_use]
pub fn fallback_summary(description: &str) -> String {
    if description.chars().count() <= FALLBACK_SUMMARY_CHARS {
        description.to_string()
    } else {
        let head: String = description.chars().take(FALLBACK_SUMMARY_CHARS).collect();
        format!("{head}...")
    }
}

/// Parse a `PROS:` / `CONS:` numbered list into exactly three points per side.
#[must_use]
pub fn parse_pros_cons(text: &str) -> ProsCons {
    #[derive(Clone, Copy)]
    enum Section {
        Pros,
        Cons,
    }

    let mut pros = Vec::new();
    let mut cons = Vec::new();
    let mut section = None;

    for line in text.lines().map(str::trim) {
        let upper = line.to_uppercase();
        if upper.contains("PROS:") {
            section = Some(Section::Pros);
            continue;
        }
        if upper.contains("CONS:") {
            section = Some(Section::Cons);
            continue;
        }

        let is_point = line
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '•' || c == '*');
        if !is_point {
            continue;
        }

        let cleaned = line
            .trim_start_matches(|c: char| c.is_ascii_digit() || ".-•*) ".contains(c))
            .trim();
        if cleaned.is_empty() {
            continue;
        }

        match section {
            Some(Section::Pros) => pros.push(cleaned.to_string()),
            Some(Section::Cons) => cons.push(cleaned.to_string()),
            None => {}
        }
    }

    pros.truncate(POINTS_PER_SIDE);
    cons.truncate(POINTS_PER_SIDE);
    pros.resize(POINTS_PER_SIDE, "Additional benefit needs analysis".to_string());
    cons.resize(POINTS_PER_SIDE, "Additional concern needs analysis".to_string());

    ProsCons { pros, cons }
}

/// Google Gemini `generateContent` client.
pub struct GeminiAnalyzer {
    api_key: String,
    model: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl GeminiAnalyzer {
    /// Create a new Gemini analyzer.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(api_key: String, config: &AiConfig) -> Self {
        Self {
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    async fn generate(&self, prompt: String) -> AppResult<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = serde_json::json!({
            "contents": [
                {"parts": [{"text": prompt}]}
            ],
        });

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Gemini request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Gemini API error: {status} - {body}"
            )));
        }

        #[derive(Deserialize)]
        struct GenerateResponse {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }

        #[derive(Deserialize)]
        struct Candidate {
            content: Content,
        }

        #[derive(Deserialize)]
        struct Content {
            #[serde(default)]
            parts: Vec<Part>,
        }

        #[derive(Deserialize)]
        struct Part {
            #[serde(default)]
            text: String,
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("Failed to parse Gemini response: {e}"))
        })?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::ExternalService(
                "Gemini returned no text".to_string(),
            ));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl PolicyAnalyzer for GeminiAnalyzer {
    async fn generate_summary(
        &self,
        title: &str,
        description: &str,
        category: &str,
    ) -> AppResult<String> {
        let prompt = format!(
            "You are a policy analyst. Generate a concise, neutral summary (40-50 words) of this policy proposal.\n\n\
             Policy Title: {title}\nCategory: {category}\nFull Description: {description}\n\n\
             Summary (40-50 words, neutral tone):"
        );
        self.generate(prompt).await
    }

    async fn generate_pros_cons(
        &self,
        title: &str,
        description: &str,
        category: &str,
    ) -> AppResult<ProsCons> {
        let prompt = format!(
            "You are a policy analyst. Analyze this policy and provide exactly 3 PROS (benefits/advantages) \
             and 3 CONS (concerns/drawbacks).\n\n\
             Policy Title: {title}\nCategory: {category}\nDescription: {description}\n\n\
             Format your response EXACTLY like this:\n\
             PROS:\n1. [First benefit]\n2. [Second benefit]\n3. [Third benefit]\n\n\
             CONS:\n1. [First concern]\n2. [Second concern]\n3. [Third concern]\n\n\
             Keep each point concise (10-15 words). Be balanced and objective."
        );
        let text = self.generate(prompt).await?;
        Ok(parse_pros_cons(&text))
    }
}

/// Enrichment applied to a new policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEnrichment {
    pub summary: String,
    pub pros_cons: ProsCons,
}

/// Bounded-time AI enrichment with deterministic fallbacks.
#[derive(Clone)]
pub struct AiService {
    analyzer: Option<Arc<dyn PolicyAnalyzer>>,
    timeout: Duration,
}

impl AiService {
    /// Create an AI service. `None` disables generation.
    #[must_use]
    pub fn new(analyzer: Option<Arc<dyn PolicyAnalyzer>>, timeout: Duration) -> Self {
        Self { analyzer, timeout }
    }

    /// Create an AI service from configuration.
    #[must_use]
    pub fn from_config(config: &AiConfig) -> Self {
        let analyzer = config.gemini_api_key.as_ref().map(|key| {
            Arc::new(GeminiAnalyzer::new(key.clone(), config)) as Arc<dyn PolicyAnalyzer>
        });
        Self::new(analyzer, Duration::from_secs(config.timeout_secs))
    }

    /// Service with generation disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None, Duration::from_secs(1))
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.analyzer.is_some()
    }

    /// Summary and pros/cons for a new policy.
    ///
    /// A caller-provided summary is kept and only pros/cons are generated.
    pub async fn enrich(
        &self,
        title: &str,
        description: &str,
        category: &str,
        provided_summary: Option<String>,
    ) -> PolicyEnrichment {
        let summary = match provided_summary {
            Some(summary) => summary,
            None => self.summary(title, description, category).await,
        };
        let pros_cons = self.pros_cons(title, description, category).await;

        PolicyEnrichment { summary, pros_cons }
    }

    async fn summary(&self, title: &str, description: &str, category: &str) -> String {
        let Some(analyzer) = &self.analyzer else {
            return fallback_summary(description);
        };

        match tokio::time::timeout(
            self.timeout,
            analyzer.generate_summary(title, description, category),
        )
        .await
        {
            Ok(Ok(summary)) => summary,
            Ok(Err(e)) => {
                tracing::warn!(title = %title, error = %e, "AI summary failed, using fallback");
                fallback_summary(description)
            }
            Err(_) => {
                tracing::warn!(title = %title, "AI summary timed out, using fallback");
                fallback_summary(description)
            }
        }
    }

    async fn pros_cons(&self, title: &str, description: &str, category: &str) -> ProsCons {
        let Some(analyzer) = &self.analyzer else {
            return ProsCons::fallback();
        };

        match tokio::time::timeout(
            self.timeout,
            analyzer.generate_pros_cons(title, description, category),
        )
        .await
        {
            Ok(Ok(pros_cons)) => pros_cons,
            Ok(Err(e)) => {
                tracing::warn!(title = %title, error = %e, "AI pros/cons failed, using fallback");
                ProsCons::fallback()
            }
            Err(_) => {
                tracing::warn!(title = %title, "AI pros/cons timed out, using fallback");
                ProsCons::fallback()
            }
        }
    }
}
