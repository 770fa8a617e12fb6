//! OpenRouter LLM integration.
//!
//! Routes analysis calls through OpenRouter's unified API using the
//! OpenAI-compatible chat completions format. The model is instructed
//! to return a strict JSON verdict; responses wrapped in Markdown code
//! fences are unwrapped before parsing.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::EdgeAnalyzer;
use crate::types::{EdgeAnalysis, Market};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model: fast and cheap, good enough for screening.
const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";

const DEFAULT_MAX_TOKENS: u32 = 500;

/// Low temperature keeps the JSON contract stable.
const TEMPERATURE: f64 = 0.3;

/// Maximum retries on rate limit / server errors.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (ms).
const BASE_BACKOFF_MS: u64 = 1000;

const SYSTEM_PROMPT: &str = r#"You are an expert prediction market analyst specializing in edge detection.

Your job is to analyze a prediction market and determine if the current odds represent a potential "edge" - a mispricing where the true probability differs significantly from the market price.

For each market, you will:
1. Assess the current market probabilities
2. Consider any external context provided (news, statistics, trends)
3. Determine if the market is fairly priced or if there's an edge

IMPORTANT RULES:
- Be conservative. Only flag high-confidence edges (7+/10 confidence).
- Always explain your reasoning in 2-3 sentences.
- If you recommend a position, explain WHY that side is undervalued.
- Consider that markets are often efficient - edges are rare.
- Never hallucinate facts. If you don't know, say so.

Respond ONLY with valid JSON in this format:
{
    "confidence_score": <1-10>,
    "has_edge": <true/false>,
    "reasoning": "<2-3 sentence explanation>",
    "recommended_position": "<null or outcome name if edge exists>"
}
"#;

// ---------------------------------------------------------------------------
// API types (OpenAI-compatible)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

/// The JSON verdict the model is asked to emit.
#[derive(Debug, Deserialize)]
struct Verdict {
    #[serde(default)]
    confidence_score: Option<i64>,
    #[serde(default)]
    has_edge: bool,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    recommended_position: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct OpenRouterClient {
    http: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenRouterClient {
    pub fn new(api_key: String, model: Option<String>, max_tokens: Option<u32>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to build OpenRouter HTTP client")?;

        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        })
    }

    /// Build the per-market analysis prompt.
    pub fn build_prompt(market: &Market) -> String {
        let odds_info = market
            .outcomes
            .iter()
            .zip(market.outcome_prices.iter())
            .map(|(o, p)| format!("  - {o}: {:.1}%", p * 100.0))
            .collect::<Vec<_>>()
            .join("\n");

        let mut prompt = format!(
            "Analyze this prediction market:\n\n\
             **Market Question:** {}\n\n\
             **Current Odds:**\n{odds_info}\n",
            market.question
        );

        if let Some(desc) = &market.description {
            prompt.push_str(&format!("\n**Market Description:** {desc}\n"));
        }

        prompt.push_str(
            "\n**External Context:** None provided. Analyze based on market structure only.\n",
        );
        prompt.push_str("\nProvide your edge analysis as JSON:");
        prompt
    }

    /// Strip Markdown code fences from a model response, if present.
    pub fn strip_code_fences(text: &str) -> &str {
        let trimmed = text.trim();
        if let Some(rest) = trimmed.split_once("```json").map(|(_, r)| r) {
            if let Some((inner, _)) = rest.split_once("```") {
                return inner.trim();
            }
        }
        if let Some(rest) = trimmed.split_once("```").map(|(_, r)| r) {
            if let Some((inner, _)) = rest.split_once("```") {
                return inner.trim();
            }
        }
        trimmed
    }

    /// Parse a model response into an EdgeAnalysis for the given market.
    /// Confidence is clamped to [1, 10]; a missing score defaults to 5.
    pub fn parse_response(market: &Market, text: &str) -> Result<EdgeAnalysis> {
        let json_text = Self::strip_code_fences(text);
        let verdict: Verdict = serde_json::from_str(json_text)
            .context("Analyzer response was not the expected JSON verdict")?;

        let confidence_score = verdict.confidence_score.unwrap_or(5).clamp(1, 10) as u8;

        Ok(EdgeAnalysis {
            market_question: market.question.clone(),
            confidence_score,
            has_edge: verdict.has_edge,
            reasoning: verdict
                .reasoning
                .unwrap_or_else(|| "Analysis failed".to_string()),
            recommended_position: verdict.recommended_position,
            current_odds: market.implied_odds(),
        })
    }

    /// Send a chat completion request with retry + exponential backoff.
    async fn call_api(&self, user_message: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: TEMPERATURE,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_message.to_string(),
                },
            ],
        };

        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
                debug!(attempt, delay_ms = delay, "Retrying OpenRouter API call");
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }

            let resp = self
                .http
                .post(OPENROUTER_API_URL)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .header("X-Title", "Polyscout")
                .json(&request)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let body: ChatResponse = response
                            .json()
                            .await
                            .context("Failed to parse OpenRouter response")?;

                        let text = body
                            .choices
                            .first()
                            .and_then(|c| c.message.as_ref())
                            .map(|m| m.content.clone())
                            .unwrap_or_default();

                        if text.is_empty() {
                            anyhow::bail!("OpenRouter returned an empty completion");
                        }
                        return Ok(text);
                    }

                    // Retryable: 429 (rate limit) and 5xx
                    if status.as_u16() == 429 || status.as_u16() >= 500 {
                        let error_text = response.text().await.unwrap_or_default();
                        warn!(
                            status = %status,
                            attempt,
                            error = %error_text,
                            "Retryable OpenRouter error"
                        );
                        last_error = Some(format!("HTTP {status}: {error_text}"));
                        continue;
                    }

                    let error_text = response.text().await.unwrap_or_default();
                    anyhow::bail!("OpenRouter API error {status}: {error_text}");
                }
                Err(e) => {
                    warn!(attempt, error = %e, "OpenRouter request failed");
                    last_error = Some(format!("Request error: {e}"));
                    continue;
                }
            }
        }

        anyhow::bail!(
            "OpenRouter API failed after {} retries: {}",
            MAX_RETRIES,
            last_error.unwrap_or_default()
        )
    }
}

// ---------------------------------------------------------------------------
// EdgeAnalyzer implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl EdgeAnalyzer for OpenRouterClient {
    async fn analyze(&self, market: &Market) -> Result<EdgeAnalysis> {
        let prompt = Self::build_prompt(market);

        debug!(market_id = %market.id, model = %self.model, "Requesting edge analysis");

        let response_text = self
            .call_api(&prompt)
            .await
            .context("OpenRouter API call failed")?;

        let analysis = Self::parse_response(market, &response_text)?;

        info!(
            market_id = %market.id,
            confidence = analysis.confidence_score,
            has_edge = analysis.has_edge,
            "Edge analysis complete"
        );
        Ok(analysis)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_construction_defaults() {
        let client = OpenRouterClient::new("test-key".into(), None, None).unwrap();
        assert_eq!(client.model_name(), DEFAULT_MODEL);
        assert_eq!(client.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_client_custom_model() {
        let client = OpenRouterClient::new(
            "test-key".into(),
            Some("anthropic/claude-sonnet-4".into()),
            Some(800),
        )
        .unwrap();
        assert_eq!(client.model_name(), "anthropic/claude-sonnet-4");
        assert_eq!(client.max_tokens, 800);
    }

    #[test]
    fn test_build_prompt_contents() {
        let market = Market::sample();
        let prompt = OpenRouterClient::build_prompt(&market);
        assert!(prompt.contains("Will Bitcoin reach $100,000"));
        assert!(prompt.contains("- Yes: 35.0%"));
        assert!(prompt.contains("- No: 65.0%"));
        assert!(prompt.contains("Market Description"));
    }

    #[test]
    fn test_build_prompt_no_description() {
        let mut market = Market::sample();
        market.description = None;
        let prompt = OpenRouterClient::build_prompt(&market);
        assert!(!prompt.contains("Market Description"));
        assert!(prompt.contains("External Context"));
    }

    #[test]
    fn test_strip_code_fences_json() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(OpenRouterClient::strip_code_fences(text), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_code_fences_bare() {
        let text = "```\n{\"a\": 1}\n```";
        assert_eq!(OpenRouterClient::strip_code_fences(text), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_code_fences_none() {
        let text = "  {\"a\": 1}  ";
        assert_eq!(OpenRouterClient::strip_code_fences(text), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_response_full() {
        let market = Market::sample();
        let text = r#"{
            "confidence_score": 8,
            "has_edge": true,
            "reasoning": "The market underprices Yes.",
            "recommended_position": "Yes"
        }"#;
        let analysis = OpenRouterClient::parse_response(&market, text).unwrap();
        assert_eq!(analysis.confidence_score, 8);
        assert!(analysis.has_edge);
        assert_eq!(analysis.recommended_position.as_deref(), Some("Yes"));
        assert_eq!(analysis.current_odds[0].1, 35.0);
    }

    #[test]
    fn test_parse_response_clamps_confidence() {
        let market = Market::sample();
        let high = r#"{"confidence_score": 42, "has_edge": true, "reasoning": "r"}"#;
        let low = r#"{"confidence_score": -3, "has_edge": false, "reasoning": "r"}"#;
        assert_eq!(
            OpenRouterClient::parse_response(&market, high)
                .unwrap()
                .confidence_score,
            10
        );
        assert_eq!(
            OpenRouterClient::parse_response(&market, low)
                .unwrap()
                .confidence_score,
            1
        );
    }

    #[test]
    fn test_parse_response_defaults() {
        let market = Market::sample();
        let analysis = OpenRouterClient::parse_response(&market, "{}").unwrap();
        assert_eq!(analysis.confidence_score, 5);
        assert!(!analysis.has_edge);
        assert_eq!(analysis.reasoning, "Analysis failed");
        assert!(analysis.recommended_position.is_none());
    }

    #[test]
    fn test_parse_response_fenced() {
        let market = Market::sample();
        let text = "Sure, here is the analysis:\n```json\n{\"confidence_score\": 7, \"has_edge\": true, \"reasoning\": \"ok\"}\n```";
        let analysis = OpenRouterClient::parse_response(&market, text).unwrap();
        assert_eq!(analysis.confidence_score, 7);
    }

    #[test]
    fn test_parse_response_garbage_errors() {
        let market = Market::sample();
        assert!(OpenRouterClient::parse_response(&market, "not json at all").is_err());
    }
}
