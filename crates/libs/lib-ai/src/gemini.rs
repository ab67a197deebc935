//! # Gemini Client
//!
//! [`TextProvider`] implementation for the Google Gemini
//! `generateContent` API, authenticated with an API key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use lib_core::session::{Turn, TurnRole};

use crate::error::AiError;
use crate::provider::{GenerateRequest, TextProvider};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for the Gemini generative-text API.
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a new Gemini client for the given model.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(api_key: String, model: String) -> Result<Self, AiError> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AiError::Http {
                status: 0,
                body: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            api_key,
            model,
        })
    }

    fn build_endpoint_url(&self) -> String {
        format!("{}/models/{}:generateContent", API_BASE, self.model)
    }
}

#[async_trait]
impl TextProvider for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<String, AiError> {
        let gemini_request = to_gemini_request(&request);

        let url = self.build_endpoint_url();
        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&gemini_request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| String::new());
            return Err(AiError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let gemini_response: GenerateContentResponse = response.json().await?;
        extract_text(gemini_response)
    }
}

// region: --- Wire types
//
// These map directly to the Gemini API schema.

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: SystemInstruction,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    content: Option<Content>,
}
// endregion: --- Wire types

/// Convert a provider request to the Gemini request format.
fn to_gemini_request(request: &GenerateRequest) -> GenerateContentRequest {
    let mut contents: Vec<Content> = request.history.iter().map(to_gemini_content).collect();
    contents.push(Content {
        role: "user".to_string(),
        parts: vec![Part {
            text: request.prompt.clone(),
        }],
    });

    GenerateContentRequest {
        contents,
        system_instruction: SystemInstruction {
            parts: vec![Part {
                text: request.system.clone(),
            }],
        },
        generation_config: GenerationConfig {
            max_output_tokens: request.max_tokens,
            temperature: request.temperature,
        },
    }
}

fn to_gemini_content(turn: &Turn) -> Content {
    // Gemini names the assistant role "model".
    let role = match turn.role {
        TurnRole::User => "user",
        TurnRole::Assistant => "model",
    };
    Content {
        role: role.to_string(),
        parts: vec![Part {
            text: turn.text.clone(),
        }],
    }
}

/// Pull the reply text out of a Gemini response.
fn extract_text(response: GenerateContentResponse) -> Result<String, AiError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(AiError::EmptyReply)?;

    let content = candidate.content.ok_or(AiError::EmptyReply)?;

    let text = content
        .parts
        .into_iter()
        .map(|part| part.text)
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() {
        return Err(AiError::EmptyReply);
    }
    Ok(text)
}
