use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

/// Body of a `generateContent` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRequest {
    pub contents: Vec<Content>,
}

impl ModelRequest {
    pub fn single(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content { parts }],
        }
    }

    /// Concatenated text of every text part.
    pub fn text(&self) -> String {
        self.contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Text generation backend the handlers talk to.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Send one request and return the text of the first candidate.
    async fn generate(&self, request: &ModelRequest) -> Result<String, PipelineError>;
}

pub struct GeminiService {
    api_key: String,
    model: String,
    api_base: String,
    client: reqwest::Client,
}

impl GeminiService {
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_base: config.api_base.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl GenerativeModel for GeminiService {
    async fn generate(&self, request: &ModelRequest) -> Result<String, PipelineError> {
        log::info!("🤖 Sending request to Gemini with model: {}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await?;

        let status = response.status();
        log::debug!("📥 Gemini response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("❌ Gemini API error ({}): {}", status, body);
            return Err(PipelineError::UpstreamCallFailed {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.text().await?;
        log::debug!("📄 Raw Gemini response size: {} bytes", raw.len());

        let parsed: GenerateContentResponse = serde_json::from_str(&raw)
            .map_err(|e| PipelineError::MalformedUpstreamResponse(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| {
                PipelineError::MalformedUpstreamResponse(
                    "missing candidates[0].content.parts[0].text".to_string(),
                )
            })?;

        log::debug!("💬 Gemini answer: {}", text);
        Ok(text)
    }
}
