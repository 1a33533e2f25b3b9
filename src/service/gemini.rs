/// Gemini `generateContent` client
///
/// Request shape:
///   POST {api_base}/models/{model}:generateContent
///   { "contents": [{ "role": "user", "parts": [...] }],
///     "generationConfig": { "responseModalities": ["IMAGE"] } }
///
/// Each part is either `{ "inlineData": { "mimeType", "data" } }` or
/// `{ "text": ... }`, in both directions.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CallFuture, Candidate, ContentUnit, ImageService, Modality, OutputConstraints};
use crate::error::ServiceError;
use crate::state::settings::Settings;

/// Longest slice of an error body we keep for the log
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<WireContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, alias = "inline_data", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    #[serde(default)]
    content: Option<WireContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// HTTP client for the Gemini image models
pub struct GeminiService {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GeminiService {
    /// Build a client from settings. A missing key is only reported when a
    /// call is made, so the window can still open without one.
    pub fn new(settings: &Settings, api_key: Option<String>) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint_for(&settings.api_base, &settings.model),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, units: &[ContentUnit], constraints: &OutputConstraints) -> Result<Vec<Candidate>, ServiceError> {
        let api_key = self.api_key.as_deref().ok_or(ServiceError::MissingApiKey)?;
        let body = build_request(units, constraints);

        tracing::info!("🌐 Calling {} with {} content units", self.endpoint, units.len());

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let mut body = text;
            body.truncate(floor_char_boundary(&body, MAX_ERROR_BODY));
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_response(&text)
    }
}

impl ImageService for GeminiService {
    fn call<'a>(&'a self, units: &'a [ContentUnit], constraints: &'a OutputConstraints) -> CallFuture<'a> {
        Box::pin(self.send(units, constraints))
    }
}

/// `{api_base}/models/{model}:generateContent`, tolerating a "models/" prefix
pub fn endpoint_for(api_base: &str, model: &str) -> String {
    let model = model.trim();
    let model_path = if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    };
    format!("{}/{}:generateContent", api_base.trim_end_matches('/'), model_path)
}

fn build_request(units: &[ContentUnit], constraints: &OutputConstraints) -> GenerateRequest {
    let parts = units
        .iter()
        .map(|unit| match unit {
            ContentUnit::Inline { mime_type, data } => WirePart {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: mime_type.clone(),
                    data: data.clone(),
                }),
            },
            ContentUnit::Text(text) => WirePart {
                text: Some(text.clone()),
                inline_data: None,
            },
        })
        .collect();

    let response_modalities = constraints
        .modalities
        .iter()
        .map(|modality| match modality {
            Modality::Image => "IMAGE",
        })
        .collect();

    GenerateRequest {
        contents: vec![WireContent {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config: GenerationConfig { response_modalities },
    }
}

fn parse_response(text: &str) -> Result<Vec<Candidate>, ServiceError> {
    let response: GenerateResponse =
        serde_json::from_str(text).map_err(|e| ServiceError::Malformed(e.to_string()))?;

    let candidates = response
        .candidates
        .into_iter()
        .map(|candidate| {
            if let Some(reason) = candidate.finish_reason.as_deref() {
                tracing::debug!("Candidate finished with {}", reason);
            }

            let units = candidate
                .content
                .unwrap_or_default()
                .parts
                .into_iter()
                .filter_map(|part| match (part.inline_data, part.text) {
                    (Some(inline), _) => Some(ContentUnit::Inline {
                        mime_type: inline.mime_type,
                        data: inline.data,
                    }),
                    (None, Some(text)) => Some(ContentUnit::Text(text)),
                    (None, None) => None,
                })
                .collect();

            Candidate { units }
        })
        .collect();

    Ok(candidates)
}

/// Largest index `<= max` that falls on a char boundary
fn floor_char_boundary(text: &str, max: usize) -> usize {
    if max >= text.len() {
        return text.len();
    }
    (0..=max).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0)
}
