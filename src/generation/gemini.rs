//! Gemini `generateContent` client
//!
//! Sends the captured photo inline with a costume prompt and expects an
//! inline image part back.

use super::config::GenerationConfig;
use super::ImageGenerator;
use crate::camera::StillImage;
use crate::{CostumeError, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    inline_data: Option<GeminiInlineData>,
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    message: String,
}

/// Prompt asking for the person in the photo to be dressed as `subject`
pub fn costume_prompt(subject: &str) -> String {
    format!(
        "Edit this photo so the person is wearing a playful, high-quality costume of the \
         Pokémon {subject}. Keep their face, expression and pose recognisable, keep the \
         original framing, and make the costume look handmade and photorealistic. \
         Return only the edited image."
    )
}

/// Generation backed by the Gemini REST API
pub struct GeminiGenerator {
    config: GenerationConfig,
    agent: ureq::Agent,
}

impl GeminiGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        let agent = ureq::AgentBuilder::new().build();
        Self { config, agent }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// JSON body for one generate request
    pub fn build_request(photo: &StillImage, subject: &str) -> serde_json::Value {
        json!({
            "contents": [{
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": photo.mime_type(),
                            "data": photo.to_base64()
                        }
                    },
                    { "text": costume_prompt(subject) }
                ]
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE", "TEXT"]
            }
        })
    }

    /// Extract the generated picture from a response body
    pub fn parse_response(body: &str) -> Result<StillImage> {
        let response: GeminiResponse = serde_json::from_str(body).map_err(|e| {
            CostumeError::GenerationError(format!("Malformed response from service: {}", e))
        })?;

        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_ref())
        {
            return Err(CostumeError::GenerationError(format!(
                "The request was blocked by the service ({}).",
                reason
            )));
        }

        let candidate = response
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .ok_or_else(|| {
                CostumeError::GenerationError("The service returned no result.".to_string())
            })?;

        let finish_reason = candidate.finish_reason;
        let parts = candidate
            .content
            .and_then(|content| content.parts)
            .unwrap_or_default();

        let mut text_reply = None;
        for part in parts {
            if let Some(inline) = part.inline_data {
                if inline.mime_type.starts_with("image/") {
                    return StillImage::from_base64(&inline.data, inline.mime_type).map_err(|e| {
                        CostumeError::GenerationError(format!("Could not decode generated image: {}", e))
                    });
                }
            }
            if text_reply.is_none() {
                text_reply = part.text.filter(|text| !text.trim().is_empty());
            }
        }

        let message = match (text_reply, finish_reason) {
            (Some(text), _) => format!("The model did not return an image: {}", text.trim()),
            (None, Some(reason)) => format!("The model did not return an image ({}).", reason),
            (None, None) => "The model did not return an image.".to_string(),
        };
        Err(CostumeError::GenerationError(message))
    }

    fn describe_status(code: u16, body: &str) -> String {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => format!("Service error {}: {}", code, envelope.error.message),
            Err(_) => format!("Service error {}", code),
        }
    }
}

impl ImageGenerator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, photo: &StillImage, subject: &str) -> Result<StillImage> {
        let api_key = self.config.api_key().ok_or_else(|| {
            CostumeError::GenerationError(
                "No API key configured. Set GEMINI_API_KEY and restart.".to_string(),
            )
        })?;

        let url = self.config.request_url();
        let body = Self::build_request(photo, subject);
        info!(
            "[GENERATION] Requesting {} costume from {} ({} byte photo)",
            subject,
            self.config.model,
            photo.len()
        );

        let response = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .set("x-goog-api-key", api_key)
            .send_json(body);

        let text = match response {
            Ok(response) => response.into_string().map_err(|e| {
                CostumeError::GenerationError(format!("Failed to read response: {}", e))
            })?,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                warn!("[GENERATION] Service returned status {}", code);
                return Err(CostumeError::GenerationError(Self::describe_status(code, &body)));
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(CostumeError::GenerationError(format!(
                    "Network error: {}",
                    transport
                )));
            }
        };

        debug!(
            "[GENERATION] Response: {}",
            text.chars().take(200).collect::<String>()
        );
        Self::parse_response(&text)
    }
}
