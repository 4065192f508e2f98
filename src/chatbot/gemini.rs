//! Gemini API client for companion replies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chatbot::generation::{
    ConversationInput, ErrorKind, GenerationClient, GenerationError, Role,
};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const PROVIDER: &str = "gemini";

pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest {
    #[serde(rename = "systemInstruction")]
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    message: String,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: GEMINI_API_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn build_request(persona: &str, input: &ConversationInput) -> GenerateRequest {
        let contents = input
            .turns()
            .into_iter()
            .map(|turn| Content {
                role: Some(match turn.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                }),
                parts: vec![Part { text: turn.content }],
            })
            .collect();

        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: persona.to_string() }],
            },
            contents,
        }
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(parsed: GenerateResponse) -> Result<String, GenerationError> {
    if let Some(error) = parsed.error {
        return Err(GenerationError::new(ErrorKind::Api, PROVIDER, error.message));
    }

    let text = parsed
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    Ok(text)
}

#[async_trait]
impl GenerationClient for GeminiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate(&self, persona: &str, input: &ConversationInput) -> Result<String, GenerationError> {
        let request = Self::build_request(persona, input);
        // The key travels in a header so it never shows up in reqwest's error text.
        let url = format!("{}/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::new(ErrorKind::Transport, PROVIDER, e.without_url().to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            GenerationError::new(ErrorKind::Transport, PROVIDER, format!("Failed to read response: {}", e.without_url()))
        })?;

        debug!("Gemini response status: {status}");

        if !status.is_success() {
            return Err(GenerationError::new(ErrorKind::from_status(status), PROVIDER, format!("{status}: {body}")));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::new(ErrorKind::Parse, PROVIDER, e.to_string()))?;

        extract_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbot::generation::ConversationTurn;

    #[test]
    fn test_request_shape_for_single_message() {
        let request = GeminiClient::build_request("be sweet", &ConversationInput::Message("hello".into()));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be sweet");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"].as_array().unwrap().len(), 1);
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn test_history_maps_assistant_to_model() {
        let input = ConversationInput::History(vec![
            ConversationTurn::user("hi"),
            ConversationTurn::assistant("hello love"),
        ]);
        let json = serde_json::to_value(GeminiClient::build_request("p", &input)).unwrap();
        assert_eq!(json["contents"][1]["role"], "model");
    }

    #[test]
    fn test_extract_joins_parts() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hehe, "},{"text":"hi"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(parsed).unwrap(), "Hehe, hi");
    }

    #[test]
    fn test_extract_without_candidates_is_empty() {
        let parsed: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(extract_text(parsed).unwrap(), "");

        let parsed: GenerateResponse = serde_json::from_str(r#"{"candidates":[{}]}"#).unwrap();
        assert_eq!(extract_text(parsed).unwrap(), "");
    }

    #[tokio::test]
    async fn test_transport_error_does_not_leak_key() {
        let client = GeminiClient {
            api_key: "SECRET-KEY-123".to_string(),
            model: "gemini-2.5-flash".to_string(),
            // Nothing listens on port 1.
            base_url: "http://127.0.0.1:1/v1beta/models".to_string(),
            client: reqwest::Client::new(),
        };

        let err = client
            .generate("p", &ConversationInput::Message("hi".into()))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Transport);
        assert!(!err.to_string().contains("SECRET-KEY-123"), "leaked: {err}");
        assert!(!err.detail.contains("SECRET-KEY-123"));
    }

    #[test]
    fn test_extract_reports_embedded_error() {
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"error":{"message":"bad key"}}"#).unwrap();
        let err = extract_text(parsed).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Api);
        assert!(err.detail.contains("bad key"));
    }
}
