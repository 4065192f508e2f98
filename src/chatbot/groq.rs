//! Groq chat-completions client (OpenAI-compatible API).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chatbot::generation::{
    ConversationInput, ErrorKind, GenerationClient, GenerationError, Role,
};

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const PROVIDER: &str = "groq";

pub struct GroqClient {
    api_key: String,
    model: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl GroqClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            http: reqwest::Client::new(),
        }
    }

    fn build_messages(persona: &str, input: &ConversationInput) -> Vec<ApiMessage> {
        let mut messages = vec![ApiMessage {
            role: "system",
            content: persona.to_string(),
        }];
        messages.extend(input.turns().into_iter().map(|turn| ApiMessage {
            role: match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: turn.content,
        }));
        messages
    }
}

fn extract_text(response: ApiResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .unwrap_or_default()
}

#[async_trait]
impl GenerationClient for GroqClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate(&self, persona: &str, input: &ConversationInput) -> Result<String, GenerationError> {
        let request = ApiRequest {
            model: &self.model,
            messages: Self::build_messages(persona, input),
        };

        let response = self
            .http
            .post(GROQ_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::new(ErrorKind::Transport, PROVIDER, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::new(ErrorKind::from_status(status), PROVIDER, format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::new(ErrorKind::Parse, PROVIDER, e.to_string()))?;

        Ok(extract_text(api_response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbot::generation::ConversationTurn;

    #[test]
    fn test_system_message_comes_first() {
        let input = ConversationInput::History(vec![
            ConversationTurn::user("hey"),
            ConversationTurn::assistant("hi love"),
            ConversationTurn::user("miss me?"),
        ]);
        let messages = GroqClient::build_messages("you are Mona", &input);

        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(messages[0].content, "you are Mona");
        assert_eq!(messages[3].content, "miss me?");
    }

    #[test]
    fn test_single_message_input() {
        let messages = GroqClient::build_messages("p", &ConversationInput::Message("that's wrong".into()));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "that's wrong");
    }

    #[test]
    fn test_extract_first_choice() {
        let response: ApiResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"hehe"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response), "hehe");
    }

    #[test]
    fn test_extract_missing_content_is_empty() {
        let response: ApiResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(extract_text(response), "");

        let response: ApiResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert_eq!(extract_text(response), "");
    }
}
