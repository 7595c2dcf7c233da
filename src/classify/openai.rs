//! OpenAI-compatible chat completions client.

use super::{Classifier, Prompt};
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::json;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f64 = 0.1;

/// Responses are cut at this sequence.
const STOP: &str = "----";

const USER_AGENT: &str = concat!("rdgai/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for `{endpoint}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiClassifier {
    endpoint: String,
    model: String,
    temperature: f64,
    api_key: String,
}

impl OpenAiClassifier {
    pub fn new(endpoint: &str, model: &str, temperature: f64, api_key: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
            api_key: api_key.to_string(),
        }
    }

    /// Build a client with the API key taken from `OPENAI_API_KEY`.
    pub fn from_env(endpoint: &str, model: &str, temperature: f64) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::Classifier(format!("{} is not set", API_KEY_ENV)))?;
        Ok(Self::new(endpoint, model, temperature, &api_key))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The request body for a prompt.
    pub fn request_body(&self, prompt: &Prompt) -> serde_json::Value {
        let mut messages = vec![
            json!({ "role": "system", "content": prompt.system }),
            json!({ "role": "user", "content": prompt.user }),
        ];
        if let Some(assistant) = &prompt.assistant {
            messages.push(json!({ "role": "assistant", "content": assistant }));
        }
        json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "stop": [STOP],
        })
    }
}

impl Classifier for OpenAiClassifier {
    fn complete(&mut self, prompt: &Prompt) -> Result<String> {
        let url = format!("{}/chat/completions", self.endpoint);
        let response = ureq::post(&url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("User-Agent", USER_AGENT)
            .send_json(self.request_body(prompt));

        match response {
            Ok(resp) => {
                let body: ChatResponse = resp
                    .into_json()
                    .map_err(|e| Error::Classifier(format!("Invalid response: {}", e)))?;
                body.choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content)
                    .ok_or_else(|| Error::Classifier("Response has no content".to_string()))
            }
            Err(ureq::Error::Status(401, _)) => {
                Err(Error::Classifier("Unauthorized: check the API key".to_string()))
            }
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Err(Error::Classifier(format!("HTTP {}: {}", code, body)))
            }
            Err(e) => Err(Error::Classifier(e.to_string())),
        }
    }
}
