//! OpenAI-compatible chat completions client (OpenRouter by default).

use super::{
    PrioritizeRequest, PriorityResponse, ScriptRequest, ScriptSuggestion, SuggestError,
    SuggestionClient,
};
use crate::config::AppConfig;
use log::{error, info};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

const MAX_ERROR_BODY_CHARS: usize = 200;

const PRIORITIZE_PROMPT: &str = "You are ranking CRM contacts for a calling session.

You will be given an array of contacts with:
- id
- full_name
- last_engaged_at (ISO string or null)
- interactions_count
- tags

Return ONLY a JSON object with one field \"ordered_ids\", which is an array of contact ids, sorted from highest to lowest priority to call next.
Prefer:
- Never-contacted or long-ago contacts.
- Warmer tags like \"warm\", \"demo\", \"trial\" above \"cold\" or empty.";

#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    api_key: String,
    model: String,
    endpoint: String,
    client: Client,
}

impl OpenRouterClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SuggestError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SuggestError::NotConfigured);
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            model: model.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Builds a client from configuration.
    ///
    /// # Errors
    /// - `NotConfigured` when no API key is set.
    pub fn from_config(config: &AppConfig) -> Result<Self, SuggestError> {
        let api_key = config
            .openrouter_api_key
            .as_deref()
            .ok_or(SuggestError::NotConfigured)?;
        Self::new(
            api_key,
            config.openrouter_model.as_str(),
            config.openrouter_endpoint.as_str(),
            config.ai_timeout,
        )
    }

    fn complete<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        prompt: String,
    ) -> Result<T, SuggestError> {
        let started_at = Instant::now();
        let result = self.send(prompt).and_then(|content| parse_content(&content));
        match &result {
            Ok(_) => info!(
                "event=ai_request module=suggest status=ok operation={operation} duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=ai_request module=suggest status=error operation={operation} duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn send(&self, prompt: String) -> Result<Value, SuggestError> {
        let body = ChatRequest {
            model: self.model.as_str(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(self.api_key.as_str())
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SuggestError::Status {
                code: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let completion: ChatResponse = serde_json::from_str(&response.text()?)?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_null())
            .ok_or_else(|| SuggestError::Parse("completion has no message content".to_string()))
    }
}

impl SuggestionClient for OpenRouterClient {
    fn request_script(&self, request: &ScriptRequest) -> Result<ScriptSuggestion, SuggestError> {
        let suggestion: ScriptSuggestion = self.complete("script", script_prompt(request))?;
        if suggestion.call_script.trim().is_empty() && suggestion.whatsapp_message.trim().is_empty()
        {
            return Err(SuggestError::Parse("script suggestion is empty".to_string()));
        }
        Ok(suggestion)
    }

    fn request_priority(
        &self,
        request: &PrioritizeRequest,
    ) -> Result<PriorityResponse, SuggestError> {
        let contacts = serde_json::to_string(&request.contacts)?;
        self.complete(
            "prioritize",
            format!("{PRIORITIZE_PROMPT}\n\nContacts:\n{contacts}"),
        )
    }
}

fn script_prompt(request: &ScriptRequest) -> String {
    let contact = &request.contact;
    let notes = request
        .notes
        .as_ref()
        .filter(|notes| !notes.is_empty())
        .map_or_else(
            || "No prior notes. First touch.".to_string(),
            |notes| notes.join("\n- "),
        );

    format!(
        "You are helping a salesperson make a short, warm call and WhatsApp message to a contact from a simple CRM.

Contact:
- Name: {name}
- Org: {org}
- Phone: {phone}
- Email: {email}

Recent notes:
- {notes}

Return a concise JSON object with two fields:
- \"call_script\": a 3-6 line call opening + key talking points, friendly and efficient.
- \"whatsapp_message\": a single short WhatsApp message (no markdown, no quotes) they can paste directly.",
        name = contact.full_name,
        org = contact.org.as_deref().unwrap_or("N/A"),
        phone = contact.phone,
        email = contact.email.as_deref().unwrap_or("N/A"),
    )
}

/// Decodes model output that is either a JSON string or an inline object.
fn parse_content<T: DeserializeOwned>(content: &Value) -> Result<T, SuggestError> {
    match content {
        Value::String(text) => Ok(serde_json::from_str(strip_code_fence(text))?),
        other => Ok(serde_json::from_value(other.clone())?),
    }
}

/// Some models wrap JSON output in a markdown fence despite `json_object`.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|inner| inner.strip_suffix("```"))
        .map_or(trimmed, str::trim)
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<Value>,
}
