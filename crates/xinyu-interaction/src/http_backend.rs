//! HttpChatBackend - REST implementation of `ChatBackend`.
//!
//! Plain request/response calls against the counselling backend. No retries,
//! no auth headers and no timeouts beyond reqwest's defaults.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use xinyu_core::{
    ChatBackend, ChatReply, HealthStatus, Result, TargetLanguage, TranslationResult, XinyuError,
};

use crate::config::BackendConfig;

/// Backend client talking JSON over HTTP.
#[derive(Clone)]
pub struct HttpChatBackend {
    client: Client,
    base_url: String,
}

impl HttpChatBackend {
    /// Creates a client for the backend at `base_url` (e.g. `http://localhost:5000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(config.base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B, T>(&self, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let mut request = self.client.post(self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|err| map_transport_error(path, err))?;
        parse_response(path, response).await
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn chat(&self, message: &str, session_id: &str) -> Result<ChatReply> {
        let body = ChatRequest {
            message,
            session_id,
        };
        self.post_json("/api/chat", Some(&body)).await
    }

    async fn new_session(&self) -> Result<String> {
        let response: NewSessionResponse = self.post_json::<(), _>("/api/session/new", None).await?;
        Ok(response.session_id)
    }

    async fn translate(&self, text: &str, target: TargetLanguage) -> Result<TranslationResult> {
        let body = TranslateRequest {
            text,
            target_lang: target.as_request_code(),
        };
        self.post_json("/api/translate", Some(&body)).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let path = format!("/api/session/{session_id}");
        let response = self
            .client
            .delete(self.url(&path))
            .send()
            .await
            .map_err(|err| map_transport_error(&path, err))?;

        if !response.status().is_success() {
            return Err(map_http_error(response).await);
        }
        Ok(())
    }

    async fn detect_language(&self, text: &str) -> Result<String> {
        let response: DetectResponse = self
            .post_json("/api/translate/detect", Some(&DetectRequest { text }))
            .await?;
        Ok(response.detected_language)
    }

    async fn health(&self) -> Result<HealthStatus> {
        let path = "/api/health";
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|err| map_transport_error(path, err))?;
        parse_response(path, response).await
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    session_id: &'a str,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    /// Serialized as `null` for automatic selection.
    target_lang: Option<&'a str>,
}

#[derive(Serialize)]
struct DetectRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct NewSessionResponse {
    session_id: String,
}

#[derive(Deserialize)]
struct DetectResponse {
    detected_language: String,
}

/// Error body returned by the backend: `{"error": "..."}`.
#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

async fn parse_response<T>(path: &str, response: Response) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    if !response.status().is_success() {
        return Err(map_http_error(response).await);
    }

    let status = response.status().as_u16();
    response.json::<T>().await.map_err(|err| {
        XinyuError::http(status, format!("Failed to parse response from {path}: {err}"))
    })
}

fn map_transport_error(path: &str, err: reqwest::Error) -> XinyuError {
    XinyuError::transport(format!("Request to {path} failed: {err}"))
}

async fn map_http_error(response: Response) -> XinyuError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());

    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error)
        .unwrap_or(body);

    XinyuError::http(status, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let backend = HttpChatBackend::new("http://localhost:5000/");
        assert_eq!(backend.base_url(), "http://localhost:5000");
        assert_eq!(backend.url("/api/chat"), "http://localhost:5000/api/chat");
    }

    #[test]
    fn test_auto_target_serializes_as_null() {
        let body = TranslateRequest {
            text: "你好",
            target_lang: TargetLanguage::Auto.as_request_code(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "text": "你好", "target_lang": null })
        );
    }
}
