//! Buffered responses

use crate::error::{HttpError, HttpResult};

/// Status and fully read body of one call
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: Vec<u8>,
    /// Time from send until the body was read
    pub latency_ms: u64,
    /// Final URL after redirects
    pub url: String,
}

impl HttpResponse {
    pub fn new(status_code: u16, body: Vec<u8>) -> Self {
        Self {
            status_code,
            body,
            latency_ms: 0,
            url: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn text(&self) -> HttpResult<String> {
        String::from_utf8(self.body.clone())
            .map_err(|e| HttpError::Body(format!("response is not UTF-8: {}", e)))
    }

    pub fn json(&self) -> HttpResult<serde_json::Value> {
        self.json_as()
    }

    pub fn json_as<T: serde::de::DeserializeOwned>(&self) -> HttpResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| HttpError::Json(format!("cannot decode response body: {}", e)))
    }

    /// Human-readable reason from an error body.
    ///
    /// Understands the Sheets shape `{"error": {"message": ..}}` and the
    /// OAuth shape `{"error": "..", "error_description": ..}`, and falls
    /// back to the raw text.
    pub fn error_message(&self) -> String {
        if let Ok(value) = self.json() {
            let error = value.get("error");
            let message = error
                .and_then(|e| e.get("message"))
                .or(error)
                .or_else(|| value.get("error_description"))
                .and_then(|m| m.as_str());
            if let Some(message) = message {
                return message.to_string();
            }
        }
        self.text().unwrap_or_default()
    }
}

pub(crate) async fn from_reqwest(response: reqwest::Response, started: std::time::Instant) -> HttpResult<HttpResponse> {
    let status_code = response.status().as_u16();
    let url = response.url().to_string();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        body,
        latency_ms: started.elapsed().as_millis() as u64,
        url,
    })
}
