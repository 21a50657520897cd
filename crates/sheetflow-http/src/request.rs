//! Outgoing requests

use crate::error::{HttpError, HttpResult};
use serde::Serialize;
use std::fmt;

/// Methods the Sheets values API and the OAuth token endpoint need
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    None,
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded`, fields in insertion order
    Form(Vec<(String, String)>),
}

#[derive(Clone)]
pub enum Auth {
    None,
    Bearer(String),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => f.write_str("None"),
            Auth::Bearer(_) => f.write_str("Bearer([REDACTED])"),
        }
    }
}

/// A request to an absolute URL, assembled before it is handed to
/// [`HttpClient::execute`](crate::HttpClient::execute)
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    pub method: HttpMethod,
    pub url: String,
    /// Appended to the URL's own query string, in order
    pub query_params: Vec<(String, String)>,
    pub body: RequestBody,
    pub auth: Auth,
}

impl RequestBuilder {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query_params: Vec::new(),
            body: RequestBody::None,
            auth: Auth::None,
        }
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((name.into(), value.into()));
        self
    }

    /// Serialize `body` as the JSON payload
    pub fn json<T: Serialize>(mut self, body: &T) -> HttpResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| HttpError::Json(format!("cannot encode request body: {}", e)))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn json_value(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }

    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.auth = Auth::Bearer(token.into());
        self
    }

    pub(crate) fn build_reqwest(&self, client: &reqwest::Client) -> HttpResult<reqwest::RequestBuilder> {
        let url = url::Url::parse(&self.url)?;
        let mut builder = client.request(self.method.to_reqwest(), url);

        if !self.query_params.is_empty() {
            builder = builder.query(&self.query_params);
        }

        builder = match &self.body {
            RequestBody::None => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder.form(fields),
        };

        Ok(match &self.auth {
            Auth::None => builder,
            Auth::Bearer(token) => builder.bearer_auth(token),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_query_order_and_body() {
        let request = RequestBuilder::new(HttpMethod::Post, "https://sheets.googleapis.com/v4/x:append")
            .query("valueInputOption", "RAW")
            .query("insertDataOption", "OVERWRITE")
            .json(&serde_json::json!({"values": [[1]]}))
            .unwrap();

        assert_eq!(request.query_params[0].0, "valueInputOption");
        assert_eq!(request.query_params[1].0, "insertDataOption");
        assert!(matches!(request.body, RequestBody::Json(_)));
        assert!(matches!(request.auth, Auth::None));
    }

    #[test]
    fn test_relative_url_is_rejected() {
        let client = reqwest::Client::new();
        let err = RequestBuilder::new(HttpMethod::Get, "/v4/spreadsheets/abc")
            .build_reqwest(&client)
            .unwrap_err();
        assert!(matches!(err, HttpError::UrlParse(_)));
    }

    #[test]
    fn test_bearer_is_redacted_in_debug() {
        let request = RequestBuilder::new(HttpMethod::Get, "https://example.com").bearer_auth("ya29.secret");
        assert!(!format!("{:?}", request).contains("ya29.secret"));
    }
}
