//! Sheets v4 REST client

use super::{SheetsApi, ValueRange};
use crate::address::Region;
use crate::auth::{token_provider_for, TokenProvider};
use crate::config::{SinkTask, ValueInputOption};
use crate::error::{SinkError, SinkResult};
use async_trait::async_trait;
use sheetflow_http::{redact_secrets, HttpClient, HttpClientConfig, HttpMethod, HttpResponse, RequestBuilder};
use std::sync::Arc;
use url::Url;

/// [`SheetsApi`] over HTTP for one spreadsheet
#[derive(Clone)]
pub struct SheetsClient {
    http: HttpClient,
    base_url: String,
    spreadsheet_id: String,
    tokens: Arc<dyn TokenProvider>,
    value_input_option: ValueInputOption,
}

impl SheetsClient {
    pub fn new(
        http: HttpClient,
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            spreadsheet_id: spreadsheet_id.into(),
            tokens,
            value_input_option: ValueInputOption::default(),
        }
    }

    pub fn with_value_input_option(mut self, option: ValueInputOption) -> Self {
        self.value_input_option = option;
        self
    }

    /// Client for the spreadsheet a task targets, with its credentials
    pub fn from_task(task: &SinkTask) -> SinkResult<Self> {
        let http = HttpClient::new(HttpClientConfig::new())?;
        let tokens = token_provider_for(task, &http)?;
        Ok(Self::new(http, &task.api_base_url, &task.spreadsheet_id, tokens)
            .with_value_input_option(task.value_input_option))
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}{suffix}`, with the
    /// range percent-encoded as one path segment.
    fn values_url(&self, region: &Region, suffix: &str) -> SinkResult<String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SinkError::config(format!("invalid api_base_url {:?}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| SinkError::config(format!("api_base_url {:?} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values"])
            .push(&format!("{}{}", region, suffix));
        Ok(url.into())
    }

    async fn send(&self, request: RequestBuilder, operation: &str, region: &Region) -> SinkResult<HttpResponse> {
        let token = self.tokens.access_token().await?;
        let response = self.http.execute(request.bearer_auth(token)).await?;

        if !response.is_success() {
            return Err(SinkError::Remote {
                status: response.status_code,
                message: format!("{} {}: {}", operation, region, redact_secrets(&response.error_message())),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl SheetsApi for SheetsClient {
    async fn get_values(&self, region: &Region) -> SinkResult<ValueRange> {
        let url = self.values_url(region, "")?;
        let request = self
            .http
            .request(HttpMethod::Get, &url)
            .query("majorDimension", "ROWS");

        let response = self.send(request, "get values", region).await?;
        Ok(response.json_as()?)
    }

    async fn clear_values(&self, region: &Region) -> SinkResult<()> {
        let url = self.values_url(region, ":clear")?;
        let request = self
            .http
            .request(HttpMethod::Post, &url)
            .json_value(serde_json::json!({}));

        self.send(request, "clear", region).await?;
        Ok(())
    }

    async fn update_values(&self, region: &Region, values: &ValueRange) -> SinkResult<()> {
        let url = self.values_url(region, "")?;
        let request = self
            .http
            .request(HttpMethod::Put, &url)
            .query("valueInputOption", self.value_input_option.as_str())
            .json(values)?;

        self.send(request, "update", region).await?;
        Ok(())
    }

    async fn append_values(&self, region: &Region, values: &ValueRange) -> SinkResult<()> {
        let url = self.values_url(region, ":append")?;
        let request = self
            .http
            .request(HttpMethod::Post, &url)
            .query("valueInputOption", self.value_input_option.as_str())
            .query("insertDataOption", "OVERWRITE")
            .json(values)?;

        self.send(request, "append", region).await?;
        Ok(())
    }
}

impl std::fmt::Debug for SheetsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsClient")
            .field("base_url", &self.base_url)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("value_input_option", &self.value_input_option)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::SheetName;
    use crate::auth::StaticTokenProvider;

    fn client(base: &str) -> SheetsClient {
        SheetsClient::new(
            HttpClient::default_client().unwrap(),
            base,
            "abc",
            Arc::new(StaticTokenProvider::new("t")),
        )
    }

    fn region() -> Region {
        Region {
            sheet: SheetName::new("My Data"),
            start_column: 1,
            end_column: 3,
            start_row: 1,
            end_row: None,
        }
    }

    #[test]
    fn test_range_is_a_single_encoded_segment() {
        let url = client("https://sheets.googleapis.com").values_url(&region(), ":clear").unwrap();
        assert_eq!(
            url,
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/'My%20Data'!A1:C:clear"
        );
    }

    #[test]
    fn test_base_url_with_trailing_slash() {
        let url = client("http://127.0.0.1:8080/").values_url(&region(), "").unwrap();
        assert_eq!(url, "http://127.0.0.1:8080/v4/spreadsheets/abc/values/'My%20Data'!A1:C");
    }

    #[test]
    fn test_invalid_base_url_is_configuration_error() {
        let err = client("not a url").values_url(&region(), "").unwrap_err();
        assert!(err.is_configuration());
    }
}
