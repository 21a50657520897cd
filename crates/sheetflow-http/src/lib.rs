//! Async HTTP transport shared by the Sheets client and the OAuth token
//! exchange.
//!
//! Requests go to absolute URLs with an optional bearer token. Responses
//! are buffered whole. Nothing is retried: a non-2xx status is handed
//! back to the caller as a normal response, and [`redact_secrets`] is
//! there for callers that put remote messages into errors or logs.

pub mod client;
pub mod config;
pub mod error;
pub mod request;
pub mod response;

pub use client::HttpClient;
pub use config::HttpClientConfig;
pub use error::{redact_secrets, HttpError, HttpResult};
pub use request::{Auth, HttpMethod, RequestBody, RequestBuilder};
pub use response::HttpResponse;
