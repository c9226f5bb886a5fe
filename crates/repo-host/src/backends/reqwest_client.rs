//! [`HttpClient`] over reqwest with rustls.

use std::time::Duration;

use tracing::{trace, warn};

use crate::error::HttpClientError;
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};

/// Connection establishment gets a fraction of the request budget.
const CONNECT_TIMEOUT_DIVISOR: u32 = 3;

/// The default backend.
///
/// `timeout` bounds the whole exchange, body included; nothing is retried.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let built = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout / CONNECT_TIMEOUT_DIVISOR)
            .build();
        match built {
            Ok(inner) => Self { inner },
            Err(e) => {
                warn!(error = %e, "Could not configure the HTTP client; using reqwest defaults.");
                Self {
                    inner: reqwest::Client::new(),
                }
            }
        }
    }

    /// Wrap a preconfigured client, e.g. one with a proxy.
    #[must_use]
    pub fn from_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }
}

impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpClientError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;
        trace!(%method, %url, has_body = body.is_some(), "HTTP request");

        let builder = self.inner.request(method, url).headers(headers);
        let builder = match body {
            Some(body) => builder.body(body),
            None => builder,
        };
        let response = builder.send().await.map_err(classify)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(classify)?;
        trace!(%status, len = body.len(), "HTTP response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify(err: reqwest::Error) -> HttpClientError {
    match err {
        e if e.is_timeout() => HttpClientError::Timeout,
        e if e.is_connect() || e.is_request() => HttpClientError::Connection(e.to_string()),
        e => HttpClientError::Other(Box::new(e)),
    }
}
