//! The seam between the GitHub client and the transport that carries its requests.

use std::future::Future;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};

use crate::error::HttpClientError;

/// A fully prepared request: absolute URL, every header set, body already JSON encoded.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Whatever came back. Non-2xx statuses are not errors at this layer.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A transport for [`crate::GithubClient`].
///
/// Backends move bytes and report transport failures only. Status handling, credentials and JSON
/// decoding stay in the client, so tests can swap in a canned backend.
pub trait HttpClient: Send + Sync {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, HttpClientError>> + Send;
}
