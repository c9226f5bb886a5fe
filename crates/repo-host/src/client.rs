//! Client construction and the shared request path.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::GithubError;
use crate::http_client::{HttpClient, HttpRequest};
use crate::resources::{ContentsResource, GitResource, ReposResource};

/// The public GitHub API root.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const DEFAULT_USER_AGENT: &str = concat!("repo-host/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings shared by every request a client makes.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `https://api.github.com` or a GitHub Enterprise `/api/v3` URL.
    pub base_url: String,
    /// GitHub rejects requests without a user agent.
    pub user_agent: String,
    /// Per-request timeout handed to the HTTP backend.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Builder for [`GithubClient`].
#[derive(Clone)]
pub struct ClientBuilder {
    token: String,
    config: ClientConfig,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("token", &"****")
            .field("config", &self.config)
            .finish()
    }
}

impl ClientBuilder {
    fn new(token: &str) -> Self {
        Self {
            token: token.to_owned(),
            config: ClientConfig::default(),
        }
    }

    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Build a client on top of an arbitrary [`HttpClient`] backend.
    pub fn build_with<C: HttpClient>(self, http: C) -> GithubClient<C> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(API_VERSION),
        );
        match HeaderValue::from_str(&self.config.user_agent) {
            Ok(ua) => {
                headers.insert(header::USER_AGENT, ua);
            }
            Err(_) => {
                warn!(user_agent = %self.config.user_agent, "Ignoring invalid user agent.");
                headers.insert(header::USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
            }
        }
        if !self.token.is_empty() {
            match HeaderValue::from_str(&format!("Bearer {}", self.token)) {
                Ok(mut auth) => {
                    auth.set_sensitive(true);
                    headers.insert(header::AUTHORIZATION, auth);
                }
                Err(_) => warn!("Access token contains invalid characters; sending no credentials."),
            }
        }

        GithubClient {
            inner: Arc::new(ClientInner {
                config: self.config,
                headers,
                http,
            }),
        }
    }

    /// Build a client backed by [`crate::ReqwestClient`] with the configured timeout.
    #[cfg(feature = "reqwest-client")]
    #[must_use]
    pub fn build(self) -> Github {
        let http = crate::backends::ReqwestClient::new(self.config.timeout);
        self.build_with(http)
    }
}

/// A GitHub client generic over its HTTP backend.
pub struct GithubClient<C: HttpClient> {
    pub(crate) inner: Arc<ClientInner<C>>,
}

/// The default client type, backed by reqwest.
#[cfg(feature = "reqwest-client")]
pub type Github = GithubClient<crate::backends::ReqwestClient>;

impl<C: HttpClient> Clone for GithubClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: HttpClient> std::fmt::Debug for GithubClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubClient")
            .field("base_url", &self.inner.config.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "reqwest-client")]
impl GithubClient<crate::backends::ReqwestClient> {
    /// Start building a client authenticated with `token`. An empty token sends no credentials.
    #[must_use]
    pub fn builder(token: &str) -> ClientBuilder {
        ClientBuilder::new(token)
    }
}

impl<C: HttpClient> GithubClient<C> {
    /// Start building a client for a custom backend.
    #[must_use]
    pub fn builder_for(token: &str) -> ClientBuilder {
        ClientBuilder::new(token)
    }

    /// The settings this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Repository-level operations.
    #[must_use]
    pub fn repos(&self, owner: &str, repo: &str) -> ReposResource<'_, C> {
        ReposResource::new(self, owner.to_owned(), repo.to_owned())
    }

    /// Git data operations (trees and blobs).
    #[must_use]
    pub fn git(&self, owner: &str, repo: &str) -> GitResource<'_, C> {
        GitResource::new(self, owner.to_owned(), repo.to_owned())
    }

    /// Contents API operations (read, create/update, delete a file).
    #[must_use]
    pub fn contents(&self, owner: &str, repo: &str) -> ContentsResource<'_, C> {
        ContentsResource::new(self, owner.to_owned(), repo.to_owned())
    }

    pub(crate) async fn request<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T, GithubError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.inner.request(method, segments, query, body).await
    }
}

pub(crate) struct ClientInner<C: HttpClient> {
    config: ClientConfig,
    headers: HeaderMap,
    http: C,
}

impl<C: HttpClient> ClientInner<C> {
    async fn request<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T, GithubError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(segments, query)?;
        let mut headers = self.headers.clone();
        let body = match body {
            Some(body) => {
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                Some(Bytes::from(serde_json::to_vec(body)?))
            }
            None => None,
        };

        debug!(%method, %url, "GitHub request");
        let response = self
            .http
            .send(HttpRequest {
                method,
                url,
                headers,
                body,
            })
            .await?;

        if !response.status.is_success() {
            return Err(GithubError::from_response(response.status, &response.body));
        }
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// Join `segments` onto the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<String, GithubError> {
        let mut url = Url::parse(&self.config.base_url)?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.into())
    }
}
