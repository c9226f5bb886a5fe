//! Rust SDK for the slice of the GitHub REST API needed to use a repository as a content store.

mod backends;
mod client;
pub mod error;
mod http_client;
pub mod models;
mod resources;

#[cfg(feature = "reqwest-client")]
pub use backends::ReqwestClient;
#[cfg(feature = "reqwest-client")]
pub use client::Github;
pub use client::{ClientBuilder, ClientConfig, DEFAULT_BASE_URL, GithubClient};
pub use error::{GithubError, HttpClientError};
pub use http::StatusCode;
pub use http_client::{HttpClient, HttpRequest, HttpResponse};
pub use resources::{ContentsResource, GitResource, ReposResource};
