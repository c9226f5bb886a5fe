//! Contents resource.

use http::Method;

use crate::client::GithubClient;
use crate::error::GithubError;
use crate::http_client::HttpClient;
use crate::models::{
    Content, DeleteFileRequest, DeleteFileResponse, PutFileRequest, PutFileResponse,
};

/// File-level reads and writes. Every write is its own commit.
pub struct ContentsResource<'c, C: HttpClient> {
    client: &'c GithubClient<C>,
    owner: String,
    repo: String,
}

impl<'c, C: HttpClient> ContentsResource<'c, C> {
    pub(crate) fn new(client: &'c GithubClient<C>, owner: String, repo: String) -> Self {
        Self {
            client,
            owner,
            repo,
        }
    }

    fn segments<'a>(&'a self, path: &'a str) -> Vec<&'a str> {
        ["repos", self.owner.as_str(), self.repo.as_str(), "contents"]
            .into_iter()
            .chain(path.split('/').filter(|s| !s.is_empty()))
            .collect()
    }

    /// Get file or directory content.
    ///
    /// - `path`: file or directory path within the repo.
    /// - `ref_`: branch name or commit SHA (defaults to the default branch).
    pub async fn get(&self, path: &str, ref_: Option<&str>) -> Result<Content, GithubError> {
        let mut query = Vec::new();
        if let Some(r) = ref_ {
            query.push(("ref", r));
        }
        self.client
            .request(Method::GET, &self.segments(path), &query, None::<&()>)
            .await
    }

    /// Create a file, or replace it when `req.sha` names the current blob.
    pub async fn put(
        &self,
        path: &str,
        req: &PutFileRequest,
    ) -> Result<PutFileResponse, GithubError> {
        self.client
            .request(Method::PUT, &self.segments(path), &[], Some(req))
            .await
    }

    /// Delete a file. `req.sha` must match the current blob.
    pub async fn delete(
        &self,
        path: &str,
        req: &DeleteFileRequest,
    ) -> Result<DeleteFileResponse, GithubError> {
        self.client
            .request(Method::DELETE, &self.segments(path), &[], Some(req))
            .await
    }
}
