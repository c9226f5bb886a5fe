//! Git data resource.

use http::Method;

use crate::client::GithubClient;
use crate::error::GithubError;
use crate::http_client::HttpClient;
use crate::models::{Blob, Tree};

/// Low-level git object reads.
pub struct GitResource<'c, C: HttpClient> {
    client: &'c GithubClient<C>,
    owner: String,
    repo: String,
}

impl<'c, C: HttpClient> GitResource<'c, C> {
    pub(crate) fn new(client: &'c GithubClient<C>, owner: String, repo: String) -> Self {
        Self {
            client,
            owner,
            repo,
        }
    }

    /// Get a tree by SHA (or any tree-ish such as a commit SHA).
    ///
    /// With `recursive`, the listing covers every path below the tree in one call.
    pub async fn tree(&self, tree_sha: &str, recursive: bool) -> Result<Tree, GithubError> {
        let query: &[(&str, &str)] = if recursive { &[("recursive", "1")] } else { &[] };
        self.client
            .request(
                Method::GET,
                &["repos", self.owner.as_str(), self.repo.as_str(), "git", "trees", tree_sha],
                query,
                None::<&()>,
            )
            .await
    }

    /// Get a blob by SHA. Use [`Blob::decode`] to obtain the bytes.
    pub async fn blob(&self, sha: &str) -> Result<Blob, GithubError> {
        self.client
            .request(
                Method::GET,
                &["repos", self.owner.as_str(), self.repo.as_str(), "git", "blobs", sha],
                &[],
                None::<&()>,
            )
            .await
    }
}
