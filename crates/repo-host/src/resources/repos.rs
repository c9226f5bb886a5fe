//! Repository resource.

use http::Method;

use crate::client::GithubClient;
use crate::error::GithubError;
use crate::http_client::HttpClient;
use crate::models::{Branch, Repository};

/// Operations on a single repository.
pub struct ReposResource<'c, C: HttpClient> {
    client: &'c GithubClient<C>,
    owner: String,
    repo: String,
}

impl<'c, C: HttpClient> ReposResource<'c, C> {
    pub(crate) fn new(client: &'c GithubClient<C>, owner: String, repo: String) -> Self {
        Self {
            client,
            owner,
            repo,
        }
    }

    /// Get the repository, including its default branch.
    pub async fn get(&self) -> Result<Repository, GithubError> {
        self.client
            .request(
                Method::GET,
                &["repos", self.owner.as_str(), self.repo.as_str()],
                &[],
                None::<&()>,
            )
            .await
    }

    /// Get a branch and the commit at its tip.
    pub async fn branch(&self, branch: &str) -> Result<Branch, GithubError> {
        self.client
            .request(
                Method::GET,
                &["repos", self.owner.as_str(), self.repo.as_str(), "branches", branch],
                &[],
                None::<&()>,
            )
            .await
    }
}
