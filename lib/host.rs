//! The repository host capability interface and its GitHub implementation.
//!
//! Everything above this module treats the content store as a versioned blob-and-tree store. Only
//! [`GithubHost`] knows that the store is a GitHub repository.

use async_trait::async_trait;
use base64::Engine as _;
use repo_host::models::{
    Content, ContentKind, DeleteFileRequest, PutFileRequest, TreeEntryKind,
};
use repo_host::{GithubClient, GithubError, HttpClient, HttpClientError};
use thiserror::Error;
use tracing::{instrument, warn};

/// The kind of object a tree entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Blob,
    Tree,
    Submodule,
}

/// One entry of a recursive tree snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Repository-relative, `/` separated.
    pub path: String,
    pub kind: EntryKind,
    /// Content hash of the object.
    pub sha: String,
    /// Size in bytes, blobs only.
    pub size: Option<u64>,
}

impl TreeEntry {
    /// The last path component.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A file read through the contents API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub path: String,
    /// Current blob hash, required to overwrite or delete the file.
    pub sha: String,
    /// Inline bytes. `None` when the host does not inline large files.
    pub bytes: Option<Vec<u8>>,
}

/// A single create-or-update commit.
#[derive(Debug, Clone, Copy)]
pub struct FileWrite<'a> {
    pub path: &'a str,
    pub bytes: &'a [u8],
    pub message: &'a str,
    /// Hash of the blob being replaced; `None` creates the file.
    pub sha: Option<&'a str>,
    pub branch: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStatus {
    Deleted,
    NotFound,
}

/// Failures reported by a [`RepositoryHost`].
///
/// Not-found and conflict are kept apart from everything else because callers treat them
/// differently: not-found is often a legitimate empty state, conflict means a stale hash.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("stale content hash: {0}")]
    Conflict(String),

    #[error("access denied: {0}")]
    Unauthorized(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{0} is not a file")]
    NotAFile(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("repository host error: {0}")]
    Api(String),
}

impl HostError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// A versioned blob-and-tree store.
///
/// Every method is an I/O boundary. Implementations must not retry.
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// The branch the catalog reads from and writes to.
    async fn default_branch(&self) -> Result<String, HostError>;

    /// The commit SHA currently at the tip of `branch`.
    async fn branch_tip(&self, branch: &str) -> Result<String, HostError>;

    /// Every entry reachable from `commit`, recursively.
    async fn tree_recursive(&self, commit: &str) -> Result<Vec<TreeEntry>, HostError>;

    /// Raw bytes of the blob with content hash `sha`.
    async fn blob(&self, sha: &str) -> Result<Vec<u8>, HostError>;

    /// Read a file at `ref_`. Returns `Ok(None)` if nothing exists at `path`.
    async fn content(&self, path: &str, ref_: &str) -> Result<Option<FileContent>, HostError>;

    /// Create or overwrite a file, returning a URL for the written content.
    async fn put_file(&self, write: FileWrite<'_>) -> Result<String, HostError>;

    /// Delete the file at `path`, whose current blob hash must be `sha`.
    async fn delete_file(
        &self,
        path: &str,
        sha: &str,
        message: &str,
        branch: &str,
    ) -> Result<DeleteStatus, HostError>;

    /// Public download URL for `path` on `branch`.
    fn download_url(&self, branch: &str, path: &str) -> String;
}

/// A tree listing pinned to one commit of the default branch.
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    pub branch: String,
    pub commit: String,
    pub entries: Vec<TreeEntry>,
}

/// Take a recursive snapshot of the default branch.
///
/// Returns `Ok(None)` when the repository, branch, or tree does not exist, or the repository has
/// no commits yet. Every other failure propagates.
///
/// # Errors
///
/// Any [`HostError`] other than not-found from the underlying calls.
#[instrument(skip(host))]
pub async fn snapshot<H: RepositoryHost + ?Sized>(
    host: &H,
) -> Result<Option<TreeSnapshot>, HostError> {
    let steps = async {
        let branch = host.default_branch().await?;
        let commit = host.branch_tip(&branch).await?;
        let entries = host.tree_recursive(&commit).await?;
        Ok::<_, HostError>(TreeSnapshot {
            branch,
            commit,
            entries,
        })
    };

    match steps.await {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(HostError::NotFound(what)) => {
            warn!(%what, "Repository content not found; treating as empty.");
            Ok(None)
        }
        // GitHub answers 409 for reads of a repository with no commits.
        Err(HostError::Conflict(what)) => {
            warn!(%what, "Repository has no commits; treating as empty.");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// The public raw-content host GitHub serves file downloads from.
pub const DEFAULT_RAW_HOST: &str = "https://raw.githubusercontent.com";

/// [`RepositoryHost`] over a GitHub repository.
pub struct GithubHost<C: HttpClient> {
    client: GithubClient<C>,
    owner: String,
    repo: String,
    raw_host: String,
}

impl<C: HttpClient> GithubHost<C> {
    pub fn new(client: GithubClient<C>, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            client,
            owner: owner.into(),
            repo: repo.into(),
            raw_host: DEFAULT_RAW_HOST.to_owned(),
        }
    }

    /// Override the raw-content host used for download URLs.
    #[must_use]
    pub fn with_raw_host(mut self, raw_host: impl Into<String>) -> Self {
        self.raw_host = raw_host.into().trim_end_matches('/').to_owned();
        self
    }
}

#[async_trait]
impl<C: HttpClient> RepositoryHost for GithubHost<C> {
    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn default_branch(&self) -> Result<String, HostError> {
        let repo = self
            .client
            .repos(&self.owner, &self.repo)
            .get()
            .await
            .map_err(|e| map_github_error(&format!("{}/{}", self.owner, self.repo), e))?;
        Ok(repo.default_branch)
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn branch_tip(&self, branch: &str) -> Result<String, HostError> {
        let branch = self
            .client
            .repos(&self.owner, &self.repo)
            .branch(branch)
            .await
            .map_err(|e| map_github_error(branch, e))?;
        Ok(branch.commit.sha)
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn tree_recursive(&self, commit: &str) -> Result<Vec<TreeEntry>, HostError> {
        let tree = self
            .client
            .git(&self.owner, &self.repo)
            .tree(commit, true)
            .await
            .map_err(|e| map_github_error(commit, e))?;
        if tree.truncated {
            warn!(commit, "Tree listing was truncated by GitHub; some resources may be missing.");
        }
        Ok(tree
            .tree
            .into_iter()
            .map(|e| TreeEntry {
                path: e.path,
                kind: match e.kind {
                    TreeEntryKind::Blob => EntryKind::Blob,
                    TreeEntryKind::Tree => EntryKind::Tree,
                    TreeEntryKind::Commit => EntryKind::Submodule,
                },
                sha: e.sha,
                size: e.size,
            })
            .collect())
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn blob(&self, sha: &str) -> Result<Vec<u8>, HostError> {
        let blob = self
            .client
            .git(&self.owner, &self.repo)
            .blob(sha)
            .await
            .map_err(|e| map_github_error(sha, e))?;
        blob.decode().map_err(|e| map_github_error(sha, e))
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn content(&self, path: &str, ref_: &str) -> Result<Option<FileContent>, HostError> {
        let content = match self
            .client
            .contents(&self.owner, &self.repo)
            .get(path, Some(ref_))
            .await
        {
            Ok(content) => content,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(map_github_error(path, e)),
        };

        match content {
            Content::File(entry) if entry.kind == ContentKind::File => {
                let bytes = match entry.decode() {
                    Ok(bytes) => Some(bytes),
                    // Large files are listed without inline content; the sha is still usable.
                    Err(GithubError::UnsupportedEncoding(_)) => None,
                    Err(e) => return Err(map_github_error(path, e)),
                };
                Ok(Some(FileContent {
                    path: entry.path,
                    sha: entry.sha,
                    bytes,
                }))
            }
            Content::File(_) | Content::Dir(_) => Err(HostError::NotAFile(path.to_owned())),
        }
    }

    #[instrument(skip(self, write), fields(repo = %self.repo, path = write.path))]
    async fn put_file(&self, write: FileWrite<'_>) -> Result<String, HostError> {
        let request = PutFileRequest {
            message: write.message.to_owned(),
            content: base64::engine::general_purpose::STANDARD.encode(write.bytes),
            sha: write.sha.map(ToOwned::to_owned),
            branch: Some(write.branch.to_owned()),
        };
        let response = self
            .client
            .contents(&self.owner, &self.repo)
            .put(write.path, &request)
            .await
            .map_err(|e| map_github_error(write.path, e))?;
        Ok(response
            .content
            .and_then(|c| c.html_url)
            .unwrap_or_else(|| self.download_url(write.branch, write.path)))
    }

    #[instrument(skip(self, message), fields(repo = %self.repo))]
    async fn delete_file(
        &self,
        path: &str,
        sha: &str,
        message: &str,
        branch: &str,
    ) -> Result<DeleteStatus, HostError> {
        let request = DeleteFileRequest {
            message: message.to_owned(),
            sha: sha.to_owned(),
            branch: Some(branch.to_owned()),
        };
        match self
            .client
            .contents(&self.owner, &self.repo)
            .delete(path, &request)
            .await
        {
            Ok(_) => Ok(DeleteStatus::Deleted),
            Err(e) if e.is_not_found() => Ok(DeleteStatus::NotFound),
            Err(e) => Err(map_github_error(path, e)),
        }
    }

    fn download_url(&self, branch: &str, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.raw_host, self.owner, self.repo, branch, path
        )
    }
}

/// Classify a GitHub failure. `subject` names what was being accessed.
fn map_github_error(subject: &str, err: GithubError) -> HostError {
    use http_status::*;

    if err.is_conflict() {
        return HostError::Conflict(subject.to_owned());
    }
    match err {
        GithubError::Api { status, message } => match status.as_u16() {
            NOT_FOUND => HostError::NotFound(subject.to_owned()),
            TOO_MANY_REQUESTS => HostError::RateLimited(message),
            UNAUTHORIZED | FORBIDDEN if message.to_lowercase().contains("rate limit") => {
                HostError::RateLimited(message)
            }
            UNAUTHORIZED | FORBIDDEN => HostError::Unauthorized(message),
            code => HostError::Api(format!("HTTP {code} for {subject}: {message}")),
        },
        GithubError::Http(HttpClientError::Timeout) => {
            HostError::Transport(format!("request for {subject} timed out"))
        }
        GithubError::Http(e) => HostError::Transport(e.to_string()),
        GithubError::NotAFile(path) => HostError::NotAFile(path),
        e @ (GithubError::Json(_)
        | GithubError::Base64(_)
        | GithubError::UnsupportedEncoding(_)) => HostError::Decode(format!("{subject}: {e}")),
        e @ GithubError::InvalidUrl(_) => HostError::Api(e.to_string()),
    }
}

mod http_status {
    pub const UNAUTHORIZED: u16 = 401;
    pub const FORBIDDEN: u16 = 403;
    pub const NOT_FOUND: u16 = 404;
    pub const TOO_MANY_REQUESTS: u16 = 429;
}
