//! Contents API models.

use serde::{Deserialize, Serialize};

use super::common::{CommitRef, decode_base64};
use crate::error::GithubError;

/// The kind of a contents-API entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    File,
    Dir,
    Symlink,
    Submodule,
}

/// A single file or directory entry from the contents API.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    /// Present for files fetched individually.
    #[serde(default)]
    pub encoding: Option<String>,
    /// Encoded file content, present for files fetched individually.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl ContentEntry {
    /// Decode the inline file content.
    ///
    /// # Errors
    ///
    /// Fails when the entry is not a file, carries no inline content, or uses an unknown encoding.
    pub fn decode(&self) -> Result<Vec<u8>, GithubError> {
        if self.kind != ContentKind::File {
            return Err(GithubError::NotAFile(self.path.clone()));
        }
        match (self.encoding.as_deref(), self.content.as_deref()) {
            (Some("base64"), Some(content)) => Ok(decode_base64(content)?),
            // Files over 1 MB come back with encoding "none" and no inline content.
            (encoding, _) => Err(GithubError::UnsupportedEncoding(
                encoding.unwrap_or("none").to_owned(),
            )),
        }
    }
}

/// Repository content: a single entry for files, a listing for directories.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Dir(Vec<ContentEntry>),
    File(ContentEntry),
}

/// Body of `PUT /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Clone, Serialize)]
pub struct PutFileRequest {
    pub message: String,
    /// Base64 encoded file content.
    pub content: String,
    /// Blob SHA of the file being replaced. Required when overwriting, omitted when creating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PutFileResponse {
    pub content: Option<ContentEntry>,
    pub commit: CommitRef,
}

/// Body of `DELETE /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteFileRequest {
    pub message: String,
    /// Blob SHA of the file being deleted.
    pub sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteFileResponse {
    pub commit: CommitRef,
}
