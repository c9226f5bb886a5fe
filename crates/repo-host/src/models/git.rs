//! Git data models: trees and blobs.

use serde::Deserialize;

use super::common::decode_base64;
use crate::error::GithubError;

/// A tree listing. When requested with `recursive=1`, `tree` holds every entry below the root.
#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub sha: String,
    pub tree: Vec<TreeEntry>,
    /// GitHub caps recursive listings; `true` means entries were omitted.
    #[serde(default)]
    pub truncated: bool,
}

/// The kind of object a tree entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeEntryKind {
    Blob,
    Tree,
    /// A submodule pointer.
    Commit,
}

/// One entry in a tree listing.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    /// Repository-relative path, `/` separated.
    pub path: String,
    /// File mode, e.g. `100644`.
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: TreeEntryKind,
    pub sha: String,
    /// Size in bytes, blobs only.
    #[serde(default)]
    pub size: Option<u64>,
}

/// A raw blob as returned by the git data API.
#[derive(Debug, Clone, Deserialize)]
pub struct Blob {
    pub sha: String,
    pub size: u64,
    /// Either `base64` or `utf-8`.
    pub encoding: String,
    pub content: String,
}

impl Blob {
    /// Decode the blob payload into raw bytes.
    ///
    /// # Errors
    ///
    /// Fails on malformed base64 or an encoding other than `base64`/`utf-8`.
    pub fn decode(&self) -> Result<Vec<u8>, GithubError> {
        match self.encoding.as_str() {
            "base64" => Ok(decode_base64(&self.content)?),
            "utf-8" => Ok(self.content.clone().into_bytes()),
            other => Err(GithubError::UnsupportedEncoding(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recursive_tree_deserializes() {
        let body = r#"{
            "sha": "abc",
            "url": "https://api.github.com/repos/o/r/git/trees/abc",
            "truncated": false,
            "tree": [
                {"path": "notes", "mode": "040000", "type": "tree", "sha": "t1"},
                {"path": "notes/os/metadata.json", "mode": "100644", "type": "blob", "sha": "b1", "size": 120}
            ]
        }"#;
        let tree: Tree = serde_json::from_str(body).unwrap();
        assert_eq!(tree.tree.len(), 2);
        assert_eq!(tree.tree[0].kind, TreeEntryKind::Tree);
        assert_eq!(tree.tree[0].size, None);
        assert_eq!(tree.tree[1].size, Some(120));
    }

    #[test]
    fn blob_decodes_base64_and_rejects_unknown_encodings() {
        let blob = Blob {
            sha: "b".into(),
            size: 2,
            encoding: "base64".into(),
            content: "e30=\n".into(),
        };
        assert_eq!(blob.decode().unwrap(), b"{}");

        let odd = Blob {
            encoding: "utf-16".into(),
            ..blob
        };
        assert!(matches!(odd.decode(), Err(GithubError::UnsupportedEncoding(_))));
    }
}
