//! Uploads and deletions.
//!
//! Every file write is an independent commit. A multi-file operation is a sequence of fallible
//! steps with no rollback: when a step fails, the error reports what was already committed.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::category::Category;
use crate::host::{self, DeleteStatus, EntryKind, FileWrite, HostError, RepositoryHost};
use crate::metadata::{Metadata, SIDECAR_NAME};

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{path} was modified concurrently; re-run to use the latest version.")]
    Conflict { path: String },

    #[error(transparent)]
    Host(HostError),

    #[error("stopped after committing {} path(s): {source}", written.len())]
    Partial {
        written: Vec<String>,
        #[source]
        source: Box<MutationError>,
    },
}

impl MutationError {
    /// Whether the failure (or the step that stopped a partial operation) was a stale hash.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Conflict { .. } => true,
            Self::Partial { source, .. } => source.is_conflict(),
            _ => false,
        }
    }

    fn from_host(path: &str, err: HostError) -> Self {
        match err {
            HostError::Conflict(_) => Self::Conflict {
                path: path.to_owned(),
            },
            other => Self::Host(other),
        }
    }

    fn after(self, written: &[String]) -> Self {
        if written.is_empty() {
            self
        } else {
            Self::Partial {
                written: written.to_vec(),
                source: Box::new(self),
            }
        }
    }
}

/// The user-editable part of a sidecar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataInput {
    pub title: String,
    pub description: String,
    /// Must contain exactly one category name.
    pub tags: Vec<String>,
    pub subject: Option<String>,
    pub semester: Option<String>,
    pub year: Option<String>,
    pub keywords: Vec<String>,
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Name relative to the resource folder.
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub metadata: MetadataInput,
    pub files: Vec<UploadFile>,
    /// Commit message prefix for file writes.
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub category: Category,
    /// `category/slug`.
    pub folder: String,
    /// Every path committed, in commit order; the sidecar is last.
    pub written: Vec<String>,
    /// Where the host says the sidecar now lives.
    pub metadata_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted {
        removed: Vec<String>,
        /// Paths that were already gone when their delete was issued.
        missing: Vec<String>,
    },
    /// Nothing existed at the target.
    AlreadyAbsent,
}

impl DeleteOutcome {
    /// An informational note for the user, if the outcome warrants one.
    #[must_use]
    pub fn note(&self) -> Option<String> {
        match self {
            Self::AlreadyAbsent => Some("File not found, assuming already deleted.".to_owned()),
            Self::Deleted { missing, .. } if !missing.is_empty() => Some(format!(
                "{} file(s) were already gone: {}",
                missing.len(),
                missing.join(", ")
            )),
            Self::Deleted { .. } => None,
        }
    }
}

/// The title as stored: trimmed, with whitespace runs collapsed to one space, so it reads the
/// same as the folder [`slug`] derived from it.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Folder slug for a title: trimmed, lowercased, whitespace runs become `-`.
#[must_use]
pub fn slug(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// Writes through a [`RepositoryHost`]. Never reads back through the aggregator.
pub struct Mutator<'h, H: ?Sized> {
    host: &'h H,
}

impl<'h, H: RepositoryHost + ?Sized> Mutator<'h, H> {
    pub fn new(host: &'h H) -> Self {
        Self { host }
    }

    /// Write every file, then the sidecar, into `category/slug(title)`.
    ///
    /// An existing sidecar keeps its `createdAt`. Uploading with no files edits the metadata.
    ///
    /// # Errors
    ///
    /// [`MutationError::Validation`] before any write; otherwise the first failing step,
    /// wrapped in [`MutationError::Partial`] if earlier steps were committed.
    #[instrument(skip(self, request), fields(title = %request.metadata.title))]
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadReceipt, MutationError> {
        let category = validate_upload(&request)?;
        let folder = format!("{category}/{}", slug(&request.metadata.title));
        let metadata_path = format!("{folder}/{SIDECAR_NAME}");

        let branch = self.host.default_branch().await.map_err(MutationError::Host)?;
        let existing = self
            .host
            .content(&metadata_path, &branch)
            .await
            .map_err(|e| MutationError::from_host(&metadata_path, e))?;

        let mut written = Vec::with_capacity(request.files.len() + 1);
        for file in &request.files {
            let path = format!("{folder}/{}", file.name);
            let message = format!("{} - {}", request.message, file.name);
            self.write(&path, &file.bytes, &message, &branch)
                .await
                .map_err(|e| e.after(&written))?;
            debug!(%path, "Wrote file.");
            written.push(path);
        }

        let now = Utc::now();
        let created_at = existing
            .as_ref()
            .and_then(|c| c.bytes.as_deref())
            .and_then(|bytes| match Metadata::decode_at(bytes, now) {
                Ok(m) => Some(m.created_at),
                Err(e) => {
                    warn!(path = %metadata_path, error = %e, "Existing metadata is unreadable; it will be replaced.");
                    None
                }
            })
            .unwrap_or(now);

        let input = request.metadata;
        let metadata = Metadata {
            title: normalize_title(&input.title),
            description: input.description,
            tags: input.tags,
            subject: input.subject,
            semester: input.semester,
            year: input.year,
            keywords: input.keywords,
            download_url: input.download_url,
            created_at,
            updated_at: now,
        };
        let body = metadata
            .to_json()
            .map_err(|e| MutationError::Validation(e.to_string()))?;
        let message = format!("feat: Add/Update metadata for {}", metadata.title);
        let metadata_url = self
            .host
            .put_file(FileWrite {
                path: &metadata_path,
                bytes: &body,
                message: &message,
                sha: existing.as_ref().map(|c| c.sha.as_str()),
                branch: &branch,
            })
            .await
            .map_err(|e| MutationError::from_host(&metadata_path, e).after(&written))?;
        written.push(metadata_path);

        info!(%folder, files = request.files.len(), "Uploaded resource.");
        Ok(UploadReceipt {
            category,
            folder,
            written,
            metadata_url,
        })
    }

    /// Rewrite a resource's sidecar without touching its files.
    ///
    /// # Errors
    ///
    /// See [`Mutator::upload`].
    pub async fn edit(&self, metadata: MetadataInput) -> Result<UploadReceipt, MutationError> {
        self.upload(UploadRequest {
            metadata,
            files: Vec::new(),
            message: String::new(),
        })
        .await
    }

    /// Delete one file. A file that does not exist counts as deleted.
    ///
    /// # Errors
    ///
    /// [`MutationError::Conflict`] on a stale hash, [`MutationError::Host`] otherwise.
    #[instrument(skip(self))]
    pub async fn delete_file(&self, path: &str) -> Result<DeleteOutcome, MutationError> {
        let branch = self.host.default_branch().await.map_err(MutationError::Host)?;
        let Some(current) = self
            .host
            .content(path, &branch)
            .await
            .map_err(|e| MutationError::from_host(path, e))?
        else {
            info!(path, "File not found, assuming already deleted.");
            return Ok(DeleteOutcome::AlreadyAbsent);
        };

        let message = format!("feat: Delete resource file {path}");
        match self
            .host
            .delete_file(path, &current.sha, &message, &branch)
            .await
            .map_err(|e| MutationError::from_host(path, e))?
        {
            DeleteStatus::Deleted => Ok(DeleteOutcome::Deleted {
                removed: vec![path.to_owned()],
                missing: Vec::new(),
            }),
            DeleteStatus::NotFound => Ok(DeleteOutcome::AlreadyAbsent),
        }
    }

    /// Delete every file under a resource folder, sidecar first.
    ///
    /// Removing the sidecar first takes the resource out of listings with the first commit. Files
    /// that disappear mid-way are reported in [`DeleteOutcome::Deleted::missing`].
    ///
    /// # Errors
    ///
    /// [`MutationError::Validation`] if `folder` is not `category/name`; otherwise the first
    /// failing delete, wrapped in [`MutationError::Partial`] if earlier deletes were committed.
    #[instrument(skip(self))]
    pub async fn delete_resource(&self, folder: &str) -> Result<DeleteOutcome, MutationError> {
        let folder = validate_folder(folder)?;
        let Some(snapshot) = host::snapshot(self.host)
            .await
            .map_err(MutationError::Host)?
        else {
            return Ok(DeleteOutcome::AlreadyAbsent);
        };

        let prefix = format!("{folder}/");
        let mut targets: Vec<_> = snapshot
            .entries
            .iter()
            .filter(|e| e.kind == EntryKind::Blob && e.path.starts_with(&prefix))
            .collect();
        if targets.is_empty() {
            return Ok(DeleteOutcome::AlreadyAbsent);
        }
        let sidecar = format!("{prefix}{SIDECAR_NAME}");
        targets.sort_by_key(|e| e.path != sidecar);

        let mut removed = Vec::with_capacity(targets.len());
        let mut missing = Vec::new();
        for entry in targets {
            let message = format!("feat: Delete resource {}", entry.path);
            match self
                .host
                .delete_file(&entry.path, &entry.sha, &message, &snapshot.branch)
                .await
            {
                Ok(DeleteStatus::Deleted) => removed.push(entry.path.clone()),
                Ok(DeleteStatus::NotFound) | Err(HostError::NotFound(_)) => {
                    warn!(path = %entry.path, "File was already gone.");
                    missing.push(entry.path.clone());
                }
                Err(e) => {
                    return Err(MutationError::from_host(&entry.path, e).after(&removed));
                }
            }
        }

        info!(folder, removed = removed.len(), missing = missing.len(), "Deleted resource.");
        Ok(DeleteOutcome::Deleted { removed, missing })
    }

    async fn write(
        &self,
        path: &str,
        bytes: &[u8],
        message: &str,
        branch: &str,
    ) -> Result<(), MutationError> {
        let existing = self
            .host
            .content(path, branch)
            .await
            .map_err(|e| MutationError::from_host(path, e))?;
        self.host
            .put_file(FileWrite {
                path,
                bytes,
                message,
                sha: existing.as_ref().map(|c| c.sha.as_str()),
                branch,
            })
            .await
            .map_err(|e| MutationError::from_host(path, e))?;
        Ok(())
    }
}

/// Check an upload before anything is written and return its category.
fn validate_upload(request: &UploadRequest) -> Result<Category, MutationError> {
    if request.metadata.title.trim().is_empty() {
        return Err(MutationError::Validation("a resource needs a title".to_owned()));
    }
    let category = match Category::in_tags(&request.metadata.tags).as_slice() {
        [category] => *category,
        [] => {
            return Err(MutationError::Validation(
                "a resource must be tagged with one of: notes, lab-programs, question-papers, \
                 software-tools"
                    .to_owned(),
            ));
        }
        many => {
            let names: Vec<_> = many.iter().map(|c| c.as_str()).collect();
            return Err(MutationError::Validation(format!(
                "a resource must belong to exactly one category, found {}",
                names.join(", ")
            )));
        }
    };

    for file in &request.files {
        let name = file.name.as_str();
        let bad_segment = name
            .split('/')
            .any(|s| s.is_empty() || s == "." || s == "..");
        if bad_segment || name.rsplit('/').next() == Some(SIDECAR_NAME) {
            return Err(MutationError::Validation(format!(
                "`{name}` is not a valid file name"
            )));
        }
    }
    Ok(category)
}

/// Accept `category/name[/...]` and return it without surrounding slashes.
fn validate_folder(folder: &str) -> Result<&str, MutationError> {
    let folder = folder.trim_matches('/');
    match folder.split_once('/') {
        Some((category, rest)) if category.parse::<Category>().is_ok() && !rest.is_empty() => {
            Ok(folder)
        }
        _ => Err(MutationError::Validation(format!(
            "`{folder}` is not a resource folder; expected <category>/<name>"
        ))),
    }
}
