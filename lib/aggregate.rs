//! Reconstruction of logical resources from a tree snapshot.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::category::Category;
use crate::host::{self, HostError, RepositoryHost, TreeEntry};
use crate::merge::merge_and_sort;
use crate::metadata::Metadata;
use crate::resource::{Resource, ResourceFile, format_size};
use crate::tree_index::{TreeIndex, folder_name, folder_of};

/// A listing failed as a whole. An empty store is not an error; this is.
#[derive(Debug, Error)]
pub enum ListError {
    #[error("could not load resources: {0}")]
    Host(#[from] HostError),
}

/// Builds draft resources, one per sidecar, from a fresh snapshot on every call.
pub struct Aggregator<'h, H: ?Sized> {
    host: &'h H,
}

impl<'h, H: RepositoryHost + ?Sized> Aggregator<'h, H> {
    pub fn new(host: &'h H) -> Self {
        Self { host }
    }

    /// Draft resources for one category, in snapshot order.
    ///
    /// # Errors
    ///
    /// [`ListError::Host`] when the store cannot be read. A missing repository, branch or
    /// category yields `Ok(vec![])`.
    pub async fn aggregate(&self, category: Category) -> Result<Vec<Resource>, ListError> {
        let mut per_category = self.aggregate_many(&[category]).await?;
        Ok(per_category.pop().map(|(_, drafts)| drafts).unwrap_or_default())
    }

    /// Draft resources for several categories from a single snapshot and a single fetch wave.
    ///
    /// # Errors
    ///
    /// See [`Aggregator::aggregate`].
    #[instrument(skip(self))]
    pub async fn aggregate_many(
        &self,
        categories: &[Category],
    ) -> Result<Vec<(Category, Vec<Resource>)>, ListError> {
        let Some(snapshot) = host::snapshot(self.host).await? else {
            return Ok(categories.iter().map(|c| (*c, Vec::new())).collect());
        };
        debug!(
            commit = %snapshot.commit,
            entries = snapshot.entries.len(),
            "Took tree snapshot."
        );

        let indexes: Vec<(Category, TreeIndex<'_>)> = categories
            .iter()
            .map(|c| (*c, TreeIndex::build(&snapshot.entries, c.as_str())))
            .collect();

        let blobs = self
            .fetch_sidecars(indexes.iter().flat_map(|(_, i)| i.sidecars().iter().copied()))
            .await?;

        let now = Utc::now();
        Ok(indexes
            .iter()
            .map(|(category, index)| {
                let drafts = self.drafts(&snapshot.branch, *category, index, &blobs, now);
                debug!(%category, count = drafts.len(), "Aggregated drafts.");
                (*category, drafts)
            })
            .collect())
    }

    /// Aggregate, then merge same-title drafts and sort newest first.
    ///
    /// # Errors
    ///
    /// See [`Aggregator::aggregate`].
    pub async fn list(&self, category: Category) -> Result<Vec<Resource>, ListError> {
        Ok(merge_and_sort(self.aggregate(category).await?))
    }

    /// Fetch every distinct sidecar blob once, all requests in flight together.
    ///
    /// A blob that vanished between snapshot and fetch is dropped; any other failure aborts.
    async fn fetch_sidecars<'e>(
        &self,
        sidecars: impl Iterator<Item = &'e TreeEntry>,
    ) -> Result<HashMap<&'e str, Vec<u8>>, HostError> {
        let mut seen = HashSet::new();
        let shas: Vec<&'e str> = sidecars
            .map(|e| e.sha.as_str())
            .filter(|sha| seen.insert(*sha))
            .collect();
        debug!(count = shas.len(), "Fetching sidecar blobs.");

        let results = join_all(
            shas.iter()
                .map(|&sha| async move { (sha, self.host.blob(sha).await) }),
        )
        .await;

        let mut blobs = HashMap::with_capacity(results.len());
        for (sha, result) in results {
            match result {
                Ok(bytes) => {
                    blobs.insert(sha, bytes);
                }
                Err(HostError::NotFound(_)) => warn!(sha, "Sidecar blob not found; skipping."),
                Err(e) => return Err(e),
            }
        }
        Ok(blobs)
    }

    fn drafts(
        &self,
        branch: &str,
        category: Category,
        index: &TreeIndex<'_>,
        blobs: &HashMap<&str, Vec<u8>>,
        now: DateTime<Utc>,
    ) -> Vec<Resource> {
        index
            .sidecars()
            .iter()
            .filter_map(|sidecar| {
                let bytes = blobs.get(sidecar.sha.as_str())?;
                match Metadata::decode_at(bytes, now) {
                    Ok(metadata) => Some(self.draft(branch, category, index, sidecar, metadata)),
                    Err(e) => {
                        warn!(path = %sidecar.path, error = %e, "Skipping resource with unreadable metadata.");
                        None
                    }
                }
            })
            .collect()
    }

    fn draft(
        &self,
        branch: &str,
        category: Category,
        index: &TreeIndex<'_>,
        sidecar: &TreeEntry,
        metadata: Metadata,
    ) -> Resource {
        let folder = folder_of(&sidecar.path);
        let name = folder_name(folder);

        let files = index
            .resource_files(folder)
            .into_iter()
            .map(|entry| ResourceFile {
                name: entry
                    .path
                    .strip_prefix(folder)
                    .and_then(|rest| rest.strip_prefix('/'))
                    .unwrap_or(&entry.path)
                    .to_owned(),
                size: format_size(entry.size.unwrap_or(0)),
                download_url: self.host.download_url(branch, &entry.path),
            })
            .collect();

        let title = if metadata.title.trim().is_empty() {
            name.replace(['-', '_'], " ")
        } else {
            metadata.title
        };
        let tags = if metadata.tags.is_empty() {
            vec![category.as_str().to_owned()]
        } else {
            metadata.tags
        };

        Resource {
            title,
            description: metadata.description,
            tags,
            subject: metadata.subject,
            semester: metadata.semester,
            year: metadata.year,
            keywords: metadata.keywords,
            download_url: metadata.download_url,
            created_at: metadata.created_at,
            updated_at: metadata.updated_at,
            folder_name: name.to_owned(),
            folders: vec![folder.to_owned()],
            files,
        }
    }
}
