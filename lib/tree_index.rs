//! Folder index over a flat tree snapshot.
//!
//! The store has no folder entity, only path prefixes. [`TreeIndex`] makes the folder explicit
//! once per listing pass so the aggregator never rescans the snapshot per resource.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use crate::host::{EntryKind, TreeEntry};
use crate::metadata::SIDECAR_NAME;

/// Sidecars under one category, plus the non-sidecar blobs of every folder in the snapshot.
#[derive(Debug, Default)]
pub struct TreeIndex<'t> {
    sidecars: Vec<&'t TreeEntry>,
    /// folder path -> blobs directly inside it, sidecars excluded, in snapshot order.
    folders: BTreeMap<&'t str, Vec<&'t TreeEntry>>,
    /// Folders that own a sidecar, anywhere in the snapshot.
    resource_folders: BTreeSet<&'t str>,
}

impl<'t> TreeIndex<'t> {
    /// Index `entries` for the category whose top-level folder is `category`.
    #[must_use]
    pub fn build(entries: &'t [TreeEntry], category: &str) -> Self {
        let prefix = format!("{category}/");
        let suffix = format!("/{SIDECAR_NAME}");
        let mut index = Self::default();

        for entry in entries.iter().filter(|e| e.kind == EntryKind::Blob) {
            let Some((folder, name)) = entry.path.rsplit_once('/') else {
                // Files at the repository root belong to no folder.
                continue;
            };
            if name == SIDECAR_NAME {
                index.resource_folders.insert(folder);
                if entry.path.starts_with(&prefix) && entry.path.ends_with(&suffix) {
                    index.sidecars.push(entry);
                }
                continue;
            }
            index.folders.entry(folder).or_default().push(entry);
        }

        index
    }

    /// Sidecar entries under the category, in snapshot order. Duplicated shas are kept.
    #[must_use]
    pub fn sidecars(&self) -> &[&'t TreeEntry] {
        &self.sidecars
    }

    /// Blobs directly inside `folder`, sidecar excluded.
    #[must_use]
    pub fn files_in(&self, folder: &str) -> &[&'t TreeEntry] {
        self.folders.get(folder).map(Vec::as_slice).unwrap_or_default()
    }

    /// Blobs in `folder` and its subfolders, skipping subfolders that are resources themselves.
    #[must_use]
    pub fn resource_files(&self, folder: &str) -> Vec<&'t TreeEntry> {
        let nested_prefix = format!("{folder}/");
        let nested = self
            .folders
            .range::<str, _>((Bound::Included(nested_prefix.as_str()), Bound::Unbounded))
            .take_while(|(path, _)| path.starts_with(&nested_prefix))
            .filter(|(path, _)| !self.owned_by_nested_resource(folder, path))
            .flat_map(|(_, files)| files.iter().copied());

        self.files_in(folder).iter().copied().chain(nested).collect()
    }

    /// Whether `path` (below `folder`) lies inside another resource folder.
    fn owned_by_nested_resource(&self, folder: &str, path: &str) -> bool {
        let mut current = path;
        while current.len() > folder.len() {
            if self.resource_folders.contains(current) {
                return true;
            }
            match current.rsplit_once('/') {
                Some((parent, _)) => current = parent,
                None => break,
            }
        }
        false
    }
}

/// The folder containing a sidecar path: `notes/os/metadata.json` -> `notes/os`.
#[must_use]
pub fn folder_of(sidecar_path: &str) -> &str {
    sidecar_path
        .rsplit_once('/')
        .map_or("", |(folder, _)| folder)
}

/// The last segment of a folder path: `notes/os` -> `os`.
#[must_use]
pub fn folder_name(folder_path: &str) -> &str {
    folder_path.rsplit('/').next().unwrap_or(folder_path)
}
