//! The logical resources handed to the presentation layer.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A downloadable file that belongs to a resource. Derived from the tree on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFile {
    /// Path relative to the resource folder.
    pub name: String,
    /// Human readable size, e.g. `1.00 MB`.
    pub size: String,
    pub download_url: String,
}

/// One catalog entry.
///
/// The aggregator emits one per sidecar (a draft); after [`crate::merge::merge_and_sort`] a
/// resource may stand for several folders that share a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    pub keywords: Vec<String>,
    /// External link, for resources that have no files in the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Last segment of the (first) folder this resource was built from.
    pub folder_name: String,
    /// Full paths of every folder merged into this resource, first one first.
    pub folders: Vec<String>,
    pub files: Vec<ResourceFile>,
}

/// Format a byte count the way the catalog shows it: mebibytes with two decimals.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}
