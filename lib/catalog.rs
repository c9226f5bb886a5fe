//! The read side as the presentation layer sees it: listings, search, filters and sorting.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::aggregate::{Aggregator, ListError};
use crate::category::Category;
use crate::host::RepositoryHost;
use crate::merge::merge_and_sort;
use crate::resource::Resource;

/// Merged listings over a [`RepositoryHost`].
pub struct Catalog<'h, H: ?Sized> {
    aggregator: Aggregator<'h, H>,
}

impl<'h, H: RepositoryHost + ?Sized> Catalog<'h, H> {
    pub fn new(host: &'h H) -> Self {
        Self {
            aggregator: Aggregator::new(host),
        }
    }

    /// Merged resources of one category, newest first.
    ///
    /// # Errors
    ///
    /// [`ListError`] when the store cannot be read.
    pub async fn list(&self, category: Category) -> Result<Vec<Resource>, ListError> {
        self.aggregator.list(category).await
    }

    /// Merged resources of every category, newest first.
    ///
    /// Titles are merged within a category only; the same title under two categories stays two
    /// resources.
    ///
    /// # Errors
    ///
    /// [`ListError`] when the store cannot be read.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Resource>, ListError> {
        let mut all: Vec<Resource> = self
            .aggregator
            .aggregate_many(&Category::ALL)
            .await?
            .into_iter()
            .flat_map(|(_, drafts)| merge_and_sort(drafts))
            .collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    Newest,
    Name,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort order `{0}`; expected newest or name")]
pub struct UnknownSortOrder(pub String);

impl FromStr for SortOrder {
    type Err = UnknownSortOrder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "newest" => Ok(Self::Newest),
            "name" => Ok(Self::Name),
            _ => Err(UnknownSortOrder(s.to_owned())),
        }
    }
}

/// In-memory search over an already merged listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Case-insensitive substring over title, description, tags, subject and keywords.
    pub text: Option<String>,
    /// Exact match, ignoring case.
    pub subject: Option<String>,
    /// Exact match, ignoring case.
    pub semester: Option<String>,
    pub sort: SortOrder,
}

impl CatalogQuery {
    #[must_use]
    pub fn matches(&self, resource: &Resource) -> bool {
        let exact = |wanted: &Option<String>, actual: &Option<String>| match wanted.as_deref() {
            None | Some("") => true,
            Some(wanted) => actual
                .as_deref()
                .is_some_and(|a| a.trim().eq_ignore_ascii_case(wanted.trim())),
        };
        if !exact(&self.subject, &resource.subject) || !exact(&self.semester, &resource.semester) {
            return false;
        }

        let Some(needle) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        let hit = |s: &str| s.to_lowercase().contains(&needle);

        hit(&resource.title)
            || hit(&resource.description)
            || resource.tags.iter().any(|t| hit(t))
            || resource.subject.as_deref().is_some_and(hit)
            || resource.keywords.iter().any(|k| hit(k))
    }

    /// Filter, then sort. [`SortOrder::Newest`] keeps the listing's order, which already is.
    #[must_use]
    pub fn apply(&self, resources: Vec<Resource>) -> Vec<Resource> {
        let mut kept: Vec<Resource> = resources.into_iter().filter(|r| self.matches(r)).collect();
        match self.sort {
            SortOrder::Newest => kept.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::Name => kept.sort_by_cached_key(|r| r.title.to_lowercase()),
        }
        kept
    }
}

const DRIVE_FILE_PREFIX: &str = "https://drive.google.com/file/d/";

/// Rewrite a Google Drive share link into a direct download link. Other URLs pass through.
#[must_use]
pub fn direct_download_url(url: &str) -> String {
    let Some(rest) = url.trim().strip_prefix(DRIVE_FILE_PREFIX) else {
        return url.to_owned();
    };
    let id = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if id.is_empty() {
        return url.to_owned();
    }
    format!("https://drive.google.com/uc?export=download&id={id}")
}
