//! study-vault shared library.
//!
//! Reconstructs a catalog of study resources from a git repository that stores files next to
//! per-folder `metadata.json` sidecars, and writes resources back to it.

pub mod aggregate;
/// Merged listings, search and sorting.
pub mod catalog;
pub mod category;
/// The repository host capability interface.
pub mod host;
pub mod merge;
/// Sidecar decoding.
pub mod metadata;
/// Uploads and deletions.
pub mod mutation;
pub mod resource;
pub mod tree_index;

pub use aggregate::{Aggregator, ListError};
pub use catalog::{Catalog, CatalogQuery, SortOrder, direct_download_url};
pub use category::Category;
pub use host::{GithubHost, HostError, RepositoryHost};
pub use merge::merge_and_sort;
pub use metadata::Metadata;
pub use mutation::{
    DeleteOutcome, MetadataInput, MutationError, Mutator, UploadFile, UploadReceipt,
    UploadRequest,
};
pub use resource::{Resource, ResourceFile};
