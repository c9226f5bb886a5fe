//! Request and response models.

mod common;
mod content;
mod git;
mod repo;

pub use common::{CommitRef, decode_base64};
pub use content::{
    Content, ContentEntry, ContentKind, DeleteFileRequest, DeleteFileResponse, PutFileRequest,
    PutFileResponse,
};
pub use git::{Blob, Tree, TreeEntry, TreeEntryKind};
pub use repo::{Branch, BranchCommit, Repository};
