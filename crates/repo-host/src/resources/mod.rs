//! Resource namespaces for the GitHub API.

mod contents;
mod git;
mod repos;

pub use contents::ContentsResource;
pub use git::GitResource;
pub use repos::ReposResource;
