#![allow(dead_code, missing_docs, clippy::unwrap_used)]

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{Hash as _, Hasher as _};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use study_vault::host::{
    DeleteStatus, EntryKind, FileContent, FileWrite, HostError, RepositoryHost, TreeEntry,
};

/// Content-derived hash, so identical bytes share a sha the way git blobs do.
pub fn sha_of(bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// A recorded host call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Tree,
    Blob(String),
    Content(String),
    Put { path: String, message: String },
    Delete { path: String, message: String },
}

/// In-memory [`RepositoryHost`]: a single branch holding a flat path -> bytes map.
pub struct MockHost {
    branch: String,
    exists: bool,
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    /// Paths listed in the tree whose blobs are already gone.
    ghosts: Mutex<BTreeMap<String, String>>,
    calls: Mutex<Vec<Call>>,
    tree_failure: Mutex<Option<HostError>>,
    blob_failures: Mutex<HashMap<String, HostError>>,
    put_failures: Mutex<HashMap<String, HostError>>,
    delete_failures: Mutex<HashMap<String, HostError>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockHost {
    pub fn new() -> Self {
        Self::on_branch("main")
    }

    pub fn on_branch(branch: &str) -> Self {
        Self {
            branch: branch.to_owned(),
            exists: true,
            files: Mutex::new(BTreeMap::new()),
            ghosts: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            tree_failure: Mutex::new(None),
            blob_failures: Mutex::new(HashMap::new()),
            put_failures: Mutex::new(HashMap::new()),
            delete_failures: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// A repository that does not exist at all.
    pub fn missing() -> Self {
        Self {
            exists: false,
            ..Self::new()
        }
    }

    pub fn with_file(self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn with_sidecar(self, folder: &str, json: &str) -> Self {
        self.with_file(&format!("{folder}/metadata.json"), json)
    }

    /// A path that shows up in the tree but is gone by the time anything touches it.
    pub fn with_ghost(self, path: &str) -> Self {
        self.ghosts
            .lock()
            .unwrap()
            .insert(path.to_owned(), sha_of(path.as_bytes()));
        self
    }

    pub fn insert(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.files.lock().unwrap().insert(path.to_owned(), bytes.into());
    }

    pub fn fail_tree(&self, err: HostError) {
        *self.tree_failure.lock().unwrap() = Some(err);
    }

    pub fn fail_blob(&self, sha: &str, err: HostError) {
        self.blob_failures.lock().unwrap().insert(sha.to_owned(), err);
    }

    pub fn fail_put(&self, path: &str, err: HostError) {
        self.put_failures.lock().unwrap().insert(path.to_owned(), err);
    }

    pub fn fail_delete(&self, path: &str, err: HostError) {
        self.delete_failures.lock().unwrap().insert(path.to_owned(), err);
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Blob fetches per sha.
    pub fn blob_fetches(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for call in self.calls() {
            if let Call::Blob(sha) = call {
                *counts.entry(sha).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Paths written, in commit order.
    pub fn puts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Put { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    /// Paths deleted, in commit order.
    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_exists(&self) -> Result<(), HostError> {
        if self.exists {
            Ok(())
        } else {
            Err(HostError::NotFound("acme/vault".into()))
        }
    }
}

#[async_trait]
impl RepositoryHost for MockHost {
    async fn default_branch(&self) -> Result<String, HostError> {
        self.check_exists()?;
        Ok(self.branch.clone())
    }

    async fn branch_tip(&self, branch: &str) -> Result<String, HostError> {
        self.check_exists()?;
        if branch != self.branch {
            return Err(HostError::NotFound(branch.to_owned()));
        }
        Ok(format!("commit-{}", self.files.lock().unwrap().len()))
    }

    async fn tree_recursive(&self, _commit: &str) -> Result<Vec<TreeEntry>, HostError> {
        self.record(Call::Tree);
        if let Some(err) = self.tree_failure.lock().unwrap().clone() {
            return Err(err);
        }

        let mut blobs: BTreeMap<String, (String, u64)> = self
            .files
            .lock()
            .unwrap()
            .iter()
            .map(|(path, bytes)| (path.clone(), (sha_of(bytes), bytes.len() as u64)))
            .collect();
        for (path, sha) in self.ghosts.lock().unwrap().iter() {
            blobs.insert(path.clone(), (sha.clone(), 0));
        }

        let mut dirs = BTreeSet::new();
        for path in blobs.keys() {
            let mut current = path.as_str();
            while let Some((parent, _)) = current.rsplit_once('/') {
                dirs.insert(parent.to_owned());
                current = parent;
            }
        }

        let mut entries: Vec<TreeEntry> = dirs
            .into_iter()
            .map(|path| TreeEntry {
                sha: sha_of(path.as_bytes()),
                path,
                kind: EntryKind::Tree,
                size: None,
            })
            .chain(blobs.into_iter().map(|(path, (sha, size))| TreeEntry {
                path,
                kind: EntryKind::Blob,
                sha,
                size: Some(size),
            }))
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn blob(&self, sha: &str) -> Result<Vec<u8>, HostError> {
        self.record(Call::Blob(sha.to_owned()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(err) = self.blob_failures.lock().unwrap().get(sha).cloned() {
            return Err(err);
        }
        self.files
            .lock()
            .unwrap()
            .values()
            .find(|bytes| sha_of(bytes) == sha)
            .cloned()
            .ok_or_else(|| HostError::NotFound(sha.to_owned()))
    }

    async fn content(&self, path: &str, ref_: &str) -> Result<Option<FileContent>, HostError> {
        self.record(Call::Content(path.to_owned()));
        if ref_ != self.branch {
            return Ok(None);
        }
        Ok(self.files.lock().unwrap().get(path).map(|bytes| FileContent {
            path: path.to_owned(),
            sha: sha_of(bytes),
            bytes: Some(bytes.clone()),
        }))
    }

    async fn put_file(&self, write: FileWrite<'_>) -> Result<String, HostError> {
        if let Some(err) = self.put_failures.lock().unwrap().get(write.path).cloned() {
            return Err(err);
        }
        let mut files = self.files.lock().unwrap();
        let current = files.get(write.path).map(|b| sha_of(b));
        if current.as_deref() != write.sha {
            return Err(HostError::Conflict(write.path.to_owned()));
        }
        files.insert(write.path.to_owned(), write.bytes.to_vec());
        drop(files);

        self.record(Call::Put {
            path: write.path.to_owned(),
            message: write.message.to_owned(),
        });
        Ok(format!("https://example.test/{}/{}", write.branch, write.path))
    }

    async fn delete_file(
        &self,
        path: &str,
        sha: &str,
        message: &str,
        _branch: &str,
    ) -> Result<DeleteStatus, HostError> {
        if let Some(err) = self.delete_failures.lock().unwrap().get(path).cloned() {
            return Err(err);
        }
        if self.ghosts.lock().unwrap().remove(path).is_some() {
            return Ok(DeleteStatus::NotFound);
        }

        let mut files = self.files.lock().unwrap();
        let Some(current) = files.get(path).map(|b| sha_of(b)) else {
            return Ok(DeleteStatus::NotFound);
        };
        if current != sha {
            return Err(HostError::Conflict(path.to_owned()));
        }
        files.remove(path);
        drop(files);

        self.record(Call::Delete {
            path: path.to_owned(),
            message: message.to_owned(),
        });
        Ok(DeleteStatus::Deleted)
    }

    fn download_url(&self, branch: &str, path: &str) -> String {
        format!("https://raw.example.test/acme/vault/{branch}/{path}")
    }
}

/// A sidecar document with a fixed creation time.
pub fn sidecar(title: &str, tags: &[&str], created_at: &str) -> String {
    serde_json::json!({
        "title": title,
        "description": format!("{title} description"),
        "tags": tags,
        "createdAt": created_at,
    })
    .to_string()
}
