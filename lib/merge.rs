//! Cross-folder merging of draft resources.

use std::collections::HashMap;

use crate::resource::Resource;

/// The key drafts are grouped under: trimmed, lowercased title.
#[must_use]
pub fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Merge drafts that share a [`title_key`], then order newest first.
///
/// The first draft seen under a key seeds the merged resource and keeps its own fields. Later
/// drafts only contribute files whose name is not present yet, tags not present yet, and their
/// folder path. Same-title drafts merge even when subject or semester differ.
///
/// The sort is stable, so resources created at the same instant keep their input order.
#[must_use]
pub fn merge_and_sort(drafts: Vec<Resource>) -> Vec<Resource> {
    let mut merged: Vec<Resource> = Vec::with_capacity(drafts.len());
    let mut slots: HashMap<String, usize> = HashMap::new();

    for mut draft in drafts {
        let key = title_key(&draft.title);
        if let Some(&slot) = slots.get(&key) {
            absorb(&mut merged[slot], draft);
        } else {
            dedup_in_place(&mut draft.tags);
            slots.insert(key, merged.len());
            merged.push(draft);
        }
    }

    merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    merged
}

fn absorb(into: &mut Resource, from: Resource) {
    for file in from.files {
        if !into.files.iter().any(|f| f.name == file.name) {
            into.files.push(file);
        }
    }
    for tag in from.tags {
        if !into.tags.contains(&tag) {
            into.tags.push(tag);
        }
    }
    for folder in from.folders {
        if !into.folders.contains(&folder) {
            into.folders.push(folder);
        }
    }
}

fn dedup_in_place(values: &mut Vec<String>) {
    let mut kept: Vec<String> = Vec::with_capacity(values.len());
    for value in values.drain(..) {
        if !kept.contains(&value) {
            kept.push(value);
        }
    }
    *values = kept;
}
