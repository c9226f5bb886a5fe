#![allow(clippy::unwrap_used, missing_docs)]

mod common;

use std::collections::BTreeSet;

use chrono::{TimeZone as _, Utc};
use common::{Call, MockHost, sha_of, sidecar};
use study_vault::host::HostError;
use study_vault::{Aggregator, Catalog, Category, ListError, merge_and_sort};

fn dbms_vault() -> MockHost {
    MockHost::new()
        .with_sidecar(
            "notes/dbms-a",
            &sidecar("DBMS Notes", &["notes"], "2024-03-01T00:00:00Z"),
        )
        .with_file("notes/dbms-a/unit1.pdf", vec![0u8; 10])
        .with_sidecar(
            "notes/dbms-b",
            &sidecar("dbms notes ", &["notes", "revised"], "2024-02-01T00:00:00Z"),
        )
        .with_file("notes/dbms-b/unit2.pdf", vec![1u8; 20])
}

fn names(files: &[study_vault::ResourceFile]) -> Vec<&str> {
    files.iter().map(|f| f.name.as_str()).collect()
}

#[tokio::test]
async fn same_title_folders_merge_into_one_resource() {
    let host = dbms_vault();
    let resources = Catalog::new(&host).list(Category::Notes).await.unwrap();

    assert_eq!(resources.len(), 1, "both folders share a title");
    let dbms = &resources[0];
    assert_eq!(dbms.title, "DBMS Notes", "first folder seeds the title");
    assert_eq!(names(&dbms.files), vec!["unit1.pdf", "unit2.pdf"]);
    assert_eq!(dbms.tags, vec!["notes", "revised"]);
    assert_eq!(
        dbms.folders,
        vec!["notes/dbms-a", "notes/dbms-b"]
    );
}

#[tokio::test]
async fn relisting_an_unchanged_store_is_idempotent() {
    let host = dbms_vault()
        .with_sidecar("notes/os", &sidecar("OS", &["notes"], "2024-04-01T00:00:00Z"))
        .with_file("notes/os/ch1.pdf", "x");
    let catalog = Catalog::new(&host);

    let first = catalog.list(Category::Notes).await.unwrap();
    let second = catalog.list(Category::Notes).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn merge_result_does_not_depend_on_draft_order() {
    let host = dbms_vault().with_file("notes/dbms-b/unit1.pdf", vec![9u8; 30]);
    let drafts = Aggregator::new(&host).aggregate(Category::Notes).await.unwrap();

    let mut reversed = drafts.clone();
    reversed.reverse();

    let file_set = |resources: Vec<study_vault::Resource>| -> BTreeSet<String> {
        resources
            .into_iter()
            .flat_map(|r| r.files.into_iter().map(|f| f.name))
            .collect()
    };
    assert_eq!(file_set(merge_and_sort(drafts)), file_set(merge_and_sort(reversed)));
}

#[tokio::test]
async fn merged_tags_have_no_duplicates() {
    let host = MockHost::new()
        .with_sidecar(
            "notes/a",
            &sidecar("Algebra", &["notes", "math", "notes"], "2024-01-01T00:00:00Z"),
        )
        .with_sidecar(
            "notes/b",
            &sidecar("algebra", &["math", "notes", "exam"], "2024-01-02T00:00:00Z"),
        );
    let resources = Catalog::new(&host).list(Category::Notes).await.unwrap();

    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].tags, vec!["notes", "math", "exam"]);
}

#[tokio::test]
async fn listing_is_newest_first() {
    let host = MockHost::new()
        .with_sidecar("notes/old", &sidecar("Old", &["notes"], "2022-01-01T00:00:00Z"))
        .with_sidecar("notes/new", &sidecar("New", &["notes"], "2025-01-01T00:00:00Z"))
        .with_sidecar("notes/mid", &sidecar("Mid", &["notes"], "2023-06-01"));
    let resources = Catalog::new(&host).list(Category::Notes).await.unwrap();

    let titles: Vec<_> = resources.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["New", "Mid", "Old"]);
    assert!(
        resources
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at)
    );
}

#[tokio::test]
async fn one_malformed_sidecar_only_loses_its_own_resource() {
    let host = MockHost::new()
        .with_sidecar("notes/a", &sidecar("A", &["notes"], "2024-01-01T00:00:00Z"))
        .with_sidecar("notes/b", &sidecar("B", &["notes"], "2024-01-02T00:00:00Z"))
        .with_sidecar("notes/c", &sidecar("C", &["notes"], "2024-01-03T00:00:00Z"))
        .with_sidecar("notes/broken", "{\"title\": \"Broken\",");
    let resources = Catalog::new(&host).list(Category::Notes).await.unwrap();

    assert_eq!(resources.len(), 3);
    assert!(resources.iter().all(|r| r.title != "Broken"));
}

#[tokio::test]
async fn empty_category_is_an_empty_list() {
    let host = MockHost::new()
        .with_sidecar("notes/a", &sidecar("A", &["notes"], "2024-01-01T00:00:00Z"));
    let resources = Catalog::new(&host)
        .list(Category::QuestionPapers)
        .await
        .unwrap();
    assert!(resources.is_empty());
}

#[tokio::test]
async fn missing_repository_is_an_empty_list() {
    let host = MockHost::missing();
    assert!(Catalog::new(&host).list(Category::Notes).await.unwrap().is_empty());
    assert!(Catalog::new(&host).list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn auth_failure_is_an_error_not_an_empty_list() {
    let host = MockHost::new()
        .with_sidecar("notes/a", &sidecar("A", &["notes"], "2024-01-01T00:00:00Z"));
    host.fail_tree(HostError::Unauthorized("Bad credentials".into()));

    let result = Catalog::new(&host).list(Category::Notes).await;
    assert!(
        matches!(result, Err(ListError::Host(HostError::Unauthorized(_)))),
        "expected an auth error, got {result:?}"
    );
}

#[tokio::test]
async fn transport_failure_on_a_sidecar_fails_the_listing() {
    let doc = sidecar("A", &["notes"], "2024-01-01T00:00:00Z");
    let host = MockHost::new().with_sidecar("notes/a", &doc);
    host.fail_blob(&sha_of(doc.as_bytes()), HostError::Transport("timed out".into()));

    assert!(Catalog::new(&host).list(Category::Notes).await.is_err());
}

#[tokio::test]
async fn vanished_sidecar_blob_is_skipped() {
    let doc = sidecar("A", &["notes"], "2024-01-01T00:00:00Z");
    let host = MockHost::new()
        .with_sidecar("notes/a", &doc)
        .with_sidecar("notes/b", &sidecar("B", &["notes"], "2024-01-02T00:00:00Z"));
    host.fail_blob(&sha_of(doc.as_bytes()), HostError::NotFound("gone".into()));

    let resources = Catalog::new(&host).list(Category::Notes).await.unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].title, "B");
}

#[tokio::test]
async fn metadata_only_resource_keeps_its_external_link() {
    let host = MockHost::new().with_sidecar(
        "software-tools/vscode",
        r#"{"title":"VS Code","tags":["software-tools"],"downloadUrl":"https://code.visualstudio.com/download"}"#,
    );
    let resources = Catalog::new(&host)
        .list(Category::SoftwareTools)
        .await
        .unwrap();

    assert_eq!(resources.len(), 1);
    assert!(resources[0].files.is_empty());
    assert_eq!(
        resources[0].download_url.as_deref(),
        Some("https://code.visualstudio.com/download")
    );
}

#[tokio::test]
async fn file_sizes_and_download_urls() {
    let host = MockHost::on_branch("trunk")
        .with_sidecar("notes/big", &sidecar("Big", &["notes"], "2024-01-01T00:00:00Z"))
        .with_file("notes/big/book.pdf", vec![0u8; 1_048_576]);
    let resources = Catalog::new(&host).list(Category::Notes).await.unwrap();

    let file = &resources[0].files[0];
    assert_eq!(file.size, "1.00 MB");
    assert_eq!(
        file.download_url,
        "https://raw.example.test/acme/vault/trunk/notes/big/book.pdf",
        "download URLs use the resolved default branch"
    );
}

#[tokio::test]
async fn untitled_resource_falls_back_to_folder_name() {
    let host = MockHost::new().with_sidecar(
        "lab-programs/data_structures-lab",
        r#"{"title":"  ","createdAt":"2024-01-01T00:00:00Z"}"#,
    );
    let resources = Catalog::new(&host)
        .list(Category::LabPrograms)
        .await
        .unwrap();

    assert_eq!(resources[0].title, "data structures lab");
    assert_eq!(resources[0].folder_name, "data_structures-lab");
    assert_eq!(resources[0].tags, vec!["lab-programs"], "untagged sidecars get their category");
}

#[tokio::test]
async fn subfolder_files_belong_to_the_resource() {
    let host = MockHost::new()
        .with_sidecar("notes/os", &sidecar("OS", &["notes"], "2024-01-01T00:00:00Z"))
        .with_file("notes/os/unit1/slides.pdf", "s")
        .with_file("notes/os/summary.pdf", "t");
    let resources = Catalog::new(&host).list(Category::Notes).await.unwrap();

    let mut files = names(&resources[0].files);
    files.sort_unstable();
    assert_eq!(files, vec!["summary.pdf", "unit1/slides.pdf"]);
}

#[tokio::test]
async fn distinct_sidecars_are_fetched_once_each_in_one_wave() {
    let shared = sidecar("Shared", &["notes"], "2024-01-01T00:00:00Z");
    let host = MockHost::new()
        .with_sidecar("notes/a", &sidecar("A", &["notes"], "2024-01-02T00:00:00Z"))
        .with_sidecar("notes/b", &sidecar("B", &["notes"], "2024-01-03T00:00:00Z"))
        .with_sidecar("notes/c", &sidecar("C", &["notes"], "2024-01-04T00:00:00Z"))
        .with_sidecar("notes/shared-1", &shared)
        .with_sidecar("notes/shared-2", &shared);

    let resources = Catalog::new(&host).list(Category::Notes).await.unwrap();
    assert_eq!(resources.len(), 4, "two folders with one title merge");

    let fetches = host.blob_fetches();
    assert_eq!(fetches.len(), 4, "one fetch per distinct sidecar blob");
    assert!(fetches.values().all(|&n| n == 1), "no blob fetched twice: {fetches:?}");
    assert_eq!(host.peak_in_flight(), 4, "all fetches are in flight together");
    assert_eq!(
        host.calls().iter().filter(|c| **c == Call::Tree).count(),
        1,
        "a single tree snapshot per listing"
    );
}

#[tokio::test]
async fn list_all_merges_within_categories_and_sorts_globally() {
    let host = MockHost::new()
        .with_sidecar("notes/os", &sidecar("OS", &["notes"], "2024-01-01T00:00:00Z"))
        .with_sidecar(
            "question-papers/os",
            &sidecar("OS", &["question-papers"], "2024-05-01T00:00:00Z"),
        )
        .with_sidecar(
            "lab-programs/c",
            &sidecar("C Lab", &["lab-programs"], "2024-03-01T00:00:00Z"),
        )
        .with_file("README.md", "# vault");

    let resources = Catalog::new(&host).list_all().await.unwrap();

    let summary: Vec<_> = resources
        .iter()
        .map(|r| (r.title.as_str(), r.tags[0].as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("OS", "question-papers"),
            ("C Lab", "lab-programs"),
            ("OS", "notes"),
        ]
    );
    assert_eq!(
        resources[1].created_at,
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    );
    assert_eq!(
        host.calls().iter().filter(|c| **c == Call::Tree).count(),
        1,
        "every category comes from the same snapshot"
    );
}
