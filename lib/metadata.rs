//! Decoding of `metadata.json` sidecars.
//!
//! A sidecar is decoded exactly once, into [`Metadata`], and every default is applied here so no
//! consumer has to guess at missing fields.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The reserved file name of a resource folder's sidecar.
pub const SIDECAR_NAME: &str = "metadata.json";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("sidecar is not a valid metadata document: {0}")]
    Json(#[from] serde_json::Error),
}

/// A decoded sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// May be empty; the aggregator falls back to the folder name.
    pub title: String,
    pub description: String,
    /// Category tag plus user tags, in document order.
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    pub keywords: Vec<String>,
    /// External link for link-only resources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The document as found on disk. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetadata {
    title: Option<String>,
    description: Option<String>,
    tags: Option<Vec<String>>,
    subject: Option<serde_json::Value>,
    semester: Option<serde_json::Value>,
    year: Option<serde_json::Value>,
    keywords: Option<Vec<String>>,
    download_url: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    /// Older uploads stored the creation time under `date`.
    date: Option<String>,
}

impl Metadata {
    /// Decode a sidecar, using the current time for a missing `createdAt`.
    ///
    /// # Errors
    ///
    /// Fails if the bytes are not a JSON object of the expected shape.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::decode_at(bytes, Utc::now())
    }

    /// Decode a sidecar, using `now` for a missing or unreadable `createdAt`.
    ///
    /// A never-dated sidecar therefore reports a different creation time on every read until an
    /// upload persists one.
    ///
    /// # Errors
    ///
    /// Fails if the bytes are not a JSON object of the expected shape.
    pub fn decode_at(bytes: &[u8], now: DateTime<Utc>) -> Result<Self, DecodeError> {
        let raw: RawMetadata = serde_json::from_slice(bytes)?;

        let created_at = raw
            .created_at
            .as_deref()
            .or(raw.date.as_deref())
            .and_then(parse_timestamp)
            .unwrap_or(now);
        let updated_at = raw
            .updated_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(created_at);

        Ok(Self {
            title: raw.title.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            tags: raw.tags.unwrap_or_default(),
            subject: raw.subject.and_then(scalar_to_string),
            semester: raw.semester.and_then(scalar_to_string),
            year: raw.year.and_then(scalar_to_string),
            keywords: raw.keywords.unwrap_or_default(),
            download_url: raw.download_url.filter(|u| !u.trim().is_empty()),
            created_at,
            updated_at,
        })
    }

    /// Serialize for writing back to the store.
    ///
    /// # Errors
    ///
    /// Only fails if serialization itself fails, which it does not for this type.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

/// Accept RFC 3339 timestamps and bare `YYYY-MM-DD` dates.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Subject, semester and year are strings, but hand-edited sidecars often hold numbers.
fn scalar_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn full_document_decodes() {
        let doc = br#"{
            "title": "DBMS Notes",
            "description": "Unit wise notes",
            "tags": ["notes", "revised"],
            "subject": "DBMS",
            "semester": "5",
            "year": "2024",
            "keywords": ["sql"],
            "downloadUrl": "https://example.com/x.zip",
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-05T10:00:00+02:00"
        }"#;
        let m = Metadata::decode_at(doc, now()).unwrap();
        assert_eq!(m.title, "DBMS Notes");
        assert_eq!(m.tags, vec!["notes", "revised"]);
        assert_eq!(m.download_url.as_deref(), Some("https://example.com/x.zip"));
        assert_eq!(m.created_at, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
        assert_eq!(m.updated_at, Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let m = Metadata::decode_at(b"{}", now()).unwrap();
        assert_eq!(m.title, "");
        assert!(m.tags.is_empty());
        assert!(m.keywords.is_empty());
        assert_eq!(m.subject, None);
        assert_eq!(m.created_at, now(), "missing createdAt falls back to the read time");
        assert_eq!(m.updated_at, m.created_at, "updatedAt defaults to createdAt");
    }

    #[test]
    fn legacy_date_key_and_numeric_scalars_are_accepted() {
        let m = Metadata::decode_at(br#"{"date":"2023-07-09","year":2023,"semester":""}"#, now())
            .unwrap();
        assert_eq!(m.created_at, Utc.with_ymd_and_hms(2023, 7, 9, 0, 0, 0).unwrap());
        assert_eq!(m.year.as_deref(), Some("2023"));
        assert_eq!(m.semester, None);
    }

    #[test]
    fn unreadable_timestamp_falls_back() {
        let m = Metadata::decode_at(br#"{"createdAt":"last tuesday"}"#, now()).unwrap();
        assert_eq!(m.created_at, now());
    }

    #[test]
    fn malformed_documents_fail() {
        assert!(Metadata::decode_at(b"{\"title\": ", now()).is_err());
        assert!(Metadata::decode_at(b"[1,2]", now()).is_err());
        assert!(Metadata::decode_at(br#"{"tags":"notes"}"#, now()).is_err());
        assert!(Metadata::decode_at(&[0xff, 0xfe], now()).is_err());
    }

    #[test]
    fn written_form_uses_camel_case_keys() {
        let m = Metadata::decode_at(br#"{"title":"T","downloadUrl":"u"}"#, now()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&m.to_json().unwrap()).unwrap();
        assert_eq!(json["downloadUrl"], "u");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("subject").is_none());
    }
}
