//! The closed set of top-level resource categories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A top-level folder of the content repository. Every resource lives under exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Notes,
    LabPrograms,
    QuestionPapers,
    SoftwareTools,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category `{0}`; expected one of notes, lab-programs, question-papers, software-tools")]
pub struct UnknownCategory(pub String);

impl Category {
    pub const ALL: [Self; 4] = [
        Self::Notes,
        Self::LabPrograms,
        Self::QuestionPapers,
        Self::SoftwareTools,
    ];

    /// The path prefix (and tag value) for this category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Notes => "notes",
            Self::LabPrograms => "lab-programs",
            Self::QuestionPapers => "question-papers",
            Self::SoftwareTools => "software-tools",
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Notes => "Notes",
            Self::LabPrograms => "Lab Programs",
            Self::QuestionPapers => "Question Papers",
            Self::SoftwareTools => "Software Tools",
        }
    }

    /// The distinct categories named in a tag list, in first-seen order.
    pub fn in_tags<S: AsRef<str>>(tags: &[S]) -> Vec<Self> {
        let mut found = Vec::new();
        for category in tags.iter().filter_map(|t| t.as_ref().parse::<Self>().ok()) {
            if !found.contains(&category) {
                found.push(category);
            }
        }
        found
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}
