use std::fmt;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// One (subject, category) pair to search for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    subject: String,
    category: String,
}

impl Query {
    pub fn new(subject: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            subject: subject.into().trim().to_string(),
            category: category.into().trim().to_string(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Folder segment for the category: trimmed, whitespace replaced by `_`.
    pub fn category_segment(&self) -> String {
        folder_segment(&self.category)
    }

    /// Relative folder `subject/category_segment`.
    pub fn relative_dir(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(&self.subject).join(self.category_segment())
    }

    /// Text typed into the search surface; also the ledger's search term.
    pub fn search_text(&self, qualifier: &str, include_subject: bool) -> String {
        let mut parts = Vec::with_capacity(3);
        if include_subject {
            parts.push(self.subject.as_str());
        }
        parts.push(self.category.as_str());
        let qualifier = qualifier.trim();
        if !qualifier.is_empty() {
            parts.push(qualifier);
        }
        parts.join(" ")
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.category, self.subject)
    }
}

pub fn folder_segment(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|ch| if ch.is_whitespace() { '_' } else { ch })
        .collect()
}

/// A discovered image and the page it was found on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    pub url: String,
    pub source_page: String,
}

impl ImageReference {
    pub fn new(url: impl Into<String>, source_page: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            source_page: source_page.into(),
        }
    }
}

/// Only network URLs can be fetched; inline `data:` thumbnails are rejected.
pub fn is_network_url(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvenanceRecord {
    pub query_label: String,
    pub url: String,
    pub source_page: String,
}

impl ProvenanceRecord {
    pub fn new(query_label: &str, reference: &ImageReference) -> Self {
        Self {
            query_label: query_label.to_string(),
            url: reference.url.clone(),
            source_page: reference.source_page.clone(),
        }
    }
}
