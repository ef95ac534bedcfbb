use serde::{Deserialize, Serialize};

use bookstore_resources::api::{Book, ResourceId};

use crate::error::ErrorKind;

pub const AUTHOR_NOT_AVAILABLE: &str = "Author details not available";
pub const CATEGORY_NOT_AVAILABLE: &str = "Category details not available";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityRef {
    pub id: ResourceId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
/// Nested object of a book view.
/// When the lookup failed it serializes as a plain sentinel string
pub enum Enrichment {
    Resolved(EntityRef),
    Unavailable(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailedLookup {
    /// Id the book referenced
    pub id: ResourceId,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Marker attached to a degraded book view, one entry per failed lookup
pub struct EnrichmentFailure {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<FailedLookup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FailedLookup>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Book with its author and category resolved. Built per request, never stored
pub struct BookView {
    pub id: ResourceId,
    pub title: String,
    pub isbn: String,
    pub price: f64,
    pub publish_date: String,
    pub author: Enrichment,
    pub category: Enrichment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EnrichmentFailure>,
}

impl BookView {
    pub fn new(book: Book, author: Enrichment, category: Enrichment) -> Self {
        Self {
            id: book.id,
            title: book.title,
            isbn: book.isbn,
            price: book.price,
            publish_date: book.publish_date,
            author,
            category,
            error: None,
        }
    }

    /// True when at least one nested lookup failed
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: ErrorKind,
    pub message: String,
}
