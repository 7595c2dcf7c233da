//! rdgai - classify the relations between variant readings in TEI apparatuses.
//!
//! This library provides the core functionality for the `rdgai` CLI tool:
//! an object graph of apparatuses, readings, ordered reading pairs and
//! relation types built from a TEI document, kept in sync with the XML so the
//! document can be written back at any point.

pub mod classify;
pub mod cli;
pub mod commands;
pub mod config;
pub mod editor;
pub mod models;
pub mod tabular;
pub mod xml;

/// Test utilities shared by unit tests.
#[cfg(test)]
pub(crate) mod test_utils {
    use crate::models::Document;

    /// Three readings, three declared categories, no classifications.
    pub const MINIMAL: &str = include_str!("../tests/data/minimal.xml");

    /// Parse the minimal fixture.
    pub fn minimal_doc() -> Document {
        Document::parse(MINIMAL).unwrap()
    }
}

/// Library-level error type for rdgai operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Kdl(#[from] kdl::KdlError),

    #[error("Malformed XML: {0}")]
    MalformedXml(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(
        "Category '{category}' is declared as the inverse of both '{existing}' and '{claimed}'"
    )]
    InconsistentInverse {
        category: String,
        existing: String,
        claimed: String,
    },

    #[error("Classification service error: {0}")]
    Classifier(String),
}

/// Result type alias for rdgai operations.
pub type Result<T> = std::result::Result<T, Error>;
