//! Data models for rdgai.
//!
//! This module defines the apparatus object graph built from a TEI document:
//! - `Document` - Owns the XML tree and every entity below, addressed by id
//! - `Apparatus` - One `<app>` variation unit with its readings and pairs
//! - `Reading` - One `<rdg>` with its identifier, text and witnesses
//! - `Pair` - An ordered (active, passive) reading combination and its types
//! - `RelationType` - A category of change declared by an `<interp>`
//!
//! Entities refer to each other through the copyable ids below. The document
//! is the only owner; back-references (such as the pairs classified with a
//! relation type) are secondary indices updated inside the same mutation that
//! updates the primary set.

pub mod apparatus;
pub mod document;
pub mod mapper;
pub mod pair;
pub mod reading;
pub mod relation_type;
pub mod sampler;

pub use apparatus::Apparatus;
pub use document::{CleanReport, Document};
pub use mapper::Mapper;
pub use pair::Pair;
pub use reading::Reading;
pub use relation_type::RelationType;
pub use sampler::ExampleSampler;

use serde::Serialize;
use std::fmt;

/// Provenance marker for classifications made by the automated classifier.
pub const RDGAI_RESPONSIBLE: &str = "#rdgai";

/// Display text for a reading without any text.
pub const OMISSION: &str = "OMIT";

/// `type` attribute value marking the containers this tool reads and writes.
pub const TRANSCRIPTIONAL: &str = "transcriptional";

/// Arrow used when displaying the direction of a pair.
pub const ARROW: &str = "➞";

/// Index of an apparatus within its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ApparatusId(pub(crate) usize);

/// Index of a reading within its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ReadingId(pub(crate) usize);

/// Index of a pair within its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PairId(pub(crate) usize);

/// Index of a relation type within its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RelationTypeId(pub(crate) usize);

impl PairId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl RelationTypeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pair-{}", self.0)
    }
}

/// Strip a leading `#` from a reference token.
pub(crate) fn strip_hash(token: &str) -> &str {
    token.strip_prefix('#').unwrap_or(token)
}

/// Whether a whitespace-separated reference list names `identifier`,
/// with or without a leading `#`.
pub(crate) fn references(value: &str, identifier: &str) -> bool {
    value
        .split_whitespace()
        .any(|token| strip_hash(token) == identifier)
}
