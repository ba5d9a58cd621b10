//! Core data models used throughout the advisor.
//!
//! These types represent the rows, documents, and per-request candidates
//! that flow through the retrieval and selection pipeline.

use std::collections::HashMap;
use std::sync::Arc;

/// One tabular record from the filings source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub path: String,
    pub content: String,
}

impl Row {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// All content fragments sharing one path, in source row order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: String,
    pub fragments: Vec<String>,
    /// Bounded prefix of the joined fragments. Only used for scoring and
    /// for the listing shown to the selection model.
    pub preview: String,
}

impl Document {
    /// Every fragment, joined. Only used once the document is selected.
    pub fn full_text(&self) -> String {
        self.fragments.join("\n\n")
    }
}

/// A document scored against one query.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub document: Arc<Document>,
    pub score: u32,
    /// 1-based position after sorting by score.
    pub rank: usize,
}

/// Listing positions chosen by the selection step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// 1-based, in range, unique, capped.
    pub indices: Vec<usize>,
    /// Optional justification per listing position.
    pub reasons: HashMap<usize, String>,
    pub fallback: bool,
}
