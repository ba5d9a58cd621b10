//! Lexical prefilter.
//!
//! Shrinks the corpus to a candidate set small enough for one selection
//! call. Scoring is per-token presence, not frequency:
//!
//! ```text
//! score = 2 * |query tokens found in lower(path)|
//!       + 1 * |query tokens found in lower(preview)|
//! ```
//!
//! Only the preview is scanned, so cost does not grow with document
//! length. Ties keep index order.

use std::sync::Arc;

use crate::models::{Candidate, Document};

const PATH_WEIGHT: u32 = 2;
const PREVIEW_WEIGHT: u32 = 1;

/// Split on non-word characters, lower-case, drop empties and repeats.
pub fn tokenize(query: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for raw in query.split(|c: char| !(c.is_alphanumeric() || c == '_')) {
        if raw.is_empty() {
            continue;
        }
        let token = raw.to_lowercase();
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}

/// Score one document against already-tokenized query terms.
pub fn score_document(doc: &Document, tokens: &[String]) -> u32 {
    let path = doc.path.to_lowercase();
    let preview = doc.preview.to_lowercase();

    let path_hits = tokens.iter().filter(|t| path.contains(t.as_str())).count() as u32;
    let preview_hits = tokens
        .iter()
        .filter(|t| preview.contains(t.as_str()))
        .count() as u32;

    PATH_WEIGHT * path_hits + PREVIEW_WEIGHT * preview_hits
}

/// Rank all documents for `query` and keep the top `k`.
///
/// Every document is a candidate, including zero-score ones; only an
/// empty index (or `k == 0`) produces an empty list.
pub fn rank(documents: &[Arc<Document>], query: &str, k: usize) -> Vec<Candidate> {
    let tokens = tokenize(query);

    let mut scored: Vec<(usize, u32)> = documents
        .iter()
        .enumerate()
        .map(|(i, doc)| (i, score_document(doc, &tokens)))
        .collect();

    // stable: equal scores keep index order
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    scored
        .into_iter()
        .take(k)
        .enumerate()
        .map(|(pos, (i, score))| Candidate {
            document: documents[i].clone(),
            score,
            rank: pos + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(path: &str, preview: &str) -> Arc<Document> {
        Arc::new(Document {
            path: path.to_string(),
            fragments: vec![preview.to_string()],
            preview: preview.to_string(),
        })
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("What are Company X's  main revenue-segments?"),
            vec!["what", "are", "company", "x", "s", "main", "revenue", "segments"]
        );
    }

    #[test]
    fn test_tokenize_dedupes_case_insensitively() {
        assert_eq!(tokenize("Revenue revenue REVENUE"), vec!["revenue"]);
        assert!(tokenize("  ?!  ").is_empty());
    }

    #[test]
    fn test_path_hits_weighted_double() {
        let docs = vec![
            doc("Item 1 Business", "the company sells hardware"),
            doc("Item 7 MD&A", "revenue grew due to hardware demand"),
        ];
        let tokens = tokenize("hardware revenue");
        // "hardware" is not in "item 1 business": 0 path hits, 1 preview hit
        assert_eq!(score_document(&docs[0], &tokens), 1);
        assert_eq!(score_document(&docs[1], &tokens), 2);
        let ranked = rank(&docs, "hardware revenue", 10);
        assert_eq!(ranked[0].document.path, "Item 7 MD&A");

        let docs = vec![
            doc("Item 1 Business Hardware", "the company sells hardware"),
            doc("Item 7 MD&A", "revenue grew due to hardware demand"),
        ];
        // 1 path hit (2) + 1 preview hit (1) = 3 beats 2 preview hits
        assert_eq!(score_document(&docs[0], &tokens), 3);
        let ranked = rank(&docs, "hardware revenue", 10);
        assert_eq!(ranked[0].document.path, "Item 1 Business Hardware");
        assert_eq!(ranked[0].score, 3);
        assert_eq!(ranked[1].score, 2);
    }

    #[test]
    fn test_presence_not_frequency() {
        let d = doc("Notes", "debt debt debt debt");
        assert_eq!(score_document(&d, &tokenize("debt")), 1);
    }

    #[test]
    fn test_substring_match() {
        let d = doc("Item 7 MD&A", "segmentation of revenues");
        assert_eq!(score_document(&d, &tokenize("segment revenue")), 2);
    }

    #[test]
    fn test_ties_keep_index_order_and_sorted_desc() {
        let docs = vec![
            doc("A", "nothing"),
            doc("B", "cash flow"),
            doc("C", "nothing"),
            doc("D", "cash"),
            doc("E", "cash flow"),
        ];
        let ranked = rank(&docs, "cash flow", 10);
        let paths: Vec<&str> = ranked.iter().map(|c| c.document.path.as_str()).collect();
        assert_eq!(paths, vec!["B", "E", "D", "A", "C"]);
        for w in ranked.windows(2) {
            assert!(w[0].score >= w[1].score);
        }
        let ranks: Vec<usize> = ranked.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_truncates_to_k() {
        let docs = vec![doc("A", "x"), doc("B", "x"), doc("C", "x")];
        assert_eq!(rank(&docs, "x", 2).len(), 2);
        assert!(rank(&docs, "x", 0).is_empty());
        assert!(rank(&[], "x", 5).is_empty());
    }
}
