//! In-memory document index.
//!
//! Rows are grouped into one [`Document`] per unique path, preserving the
//! order in which paths were first seen. The index is built lazily on the
//! first [`DocumentIndex::load`] and then held for the lifetime of the
//! process.
//!
//! # Known limitation
//!
//! There is no invalidation. The filings source is treated as static
//! configuration data: editing the CSV has no effect until the process is
//! restarted. A failed build is not cached, so the next call retries.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::models::{Document, Row};
use crate::source::RowSource;

/// Lazily built, never invalidated set of documents.
pub struct DocumentIndex {
    source: Arc<dyn RowSource>,
    preview_chars: usize,
    documents: OnceCell<Vec<Arc<Document>>>,
}

impl DocumentIndex {
    pub fn new(source: Arc<dyn RowSource>, preview_chars: usize) -> Self {
        Self {
            source,
            preview_chars,
            documents: OnceCell::new(),
        }
    }

    /// Return the indexed documents, building them on first use.
    ///
    /// Concurrent first callers wait on a single build. Errors from the
    /// source propagate and leave the cache empty.
    pub async fn load(&self) -> Result<&[Arc<Document>]> {
        let docs = self
            .documents
            .get_or_try_init(|| async {
                let rows = self.source.rows().await?;
                let row_count = rows.len();
                let docs = build_documents(rows, self.preview_chars);
                tracing::info!(
                    source = %self.source.describe(),
                    rows = row_count,
                    documents = docs.len(),
                    "document index built"
                );
                Ok::<_, anyhow::Error>(docs.into_iter().map(Arc::new).collect())
            })
            .await?;
        Ok(docs.as_slice())
    }

    pub fn is_loaded(&self) -> bool {
        self.documents.initialized()
    }
}

/// Group rows into documents keyed by trimmed path.
///
/// Rows whose path or content is empty after trimming are dropped, so
/// every returned document has at least one fragment.
pub fn build_documents(rows: Vec<Row>, preview_chars: usize) -> Vec<Document> {
    let mut order: Vec<String> = Vec::new();
    let mut fragments: HashMap<String, Vec<String>> = HashMap::new();
    let mut skipped = 0usize;

    for row in rows {
        let path = row.path.trim();
        let content = row.content.trim();
        if path.is_empty() || content.is_empty() {
            skipped += 1;
            continue;
        }

        match fragments.get_mut(path) {
            Some(list) => list.push(content.to_string()),
            None => {
                order.push(path.to_string());
                fragments.insert(path.to_string(), vec![content.to_string()]);
            }
        }
    }

    if skipped > 0 {
        tracing::debug!(skipped, "rows with empty path or content skipped");
    }

    order
        .into_iter()
        .map(|path| {
            let fragments = fragments.remove(&path).unwrap_or_default();
            let preview = make_preview(&fragments, preview_chars);
            Document {
                path,
                fragments,
                preview,
            }
        })
        .collect()
}

fn make_preview(fragments: &[String], preview_chars: usize) -> String {
    fragments.join(" ").chars().take(preview_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryRowSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_groups_by_path_in_first_seen_order() {
        let rows = vec![
            Row::new("Item 7 MD&A", "revenue grew"),
            Row::new("Item 1 Business", "we sell hardware"),
            Row::new("Item 7 MD&A", "margins fell"),
        ];
        let docs = build_documents(rows, 100);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].path, "Item 7 MD&A");
        assert_eq!(docs[0].fragments, vec!["revenue grew", "margins fell"]);
        assert_eq!(docs[1].path, "Item 1 Business");
    }

    #[test]
    fn test_blank_rows_dropped() {
        let rows = vec![
            Row::new("  ", "orphan content"),
            Row::new("Item 2 Properties", "   "),
            Row::new(" Item 3 Legal ", " pending suit "),
        ];
        let docs = build_documents(rows, 100);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].path, "Item 3 Legal");
        assert_eq!(docs[0].fragments, vec!["pending suit"]);
    }

    #[test]
    fn test_path_with_only_blank_content_absent() {
        let rows = vec![Row::new("Item 9", ""), Row::new("Item 9", " ")];
        assert!(build_documents(rows, 100).is_empty());
    }

    #[test]
    fn test_preview_bounded_and_full_text_complete() {
        let rows = vec![
            Row::new("Item 7", "abcdef"),
            Row::new("Item 7", "ghijkl"),
        ];
        let docs = build_documents(rows, 8);
        assert_eq!(docs[0].preview, "abcdef g");
        assert_eq!(docs[0].full_text(), "abcdef\n\nghijkl");
    }

    #[test]
    fn test_preview_counts_chars_not_bytes() {
        let rows = vec![Row::new("Notes", "ééééé")];
        let docs = build_documents(rows, 3);
        assert_eq!(docs[0].preview, "ééé");
    }

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl RowSource for CountingSource {
        fn describe(&self) -> String {
            "counting".to_string()
        }

        async fn rows(&self) -> Result<Vec<Row>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail && n == 0 {
                anyhow::bail!("source unavailable");
            }
            Ok(vec![Row::new("Item 1", "text")])
        }
    }

    #[tokio::test]
    async fn test_load_is_memoized() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let index = DocumentIndex::new(source.clone(), 50);

        let first: Vec<_> = index.load().await.unwrap().to_vec();
        let second = index.load().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.len(), second.len());
        assert!(Arc::ptr_eq(&first[0], &second[0]));
    }

    #[tokio::test]
    async fn test_failed_load_not_cached() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let index = DocumentIndex::new(source.clone(), 50);

        assert!(index.load().await.is_err());
        assert!(!index.is_loaded());

        let docs = index.load().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_source_loads_empty_index() {
        let index = DocumentIndex::new(Arc::new(MemoryRowSource::default()), 50);
        assert!(index.load().await.unwrap().is_empty());
        assert!(index.is_loaded());
    }
}
