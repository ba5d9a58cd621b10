//! Grounding context for the answer call.
//!
//! Every selected document is included in full, in selection order, each
//! wrapped in a `<source path="...">` block so the model can tell where one
//! section ends and the next begins. Nothing is truncated.

use std::sync::Arc;

use crate::models::Document;

pub fn assemble(query: &str, documents: &[Arc<Document>]) -> String {
    let blocks = documents
        .iter()
        .map(|doc| {
            format!(
                "<source path=\"{}\">\n{}\n</source>",
                doc.path.replace('"', "'"),
                doc.full_text()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("Question: {query}\n\nFiling excerpts:\n\n{blocks}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(path: &str, fragments: &[&str]) -> Arc<Document> {
        Arc::new(Document {
            path: path.to_string(),
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            preview: String::new(),
        })
    }

    #[test]
    fn test_blocks_in_selection_order() {
        let docs = vec![doc("Item 7 MD&A", &["b"]), doc("Item 1 Business", &["a"])];
        let ctx = assemble("q", &docs);
        let first = ctx.find("Item 7 MD&A").unwrap();
        let second = ctx.find("Item 1 Business").unwrap();
        assert!(first < second);
        assert!(ctx.starts_with("Question: q"));
    }

    #[test]
    fn test_full_text_not_truncated() {
        let long = "x".repeat(50_000);
        let docs = vec![doc("Notes", &[long.as_str(), "tail fragment"])];
        let ctx = assemble("q", &docs);
        assert!(ctx.contains(&long));
        assert!(ctx.contains("tail fragment\n</source>"));
    }

    #[test]
    fn test_deterministic() {
        let docs = vec![doc("A", &["one", "two"]), doc("B", &["three"])];
        assert_eq!(assemble("q", &docs), assemble("q", &docs));
    }

    #[test]
    fn test_path_quotes_do_not_break_delimiter() {
        let docs = vec![doc("Item \"7\"", &["t"])];
        assert!(assemble("q", &docs).contains("<source path=\"Item '7'\">"));
    }
}
