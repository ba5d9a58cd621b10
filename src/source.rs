//! Row sources for the document index.
//!
//! The index only needs "a sequence of (path, content) pairs". [`RowSource`]
//! is that seam: [`CsvRowSource`] reads the filings CSV, and
//! [`MemoryRowSource`] serves fixed rows for tests and embedding callers.
//!
//! # CSV format
//!
//! The file must have a header row containing `Path` and `Content`
//! columns. Columns are matched by name (case-insensitive, surrounding
//! whitespace ignored), never by position, and any other columns are
//! ignored. A leading UTF-8 byte-order mark is tolerated.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::io::Read;
use std::path::PathBuf;

use crate::models::Row;

const PATH_COLUMN: &str = "Path";
const CONTENT_COLUMN: &str = "Content";
const BOM: char = '\u{feff}';

/// Produces the raw rows the document index is built from.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Short label used in log lines (e.g. the file path).
    fn describe(&self) -> String;

    /// Read every row. A source that cannot be read at all is an error.
    async fn rows(&self) -> Result<Vec<Row>>;
}

/// Reads rows from a CSV file on disk.
pub struct CsvRowSource {
    path: PathBuf,
}

impl CsvRowSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RowSource for CsvRowSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn rows(&self) -> Result<Vec<Row>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read filings source: {}", self.path.display()))?;
        parse_rows(bytes.as_slice())
            .with_context(|| format!("Failed to parse filings source: {}", self.path.display()))
    }
}

/// Fixed, in-memory rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryRowSource {
    rows: Vec<Row>,
}

impl MemoryRowSource {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl RowSource for MemoryRowSource {
    fn describe(&self) -> String {
        format!("memory ({} rows)", self.rows.len())
    }

    async fn rows(&self) -> Result<Vec<Row>> {
        Ok(self.rows.clone())
    }
}

/// Parse CSV bytes into rows using the `Path` and `Content` headers.
///
/// Short records yield empty strings for missing fields; filtering of
/// empty values is left to the index.
pub fn parse_rows<R: Read>(reader: R) -> Result<Vec<Row>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers().context("Missing CSV header row")?.clone();
    let path_idx = column_index(&headers, PATH_COLUMN)?;
    let content_idx = column_index(&headers, CONTENT_COLUMN)?;

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        // +2: 1-based, after the header line
        let record = record.with_context(|| format!("Malformed CSV record at row {}", i + 2))?;
        rows.push(Row {
            path: record.get(path_idx).unwrap_or_default().to_string(),
            content: record.get(content_idx).unwrap_or_default().to_string(),
        });
    }

    Ok(rows)
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    match headers
        .iter()
        .position(|h| h.trim_start_matches(BOM).trim().eq_ignore_ascii_case(name))
    {
        Some(idx) => Ok(idx),
        None => bail!(
            "CSV is missing required column '{}' (found: {})",
            name,
            headers
                .iter()
                .map(|h| h.trim_start_matches(BOM))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_matched_by_name() {
        let csv = "Content,Ticker,Path\nrevenue grew,ACME,Item 7 MD&A\n";
        let rows = parse_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows, vec![Row::new("Item 7 MD&A", "revenue grew")]);
    }

    #[test]
    fn test_leading_bom_tolerated() {
        let csv = "\u{feff}Path,Content\nItem 1 Business,we sell hardware\n";
        let rows = parse_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path, "Item 1 Business");
    }

    #[test]
    fn test_quoted_multiline_content() {
        let csv = "Path,Content\n\"Item 7\",\"line one\nline two, with comma\"\n";
        let rows = parse_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].content, "line one\nline two, with comma");
    }

    #[test]
    fn test_short_record_yields_empty_content() {
        let csv = "Path,Content\nItem 1\n";
        let rows = parse_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows, vec![Row::new("Item 1", "")]);
    }

    #[test]
    fn test_missing_column_is_error() {
        let csv = "Section,Body\na,b\n";
        let err = parse_rows(csv.as_bytes()).unwrap_err().to_string();
        assert!(err.contains("Path"), "got: {}", err);
    }

    #[tokio::test]
    async fn test_csv_source_missing_file() {
        let source = CsvRowSource::new("/nonexistent/filings.csv");
        let err = source.rows().await.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read filings source"));
    }

    #[tokio::test]
    async fn test_csv_source_reads_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("filings.csv");
        std::fs::write(&file, "Path,Content\nItem 1A Risk Factors,supply chain risk\n").unwrap();

        let rows = CsvRowSource::new(&file).rows().await.unwrap();
        assert_eq!(rows, vec![Row::new("Item 1A Risk Factors", "supply chain risk")]);
    }
}
