//! Corpus table loading
//!
//! The corpus is a CSV table with the columns `chunk_id`, `source_doc`, `page`
//! and `text`. Columns are found by header name; order and extra columns do
//! not matter.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Chunk, PageRef};

const REQUIRED_COLUMNS: [&str; 4] = ["chunk_id", "source_doc", "page", "text"];

/// Load chunks from a CSV file
pub fn load_csv(path: &Path) -> Result<Vec<Chunk>> {
    let source_name = path.display().to_string();
    let file = std::fs::File::open(path)
        .map_err(|e| Error::corpus(&source_name, format!("Cannot open: {}", e)))?;

    let chunks = read_csv(file, &source_name)?;
    tracing::info!(source = %source_name, chunks = chunks.len(), "Corpus loaded");
    Ok(chunks)
}

/// Read chunks from any CSV reader, in row order
pub fn read_csv<R: Read>(reader: R, source_name: &str) -> Result<Vec<Chunk>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| Error::corpus(source_name, format!("Cannot read header: {}", e)))?
        .clone();

    let mut positions = [0usize; 4];
    for (slot, column) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(column))
            .ok_or_else(|| Error::corpus(source_name, format!("Missing column '{}'", column)))?;
    }
    let [id_col, doc_col, page_col, text_col] = positions;

    let mut chunks = Vec::new();
    let mut seen = HashSet::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            Error::corpus(source_name, format!("Bad record at row {}: {}", row + 1, e))
        })?;
        let cell = |col: usize| record.get(col).unwrap_or_default();

        let id = cell(id_col);
        if !seen.insert(id.to_string()) {
            return Err(Error::corpus(
                source_name,
                format!("Duplicate chunk_id '{}' at row {}", id, row + 1),
            ));
        }

        chunks.push(Chunk::new(
            id,
            cell(doc_col),
            PageRef::parse(cell(page_col)),
            cell(text_col),
        ));
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_in_row_order() {
        let data = "chunk_id,source_doc,page,text\n\
                    c1,policy.pdf,4,\"Hospitalization, day care covered\"\n\
                    c2,policy.pdf,Annexure A,Dental excluded\n";
        let chunks = read_csv(data.as_bytes(), "inline").unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_id, "c1");
        assert_eq!(chunks[0].page, PageRef::Number(4));
        assert_eq!(chunks[0].text, "Hospitalization, day care covered");
        assert_eq!(chunks[1].page, PageRef::Locator("Annexure A".into()));
    }

    #[test]
    fn test_columns_found_by_header() {
        let data = "text,extra,page,source_doc,chunk_id\nSome clause,x,2,terms.pdf,k9\n";
        let chunks = read_csv(data.as_bytes(), "inline").unwrap();
        assert_eq!(chunks[0], Chunk::new("k9", "terms.pdf", PageRef::Number(2), "Some clause"));
    }

    #[test]
    fn test_missing_column_fails() {
        let data = "chunk_id,source_doc,text\nc1,policy.pdf,clause\n";
        match read_csv(data.as_bytes(), "broken.csv") {
            Err(Error::Corpus { source_name, message }) => {
                assert_eq!(source_name, "broken.csv");
                assert!(message.contains("page"));
            }
            other => panic!("expected corpus error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_chunk_id_fails() {
        let data = "chunk_id,source_doc,page,text\n\
                    c1,a.pdf,1,first\n\
                    c2,a.pdf,2,second\n\
                    c1,b.pdf,3,third\n";
        match read_csv(data.as_bytes(), "dupes.csv") {
            Err(Error::Corpus { source_name, message }) => {
                assert_eq!(source_name, "dupes.csv");
                assert_eq!(message, "Duplicate chunk_id 'c1' at row 3");
            }
            other => panic!("expected corpus error, got {:?}", other),
        }
    }

    #[test]
    fn test_header_only_is_empty() {
        let data = "chunk_id,source_doc,page,text\n";
        assert!(read_csv(data.as_bytes(), "inline").unwrap().is_empty());
    }

    #[test]
    fn test_missing_file() {
        let result = load_csv(Path::new("/nonexistent/corpus.csv"));
        assert!(matches!(result, Err(Error::Corpus { .. })));
    }
}
