//! Corpus loading: a JSON array of records or one JSON object per line.

use std::path::Path;

use crate::error::{IndexError, Result};
use crate::types::CorpusRecord;

/// Parse corpus text. A leading `[` selects the array form, anything else is
/// read as JSON lines with blank lines skipped.
///
/// # Errors
///
/// Returns [`IndexError::Corpus`] naming the offending line, or a JSON error for the array form.
pub fn parse_corpus(text: &str) -> Result<Vec<CorpusRecord>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line)
                .map_err(|e| IndexError::Corpus(format!("line {}: {e}", n + 1)))
        })
        .collect()
}

/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or holds no records.
pub async fn load_corpus(path: &Path) -> Result<Vec<CorpusRecord>> {
    let text = tokio::fs::read_to_string(path).await?;
    let records = parse_corpus(&text)?;
    if records.is_empty() {
        return Err(IndexError::Corpus(format!(
            "{} contains no records",
            path.display()
        )));
    }
    tracing::info!(path = %path.display(), records = records.len(), "loaded corpus");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const ROW: &str = r#"{"doc_id":"1","header":"Cloud Concepts","subheader":"IaaS","doc_text":"IaaS lets you rent virtualized hardware."}"#;

    #[test]
    fn parses_json_array() {
        let text = format!("  [{ROW}, {ROW}]");
        let records = parse_corpus(&text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].subheader, "IaaS");
    }

    #[test]
    fn parses_json_lines_skipping_blanks() {
        let text = format!("{ROW}\n\n{ROW}\n");
        assert_eq!(parse_corpus(&text).unwrap().len(), 2);
    }

    #[test]
    fn bad_line_is_reported_with_number() {
        let text = format!("{ROW}\n{{not json}}\n");
        let err = parse_corpus(&text).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[tokio::test]
    async fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{ROW}").unwrap();
        let records = load_corpus(file.path()).await.unwrap();
        assert_eq!(records[0].doc_id, "1");
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = load_corpus(file.path()).await.unwrap_err();
        assert!(matches!(err, IndexError::Corpus(_)));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let err = load_corpus(Path::new("/nonexistent/corpus.jsonl"))
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::Io(_)));
    }
}
