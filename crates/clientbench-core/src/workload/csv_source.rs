use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::BenchError;
use crate::workload::{ListScope, WorkloadScope, WorkloadSource};

/// Messages read from one column of a CSV file with a header row.
///
/// The file is (re)read every time a scope is opened, so each run sees the
/// file's current contents. A missing file or column fails the scope open,
/// which the runner treats as a fatal setup error for that run.
#[derive(Debug, Clone)]
pub struct CsvWorkload {
    path: PathBuf,
    column: String,
    recycle: bool,
}

impl CsvWorkload {
    pub fn new(path: impl Into<PathBuf>, column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            column: column.into(),
            recycle: false,
        }
    }

    /// Loop back to the first row instead of exhausting.
    pub fn recycle(mut self, recycle: bool) -> Self {
        self.recycle = recycle;
        self
    }

    /// Parse CSV text and return the non-empty values of `column`.
    pub fn parse_column(content: &[u8], column: &str) -> Result<Vec<String>, BenchError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(content);

        let idx = reader
            .headers()?
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| BenchError::Workload(format!("CSV column '{column}' not found")))?;

        let mut values = Vec::new();
        for record in reader.records() {
            let record = record?;
            if let Some(value) = record.get(idx) {
                if !value.is_empty() {
                    values.push(value.to_string());
                }
            }
        }
        Ok(values)
    }
}

#[async_trait]
impl WorkloadSource for CsvWorkload {
    fn describe(&self) -> String {
        format!("csv {} [{}]", self.path.display(), self.column)
    }

    async fn open_scope(&self, label: &str) -> Result<Box<dyn WorkloadScope>, BenchError> {
        let content = tokio::fs::read(&self.path).await.map_err(|e| {
            BenchError::Workload(format!("cannot read {}: {e}", self.path.display()))
        })?;
        let values = Self::parse_column(&content, &self.column)?;
        tracing::debug!(
            label,
            path = %self.path.display(),
            rows = values.len(),
            "opened CSV workload scope"
        );
        Ok(Box::new(ListScope::new(values, self.recycle)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::Next;

    #[test]
    fn parse_column_picks_named_column_and_skips_blanks() {
        let csv = b"id,text\n1,hello\n2,\n3, world \n";
        let values = CsvWorkload::parse_column(csv, "text").expect("parse should succeed");
        assert_eq!(values, vec!["hello", "world"]);
    }

    #[test]
    fn parse_column_missing_column_is_workload_error() {
        let csv = b"id,body\n1,hello\n";
        let err = CsvWorkload::parse_column(csv, "text").unwrap_err();
        assert!(matches!(err, BenchError::Workload(_)));
    }

    #[tokio::test]
    async fn open_scope_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("messages.csv");
        tokio::fs::write(&path, "text\nfirst\nsecond\n")
            .await
            .expect("write should succeed");

        let source = CsvWorkload::new(&path, "text");
        let mut scope = source.open_scope("reqwest").await.expect("open should succeed");
        assert!(matches!(scope.next().await.expect("next"), Next::Unit(u) if u.payload == "first"));
        assert!(matches!(scope.next().await.expect("next"), Next::Unit(u) if u.payload == "second"));
        assert_eq!(scope.next().await.expect("next"), Next::Exhausted);
    }

    #[tokio::test]
    async fn open_scope_recycles_rows() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("messages.csv");
        tokio::fs::write(&path, "text\nonly\n").await.expect("write");

        let source = CsvWorkload::new(&path, "text").recycle(true);
        let mut scope = source.open_scope("x").await.expect("open");
        for _ in 0..3 {
            assert!(matches!(scope.next().await.expect("next"), Next::Unit(_)));
        }
    }

    #[tokio::test]
    async fn open_scope_missing_file_fails() {
        let source = CsvWorkload::new("/nonexistent/messages.csv", "text");
        let result = source.open_scope("x").await;
        assert!(matches!(result, Err(BenchError::Workload(_))));
    }
}
