//! Delimited-file source for the benchmark dataset.

use crate::error::MlError;
use csv::{ReaderBuilder, Trim};
use std::path::{Path, PathBuf};

/// Header plus raw string cells of a delimited file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// CSV (or other single-byte delimited) file.
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    pub delimiter: u8,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file. Rows whose width differs from the header are rejected.
    pub fn read(&self) -> Result<RawTable, MlError> {
        if !self.path.is_file() {
            return Err(MlError::not_found(format!(
                "file not found at {}",
                self.path.display()
            )));
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .trim(Trim::All)
            .from_path(&self.path)?;

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                if matches!(e.kind(), csv::ErrorKind::UnequalLengths { .. }) {
                    MlError::data(format!(
                        "row {} does not match the {}-column header: {e}",
                        line + 1,
                        columns.len()
                    ))
                } else {
                    MlError::Csv(e)
                }
            })?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(RawTable { columns, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_header_and_rows() {
        let file = write_file("a, b ,satisfaction\n1,2,yes\n3,4,no\n");
        let table = CsvSource::new(file.path()).read().unwrap();
        assert_eq!(table.columns, vec!["a", "b", "satisfaction"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[1], vec!["3", "4", "no"]);
        assert_eq!(table.column_index("satisfaction"), Some(2));
    }

    #[test]
    fn test_read_custom_delimiter() {
        let file = write_file("a;b\n1;2\n");
        let table = CsvSource::new(file.path())
            .with_delimiter(b';')
            .read()
            .unwrap();
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.rows[0], vec!["1", "2"]);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = CsvSource::new("/nonexistent/data.csv").read().unwrap_err();
        assert!(matches!(err, MlError::NotFound(_)));
    }

    #[test]
    fn test_empty_file_has_no_rows() {
        let file = write_file("");
        let table = CsvSource::new(file.path()).read().unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 0);
    }

    #[test]
    fn test_ragged_row_is_data_error() {
        let file = write_file("a,b\n1,2\n3\n");
        let err = CsvSource::new(file.path()).read().unwrap_err();
        assert!(matches!(err, MlError::Data(_)));
    }
}
