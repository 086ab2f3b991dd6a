//! Post text sources
//!
//! The queue is read from a spreadsheet column (or a plain text file, one
//! post per line). Reading stops at the first empty entry: anything below a
//! gap is ignored.

use calamine::{open_workbook_auto, Data, Reader};
use std::path::{Path, PathBuf};

use crate::error::{ContentError, Result};

/// Somewhere the ordered list of post texts can be (re)loaded from
pub trait ContentSource: Send + Sync {
    /// Load the usable entries, in order
    fn load(&self) -> Result<Vec<String>>;

    /// Human-readable location, for messages
    fn describe(&self) -> String;
}

/// Take entries until the first missing or blank one
pub fn take_until_blank<I>(cells: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    cells
        .into_iter()
        .map_while(|cell| cell.filter(|text| !text.trim().is_empty()))
        .map(|text| text.trim_end().to_string())
        .collect()
}

/// Pick the source implementation from the file extension
pub fn source_for_path(path: &Path, column: &str) -> Box<dyn ContentSource> {
    let is_spreadsheet = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            matches!(
                ext.to_lowercase().as_str(),
                "xlsx" | "xlsm" | "xlsb" | "xls" | "ods"
            )
        })
        .unwrap_or(false);

    if is_spreadsheet {
        Box::new(SpreadsheetSource::new(path, column))
    } else {
        Box::new(TextFileSource::new(path))
    }
}

/// The post queue: a source plus the entries last read from it
pub struct ContentStore {
    source: Box<dyn ContentSource>,
    entries: Vec<String>,
}

impl ContentStore {
    pub fn new(source: Box<dyn ContentSource>) -> Self {
        Self {
            source,
            entries: Vec::new(),
        }
    }

    /// Store backed by the file at `path`, read lazily
    pub fn open(path: &Path, column: &str) -> Self {
        Self::new(source_for_path(path, column))
    }

    /// Re-read the source and return the new entry count
    ///
    /// On error the previously loaded entries are kept.
    pub fn load(&mut self) -> Result<usize> {
        let entries = self.source.load()?;
        tracing::debug!(
            "Loaded {} post(s) from {}",
            entries.len(),
            self.source.describe()
        );
        self.entries = entries;
        Ok(self.entries.len())
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for `position`, wrapping around the queue
    pub fn get(&self, position: usize) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        Some(&self.entries[position % self.entries.len()])
    }

    pub fn describe(&self) -> String {
        self.source.describe()
    }
}

/// First worksheet of a workbook; the header row names the column
#[derive(Debug, Clone)]
pub struct SpreadsheetSource {
    path: PathBuf,
    column: String,
}

impl SpreadsheetSource {
    pub fn new(path: impl Into<PathBuf>, column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            column: column.into(),
        }
    }

    fn read_rows(&self) -> Result<Vec<Vec<Option<String>>>> {
        let read_error = |reason: String| ContentError::Read {
            path: self.path.display().to_string(),
            reason,
        };

        let mut workbook =
            open_workbook_auto(&self.path).map_err(|e| read_error(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| read_error("workbook has no worksheets".to_string()))?
            .map_err(|e| read_error(e.to_string()))?;

        Ok(range
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Locate `column` in the header row and collect the cells beneath it
pub fn column_entries(rows: &[Vec<Option<String>>], column: &str, path: &str) -> Result<Vec<String>> {
    let missing = || ContentError::MissingColumn {
        path: path.to_string(),
        column: column.to_string(),
    };

    let header = rows.first().ok_or_else(missing)?;
    let index = header
        .iter()
        .position(|cell| cell.as_deref().map(str::trim) == Some(column))
        .ok_or_else(missing)?;

    Ok(take_until_blank(
        rows.iter().skip(1).map(|row| row.get(index).cloned().flatten()),
    ))
}

impl ContentSource for SpreadsheetSource {
    fn load(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Err(ContentError::NotFound(self.path.display().to_string()).into());
        }
        let rows = self.read_rows()?;
        column_entries(&rows, &self.column, &self.path.display().to_string())
    }

    fn describe(&self) -> String {
        format!("{} (column '{}')", self.path.display(), self.column)
    }
}

/// One post per line
#[derive(Debug, Clone)]
pub struct TextFileSource {
    path: PathBuf,
}

impl TextFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ContentSource for TextFileSource {
    fn load(&self) -> Result<Vec<String>> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ContentError::NotFound(self.path.display().to_string()),
            _ => ContentError::Read {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            },
        })?;
        Ok(take_until_blank(text.lines().map(|l| Some(l.to_string()))))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Fixed in-memory list, handy for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    entries: Vec<String>,
}

impl StaticSource {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }
}

impl ContentSource for StaticSource {
    fn load(&self) -> Result<Vec<String>> {
        Ok(take_until_blank(self.entries.iter().cloned().map(Some)))
    }

    fn describe(&self) -> String {
        "in-memory list".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AutopostError;
    use tempfile::TempDir;

    fn row(cells: &[Option<&str>]) -> Vec<Option<String>> {
        cells.iter().map(|c| c.map(str::to_string)).collect()
    }

    #[test]
    fn test_take_until_blank_stops_at_gap() {
        let cells = vec![
            Some("first".to_string()),
            Some("second  ".to_string()),
            None,
            Some("after gap".to_string()),
        ];
        assert_eq!(take_until_blank(cells), vec!["first", "second"]);
    }

    #[test]
    fn test_take_until_blank_whitespace_counts_as_blank() {
        let cells = vec![Some("one".to_string()), Some("   ".to_string()), Some("two".to_string())];
        assert_eq!(take_until_blank(cells), vec!["one"]);
    }

    #[test]
    fn test_take_until_blank_empty_first_entry() {
        let cells = vec![Some(String::new()), Some("x".to_string())];
        assert!(take_until_blank(cells).is_empty());
    }

    #[test]
    fn test_column_entries_finds_header() {
        let rows = vec![
            row(&[Some("Id"), Some("Tweet")]),
            row(&[Some("1"), Some("Hello #1")]),
            row(&[Some("2"), Some("Hello #2")]),
            row(&[Some("3"), None]),
            row(&[Some("4"), Some("never reached")]),
        ];
        let entries = column_entries(&rows, "Tweet", "list.xlsx").unwrap();
        assert_eq!(entries, vec!["Hello #1", "Hello #2"]);
    }

    #[test]
    fn test_column_entries_short_row_ends_queue() {
        let rows = vec![
            row(&[Some("Id"), Some("Tweet")]),
            row(&[Some("1"), Some("Hello")]),
            row(&[Some("2")]),
        ];
        assert_eq!(column_entries(&rows, "Tweet", "x").unwrap(), vec!["Hello"]);
    }

    #[test]
    fn test_column_entries_missing_column() {
        let rows = vec![row(&[Some("Text")]), row(&[Some("Hello")])];
        let err = column_entries(&rows, "Tweet", "list.xlsx").unwrap_err();
        assert!(matches!(
            err,
            AutopostError::Content(ContentError::MissingColumn { .. })
        ));

        assert!(column_entries(&[], "Tweet", "empty.xlsx").is_err());
    }

    #[test]
    fn test_text_source_load_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.txt");
        std::fs::write(&path, "Hello #1\nHello #2\n\nignored\n").unwrap();

        let source = TextFileSource::new(&path);
        let first = source.load().unwrap();
        let second = source.load().unwrap();
        assert_eq!(first, vec!["Hello #1", "Hello #2"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_text_source_missing_file() {
        let source = TextFileSource::new("/nonexistent/queue.txt");
        assert!(matches!(
            source.load().unwrap_err(),
            AutopostError::Content(ContentError::NotFound(_))
        ));
    }

    #[test]
    fn test_spreadsheet_source_missing_file() {
        let source = SpreadsheetSource::new("/nonexistent/tweetlist.xlsx", "Tweet");
        assert!(matches!(
            source.load().unwrap_err(),
            AutopostError::Content(ContentError::NotFound(_))
        ));
    }

    #[test]
    fn test_spreadsheet_source_unreadable_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip archive").unwrap();

        let err = SpreadsheetSource::new(&path, "Tweet").load().unwrap_err();
        assert!(matches!(
            err,
            AutopostError::Content(ContentError::Read { .. })
        ));
    }

    #[test]
    fn test_source_for_path_by_extension() {
        assert!(source_for_path(Path::new("tweetlist.xlsx"), "Tweet")
            .describe()
            .contains("column 'Tweet'"));
        assert_eq!(
            source_for_path(Path::new("queue.txt"), "Tweet").describe(),
            "queue.txt"
        );
    }

    #[test]
    fn test_store_reload_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.txt");
        std::fs::write(&path, "Hello #1\nHello #2\n").unwrap();

        let mut store = ContentStore::open(&path, "Tweet");
        assert!(store.is_empty());
        assert_eq!(store.get(0), None);

        assert_eq!(store.load().unwrap(), 2);
        let first = store.entries().to_vec();
        assert_eq!(store.load().unwrap(), 2);
        assert_eq!(store.entries(), first.as_slice());

        assert_eq!(store.get(1), Some("Hello #2"));
        assert_eq!(store.get(2), Some("Hello #1"));
    }

    #[test]
    fn test_store_keeps_entries_when_reload_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.txt");
        std::fs::write(&path, "Hello\n").unwrap();

        let mut store = ContentStore::open(&path, "Tweet");
        store.load().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(store.load().is_err());
        assert_eq!(store.entries(), ["Hello".to_string()]);
    }

    #[test]
    fn test_static_source_applies_blank_rule() {
        let source = StaticSource::new(["a", "b", "", "c"]);
        assert_eq!(source.load().unwrap(), vec!["a", "b"]);
    }
}
