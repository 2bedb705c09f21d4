//! CSV storage layer.
//!
//! The [`CourseStore`] owns the two crawl files (courses and empty prefixes).
//! Rows are only ever appended; an overwrite run resets both files to a bare
//! header first. [`read_rows`] / [`write_rows`] are the generic helpers the
//! analysis reports use.
//!
//! **Access rules:** one writer process at a time. Nothing here locks.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use coursescope_shared::{COURSE_COLUMNS, CourseRecord, CourseScopeError, EmptyPrefixEntry, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Column order of the empty-prefixes file.
pub const EMPTY_PREFIX_COLUMNS: [&str; 4] = ["term", "term_code", "prefix", "error"];

/// Handle on the crawler's two output files.
#[derive(Debug, Clone)]
pub struct CourseStore {
    courses_path: PathBuf,
    empty_prefixes_path: PathBuf,
}

impl CourseStore {
    /// Point the store at its files. Parent directories are created on first write.
    pub fn new(courses_path: impl Into<PathBuf>, empty_prefixes_path: impl Into<PathBuf>) -> Self {
        Self {
            courses_path: courses_path.into(),
            empty_prefixes_path: empty_prefixes_path.into(),
        }
    }

    pub fn courses_path(&self) -> &Path {
        &self.courses_path
    }

    pub fn empty_prefixes_path(&self) -> &Path {
        &self.empty_prefixes_path
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// All course rows on disk. A missing file reads as empty.
    pub fn load_courses(&self) -> Result<Vec<CourseRecord>> {
        if !self.courses_path.exists() {
            tracing::info!(path = ?self.courses_path, "no existing courses file, starting fresh");
            return Ok(Vec::new());
        }
        let rows = read_rows(&self.courses_path)?;
        tracing::info!(count = rows.len(), path = ?self.courses_path, "loaded existing courses");
        Ok(rows)
    }

    /// All empty-prefix entries on disk. A missing file reads as empty.
    pub fn load_empty_prefixes(&self) -> Result<Vec<EmptyPrefixEntry>> {
        if !self.empty_prefixes_path.exists() {
            return Ok(Vec::new());
        }
        read_rows(&self.empty_prefixes_path)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Append course rows, writing the header if the file is new or empty.
    pub fn append_courses(&self, courses: &[CourseRecord]) -> Result<()> {
        if courses.is_empty() {
            return Ok(());
        }
        append_rows(&self.courses_path, &COURSE_COLUMNS, courses)
    }

    /// Record a (term, prefix) pair that returned nothing.
    pub fn append_empty_prefix(&self, entry: &EmptyPrefixEntry) -> Result<()> {
        append_rows(
            &self.empty_prefixes_path,
            &EMPTY_PREFIX_COLUMNS,
            std::slice::from_ref(entry),
        )
    }

    /// Truncate both files to a bare header (overwrite mode).
    pub fn reset(&self) -> Result<()> {
        write_rows::<CourseRecord>(&self.courses_path, &COURSE_COLUMNS, &[])?;
        write_rows::<EmptyPrefixEntry>(&self.empty_prefixes_path, &EMPTY_PREFIX_COLUMNS, &[])?;
        tracing::info!(
            courses = ?self.courses_path,
            empty_prefixes = ?self.empty_prefixes_path,
            "reset crawl output files"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Generic helpers
// ---------------------------------------------------------------------------

/// Deserialize every row of a headed CSV file.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(|e| CourseScopeError::csv(path, e))
}

/// Deserialize every row, reading column `from` as field `to` for each
/// `(from, to)` pair. A column already named `to` is shadowed.
pub fn read_rows_renamed<T: DeserializeOwned>(path: &Path, renames: &[(&str, &str)]) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let headers: csv::StringRecord = reader
        .headers()
        .map_err(|e| CourseScopeError::csv(path, e))?
        .iter()
        .map(|h| rename_header(h.trim(), renames))
        .collect();
    reader.set_headers(headers);
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(|e| CourseScopeError::csv(path, e))
}

fn rename_header(header: &str, renames: &[(&str, &str)]) -> String {
    if let Some((_, to)) = renames.iter().find(|(from, _)| *from == header) {
        return to.to_string();
    }
    if renames.iter().any(|(from, to)| *to == header && from != to) {
        return format!("{header}_shadowed");
    }
    header.to_string()
}

/// Header names of a CSV file.
pub fn read_headers(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let headers = reader.headers().map_err(|e| CourseScopeError::csv(path, e))?;
    Ok(headers.iter().map(|h| h.trim().to_string()).collect())
}

/// Fail with a validation error naming every `required` column missing from `path`.
pub fn require_columns(path: &Path, required: &[&str]) -> Result<()> {
    let headers = read_headers(path)?;
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == col))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CourseScopeError::validation(format!(
            "{} is missing required columns: {}",
            path.display(),
            missing.join(", ")
        )))
    }
}

/// Write `rows` to `path` (replacing it), header first even when `rows` is empty.
pub fn write_rows<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path).map_err(|e| CourseScopeError::io(path, e))?;
    write_into(file, path, header, true, rows)
}

/// Append `rows` to `path`, writing `header` only when the file is new or empty.
pub fn append_rows<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| CourseScopeError::io(path, e))?;
    write_into(file, path, header, needs_header, rows)
}

fn write_into<T: Serialize>(
    file: File,
    path: &Path,
    header: &[&str],
    with_header: bool,
    rows: &[T],
) -> Result<()> {
    // Headers are written by hand so an empty report still gets one.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if with_header {
        writer
            .write_record(header)
            .map_err(|e| CourseScopeError::csv(path, e))?;
    }
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| CourseScopeError::csv(path, e))?;
    }
    writer.flush().map_err(|e| CourseScopeError::io(path, e))
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| CourseScopeError::io(parent, e))
        }
        _ => Ok(()),
    }
}

fn csv_error(path: &Path, err: csv::Error) -> CourseScopeError {
    if err.is_io_error() {
        if let csv::ErrorKind::Io(io) = err.into_kind() {
            return CourseScopeError::io(path, io);
        }
        return CourseScopeError::csv(path, "I/O failure");
    }
    CourseScopeError::csv(path, err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(term: &str, prefix: &str, number: &str) -> CourseRecord {
        CourseRecord {
            term: term.into(),
            catalog_year: "2025-2026".into(),
            prefix: prefix.into(),
            number: number.into(),
            title: format!("{prefix} {number} title"),
            description: "A course, with a comma.".into(),
            units: "3".into(),
            sections_offered: vec!["Fall 2025".into(), "Spring 2026".into()],
            url: format!("https://catalog.example.edu/Courses/course?courseId={prefix}{number}"),
        }
    }

    fn store(dir: &Path) -> CourseStore {
        CourseStore::new(dir.join("out/courses.csv"), dir.join("out/empty.csv"))
    }

    #[test]
    fn missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert!(store.load_courses().unwrap().is_empty());
        assert!(store.load_empty_prefixes().unwrap().is_empty());
    }

    #[test]
    fn append_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store.append_courses(&[course("Fall 2025", "CS", "470")]).unwrap();
        store.append_courses(&[course("Fall 2025", "CS", "480")]).unwrap();

        let raw = std::fs::read_to_string(store.courses_path()).unwrap();
        assert_eq!(raw.matches("term,catalog_year,prefix").count(), 1);
        assert!(raw.contains("Fall 2025; Spring 2026"));

        let loaded = store.load_courses().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], course("Fall 2025", "CS", "470"));
        assert_eq!(loaded[1].sections_offered.len(), 2);
    }

    #[test]
    fn empty_prefix_entries_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store
            .append_empty_prefix(&EmptyPrefixEntry::empty("Fall 2025", 1257, "ZZZ"))
            .unwrap();
        store
            .append_empty_prefix(&EmptyPrefixEntry::empty("Spring 2026", 1261, "ZZZ"))
            .unwrap();

        let entries = store.load_empty_prefixes().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].term_code, 1261);
        assert_eq!(entries[0].error, "empty");
    }

    #[test]
    fn reset_leaves_bare_headers() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store.append_courses(&[course("Fall 2025", "CS", "470")]).unwrap();

        store.reset().unwrap();

        assert!(store.load_courses().unwrap().is_empty());
        let raw = std::fs::read_to_string(store.empty_prefixes_path()).unwrap();
        assert_eq!(raw.trim(), "term,term_code,prefix,error");
    }

    #[test]
    fn minimal_course_csv_loads_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minimal.csv");
        std::fs::write(
            &path,
            "prefix,number,title,description\nCS,470,Artificial Intelligence,\n",
        )
        .unwrap();

        let rows: Vec<CourseRecord> = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "");
        assert!(rows[0].sections_offered.is_empty());
        assert_eq!(rows[0].term, "");
    }

    #[test]
    fn renamed_columns_deserialize_as_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.csv");
        std::fs::write(
            &path,
            "subject,catalog_nbr,course_title,title,description\nCS,470,Artificial Intelligence,ignored,Search.\n",
        )
        .unwrap();

        let rows: Vec<CourseRecord> = read_rows_renamed(
            &path,
            &[("subject", "prefix"), ("catalog_nbr", "number"), ("course_title", "title")],
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].prefix, "CS");
        assert_eq!(rows[0].number, "470");
        assert_eq!(rows[0].title, "Artificial Intelligence");
        assert_eq!(rows[0].description, "Search.");
    }

    #[test]
    fn require_columns_names_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.csv");
        std::fs::write(&path, "prefix,title\nCS,AI\n").unwrap();

        let err = require_columns(&path, &["prefix", "number", "title", "description"])
            .unwrap_err()
            .to_string();
        assert!(err.contains("number, description"));
        assert!(require_columns(&path, &["prefix"]).is_ok());
    }
}
