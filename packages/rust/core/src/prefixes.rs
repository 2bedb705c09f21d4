//! Prefix list extraction from the catalog's "Course Numbering and Prefixes"
//! document.

use std::collections::BTreeSet;
use std::path::Path;
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, instrument};

use coursescope_shared::{CourseScopeError, Result};

static PREFIX_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z&]{2,6})\s+([A-Za-z].+)$").expect("valid prefix line regex")
});

/// Table header words that look like codes.
const HEADER_WORDS: &[&str] = &["COURSE", "CODE", "SUBJECT", "LETTER"];

/// Sorted, unique prefix codes from lines like `ACC  Accounting`.
pub fn extract_prefixes(text: &str) -> Vec<String> {
    let mut codes = BTreeSet::new();

    for line in text.lines() {
        let Some(caps) = PREFIX_LINE_RE.captures(line.trim()) else {
            continue;
        };
        let code = &caps[1];
        if HEADER_WORDS.iter().any(|w| w.eq_ignore_ascii_case(code)) {
            continue;
        }
        if !code.chars().any(|c| c.is_ascii_alphabetic()) {
            continue;
        }
        codes.insert(code.to_string());
    }

    codes.into_iter().collect()
}

/// Text of `source`. PDFs go through `pdftotext -layout`.
pub fn read_source_text(source: &Path) -> Result<String> {
    let is_pdf = source
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if !is_pdf {
        return std::fs::read_to_string(source).map_err(|e| CourseScopeError::io(source, e));
    }

    info!(path = %source.display(), "converting PDF with pdftotext");
    let output = Command::new("pdftotext")
        .args(["-layout", "-enc", "UTF-8"])
        .arg(source)
        .arg("-")
        .output()
        .map_err(|e| {
            CourseScopeError::config(format!(
                "failed to run pdftotext: {e}. Is poppler-utils installed?"
            ))
        })?;

    if !output.status.success() {
        return Err(CourseScopeError::parse(format!(
            "pdftotext failed on {}: {}",
            source.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Extract prefixes from `source` and write them to `out` as a JSON list.
#[instrument(skip_all, fields(source = %source.display(), out = %out.display()))]
pub fn extract_prefix_file(source: &Path, out: &Path) -> Result<Vec<String>> {
    let prefixes = extract_prefixes(&read_source_text(source)?);
    if prefixes.is_empty() {
        return Err(CourseScopeError::validation(format!(
            "no prefixes found in {}",
            source.display()
        )));
    }

    let json = serde_json::to_string_pretty(&prefixes)
        .map_err(|e| CourseScopeError::parse(format!("failed to encode prefixes: {e}")))?;
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CourseScopeError::io(parent, e))?;
    }
    std::fs::write(out, json + "\n").map_err(|e| CourseScopeError::io(out, e))?;

    info!(count = prefixes.len(), "wrote prefix list");
    Ok(prefixes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
Course Numbering and Prefixes
CODE   Subject
ACC    Accounting
  CS     Computer Science
H&S    Health and Sciences
ACC    Accounting (duplicate row)
&&     Not a code
AB1    Digits are rejected
ENG    101 is not a subject
CS 470 Artificial Intelligence
";

    #[test]
    fn extracts_sorted_unique_codes() {
        assert_eq!(extract_prefixes(TABLE), vec!["ACC", "CS", "H&S"]);
    }

    #[test]
    fn writes_json_list_loadable_as_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("prefixes.txt");
        std::fs::write(&source, TABLE).unwrap();
        let out = dir.path().join("out/prefixes.json");

        let written = extract_prefix_file(&source, &out).unwrap();
        assert_eq!(written.len(), 3);

        let loaded = coursescope_shared::load_prefixes(&out).unwrap();
        assert_eq!(loaded, written);
    }

    #[test]
    fn empty_extraction_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("blank.txt");
        std::fs::write(&source, "nothing here\n").unwrap();
        assert!(extract_prefix_file(&source, &dir.path().join("p.json")).is_err());
    }
}
