//! Classification reports: read the course CSV, flag every row, and write
//! the report files.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, instrument, warn};

use coursescope_classifier::report::{self, Summary};
use coursescope_classifier::{
    BroadCandidate, ClassificationRecord, KeywordConfig, broad_candidates, classify,
};
use coursescope_shared::{
    COURSE_COLUMNS, CourseRecord, EmptyPrefixEntry, Result, SECTIONS_DELIMITER,
};
use coursescope_storage::{read_rows, read_rows_renamed, require_columns, write_rows};

/// Columns the classifiers cannot work without.
pub const REQUIRED_COLUMNS: [&str; 4] = ["prefix", "number", "title", "description"];

/// Input column names for the required fields, for course files that do not
/// use the crawler's header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub prefix: String,
    pub number: String,
    pub title: String,
    pub description: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        let [prefix, number, title, description] = REQUIRED_COLUMNS.map(String::from);
        Self {
            prefix,
            number,
            title,
            description,
        }
    }
}

impl ColumnMap {
    fn names(&self) -> [&str; 4] {
        [&self.prefix, &self.number, &self.title, &self.description]
    }

    fn renames(&self) -> Vec<(&str, &str)> {
        self.names()
            .into_iter()
            .zip(REQUIRED_COLUMNS)
            .filter(|(from, to)| from != to)
            .collect()
    }
}

pub const FLAGGED_FILE: &str = "nau_courses_with_flag.csv";
pub const AI_SUBSET_FILE: &str = "nau_courses_ai_subset.csv";
pub const ETHICS_SUBSET_FILE: &str = "nau_courses_ethics_subset.csv";
pub const PREFIX_TOTALS_FILE: &str = "nau_prefix_totals.csv";
pub const SUMMARY_FILE: &str = "nau_summary.csv";
pub const GAP_REPORT_FILE: &str = "nau_gap_report.csv";
pub const CANDIDATES_FILE: &str = "nau_courses_ai_candidates.csv";

// ---------------------------------------------------------------------------
// Report rows
// ---------------------------------------------------------------------------

// The csv writer cannot serialize nested or flattened structs, so each row
// type spells out the course columns.

fn with_columns<const N: usize>(extra: [&'static str; N]) -> Vec<&'static str> {
    COURSE_COLUMNS.iter().copied().chain(extra).collect()
}

#[derive(Serialize)]
struct FlaggedRow<'a> {
    term: &'a str,
    catalog_year: &'a str,
    prefix: &'a str,
    number: &'a str,
    title: &'a str,
    description: &'a str,
    units: &'a str,
    sections_offered: String,
    url: &'a str,
    is_ai_related: bool,
    is_ethics_related: bool,
    ai_match_tier: &'a str,
    ai_match_term: &'a str,
}

const FLAG_COLUMNS: [&str; 4] = [
    "is_ai_related",
    "is_ethics_related",
    "ai_match_tier",
    "ai_match_term",
];

fn flagged_row(record: &ClassificationRecord) -> FlaggedRow<'_> {
    let course = &record.course;
    FlaggedRow {
        term: &course.term,
        catalog_year: &course.catalog_year,
        prefix: &course.prefix,
        number: &course.number,
        title: &course.title,
        description: &course.description,
        units: &course.units,
        sections_offered: course.sections_offered.join(SECTIONS_DELIMITER),
        url: &course.url,
        is_ai_related: record.is_ai_related,
        is_ethics_related: record.is_ethics_related,
        ai_match_tier: record.ai_hit.as_ref().map(|h| h.tier.as_str()).unwrap_or(""),
        ai_match_term: record.ai_hit.as_ref().map(|h| h.term.as_str()).unwrap_or(""),
    }
}

#[derive(Serialize)]
struct MetricRow {
    metric: &'static str,
    value: usize,
}

#[derive(Serialize)]
struct GapRow<'a> {
    prefix: &'a str,
    terms: String,
}

#[derive(Serialize)]
struct CandidateRow<'a> {
    term: &'a str,
    catalog_year: &'a str,
    prefix: &'a str,
    number: &'a str,
    title: &'a str,
    description: &'a str,
    units: &'a str,
    sections_offered: String,
    url: &'a str,
    is_ai_candidate: bool,
    ai_candidate_reason: &'a str,
    ai_candidate_fuzzy_phrase: &'a str,
    ai_candidate_fuzzy_score: u8,
}

const CANDIDATE_COLUMNS: [&str; 4] = [
    "is_ai_candidate",
    "ai_candidate_reason",
    "ai_candidate_fuzzy_phrase",
    "ai_candidate_fuzzy_score",
];

fn candidate_row(candidate: &BroadCandidate) -> CandidateRow<'_> {
    let course = &candidate.course;
    CandidateRow {
        term: &course.term,
        catalog_year: &course.catalog_year,
        prefix: &course.prefix,
        number: &course.number,
        title: &course.title,
        description: &course.description,
        units: &course.units,
        sections_offered: course.sections_offered.join(SECTIONS_DELIMITER),
        url: &course.url,
        is_ai_candidate: candidate.is_ai_candidate,
        ai_candidate_reason: &candidate.reason,
        ai_candidate_fuzzy_phrase: &candidate.fuzzy_phrase,
        ai_candidate_fuzzy_score: candidate.fuzzy_score,
    }
}

// ---------------------------------------------------------------------------
// Default analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    /// Course CSV from the crawler.
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Empty-prefix log for the gap report. A missing file yields an empty report.
    pub empty_prefixes: PathBuf,
    pub columns: ColumnMap,
    pub keywords: KeywordConfig,
}

/// What [`analyze`] wrote.
#[derive(Debug, Clone)]
pub struct AnalyzeOutcome {
    pub rows: usize,
    pub summary: Summary,
    pub gap_prefixes: usize,
    pub files: Vec<PathBuf>,
}

/// Load and validate the course CSV.
pub fn load_courses(path: &Path, columns: &ColumnMap) -> Result<Vec<CourseRecord>> {
    require_columns(path, &columns.names())?;
    read_rows_renamed(path, &columns.renames())
}

/// Classify the course CSV and write every default report.
#[instrument(skip_all, fields(input = %config.input.display(), output_dir = %config.output_dir.display()))]
pub fn analyze(config: &AnalyzeConfig) -> Result<AnalyzeOutcome> {
    let courses = load_courses(&config.input, &config.columns)?;
    info!(rows = courses.len(), "loaded courses");

    let records = classify(&courses, &config.keywords)?;
    let unique = report::unique_courses(&records);
    let ai = report::ai_subset(&unique);
    let ethics = report::ethics_subset(&unique);
    let totals = report::prefix_totals(&unique);
    let summary = Summary::from_unique(&unique);
    let gaps = report::gap_report(&load_empty_entries(&config.empty_prefixes)?);

    let dir = &config.output_dir;
    let mut files = Vec::new();
    let flagged_columns = with_columns(FLAG_COLUMNS);

    let path = dir.join(FLAGGED_FILE);
    let rows: Vec<_> = records.iter().map(flagged_row).collect();
    write_rows(&path, &flagged_columns, &rows)?;
    files.push(path);

    for (name, subset) in [(AI_SUBSET_FILE, &ai), (ETHICS_SUBSET_FILE, &ethics)] {
        let path = dir.join(name);
        let rows: Vec<_> = subset.iter().map(flagged_row).collect();
        write_rows(&path, &flagged_columns, &rows)?;
        files.push(path);
    }

    let path = dir.join(PREFIX_TOTALS_FILE);
    write_rows(&path, &["prefix", "total_courses", "ai_related_courses"], &totals)?;
    files.push(path);

    let path = dir.join(SUMMARY_FILE);
    let rows: Vec<_> = summary
        .metrics()
        .into_iter()
        .map(|(metric, value)| MetricRow { metric, value })
        .collect();
    write_rows(&path, &["metric", "value"], &rows)?;
    files.push(path);

    let path = dir.join(GAP_REPORT_FILE);
    let rows: Vec<_> = gaps
        .iter()
        .map(|g| GapRow {
            prefix: &g.prefix,
            terms: g.terms.join(SECTIONS_DELIMITER),
        })
        .collect();
    write_rows(&path, &["prefix", "terms"], &rows)?;
    files.push(path);

    info!(
        unique = summary.total_unique_courses,
        ai = summary.total_ai_related,
        ethics = summary.total_ethics_related,
        both = summary.total_ai_and_ethics,
        gaps = gaps.len(),
        "analysis complete"
    );

    Ok(AnalyzeOutcome {
        rows: records.len(),
        summary,
        gap_prefixes: gaps.len(),
        files,
    })
}

fn load_empty_entries(path: &Path) -> Result<Vec<EmptyPrefixEntry>> {
    if !path.exists() {
        warn!(path = %path.display(), "empty-prefix log not found, gap report will be empty");
        return Ok(Vec::new());
    }
    read_rows(path)
}

// ---------------------------------------------------------------------------
// Broad analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BroadConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub columns: ColumnMap,
    pub fuzzy_enabled: bool,
    pub fuzzy_threshold: u8,
}

/// Write the broad candidate list. Returns the number of candidates.
#[instrument(skip_all, fields(input = %config.input.display(), output = %config.output.display()))]
pub fn analyze_broad(config: &BroadConfig) -> Result<usize> {
    let courses = load_courses(&config.input, &config.columns)?;
    let candidates = broad_candidates(&courses, config.fuzzy_enabled, config.fuzzy_threshold)?;

    let rows: Vec<_> = candidates.iter().map(candidate_row).collect();
    write_rows(&config.output, &with_columns(CANDIDATE_COLUMNS), &rows)?;

    info!(candidates = candidates.len(), "wrote AI candidates");
    Ok(candidates.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursescope_storage::CourseStore;

    fn course(term: &str, prefix: &str, number: &str, title: &str, description: &str) -> CourseRecord {
        CourseRecord {
            term: term.into(),
            catalog_year: "2025-2026".into(),
            prefix: prefix.into(),
            number: number.into(),
            title: title.into(),
            description: description.into(),
            units: "3".into(),
            sections_offered: vec!["Fall 2025".into(), "Spring 2026".into()],
            url: format!("https://catalog.nau.edu/Courses/course?courseId={prefix}{number}"),
        }
    }

    fn seed(dir: &Path) -> (PathBuf, PathBuf) {
        let courses = dir.join("nau_courses.csv");
        let empty = dir.join("nau_empty_prefixes.csv");
        let store = CourseStore::new(&courses, &empty);
        store
            .append_courses(&[
                course("Fall 2025", "CS", "470", "Artificial Intelligence", "Search and planning."),
                course("Spring 2026", "CS", "470", "Artificial Intelligence", "Search and planning."),
                course("Fall 2025", "PHI", "331", "Environmental Ethics", "Moral theory."),
                course("Fall 2025", "CS", "396", "AI Ethics", "Ethical issues of AI systems."),
                course("Fall 2025", "RE", "201", "Real Estate", "Working with a buyer's agent."),
            ])
            .unwrap();
        store
            .append_empty_prefix(&EmptyPrefixEntry::empty("Fall 2025", 1257, "ZZZ"))
            .unwrap();
        (courses, empty)
    }

    fn read_csv(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn writes_all_reports() {
        let dir = tempfile::tempdir().unwrap();
        let (input, empty) = seed(dir.path());
        let out = dir.path().join("reports");

        let outcome = analyze(&AnalyzeConfig {
            input,
            output_dir: out.clone(),
            empty_prefixes: empty,
            columns: ColumnMap::default(),
            keywords: KeywordConfig::default(),
        })
        .unwrap();

        assert_eq!(outcome.rows, 5);
        assert_eq!(outcome.files.len(), 6);
        assert!(outcome.files.iter().all(|f| f.exists()));

        let summary = read_csv(&out.join(SUMMARY_FILE));
        assert_eq!(
            summary,
            vec![
                vec!["total_unique_courses".to_string(), "4".to_string()],
                vec!["total_ai_related".to_string(), "2".to_string()],
                vec!["total_ethics_related".to_string(), "2".to_string()],
                vec!["total_ai_and_ethics".to_string(), "1".to_string()],
            ]
        );

        let totals = read_csv(&out.join(PREFIX_TOTALS_FILE));
        let sum: usize = totals.iter().map(|row| row[1].parse::<usize>().unwrap()).sum();
        assert_eq!(sum, outcome.summary.total_unique_courses);

        let subset = read_csv(&out.join(AI_SUBSET_FILE));
        assert_eq!(subset.len(), 2);
        assert!(subset.len() <= outcome.summary.total_unique_courses);
        assert_eq!((subset[0][2].as_str(), subset[0][3].as_str()), ("CS", "396"));

        let gaps = read_csv(&out.join(GAP_REPORT_FILE));
        assert_eq!(gaps, vec![vec!["ZZZ".to_string(), "Fall 2025".to_string()]]);
    }

    #[test]
    fn flagged_report_keeps_every_row_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let (input, empty) = seed(dir.path());

        analyze(&AnalyzeConfig {
            input,
            output_dir: dir.path().to_path_buf(),
            empty_prefixes: empty,
            columns: ColumnMap::default(),
            keywords: KeywordConfig::default(),
        })
        .unwrap();

        let path = dir.path().join(FLAGGED_FILE);
        let headers = coursescope_storage::read_headers(&path).unwrap();
        assert_eq!(headers, with_columns(FLAG_COLUMNS));

        let rows = read_csv(&path);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0][9], "true");
        assert_eq!(rows[0][11], "primary");
        assert_eq!(rows[0][7], "Fall 2025; Spring 2026");
        // Real estate agent without AI context stays unflagged
        assert_eq!(rows[4][9], "false");
    }

    #[test]
    fn missing_columns_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.csv");
        std::fs::write(&input, "prefix,title\nCS,Intro\n").unwrap();

        let err = analyze(&AnalyzeConfig {
            input,
            output_dir: dir.path().to_path_buf(),
            empty_prefixes: dir.path().join("none.csv"),
            columns: ColumnMap::default(),
            keywords: KeywordConfig::default(),
        })
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("number"));
        assert!(msg.contains("description"));
    }

    #[test]
    fn custom_column_names() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("export.csv");
        std::fs::write(
            &input,
            "Subject,Catalog,Course Title,Course Description\n\
             CS,470,Artificial Intelligence,Search and planning.\n\
             ACC,205,Financial Accounting,Ledgers.\n",
        )
        .unwrap();

        let columns = ColumnMap {
            prefix: "Subject".into(),
            number: "Catalog".into(),
            title: "Course Title".into(),
            description: "Course Description".into(),
        };
        let outcome = analyze(&AnalyzeConfig {
            input: input.clone(),
            output_dir: dir.path().to_path_buf(),
            empty_prefixes: dir.path().join("absent.csv"),
            columns: columns.clone(),
            keywords: KeywordConfig::default(),
        })
        .unwrap();
        assert_eq!(outcome.summary.total_unique_courses, 2);
        assert_eq!(outcome.summary.total_ai_related, 1);

        // The default names are not in this file
        let err = load_courses(&input, &ColumnMap::default()).unwrap_err();
        assert!(err.to_string().contains("prefix"));
    }

    #[test]
    fn missing_gap_log_gives_header_only_report() {
        let dir = tempfile::tempdir().unwrap();
        let (input, _) = seed(dir.path());

        let outcome = analyze(&AnalyzeConfig {
            input,
            output_dir: dir.path().to_path_buf(),
            empty_prefixes: dir.path().join("absent.csv"),
            columns: ColumnMap::default(),
            keywords: KeywordConfig::default(),
        })
        .unwrap();
        assert_eq!(outcome.gap_prefixes, 0);
        assert!(read_csv(&dir.path().join(GAP_REPORT_FILE)).is_empty());
    }

    #[test]
    fn broad_report() {
        let dir = tempfile::tempdir().unwrap();
        let (input, _) = seed(dir.path());
        let output = dir.path().join(CANDIDATES_FILE);

        let count = analyze_broad(&BroadConfig {
            input,
            output: output.clone(),
            columns: ColumnMap::default(),
            fuzzy_enabled: true,
            fuzzy_threshold: 85,
        })
        .unwrap();

        // CS 396, CS 470 (once), RE 201 via "agent"
        assert_eq!(count, 3);
        let rows = read_csv(&output);
        let keys: Vec<_> = rows.iter().map(|r| (r[2].clone(), r[3].clone())).collect();
        assert_eq!(
            keys,
            vec![
                ("CS".to_string(), "396".to_string()),
                ("CS".to_string(), "470".to_string()),
                ("RE".to_string(), "201".to_string()),
            ]
        );
        assert_eq!(rows[2][10], "agents");
    }
}
