//! Incremental catalog crawler.
//!
//! For every planned (term, prefix) pair the crawler runs one catalog search,
//! then visits each listed course page, one page at a time. A prefix's rows are
//! appended in one write after the prefix finishes, so a pair is on disk either
//! completely or not at all.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, instrument, warn};
use url::Url;

use coursescope_shared::{CourseRecord, CourseScopeError, CrawlConfig, EmptyPrefixEntry, Result, TermSpec};
use coursescope_storage::CourseStore;

use crate::extract::{
    self, COURSE_HEADER_SELECTOR, NO_RESULTS_SELECTOR, RESULT_LINK_SELECTOR, ResultsPage,
};
use crate::ledger::ScrapeLedger;
use crate::source::PageSource;

// ---------------------------------------------------------------------------
// CrawlReport
// ---------------------------------------------------------------------------

/// Summary of a completed crawl run.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Terms whose code could not be resolved (label, reason).
    pub failed_terms: Vec<(String, String)>,
    /// Pairs already on disk before the run.
    pub pairs_skipped: usize,
    /// Pairs searched during the run.
    pub pairs_searched: usize,
    /// Searched pairs that returned no courses.
    pub pairs_empty: usize,
    /// Listed pairs where no course could be stored; searched again next run.
    pub pairs_unstored: usize,
    /// New course rows written.
    pub courses_added: usize,
    /// Per-page failures (URL, error message).
    pub errors: Vec<(String, String)>,
    /// Total duration of the run.
    pub duration: Duration,
}

/// A term with its catalog code resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTerm {
    pub label: String,
    pub code: u32,
    /// Catalog year shown on the search form, if any.
    pub catalog_year: Option<String>,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting crawl status.
pub trait CrawlProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a (term, prefix) search.
    fn pair_started(&self, term: &str, prefix: &str, current: usize, total: usize);
    /// Called after a pair is finished with the number of listed and new courses.
    fn pair_finished(&self, term: &str, prefix: &str, listed: usize, added: usize);
    /// Called when the run completes.
    fn done(&self, report: &CrawlReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl CrawlProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn pair_started(&self, _term: &str, _prefix: &str, _current: usize, _total: usize) {}
    fn pair_finished(&self, _term: &str, _prefix: &str, _listed: usize, _added: usize) {}
    fn done(&self, _report: &CrawlReport) {}
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// Catalog crawler over any [`PageSource`].
pub struct Crawler<S: PageSource> {
    config: CrawlConfig,
    source: S,
}

impl<S: PageSource> Crawler<S> {
    pub fn new(config: CrawlConfig, source: S) -> Self {
        Self { config, source }
    }

    /// Search URL for one (term, prefix) pair.
    pub fn results_url(&self, prefix: &str, term_code: u32) -> Result<Url> {
        let mut url = self
            .config
            .base_url
            .join("results")
            .map_err(|e| CourseScopeError::config(format!("bad catalog base URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("subject", prefix)
            .append_pair("catNbr", "")
            .append_pair("term", &term_code.to_string());
        Ok(url)
    }

    /// Run the crawl, appending to `store`. The page source is closed afterwards.
    #[instrument(skip_all, fields(source = self.source.name(), overwrite = self.config.overwrite))]
    pub async fn run(
        &mut self,
        store: &CourseStore,
        progress: &dyn CrawlProgress,
    ) -> Result<CrawlReport> {
        let result = self.run_inner(store, progress).await;
        if let Err(e) = self.source.close().await {
            warn!(error = %e, "failed to close page source");
        }
        result
    }

    async fn run_inner(
        &mut self,
        store: &CourseStore,
        progress: &dyn CrawlProgress,
    ) -> Result<CrawlReport> {
        let start = Instant::now();
        let mut report = CrawlReport::default();

        progress.phase("Reconciling existing output");
        let mut ledger = if self.config.overwrite {
            info!("overwrite enabled: resetting output files");
            store.reset()?;
            ScrapeLedger::new()
        } else {
            ScrapeLedger::from_existing(&store.load_courses()?, &store.load_empty_prefixes()?)
        };

        let plans = ledger.plan(&self.config.terms, &self.config.prefixes);
        report.pairs_skipped = plans.iter().map(|p| p.skipped).sum();
        let total: usize = plans.iter().map(|p| p.prefixes.len()).sum();

        info!(
            terms = self.config.terms.len(),
            prefixes = self.config.prefixes.len(),
            planned = total,
            skipped = report.pairs_skipped,
            "starting crawl"
        );

        let mut step = 0;
        for plan in plans {
            if plan.prefixes.is_empty() {
                debug!(term = %plan.term.label, "nothing left to crawl for term");
                continue;
            }

            progress.phase(&format!("Resolving {}", plan.term.label));
            let term = match self.resolve_term(&plan.term).await {
                Ok(term) => term,
                Err(e) => {
                    error!(term = %plan.term.label, error = %e, "skipping term");
                    report
                        .failed_terms
                        .push((plan.term.label.clone(), e.to_string()));
                    step += plan.prefixes.len();
                    continue;
                }
            };

            for prefix in &plan.prefixes {
                step += 1;
                progress.pair_started(&term.label, prefix, step, total);
                info!(step, total, term = %term.label, %prefix, "fetching course list");

                let links = match self.list_courses(prefix, term.code).await {
                    Ok(links) => links,
                    Err(e) => {
                        // Not marked: the pair is retried on the next run.
                        warn!(term = %term.label, %prefix, error = %e, "course list failed");
                        report.errors.push((format!("{} {prefix}", term.label), e.to_string()));
                        continue;
                    }
                };
                report.pairs_searched += 1;

                if links.is_empty() {
                    info!(term = %term.label, %prefix, "no courses found");
                    store.append_empty_prefix(&EmptyPrefixEntry::empty(&term.label, term.code, prefix))?;
                    ledger.mark_done(&term.label, prefix);
                    report.pairs_empty += 1;
                    progress.pair_finished(&term.label, prefix, 0, 0);
                    continue;
                }

                let mut batch: Vec<CourseRecord> = Vec::new();
                let mut failed = 0usize;
                for link in &links {
                    if ledger.contains_url(&term.label, link.as_str()) {
                        debug!(url = %link, "page already scraped");
                        continue;
                    }
                    match self.scrape_course(link, &term, prefix).await {
                        Ok(course) if ledger.contains_course(&course) => {
                            debug!(url = %link, "course already stored");
                        }
                        Ok(course) => {
                            ledger.record_course(&course);
                            batch.push(course);
                        }
                        Err(e) => {
                            warn!(url = %link, error = %e, "failed to scrape course");
                            report.errors.push((link.to_string(), e.to_string()));
                            failed += 1;
                        }
                    }
                    self.polite_pause().await;
                }

                if !ledger.is_done(&term.label, prefix) {
                    info!(
                        term = %term.label,
                        %prefix,
                        listed = links.len(),
                        failed,
                        "no course stored for this prefix (cross-listed or failed pages); it will be searched again next run"
                    );
                    report.pairs_unstored += 1;
                }

                store.append_courses(&batch)?;
                report.courses_added += batch.len();
                progress.pair_finished(&term.label, prefix, links.len(), batch.len());
                info!(
                    term = %term.label,
                    %prefix,
                    listed = links.len(),
                    added = batch.len(),
                    "prefix done"
                );
            }
        }

        report.duration = start.elapsed();
        info!(
            searched = report.pairs_searched,
            empty = report.pairs_empty,
            added = report.courses_added,
            errors = report.errors.len(),
            failed_terms = report.failed_terms.len(),
            stored = ledger.course_count(),
            duration_ms = report.duration.as_millis(),
            "crawl completed"
        );
        progress.done(&report);

        Ok(report)
    }

    /// Resolve a term's catalog code. A pinned code skips the lookup.
    pub async fn resolve_term(&mut self, term: &TermSpec) -> Result<ResolvedTerm> {
        if let Some(code) = term.code {
            return Ok(ResolvedTerm {
                label: term.label.clone(),
                code,
                catalog_year: None,
            });
        }

        let search_url = self.config.base_url.clone();
        let html = self
            .source
            .fetch(&search_url, &[extract::TERM_OPTION_SELECTOR])
            .await
            .map_err(|e| CourseScopeError::term(&term.label, e.to_string()))?;

        let code = extract::parse_term_options(&html)
            .into_iter()
            .find(|(label, _)| label.eq_ignore_ascii_case(&term.label))
            .map(|(_, code)| code)
            .ok_or_else(|| {
                CourseScopeError::term(&term.label, "no matching option in the term selector")
            })?;

        info!(term = %term.label, code, "resolved term code");
        Ok(ResolvedTerm {
            label: term.label.clone(),
            code,
            catalog_year: extract::parse_catalog_year(&html),
        })
    }

    /// Course page URLs for one (term, prefix) search. Empty means no courses.
    pub async fn list_courses(&mut self, prefix: &str, term_code: u32) -> Result<Vec<Url>> {
        let url = self.results_url(prefix, term_code)?;
        let html = self
            .source
            .fetch(&url, &[RESULT_LINK_SELECTOR, NO_RESULTS_SELECTOR])
            .await?;

        Ok(match extract::parse_results(&html, &url) {
            ResultsPage::Empty => Vec::new(),
            ResultsPage::Courses(links) => links,
        })
    }

    /// Scrape one course page listed under `prefix`.
    pub async fn scrape_course(
        &mut self,
        url: &Url,
        term: &ResolvedTerm,
        prefix: &str,
    ) -> Result<CourseRecord> {
        let html = self.source.fetch(url, &[COURSE_HEADER_SELECTOR]).await?;
        let mut course = extract::parse_course(&html, url)?;

        if course.prefix != prefix {
            return Err(CourseScopeError::validation(format!(
                "listed under {prefix} but page shows {} {}",
                course.prefix, course.number
            )));
        }

        course.term = term.label.clone();
        if course.catalog_year.is_empty() {
            course.catalog_year = term.catalog_year.clone().unwrap_or_default();
        }
        Ok(course)
    }

    async fn polite_pause(&self) {
        if self.config.request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;
        }
    }

    /// Give the page source back (e.g. to reuse a browser).
    pub fn into_source(self) -> S {
        self.source
    }
}

#[cfg(test)]
mod crawler_tests {
    use std::collections::HashMap;
    use std::path::Path;

    use async_trait::async_trait;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::source::HttpSource;

    fn course_page(prefix: &str, number: &str, title: &str, description: &str) -> String {
        format!(
            r##"<html><body><div id="main">
            <h1 id="h1-first">Course Details Catalog Year: 2025 - 2026</h1>
            <div id="courseResults">
              <h2>{prefix} {number} - {title}</h2>
              <p><strong>Description:</strong> {description}<br/>
              <strong>Units:</strong> 3<br/>
              <strong>Sections offered:</strong> <a href="#">Fall 2025</a></p>
            </div></div></body></html>"##
        )
    }

    fn results_page(ids: &[&str]) -> String {
        let items: String = ids
            .iter()
            .map(|id| {
                format!(r#"<dt class="result-item"><a href="course?courseId={id}">{id}</a></dt>"#)
            })
            .collect();
        format!(r#"<html><body><div id="main"><dl id="results-list">{items}</dl></div></body></html>"#)
    }

    const NO_RESULTS: &str =
        r#"<html><body><div id="main"><h1>No courses found</h1></div></body></html>"#;

    fn config(server: &MockServer, dir: &Path, terms: Vec<TermSpec>, prefixes: &[&str]) -> CrawlConfig {
        CrawlConfig {
            base_url: Url::parse(&format!("{}/Courses/", server.uri())).unwrap(),
            terms,
            prefixes: prefixes.iter().map(|s| s.to_string()).collect(),
            overwrite: false,
            headless: true,
            request_delay_ms: 0,
            page_timeout_secs: 5,
            courses_path: dir.join("courses.csv"),
            empty_prefixes_path: dir.join("empty.csv"),
        }
    }

    fn store_for(config: &CrawlConfig) -> CourseStore {
        CourseStore::new(&config.courses_path, &config.empty_prefixes_path)
    }

    async fn mount_catalog(server: &MockServer, results_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/Courses/results"))
            .and(query_param("subject", "CS"))
            .and(query_param("term", "1257"))
            .respond_with(ResponseTemplate::new(200).set_body_string(results_page(&["1", "2", "3"])))
            .expect(results_calls)
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/Courses/results"))
            .and(query_param("subject", "ZZZ"))
            .respond_with(ResponseTemplate::new(200).set_body_string(NO_RESULTS))
            .mount(server)
            .await;

        let pages = [
            ("1", course_page("CS", "470", "Artificial Intelligence", "Search and machine learning.")),
            ("2", course_page("CS", "480", "Software Agents", "Agent design.")),
            // Cross-listed page that does not belong to CS
            ("3", course_page("PHI", "331", "Ethics", "Moral theory.")),
        ];
        for (id, body) in pages {
            Mock::given(method("GET"))
                .and(path("/Courses/course"))
                .and(query_param("courseId", id))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(server)
                .await;
        }
    }

    #[tokio::test]
    async fn test_results_url() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let config = config(&server, dir.path(), vec![], &[]);
        let crawler = Crawler::new(config, HttpSource::new(Duration::from_secs(5)).unwrap());

        let url = crawler.results_url("H&S", 1257).unwrap();
        assert_eq!(url.path(), "/Courses/results");
        assert_eq!(url.query(), Some("subject=H%26S&catNbr=&term=1257"));
    }

    #[tokio::test]
    async fn test_crawl_with_mock_server() {
        let server = MockServer::start().await;
        mount_catalog(&server, 1).await;

        let dir = tempfile::tempdir().unwrap();
        let config = config(
            &server,
            dir.path(),
            vec![TermSpec::new("Fall 2025", Some(1257))],
            &["CS", "ZZZ"],
        );
        let store = store_for(&config);

        let mut crawler = Crawler::new(config, HttpSource::new(Duration::from_secs(5)).unwrap());
        let report = crawler.run(&store, &SilentProgress).await.unwrap();

        assert_eq!(report.pairs_searched, 2);
        assert_eq!(report.pairs_empty, 1);
        assert_eq!(report.courses_added, 2);
        // The PHI page was skipped as a per-course failure
        assert_eq!(report.errors.len(), 1);

        let courses = store.load_courses().unwrap();
        assert_eq!(courses.len(), 2);
        assert!(courses.iter().all(|c| c.prefix == "CS"));
        assert!(courses.iter().all(|c| c.term == "Fall 2025"));
        assert_eq!(courses[0].catalog_year, "2025-2026");
        assert_eq!(courses[0].sections_offered, vec!["Fall 2025"]);

        let empty = store.load_empty_prefixes().unwrap();
        assert_eq!(empty, vec![EmptyPrefixEntry::empty("Fall 2025", 1257, "ZZZ")]);
    }

    #[tokio::test]
    async fn test_second_run_adds_nothing() {
        let server = MockServer::start().await;
        // The CS search must only ever happen once across both runs
        mount_catalog(&server, 1).await;

        let dir = tempfile::tempdir().unwrap();
        let config = config(
            &server,
            dir.path(),
            vec![TermSpec::new("Fall 2025", Some(1257))],
            &["CS", "ZZZ"],
        );
        let store = store_for(&config);

        let mut first = Crawler::new(config.clone(), HttpSource::new(Duration::from_secs(5)).unwrap());
        first.run(&store, &SilentProgress).await.unwrap();

        let mut second = Crawler::new(config, HttpSource::new(Duration::from_secs(5)).unwrap());
        let report = second.run(&store, &SilentProgress).await.unwrap();

        assert_eq!(report.pairs_searched, 0);
        assert_eq!(report.pairs_skipped, 2);
        assert_eq!(report.courses_added, 0);

        let courses = store.load_courses().unwrap();
        let mut keys: Vec<_> = courses.iter().map(|c| c.crawl_key()).collect();
        let before = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), before, "no duplicate (term, prefix, number) rows");
        assert_eq!(store.load_empty_prefixes().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_output() {
        let server = MockServer::start().await;
        mount_catalog(&server, 2).await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = config(
            &server,
            dir.path(),
            vec![TermSpec::new("Fall 2025", Some(1257))],
            &["CS", "ZZZ"],
        );
        let store = store_for(&config);

        Crawler::new(config.clone(), HttpSource::new(Duration::from_secs(5)).unwrap())
            .run(&store, &SilentProgress)
            .await
            .unwrap();

        config.overwrite = true;
        let report = Crawler::new(config, HttpSource::new(Duration::from_secs(5)).unwrap())
            .run(&store, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.pairs_skipped, 0);
        assert_eq!(store.load_courses().unwrap().len(), 2);
        assert_eq!(store.load_empty_prefixes().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unresolvable_term_does_not_stop_others() {
        let server = MockServer::start().await;
        mount_catalog(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/Courses/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body><select name="term"><option value="1257">Fall 2025</option></select></body></html>"#,
            ))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = config(
            &server,
            dir.path(),
            vec![
                TermSpec::new("Winter 2031", None),
                TermSpec::new("Fall 2025", None),
            ],
            &["CS"],
        );
        let store = store_for(&config);

        let report = Crawler::new(config, HttpSource::new(Duration::from_secs(5)).unwrap())
            .run(&store, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.failed_terms.len(), 1);
        assert_eq!(report.failed_terms[0].0, "Winter 2031");
        assert_eq!(report.courses_added, 2);
    }

    #[tokio::test]
    async fn test_failed_listing_is_retried_next_run() {
        let server = MockServer::start().await;
        Mock::given(path("/Courses/results"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = config(
            &server,
            dir.path(),
            vec![TermSpec::new("Fall 2025", Some(1257))],
            &["CS"],
        );
        let store = store_for(&config);

        let report = Crawler::new(config.clone(), HttpSource::new(Duration::from_secs(5)).unwrap())
            .run(&store, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(store.load_empty_prefixes().unwrap().is_empty());

        let ledger = ScrapeLedger::from_existing(
            &store.load_courses().unwrap(),
            &store.load_empty_prefixes().unwrap(),
        );
        assert_eq!(ledger.plan(&config.terms, &config.prefixes)[0].prefixes, vec!["CS"]);
    }

    #[tokio::test]
    async fn test_all_cross_listed_prefix_is_searched_again() {
        let server = MockServer::start().await;
        mount_catalog(&server, 0).await;
        // Every listed page belongs to another prefix
        Mock::given(method("GET"))
            .and(path("/Courses/results"))
            .and(query_param("subject", "HON"))
            .respond_with(ResponseTemplate::new(200).set_body_string(results_page(&["3"])))
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = config(
            &server,
            dir.path(),
            vec![TermSpec::new("Fall 2025", Some(1257))],
            &["HON"],
        );
        let store = store_for(&config);

        for _ in 0..2 {
            let report = Crawler::new(config.clone(), HttpSource::new(Duration::from_secs(5)).unwrap())
                .run(&store, &SilentProgress)
                .await
                .unwrap();
            assert_eq!(report.pairs_searched, 1);
            assert_eq!(report.pairs_unstored, 1);
            assert_eq!(report.courses_added, 0);
            assert_eq!(report.errors.len(), 1);
        }
        assert!(store.load_courses().unwrap().is_empty());
        assert!(store.load_empty_prefixes().unwrap().is_empty());
    }

    /// In-memory source for exercising term resolution without HTTP.
    struct FixtureSource {
        pages: HashMap<String, String>,
        closed: bool,
    }

    #[async_trait]
    impl PageSource for FixtureSource {
        async fn fetch(&mut self, url: &Url, _ready: &[&str]) -> Result<String> {
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| CourseScopeError::Network(format!("{url}: not found")))
        }

        async fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }

        fn name(&self) -> &str {
            "fixture"
        }
    }

    #[tokio::test]
    async fn test_resolve_term_from_search_form() {
        let search = std::fs::read_to_string("../../../fixtures/html/search.html").unwrap();
        let base = "https://catalog.nau.edu/Courses/";
        let source = FixtureSource {
            pages: HashMap::from([(base.to_string(), search)]),
            closed: false,
        };
        let dir = tempfile::tempdir().unwrap();
        let config = CrawlConfig {
            base_url: Url::parse(base).unwrap(),
            terms: vec![],
            prefixes: vec![],
            overwrite: false,
            headless: true,
            request_delay_ms: 0,
            page_timeout_secs: 5,
            courses_path: dir.path().join("c.csv"),
            empty_prefixes_path: dir.path().join("e.csv"),
        };
        let mut crawler = Crawler::new(config, source);

        let term = crawler
            .resolve_term(&TermSpec::new("spring 2026", None))
            .await
            .unwrap();
        assert_eq!(term.code, 1261);
        assert_eq!(term.catalog_year.as_deref(), Some("2025-2026"));

        let pinned = crawler
            .resolve_term(&TermSpec::new("Fall 2025", Some(1257)))
            .await
            .unwrap();
        assert_eq!(pinned.catalog_year, None);

        let store = CourseStore::new(dir.path().join("c.csv"), dir.path().join("e.csv"));
        crawler.run(&store, &SilentProgress).await.unwrap();
        assert!(crawler.into_source().closed);
    }
}
