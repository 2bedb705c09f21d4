//! HTML extraction for the catalog's search, results, and course pages.
//!
//! Everything here is pure: HTML string in, typed data out. Page sources only
//! deliver markup.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use coursescope_shared::{CourseRecord, CourseScopeError, Result};

/// Course links on a results page.
pub const RESULT_LINK_SELECTOR: &str = "dl#results-list dt.result-item > a";
/// Heading that carries the "No courses found" message.
pub const NO_RESULTS_SELECTOR: &str = "#main h1";
/// Course page header (`CS 470 - Artificial Intelligence`).
pub const COURSE_HEADER_SELECTOR: &str = "#courseResults h2";
/// Term dropdown on the search form.
pub const TERM_OPTION_SELECTOR: &str = "select[name='term'] option, select#term option";

const NO_RESULTS_TEXT: &str = "No courses found";

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z&]{2,6})\s+(\d{3}[A-Z]?)\s*-\s*(.+)$").expect("valid header regex")
});

static CATALOG_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Catalog Year\s*:\s*([0-9]{4}\s*-\s*[0-9]{4})").expect("valid catalog year regex")
});

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector parses")
}

/// Collapse runs of whitespace to single spaces and trim.
fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: ElementRef<'_>) -> String {
    squash(&el.text().collect::<String>())
}

// ---------------------------------------------------------------------------
// Search form
// ---------------------------------------------------------------------------

/// `(label, code)` pairs from the search form's term dropdown.
pub fn parse_term_options(html: &str) -> Vec<(String, u32)> {
    let doc = Html::parse_document(html);
    let option_sel = selector(TERM_OPTION_SELECTOR);

    doc.select(&option_sel)
        .filter_map(|opt| {
            let code = opt.value().attr("value")?.trim().parse::<u32>().ok()?;
            let label = element_text(opt);
            (!label.is_empty()).then_some((label, code))
        })
        .collect()
}

/// Catalog year shown in the `#h1-first` header, e.g. `2025-2026`.
pub fn parse_catalog_year(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    catalog_year_in(&doc)
}

fn catalog_year_in(doc: &Html) -> Option<String> {
    let header_sel = selector("#h1-first");
    let header = doc.select(&header_sel).next()?;
    let text = element_text(header);
    CATALOG_YEAR_RE
        .captures(&text)
        .map(|caps| caps[1].chars().filter(|c| !c.is_whitespace()).collect())
}

// ---------------------------------------------------------------------------
// Results page
// ---------------------------------------------------------------------------

/// What a search for one (term, prefix) came back with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultsPage {
    /// The site said "No courses found", or listed nothing.
    Empty,
    /// Unique course page URLs, sorted.
    Courses(Vec<Url>),
}

/// Parse a results page. Relative links resolve against `page_url`.
pub fn parse_results(html: &str, page_url: &Url) -> ResultsPage {
    let doc = Html::parse_document(html);

    let heading_sel = selector(NO_RESULTS_SELECTOR);
    if doc
        .select(&heading_sel)
        .any(|h| element_text(h) == NO_RESULTS_TEXT)
    {
        return ResultsPage::Empty;
    }

    let link_sel = selector(RESULT_LINK_SELECTOR);
    let links: BTreeSet<Url> = doc
        .select(&link_sel)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| page_url.join(href.trim()).ok())
        .map(|mut url| {
            url.set_fragment(None);
            url
        })
        .collect();

    if links.is_empty() {
        ResultsPage::Empty
    } else {
        ResultsPage::Courses(links.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Course page
// ---------------------------------------------------------------------------

/// Parse a course page into a record.
///
/// `term` and `catalog_year` are filled in by the caller; `catalog_year` is
/// only set here when the page header shows one.
pub fn parse_course(html: &str, url: &Url) -> Result<CourseRecord> {
    let doc = Html::parse_document(html);

    let header_sel = selector(COURSE_HEADER_SELECTOR);
    let header = doc
        .select(&header_sel)
        .next()
        .map(element_text)
        .ok_or_else(|| CourseScopeError::parse(format!("{url}: no course header")))?;

    let caps = HEADER_RE.captures(&header).ok_or_else(|| {
        CourseScopeError::parse(format!("{url}: unrecognized course header '{header}'"))
    })?;

    Ok(CourseRecord {
        term: String::new(),
        catalog_year: catalog_year_in(&doc).unwrap_or_default(),
        prefix: caps[1].to_string(),
        number: caps[2].to_string(),
        title: caps[3].trim().to_string(),
        description: text_after_label(&doc, "Description").unwrap_or_default(),
        units: text_after_label(&doc, "Units").unwrap_or_default(),
        sections_offered: links_after_label(&doc, "Sections offered"),
        url: url.to_string(),
    })
}

/// The `<strong>Label:</strong>` element inside `#courseResults`.
fn find_label<'a>(doc: &'a Html, label: &str) -> Option<ElementRef<'a>> {
    let strong_sel = selector("#courseResults strong");
    let wanted = format!("{label}:");
    doc.select(&strong_sel).find(|el| element_text(*el) == wanted)
}

fn is_label(node: &ElementRef<'_>) -> bool {
    node.value().name() == "strong"
}

/// First non-blank text following a label, stopping at the next label.
fn text_after_label(doc: &Html, label: &str) -> Option<String> {
    let strong = find_label(doc, label)?;

    for sibling in strong.next_siblings() {
        let text = match sibling.value() {
            Node::Text(t) => squash(t),
            Node::Element(_) => match ElementRef::wrap(sibling) {
                Some(el) if is_label(&el) => return None,
                Some(el) => element_text(el),
                None => String::new(),
            },
            _ => String::new(),
        };
        if !text.is_empty() {
            return Some(text);
        }
    }
    None
}

/// Texts of the `<a>` siblings following a label, stopping at the next label.
fn links_after_label(doc: &Html, label: &str) -> Vec<String> {
    let Some(strong) = find_label(doc, label) else {
        return Vec::new();
    };

    let mut texts = Vec::new();
    for el in strong.next_siblings().filter_map(ElementRef::wrap) {
        if is_label(&el) {
            break;
        }
        if el.value().name() == "a" {
            let text = element_text(el);
            if !text.is_empty() {
                texts.push(text);
            }
        }
    }
    texts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn results_url() -> Url {
        Url::parse("https://catalog.nau.edu/Courses/results?subject=CS&catNbr=&term=1257").unwrap()
    }

    #[test]
    fn term_options_from_search_form() {
        let options = parse_term_options(&load_fixture("search.html"));
        assert!(options.contains(&("Fall 2025".to_string(), 1257)));
        assert!(options.contains(&("Spring 2026".to_string(), 1261)));
        // The placeholder option has no numeric value
        assert!(!options.iter().any(|(label, _)| label.starts_with("Select")));
    }

    #[test]
    fn catalog_year_from_header() {
        assert_eq!(
            parse_catalog_year(&load_fixture("search.html")),
            Some("2025-2026".to_string())
        );
        assert_eq!(parse_catalog_year("<html><body></body></html>"), None);
    }

    #[test]
    fn results_resolve_relative_links() {
        let page = parse_results(&load_fixture("results.html"), &results_url());
        let ResultsPage::Courses(links) = page else {
            panic!("expected courses");
        };
        assert_eq!(links.len(), 3, "duplicate link should be collapsed");
        assert!(links.iter().all(|u| u.path() == "/Courses/course"));
        assert!(links[0].as_str().starts_with("https://catalog.nau.edu/Courses/course?"));
    }

    #[test]
    fn results_no_courses_found() {
        let page = parse_results(&load_fixture("no_results.html"), &results_url());
        assert_eq!(page, ResultsPage::Empty);

        let page = parse_results("<html><body><div id='main'></div></body></html>", &results_url());
        assert_eq!(page, ResultsPage::Empty);
    }

    #[test]
    fn course_page_fields() {
        let url = Url::parse("https://catalog.nau.edu/Courses/course?courseId=001&term=1257").unwrap();
        let course = parse_course(&load_fixture("course.html"), &url).unwrap();

        assert_eq!(course.prefix, "CS");
        assert_eq!(course.number, "470");
        assert_eq!(course.title, "Artificial Intelligence");
        assert_eq!(course.catalog_year, "2025-2026");
        assert!(course.description.starts_with("Introduction to artificial intelligence"));
        assert!(course.description.contains("machine learning"));
        assert_eq!(course.units, "3");
        assert_eq!(course.sections_offered, vec!["Fall 2025", "Spring 2026"]);
        assert_eq!(course.url, url.to_string());
    }

    #[test]
    fn course_page_missing_description_stops_at_next_label() {
        let html = r#"<html><body><div id="courseResults">
            <h2>ENG 105A - Critical Reading</h2>
            <strong>Description:</strong>
            <br/>
            <strong>Units:</strong> 4
        </div></body></html>"#;
        let url = Url::parse("https://catalog.nau.edu/Courses/course?courseId=9").unwrap();
        let course = parse_course(html, &url).unwrap();

        assert_eq!(course.number, "105A");
        assert_eq!(course.description, "");
        assert_eq!(course.units, "4");
        assert!(course.sections_offered.is_empty());
        assert_eq!(course.catalog_year, "");
    }

    #[test]
    fn course_page_without_header_is_parse_error() {
        let url = Url::parse("https://catalog.nau.edu/Courses/course?courseId=404").unwrap();
        let err = parse_course("<html><body><h1>Oops</h1></body></html>", &url).unwrap_err();
        assert!(err.to_string().contains("no course header"));

        let html = r#"<div id="courseResults"><h2>Special Topics</h2></div>"#;
        let err = parse_course(html, &url).unwrap_err();
        assert!(err.to_string().contains("unrecognized course header"));
    }
}
