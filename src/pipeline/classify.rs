//! Section classification: map segmented sections onto canonical roles.
//!
//! The heading of each section is lower-cased and tested against an ordered
//! rule table; the first rule whose keywords occur in the heading assigns the
//! role. When several sections map to the same role the last one wins.
//!
//! If segmentation produced nothing useful (no sections, or no section
//! matched any role) each role is searched for directly in the full text with
//! a `Keyword: content` pattern anywhere in a line, ending at the next blank
//! line followed by a capitalised or numbered line.

use crate::model::{CanonicalSections, Role, Section, UNKNOWN_TITLE};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Ordered heading rules. Order decides ties within one heading.
pub const ROLE_RULES: &[(Role, &[&str])] = &[
    (Role::Abstract, &["abstract"]),
    (Role::Introduction, &["introduction", "background"]),
    (Role::Methodology, &["method", "approach", "experiment"]),
    (Role::Results, &["result", "finding", "observation"]),
    (Role::Discussion, &["discussion"]),
    (Role::Conclusion, &["conclusion", "summary", "future work"]),
    (Role::References, &["reference", "bibliography"]),
];

/// One `(role, start-of-content pattern)` pair per rule.
static FALLBACK_PATTERNS: Lazy<Vec<(Role, Regex)>> = Lazy::new(|| {
    ROLE_RULES
        .iter()
        .map(|(role, keywords)| {
            let alternatives = keywords
                .iter()
                .map(|k| regex::escape(k).replace(' ', r"\s+"))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(
                r"(?i)\b(?:{alternatives})\w*[:\s\x{{2014}}]+"
            );
            (*role, Regex::new(&pattern).unwrap())
        })
        .collect()
});

/// A blank line followed by a capitalised or numbered line.
static RE_SECTION_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*\n\s*[\p{Lu}\d]").unwrap());

/// Map a heading to its canonical role, if any.
pub fn classify_heading(heading: &str) -> Option<Role> {
    let heading = heading.to_lowercase();
    ROLE_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| heading.contains(k)))
        .map(|(role, _)| *role)
}

/// Assign canonical roles to `sections`, falling back to a text search of
/// `full_text` when the sections yield nothing.
///
/// Pure and deterministic: the same input always yields the same mapping.
pub fn classify(sections: &[Section], full_text: &str) -> CanonicalSections {
    let mut canonical = CanonicalSections::default();

    for section in sections {
        if let Some(role) = classify_heading(&section.heading) {
            canonical.set(role, section.content.as_str());
        }
    }

    if sections.is_empty() || canonical.body_is_empty() {
        debug!(
            "No canonical sections from {} headings; searching full text",
            sections.len()
        );
        apply_text_fallback(&mut canonical, full_text);
    }

    canonical.set(Role::Title, extract_title(full_text));
    canonical
}

fn apply_text_fallback(canonical: &mut CanonicalSections, full_text: &str) {
    for (role, pattern) in FALLBACK_PATTERNS.iter() {
        if let Some(content) = find_role_content(pattern, full_text) {
            canonical.set(*role, content);
        }
    }
}

fn find_role_content(pattern: &Regex, text: &str) -> Option<String> {
    let start = pattern.find(text)?.end();
    let rest = &text[start..];
    let end = RE_SECTION_BOUNDARY
        .find(rest)
        .map(|m| m.start())
        .unwrap_or(rest.len());
    let content = rest[..end].trim();
    (!content.is_empty()).then(|| content.to_string())
}

/// First non-empty line of the text, or [`UNKNOWN_TITLE`].
pub fn extract_title(full_text: &str) -> String {
    full_text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or(UNKNOWN_TITLE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(heading: &str, content: &str) -> Section {
        Section {
            heading: heading.to_string(),
            level: 1,
            content: content.to_string(),
            start_page: Some(1),
        }
    }

    #[test]
    fn headings_map_through_rule_table() {
        assert_eq!(classify_heading("Abstract"), Some(Role::Abstract));
        assert_eq!(classify_heading("Background and Motivation"), Some(Role::Introduction));
        assert_eq!(classify_heading("Materials and Methods"), Some(Role::Methodology));
        assert_eq!(classify_heading("Experimental Setup"), Some(Role::Methodology));
        assert_eq!(classify_heading("Key Findings"), Some(Role::Results));
        assert_eq!(classify_heading("Conclusions and Future Work"), Some(Role::Conclusion));
        assert_eq!(classify_heading("BIBLIOGRAPHY"), Some(Role::References));
        assert_eq!(classify_heading("Acknowledgements"), None);
    }

    #[test]
    fn first_rule_wins_within_a_heading() {
        // Matches both methodology ("method") and results ("result").
        assert_eq!(classify_heading("Method and Results"), Some(Role::Methodology));
    }

    #[test]
    fn primary_path_assigns_roles() {
        let sections = vec![
            section("Abstract", "We study X."),
            section("Introduction", "X matters."),
            section("Related Work", "Others did Y."),
            section("Results", "X works."),
        ];
        let cs = classify(&sections, "A Study of X\nAuthors\n");
        assert_eq!(cs.title, "A Study of X");
        assert_eq!(cs.r#abstract, "We study X.");
        assert_eq!(cs.introduction, "X matters.");
        assert_eq!(cs.results, "X works.");
        assert_eq!(cs.discussion, "");
    }

    #[test]
    fn duplicate_roles_last_wins() {
        let sections = vec![
            section("Results", "first"),
            section("Additional Results", "second"),
        ];
        let cs = classify(&sections, "T");
        assert_eq!(cs.results, "second");
    }

    #[test]
    fn fallback_on_empty_sections() {
        let text = "Abstract: foo bar\n\nIntroduction: baz";
        let cs = classify(&[], text);
        assert_eq!(cs.r#abstract, "foo bar");
        assert_eq!(cs.introduction, "baz");
        assert_eq!(cs.methodology, "");
    }

    #[test]
    fn fallback_finds_keywords_mid_line() {
        let text = "A Paper\n\nExtended Abstract: foo bar\n\nBrief Introduction: baz";
        let cs = classify(&[], text);
        assert_eq!(cs.r#abstract, "foo bar");
        assert_eq!(cs.introduction, "baz");
        assert_eq!(cs.title, "A Paper");
    }

    #[test]
    fn fallback_when_no_heading_matches() {
        let sections = vec![section("Preliminaries", "stuff")];
        let text = "Paper\n\nConclusion: it works\n\n1 Appendix";
        let cs = classify(&sections, text);
        assert_eq!(cs.conclusion, "it works");
    }

    #[test]
    fn no_fallback_when_primary_finds_something() {
        let sections = vec![section("Discussion", "from sections")];
        let text = "Abstract: should not be used";
        let cs = classify(&sections, text);
        assert_eq!(cs.discussion, "from sections");
        assert_eq!(cs.r#abstract, "");
    }

    #[test]
    fn fallback_spans_until_boundary() {
        let text = "ABSTRACT\nline one\nline two\n\nmore abstract\n\n2 Method: we did it";
        let cs = classify(&[], text);
        assert_eq!(cs.r#abstract, "line one\nline two\n\nmore abstract");
        assert_eq!(cs.methodology, "we did it");
    }

    #[test]
    fn classification_is_idempotent() {
        let sections = vec![
            section("1 Introduction", "a"),
            section("2 Approach", "b"),
            section("3 Summary", "c"),
        ];
        let text = "Title line\nbody";
        assert_eq!(classify(&sections, text), classify(&sections, text));
    }

    #[test]
    fn title_defaults() {
        assert_eq!(extract_title(""), UNKNOWN_TITLE);
        assert_eq!(extract_title("\n\n   \n"), UNKNOWN_TITLE);
        assert_eq!(extract_title("\n  Attention Is All You Need \nVaswani"), "Attention Is All You Need");
        assert_eq!(classify(&[], "").title, UNKNOWN_TITLE);
    }
}
