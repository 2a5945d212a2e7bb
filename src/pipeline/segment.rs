//! Section segmentation: split raw page text into heading-delimited sections.
//!
//! Every line is tested against two heading rules, first match wins:
//!
//! 1. **Numbered**: `1 Introduction`, `2.1. Setup`, `3.2.1 Ablations`.
//!    Level is the number of *internal* dots plus one, so a trailing dot
//!    (`1.`) does not deepen the level. Titles may start lower-case when the
//!    number ends in a dot (`2. related work`); otherwise they must start
//!    upper-case.
//! 2. **Capitalized**: a short line whose words all start with a capital
//!    letter (`Related Work`, `CONCLUSION`). Short connectives such as `and`
//!    or `of` are tolerated after the first word. Level 1.
//!
//! Body lines accumulate into the open section. Text before the first heading
//! has no section to belong to and is dropped.

use crate::model::Section;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Separator placed between pages when page texts are joined into one string.
pub const PAGE_BREAK: &str = "\n\n--- Page Break ---\n\n";

/// Headings longer than this many words are treated as body text.
const MAX_HEADING_WORDS: usize = 12;

/// Lower-case words allowed inside a capitalized heading.
const CONNECTIVES: &[&str] = &[
    "a", "an", "and", "as", "at", "by", "for", "from", "in", "of", "on", "or", "the", "to",
    "vs", "with",
];

static RE_NUMBERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3}(?:\.\d{1,3})*)(\.?)\s+(\p{L}.*)$").unwrap());

/// A heading recognised on a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub text: String,
    pub level: u32,
}

/// Classify one line as a heading, or `None` for body text.
pub fn detect_heading(line: &str) -> Option<Heading> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    numbered_heading(line).or_else(|| capitalized_heading(line))
}

fn numbered_heading(line: &str) -> Option<Heading> {
    let caps = RE_NUMBERED.captures(line)?;
    let number = caps.get(1)?.as_str();
    let dotted = !caps.get(2)?.as_str().is_empty();
    let text = caps.get(3)?.as_str().trim();
    // `12.5 percent` or `3 times` without a trailing dot reads as prose.
    if !dotted && !text.starts_with(char::is_uppercase) {
        return None;
    }
    if text.split_whitespace().count() > MAX_HEADING_WORDS {
        return None;
    }
    Some(Heading {
        text: text.to_string(),
        level: number.matches('.').count() as u32 + 1,
    })
}

fn capitalized_heading(line: &str) -> Option<Heading> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() || words.len() > MAX_HEADING_WORDS {
        return None;
    }
    let is_capital_word = |w: &str| {
        let mut chars = w.chars();
        matches!(chars.next(), Some(c) if c.is_uppercase())
            && chars.all(|c| c.is_alphabetic() || c == '-')
    };
    if !is_capital_word(words[0]) {
        return None;
    }
    let rest_ok = words[1..]
        .iter()
        .all(|&w| is_capital_word(w) || CONNECTIVES.contains(&w));
    if !rest_ok {
        return None;
    }
    Some(Heading {
        text: words.join(" "),
        level: 1,
    })
}

/// A section being accumulated.
struct OpenSection {
    heading: Heading,
    start_page: usize,
    body: String,
}

impl OpenSection {
    fn close(self) -> Section {
        Section {
            heading: self.heading.text,
            level: self.heading.level,
            content: self.body.trim().to_string(),
            start_page: Some(self.start_page),
        }
    }
}

/// Segment page texts into sections, in document order.
///
/// `pages` yields `(page_number, raw_text)` pairs; page numbers are carried
/// through to [`Section::start_page`] unchanged.
pub fn segment<'a, I>(pages: I) -> Vec<Section>
where
    I: IntoIterator<Item = (usize, &'a str)>,
{
    let mut sections = Vec::new();
    let mut open: Option<OpenSection> = None;

    for (page_num, text) in pages {
        for line in text.lines() {
            if let Some(heading) = detect_heading(line) {
                if let Some(prev) = open.take() {
                    sections.push(prev.close());
                }
                open = Some(OpenSection {
                    heading,
                    start_page: page_num,
                    body: String::new(),
                });
            } else if let Some(current) = open.as_mut() {
                current.body.push_str(line);
                current.body.push('\n');
            }
        }
    }

    if let Some(last) = open.take() {
        sections.push(last.close());
    }

    debug!("Segmented {} sections", sections.len());
    sections
}

/// Segment a full text that uses [`PAGE_BREAK`] between pages.
pub fn segment_text(full_text: &str) -> Vec<Section> {
    segment(
        full_text
            .split(PAGE_BREAK)
            .enumerate()
            .map(|(i, page)| (i + 1, page)),
    )
}

/// Join page texts with [`PAGE_BREAK`].
pub fn join_pages<'a, I>(pages: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    pages.into_iter().collect::<Vec<_>>().join(PAGE_BREAK)
}
