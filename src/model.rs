//! Core data model shared by every pipeline stage.
//!
//! ```text
//! Section ──▶ CanonicalSections ──▶ (LLM) ──▶ KeyPoint / SlideRecord
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default title when a paper's text yields no usable first line.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// A contiguous, heading-delimited span of document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Heading text without its numbering. Never empty.
    pub heading: String,
    /// Heading depth, 1 for top-level headings.
    pub level: u32,
    /// Body text between this heading and the next, trimmed.
    pub content: String,
    /// 1-indexed page on which the heading appears.
    pub start_page: Option<usize>,
}

/// The fixed document-structure categories sections are mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Title,
    Abstract,
    Introduction,
    Methodology,
    Results,
    Discussion,
    Conclusion,
    References,
}

impl Role {
    /// Every role in canonical order.
    pub const ALL: [Role; 8] = [
        Role::Title,
        Role::Abstract,
        Role::Introduction,
        Role::Methodology,
        Role::Results,
        Role::Discussion,
        Role::Conclusion,
        Role::References,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Title => "title",
            Role::Abstract => "abstract",
            Role::Introduction => "introduction",
            Role::Methodology => "methodology",
            Role::Results => "results",
            Role::Discussion => "discussion",
            Role::Conclusion => "conclusion",
            Role::References => "references",
        }
    }

    /// Human heading used when the section is rendered back into prompt text.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Title => "Title",
            Role::Abstract => "Abstract",
            Role::Introduction => "Introduction",
            Role::Methodology => "Methodology",
            Role::Results => "Results",
            Role::Discussion => "Discussion",
            Role::Conclusion => "Conclusion",
            Role::References => "References",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One string per [`Role`]; an empty string means "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalSections {
    pub title: String,
    pub r#abstract: String,
    pub introduction: String,
    pub methodology: String,
    pub results: String,
    pub discussion: String,
    pub conclusion: String,
    pub references: String,
}

impl CanonicalSections {
    pub fn get(&self, role: Role) -> &str {
        match role {
            Role::Title => &self.title,
            Role::Abstract => &self.r#abstract,
            Role::Introduction => &self.introduction,
            Role::Methodology => &self.methodology,
            Role::Results => &self.results,
            Role::Discussion => &self.discussion,
            Role::Conclusion => &self.conclusion,
            Role::References => &self.references,
        }
    }

    pub fn set(&mut self, role: Role, content: impl Into<String>) {
        let slot = match role {
            Role::Title => &mut self.title,
            Role::Abstract => &mut self.r#abstract,
            Role::Introduction => &mut self.introduction,
            Role::Methodology => &mut self.methodology,
            Role::Results => &mut self.results,
            Role::Discussion => &mut self.discussion,
            Role::Conclusion => &mut self.conclusion,
            Role::References => &mut self.references,
        };
        *slot = content.into();
    }

    /// True when no role other than the title carries content.
    pub fn body_is_empty(&self) -> bool {
        Role::ALL
            .iter()
            .filter(|r| **r != Role::Title)
            .all(|r| self.get(*r).is_empty())
    }

    /// Title to fall back on when a deck has no title slide.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            UNKNOWN_TITLE
        } else {
            &self.title
        }
    }

    /// Render the populated roles as labelled plain text, in canonical order.
    ///
    /// The title is emitted as the first line so a model can pick it up for
    /// the title slide.
    pub fn to_prompt_text(&self) -> String {
        let mut out = String::new();
        if !self.title.is_empty() {
            out.push_str(&self.title);
            out.push_str("\n\n");
        }
        for role in Role::ALL.iter().filter(|r| **r != Role::Title) {
            let content = self.get(*role);
            if content.is_empty() {
                continue;
            }
            out.push_str(role.label());
            out.push('\n');
            out.push_str(content);
            out.push_str("\n\n");
        }
        out.trim_end().to_string()
    }
}

/// A key point extracted from a paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPoint {
    pub content: String,
    pub category: String,
    /// 1–10, higher is more important.
    pub importance: u8,
    pub source_section: Option<String>,
}

/// Category used when the model names none.
pub const DEFAULT_CATEGORY: &str = "general";
/// Importance used when the model gives none or an unparseable one.
pub const DEFAULT_IMPORTANCE: u8 = 5;

impl KeyPoint {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            category: DEFAULT_CATEGORY.to_string(),
            importance: DEFAULT_IMPORTANCE,
            source_section: None,
        }
    }
}

/// Slide layout understood by deck renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideLayout {
    Title,
    #[default]
    Content,
}

/// One slide of a deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRecord {
    pub title: String,
    /// Bullet points or short paragraphs, in display order.
    pub content: Vec<String>,
    /// Speaker notes.
    pub notes: Option<String>,
    pub layout: SlideLayout,
}

impl SlideRecord {
    pub fn content(title: impl Into<String>, bullets: Vec<String>) -> Self {
        Self {
            title: title.into(),
            content: bullets,
            notes: None,
            layout: SlideLayout::Content,
        }
    }

    /// Whether this slide can serve as the deck's title slide.
    pub fn qualifies_as_title(&self) -> bool {
        self.layout == SlideLayout::Title || self.title.to_lowercase().contains("title")
    }
}
