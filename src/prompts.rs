//! Prompts for every text-generation call the pipeline makes.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: changing what the model is asked for
//!    (slide structure, key-point fields, analysis focus) means editing
//!    exactly one place.
//!
//! 2. **Testability**: unit tests can build and inspect prompts directly
//!    without a provider, so prompt regressions are easy to catch.
//!
//! Paper text is always bounded with [`truncate_for_prompt`] *before* it is
//! embedded, so request size never depends on provider limits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Appended to paper text cut at the prompt bound.
pub const TRUNCATION_MARKER: &str = "... [text truncated due to length]";

/// Character bound for paper text in slide prompts.
pub const SLIDE_TEXT_LIMIT: usize = 50_000;

/// Character bound for paper text in summary, key-point and analysis prompts.
pub const ANALYSIS_TEXT_LIMIT: usize = 100_000;

/// Cut `text` to at most `limit` characters, appending [`TRUNCATION_MARKER`]
/// when anything was removed. Cuts on a char boundary.
pub fn truncate_for_prompt(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

// ── Slides ───────────────────────────────────────────────────────────────────

pub const SLIDES_SYSTEM_MESSAGE: &str = "You are an expert at creating clear, concise, and engaging presentation slides from academic papers.";

/// Instruction asking for `max_slides` slides as a JSON array.
///
/// `paper_text` must already be bounded.
pub fn slides_prompt(paper_text: &str, max_slides: usize, focus_areas: &[String]) -> String {
    let focus = if focus_areas.is_empty() {
        String::new()
    } else {
        format!(", focusing on {}", focus_areas.join(", "))
    };
    format!(
        r#"Create a presentation with {max_slides} slides based on the following academic paper{focus}.

For each slide, provide:
1. A slide title
2. Bullet points or key content for the slide
3. Optional speaker notes with additional details or talking points

The presentation should follow this general structure:
- Title slide with paper title and authors
- Introduction / Background
- Research Questions or Objectives
- Methodology
- Key Results (can be multiple slides if needed)
- Discussion of findings
- Conclusion and implications
- References (only key ones)

Make sure the content is concise and suitable for presentation slides.

Paper text:
{paper_text}

Please format your response as a JSON array with objects containing 'title', 'content', 'notes', and 'layout' fields.
'content' should be an array of strings representing bullet points or paragraphs.
'layout' is "title" for the title slide and "content" otherwise."#
    )
}

// ── Key points ───────────────────────────────────────────────────────────────

pub const KEY_POINTS_SYSTEM_MESSAGE: &str = "You are an expert academic research assistant tasked with identifying the most important points in academic papers.";

pub fn key_points_prompt(paper_text: &str, num_points: usize, categories: &[String]) -> String {
    let mut prompt = format!(
        "Extract the {num_points} most important key points from the following academic paper.
For each key point, include:
1. The main content of the key point
2. The category it belongs to (e.g., methodology, finding, limitation)
3. An importance score from 1-10
4. The section of the paper where this point is made

"
    );
    if !categories.is_empty() {
        prompt.push_str(&format!(
            "Focus on these categories: {}\n\n",
            categories.join(", ")
        ));
    }
    prompt.push_str(&format!(
        "Paper text:
{paper_text}

Please format your response as a JSON array with objects that have 'content', 'category', 'importance', and 'source_section' fields.
"
    ));
    prompt
}

// ── Summaries ────────────────────────────────────────────────────────────────

/// Register of a generated summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStyle {
    #[default]
    Academic,
    Simple,
    BulletPoints,
}

impl SummaryStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStyle::Academic => "academic",
            SummaryStyle::Simple => "simple",
            SummaryStyle::BulletPoints => "bullet_points",
        }
    }

    pub fn system_message(&self) -> String {
        let base = "You are an expert academic research assistant. Your task is to summarize academic papers clearly and concisely.";
        match self {
            SummaryStyle::Academic => base.to_string(),
            SummaryStyle::Simple => format!(
                "{base} Use simple, accessible language that a non-expert could understand."
            ),
            SummaryStyle::BulletPoints => format!(
                "{base} Format your summary as bullet points covering the key aspects of the paper."
            ),
        }
    }
}

impl fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "academic" => Ok(SummaryStyle::Academic),
            "simple" => Ok(SummaryStyle::Simple),
            "bullet_points" | "bullets" => Ok(SummaryStyle::BulletPoints),
            other => Err(format!(
                "unknown summary style '{other}' (expected academic, simple or bullet_points)"
            )),
        }
    }
}

pub fn summary_prompt(
    paper_text: &str,
    max_words: usize,
    style: SummaryStyle,
    focus_areas: &[String],
) -> String {
    let mut prompt = format!(
        "Summarize the following academic paper. Please create a concise summary of approximately {max_words} words.\n\nStyle: {style}\n"
    );
    if !focus_areas.is_empty() {
        prompt.push_str(&format!(
            "Focus on these specific areas: {}\n\n",
            focus_areas.join(", ")
        ));
    }
    prompt.push_str(&format!("Paper text:\n{paper_text}\n\nSummary:"));
    prompt
}

// ── Analysis ─────────────────────────────────────────────────────────────────

pub const ANALYSIS_SYSTEM_MESSAGE: &str = "You are an expert academic research assistant with extensive knowledge across scientific domains.";

/// What an analysis call should look at.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "prompt", rename_all = "snake_case")]
pub enum AnalysisKind {
    #[default]
    General,
    Structure,
    Methodology,
    Results,
    References,
    /// Free-form instruction supplied by the caller.
    Custom(String),
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::General => "general",
            AnalysisKind::Structure => "structure",
            AnalysisKind::Methodology => "methodology",
            AnalysisKind::Results => "results",
            AnalysisKind::References => "references",
            AnalysisKind::Custom(_) => "custom",
        }
    }

    /// Parse a kind name; unknown names mean a general analysis.
    pub fn from_name(name: &str, custom_prompt: Option<&str>) -> Self {
        match name.trim().to_lowercase().as_str() {
            "structure" => AnalysisKind::Structure,
            "methodology" => AnalysisKind::Methodology,
            "results" => AnalysisKind::Results,
            "references" => AnalysisKind::References,
            "custom" => AnalysisKind::Custom(
                custom_prompt
                    .unwrap_or("Analyze the following academic paper:")
                    .to_string(),
            ),
            _ => AnalysisKind::General,
        }
    }
}

pub fn analysis_prompt(paper_text: &str, kind: &AnalysisKind) -> String {
    let focus: &[&str] = match kind {
        AnalysisKind::Custom(instruction) => {
            return format!("{instruction}\n\nPaper text:\n{paper_text}\n");
        }
        AnalysisKind::Structure => &[
            "The overall organization",
            "Key sections and their purposes",
            "How well the paper follows standard academic structure",
            "Suggestions for structural improvements",
        ],
        AnalysisKind::Methodology => &[
            "The research method(s) employed",
            "Data collection and analysis techniques",
            "Strengths and limitations of the methodology",
            "How the methodology aligns with the research questions/objectives",
        ],
        AnalysisKind::Results => &[
            "The key results presented",
            "How results are interpreted by the authors",
            "The significance of the findings",
            "Any limitations or caveats mentioned",
            "How the results compare to prior work in the field",
        ],
        AnalysisKind::References => &[
            "The key sources cited",
            "How recent the citations are",
            "The diversity of sources",
            "Any notable gaps in the literature review",
            "How the paper builds on prior work",
        ],
        AnalysisKind::General => &[
            "The key research questions and objectives",
            "The methodology used",
            "The main findings and their significance",
            "Strengths and limitations of the work",
            "Potential implications and future directions",
        ],
    };
    let lead = match kind {
        AnalysisKind::Structure => "Analyze the structure of the following academic paper.",
        AnalysisKind::Methodology => "Analyze the methodology used in the following academic paper.",
        AnalysisKind::Results => "Analyze the results and findings of the following academic paper.",
        AnalysisKind::References => {
            "Analyze the references and citations in the following academic paper."
        }
        _ => "Provide a comprehensive analysis of the following academic paper.",
    };
    let bullets: String = focus.iter().map(|f| format!("- {f}\n")).collect();
    format!("{lead}\nInclude information about:\n{bullets}\nPaper text:\n{paper_text}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_for_prompt("abc", 10), "abc");
        assert_eq!(truncate_for_prompt("abc", 3), "abc");
    }

    #[test]
    fn long_text_is_cut_with_marker() {
        let out = truncate_for_prompt("abcdef", 4);
        assert_eq!(out, format!("abcd{TRUNCATION_MARKER}"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "é".repeat(10);
        let out = truncate_for_prompt(&text, 3);
        assert!(out.starts_with("ééé"));
        assert_eq!(out.chars().count(), 3 + TRUNCATION_MARKER.chars().count());
    }

    #[test]
    fn slides_prompt_embeds_count_and_focus() {
        let p = slides_prompt("TEXT", 7, &["results".into(), "limitations".into()]);
        assert!(p.contains("with 7 slides"));
        assert!(p.contains(", focusing on results, limitations."));
        assert!(p.contains("Paper text:\nTEXT"));
        let p = slides_prompt("TEXT", 3, &[]);
        assert!(!p.contains("focusing"));
    }

    #[test]
    fn key_points_prompt_lists_categories() {
        let p = key_points_prompt("T", 5, &["finding".into()]);
        assert!(p.contains("5 most important"));
        assert!(p.contains("Focus on these categories: finding"));
        assert!(p.contains("'source_section'"));
    }

    #[test]
    fn summary_style_parsing() {
        assert_eq!("bullet-points".parse::<SummaryStyle>().unwrap(), SummaryStyle::BulletPoints);
        assert_eq!("Simple".parse::<SummaryStyle>().unwrap(), SummaryStyle::Simple);
        assert!("verbose".parse::<SummaryStyle>().is_err());
        assert!(SummaryStyle::Simple.system_message().contains("non-expert"));
        assert!(summary_prompt("T", 200, SummaryStyle::Academic, &[]).contains("approximately 200 words"));
    }

    #[test]
    fn analysis_prompts_by_kind() {
        assert!(analysis_prompt("T", &AnalysisKind::Structure).contains("overall organization"));
        assert!(analysis_prompt("T", &AnalysisKind::General).contains("comprehensive analysis"));
        let custom = AnalysisKind::from_name("custom", Some("List every dataset."));
        assert!(analysis_prompt("T", &custom).starts_with("List every dataset."));
        assert_eq!(AnalysisKind::from_name("whatever", None), AnalysisKind::General);
    }
}
