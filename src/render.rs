//! Deck renderers: turn a [`DeckOutput`] into a file body.
//!
//! Two formats ship:
//!
//! * [`MarkdownRenderer`]: Marp-flavoured Markdown. Template fonts, sizes,
//!   colors and the 16:9 slide size travel in the front matter, speaker notes
//!   become HTML comments (Marp's presenter-notes convention), and an optional
//!   "Figures from the Paper" slide shows up to four exported images.
//! * [`JsonRenderer`]: the deck record itself, pretty-printed.
//!
//! Renderers are pure: they never touch the filesystem. Image links are
//! built from the `image_base` the caller passes, relative to wherever the
//! caller writes the output.

use crate::config::OutputFormat;
use crate::error::Paper2SlidesError;
use crate::model::{SlideLayout, SlideRecord};
use crate::output::DeckOutput;
use crate::template::{figure_placements, TemplateStyle, FIGURES_SLIDE_TITLE};

/// Pixels per inch used when sizing figures for Marp.
const PX_PER_INCH: f32 = 96.0;

/// Something that can turn a deck into text.
pub trait DeckRenderer: Send + Sync {
    fn format(&self) -> OutputFormat;

    /// Render `deck`. `image_base` prefixes figure file names in links.
    fn render(&self, deck: &DeckOutput, image_base: &str) -> Result<String, Paper2SlidesError>;
}

/// The renderer for `format`.
pub fn renderer_for(format: OutputFormat) -> Box<dyn DeckRenderer> {
    match format {
        OutputFormat::Markdown => Box::new(MarkdownRenderer),
        OutputFormat::Json => Box::new(JsonRenderer),
    }
}

/// Render `deck` in `format`.
pub fn render_deck(
    deck: &DeckOutput,
    format: OutputFormat,
    image_base: &str,
) -> Result<String, Paper2SlidesError> {
    renderer_for(format).render(deck, image_base)
}

// ── JSON ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl DeckRenderer for JsonRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Json
    }

    fn render(&self, deck: &DeckOutput, _image_base: &str) -> Result<String, Paper2SlidesError> {
        serde_json::to_string_pretty(deck)
            .map_err(|e| Paper2SlidesError::Internal(format!("deck serialisation: {e}")))
    }
}

// ── Marp Markdown ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl DeckRenderer for MarkdownRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }

    fn render(&self, deck: &DeckOutput, image_base: &str) -> Result<String, Paper2SlidesError> {
        let style = deck.template.style();
        let mut pages: Vec<String> = deck.slides.iter().map(render_slide).collect();
        if let Some(figures) = figures_slide(deck, image_base) {
            pages.push(figures);
        }

        let mut out = front_matter(&deck.title, &style);
        out.push_str(&pages.join("\n---\n\n"));
        Ok(out)
    }
}

fn front_matter(title: &str, style: &TemplateStyle) -> String {
    let c = &style.colors;
    let mut fm = String::from("---\nmarp: true\n");
    fm.push_str(&format!("title: \"{}\"\n", title.replace('"', "'")));
    fm.push_str(&format!(
        "size: {}x{}\n",
        (style.slide_width_in * PX_PER_INCH).round() as u32,
        (style.slide_height_in * PX_PER_INCH).round() as u32
    ));
    fm.push_str("paginate: true\nstyle: |\n");
    fm.push_str(&format!(
        "  section {{ font-family: {}; font-size: {}pt; background: {}; color: {}; }}\n",
        style.body_font,
        style.body_font_size,
        c.background.hex(),
        c.text.hex()
    ));
    fm.push_str(&format!(
        "  h1 {{ font-family: {}; font-size: {}pt; color: {}; border-bottom: 3px solid {}; }}\n",
        style.title_font,
        style.title_font_size,
        c.accent1.hex(),
        c.accent2.hex()
    ));
    fm.push_str(&format!(
        "  section.title {{ background: {}; color: {}; }}\n",
        c.title_background.hex(),
        c.title_text.hex()
    ));
    fm.push_str(&format!(
        "  section.title h1 {{ color: {}; border: none; }}\n",
        c.title_text.hex()
    ));
    fm.push_str("---\n\n");
    fm
}

fn render_slide(slide: &SlideRecord) -> String {
    let mut md = String::new();
    if slide.layout == SlideLayout::Title {
        md.push_str("<!-- _class: title -->\n\n");
    }
    md.push_str(&format!("# {}\n\n", one_line(&slide.title)));

    for line in &slide.content {
        let line = one_line(line);
        if line.is_empty() {
            continue;
        }
        match slide.layout {
            SlideLayout::Title => md.push_str(&format!("{}\n\n", escape_rule(&line))),
            SlideLayout::Content => md.push_str(&format!("- {line}\n")),
        }
    }

    if let Some(notes) = slide.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        if slide.layout == SlideLayout::Content && !slide.content.is_empty() {
            md.push('\n');
        }
        md.push_str(&format!("<!--\n{}\n-->\n", notes.replace("-->", "-- >")));
    }
    md
}

fn figures_slide(deck: &DeckOutput, image_base: &str) -> Option<String> {
    let placements = figure_placements(deck.figures.len());
    if placements.is_empty() {
        return None;
    }

    let base = image_base.trim_end_matches('/');
    let mut md = format!("# {FIGURES_SLIDE_TITLE}\n\n");
    for (img, place) in deck.figures.iter().zip(&placements) {
        let link = if base.is_empty() {
            img.file_name.clone()
        } else {
            format!("{base}/{}", img.file_name)
        };
        md.push_str(&format!(
            "![w:{}px h:{}px]({})\n",
            (place.width * PX_PER_INCH).round() as u32,
            (place.height * PX_PER_INCH).round() as u32,
            link
        ));
    }
    md.push_str(&format!(
        "\n<!--\nFigures from pages {}\n-->\n",
        deck.figures
            .iter()
            .take(placements.len())
            .map(|i| i.page.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    ));
    Some(md)
}

/// Collapse internal whitespace so a value cannot start a new slide.
fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A bare paragraph made only of `-`, `*`, `_` or `=` would read as a slide
/// separator or setext underline.
fn escape_rule(line: &str) -> String {
    if line.chars().all(|c| matches!(c, '-' | '*' | '_' | '=' | ' ')) {
        format!("\\{line}")
    } else {
        line.to_string()
    }
}
