//! Slide templates: named styling tables handed to deck renderers.
//!
//! A template is an enumerated mapping from name to fonts, sizes, colors and
//! slide dimensions. Unknown names resolve to [`Template::Academic`] through
//! [`Template::from_name`]; [`FromStr`] is strict for CLI parsing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Available slide templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Academic,
    Minimalist,
    Corporate,
}

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    /// `#rrggbb`.
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub title_background: Rgb,
    pub title_text: Rgb,
    pub background: Rgb,
    pub text: Rgb,
    pub accent1: Rgb,
    pub accent2: Rgb,
}

/// Styling attributes of one template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemplateStyle {
    /// Slide width in inches.
    pub slide_width_in: f32,
    /// Slide height in inches.
    pub slide_height_in: f32,
    pub title_font: &'static str,
    /// Title size in points.
    pub title_font_size: u32,
    pub body_font: &'static str,
    /// Body size in points.
    pub body_font_size: u32,
    pub colors: Palette,
}

/// 16:9 widescreen.
const WIDE_WIDTH_IN: f32 = 13.333;
const WIDE_HEIGHT_IN: f32 = 7.5;

impl Template {
    pub const ALL: [Template; 3] = [Template::Academic, Template::Minimalist, Template::Corporate];

    pub fn as_str(&self) -> &'static str {
        match self {
            Template::Academic => "academic",
            Template::Minimalist => "minimalist",
            Template::Corporate => "corporate",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Template::Academic => "Navy title bars, Arial, blue and orange accents",
            Template::Minimalist => "White throughout, large Calibri, grey accents",
            Template::Corporate => "Dark blue title bars, Calibri, blue and gold accents",
        }
    }

    /// Lenient lookup: unknown names mean the academic template.
    pub fn from_name(name: &str) -> Template {
        name.parse().unwrap_or_default()
    }

    pub fn style(&self) -> TemplateStyle {
        match self {
            Template::Academic => TemplateStyle {
                slide_width_in: WIDE_WIDTH_IN,
                slide_height_in: WIDE_HEIGHT_IN,
                title_font: "Arial",
                title_font_size: 36,
                body_font: "Arial",
                body_font_size: 24,
                colors: Palette {
                    title_background: Rgb(35, 75, 120),
                    title_text: Rgb::WHITE,
                    background: Rgb::WHITE,
                    text: Rgb::BLACK,
                    accent1: Rgb(0, 112, 192),
                    accent2: Rgb(237, 125, 49),
                },
            },
            Template::Minimalist => TemplateStyle {
                slide_width_in: WIDE_WIDTH_IN,
                slide_height_in: WIDE_HEIGHT_IN,
                title_font: "Calibri",
                title_font_size: 40,
                body_font: "Calibri",
                body_font_size: 28,
                colors: Palette {
                    title_background: Rgb::WHITE,
                    title_text: Rgb::BLACK,
                    background: Rgb::WHITE,
                    text: Rgb::BLACK,
                    accent1: Rgb(180, 180, 180),
                    accent2: Rgb(100, 100, 100),
                },
            },
            Template::Corporate => TemplateStyle {
                slide_width_in: WIDE_WIDTH_IN,
                slide_height_in: WIDE_HEIGHT_IN,
                title_font: "Calibri",
                title_font_size: 36,
                body_font: "Calibri",
                body_font_size: 24,
                colors: Palette {
                    title_background: Rgb(31, 73, 125),
                    title_text: Rgb::WHITE,
                    background: Rgb::WHITE,
                    text: Rgb::BLACK,
                    accent1: Rgb(0, 112, 192),
                    accent2: Rgb(255, 192, 0),
                },
            },
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Template {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "academic" => Ok(Template::Academic),
            "minimalist" | "minimal" => Ok(Template::Minimalist),
            "corporate" => Ok(Template::Corporate),
            other => Err(format!(
                "unknown template '{other}' (expected academic, minimalist or corporate)"
            )),
        }
    }
}

// ── Figure grid ──────────────────────────────────────────────────────────────

/// Most images placed on the figures slide.
pub const MAX_FIGURES: usize = 4;

/// Title of the figures slide.
pub const FIGURES_SLIDE_TITLE: &str = "Figures from the Paper";

/// Position and size of one image on the figures slide, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Grid for `count` images: one centred, two side by side, else 2×2.
/// Images past [`MAX_FIGURES`] get no placement.
pub fn figure_placements(count: usize) -> Vec<Placement> {
    match count.min(MAX_FIGURES) {
        0 => Vec::new(),
        1 => vec![Placement {
            left: 3.0,
            top: 2.0,
            width: 7.0,
            height: 4.0,
        }],
        2 => (0..2)
            .map(|i| Placement {
                left: 1.5 + i as f32 * 7.0,
                top: 2.0,
                width: 5.0,
                height: 4.0,
            })
            .collect(),
        n => (0..n)
            .map(|i| Placement {
                left: 1.5 + (i % 2) as f32 * 7.0,
                top: 1.5 + (i / 2) as f32 * 3.5,
                width: 5.0,
                height: 3.0,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_fall_back_to_academic() {
        assert_eq!(Template::from_name("corporate"), Template::Corporate);
        assert_eq!(Template::from_name(" Minimalist "), Template::Minimalist);
        assert_eq!(Template::from_name("neon"), Template::Academic);
        assert!("neon".parse::<Template>().is_err());
    }

    #[test]
    fn styles_match_table() {
        let s = Template::Academic.style();
        assert_eq!(s.title_font, "Arial");
        assert_eq!(s.colors.title_background.hex(), "#234b78");
        assert_eq!(Template::Minimalist.style().body_font_size, 28);
        assert_eq!(Template::Corporate.style().colors.accent2, Rgb(255, 192, 0));
        for t in Template::ALL {
            assert!((t.style().slide_width_in / t.style().slide_height_in - 16.0 / 9.0).abs() < 0.01);
        }
    }

    #[test]
    fn figure_grid_shapes() {
        assert!(figure_placements(0).is_empty());
        assert_eq!(figure_placements(1)[0].width, 7.0);
        let two = figure_placements(2);
        assert_eq!(two[1].left, 8.5);
        let many = figure_placements(9);
        assert_eq!(many.len(), MAX_FIGURES);
        assert_eq!(many[3].top, 5.0);
        assert_eq!(many[3].left, 8.5);
    }

    #[test]
    fn template_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&Template::Corporate).unwrap(), "\"corporate\"");
    }
}
