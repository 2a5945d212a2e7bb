//! Output types: what extraction and conversion hand back to callers.
//!
//! Everything here is plain data and serialises to the JSON records kept by
//! [`crate::store`].

use crate::model::{CanonicalSections, KeyPoint, Section, SlideRecord};
use crate::pipeline::extract::ExtractedImage;
use crate::pipeline::repair::RepairOutcome;
use crate::template::Template;
use serde::{Deserialize, Serialize};

/// Author used when the PDF carries none.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Document-level PDF metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperMetadata {
    /// PDF title field, or "Unknown Title".
    pub title: String,
    /// PDF author field, or "Unknown Author".
    pub author: String,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub page_count: usize,
}

/// An image exported from the paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// File name inside the paper's image directory, e.g. `page3_img1.png`.
    pub file_name: String,
    /// 1-indexed page the image appears on.
    pub page: usize,
    pub width: u32,
    pub height: u32,
}

/// Everything extracted from one paper: the persisted content record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperContent {
    pub paper_id: String,
    /// Full text, pages joined with the page-break separator.
    pub text: String,
    pub sections: Vec<Section>,
    pub canonical: CanonicalSections,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

impl PaperContent {
    /// Text to hand to the slide assembler: the canonical sections when any
    /// body role was found, else the raw text.
    pub fn slide_source_text(&self) -> String {
        if self.canonical.body_is_empty() {
            self.text.clone()
        } else {
            self.canonical.to_prompt_text()
        }
    }
}

/// Timing and size figures for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckStats {
    pub page_count: usize,
    pub section_count: usize,
    pub image_count: usize,
    pub extract_duration_ms: u64,
    pub generation_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// A generated slide deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckOutput {
    pub title: String,
    pub template: Template,
    pub slides: Vec<SlideRecord>,
    /// How the model response was turned into slides.
    pub repair: RepairOutcome,
    /// Images to show on the figures slide, in order.
    #[serde(default)]
    pub figures: Vec<ImageRef>,
    #[serde(default)]
    pub stats: DeckStats,
}

impl DeckOutput {
    /// True when the slides came from a fallback path.
    pub fn is_degraded(&self) -> bool {
        self.repair.is_degraded()
    }
}

/// Result of a one-shot conversion: the deck plus what it was built from.
#[derive(Debug, Clone)]
pub struct SlidesOutput {
    pub deck: DeckOutput,
    pub content: PaperContent,
    pub metadata: PaperMetadata,
    /// Exported images with their PNG bytes; empty when images are disabled.
    pub images: Vec<ExtractedImage>,
}

/// Result of a key-point extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPointsOutput {
    pub points: Vec<KeyPoint>,
    pub repair: RepairOutcome,
}
