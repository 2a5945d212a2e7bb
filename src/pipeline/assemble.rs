//! Slide content assembly: canonical sections → generation call → repaired deck.
//!
//! The paper text is bounded *before* the prompt is built, so the request
//! never exceeds [`AssemblyOptions::max_input_chars`] characters of paper text
//! plus the truncation marker, whatever the provider's own limits are.
//!
//! A [`GenerationError`] from the collaborator is returned as-is. Only text
//! that was actually received goes through the repair engine.

use crate::error::GenerationError;
use crate::model::{CanonicalSections, SlideRecord};
use crate::pipeline::llm::{GenerationRequest, TextGenerator};
use crate::pipeline::repair::{repair_slide_content, Repaired};
use crate::prompts::{slides_prompt, truncate_for_prompt, SLIDES_SYSTEM_MESSAGE, SLIDE_TEXT_LIMIT};
use tracing::{debug, info};

/// Knobs for one assembly call.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyOptions {
    pub max_slides: usize,
    pub focus_areas: Vec<String>,
    pub temperature: f32,
    pub max_tokens: usize,
    /// Bound on paper characters embedded in the prompt.
    pub max_input_chars: usize,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            max_slides: 10,
            focus_areas: Vec::new(),
            temperature: 0.4,
            max_tokens: 4000,
            max_input_chars: SLIDE_TEXT_LIMIT,
        }
    }
}

/// Build the generation request for `paper_text`.
pub fn build_request(paper_text: &str, options: &AssemblyOptions) -> GenerationRequest {
    let bounded = truncate_for_prompt(paper_text, options.max_input_chars);
    if bounded.len() != paper_text.len() {
        debug!(
            "Paper text truncated to {} chars for slide prompt",
            options.max_input_chars
        );
    }
    GenerationRequest::new(slides_prompt(
        &bounded,
        options.max_slides,
        &options.focus_areas,
    ))
    .system(SLIDES_SYSTEM_MESSAGE)
    .temperature(options.temperature)
    .max_tokens(options.max_tokens)
}

/// Generate a deck from classified sections.
///
/// The deck's fallback title is the paper title.
pub async fn assemble<G: TextGenerator>(
    generator: &G,
    sections: &CanonicalSections,
    options: &AssemblyOptions,
) -> Result<Repaired<SlideRecord>, GenerationError> {
    assemble_text(
        generator,
        sections.display_title(),
        &sections.to_prompt_text(),
        options,
    )
    .await
}

/// Generate a deck from arbitrary paper text.
pub async fn assemble_text<G: TextGenerator>(
    generator: &G,
    title: &str,
    paper_text: &str,
    options: &AssemblyOptions,
) -> Result<Repaired<SlideRecord>, GenerationError> {
    let request = build_request(paper_text, options);
    info!(
        "Requesting up to {} slides ({} chars of prompt)",
        options.max_slides,
        request.prompt.len()
    );
    let raw = generator.generate(&request).await?;
    let deck = repair_slide_content(&raw, title);
    info!("Assembled {} slides", deck.items.len());
    Ok(deck)
}
