//! # edgequake-paper2slides
//!
//! Turn academic papers (PDF) into slide decks with an LLM.
//!
//! ## Why this crate?
//!
//! Asking a model to "make slides from this PDF" fails in two predictable
//! places: the paper text is too long and too unstructured to send as-is,
//! and the model's answer is only *mostly* JSON. This crate handles both
//! sides deterministically. It finds the paper's sections and maps them to
//! canonical roles (abstract, methods, results, ...) before anything is sent,
//! and it repairs whatever comes back (fenced, wrapped, truncated or plain
//! prose) into a well-formed deck that always opens with a title slide.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Extract   page text, figures, metadata via pdfium (spawn_blocking)
//!  ├─ 3. Segment   heading detection → sections
//!  ├─ 4. Classify  sections → canonical roles (keyword rules, text fallback)
//!  ├─ 5. Assemble  bounded prompt → one LLM call
//!  ├─ 6. Repair    raw text → slides, flagged when a fallback was used
//!  └─ 7. Render    Marp Markdown or JSON, styled by template
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_paper2slides::{convert, SlidesConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = SlidesConfig::builder().max_slides(8).build()?;
//!     let output = convert("paper.pdf", &config).await?;
//!     for slide in &output.deck.slides {
//!         println!("{}", slide.title);
//!     }
//!     if output.deck.is_degraded() {
//!         eprintln!("model output needed repair: {:?}", output.deck.repair);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Store-backed use
//!
//! ```rust,no_run
//! use edgequake_paper2slides::{generate_slides, process_paper, resolve_provider};
//! use edgequake_paper2slides::{SlideRequest, SlidesConfig, Store, Template};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::open("data").await?;
//! let config = SlidesConfig::default();
//! let paper = process_paper(&store, "paper.pdf", &config).await?;
//!
//! let generator = config.generator(resolve_provider(&config).await?);
//! let mut request = SlideRequest::new(&paper.paper_id);
//! request.template = Template::Corporate;
//! let slides = generate_slides(&store, &generator, &request, &config).await?;
//! println!("{}", store.slides_output_path(&slides.slide_id).await?.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper2slides` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-paper2slides = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod render;
pub mod store;
pub mod template;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OutputFormat, SlidesConfig, SlidesConfigBuilder};
pub use convert::{
    convert, convert_sync, convert_to_file, convert_with, generate_slides, inspect, key_points,
    process_paper, resolve_provider, sections, summary,
};
pub use error::{ExtractionError, GenerationError, Paper2SlidesError};
pub use model::{CanonicalSections, KeyPoint, Role, Section, SlideLayout, SlideRecord};
pub use output::{
    DeckOutput, DeckStats, ImageRef, KeyPointsOutput, PaperContent, PaperMetadata, SlidesOutput,
};
pub use pipeline::llm::{GenerationRequest, LlmGenerator, TextGenerator};
pub use pipeline::repair::{repair_key_points, repair_slide_content, RepairOutcome, Repaired};
pub use progress::{NoopProgressCallback, ProgressCallback, SlidesProgressCallback, Stage};
pub use render::{DeckRenderer, JsonRenderer, MarkdownRenderer};
pub use store::{PaperInfo, PaperStatus, SlideInfo, SlideRequest, SlideStatus, Store};
pub use template::Template;
