//! Pipeline stages for paper-to-slides conversion.
//!
//! Each submodule implements exactly one transformation step. The four core
//! stages (`segment`, `classify`, `repair`, `assemble`) are pure apart from
//! the single generation call in `assemble`; everything touching the outside
//! world sits at the edges.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ segment ──▶ classify ──▶ assemble ──▶ repair
//! (URL/path) (pdfium)   (headings)  (roles)      (LLM call)   (deck)
//! ```
//!
//! 1. [`input`]: canonicalise the user-supplied path or URL to a local file
//! 2. [`extract`]: page text, images and metadata; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`segment`]: split page text into heading-delimited sections
//! 4. [`classify`]: map sections onto canonical roles
//! 5. [`assemble`]: bound the text, build the slide prompt, call the
//!    [`llm::TextGenerator`]
//! 6. [`repair`]: turn whatever the model said into a well-formed deck
//!
//! [`analyze`] reuses the same generator and repair engine for summaries and
//! key points.

pub mod analyze;
pub mod assemble;
pub mod classify;
pub mod extract;
pub mod input;
pub mod llm;
pub mod repair;
pub mod segment;
