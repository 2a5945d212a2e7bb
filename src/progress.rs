//! Progress-callback trait for per-stage conversion events.
//!
//! Inject an [`Arc<dyn SlidesProgressCallback>`] via
//! [`crate::config::SlidesConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves from extraction to the finished deck.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a status record or a terminal spinner without
//! the library knowing how the host application communicates.
//!
//! # Example
//!
//! ```rust
//! use edgequake_paper2slides::{SlidesConfig, SlidesProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl SlidesProgressCallback for Printer {
//!     fn on_stage_complete(&self, stage: Stage, items: usize) {
//!         eprintln!("{stage}: {items}");
//!     }
//! }
//!
//! let config = SlidesConfig::builder()
//!     .progress_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// Pipeline stages reported to callbacks, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Page text, images and metadata from the PDF.
    Extract,
    /// Heading detection.
    Segment,
    /// Role assignment.
    Classify,
    /// The LLM call and response repair.
    Generate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Segment => "segment",
            Stage::Classify => "classify",
            Stage::Generate => "generate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Called by the conversion pipeline at stage boundaries.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait SlidesProgressCallback: Send + Sync {
    /// Called once when a conversion starts.
    ///
    /// # Arguments
    /// * `source`: path or URL being converted
    fn on_conversion_start(&self, source: &str) {
        let _ = source;
    }

    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes.
    ///
    /// # Arguments
    /// * `items`: what the stage produced: pages, sections, populated roles
    ///   or slides
    fn on_stage_complete(&self, stage: Stage, items: usize) {
        let _ = (stage, items);
    }

    /// Called when a stage fails; the conversion then returns the error.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once with the finished deck size.
    ///
    /// # Arguments
    /// * `degraded`: the slides came from a repair fallback
    fn on_conversion_complete(&self, slide_count: usize, degraded: bool) {
        let _ = (slide_count, degraded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SlidesProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SlidesConfig`].
pub type ProgressCallback = Arc<dyn SlidesProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl SlidesProgressCallback for Recorder {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start {stage}"));
        }

        fn on_stage_complete(&self, stage: Stage, items: usize) {
            self.events.lock().unwrap().push(format!("done {stage} {items}"));
        }

        fn on_stage_error(&self, stage: Stage, error: &str) {
            self.events.lock().unwrap().push(format!("error {stage} {error}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start("paper.pdf");
        cb.on_stage_start(Stage::Extract);
        cb.on_stage_complete(Stage::Extract, 12);
        cb.on_stage_error(Stage::Generate, "timeout");
        cb.on_conversion_complete(10, false);
    }

    #[test]
    fn recorder_sees_events_in_order() {
        let rec = Recorder::default();
        rec.on_stage_start(Stage::Segment);
        rec.on_stage_complete(Stage::Segment, 7);
        rec.on_stage_error(Stage::Generate, "HTTP 503");
        let events = rec.events.lock().unwrap();
        assert_eq!(*events, ["start segment", "done segment 7", "error generate HTTP 503"]);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_conversion_complete(3, true);
    }
}
