//! Paper analysis calls: summaries, key points and free-form analyses.
//!
//! All three bound the paper text to [`ANALYSIS_TEXT_LIMIT`] characters and
//! propagate [`GenerationError`] unchanged. Key points go through the repair
//! engine; summaries and analyses are returned as the model wrote them.

use crate::error::GenerationError;
use crate::model::KeyPoint;
use crate::pipeline::llm::{GenerationRequest, TextGenerator};
use crate::pipeline::repair::{repair_key_points, Repaired};
use crate::prompts::{
    analysis_prompt, key_points_prompt, summary_prompt, truncate_for_prompt, AnalysisKind,
    SummaryStyle, ANALYSIS_SYSTEM_MESSAGE, ANALYSIS_TEXT_LIMIT, KEY_POINTS_SYSTEM_MESSAGE,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOptions {
    /// Approximate summary length in words.
    pub max_words: usize,
    pub style: SummaryStyle,
    pub focus_areas: Vec<String>,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            max_words: 500,
            style: SummaryStyle::Academic,
            focus_areas: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPointOptions {
    pub num_points: usize,
    pub categories: Vec<String>,
}

impl Default for KeyPointOptions {
    fn default() -> Self {
        Self {
            num_points: 5,
            categories: Vec::new(),
        }
    }
}

/// Result of [`analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub kind: AnalysisKind,
    pub text: String,
}

pub async fn summarize<G: TextGenerator>(
    generator: &G,
    paper_text: &str,
    options: &SummaryOptions,
) -> Result<String, GenerationError> {
    let bounded = truncate_for_prompt(paper_text, ANALYSIS_TEXT_LIMIT);
    let request = GenerationRequest::new(summary_prompt(
        &bounded,
        options.max_words,
        options.style,
        &options.focus_areas,
    ))
    .system(options.style.system_message())
    .temperature(0.3);

    info!("Summarizing paper ({} style)", options.style);
    generator.generate(&request).await
}

pub async fn extract_key_points<G: TextGenerator>(
    generator: &G,
    paper_text: &str,
    options: &KeyPointOptions,
) -> Result<Repaired<KeyPoint>, GenerationError> {
    let bounded = truncate_for_prompt(paper_text, ANALYSIS_TEXT_LIMIT);
    let request = GenerationRequest::new(key_points_prompt(
        &bounded,
        options.num_points,
        &options.categories,
    ))
    .system(KEY_POINTS_SYSTEM_MESSAGE)
    .temperature(0.3);

    info!("Extracting {} key points", options.num_points);
    let raw = generator.generate(&request).await?;
    Ok(repair_key_points(&raw))
}

pub async fn analyze<G: TextGenerator>(
    generator: &G,
    paper_text: &str,
    kind: &AnalysisKind,
) -> Result<Analysis, GenerationError> {
    let bounded = truncate_for_prompt(paper_text, ANALYSIS_TEXT_LIMIT);
    let request = GenerationRequest::new(analysis_prompt(&bounded, kind))
        .system(ANALYSIS_SYSTEM_MESSAGE)
        .temperature(0.4);

    info!("Running {} analysis", kind.as_str());
    let text = generator.generate(&request).await?;
    Ok(Analysis {
        kind: kind.clone(),
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::repair::RepairOutcome;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Echo {
        reply: String,
        last: Mutex<Option<GenerationRequest>>,
    }

    impl TextGenerator for Echo {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            *self.last.lock().unwrap() = Some(request.clone());
            Ok(self.reply.clone())
        }
    }

    struct Down;

    impl TextGenerator for Down {
        async fn generate(&self, _: &GenerationRequest) -> Result<String, GenerationError> {
            Err(GenerationError::Failed {
                retries: 3,
                detail: "HTTP 503".into(),
            })
        }
    }

    #[tokio::test]
    async fn summary_uses_style_system_message() {
        let g = Echo {
            reply: "A summary.".into(),
            ..Default::default()
        };
        let options = SummaryOptions {
            style: SummaryStyle::BulletPoints,
            ..Default::default()
        };
        assert_eq!(summarize(&g, "paper", &options).await.unwrap(), "A summary.");
        let req = g.last.lock().unwrap().clone().unwrap();
        assert!(req.system_message.unwrap().contains("bullet points"));
        assert_eq!(req.temperature, 0.3);
    }

    #[tokio::test]
    async fn key_points_are_repaired() {
        let g = Echo {
            reply: "* Sparse attention is 3x faster\nimportance: 9".into(),
            ..Default::default()
        };
        let points = extract_key_points(&g, "paper", &KeyPointOptions::default())
            .await
            .unwrap();
        assert_eq!(points.outcome, RepairOutcome::LineFallback);
        assert_eq!(points.items[0].importance, 9);
    }

    #[tokio::test]
    async fn analysis_text_is_bounded() {
        let g = Echo::default();
        let huge = "x".repeat(ANALYSIS_TEXT_LIMIT + 10);
        analyze(&g, &huge, &AnalysisKind::Methodology).await.unwrap();
        let req = g.last.lock().unwrap().clone().unwrap();
        assert!(req.prompt.contains(crate::prompts::TRUNCATION_MARKER));
        assert!(req.prompt.len() < ANALYSIS_TEXT_LIMIT + 1_000);
    }

    #[tokio::test]
    async fn failures_propagate() {
        let err = extract_key_points(&Down, "paper", &KeyPointOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Failed { .. }));
    }
}
