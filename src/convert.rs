//! Top-level entry points.
//!
//! ## One-shot vs. store-backed
//!
//! [`convert`], [`convert_to_file`] and [`convert_sync`] take a PDF path or
//! URL and return a finished deck; nothing is persisted. [`process_paper`]
//! and [`generate_slides`] split the same work in two around a [`Store`]:
//! ingest a paper once, then generate as many decks from it as needed
//! without touching the PDF again.
//!
//! Both routes run the same stages:
//!
//! ```text
//! input ─▶ extract ─▶ segment ─▶ classify ─▶ assemble ─▶ render
//!          (pdfium)                          (LLM + repair)
//! ```
//!
//! [`ExtractionError`](crate::error::ExtractionError) and
//! [`GenerationError`] propagate unchanged; store-backed calls also record
//! them on the item's status before returning. A degraded repair is not an
//! error: the deck is returned and flagged.

use crate::config::{OutputFormat, SlidesConfig};
use crate::error::{ExtractionError, GenerationError, Paper2SlidesError};
use crate::model::Role;
use crate::output::{
    DeckOutput, DeckStats, KeyPointsOutput, PaperContent, PaperMetadata, SlidesOutput,
};
use crate::pipeline::analyze::{self, KeyPointOptions, SummaryOptions};
use crate::pipeline::assemble::{assemble_text, AssemblyOptions};
use crate::pipeline::extract::{self, ExtractedPaper};
use crate::pipeline::llm::TextGenerator;
use crate::pipeline::{classify, input, segment};
use crate::progress::{SlidesProgressCallback, Stage};
use crate::render::render_deck;
use crate::store::{self, PaperInfo, SlideInfo, SlideRequest, Store};
use crate::template::{Template, MAX_FIGURES};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Convert a paper (file path or URL) into a slide deck.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Input and PDF errors, [`ExtractionError`] when the text layer cannot be
/// read, and [`GenerationError`] when the provider fails.
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &SlidesConfig,
) -> Result<SlidesOutput, Paper2SlidesError> {
    let provider = resolve_provider(config).await?;
    convert_with(&config.generator(provider), input_str, config).await
}

/// [`convert`] with a caller-supplied text generator.
pub async fn convert_with<G: TextGenerator>(
    generator: &G,
    input_str: impl AsRef<str>,
    config: &SlidesConfig,
) -> Result<SlidesOutput, Paper2SlidesError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    let progress = Progress::new(config);
    info!("Starting conversion: {}", input_str);
    progress.conversion_start(input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let paper = read_paper(
        resolved.path(),
        store::new_id(),
        config,
        config.include_images,
        &progress,
    )
    .await?;

    let options = config.assembly_options();
    let gen_start = Instant::now();
    let mut deck = build_deck(
        generator,
        &paper.content,
        &options,
        config.template,
        config.include_images,
        &progress,
    )
    .await?;

    deck.stats = DeckStats {
        page_count: paper.extracted.metadata.page_count,
        section_count: paper.content.sections.len(),
        image_count: paper.content.images.len(),
        extract_duration_ms: paper.extract_ms,
        generation_duration_ms: gen_start.elapsed().as_millis() as u64,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Conversion complete: {} slides, {}ms total",
        deck.slides.len(),
        deck.stats.total_duration_ms
    );
    progress.conversion_complete(&deck);

    let ExtractedPaper {
        metadata, images, ..
    } = paper.extracted;
    Ok(SlidesOutput {
        deck,
        content: paper.content,
        metadata,
        images,
    })
}

/// Convert a paper and write the rendered deck to a file.
///
/// The format comes from `config.output_format`. For Markdown decks with
/// figures, the images are written to a `{stem}_images/` directory next to
/// the output and linked relative to it. Uses atomic write (temp file +
/// rename) to prevent partial files.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &SlidesConfig,
) -> Result<DeckStats, Paper2SlidesError> {
    let output = convert(input_str, config).await?;
    write_deck(&output, output_path.as_ref(), config.output_format).await?;
    Ok(output.deck.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &SlidesConfig,
) -> Result<SlidesOutput, Paper2SlidesError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Paper2SlidesError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Extract PDF metadata without reading content.
///
/// Does not require an LLM provider or API key.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<PaperMetadata, Paper2SlidesError> {
    let resolved = input::resolve_input(input_str.as_ref(), 120).await?;
    extract::extract_metadata(resolved.path(), None).await
}

/// Extract, segment and classify a paper. No LLM call is made.
pub async fn sections(
    input_str: impl AsRef<str>,
    config: &SlidesConfig,
) -> Result<PaperContent, Paper2SlidesError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let progress = Progress::new(config);
    let paper = read_paper(resolved.path(), store::new_id(), config, false, &progress).await?;
    Ok(paper.content)
}

/// Key points of an extracted paper.
pub async fn key_points<G: TextGenerator>(
    generator: &G,
    content: &PaperContent,
    options: &KeyPointOptions,
) -> Result<KeyPointsOutput, Paper2SlidesError> {
    let repaired = analyze::extract_key_points(generator, &content.text, options).await?;
    Ok(KeyPointsOutput {
        points: repaired.items,
        repair: repaired.outcome,
    })
}

/// Summary of an extracted paper.
pub async fn summary<G: TextGenerator>(
    generator: &G,
    content: &PaperContent,
    options: &SummaryOptions,
) -> Result<String, Paper2SlidesError> {
    Ok(analyze::summarize(generator, &content.text, options).await?)
}

// ── Store-backed API ─────────────────────────────────────────────────────

/// Ingest a paper into `store`: copy the PDF, extract and classify it,
/// export its images and mark it processed.
///
/// Once the paper is registered, any failure is recorded on its status
/// (`error` plus the message) before being returned.
pub async fn process_paper(
    store: &Store,
    input_str: impl AsRef<str>,
    config: &SlidesConfig,
) -> Result<PaperInfo, Paper2SlidesError> {
    let input_str = input_str.as_ref();
    let progress = Progress::new(config);
    progress.conversion_start(input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let info = store
        .create_paper(&resolved.file_name(), resolved.path())
        .await?;
    let pdf_path = store.paper_pdf_path(&info.paper_id);

    match read_paper(
        &pdf_path,
        info.paper_id.clone(),
        config,
        config.include_images,
        &progress,
    )
    .await
    {
        Ok(paper) => {
            store
                .save_paper_content(
                    &paper.content,
                    &paper.extracted.metadata,
                    &paper.extracted.images,
                )
                .await
        }
        Err(e) => {
            if e.is_processing_failure() {
                error!("Processing failed for paper {}: {}", info.paper_id, e);
            } else {
                warn!("Paper {} rejected: {}", info.paper_id, e);
            }
            store.mark_paper_failed(&info.paper_id, &e.to_string()).await?;
            Err(e)
        }
    }
}

/// Generate a deck from a processed paper in `store`.
///
/// The request's template, format and image flag apply; its `max_slides`
/// overrides the config's. A [`GenerationError`] marks the generation
/// `error` and is returned; a degraded repair completes normally.
pub async fn generate_slides<G: TextGenerator>(
    store: &Store,
    generator: &G,
    request: &SlideRequest,
    config: &SlidesConfig,
) -> Result<SlideInfo, Paper2SlidesError> {
    let total_start = Instant::now();
    let slides = store.create_slides(request).await?;
    let progress = Progress::new(config);
    progress.conversion_start(&request.paper_id);

    let result = async {
        let paper = store.paper_info(&request.paper_id).await?;
        let content = store.paper_content(&request.paper_id).await?;
        let mut options = config.assembly_options();
        if let Some(n) = request.max_slides.filter(|n| *n > 0) {
            options.max_slides = n;
        }

        let gen_start = Instant::now();
        let mut deck = build_deck(
            generator,
            &content,
            &options,
            request.template,
            request.include_images,
            &progress,
        )
        .await?;
        deck.stats = DeckStats {
            page_count: paper.metadata.map(|m| m.page_count).unwrap_or(0),
            section_count: content.sections.len(),
            image_count: content.images.len(),
            extract_duration_ms: 0,
            generation_duration_ms: gen_start.elapsed().as_millis() as u64,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        let rendered = render_deck(
            &deck,
            request.output_format,
            &store.images_link_base(&request.paper_id),
        )?;
        Ok::<_, Paper2SlidesError>((deck, rendered))
    }
    .await;

    match result {
        Ok((deck, rendered)) => {
            progress.conversion_complete(&deck);
            store.complete_slides(&slides.slide_id, &deck, &rendered).await
        }
        Err(e) => {
            error!("Slide generation {} failed: {}", slides.slide_id, e);
            store.mark_slides_failed(&slides.slide_id, &e.to_string()).await?;
            Err(e)
        }
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`), built through
///    [`ProviderFactory::create_llm_provider`], which reads the matching API
///    key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    honoured even when several API keys are present.
/// 4. **OpenAI key** (`OPENAI_API_KEY`) with `config.model` or the default.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub async fn resolve_provider(
    config: &SlidesConfig,
) -> Result<Arc<dyn LLMProvider>, Paper2SlidesError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) = ProviderFactory::from_env().map_err(|e| {
        GenerationError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        }
    })?;

    Ok(llm_provider)
}

fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Paper2SlidesError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        GenerationError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
        .into()
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Stage events, forwarded to the configured callback if there is one.
struct Progress<'a> {
    cb: Option<&'a dyn SlidesProgressCallback>,
}

impl<'a> Progress<'a> {
    fn new(config: &'a SlidesConfig) -> Self {
        Self {
            cb: config.progress_callback.as_deref(),
        }
    }

    fn conversion_start(&self, source: &str) {
        if let Some(cb) = self.cb {
            cb.on_conversion_start(source);
        }
    }

    fn start(&self, stage: Stage) {
        debug!("Stage {} started", stage);
        if let Some(cb) = self.cb {
            cb.on_stage_start(stage);
        }
    }

    fn complete(&self, stage: Stage, items: usize) {
        debug!("Stage {} complete: {} items", stage, items);
        if let Some(cb) = self.cb {
            cb.on_stage_complete(stage, items);
        }
    }

    fn error(&self, stage: Stage, error: &dyn std::fmt::Display) {
        if let Some(cb) = self.cb {
            cb.on_stage_error(stage, &error.to_string());
        }
    }

    fn conversion_complete(&self, deck: &DeckOutput) {
        if let Some(cb) = self.cb {
            cb.on_conversion_complete(deck.slides.len(), deck.is_degraded());
        }
    }
}

/// A paper run through extraction, segmentation and classification.
struct ReadPaper {
    content: PaperContent,
    extracted: ExtractedPaper,
    extract_ms: u64,
}

async fn read_paper(
    pdf_path: &Path,
    paper_id: String,
    config: &SlidesConfig,
    include_images: bool,
    progress: &Progress<'_>,
) -> Result<ReadPaper, Paper2SlidesError> {
    progress.start(Stage::Extract);
    let start = Instant::now();
    let extracted = extract::extract_paper(pdf_path, config.password.as_deref(), include_images)
        .await
        .inspect_err(|e| progress.error(Stage::Extract, e))?;
    let full_text = extracted.full_text();
    if full_text.trim().is_empty() {
        let e = ExtractionError::new(
            pdf_path.display().to_string(),
            "no text layer found (scanned or image-only PDF?)",
        );
        progress.error(Stage::Extract, &e);
        return Err(e.into());
    }
    let extract_ms = start.elapsed().as_millis() as u64;
    progress.complete(Stage::Extract, extracted.pages.len());

    progress.start(Stage::Segment);
    let sections = segment::segment(extracted.page_pairs());
    progress.complete(Stage::Segment, sections.len());

    progress.start(Stage::Classify);
    let canonical = classify::classify(&sections, &full_text);
    let populated = Role::ALL
        .iter()
        .filter(|r| !canonical.get(**r).is_empty())
        .count();
    progress.complete(Stage::Classify, populated);

    let content = PaperContent {
        paper_id,
        text: full_text,
        sections,
        canonical,
        images: extracted.images.iter().map(|i| i.image.clone()).collect(),
    };
    Ok(ReadPaper {
        content,
        extracted,
        extract_ms,
    })
}

async fn build_deck<G: TextGenerator>(
    generator: &G,
    content: &PaperContent,
    options: &AssemblyOptions,
    template: Template,
    include_images: bool,
    progress: &Progress<'_>,
) -> Result<DeckOutput, GenerationError> {
    progress.start(Stage::Generate);
    let title = content.canonical.display_title();
    let repaired = assemble_text(generator, title, &content.slide_source_text(), options)
        .await
        .inspect_err(|e| progress.error(Stage::Generate, e))?;
    progress.complete(Stage::Generate, repaired.items.len());

    let figures = if include_images {
        content.images.iter().take(MAX_FIGURES).cloned().collect()
    } else {
        Vec::new()
    };
    Ok(DeckOutput {
        title: title.to_string(),
        template,
        slides: repaired.items,
        repair: repaired.outcome,
        figures,
        stats: DeckStats::default(),
    })
}

/// Render `output` and write it to `path`, exporting figure images beside it.
async fn write_deck(
    output: &SlidesOutput,
    path: &Path,
    format: OutputFormat,
) -> Result<(), Paper2SlidesError> {
    let mut image_base = String::new();
    if format == OutputFormat::Markdown && !output.deck.figures.is_empty() {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "slides".to_string());
        let dir_name = format!("{stem}_images");
        let dir = path.with_file_name(&dir_name);
        for img in output
            .images
            .iter()
            .filter(|i| output.deck.figures.contains(&i.image))
        {
            write_output(&dir.join(&img.image.file_name), &img.png).await?;
        }
        image_base = dir_name;
    }

    let rendered = render_deck(&output.deck, format, &image_base)?;
    write_output(path, rendered.as_bytes()).await
}

/// Atomic write: write to temp, then rename.
async fn write_output(path: &Path, bytes: &[u8]) -> Result<(), Paper2SlidesError> {
    let write_err = |e: std::io::Error| Paper2SlidesError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let ext = path
        .extension()
        .map(|e| format!("{}.tmp", e.to_string_lossy()))
        .unwrap_or_else(|| "tmp".to_string());
    let tmp_path = path.with_extension(ext);
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)
}
