//! End-to-end integration tests for edgequake-paper2slides.
//!
//! Two groups:
//!
//! * **Always on**: the store-backed pipeline driven by a scripted
//!   [`TextGenerator`]. No pdfium, no network; paper text is fed straight
//!   into the segmenter and classifier.
//! * **Live**: real PDFs in `./test_cases/` and live LLM calls. Gated behind
//!   the `E2E_ENABLED` environment variable so they do not run in CI unless
//!   explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=. cargo test --test e2e -- --nocapture

use edgequake_paper2slides::pipeline::classify::classify;
use edgequake_paper2slides::pipeline::segment::{join_pages, segment};
use edgequake_paper2slides::prompts::TRUNCATION_MARKER;
use edgequake_paper2slides::{
    convert, convert_to_file, generate_slides, inspect, key_points, process_paper, sections,
    GenerationError, GenerationRequest, KeyPointsOutput, OutputFormat, PaperContent,
    Paper2SlidesError, RepairOutcome, SlideLayout, SlideRequest, SlideStatus, SlidesConfig,
    SlidesProgressCallback, Stage, Store, Template, TextGenerator,
};
use edgequake_paper2slides::pipeline::analyze::KeyPointOptions;
use edgequake_paper2slides::output::PaperMetadata;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Replies with a fixed result and records every request.
struct Scripted {
    reply: Result<String, GenerationError>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl Scripted {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing(e: GenerationError) -> Self {
        Self {
            reply: Err(e),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn last_prompt(&self) -> String {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|r| r.prompt.clone())
            .unwrap_or_default()
    }
}

impl TextGenerator for Scripted {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply.clone()
    }
}

const PAGE_ONE: &str = "Sparse Routing for Long Documents
Ada Byron, Alan Turing
Abstract
We route each token to a small set of experts and show this scales to
book-length inputs without loss of accuracy.
1. Introduction
Long documents strain dense attention because cost grows quadratically.
2. Method
A learned router picks two experts per token; experts share no weights.
2.1 Load Balancing
An auxiliary loss keeps expert usage even.";

const PAGE_TWO: &str = "3. Results
Accuracy improves by 4.1 points on the long-range benchmark.
4. Conclusion
Sparse routing makes long inputs tractable.
References
[1] Vaswani et al. Attention is all you need. 2017.";

const DECK_REPLY: &str = r#"Here are your slides:
```json
[
  {"title": "Sparse Routing for Long Documents", "content": ["Ada Byron, Alan Turing"], "layout": "title"},
  {"title": "Problem", "content": ["Dense attention is quadratic"], "notes": "Motivate with a book"},
  {"title": "Method", "content": ["Router picks two experts", "Auxiliary balancing loss"]},
  {"title": "Results", "content": ["+4.1 points on long-range benchmark"], "layout": "title"}
]
```"#;

fn metadata(pages: usize) -> PaperMetadata {
    PaperMetadata {
        title: "Sparse Routing for Long Documents".into(),
        author: "Ada Byron".into(),
        subject: None,
        keywords: None,
        creator: None,
        producer: None,
        creation_date: None,
        page_count: pages,
    }
}

/// A store holding one processed paper built from [`PAGE_ONE`] and [`PAGE_TWO`].
async fn processed_store() -> (tempfile::TempDir, Store, String) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path()).await.unwrap();

    let mut pdf = tempfile::NamedTempFile::new().unwrap();
    pdf.write_all(b"%PDF-1.7\n%%EOF\n").unwrap();
    let info = store.create_paper("sparse.pdf", pdf.path()).await.unwrap();

    let pages = [(1, PAGE_ONE), (2, PAGE_TWO)];
    let text = join_pages(pages.iter().map(|(_, t)| *t));
    let sections = segment(pages);
    let canonical = classify(&sections, &text);
    let content = PaperContent {
        paper_id: info.paper_id.clone(),
        text,
        sections,
        canonical,
        images: Vec::new(),
    };
    store
        .save_paper_content(&content, &metadata(2), &[])
        .await
        .unwrap();
    (dir, store, info.paper_id)
}

// ── Segment + classify over a realistic paper (no LLM) ───────────────────────

#[test]
fn test_segment_and_classify_paper_text() {
    let pages = [(1, PAGE_ONE), (2, PAGE_TWO)];
    let text = join_pages(pages.iter().map(|(_, t)| *t));
    let sections = segment(pages);

    let headings: Vec<&str> = sections.iter().map(|s| s.heading.as_str()).collect();
    assert_eq!(
        headings,
        [
            "Sparse Routing for Long Documents",
            "Abstract",
            "Introduction",
            "Method",
            "Load Balancing",
            "Results",
            "Conclusion",
            "References"
        ]
    );
    assert_eq!(sections[4].level, 2);
    assert_eq!(sections[5].start_page, Some(2));

    let canonical = classify(&sections, &text);
    assert_eq!(canonical.title, "Sparse Routing for Long Documents");
    assert!(canonical.r#abstract.starts_with("We route each token"));
    assert!(canonical.methodology.contains("learned router"));
    assert!(canonical.results.contains("4.1 points"));
    assert!(canonical.references.contains("Vaswani"));
    assert!(canonical.discussion.is_empty());
}

// ── Store-backed pipeline with a scripted generator ──────────────────────────

#[tokio::test]
async fn test_generate_slides_from_stored_paper() {
    let (_dir, store, paper_id) = processed_store().await;
    let generator = Scripted::replying(DECK_REPLY);
    let config = SlidesConfig::builder()
        .max_slides(6)
        .focus_area("results")
        .build()
        .unwrap();

    let mut request = SlideRequest::new(&paper_id);
    request.template = Template::Minimalist;
    let info = generate_slides(&store, &generator, &request, &config)
        .await
        .expect("generation should complete");

    assert_eq!(info.status, SlideStatus::Completed);
    assert_eq!(info.slide_count, 4);
    assert_eq!(info.repair, Some(RepairOutcome::Parsed));

    let prompt = generator.last_prompt();
    assert!(prompt.contains("6"), "slide count should reach the prompt");
    assert!(prompt.contains("results"));
    assert!(prompt.contains("learned router"));

    let deck = store.slides_deck(&info.slide_id).await.unwrap();
    let titles: Vec<_> = deck
        .slides
        .iter()
        .filter(|s| s.layout == SlideLayout::Title)
        .collect();
    assert_eq!(titles.len(), 1, "exactly one title slide");
    assert_eq!(deck.slides[0].layout, SlideLayout::Title);
    assert_eq!(deck.stats.section_count, 8);
    assert_eq!(deck.stats.page_count, 2);

    let md = std::fs::read_to_string(store.slides_output_path(&info.slide_id).await.unwrap())
        .unwrap();
    assert!(md.starts_with("---\nmarp: true\n"));
    assert!(md.contains("font-family: Calibri"));
    assert!(md.contains("- Router picks two experts"));
    assert!(md.contains("Motivate with a book"));
}

#[tokio::test]
async fn test_request_overrides_and_bounds_input() {
    let (_dir, store, paper_id) = processed_store().await;
    let generator = Scripted::replying(DECK_REPLY);
    let config = SlidesConfig::builder().max_input_chars(60).build().unwrap();

    let mut request = SlideRequest::new(&paper_id);
    request.max_slides = Some(3);
    request.output_format = OutputFormat::Json;
    let info = generate_slides(&store, &generator, &request, &config)
        .await
        .unwrap();

    let prompt = generator.last_prompt();
    assert!(prompt.contains(TRUNCATION_MARKER));
    assert!(!prompt.contains("Vaswani"), "tail of the paper must be cut");
    assert_eq!(info.output_file.as_deref(), Some("slides.json"));
    let json = std::fs::read_to_string(store.slides_output_path(&info.slide_id).await.unwrap())
        .unwrap();
    assert!(json.contains("\"repair\": \"parsed\""));
}

#[tokio::test]
async fn test_prose_reply_still_completes() {
    let (_dir, store, paper_id) = processed_store().await;
    let generator = Scripted::replying("Sorry, I cannot produce slides for this paper.");
    let config = SlidesConfig::default();

    let info = generate_slides(&store, &generator, &SlideRequest::new(&paper_id), &config)
        .await
        .expect("a degraded deck is still a result");

    assert_eq!(info.status, SlideStatus::Completed);
    let deck = store.slides_deck(&info.slide_id).await.unwrap();
    assert!(deck.is_degraded());
    assert_eq!(deck.slides.len(), 1);
    assert_eq!(deck.slides[0].title, "Sparse Routing for Long Documents");
}

#[tokio::test]
async fn test_generation_failure_is_recorded() {
    let (_dir, store, paper_id) = processed_store().await;
    let generator = Scripted::failing(GenerationError::Failed {
        retries: 3,
        detail: "HTTP 503".into(),
    });

    let err = generate_slides(
        &store,
        &generator,
        &SlideRequest::new(&paper_id),
        &SlidesConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Paper2SlidesError::Generation(_)));
    assert!(err.is_processing_failure());

    let all = store.list_slides(Some(&paper_id)).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, SlideStatus::Error);
    assert!(all[0].error_message.as_deref().unwrap().contains("HTTP 503"));
    assert!(matches!(
        store.slides_deck(&all[0].slide_id).await,
        Err(Paper2SlidesError::NotReady { .. })
    ));
}

#[tokio::test]
async fn test_unknown_paper_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path()).await.unwrap();
    let generator = Scripted::replying(DECK_REPLY);

    let err = generate_slides(
        &store,
        &generator,
        &SlideRequest::new("missing"),
        &SlidesConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Paper2SlidesError::PaperNotFound { .. }));
    assert!(generator.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_key_points_from_prose_reply() {
    let (_dir, store, paper_id) = processed_store().await;
    let content = store.paper_content(&paper_id).await.unwrap();
    let generator = Scripted::replying(
        "- Sparse routing scales to books\n  Category: contribution\n  Importance: 9\n\
         - Balancing loss keeps experts even\n  Importance: 6",
    );

    let out: KeyPointsOutput = key_points(&generator, &content, &KeyPointOptions::default())
        .await
        .unwrap();
    assert_eq!(out.repair, RepairOutcome::LineFallback);
    assert_eq!(out.points.len(), 2);
    assert_eq!(out.points[0].category, "contribution");
    assert_eq!(out.points[0].importance, 9);
    assert_eq!(out.points[1].category, "general");
}

#[tokio::test]
async fn test_process_paper_rejects_non_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path()).await.unwrap();
    let mut not_pdf = tempfile::NamedTempFile::new().unwrap();
    not_pdf.write_all(b"<html>nope</html>").unwrap();

    let err = process_paper(
        &store,
        not_pdf.path().to_str().unwrap(),
        &SlidesConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Paper2SlidesError::NotAPdf { .. }));
    assert!(store.list_papers().await.unwrap().is_empty());
}

/// `Arc<dyn SlidesProgressCallback>` can be moved into a spawned task.
#[tokio::test]
async fn test_callback_send_in_tokio_spawn() {
    struct ErrorLogger {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl SlidesProgressCallback for ErrorLogger {
        fn on_stage_error(&self, stage: Stage, error: &str) {
            self.log.lock().unwrap().push(format!("{stage}: {error}"));
        }
    }

    let log = Arc::new(Mutex::new(Vec::new()));
    let cb: Arc<dyn SlidesProgressCallback> = Arc::new(ErrorLogger {
        log: Arc::clone(&log),
    });

    tokio::spawn(async move {
        cb.on_stage_error(Stage::Generate, "timeout after 3 retries");
    })
    .await
    .expect("spawn must succeed");

    assert_eq!(*log.lock().unwrap(), ["generate: timeout after 3 retries"]);
}

// ── Live tests (E2E_ENABLED) ─────────────────────────────────────────────────

#[tokio::test]
async fn test_inspect_arxiv_paper() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));

    let meta = inspect(path.to_str().unwrap())
        .await
        .expect("inspect() should succeed");
    assert_eq!(meta.page_count, 15, "Attention paper should have 15 pages");
    println!("Metadata: {:?}", meta);
}

#[tokio::test]
async fn test_sections_arxiv_paper() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));

    let content = sections(path.to_str().unwrap(), &SlidesConfig::default())
        .await
        .expect("sections() should succeed");
    assert!(!content.sections.is_empty());
    assert!(!content.canonical.r#abstract.is_empty(), "abstract should be found");
    for s in &content.sections {
        println!("{:>2} {} (p.{:?})", s.level, s.heading, s.start_page);
    }
}

#[tokio::test]
async fn test_convert_arxiv_paper() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));
    let out_path = output_dir().join("attention.md");

    let config = SlidesConfig::builder()
        .max_slides(8)
        .max_retries(2)
        .build()
        .expect("valid config");

    let stats = convert_to_file(path.to_str().unwrap(), &out_path, &config)
        .await
        .expect("conversion should succeed");
    assert!(stats.section_count > 0);

    let md = std::fs::read_to_string(&out_path).unwrap();
    assert!(md.starts_with("---\nmarp: true\n"));
    assert!(md.to_lowercase().contains("attention"));
    println!("[attention] Saved to {}", out_path.display());
}

#[tokio::test]
async fn test_convert_json_serialisable() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));
    let config = SlidesConfig::builder()
        .max_slides(5)
        .include_images(false)
        .build()
        .unwrap();

    let output = convert(path.to_str().unwrap(), &config)
        .await
        .expect("conversion should succeed");
    let json = serde_json::to_string_pretty(&output.deck).expect("deck serialises");
    assert!(json.contains("\"slides\""));
    assert_eq!(output.deck.slides[0].layout, SlideLayout::Title);
}

#[tokio::test]
async fn test_store_round_trip_live() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path()).await.unwrap();
    let config = SlidesConfig::default();

    let paper = process_paper(&store, path.to_str().unwrap(), &config)
        .await
        .expect("paper should process");
    assert!(paper.image_count <= 200);

    let provider = edgequake_paper2slides::resolve_provider(&config)
        .await
        .expect("provider configured");
    let generator = config.generator(provider);
    let slides = generate_slides(&store, &generator, &SlideRequest::new(&paper.paper_id), &config)
        .await
        .expect("slides should generate");
    assert_eq!(slides.status, SlideStatus::Completed);
}
