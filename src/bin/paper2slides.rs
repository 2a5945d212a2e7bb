//! CLI binary for edgequake-paper2slides.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `SlidesConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_paper2slides::pipeline::analyze::{self, KeyPointOptions, SummaryOptions};
use edgequake_paper2slides::prompts::{AnalysisKind, SummaryStyle};
use edgequake_paper2slides::render::render_deck;
use edgequake_paper2slides::{
    convert, convert_to_file, generate_slides, inspect, key_points, process_paper,
    resolve_provider, sections, summary, OutputFormat, PaperContent, ProgressCallback, Role,
    SlideRequest, SlidesConfig, SlidesProgressCallback, Stage, Store, Template,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner naming the running stage, plus one
/// log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

fn stage_unit(stage: Stage) -> &'static str {
    match stage {
        Stage::Extract => "pages",
        Stage::Segment => "sections",
        Stage::Classify => "roles found",
        Stage::Generate => "slides",
    }
}

fn stage_message(stage: Stage) -> &'static str {
    match stage {
        Stage::Extract => "Reading text and figures…",
        Stage::Segment => "Detecting headings…",
        Stage::Classify => "Mapping sections to roles…",
        Stage::Generate => "Waiting for the model…",
    }
}

impl SlidesProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, source: &str) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {source}"))
        ));
    }

    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix(stage.as_str().to_string());
        self.bar.set_message(stage_message(stage));
    }

    fn on_stage_complete(&self, stage: Stage, items: usize) {
        self.bar.println(format!(
            "  {} {:<9} {}",
            green("✓"),
            stage.as_str(),
            dim(&format!("{items} {}", stage_unit(stage))),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(80) {
            Some((idx, _)) => format!("{}\u{2026}", &error[..idx]),
            None => error.to_string(),
        };
        self.bar.println(format!(
            "  {} {:<9} {}",
            red("✗"),
            stage.as_str(),
            red(&msg)
        ));
        self.bar.finish_and_clear();
    }

    fn on_conversion_complete(&self, slide_count: usize, degraded: bool) {
        self.bar.finish_and_clear();
        if degraded {
            eprintln!(
                "{} {} slides (model output needed repair)",
                cyan("⚠"),
                bold(&slide_count.to_string())
            );
        } else {
            eprintln!("{} {} slides generated", green("✔"), bold(&slide_count.to_string()));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Marp Markdown deck on stdout
  paper2slides paper.pdf

  # Deck to file; figures land in talk_images/
  paper2slides paper.pdf -o talk.md

  # Eight slides, corporate styling, emphasise results
  paper2slides --max-slides 8 --template corporate --focus results paper.pdf -o talk.md

  # From a URL, as JSON
  paper2slides https://arxiv.org/pdf/1706.03762 --format json -o attention.json

  # Inspect PDF metadata or detected sections (no API key needed)
  paper2slides --inspect-only paper.pdf
  paper2slides --sections-only paper.pdf

  # Key points, summaries and analyses
  paper2slides --key-points 7 paper.pdf
  paper2slides --summary --summary-style bullet_points paper.pdf
  paper2slides --analyze methodology paper.pdf

  # Keep the paper and deck in a local store
  paper2slides --data-dir ./data paper.pdf

TEMPLATES:
  academic     Navy title bars, Arial, blue and orange accents (default)
  minimalist   White throughout, large Calibri, grey accents
  corporate    Dark blue title bars, Calibri, blue and gold accents

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  PAPER2SLIDES_*          Any flag, e.g. PAPER2SLIDES_TEMPLATE=corporate
"#;

/// Turn academic papers into slide decks with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "paper2slides",
    version,
    about = "Turn academic papers (PDF files or URLs) into slide decks",
    long_about = "Extract an academic paper's sections, ask an LLM for a slide deck, repair \
whatever it answers into well-formed slides and render them as Marp Markdown or JSON. Supports \
OpenAI, Anthropic, Google Gemini, Ollama and any provider edgequake-llm knows.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the deck to this file instead of stdout.
    #[arg(short, long, env = "PAPER2SLIDES_OUTPUT")]
    output: Option<PathBuf>,

    /// Output format: markdown (Marp) or json. Inferred from --output when omitted.
    #[arg(long, env = "PAPER2SLIDES_FORMAT")]
    format: Option<OutputFormat>,

    /// Slide template: academic, minimalist, corporate.
    #[arg(long, env = "PAPER2SLIDES_TEMPLATE", default_value = "academic")]
    template: Template,

    /// Number of slides to ask for.
    #[arg(long, env = "PAPER2SLIDES_MAX_SLIDES", default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(1..=100))]
    max_slides: u32,

    /// Topic to emphasise; repeat or separate with commas.
    #[arg(long, env = "PAPER2SLIDES_FOCUS", value_delimiter = ',')]
    focus: Vec<String>,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Do not export figures or add a figures slide.
    #[arg(long, env = "PAPER2SLIDES_NO_IMAGES")]
    no_images: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PAPER2SLIDES_PASSWORD")]
    password: Option<String>,

    /// Max LLM output tokens.
    #[arg(long, env = "PAPER2SLIDES_MAX_TOKENS", default_value_t = 4000)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PAPER2SLIDES_TEMPERATURE", default_value_t = 0.4)]
    temperature: f32,

    /// Retries on LLM failure.
    #[arg(long, env = "PAPER2SLIDES_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Paper characters sent to the model; longer text is truncated.
    #[arg(long, env = "PAPER2SLIDES_MAX_INPUT_CHARS", default_value_t = 50_000)]
    max_input_chars: usize,

    /// Keep the paper and generated deck in this store directory.
    #[arg(long, env = "PAPER2SLIDES_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Print detected sections and canonical roles only, no LLM call.
    #[arg(long)]
    sections_only: bool,

    /// Extract N key points instead of generating slides.
    #[arg(long, value_name = "N", num_args = 0..=1, default_missing_value = "5")]
    key_points: Option<usize>,

    /// Summarize the paper instead of generating slides.
    #[arg(long)]
    summary: bool,

    /// Summary style: academic, simple, bullet_points.
    #[arg(long, env = "PAPER2SLIDES_SUMMARY_STYLE", default_value = "academic")]
    summary_style: SummaryStyle,

    /// Approximate summary length in words.
    #[arg(long, env = "PAPER2SLIDES_SUMMARY_WORDS", default_value_t = 500)]
    summary_words: usize,

    /// Run an analysis: general, structure, methodology, results, references, custom.
    #[arg(long, value_name = "KIND")]
    analyze: Option<String>,

    /// Instruction for --analyze custom.
    #[arg(long)]
    analysis_prompt: Option<String>,

    /// Emit JSON for metadata, sections, key points and analyses.
    #[arg(long, env = "PAPER2SLIDES_JSON")]
    json: bool,

    /// Disable progress spinner.
    #[arg(long, env = "PAPER2SLIDES_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAPER2SLIDES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAPER2SLIDES_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PAPER2SLIDES_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-LLM-call timeout in seconds.
    #[arg(long, env = "PAPER2SLIDES_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,
}

impl Cli {
    /// Deck format: explicit flag, else the output extension, else Markdown.
    fn output_format(&self) -> OutputFormat {
        if let Some(format) = self.format {
            return format;
        }
        match self
            .output
            .as_deref()
            .and_then(Path::extension)
            .and_then(|e| e.to_str())
        {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Markdown,
        }
    }

    fn text_only(&self) -> bool {
        self.sections_only || self.key_points.is_some() || self.summary || self.analyze.is_some()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // spinner provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input).await.context("Failed to inspect PDF")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            println!("Title:        {}", meta.title);
            println!("Author:       {}", meta.author);
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            if let Some(ref k) = meta.keywords {
                println!("Keywords:     {}", k);
            }
            println!("Pages:        {}", meta.page_count);
            if let Some(ref d) = meta.creation_date {
                println!("Created:      {}", d);
            }
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new();
        Some(cb as Arc<dyn SlidesProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Text-only modes ──────────────────────────────────────────────────
    if cli.text_only() {
        let content = sections(&cli.input, &config)
            .await
            .context("Failed to read paper")?;
        return run_text_mode(&cli, &config, &content).await;
    }

    // ── Store-backed mode ────────────────────────────────────────────────
    if let Some(ref data_dir) = cli.data_dir {
        return run_store_mode(&cli, &config, data_dir).await;
    }

    // ── One-shot conversion ──────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let stats = convert_to_file(&cli.input, output_path, &config)
            .await
            .context("Conversion failed")?;

        if !cli.quiet {
            eprintln!(
                "{}  {} pages  {} sections  {}ms  →  {}",
                green("✔"),
                stats.page_count,
                stats.section_count,
                stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
    } else {
        let output = convert(&cli.input, &config)
            .await
            .context("Conversion failed")?;
        let rendered = render_deck(&output.deck, config.output_format, "")
            .context("Failed to render deck")?;

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
        if !rendered.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }

        if !cli.quiet && !show_progress {
            eprintln!(
                "Generated {} slides in {}ms ({:?})",
                output.deck.slides.len(),
                output.deck.stats.total_duration_ms,
                output.deck.repair
            );
        }
    }

    Ok(())
}

/// Sections, key points, summary or analysis of an extracted paper.
async fn run_text_mode(cli: &Cli, config: &SlidesConfig, content: &PaperContent) -> Result<()> {
    if cli.sections_only {
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(content).context("Failed to serialize sections")?
            );
        } else {
            print_sections(content);
        }
        return Ok(());
    }

    let provider = resolve_provider(config)
        .await
        .context("No LLM provider available")?;
    let generator = config.generator(provider);

    if let Some(n) = cli.key_points {
        let options = KeyPointOptions {
            num_points: n.max(1),
            categories: Vec::new(),
        };
        let points = key_points(&generator, content, &options)
            .await
            .context("Key point extraction failed")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&points).context("Failed to serialize key points")?
            );
        } else {
            for (i, p) in points.points.iter().enumerate() {
                println!(
                    "{}. [{} · {}/10] {}",
                    i + 1,
                    p.category,
                    p.importance,
                    p.content
                );
            }
            if points.repair.is_degraded() && !cli.quiet {
                eprintln!("{} model output needed repair ({:?})", cyan("⚠"), points.repair);
            }
        }
    } else if cli.summary {
        let options = SummaryOptions {
            max_words: cli.summary_words,
            style: cli.summary_style,
            focus_areas: cli.focus.clone(),
        };
        let text = summary(&generator, content, &options)
            .await
            .context("Summary failed")?;
        println!("{}", text.trim_end());
    } else if let Some(ref kind) = cli.analyze {
        let kind = AnalysisKind::from_name(kind, cli.analysis_prompt.as_deref());
        let analysis = analyze::analyze(&generator, &content.text, &kind)
            .await
            .context("Analysis failed")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&analysis).context("Failed to serialize analysis")?
            );
        } else {
            println!("{}", analysis.text.trim_end());
        }
    }
    Ok(())
}

/// Ingest into the store, generate one deck, and report where it went.
async fn run_store_mode(cli: &Cli, config: &SlidesConfig, data_dir: &Path) -> Result<()> {
    let store = Store::open(data_dir)
        .await
        .with_context(|| format!("Failed to open store at {}", data_dir.display()))?;
    let paper = process_paper(&store, &cli.input, config)
        .await
        .context("Failed to process paper")?;

    let provider = resolve_provider(config)
        .await
        .context("No LLM provider available")?;
    let generator = config.generator(provider);

    let mut request = SlideRequest::new(&paper.paper_id);
    request.template = config.template;
    request.output_format = config.output_format;
    request.include_images = config.include_images;
    let slides = generate_slides(&store, &generator, &request, config)
        .await
        .context("Slide generation failed")?;
    let rendered_path = store.slides_output_path(&slides.slide_id).await?;

    if let Some(ref output_path) = cli.output {
        tokio::fs::copy(&rendered_path, output_path)
            .await
            .with_context(|| format!("Failed to copy deck to {}", output_path.display()))?;
    }

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&slides).context("Failed to serialize slide info")?
        );
    } else if !cli.quiet {
        println!("paper:   {}", paper.paper_id);
        println!("slides:  {}", slides.slide_id);
        println!("output:  {}", rendered_path.display());
    }
    Ok(())
}

fn print_sections(content: &PaperContent) {
    println!("{}", bold(content.canonical.display_title()));
    println!();
    for s in &content.sections {
        let page = s
            .start_page
            .map(|p| format!("p.{p}"))
            .unwrap_or_default();
        println!(
            "{}{}  {}  {}",
            "  ".repeat(s.level.saturating_sub(1) as usize),
            s.heading,
            dim(&page),
            dim(&format!("{} chars", s.content.chars().count()))
        );
    }
    println!();
    for role in Role::ALL.iter().filter(|r| **r != Role::Title) {
        let text = content.canonical.get(*role);
        let mark = if text.is_empty() { red("✗") } else { green("✓") };
        println!(
            "{} {:<13} {}",
            mark,
            role.label(),
            dim(&format!("{} chars", text.chars().count()))
        );
    }
}

/// Map CLI args to `SlidesConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SlidesConfig> {
    // Figures only make sense when the deck lands next to an image directory.
    let include_images = !cli.no_images && (cli.output.is_some() || cli.data_dir.is_some());

    let mut builder = SlidesConfig::builder()
        .max_slides(cli.max_slides as usize)
        .focus_areas(cli.focus.clone())
        .template(cli.template)
        .output_format(cli.output_format())
        .include_images(include_images)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .max_input_chars(cli.max_input_chars)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
