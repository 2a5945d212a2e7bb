//! Configuration types for paper-to-slides conversion.
//!
//! All conversion behaviour is controlled through [`SlidesConfig`], built via
//! its [`SlidesConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across tasks, log them, and diff two runs to
//! understand why their decks differ.
//!
//! Provider selection lives here as injected configuration (`provider`,
//! `provider_name`, `model`); the pipeline itself never reads API keys.

use crate::error::Paper2SlidesError;
use crate::pipeline::assemble::AssemblyOptions;
use crate::pipeline::llm::LlmGenerator;
use crate::progress::ProgressCallback;
use crate::prompts::SLIDE_TEXT_LIMIT;
use crate::template::Template;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Configuration for a paper-to-slides conversion.
///
/// Built via [`SlidesConfig::builder()`] or using [`SlidesConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_paper2slides::{SlidesConfig, Template};
///
/// let config = SlidesConfig::builder()
///     .max_slides(8)
///     .template(Template::Corporate)
///     .focus_area("results")
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SlidesConfig {
    /// Number of slides to ask the model for. Default: 10.
    ///
    /// The model treats this as a target, not a hard cap; the repair engine
    /// never drops slides it was given and may prepend a title slide.
    pub max_slides: usize,

    /// Topics the deck should emphasise, e.g. `["results", "limitations"]`.
    pub focus_areas: Vec<String>,

    /// Styling template for rendered output. Default: academic.
    pub template: Template,

    /// Rendered output format. Default: Marp Markdown.
    pub output_format: OutputFormat,

    /// Export embedded images and add a figures slide. Default: true.
    pub include_images: bool,

    /// LLM model identifier, e.g. "gpt-4.1-mini", "claude-sonnet-4-20250514".
    /// If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for slide generation. Default: 0.4.
    ///
    /// Slides need some rewording of the paper, so this sits above the
    /// near-zero values used for transcription but well below free writing.
    pub temperature: f32,

    /// Maximum tokens the model may generate for the deck. Default: 4000.
    ///
    /// Ten slides of JSON with notes fit comfortably; when a response is cut
    /// off anyway the repair engine salvages the complete slides.
    pub max_tokens: usize,

    /// Maximum retry attempts on a transient API failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// Per-LLM-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Paper characters embedded in the slide prompt. Default: 50 000.
    ///
    /// Longer text is cut and marked before the request is built, so request
    /// size is bounded no matter what the provider accepts.
    pub max_input_chars: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional stage callbacks.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SlidesConfig {
    fn default() -> Self {
        Self {
            max_slides: 10,
            focus_areas: Vec::new(),
            template: Template::default(),
            output_format: OutputFormat::default(),
            include_images: true,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.4,
            max_tokens: 4000,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            max_input_chars: SLIDE_TEXT_LIMIT,
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SlidesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlidesConfig")
            .field("max_slides", &self.max_slides)
            .field("focus_areas", &self.focus_areas)
            .field("template", &self.template)
            .field("output_format", &self.output_format)
            .field("include_images", &self.include_images)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("max_input_chars", &self.max_input_chars)
            .finish()
    }
}

impl SlidesConfig {
    /// Create a new builder for `SlidesConfig`.
    pub fn builder() -> SlidesConfigBuilder {
        SlidesConfigBuilder {
            config: Self::default(),
        }
    }

    /// The assembler's view of this config.
    pub fn assembly_options(&self) -> AssemblyOptions {
        AssemblyOptions {
            max_slides: self.max_slides,
            focus_areas: self.focus_areas.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            max_input_chars: self.max_input_chars,
        }
    }

    /// Wrap `provider` with this config's retry and timeout policy.
    pub fn generator(&self, provider: Arc<dyn LLMProvider>) -> LlmGenerator {
        LlmGenerator::new(provider)
            .with_retries(self.max_retries, self.retry_backoff_ms)
            .with_timeout(self.api_timeout_secs)
    }
}

/// Builder for [`SlidesConfig`].
#[derive(Debug)]
pub struct SlidesConfigBuilder {
    config: SlidesConfig,
}

impl SlidesConfigBuilder {
    pub fn max_slides(mut self, n: usize) -> Self {
        self.config.max_slides = n;
        self
    }

    pub fn focus_areas(mut self, areas: Vec<String>) -> Self {
        self.config.focus_areas = areas;
        self
    }

    pub fn focus_area(mut self, area: impl Into<String>) -> Self {
        self.config.focus_areas.push(area.into());
        self
    }

    pub fn template(mut self, template: Template) -> Self {
        self.config.template = template;
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn include_images(mut self, v: bool) -> Self {
        self.config.include_images = v;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_input_chars(mut self, n: usize) -> Self {
        self.config.max_input_chars = n;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SlidesConfig, Paper2SlidesError> {
        let c = &self.config;
        if c.max_slides == 0 {
            return Err(Paper2SlidesError::InvalidConfig(
                "max_slides must be ≥ 1".into(),
            ));
        }
        if c.max_input_chars == 0 {
            return Err(Paper2SlidesError::InvalidConfig(
                "max_input_chars must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(Paper2SlidesError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(Paper2SlidesError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Rendered deck format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Marp-flavoured Markdown with template styling in the front matter.
    #[default]
    Markdown,
    /// The deck record as pretty-printed JSON.
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Markdown => "markdown",
            OutputFormat::Json => "json",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" | "marp" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "unknown output format '{other}' (expected markdown or json)"
            )),
        }
    }
}
