//! Flat per-item store for papers and generated decks.
//!
//! ```text
//! {root}/
//!  ├─ papers/{paper_id}/
//!  │   ├─ paper.pdf
//!  │   ├─ info.json        PaperInfo (status, metadata, error)
//!  │   ├─ content.json     PaperContent (text, sections, canonical roles)
//!  │   └─ images/          page{N}_img{M}.png
//!  └─ slides/{slide_id}/
//!      ├─ request.json     SlideRequest
//!      ├─ info.json        SlideInfo (status, timestamps, error)
//!      ├─ deck.json        DeckOutput
//!      └─ slides.{md,json} rendered output
//! ```
//!
//! ## Why files instead of a database?
//!
//! Every record is owned by exactly one item and is only ever read or
//! replaced whole. A directory per item keeps the PDF, its images and its
//! records together, so deleting an item is one `remove_dir_all`.
//!
//! Every write goes to a `.tmp` sibling first and is renamed into place, so
//! a crash mid-write never leaves a half-written record behind.

use crate::config::OutputFormat;
use crate::error::Paper2SlidesError;
use crate::output::{DeckOutput, PaperContent, PaperMetadata};
use crate::pipeline::extract::ExtractedImage;
use crate::pipeline::repair::RepairOutcome;
use crate::template::Template;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const PAPERS_DIR: &str = "papers";
const SLIDES_DIR: &str = "slides";
const INFO_FILE: &str = "info.json";
const CONTENT_FILE: &str = "content.json";
const REQUEST_FILE: &str = "request.json";
const DECK_FILE: &str = "deck.json";
const PDF_FILE: &str = "paper.pdf";
const IMAGES_DIR: &str = "images";

// ── Records ──────────────────────────────────────────────────────────────

/// Lifecycle of an ingested paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperStatus {
    Processing,
    Processed,
    Error,
}

impl PaperStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperStatus::Processing => "processing",
            PaperStatus::Processed => "processed",
            PaperStatus::Error => "error",
        }
    }
}

impl fmt::Display for PaperStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a slide generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideStatus {
    Generating,
    Completed,
    Error,
}

impl SlideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlideStatus::Generating => "generating",
            SlideStatus::Completed => "completed",
            SlideStatus::Error => "error",
        }
    }
}

impl fmt::Display for SlideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `papers/{id}/info.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperInfo {
    pub paper_id: String,
    /// Original file name of the upload.
    pub filename: String,
    pub upload_time: DateTime<Utc>,
    pub status: PaperStatus,
    /// Filled in once the paper is processed.
    #[serde(default)]
    pub metadata: Option<PaperMetadata>,
    #[serde(default)]
    pub section_count: usize,
    #[serde(default)]
    pub image_count: usize,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// `slides/{id}/request.json`: what the caller asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideRequest {
    pub paper_id: String,
    #[serde(default)]
    pub template: Template,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default = "default_true")]
    pub include_images: bool,
    /// Overrides the config's slide count when set.
    #[serde(default)]
    pub max_slides: Option<usize>,
    /// Free-form options recorded alongside the request.
    #[serde(default)]
    pub custom_options: serde_json::Map<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

impl SlideRequest {
    pub fn new(paper_id: impl Into<String>) -> Self {
        Self {
            paper_id: paper_id.into(),
            template: Template::default(),
            output_format: OutputFormat::default(),
            include_images: true,
            max_slides: None,
            custom_options: serde_json::Map::new(),
        }
    }
}

/// `slides/{id}/info.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideInfo {
    pub slide_id: String,
    pub paper_id: String,
    pub request_time: DateTime<Utc>,
    pub status: SlideStatus,
    pub template: Template,
    pub output_format: OutputFormat,
    #[serde(default)]
    pub completion_time: Option<DateTime<Utc>>,
    /// Rendered file name inside the slides directory.
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default)]
    pub slide_count: usize,
    #[serde(default)]
    pub repair: Option<RepairOutcome>,
    #[serde(default)]
    pub error_message: Option<String>,
}

// ── Store ────────────────────────────────────────────────────────────────

/// A store rooted at one directory.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Open (creating if needed) a store at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, Paper2SlidesError> {
        let store = Self { root: root.into() };
        for dir in [store.root.join(PAPERS_DIR), store.root.join(SLIDES_DIR)] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| io_error(&dir, e))?;
        }
        debug!("Store opened at {}", store.root.display());
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paper_dir(&self, paper_id: &str) -> PathBuf {
        self.root.join(PAPERS_DIR).join(paper_id)
    }

    pub fn slides_dir(&self, slide_id: &str) -> PathBuf {
        self.root.join(SLIDES_DIR).join(slide_id)
    }

    pub fn paper_pdf_path(&self, paper_id: &str) -> PathBuf {
        self.paper_dir(paper_id).join(PDF_FILE)
    }

    pub fn images_dir(&self, paper_id: &str) -> PathBuf {
        self.paper_dir(paper_id).join(IMAGES_DIR)
    }

    // ── Papers ───────────────────────────────────────────────────────────

    /// Register a new paper: copy the PDF in and record it as processing.
    pub async fn create_paper(
        &self,
        filename: &str,
        pdf_source: &Path,
    ) -> Result<PaperInfo, Paper2SlidesError> {
        let paper_id = new_id();
        let dir = self.paper_dir(&paper_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;

        let pdf_path = dir.join(PDF_FILE);
        let bytes = tokio::fs::read(pdf_source)
            .await
            .map_err(|e| io_error(pdf_source, e))?;
        write_atomic(&pdf_path, &bytes).await?;

        let info = PaperInfo {
            paper_id: paper_id.clone(),
            filename: filename.to_string(),
            upload_time: Utc::now(),
            status: PaperStatus::Processing,
            metadata: None,
            section_count: 0,
            image_count: 0,
            error_message: None,
        };
        write_json(&dir.join(INFO_FILE), &info).await?;
        info!("Paper {} registered ({})", paper_id, filename);
        Ok(info)
    }

    pub async fn paper_info(&self, paper_id: &str) -> Result<PaperInfo, Paper2SlidesError> {
        let dir = self.existing_paper_dir(paper_id).await?;
        read_json(&dir.join(INFO_FILE)).await
    }

    /// Persist extraction results and mark the paper processed.
    pub async fn save_paper_content(
        &self,
        content: &PaperContent,
        metadata: &PaperMetadata,
        images: &[ExtractedImage],
    ) -> Result<PaperInfo, Paper2SlidesError> {
        let mut info = self.paper_info(&content.paper_id).await?;
        let dir = self.paper_dir(&content.paper_id);

        if !images.is_empty() {
            let images_dir = dir.join(IMAGES_DIR);
            tokio::fs::create_dir_all(&images_dir)
                .await
                .map_err(|e| io_error(&images_dir, e))?;
            for img in images {
                write_atomic(&images_dir.join(&img.image.file_name), &img.png).await?;
            }
        }
        write_json(&dir.join(CONTENT_FILE), content).await?;

        info.status = PaperStatus::Processed;
        info.metadata = Some(metadata.clone());
        info.section_count = content.sections.len();
        info.image_count = content.images.len();
        info.error_message = None;
        write_json(&dir.join(INFO_FILE), &info).await?;
        info!(
            "Paper {} processed: {} sections, {} images",
            info.paper_id, info.section_count, info.image_count
        );
        Ok(info)
    }

    pub async fn mark_paper_failed(
        &self,
        paper_id: &str,
        message: &str,
    ) -> Result<PaperInfo, Paper2SlidesError> {
        let mut info = self.paper_info(paper_id).await?;
        info.status = PaperStatus::Error;
        info.error_message = Some(message.to_string());
        write_json(&self.paper_dir(paper_id).join(INFO_FILE), &info).await?;
        warn!("Paper {} failed: {}", paper_id, message);
        Ok(info)
    }

    /// Extracted content; `NotReady` until the paper is processed.
    pub async fn paper_content(&self, paper_id: &str) -> Result<PaperContent, Paper2SlidesError> {
        let info = self.paper_info(paper_id).await?;
        if info.status != PaperStatus::Processed {
            return Err(Paper2SlidesError::NotReady {
                what: "Paper content",
                id: paper_id.to_string(),
                status: info.status.to_string(),
            });
        }
        read_json(&self.paper_dir(paper_id).join(CONTENT_FILE)).await
    }

    /// All papers, newest first. Unreadable entries are skipped.
    pub async fn list_papers(&self) -> Result<Vec<PaperInfo>, Paper2SlidesError> {
        let mut papers: Vec<PaperInfo> = self.list_records(PAPERS_DIR).await?;
        papers.sort_by(|a, b| b.upload_time.cmp(&a.upload_time));
        Ok(papers)
    }

    /// Delete a paper and every slide generation made from it.
    pub async fn delete_paper(&self, paper_id: &str) -> Result<(), Paper2SlidesError> {
        let dir = self.existing_paper_dir(paper_id).await?;
        for slides in self.list_slides(Some(paper_id)).await? {
            self.delete_slides(&slides.slide_id).await?;
        }
        tokio::fs::remove_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;
        info!("Paper {} deleted", paper_id);
        Ok(())
    }

    // ── Slides ───────────────────────────────────────────────────────────

    /// Record a new generation request. The paper must be processed.
    pub async fn create_slides(&self, request: &SlideRequest) -> Result<SlideInfo, Paper2SlidesError> {
        let paper = self.paper_info(&request.paper_id).await?;
        if paper.status != PaperStatus::Processed {
            return Err(Paper2SlidesError::NotReady {
                what: "Paper",
                id: request.paper_id.clone(),
                status: paper.status.to_string(),
            });
        }

        let slide_id = new_id();
        let dir = self.slides_dir(&slide_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;
        write_json(&dir.join(REQUEST_FILE), request).await?;

        let info = SlideInfo {
            slide_id: slide_id.clone(),
            paper_id: request.paper_id.clone(),
            request_time: Utc::now(),
            status: SlideStatus::Generating,
            template: request.template,
            output_format: request.output_format,
            completion_time: None,
            output_file: None,
            slide_count: 0,
            repair: None,
            error_message: None,
        };
        write_json(&dir.join(INFO_FILE), &info).await?;
        info!("Slides {} requested for paper {}", slide_id, request.paper_id);
        Ok(info)
    }

    pub async fn slide_info(&self, slide_id: &str) -> Result<SlideInfo, Paper2SlidesError> {
        let dir = self.existing_slides_dir(slide_id).await?;
        read_json(&dir.join(INFO_FILE)).await
    }

    pub async fn slide_request(&self, slide_id: &str) -> Result<SlideRequest, Paper2SlidesError> {
        let dir = self.existing_slides_dir(slide_id).await?;
        read_json(&dir.join(REQUEST_FILE)).await
    }

    /// Store the deck and its rendering, and mark the generation completed.
    pub async fn complete_slides(
        &self,
        slide_id: &str,
        deck: &DeckOutput,
        rendered: &str,
    ) -> Result<SlideInfo, Paper2SlidesError> {
        let mut info = self.slide_info(slide_id).await?;
        let dir = self.slides_dir(slide_id);
        let output_file = format!("slides.{}", info.output_format.extension());

        write_json(&dir.join(DECK_FILE), deck).await?;
        write_atomic(&dir.join(&output_file), rendered.as_bytes()).await?;

        info.status = SlideStatus::Completed;
        info.completion_time = Some(Utc::now());
        info.output_file = Some(output_file);
        info.slide_count = deck.slides.len();
        info.repair = Some(deck.repair);
        info.error_message = None;
        write_json(&dir.join(INFO_FILE), &info).await?;
        info!("Slides {} completed: {} slides", slide_id, info.slide_count);
        Ok(info)
    }

    pub async fn mark_slides_failed(
        &self,
        slide_id: &str,
        message: &str,
    ) -> Result<SlideInfo, Paper2SlidesError> {
        let mut info = self.slide_info(slide_id).await?;
        info.status = SlideStatus::Error;
        info.completion_time = Some(Utc::now());
        info.error_message = Some(message.to_string());
        write_json(&self.slides_dir(slide_id).join(INFO_FILE), &info).await?;
        warn!("Slides {} failed: {}", slide_id, message);
        Ok(info)
    }

    /// The generated deck; `NotReady` until completed.
    pub async fn slides_deck(&self, slide_id: &str) -> Result<DeckOutput, Paper2SlidesError> {
        let info = self.completed_slides(slide_id).await?;
        read_json(&self.slides_dir(&info.slide_id).join(DECK_FILE)).await
    }

    /// Path of the rendered output; `NotReady` until completed.
    pub async fn slides_output_path(&self, slide_id: &str) -> Result<PathBuf, Paper2SlidesError> {
        let info = self.completed_slides(slide_id).await?;
        let file = info.output_file.ok_or_else(|| {
            Paper2SlidesError::Internal(format!("completed slides '{slide_id}' have no output file"))
        })?;
        Ok(self.slides_dir(slide_id).join(file))
    }

    /// Slide generations, newest first, optionally for one paper only.
    pub async fn list_slides(
        &self,
        paper_id: Option<&str>,
    ) -> Result<Vec<SlideInfo>, Paper2SlidesError> {
        let mut slides: Vec<SlideInfo> = self.list_records(SLIDES_DIR).await?;
        if let Some(pid) = paper_id {
            slides.retain(|s| s.paper_id == pid);
        }
        slides.sort_by(|a, b| b.request_time.cmp(&a.request_time));
        Ok(slides)
    }

    pub async fn delete_slides(&self, slide_id: &str) -> Result<(), Paper2SlidesError> {
        let dir = self.existing_slides_dir(slide_id).await?;
        tokio::fs::remove_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;
        info!("Slides {} deleted", slide_id);
        Ok(())
    }

    /// Relative path from a slides directory to a paper's images, for
    /// links inside rendered output.
    pub fn images_link_base(&self, paper_id: &str) -> String {
        format!("../../{PAPERS_DIR}/{paper_id}/{IMAGES_DIR}")
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    async fn completed_slides(&self, slide_id: &str) -> Result<SlideInfo, Paper2SlidesError> {
        let info = self.slide_info(slide_id).await?;
        if info.status != SlideStatus::Completed {
            return Err(Paper2SlidesError::NotReady {
                what: "Slides",
                id: slide_id.to_string(),
                status: info.status.to_string(),
            });
        }
        Ok(info)
    }

    async fn existing_paper_dir(&self, paper_id: &str) -> Result<PathBuf, Paper2SlidesError> {
        let dir = self.paper_dir(paper_id);
        if !is_valid_id(paper_id) || !is_dir(&dir).await {
            return Err(Paper2SlidesError::PaperNotFound {
                id: paper_id.to_string(),
            });
        }
        Ok(dir)
    }

    async fn existing_slides_dir(&self, slide_id: &str) -> Result<PathBuf, Paper2SlidesError> {
        let dir = self.slides_dir(slide_id);
        if !is_valid_id(slide_id) || !is_dir(&dir).await {
            return Err(Paper2SlidesError::SlidesNotFound {
                id: slide_id.to_string(),
            });
        }
        Ok(dir)
    }

    async fn list_records<T: DeserializeOwned>(
        &self,
        kind: &str,
    ) -> Result<Vec<T>, Paper2SlidesError> {
        let base = self.root.join(kind);
        let mut entries = match tokio::fs::read_dir(&base).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&base, e)),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&base, e))? {
            let info_path = entry.path().join(INFO_FILE);
            match read_json::<T>(&info_path).await {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable store entry: {}", e),
            }
        }
        Ok(records)
    }
}

// ── File helpers ─────────────────────────────────────────────────────────

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Ids name directories; anything that could escape the store is rejected.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

fn io_error(path: &Path, source: std::io::Error) -> Paper2SlidesError {
    Paper2SlidesError::StoreIo {
        path: path.to_path_buf(),
        source,
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write to a temp sibling, then rename into place.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Paper2SlidesError> {
    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| io_error(path, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| io_error(path, e))
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Paper2SlidesError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| Paper2SlidesError::StoreFormat {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    write_atomic(path, &bytes).await
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Paper2SlidesError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| io_error(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| Paper2SlidesError::StoreFormat {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}
