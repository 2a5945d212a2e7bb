//! Paper sources: a local PDF path or an HTTP(S) URL.
//!
//! URLs are fetched into a `TempDir` that lives as long as the returned
//! [`ResolvedInput`], so extraction and the store can both read the file by
//! path. arXiv abstract pages (`/abs/<id>`) are rewritten to their PDF
//! links. Every source must start with the `%PDF` magic.

use crate::error::Paper2SlidesError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

const DEFAULT_FILENAME: &str = "paper.pdf";

static RE_ARXIV_ABS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.)?arxiv\.org/abs/([^?#]+?)/?(?:[?#].*)?$").unwrap()
});

/// Where a paper comes from, before anything is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperSource {
    Path(PathBuf),
    Url(String),
}

impl PaperSource {
    pub fn parse(input: &str) -> Result<Self, Paper2SlidesError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Paper2SlidesError::InvalidInput {
                input: input.to_string(),
            });
        }
        if is_url(input) {
            Ok(PaperSource::Url(normalize_url(input)))
        } else {
            Ok(PaperSource::Path(PathBuf::from(input)))
        }
    }
}

/// A PDF on local disk, ready for extraction.
#[derive(Debug)]
pub struct ResolvedInput {
    path: PathBuf,
    file_name: String,
    /// Keeps a downloaded file alive; `None` for local sources.
    download_dir: Option<TempDir>,
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name recorded for the paper, e.g. `1706.03762.pdf`.
    pub fn file_name(&self) -> String {
        self.file_name.clone()
    }

    pub fn is_download(&self) -> bool {
        self.download_dir.is_some()
    }
}

pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve `input` to a local PDF, downloading it when it is a URL.
pub async fn resolve_input(
    input: &str,
    timeout_secs: u64,
) -> Result<ResolvedInput, Paper2SlidesError> {
    match PaperSource::parse(input)? {
        PaperSource::Path(path) => resolve_local(path).await,
        PaperSource::Url(url) => download(&url, timeout_secs).await,
    }
}

async fn resolve_local(path: PathBuf) -> Result<ResolvedInput, Paper2SlidesError> {
    let meta = match tokio::fs::metadata(&path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Paper2SlidesError::PermissionDenied { path })
        }
        Err(_) => return Err(Paper2SlidesError::FileNotFound { path }),
    };
    if !meta.is_file() {
        return Err(Paper2SlidesError::InvalidInput {
            input: path.display().to_string(),
        });
    }

    let mut head = Vec::with_capacity(PDF_MAGIC.len());
    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            Paper2SlidesError::PermissionDenied { path: path.clone() }
        } else {
            Paper2SlidesError::FileNotFound { path: path.clone() }
        }
    })?;
    file.take(PDF_MAGIC.len() as u64)
        .read_to_end(&mut head)
        .await
        .map_err(|_| Paper2SlidesError::FileNotFound { path: path.clone() })?;
    check_magic(&path, &head)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput {
        path,
        file_name,
        download_dir: None,
    })
}

async fn download(url: &str, timeout_secs: u64) -> Result<ResolvedInput, Paper2SlidesError> {
    info!("Downloading paper from {}", url);
    let failed = |reason: String| Paper2SlidesError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            Paper2SlidesError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;
    let response = client.get(url).send().await.map_err(classify)?;
    let status = response.status();
    if !status.is_success() {
        return Err(failed(format!("HTTP {}", status)));
    }
    let bytes = response.bytes().await.map_err(classify)?;

    let file_name = filename_from_url(url);
    let dir = TempDir::new().map_err(|e| Paper2SlidesError::Internal(e.to_string()))?;
    let path = dir.path().join(&file_name);
    check_magic(&path, &bytes)?;
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| Paper2SlidesError::Internal(format!("Failed to write download: {}", e)))?;

    info!("Downloaded {} bytes to {}", bytes.len(), path.display());
    Ok(ResolvedInput {
        path,
        file_name,
        download_dir: Some(dir),
    })
}

/// Reject anything that does not begin with `%PDF`, short files included.
fn check_magic(path: &Path, head: &[u8]) -> Result<(), Paper2SlidesError> {
    if head.starts_with(PDF_MAGIC) {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = head.len().min(4);
    magic[..n].copy_from_slice(&head[..n]);
    Err(Paper2SlidesError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })
}

/// arXiv abstract pages point at their PDF.
fn normalize_url(url: &str) -> String {
    match RE_ARXIV_ABS.captures(url) {
        Some(caps) => format!("https://arxiv.org/pdf/{}", &caps[1]),
        None => url.to_string(),
    }
}

/// Last path segment, with `.pdf` appended when missing (arXiv PDF links
/// have none).
fn filename_from_url(url: &str) -> String {
    let last = reqwest::Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
    });
    match last {
        Some(name) if name.is_empty() => DEFAULT_FILENAME.to_string(),
        Some(name) if name.to_lowercase().ends_with(".pdf") => name,
        Some(name) => format!("{name}.pdf"),
        None => DEFAULT_FILENAME.to_string(),
    }
}
