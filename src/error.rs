//! Error types for the edgequake-paper2slides library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`ExtractionError`]: the paper's text could not be obtained or
//!   segmented (unreadable page text, pdfium failure mid-document).
//!
//! * [`GenerationError`]: the text-generation provider failed (network,
//!   auth, quota, timeout). No response text was received, so there is
//!   nothing to repair.
//!
//! * [`Paper2SlidesError`]: **Fatal** errors of the top-level API: bad
//!   input file, wrong password, missing store entries, plus the two errors
//!   above wrapped unchanged.
//!
//! Malformed model output is *not* an error. The repair engine absorbs it and
//! flags the result instead (see [`crate::pipeline::repair::RepairOutcome`]).

use std::path::PathBuf;
use thiserror::Error;

/// The paper's text could not be extracted or segmented.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("Failed to extract sections from '{source_name}': {detail}")]
pub struct ExtractionError {
    /// File name or identifier of the document being processed.
    pub source_name: String,
    /// The underlying failure, verbatim.
    pub detail: String,
}

impl ExtractionError {
    pub fn new(source_name: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self {
            source_name: source_name.into(),
            detail: detail.to_string(),
        }
    }
}

/// The text-generation collaborator failed to produce a response.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum GenerationError {
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The call did not complete within the configured timeout.
    #[error("LLM call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The provider returned an error on every attempt.
    #[error("LLM call failed after {retries} retries: {detail}")]
    Failed { retries: u32, detail: String },
}

/// All fatal errors returned by the edgequake-paper2slides library.
#[derive(Debug, Error)]
pub enum Paper2SlidesError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, or place the library next to the binary\n\
or in a system library directory.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// Section extraction failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The generation provider failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    // ── Store errors ──────────────────────────────────────────────────────
    /// No paper directory exists for this id.
    #[error("Paper '{id}' not found")]
    PaperNotFound { id: String },

    /// No slide-generation directory exists for this id.
    #[error("Slides '{id}' not found")]
    SlidesNotFound { id: String },

    /// The item exists but has not reached the state the caller needs.
    #[error("{what} for '{id}' is not ready yet (status: {status})")]
    NotReady {
        what: &'static str,
        id: String,
        status: String,
    },

    /// Reading or writing a store file failed.
    #[error("Store I/O failed for '{path}': {source}")]
    StoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A store record could not be (de)serialised.
    #[error("Malformed store record '{path}': {detail}")]
    StoreFormat { path: PathBuf, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output deck file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Paper2SlidesError {
    /// True for errors that a status record should report as
    /// "processing failed" rather than as a missing or invalid request.
    pub fn is_processing_failure(&self) -> bool {
        matches!(
            self,
            Paper2SlidesError::Extraction(_)
                | Paper2SlidesError::Generation(_)
                | Paper2SlidesError::CorruptPdf { .. }
                | Paper2SlidesError::PdfiumBindingFailed(_)
        )
    }
}
