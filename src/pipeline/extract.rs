//! PDF extraction: page text, embedded images and metadata via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a thread designed for
//! blocking operations, so Tokio worker threads never stall on a large PDF.
//!
//! ## Failure split
//!
//! Problems opening the document (corrupt file, password) are
//! [`Paper2SlidesError`] input errors. Once the document is open, a page whose
//! text layer cannot be read is an [`ExtractionError`]: the paper exists but
//! its text cannot be obtained. A single image that fails to decode is only
//! logged; figures are optional.

use crate::error::{ExtractionError, Paper2SlidesError};
use crate::model::UNKNOWN_TITLE;
use crate::output::{ImageRef, PaperMetadata, UNKNOWN_AUTHOR};
use crate::pipeline::segment::join_pages;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

/// Images smaller than this on either side are icons or rules, not figures.
const MIN_FIGURE_EDGE_PX: u32 = 32;

/// Text of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-indexed page number.
    pub page: usize,
    pub text: String,
}

/// An embedded image, PNG-encoded.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    pub image: ImageRef,
    pub png: Vec<u8>,
}

/// Everything pulled out of one PDF.
#[derive(Debug, Clone)]
pub struct ExtractedPaper {
    pub pages: Vec<PageText>,
    pub images: Vec<ExtractedImage>,
    pub metadata: PaperMetadata,
}

impl ExtractedPaper {
    /// `(page_number, text)` pairs for the segmenter.
    pub fn page_pairs(&self) -> impl Iterator<Item = (usize, &str)> {
        self.pages.iter().map(|p| (p.page, p.text.as_str()))
    }

    /// All page texts joined with the page-break separator.
    pub fn full_text(&self) -> String {
        join_pages(self.pages.iter().map(|p| p.text.as_str()))
    }
}

/// Extract text, metadata and (optionally) images from a PDF.
pub async fn extract_paper(
    pdf_path: &Path,
    password: Option<&str>,
    include_images: bool,
) -> Result<ExtractedPaper, Paper2SlidesError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(str::to_string);

    tokio::task::spawn_blocking(move || extract_blocking(&path, pwd.as_deref(), include_images))
        .await
        .map_err(|e| Paper2SlidesError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Extract document metadata without reading page text.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<PaperMetadata, Paper2SlidesError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium()?;
        let document = open_document(&pdfium, &path, pwd.as_deref())?;
        Ok(read_metadata(&document))
    })
    .await
    .map_err(|e| Paper2SlidesError::Internal(format!("Metadata task panicked: {}", e)))?
}

/// Bind to pdfium: `PDFIUM_LIB_PATH` (file or directory), then the working
/// directory, then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, Paper2SlidesError> {
    let from_env = std::env::var("PDFIUM_LIB_PATH").ok().map(|p| {
        let path = Path::new(&p);
        if path.is_dir() {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
        } else {
            Pdfium::bind_to_library(path)
        }
    });

    let bindings = match from_env {
        Some(Ok(bindings)) => Ok(bindings),
        Some(Err(e)) => {
            warn!("PDFIUM_LIB_PATH could not be loaded: {:?}", e);
            Err(e)
        }
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")),
    }
    .or_else(|_| Pdfium::bind_to_system_library())
    .map_err(|e| Paper2SlidesError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, Paper2SlidesError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.to_lowercase().contains("password") {
            if password.is_some() {
                Paper2SlidesError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                Paper2SlidesError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            Paper2SlidesError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

fn extract_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    include_images: bool,
) -> Result<ExtractedPaper, Paper2SlidesError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;
    let source_name = pdf_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| pdf_path.display().to_string());

    let metadata = read_metadata(&document);
    info!("PDF loaded: {} pages", metadata.page_count);

    let mut pages = Vec::with_capacity(metadata.page_count);
    let mut images = Vec::new();

    for (idx, page) in document.pages().iter().enumerate() {
        let page_num = idx + 1;
        let text = page
            .text()
            .map_err(|e| ExtractionError::new(&source_name, format!("page {page_num}: {e:?}")))?
            .all();
        debug!("Page {}: {} chars of text", page_num, text.len());
        pages.push(PageText {
            page: page_num,
            text,
        });

        if include_images {
            images.extend(page_images(&page, page_num));
        }
    }

    info!(
        "Extracted {} pages and {} images",
        pages.len(),
        images.len()
    );
    Ok(ExtractedPaper {
        pages,
        images,
        metadata,
    })
}

/// Embedded raster images of one page, named `page{N}_img{M}.png`.
fn page_images(page: &PdfPage, page_num: usize) -> Vec<ExtractedImage> {
    let mut out = Vec::new();
    for object in page.objects().iter() {
        let Some(image_object) = object.as_image_object() else {
            continue;
        };
        let raw = match image_object.get_raw_image() {
            Ok(img) => img,
            Err(e) => {
                warn!("Page {}: skipping undecodable image: {:?}", page_num, e);
                continue;
            }
        };
        if raw.width() < MIN_FIGURE_EDGE_PX || raw.height() < MIN_FIGURE_EDGE_PX {
            continue;
        }
        let file_name = format!("page{}_img{}.png", page_num, out.len() + 1);
        match encode_png(&raw) {
            Ok(png) => out.push(ExtractedImage {
                image: ImageRef {
                    file_name,
                    page: page_num,
                    width: raw.width(),
                    height: raw.height(),
                },
                png,
            }),
            Err(e) => warn!("Page {}: PNG encoding failed: {}", page_num, e),
        }
    }
    out
}

/// Encode an image as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

fn read_metadata(document: &PdfDocument) -> PaperMetadata {
    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    PaperMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title)
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        author: get_meta(PdfDocumentMetadataTagType::Author)
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        keywords: get_meta(PdfDocumentMetadataTagType::Keywords),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        page_count: document.pages().len() as usize,
    }
}
