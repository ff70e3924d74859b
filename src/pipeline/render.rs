//! Page rendering: stored document → preprocessed page images on disk.
//!
//! PDFs are rasterised with pdfium at the configured DPI; `.jpg`/`.jpeg`/`.png`
//! uploads are treated as a single page. Every page goes through the same
//! preprocessing (greyscale, downscale to `max_image_width`, contrast boost)
//! and is written as `page_NNN.jpg` into the job's `processed/` directory.
//!
//! Rendering is CPU-bound and pdfium is not async-safe, so async callers go
//! through [`render_document`], which moves the work onto the blocking pool.

use crate::config::AnalyzerConfig;
use crate::error::Doc2JsonError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use pdfium_render::prelude::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Turns one stored document into an ordered list of page image paths.
pub trait PageRenderer: Send + Sync {
    fn render(&self, document: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, Doc2JsonError>;
}

/// Image preprocessing knobs, copied out of [`AnalyzerConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub dpi: u32,
    pub max_width: u32,
    pub jpeg_quality: u8,
    pub contrast_factor: f32,
    pub password: Option<String>,
}

impl RenderSettings {
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            dpi: config.image_dpi,
            max_width: config.max_image_width,
            jpeg_quality: config.image_quality,
            contrast_factor: config.contrast_factor,
            password: config.password.clone(),
        }
    }
}

/// pdfium-backed renderer.
///
/// Binds the library on every call: a `Pdfium` handle never crosses threads.
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    settings: RenderSettings,
    library_path: Option<PathBuf>,
}

impl PdfiumRenderer {
    pub fn new(settings: RenderSettings, library_path: Option<PathBuf>) -> Self {
        Self {
            settings,
            library_path,
        }
    }

    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(
            RenderSettings::from_config(config),
            config.pdfium_lib_path.clone(),
        )
    }

    fn render_pdf(&self, document: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, Doc2JsonError> {
        let pdfium = bind_pdfium(self.library_path.as_deref())?;
        let pdf = pdfium
            .load_pdf_from_file(document, self.settings.password.as_deref())
            .map_err(|e| Doc2JsonError::RenderFailed {
                path: document.to_path_buf(),
                detail: format!("{e:?}"),
            })?;

        let pages = pdf.pages();
        let total = pages.len() as usize;
        if total == 0 {
            return Err(Doc2JsonError::RenderFailed {
                path: document.to_path_buf(),
                detail: "document has no pages".into(),
            });
        }
        info!(pages = total, dpi = self.settings.dpi, "PDF loaded");

        let render_config =
            PdfRenderConfig::new().scale_page_by_factor(self.settings.dpi as f32 / 72.0);
        let mut written = Vec::with_capacity(total);

        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                Doc2JsonError::RenderFailed {
                    path: document.to_path_buf(),
                    detail: format!("page {}: {e:?}", idx + 1),
                }
            })?;
            let out = output_dir.join(page_file_name(idx + 1));
            save_page(&bitmap.as_image(), &out, &self.settings)?;
            written.push(out);
        }
        Ok(written)
    }

    fn render_image(&self, document: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, Doc2JsonError> {
        render_image_file(document, output_dir, &self.settings)
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render(&self, document: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, Doc2JsonError> {
        prepare_output_dir(output_dir)?;

        let pages = match extension_of(document).as_str() {
            "pdf" => self.render_pdf(document, output_dir)?,
            "jpg" | "jpeg" | "png" => self.render_image(document, output_dir)?,
            other => {
                return Err(Doc2JsonError::UnsupportedDocument {
                    path: document.to_path_buf(),
                    extension: other.to_string(),
                })
            }
        };
        info!(document = %document.display(), pages = pages.len(), "document rendered");
        Ok(pages)
    }
}

/// Run `renderer` on the blocking pool.
pub async fn render_document(
    renderer: Arc<dyn PageRenderer>,
    document: &Path,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, Doc2JsonError> {
    let document = document.to_path_buf();
    let output_dir = output_dir.to_path_buf();
    tokio::task::spawn_blocking(move || renderer.render(&document, &output_dir))
        .await
        .map_err(|e| Doc2JsonError::Internal(format!("Render task panicked: {e}")))?
}

/// Load a single raster image and write it as page 1.
pub fn render_image_file(
    document: &Path,
    output_dir: &Path,
    settings: &RenderSettings,
) -> Result<Vec<PathBuf>, Doc2JsonError> {
    let image = image::open(document).map_err(|e| Doc2JsonError::RenderFailed {
        path: document.to_path_buf(),
        detail: e.to_string(),
    })?;
    let out = output_dir.join(page_file_name(1));
    save_page(&image, &out, settings)?;
    Ok(vec![out])
}

/// `page_001.jpg`, `page_002.jpg`, …
/// Create the page directory itself, never its parents.
///
/// The parent is the job directory; if that is gone the job was deleted and
/// rendering stops instead of bringing it back.
pub fn prepare_output_dir(output_dir: &Path) -> Result<(), Doc2JsonError> {
    match std::fs::create_dir(output_dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && output_dir.is_dir() => Ok(()),
        Err(source) => Err(Doc2JsonError::StorageFailed {
            path: output_dir.to_path_buf(),
            source,
        }),
    }
}

pub fn page_file_name(page_num: usize) -> String {
    format!("page_{page_num:03}.jpg")
}

/// Greyscale, cap the width (aspect preserved, Lanczos), then stretch
/// contrast around the mean grey level.
pub fn preprocess(image: &DynamicImage, max_width: u32, contrast_factor: f32) -> GrayImage {
    let mut gray = image.to_luma8();

    if gray.width() > max_width {
        let ratio = max_width as f64 / gray.width() as f64;
        let height = ((gray.height() as f64 * ratio) as u32).max(1);
        gray = image::imageops::resize(&gray, max_width, height, FilterType::Lanczos3);
        debug!(width = max_width, height, "page downscaled");
    }

    enhance_contrast(&mut gray, contrast_factor);
    gray
}

fn enhance_contrast(gray: &mut GrayImage, factor: f32) {
    let count = gray.width() as u64 * gray.height() as u64;
    if count == 0 || (factor - 1.0).abs() < f32::EPSILON {
        return;
    }
    let sum: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    let mean = (sum as f64 / count as f64 + 0.5).floor() as f32;

    for p in gray.pixels_mut() {
        let v = mean + factor * (p.0[0] as f32 - mean);
        p.0[0] = v.round().clamp(0.0, 255.0) as u8;
    }
}

fn save_page(image: &DynamicImage, out: &Path, settings: &RenderSettings) -> Result<(), Doc2JsonError> {
    let gray = preprocess(image, settings.max_width, settings.contrast_factor);
    let file = File::create(out).map_err(|source| Doc2JsonError::StorageFailed {
        path: out.to_path_buf(),
        source,
    })?;
    let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), settings.jpeg_quality);
    gray.write_with_encoder(encoder)
        .map_err(|e| Doc2JsonError::RenderFailed {
            path: out.to_path_buf(),
            detail: e.to_string(),
        })?;
    debug!(path = %out.display(), width = gray.width(), height = gray.height(), "page saved");
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, Doc2JsonError> {
    let bindings = match library_path {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| Doc2JsonError::PdfiumBindingFailed(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}
