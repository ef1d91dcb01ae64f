//! PDF backends for the organizer workspace
//!
//! [`LopdfEngine`] renders placeholder thumbnails and rewrites documents in
//! process with `lopdf`. [`ScriptEngine`] delegates to external per-operation
//! scripts that answer with one JSON object on stdout.

mod edit;
pub mod script;

use image::{ImageBuffer, Rgba};
use lopdf::Document;
use organizer_core::{
    DocumentHandle, PreviewPages, PreviewRequest, PreviewService, ServiceError, TransformEngine,
    TransformOutcome,
};
use page_model::{PageIndex, TransformRequest};
use std::fs;
use std::path::{Path, PathBuf};

pub use script::ScriptEngine;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    const LETTER: Self = Self { width_pt: 612.0, height_pt: 792.0 };

    fn rotated(self, degrees: i64) -> Self {
        if degrees.rem_euclid(180) == 90 {
            Self { width_pt: self.height_pt, height_pt: self.width_pt }
        } else {
            self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSize {
    pub width_px: u32,
    pub height_px: u32,
}

impl Default for ThumbnailSize {
    fn default() -> Self {
        Self { width_px: 160, height_px: 220 }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("no pages left in the output document")]
    EmptyResult,
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("{script} failed: {message}")]
    Script { script: String, message: String },
    #[error("invalid JSON from backend: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<PdfEngineError> for ServiceError {
    fn from(err: PdfEngineError) -> Self {
        match err {
            PdfEngineError::Script { .. } | PdfEngineError::Json(_) => {
                ServiceError::Transport(err.to_string())
            }
            other => ServiceError::Rejected(other.to_string()),
        }
    }
}

/// Reads and parses a document, refusing encrypted files before lopdf sees them.
pub fn load_document(path: &Path) -> Result<Document, PdfEngineError> {
    let bytes = fs::read(path)?;
    if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
        return Err(PdfEngineError::EncryptedUnsupported);
    }

    Ok(Document::load_mem(&bytes)?)
}

fn page_size(doc: &Document, page_id: lopdf::ObjectId) -> PageSize {
    let size = edit::inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| edit::resolve(doc, obj))
        .and_then(|obj| obj.as_array().ok())
        .and_then(|array| {
            if array.len() != 4 {
                return None;
            }
            let x0 = array[0].as_float().ok()?;
            let y0 = array[1].as_float().ok()?;
            let x1 = array[2].as_float().ok()?;
            let y1 = array[3].as_float().ok()?;
            Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
        })
        .unwrap_or(PageSize::LETTER);

    size.rotated(edit::effective_rotation(doc, page_id))
}

/// White page with a grey border, scaled to fit `target` and keeping the page aspect ratio.
fn render_placeholder(size: PageSize, target: ThumbnailSize) -> RgbaImage {
    let scale = (target.width_px as f32 / size.width_pt.max(1.0))
        .min(target.height_px as f32 / size.height_pt.max(1.0));
    let width = (size.width_pt * scale).round().max(1.0) as u32;
    let height = (size.height_pt * scale).round().max(1.0) as u32;

    let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

    if width >= 4 && height >= 4 {
        for x in 0..width {
            image.put_pixel(x, 0, Rgba([220, 220, 220, 255]));
            image.put_pixel(x, height - 1, Rgba([220, 220, 220, 255]));
        }
        for y in 0..height {
            image.put_pixel(0, y, Rgba([220, 220, 220, 255]));
            image.put_pixel(width - 1, y, Rgba([220, 220, 220, 255]));
        }
    }

    image
}

/// Success message in the wording the save dialogs show.
fn saved_message(request: &TransformRequest, output: &Path) -> String {
    let verb = match request {
        TransformRequest::Organize { .. } => "organized PDF",
        TransformRequest::Split { .. } => "split PDF",
        TransformRequest::Rotate { .. } => "rotated pages",
    };
    let name = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| output.display().to_string());

    format!("Successfully {verb} and saved to {name}")
}

#[derive(Debug, Clone)]
pub struct LopdfEngine {
    preview_dir: PathBuf,
    thumbnail: ThumbnailSize,
}

impl LopdfEngine {
    pub fn new(preview_dir: impl Into<PathBuf>) -> Self {
        Self { preview_dir: preview_dir.into(), thumbnail: ThumbnailSize::default() }
    }

    pub fn with_thumbnail_size(mut self, thumbnail: ThumbnailSize) -> Self {
        self.thumbnail = thumbnail;
        self
    }

    /// Writes `preview_<i>.png` (0-based) for the requested pages.
    pub fn render_previews(
        &self,
        path: &Path,
        request: PreviewRequest,
    ) -> Result<PreviewPages, PdfEngineError> {
        let doc = load_document(path)?;
        let pages = doc.get_pages();
        let page_count = pages.len() as u32;

        let wanted: Vec<u32> = match request {
            PreviewRequest::AllPages => pages.keys().copied().collect(),
            PreviewRequest::Page(page) => {
                if !pages.contains_key(&page.get()) {
                    return Err(PdfEngineError::PageOutOfRange { page: page.get(), page_count });
                }
                vec![page.get()]
            }
        };

        fs::create_dir_all(&self.preview_dir)?;

        let mut file_paths = Vec::with_capacity(wanted.len());
        for number in wanted {
            let Some(&page_id) = pages.get(&number) else {
                continue;
            };
            let image = render_placeholder(page_size(&doc, page_id), self.thumbnail);
            let target = self.preview_dir.join(format!("preview_{}.png", number - 1));
            image.save(&target)?;
            file_paths.push(target);
        }

        log::debug!(
            "rendered {} preview(s) of {} into {}",
            file_paths.len(),
            path.display(),
            self.preview_dir.display()
        );
        Ok(PreviewPages { file_paths, page_count })
    }

    /// Applies `request` to the document at `path` and writes the result to `output`.
    /// Returns the page count of the written document.
    pub fn apply(
        &self,
        path: &Path,
        request: &TransformRequest,
        output: &Path,
    ) -> Result<usize, PdfEngineError> {
        let mut doc = load_document(path)?;

        match request {
            TransformRequest::Organize { page_order, delete_pages } => {
                let kept: Vec<PageIndex> =
                    page_order.iter().copied().filter(|page| !delete_pages.contains(page)).collect();
                edit::check_known(&doc, delete_pages)?;
                edit::keep_pages(&mut doc, &kept)?;
            }
            TransformRequest::Split { pages } => {
                let mut kept = pages.clone();
                kept.sort_unstable();
                kept.dedup();
                edit::keep_pages(&mut doc, &kept)?;
            }
            TransformRequest::Rotate { rotations } => edit::rotate_pages(&mut doc, rotations)?,
        }

        if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        doc.save(output)
            .map_err(|err| PdfEngineError::Backend(format!("failed to save {}: {err}", output.display())))?;

        Ok(doc.get_pages().len())
    }
}

impl PreviewService for LopdfEngine {
    fn render(
        &mut self,
        document: &DocumentHandle,
        request: PreviewRequest,
    ) -> Result<PreviewPages, ServiceError> {
        self.render_previews(document.path(), request).map_err(|err| {
            log::warn!("preview of {document} failed: {err}");
            ServiceError::from(err)
        })
    }
}

impl TransformEngine for LopdfEngine {
    fn invoke(
        &mut self,
        document: &DocumentHandle,
        request: &TransformRequest,
        destination: &Path,
    ) -> Result<TransformOutcome, ServiceError> {
        let pages = self.apply(document.path(), request, destination).map_err(|err| {
            log::warn!("{} of {document} failed: {err}", request.mode());
            ServiceError::from(err)
        })?;

        log::info!("wrote {} ({pages} pages)", destination.display());
        Ok(TransformOutcome {
            message: saved_message(request, destination),
            output_path: Some(destination.to_path_buf()),
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::{Dictionary, Document, Object, Stream};
    use std::path::Path;

    /// One page per width; page widths identify pages after a rewrite.
    /// The first page inherits its MediaBox and Rotate from the page tree root.
    pub fn write_pdf(path: &Path, widths: &[i64]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::new();
        for (position, width) in widths.iter().enumerate() {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));
            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(pages_id));
            page.set("Contents", Object::Reference(content_id));
            if position > 0 {
                page.set(
                    "MediaBox",
                    Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(*width), Object::Integer(792)]),
                );
            }
            kids.push(Object::Reference(doc.add_object(page)));
        }

        let first_width = widths.first().copied().unwrap_or(612);
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(kids.len() as i64));
        pages.set("Kids", Object::Array(kids));
        pages.set("MediaBox", Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(first_width), Object::Integer(792)]));
        pages.set("Rotate", Object::Integer(90));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        doc.save(path).expect("fixture should save");
    }

    /// (width, rotate) of every page in document order.
    pub fn page_layout(path: &Path) -> Vec<(i64, i64)> {
        let doc = Document::load(path).expect("output should parse");
        doc.get_pages()
            .values()
            .map(|page_id| {
                let page = doc.get_dictionary(*page_id).expect("page dictionary");
                let width = page
                    .get(b"MediaBox")
                    .and_then(Object::as_array)
                    .ok()
                    .and_then(|array| array.get(2).and_then(|value| value.as_i64().ok()))
                    .expect("page carries its own MediaBox");
                let rotate = page.get(b"Rotate").and_then(Object::as_i64).unwrap_or(0);
                (width, rotate)
            })
            .collect()
    }
}
