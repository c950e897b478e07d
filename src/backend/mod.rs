//! Conversion backends.
//!
//! Each backend turns one input file into a readable, non-empty PDF or fails
//! with a classified [`crate::error::ConvertError`]; partial output is never
//! a silent success. The pass-through (already-PDF) case is a plain copy and
//! lives in the dispatcher.
//!
//! * [`image`] — embeds a raster image as a single PDF page.
//! * [`text`]  — fixed-layout text rendering (hard wrap, fixed line height).
//! * [`office`] — drives a headless LibreOffice child process under a timeout.

pub mod image;
pub mod office;
pub mod text;

use crate::error::ConvertError;
use printpdf::{PdfDocument, PdfPage, PdfSaveOptions};
use std::path::Path;

/// Serialise a finished document to `output`.
fn save_document(
    mut doc: PdfDocument,
    pages: Vec<PdfPage>,
    output: &Path,
) -> Result<(), ConvertError> {
    let mut warnings = Vec::new();
    let bytes = doc.with_pages(pages).save(&PdfSaveOptions::default(), &mut warnings);
    std::fs::write(output, bytes).map_err(|e| ConvertError::Io {
        path: output.to_path_buf(),
        source: e,
    })
}
