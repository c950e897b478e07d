//! Image-to-PDF backend.
//!
//! The whole input is read into memory, decoded, and embedded as the single
//! page of a fresh PDF. The page is sized to the image's own pixel
//! dimensions at 96 dpi, so the aspect ratio is preserved by construction
//! and nothing is resampled.

use crate::error::ConvertError;
use printpdf::{Mm, Op, PdfDocument, PdfPage, RawImage, XObjectTransform};
use std::path::Path;
use tracing::debug;

/// Millimetres per pixel at 96 dpi.
const MM_PER_PX: f32 = 0.264_583;

/// Embed the raster image at `input` as a one-page PDF at `output`.
pub fn render(input: &Path, output: &Path) -> Result<(), ConvertError> {
    let bytes = std::fs::read(input).map_err(|e| ConvertError::Io {
        path: input.to_path_buf(),
        source: e,
    })?;

    let mut warnings = Vec::new();
    let image = RawImage::decode_from_bytes(&bytes, &mut warnings).map_err(|e| {
        ConvertError::UnreadableInput {
            path: input.to_path_buf(),
            detail: format!("{e}"),
        }
    })?;

    let page_w = image.width as f32 * MM_PER_PX;
    let page_h = image.height as f32 * MM_PER_PX;
    debug!(
        "image {}x{} px -> page {:.1}x{:.1} mm",
        image.width, image.height, page_w, page_h
    );

    let mut doc = PdfDocument::new("any2pdf");
    let image_id = doc.add_image(&image);

    let ops = vec![Op::UseXobject {
        id: image_id,
        transform: XObjectTransform {
            translate_x: Some(Mm(0.0).into()),
            translate_y: Some(Mm(0.0).into()),
            scale_x: Some(1.0),
            scale_y: Some(1.0),
            dpi: Some(96.0),
            ..Default::default()
        },
    }];
    let page = PdfPage::new(Mm(page_w), Mm(page_h), ops);

    super::save_document(doc, vec![page], output)
}
