//! Format classification: map a file extension to a conversion strategy.

/// Raster formats handled by the image backend.
pub const IMAGE_EXTS: &[&str] = &[".png", ".jpg", ".jpeg", ".webp"];

/// Plain-text-like formats handled by the text backend.
pub const TEXT_EXTS: &[&str] = &[".txt", ".md", ".log", ".csv"];

/// Which backend converts a given input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Input is already a PDF; copy it through unchanged.
    PassThrough,
    /// Raster image, embedded as a single PDF page.
    Image,
    /// Plain text, rendered with the fixed-layout text backend.
    Text,
    /// Everything else goes to the office engine. This catch-all is
    /// deliberate: LibreOffice handles far more than the classic office
    /// formats, so unknown extensions are tried optimistically rather than
    /// rejected. Truly unsupported formats surface later as
    /// `ProcessFailed` or `NoOutputProduced`.
    OfficeSuite,
}

/// Classify a lower-cased extension (including the leading dot, e.g. `".png"`).
///
/// An empty extension is routed to the office engine like any other unknown.
pub fn classify(ext: &str) -> Strategy {
    if ext == ".pdf" {
        Strategy::PassThrough
    } else if IMAGE_EXTS.contains(&ext) {
        Strategy::Image
    } else if TEXT_EXTS.contains(&ext) {
        Strategy::Text
    } else {
        Strategy::OfficeSuite
    }
}
