//! Text-to-PDF backend: deterministic fixed-width layout.
//!
//! This is deliberately not a typesetter. Lines are hard-wrapped at a fixed
//! character column (no word-aware wrapping), rendered in the builtin
//! monospace font at a fixed line height, with a page break once the cursor
//! crosses the bottom margin. The output is boring and byte-stable, which is
//! exactly the contract: no rendering-fidelity promises for text inputs.

use crate::error::ConvertError;
use printpdf::{BuiltinFont, Mm, Op, PdfDocument, PdfPage, Point, TextItem};
use std::path::Path;

/// A4 page dimensions.
const PAGE_W: Mm = Mm(210.0);
const PAGE_H: Mm = Mm(297.0);

const MM_PER_PT: f32 = 0.352_778;

/// Page margin: 50 pt on every side.
const MARGIN_MM: f32 = 50.0 * MM_PER_PT;

/// Vertical advance per line: 14 pt.
const LINE_H_MM: f32 = 14.0 * MM_PER_PT;

/// Hard-wrap column.
const MAX_CHARS_PER_LINE: usize = 95;

/// Render `input` as a paginated monospace PDF at `output`.
///
/// Invalid UTF-8 byte sequences are replaced rather than failing the job —
/// a log file with a stray binary blob should still convert.
pub fn render(input: &Path, output: &Path) -> Result<(), ConvertError> {
    let bytes = std::fs::read(input).map_err(|e| ConvertError::Io {
        path: input.to_path_buf(),
        source: e,
    })?;
    let text = String::from_utf8_lossy(&bytes);

    let doc = PdfDocument::new("any2pdf");
    let mut builder = PageBuilder::new();

    for line in text.lines() {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            builder.write_line(String::new());
            continue;
        }
        // char-based chunking so multibyte text cannot split inside a scalar
        for chunk in chars.chunks(MAX_CHARS_PER_LINE) {
            builder.write_line(chunk.iter().collect());
        }
    }

    super::save_document(doc, builder.finish(), output)
}

/// Accumulates ops page by page, breaking when the cursor runs off the
/// bottom margin.
struct PageBuilder {
    pages: Vec<PdfPage>,
    current_ops: Vec<Op>,
    /// Cursor position in mm from the page bottom.
    y_pos: f32,
}

impl PageBuilder {
    fn new() -> Self {
        PageBuilder {
            pages: Vec::new(),
            current_ops: vec![Op::StartTextSection],
            y_pos: 297.0 - MARGIN_MM,
        }
    }

    fn write_line(&mut self, text: String) {
        self.current_ops.push(Op::SetTextCursor {
            pos: Point {
                x: Mm(MARGIN_MM).into(),
                y: Mm(self.y_pos).into(),
            },
        });
        self.current_ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text)],
            font: BuiltinFont::Courier,
        });

        self.y_pos -= LINE_H_MM;
        if self.y_pos < MARGIN_MM {
            self.new_page();
        }
    }

    fn new_page(&mut self) {
        self.current_ops.push(Op::EndTextSection);
        let ops = std::mem::replace(&mut self.current_ops, vec![Op::StartTextSection]);
        self.pages.push(PdfPage::new(PAGE_W, PAGE_H, ops));
        self.y_pos = 297.0 - MARGIN_MM;
    }

    fn finish(mut self) -> Vec<PdfPage> {
        self.current_ops.push(Op::EndTextSection);
        let ops = std::mem::take(&mut self.current_ops);
        self.pages.push(PdfPage::new(PAGE_W, PAGE_H, ops));
        self.pages
    }
}
