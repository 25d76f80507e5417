//! Paginated PDF rendering of the text report.

use crate::models::{ProbeError, ReportConfig, Result};
use crate::report::force_word_break;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// A4 page geometry and type settings.
#[derive(Debug, Clone, Copy)]
pub struct PageLayout {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_mm: f32,
    pub line_height_mm: f32,
    pub font_size_pt: f32,
    /// Wrap width of a line
    pub chars_per_line: usize,
    /// Longest unbroken run of non-whitespace characters
    pub break_width: usize,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margin_mm: 10.0,
            line_height_mm: 10.0,
            font_size_pt: 12.0,
            chars_per_line: 90,
            break_width: 60,
        }
    }
}

impl PageLayout {
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            chars_per_line: config.chars_per_line,
            break_width: config.break_width,
            ..Self::default()
        }
    }

    pub fn lines_per_page(&self) -> usize {
        let usable = self.height_mm - 2.0 * self.margin_mm;
        ((usable / self.line_height_mm).floor() as usize).max(1)
    }
}

/// Break, then wrap, every line of `text` into printable lines.
///
/// An empty source line still occupies one printed line.
pub fn layout_lines(text: &str, layout: &PageLayout) -> Vec<String> {
    let mut out = Vec::new();
    for raw in text.split('\n') {
        let broken = force_word_break(raw, layout.break_width);
        let wrapped = textwrap::wrap(&broken, layout.chars_per_line.max(1));
        if wrapped.is_empty() {
            out.push(String::new());
        } else {
            out.extend(wrapped.into_iter().map(|line| line.into_owned()));
        }
    }
    out
}

/// Split printable lines into pages.
pub fn paginate(lines: Vec<String>, lines_per_page: usize) -> Vec<Vec<String>> {
    let per_page = lines_per_page.max(1);
    let mut pages: Vec<Vec<String>> = Vec::new();
    let mut iter = lines.into_iter().peekable();
    while iter.peek().is_some() {
        pages.push(iter.by_ref().take(per_page).collect());
    }
    if pages.is_empty() {
        pages.push(Vec::new());
    }
    pages
}

/// Render `text` into a PDF at `path`. Returns the page count.
pub fn write_pdf(text: &str, layout: &PageLayout, title: &str, path: &Path) -> Result<usize> {
    let pages = paginate(layout_lines(text, layout), layout.lines_per_page());
    let width = Mm(layout.width_mm);
    let height = Mm(layout.height_mm);

    let (doc, first_page, first_layer) = PdfDocument::new(title, width, height, "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ProbeError::Report(format!("loading font: {e}")))?;

    for (page_no, page_lines) in pages.iter().enumerate() {
        let (page, layer) = if page_no == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(width, height, "Layer 1")
        };
        let canvas = doc.get_page(page).get_layer(layer);

        for (i, line) in page_lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            // Baseline sits in the lower part of each line cell.
            let y = layout.height_mm
                - layout.margin_mm
                - (i as f32 + 0.75) * layout.line_height_mm;
            canvas.use_text(
                line.as_str(),
                layout.font_size_pt,
                Mm(layout.margin_mm),
                Mm(y),
                &font,
            );
        }
    }

    let file = File::create(path)
        .map_err(|e| ProbeError::io(format!("creating {}", path.display()), e))?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| ProbeError::Report(format!("saving {}: {e}", path.display())))?;

    Ok(pages.len())
}
