//! Human-readable reports derived from a result document.

mod pdf;
mod text;

pub use pdf::*;
pub use text::*;

use crate::models::{ProbeError, ReportConfig, Result, RunOutput};
use std::path::Path;
use tracing::{debug, info};

/// Render `output` to a text file and a PDF. Returns the PDF page count.
pub fn write_reports(
    output: &RunOutput,
    config: &ReportConfig,
    text_path: &Path,
    pdf_path: &Path,
) -> Result<usize> {
    let text = render_text(output, config.max_idx);
    debug!("\n{text}");

    std::fs::write(text_path, &text)
        .map_err(|e| ProbeError::io(format!("writing {}", text_path.display()), e))?;

    let title = format!("{} responses", output.llm);
    let pages = write_pdf(&text, &PageLayout::from_config(config), &title, pdf_path)?;

    info!(
        text = %text_path.display(),
        pdf = %pdf_path.display(),
        pages,
        "Reports written"
    );
    Ok(pages)
}
