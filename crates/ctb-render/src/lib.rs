//! Report rendering
//!
//! Renders a trace analysis [`Report`](ctb_trace::Report) as a fixed-width
//! text table or as JSON, to stdout or a file.

pub mod json;
pub mod output;
pub mod text;

pub use json::JsonRenderer;
pub use output::{open_output, OutputFormat};
pub use text::TextRenderer;

use ctb_trace::Report;
use std::io::Write;
use thiserror::Error;

/// Rendering errors
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown output format: {0}. Must be one of: text, json")]
    UnknownFormat(String),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Writes a report in one output format
pub trait Renderer {
    fn render(&self, report: &Report, out: &mut dyn Write) -> RenderResult<()>;
}

/// Renderer for `format`
pub fn renderer_for(format: OutputFormat, request_width: usize) -> Box<dyn Renderer> {
    match format {
        OutputFormat::Text => Box::new(TextRenderer::new(request_width)),
        OutputFormat::Json => Box::new(JsonRenderer::new(true)),
    }
}
