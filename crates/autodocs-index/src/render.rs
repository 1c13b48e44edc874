//! Markdown rendering.

use pulldown_cmark::{html, Options, Parser};
use thiserror::Error;

/// Error produced when a source cannot be turned into text at all.
///
/// Malformed markdown is never an error; rendering is best effort.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

/// Converts raw document bytes into HTML.
pub trait Renderer: Send + Sync {
    /// Render a document.
    fn render(&self, raw: &[u8]) -> Result<String, RenderError>;
}

/// CommonMark renderer with tables and strikethrough enabled.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    options: Options,
}

impl MarkdownRenderer {
    /// Create a renderer with the default extensions.
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        Self { options }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, raw: &[u8]) -> Result<String, RenderError> {
        let text = std::str::from_utf8(raw).map_err(|e| RenderError(e.to_string()))?;

        let parser = Parser::new_ext(text, self.options);
        let mut out = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut out, parser);

        Ok(out)
    }
}
