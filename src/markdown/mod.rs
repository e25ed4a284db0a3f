//! Report markdown to HTML fragment conversion.
//!
//! The passes run in a fixed order. Code blocks are swapped for placeholder
//! tokens before any text pass touches the input and are swapped back last.

pub mod blocks;
pub mod code_block;
pub mod inline;

use tracing::{debug, warn};

pub use code_block::copy_text;

/// Output of one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub html: String,
    /// Number of fenced blocks extracted.
    pub code_blocks: usize,
    /// Placeholder tokens that could not be restored.
    pub unmatched: Vec<String>,
}

impl Conversion {
    pub fn is_clean(&self) -> bool {
        self.unmatched.is_empty()
    }
}

pub struct MarkdownConverter {
    id_prefix: String,
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new(format!("{:x}", chrono::Utc::now().timestamp_millis()))
    }
}

impl MarkdownConverter {
    /// `id_prefix` keeps copy-button targets unique across documents.
    pub fn new(id_prefix: impl Into<String>) -> Self {
        Self {
            id_prefix: id_prefix.into(),
        }
    }

    pub fn convert(&self, markdown: &str) -> Conversion {
        let text = markdown.replace("\r\n", "\n");
        let text = trim_boilerplate(&text);
        let (text, extracted) = code_block::extract(text, &self.id_prefix);
        let text = blocks::headings(&text);
        let text = inline::format_inline(&text);
        let text = blocks::lists(&text);
        let text = blocks::paragraphs(&text);
        let text = blocks::numbered_items(&text);
        let (html, unmatched) = code_block::restore(&text, &extracted);

        if unmatched.is_empty() {
            debug!(code_blocks = extracted.len(), "markdown converted");
        } else {
            warn!(
                code_blocks = extracted.len(),
                unmatched = unmatched.len(),
                "markdown converted with unrestored code blocks"
            );
        }

        Conversion {
            html: html.trim().to_string(),
            code_blocks: extracted.len(),
            unmatched,
        }
    }
}

/// Drop anything the model wrote before its first heading. Input without any
/// heading is kept whole.
fn trim_boilerplate(text: &str) -> &str {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if blocks::is_heading_line(line) {
            return &text[offset..];
        }
        offset += line.len();
    }
    text
}
