use std::sync::LazyLock;

use regex::Regex;

use super::code_block::escape_html;

static BOLD_STAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));
static BOLD_UNDERSCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b__(.+?)__\b").expect("valid regex"));
static ITALIC_STAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\s](?:[^*]*[^*\s])?)\*").expect("valid regex"));
static ITALIC_UNDERSCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b_([^_\s](?:[^_]*[^_\s])?)_\b").expect("valid regex"));

/// Apply bold, italic and inline code to every line.
///
/// Bold runs before italic so a single `*` never eats half of a `**` pair.
/// Text inside backticks is escaped and left unformatted.
pub fn format_inline(text: &str) -> String {
    text.lines().map(format_line).collect::<Vec<_>>().join("\n")
}

fn format_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    // Even segments are prose, odd segments sit between backticks.
    let segments: Vec<&str> = line.split('`').collect();
    let closed = segments.len() % 2 == 1;

    for (i, segment) in segments.iter().enumerate() {
        let is_code = i % 2 == 1;
        let is_dangling = !closed && i == segments.len() - 1;
        if is_code && !is_dangling {
            out.push_str("<code>");
            out.push_str(&escape_html(segment));
            out.push_str("</code>");
        } else {
            if is_dangling {
                out.push('`');
            }
            out.push_str(&emphasize(segment));
        }
    }

    out
}

fn emphasize(text: &str) -> String {
    let text = BOLD_STAR_RE.replace_all(text, "<strong>$1</strong>");
    let text = BOLD_UNDERSCORE_RE.replace_all(&text, "<strong>$1</strong>");
    let text = ITALIC_STAR_RE.replace_all(&text, "<em>$1</em>");
    ITALIC_UNDERSCORE_RE
        .replace_all(&text, "<em>$1</em>")
        .into_owned()
}
