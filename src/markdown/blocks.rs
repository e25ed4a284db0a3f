use std::sync::LazyLock;

use regex::Regex;

use super::code_block::PLACEHOLDER_PREFIX;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*$").expect("valid regex"));
static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[*-]\s+(.*)$").expect("valid regex"));
static PLACEHOLDER_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^CODE_BLOCK_PLACEHOLDER_\d+$").expect("valid regex"));
static NUMBERED_PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<p>(\d+)\.\s+(.*)</p>$").expect("valid regex"));

/// Tags that open a block of their own and must not be paragraph-wrapped.
const BLOCK_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "ul", "/ul", "ol", "/ol", "li", "p", "/p", "div", "/div",
    "pre", "table", "blockquote", "hr",
];

pub fn is_heading_line(line: &str) -> bool {
    HEADING_RE.is_match(line.trim_end())
}

/// Output heading level for a markdown depth: `#` and `##` both become `h2`,
/// `###` stays `h3`, deeper levels move up by one.
pub fn heading_level(depth: usize) -> usize {
    match depth {
        0..=2 => 2,
        3 => 3,
        n => n - 1,
    }
}

pub fn headings(text: &str) -> String {
    text.lines()
        .map(|line| match HEADING_RE.captures(line) {
            Some(caps) => {
                let level = heading_level(caps[1].len());
                format!("<h{level}>{}</h{level}>", &caps[2])
            }
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Group contiguous `*`/`-` lines into `<ul>` lists. The first line that is
/// not an item closes the list.
pub fn lists(text: &str) -> String {
    let mut out = Vec::new();
    let mut in_list = false;

    for line in text.lines() {
        match LIST_ITEM_RE.captures(line) {
            Some(caps) => {
                if !in_list {
                    out.push("<ul>".to_string());
                    in_list = true;
                }
                out.push(format!("<li>{}</li>", &caps[1]));
            }
            None => {
                if in_list {
                    out.push("</ul>".to_string());
                    in_list = false;
                }
                out.push(line.to_string());
            }
        }
    }

    if in_list {
        out.push("</ul>".to_string());
    }

    out.join("\n")
}

fn starts_with_block_tag(line: &str) -> bool {
    let Some(rest) = line.strip_prefix('<') else {
        return false;
    };
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '/')
        .collect();
    BLOCK_TAGS.contains(&name.to_ascii_lowercase().as_str())
}

/// Wrap remaining prose lines in `<p>`. Blank lines, placeholder tokens and
/// lines already opening a block element pass through.
pub fn paragraphs(text: &str) -> String {
    text.lines()
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty()
                || is_placeholder_line(trimmed)
                || starts_with_block_tag(trimmed)
            {
                line.to_string()
            } else {
                format!("<p>{trimmed}</p>")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Give `N. text` paragraphs a number badge.
pub fn numbered_items(text: &str) -> String {
    text.lines()
        .map(|line| match NUMBERED_PARAGRAPH_RE.captures(line.trim()) {
            Some(caps) => format!(
                r#"<p class="numbered-item"><span class="number-badge">{}</span> {}</p>"#,
                &caps[1], &caps[2]
            ),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn is_placeholder_line(line: &str) -> bool {
    let line = line.trim();
    line.starts_with(PLACEHOLDER_PREFIX) && PLACEHOLDER_LINE_RE.is_match(line)
}
