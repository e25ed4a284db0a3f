use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

pub const PLACEHOLDER_PREFIX: &str = "CODE_BLOCK_PLACEHOLDER_";

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```([A-Za-z0-9_+#.\-]*)[^\n]*\n(.*?)```").expect("valid regex")
});

static LINE_SPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<span class="line">(.*?)</span>"#).expect("valid regex")
});

pub fn placeholder(index: usize) -> String {
    format!("{PLACEHOLDER_PREFIX}{index}")
}

/// A fenced block pulled out of the text, already rendered to HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedBlock {
    pub token: String,
    pub html: String,
}

/// Replace every fenced block with a placeholder line and render it.
///
/// Placeholders are numbered from 0 in order of appearance. Element ids are
/// `code-<id_prefix>-<n>`. An unterminated fence is left in the text.
pub fn extract(text: &str, id_prefix: &str) -> (String, Vec<ExtractedBlock>) {
    let mut blocks = Vec::new();

    let replaced = FENCE_RE.replace_all(text, |caps: &regex::Captures| {
        let index = blocks.len();
        let token = placeholder(index);
        let language = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let body = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        let element_id = format!("code-{id_prefix}-{index}");
        blocks.push(ExtractedBlock {
            token: token.clone(),
            html: render_block(language, body, &element_id),
        });
        format!("\n{token}\n")
    });

    (replaced.into_owned(), blocks)
}

/// Render one code block: language label, copy button, line-number gutter
/// and one `<span class="line">` per source line.
pub fn render_block(language: &str, body: &str, element_id: &str) -> String {
    let label = if language.trim().is_empty() {
        "TEXT".to_string()
    } else {
        language.trim().to_uppercase()
    };

    let body = body.strip_suffix('\n').unwrap_or(body);
    let lines: Vec<&str> = body.split('\n').collect();

    let gutter: String = (1..=lines.len())
        .map(|n| format!("<span>{n}</span>"))
        .collect();
    let code: String = lines
        .iter()
        .map(|line| format!(r#"<span class="line">{}</span>"#, escape_html(line)))
        .collect();

    format!(
        concat!(
            r#"<div class="code-block">"#,
            r#"<div class="code-header"><span class="code-language">{label}</span>"#,
            r#"<button class="copy-button" data-target="{id}">Copy</button></div>"#,
            r#"<div class="code-body"><div class="line-numbers">{gutter}</div>"#,
            r#"<pre><code id="{id}" class="line-numbered">{code}</code></pre></div>"#,
            "</div>"
        ),
        label = escape_html(&label),
        id = element_id,
        gutter = gutter,
        code = code,
    )
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Text the copy button puts on the clipboard: the line spans only, never the
/// gutter numbers.
pub fn copy_text(block_html: &str) -> String {
    LINE_SPAN_RE
        .captures_iter(block_html)
        .map(|caps| unescape_html(&caps[1]))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A known way an earlier pass can mangle a placeholder token.
struct Variant {
    name: &'static str,
    form: fn(usize) -> String,
}

/// Tried in order; append new shapes here as they are observed.
const VARIANTS: &[Variant] = &[
    Variant {
        name: "paragraph",
        form: |n| format!("<p>{}</p>", placeholder(n)),
    },
    Variant {
        name: "plain",
        form: placeholder,
    },
    Variant {
        name: "paragraph-emphasis",
        form: |n| format!("<p>CODE<em>BLOCK</em>PLACEHOLDER_{n}</p>"),
    },
    Variant {
        name: "emphasis",
        form: |n| format!("CODE<em>BLOCK</em>PLACEHOLDER_{n}"),
    },
    Variant {
        name: "paragraph-strong",
        form: |n| format!("<p><strong>{}</strong></p>", placeholder(n)),
    },
    Variant {
        name: "strong-underscores",
        form: |n| format!("CODE<strong>BLOCK</strong>PLACEHOLDER_{n}"),
    },
];

fn permissive_pattern(index: usize) -> Option<Regex> {
    let sep = r"(?:_|</?em>|</?strong>)*";
    Regex::new(&format!(
        r"(?:<p>)?\s*CODE{sep}BLOCK{sep}PLACEHOLDER{sep}{index}\b\s*(?:</p>)?"
    ))
    .ok()
}

/// Substitute placeholders back. Returns the tokens that could not be found.
///
/// Runs from the highest index down so `..._1` never matches inside `..._10`.
pub fn restore(html: &str, blocks: &[ExtractedBlock]) -> (String, Vec<String>) {
    let mut out = html.to_string();
    let mut unmatched = Vec::new();

    for (index, block) in blocks.iter().enumerate().rev() {
        let hit = VARIANTS.iter().find_map(|variant| {
            let form = (variant.form)(index);
            out.contains(&form).then_some((variant.name, form))
        });

        if let Some((name, form)) = hit {
            debug!(token = %block.token, variant = name, "restored code block");
            out = out.replacen(&form, &block.html, 1);
            continue;
        }

        if let Some(re) = permissive_pattern(index)
            && let Some(m) = re.find(&out)
        {
            debug!(token = %block.token, variant = "pattern", "restored code block");
            out.replace_range(m.range(), &block.html);
            continue;
        }

        warn!(token = %block.token, "code block placeholder not found during restore");
        unmatched.push(block.token.clone());
    }

    unmatched.reverse();
    (out, unmatched)
}
