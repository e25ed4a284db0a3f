use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

const VOID_TAGS: &[&str] = &["hr", "br", "img", "meta", "link", "input"];

/// One top-level node of a rendered fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Lowercased tag name; empty for bare text lines.
    pub tag: String,
    /// Raw attribute text of the opening tag, including leading whitespace.
    pub attrs: String,
    pub inner: String,
    pub raw: String,
}

impl Block {
    fn text_line(line: &str) -> Self {
        Self {
            tag: String::new(),
            attrs: String::new(),
            inner: line.to_string(),
            raw: line.to_string(),
        }
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }

    /// Visible text with markup stripped.
    pub fn text(&self) -> String {
        strip_tags(&self.inner)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attrs
            .split("class=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

pub fn strip_tags(html: &str) -> String {
    TAG_RE
        .replace_all(html, "")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Flat list of top-level blocks of an HTML fragment.
///
/// Handles the markup this crate generates: well-formed, tag names in
/// lowercase, no comments. Text outside any element becomes one block per
/// line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        let mut blocks = Vec::new();
        let mut rest = html;

        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }

            match parse_element(rest) {
                Some((block, consumed)) => {
                    blocks.push(block);
                    rest = &rest[consumed..];
                }
                None => {
                    let end = rest.find('\n').unwrap_or(rest.len());
                    let line = rest[..end].trim_end();
                    if !line.is_empty() {
                        blocks.push(Block::text_line(line));
                    }
                    rest = &rest[end..];
                }
            }
        }

        Self { blocks }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

fn tag_name(after_lt: &str) -> &str {
    let end = after_lt
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(after_lt.len());
    &after_lt[..end]
}

/// Parse one element at the start of `input`. Returns the block and the number
/// of bytes consumed, or `None` if `input` does not open an element.
fn parse_element(input: &str) -> Option<(Block, usize)> {
    let after_lt = input.strip_prefix('<')?;
    let name = tag_name(after_lt);
    if name.is_empty() {
        return None;
    }
    let tag = name.to_ascii_lowercase();
    let open_end = input.find('>')?;
    let attrs = input[1 + name.len()..open_end]
        .trim_end_matches('/')
        .to_string();

    if VOID_TAGS.contains(&tag.as_str()) || input[..open_end].ends_with('/') {
        let raw = &input[..=open_end];
        return Some((
            Block {
                tag,
                attrs,
                inner: String::new(),
                raw: raw.to_string(),
            },
            open_end + 1,
        ));
    }

    let open_pat = format!("<{tag}");
    let close_pat = format!("</{tag}>");
    let mut depth = 1usize;
    let mut pos = open_end + 1;

    while depth > 0 {
        let next_close = input[pos..].find(&close_pat)? + pos;
        let next_open = find_open(&input[pos..], &open_pat).map(|i| i + pos);

        match next_open {
            Some(open) if open < next_close => {
                depth += 1;
                pos = open + open_pat.len();
            }
            _ => {
                depth -= 1;
                if depth == 0 {
                    let inner = &input[open_end + 1..next_close];
                    let end = next_close + close_pat.len();
                    return Some((
                        Block {
                            tag,
                            attrs,
                            inner: inner.to_string(),
                            raw: input[..end].to_string(),
                        },
                        end,
                    ));
                }
                pos = next_close + close_pat.len();
            }
        }
    }

    None
}

/// Find `<tag` followed by whitespace or `>`, so `<p` does not match `<pre`.
fn find_open(haystack: &str, open_pat: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(i) = haystack[from..].find(open_pat) {
        let at = from + i;
        let next = haystack[at + open_pat.len()..].chars().next();
        if matches!(next, Some(c) if c == '>' || c.is_whitespace()) {
            return Some(at);
        }
        from = at + open_pat.len();
    }
    None
}
