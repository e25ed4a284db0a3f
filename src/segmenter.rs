use std::sync::LazyLock;

use regex::Regex;

const FENCE: &str = "```";

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+\.|[-*•])\s+(.*)$").expect("valid regex"));

/// Split one category's text block into bullet strings.
///
/// Recognized bullet starts: `1.`, `-`, `*`, `•` followed by whitespace.
/// Fenced code blocks are opaque: their lines (markers included) are appended
/// verbatim to the open bullet and never start a new one. Blank lines outside
/// a fence are dropped. Text before the first bullet is discarded.
pub fn segment(content: &str) -> Vec<String> {
    let mut bullets = Vec::new();
    let mut current: Option<String> = None;
    let mut inside_fence = false;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with(FENCE) {
            inside_fence = !inside_fence;
            append_line(&mut current, line);
            continue;
        }

        if inside_fence {
            append_line(&mut current, line);
            continue;
        }

        if trimmed.is_empty() {
            continue;
        }

        if let Some(caps) = BULLET_RE.captures(trimmed) {
            if let Some(done) = current.take() {
                bullets.push(done);
            }
            current = Some(caps[1].to_string());
        } else {
            append_line(&mut current, trimmed);
        }
    }

    if let Some(done) = current {
        bullets.push(done);
    }

    bullets
}

fn append_line(current: &mut Option<String>, line: &str) {
    if let Some(text) = current {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(line);
    }
}
