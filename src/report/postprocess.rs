//! Section anchors and score badges for a rendered report fragment.
//!
//! `plan` inspects a parsed fragment and decides what to change; `apply`
//! produces the new fragment. Both are pure, and running them on their own
//! output changes nothing.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::document::{Block, Document, strip_tags};

/// Substring of the cleaned heading text → anchor id. First match wins.
const ANCHORS: &[(&str, &str)] = &[
    ("executive summary", "executive-summary"),
    ("architecture", "architecture"),
    ("code quality", "code-quality"),
    ("security", "security"),
    ("performance", "performance"),
    ("testing", "testing"),
    ("maintainability", "maintainability"),
    ("documentation", "documentation"),
    ("best practice", "best-practices"),
    ("recommendation", "recommendations"),
    ("conclusion", "conclusion"),
];

const TOP_LEVEL: &str = "h2";
const PRIMARY_SCORE_PHRASE: &str = "section score:";
const MAX_LOOKAHEAD: usize = 5;

static SCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:</?(?:strong|em)>\s*)*(?:\b(?-i:[A-Z][A-Za-z]*)\s+)?\bscore\s*:\s*(?:</?(?:strong|em)>\s*)*(\d{1,2})\s*/\s*10(?:\s*</?(?:strong|em)>)*",
    )
    .expect("valid regex")
});
static ID_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s+id="[^"]*""#).expect("valid regex"));
static EMPTY_MARKUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(strong|em)>\s*</(strong|em)>").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Good,
    Medium,
    Bad,
}

impl ScoreBand {
    pub fn for_score(score: u8) -> Self {
        match score {
            8.. => ScoreBand::Good,
            5..=7 => ScoreBand::Medium,
            _ => ScoreBand::Bad,
        }
    }

    pub fn class(self) -> &'static str {
        match self {
            ScoreBand::Good => "score-good",
            ScoreBand::Medium => "score-medium",
            ScoreBand::Bad => "score-bad",
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreBand::Good => write!(f, "good"),
            ScoreBand::Medium => write!(f, "medium"),
            ScoreBand::Bad => write!(f, "bad"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub value: u8,
    pub band: ScoreBand,
}

impl Score {
    pub fn new(value: u8) -> Self {
        Self {
            value,
            band: ScoreBand::for_score(value),
        }
    }

    pub fn badge_html(&self) -> String {
        format!(
            r#"<div class="score-badge {}">{}/10</div>"#,
            self.band.class(),
            self.value
        )
    }
}

/// A top-level heading of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    /// Index of the heading in `Document::blocks`.
    pub block: usize,
    pub title: String,
    pub anchor: Option<String>,
    pub score: Option<Score>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostProcessPlan {
    pub sections: Vec<ReportSection>,
    /// Paragraphs whose inner HTML changes.
    pub rewrites: BTreeMap<usize, String>,
    /// Paragraphs left with nothing but a score.
    pub removals: BTreeSet<usize>,
}

impl PostProcessPlan {
    pub fn badge_count(&self) -> usize {
        self.sections.iter().filter(|s| s.score.is_some()).count()
    }
}

/// Anchor id for a heading text, if any keyword matches.
pub fn anchor_for(title: &str) -> Option<&'static str> {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_digit() && *c != '.')
        .collect();
    let cleaned = cleaned.trim();
    ANCHORS
        .iter()
        .find(|(keyword, _)| cleaned.contains(keyword))
        .map(|(_, id)| *id)
}

/// First `<label> score: N/10` in `html`, with N in 0..=10.
pub fn find_score(html: &str) -> Option<(u8, std::ops::Range<usize>)> {
    SCORE_RE.captures_iter(html).find_map(|caps| {
        let value: u8 = caps[1].parse().ok()?;
        let whole = caps.get(0)?;
        (value <= 10).then(|| (value, whole.range()))
    })
}

/// Remove every score phrase from `html`.
fn scrub_scores(html: &str) -> String {
    let mut out = html.to_string();
    while let Some((_, mut range)) = find_score(&out) {
        if out[..range.start].ends_with(' ') && out[range.end..].starts_with(' ') {
            range.end += 1;
        }
        out.replace_range(range, "");
    }
    let out = EMPTY_MARKUP_RE.replace_all(&out, "");
    out.trim()
        .trim_start_matches(['-', ':', ',', '.'])
        .trim()
        .to_string()
}

fn is_blank_after_scrub(html: &str) -> bool {
    strip_tags(html).trim().is_empty()
}

pub fn plan(doc: &Document) -> PostProcessPlan {
    let mut out = PostProcessPlan::default();
    let headings: Vec<usize> = doc
        .blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.is(TOP_LEVEL))
        .map(|(i, _)| i)
        .collect();

    let mut used_anchors = BTreeSet::new();

    for (n, &heading) in headings.iter().enumerate() {
        let title = doc.blocks[heading].text().trim().to_string();
        let anchor = anchor_for(&title)
            .filter(|id| used_anchors.insert(*id))
            .map(str::to_string);

        let region_end = headings.get(n + 1).copied().unwrap_or(doc.len());
        let region = heading + 1..region_end;

        let has_primary = doc.blocks[region.clone()]
            .iter()
            .any(|b| b.text().to_lowercase().contains(PRIMARY_SCORE_PHRASE));
        let search_end = if has_primary {
            region_end
        } else {
            region_end.min(heading + 1 + MAX_LOOKAHEAD)
        };

        let mut score = None;
        for index in region {
            let block = &doc.blocks[index];
            if !block.is("p") {
                continue;
            }
            let Some((value, _)) = find_score(&block.inner) else {
                continue;
            };
            if score.is_none() && index >= search_end {
                continue;
            }
            if score.is_none() {
                score = Some(Score::new(value));
            }
            let remaining = scrub_scores(&block.inner);
            if is_blank_after_scrub(&remaining) {
                out.removals.insert(index);
            } else {
                out.rewrites.insert(index, remaining);
            }
        }

        out.sections.push(ReportSection {
            block: heading,
            title,
            anchor,
            score,
        });
    }

    out
}

fn heading_html(block: &Block, anchor: Option<&str>) -> String {
    let attrs = ID_ATTR_RE.replace_all(&block.attrs, "");
    match anchor {
        Some(id) => format!(
            r#"<{tag} id="{id}"{attrs}>{inner}</{tag}>"#,
            tag = block.tag,
            inner = block.inner
        ),
        None => block.raw.clone(),
    }
}

pub fn apply(doc: &Document, plan: &PostProcessPlan) -> String {
    let sections: BTreeMap<usize, &ReportSection> =
        plan.sections.iter().map(|s| (s.block, s)).collect();
    let mut out = Vec::with_capacity(doc.len() + sections.len());

    for (index, block) in doc.blocks.iter().enumerate() {
        if plan.removals.contains(&index) {
            continue;
        }

        if let Some(section) = sections.get(&index) {
            out.push(heading_html(block, section.anchor.as_deref()));
            if let Some(score) = section.score {
                out.push(score.badge_html());
            }
            continue;
        }

        match plan.rewrites.get(&index) {
            Some(inner) => out.push(format!(
                "<{tag}{attrs}>{inner}</{tag}>",
                tag = block.tag,
                attrs = block.attrs
            )),
            None => out.push(block.raw.clone()),
        }
    }

    out.join("\n")
}

/// Parse, plan and apply in one go.
pub fn post_process(html: &str) -> (String, Vec<ReportSection>) {
    let doc = Document::parse(html);
    let plan = plan(&doc);
    let out = apply(&doc, &plan);
    (out, plan.sections)
}
