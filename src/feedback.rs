use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use crate::category::Category;
use crate::segmenter::segment;

static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^####[ \t]+(.*)$").expect("valid regex"));

/// Phrases that mark a section as having nothing to report.
const NO_ISSUE_MARKERS: &[&str] = &["no issues found", "no problems", "✅"];

/// Parsed structured feedback: every category is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult {
    items: BTreeMap<Category, Vec<String>>,
}

impl Default for ParseResult {
    fn default() -> Self {
        Self {
            items: Category::ALL.into_iter().map(|c| (c, Vec::new())).collect(),
        }
    }
}

impl ParseResult {
    pub fn get(&self, category: Category) -> &[String] {
        self.items.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set(&mut self, category: Category, items: Vec<String>) {
        self.items.insert(category, items);
    }

    /// Categories with their items, in taxonomy order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[String])> {
        self.items.iter().map(|(c, items)| (*c, items.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.values().all(Vec::is_empty)
    }

    pub fn total_items(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }
}

impl Serialize for ParseResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.items.len()))?;
        for (category, items) in &self.items {
            map.serialize_entry(category.label(), items)?;
        }
        map.end()
    }
}

/// Parse a quick-review response made of `#### <Category>` sections.
///
/// Unknown section names are dropped, sections that only say there is nothing
/// to report stay empty, and a repeated header overwrites the earlier one.
/// Never fails: unrecognizable input yields an all-empty result.
pub fn parse_feedback(response: &str) -> ParseResult {
    let mut result = ParseResult::default();
    let text = normalize(response);
    if text.is_empty() {
        return result;
    }

    for (name, content) in sections(&text) {
        let Some(category) = Category::from_label(name) else {
            debug!(section = name, "dropping unrecognized section");
            continue;
        };
        if content.trim().is_empty() {
            continue;
        }
        let lowered = content.to_lowercase();
        if NO_ISSUE_MARKERS.iter().any(|m| lowered.contains(m)) {
            continue;
        }
        result.set(category, segment(content));
    }

    result
}

fn normalize(response: &str) -> String {
    let unified = response.replace("\r\n", "\n").replace('\r', "\n");
    unified
        .lines()
        .map(str::trim_start)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// `(header name, body)` pairs in order of appearance.
fn sections(text: &str) -> Vec<(&str, &str)> {
    let headers: Vec<_> = SECTION_RE.captures_iter(text).collect();
    let mut out = Vec::with_capacity(headers.len());

    for (i, caps) in headers.iter().enumerate() {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = headers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());
        out.push((name.as_str().trim(), &text[whole.end()..end]));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_sections(body: &str) -> String {
        Category::ALL
            .iter()
            .map(|c| format!("#### {}\n{body}\n", c.label()))
            .collect()
    }

    #[test]
    fn test_empty_input_has_all_categories() {
        for input in ["", "   \n\t\n"] {
            let result = parse_feedback(input);
            assert_eq!(result.len(), 10);
            assert!(result.is_empty());
        }
    }

    #[test]
    fn test_well_formed_response() {
        let input = ten_sections("1. first\n2. second");
        let result = parse_feedback(&input);
        assert_eq!(result.len(), 10);
        for (_, items) in result.iter() {
            assert_eq!(items, ["first", "second"]);
        }
        assert_eq!(result.total_items(), 20);
    }

    #[test]
    fn test_no_issues_phrase_leaves_category_empty() {
        let input = "#### Serious Problems\nNo issues found.\n#### Warnings\n- Unused variable";
        let result = parse_feedback(input);
        assert!(result.get(Category::SeriousProblems).is_empty());
        assert_eq!(result.get(Category::Warnings), ["Unused variable"]);
    }

    #[test]
    fn test_other_empty_markers() {
        let input = "#### Security Issues\n✅ Looks fine\n#### Best Practices\nThere are NO PROBLEMS here";
        let result = parse_feedback(input);
        assert!(result.is_empty());
    }

    #[test]
    fn test_unknown_sections_are_dropped() {
        let input = "#### Summary\n- not a category\n#### Warnings\n- real";
        let result = parse_feedback(input);
        assert_eq!(result.len(), 10);
        assert_eq!(result.total_items(), 1);
        assert_eq!(result.get(Category::Warnings), ["real"]);
    }

    #[test]
    fn test_header_names_are_case_sensitive() {
        let result = parse_feedback("#### serious problems\n- lower case header");
        assert!(result.is_empty());
    }

    #[test]
    fn test_repeated_header_last_wins() {
        let input = "#### Warnings\n- first\n#### Warnings\n- second";
        let result = parse_feedback(input);
        assert_eq!(result.get(Category::Warnings), ["second"]);
    }

    #[test]
    fn test_crlf_and_indentation_normalized() {
        let input = "  #### Warnings\r\n    1. indented item\r\n    continued\r\n";
        let result = parse_feedback(input);
        assert_eq!(result.get(Category::Warnings), ["indented item\ncontinued"]);
    }

    #[test]
    fn test_fenced_code_stays_in_bullet() {
        let input = "#### Refactoring Suggestions\n1. Extract helper\n```js\nfunction helper() {}\n```\n2. Rename";
        let result = parse_feedback(input);
        assert_eq!(
            result.get(Category::RefactoringSuggestions),
            [
                "Extract helper\n```js\nfunction helper() {}\n```",
                "Rename"
            ]
        );
    }

    #[test]
    fn test_deeper_headers_are_not_sections() {
        let result = parse_feedback("##### Warnings\n- nope");
        assert!(result.is_empty());
    }

    #[test]
    fn test_serializes_in_taxonomy_order() {
        let mut result = ParseResult::default();
        result.set(Category::OtherFeedback, vec!["x".to_string()]);
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.starts_with(r#"{"Serious Problems":[]"#));
        assert!(json.ends_with(r#""Other Feedback":["x"]}"#));
    }

    #[test]
    fn test_reparsing_serialized_json_is_harmless() {
        let result = parse_feedback(&ten_sections("- item"));
        let json = serde_json::to_string_pretty(&result).unwrap();
        let again = parse_feedback(&json);
        assert_eq!(again.len(), 10);
        assert!(again.is_empty());
    }
}
