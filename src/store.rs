use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::category::Category;
use crate::error::{Error, Result};
use crate::feedback::ParseResult;
use crate::llm::Mode;

/// Paths written for one model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedResponse {
    pub raw_path: PathBuf,
    pub json_path: Option<PathBuf>,
}

/// Persists raw responses and parsed feedback under a responses directory.
pub struct ResponseStore {
    dir: PathBuf,
}

impl ResponseStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{stem}-{mode}-{timestamp}`, with a `-N` suffix when a response of the
    /// same name is already on disk.
    fn base_name(&self, stem: &str, mode: Mode) -> String {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S-%3f");
        let base = format!("{stem}-{mode}-{stamp}");
        let taken = |name: &str| {
            self.dir.join(format!("{name}.txt")).exists()
                || self.dir.join(format!("{name}.json")).exists()
        };
        if !taken(&base) {
            return base;
        }
        (2..)
            .map(|n| format!("{base}-{n}"))
            .find(|name| !taken(name))
            .unwrap_or(base)
    }

    /// Write the raw text and, when given, the parsed feedback as JSON.
    pub fn save(
        &self,
        stem: &str,
        mode: Mode,
        raw: &str,
        parsed: Option<&ParseResult>,
    ) -> Result<SavedResponse> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| Error::Store(format!("failed to create responses dir: {e}")))?;

        let base = self.base_name(stem, mode);
        let raw_path = self.dir.join(format!("{base}.txt"));
        std::fs::write(&raw_path, raw)
            .map_err(|e| Error::Store(format!("failed to write raw response: {e}")))?;

        let json_path = match parsed {
            Some(result) => {
                let path = self.dir.join(format!("{base}.json"));
                write_json(&path, result)?;
                Some(path)
            }
            None => None,
        };

        debug!(raw = %raw_path.display(), "response saved");
        Ok(SavedResponse {
            raw_path,
            json_path,
        })
    }

    /// Load parsed feedback, repairing the file if it is malformed.
    ///
    /// Non-string and blank entries and unknown keys are dropped, missing
    /// categories are added empty, and the cleaned result is written back.
    /// Text that is not JSON at all yields an empty result and the file is
    /// left as it is.
    pub fn load_parsed(&self, path: &Path) -> Result<ParseResult> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Store(format!("failed to read {}: {e}", path.display())))?;

        let value: serde_json::Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                warn!("unparseable feedback file {}: {e}", path.display());
                return Ok(ParseResult::default());
            }
        };

        let result = sanitize(&value);
        let clean = serde_json::to_value(&result)
            .map_err(|e| Error::Store(format!("failed to serialize feedback: {e}")))?;
        if clean != value {
            warn!("repaired feedback file {}", path.display());
            write_json(path, &result)?;
        }

        Ok(result)
    }
}

fn write_json(path: &Path, result: &ParseResult) -> Result<()> {
    let content = serde_json::to_string_pretty(result)
        .map_err(|e| Error::Store(format!("failed to serialize feedback: {e}")))?;
    std::fs::write(path, content)
        .map_err(|e| Error::Store(format!("failed to write {}: {e}", path.display())))
}

/// Build a `ParseResult` from loosely shaped JSON.
pub fn sanitize(value: &serde_json::Value) -> ParseResult {
    let mut result = ParseResult::default();
    let Some(object) = value.as_object() else {
        return result;
    };

    for (key, entries) in object {
        let Some(category) = Category::from_label(key) else {
            continue;
        };
        let items: Vec<String> = entries
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|v| v.as_str())
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        result.set(category, items);
    }

    result
}
