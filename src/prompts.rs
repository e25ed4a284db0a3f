use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::llm::Mode;

const DEFAULT_QUICK: &str = include_str!("default_prompts/quick-review.md");
const DEFAULT_REPORT: &str = include_str!("default_prompts/report-review.md");

fn default_template(mode: Mode) -> &'static str {
    match mode {
        Mode::Quick => DEFAULT_QUICK,
        Mode::Report => DEFAULT_REPORT,
    }
}

fn template_filename(mode: Mode) -> String {
    format!("{mode}-review.md")
}

/// Values available to prompt templates.
#[derive(Debug, Clone, Serialize)]
pub struct PromptVars<'a> {
    pub file_name: &'a str,
    pub language: &'a str,
    pub code: &'a str,
}

/// Prompt template engine with default templates and user overrides.
pub struct PromptEngine {
    override_dir: Option<String>,
}

impl PromptEngine {
    pub fn new(override_dir: Option<String>) -> Self {
        Self { override_dir }
    }

    /// Load the prompt template for a mode.
    /// User overrides in `override_dir` take precedence over defaults.
    pub fn load_template(&self, mode: Mode) -> Result<String> {
        if let Some(ref dir) = self.override_dir {
            let path = Path::new(dir).join(template_filename(mode));
            if path.exists() {
                return std::fs::read_to_string(&path).map_err(|e| {
                    Error::Prompt(format!(
                        "failed to read override template {}: {e}",
                        path.display()
                    ))
                });
            }
        }

        Ok(default_template(mode).to_string())
    }

    /// Load a template and render it with the given variables.
    pub fn render(&self, mode: Mode, vars: &PromptVars<'_>) -> Result<String> {
        let template = self.load_template(mode)?;
        render_template(&template, vars)
    }
}

/// Render a template string. Unknown variables are an error.
pub fn render_template(template: &str, vars: &PromptVars<'_>) -> Result<String> {
    let engine = upon::Engine::new();
    let compiled = engine
        .compile(template)
        .map_err(|e| Error::Prompt(format!("invalid prompt template: {e}")))?;
    compiled
        .render(&engine, vars)
        .to_string()
        .map_err(|e| Error::Prompt(format!("failed to render prompt: {e}")))
}
