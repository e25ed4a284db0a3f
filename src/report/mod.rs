//! Full HTML report assembly: markdown conversion, section post-processing,
//! template fill and companion assets.

pub mod document;
pub mod postprocess;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::markdown::MarkdownConverter;
use postprocess::ReportSection;

pub const DEFAULT_TEMPLATE: &str = include_str!("assets/report.html");
pub const STYLESHEET: &str = include_str!("assets/report.css");
pub const SCRIPT: &str = include_str!("assets/report.js");

pub const ASSETS_DIR: &str = "assets";
const STYLESHEET_NAME: &str = "report.css";
const SCRIPT_NAME: &str = "report.js";
const TEMPLATE_NAME: &str = "report";

/// Relative paths the page uses to reach its stylesheet and script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    pub stylesheet: String,
    pub script: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            stylesheet: format!("{ASSETS_DIR}/{STYLESHEET_NAME}"),
            script: format!("{ASSETS_DIR}/{SCRIPT_NAME}"),
        }
    }
}

/// Write the stylesheet and script into `<dir>/assets/`.
pub fn write_assets(dir: &Path) -> Result<AssetPaths> {
    let assets_dir = dir.join(ASSETS_DIR);
    std::fs::create_dir_all(&assets_dir)?;
    std::fs::write(assets_dir.join(STYLESHEET_NAME), STYLESHEET)?;
    std::fs::write(assets_dir.join(SCRIPT_NAME), SCRIPT)?;
    debug!(dir = %assets_dir.display(), "report assets written");
    Ok(AssetPaths::default())
}

#[derive(Debug, Serialize)]
struct TemplateContext<'a> {
    title: &'a str,
    content: &'a str,
    stylesheet: &'a str,
    script: &'a str,
    generated_at: &'a str,
    sections: &'a [ReportSection],
}

/// HTML page template rendered with `upon`.
pub struct ReportTemplate {
    engine: upon::Engine<'static>,
}

impl ReportTemplate {
    pub fn builtin() -> Self {
        Self::compile(DEFAULT_TEMPLATE.to_string()).unwrap_or_else(|_| Self::minimal_engine())
    }

    /// Load a user template. Fails if the file is missing or does not compile.
    pub fn from_path(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::Template(format!("failed to read template {}: {e}", path.display()))
        })?;
        Self::compile(source)
    }

    /// The configured template if it loads, otherwise the built-in one.
    /// Returns a warning message when falling back.
    pub fn load(path: Option<&Path>) -> (Self, Option<String>) {
        let Some(path) = path else {
            return (Self::builtin(), None);
        };
        match Self::from_path(path) {
            Ok(template) => (template, None),
            Err(e) => {
                warn!(error = %e, "falling back to built-in report template");
                (
                    Self::builtin(),
                    Some(format!("{e}; using the built-in report template")),
                )
            }
        }
    }

    fn compile(source: String) -> Result<Self> {
        let mut engine = upon::Engine::new();
        engine
            .add_template(TEMPLATE_NAME, source)
            .map_err(|e| Error::Template(format!("invalid report template: {e}")))?;
        Ok(Self { engine })
    }

    fn minimal_engine() -> Self {
        Self {
            engine: upon::Engine::new(),
        }
    }

    fn render(&self, ctx: &TemplateContext<'_>) -> Result<String> {
        self.engine
            .template(TEMPLATE_NAME)
            .render(ctx)
            .to_string()
            .map_err(|e| Error::Template(format!("failed to render report: {e}")))
    }
}

/// Bare page used when the template cannot be rendered.
fn minimal_document(ctx: &TemplateContext<'_>) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n<title>{title}</title>\n<link rel=\"stylesheet\" href=\"{css}\">\n</head>\n<body>\n<h1>{title}</h1>\n<p class=\"generated-at\">Generated {at}</p>\n{content}\n<script src=\"{js}\"></script>\n</body>\n</html>\n",
        title = ctx.title,
        css = ctx.stylesheet,
        at = ctx.generated_at,
        content = ctx.content,
        js = ctx.script,
    )
}

/// A rendered report page with what was learned while building it.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub html: String,
    pub sections: Vec<ReportSection>,
    pub code_blocks: usize,
    /// Code block placeholders that survived into the page.
    pub unmatched: Vec<String>,
    /// Set when the template failed and the minimal page was used.
    pub template_error: Option<String>,
}

pub struct ReportRenderer {
    template: ReportTemplate,
    converter: MarkdownConverter,
}

impl ReportRenderer {
    pub fn new(template: ReportTemplate) -> Self {
        Self {
            template,
            converter: MarkdownConverter::default(),
        }
    }

    pub fn with_converter(mut self, converter: MarkdownConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn render(&self, markdown: &str, title: &str, assets: &AssetPaths) -> RenderedReport {
        let generated_at = chrono::Local::now()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        self.render_at(markdown, title, assets, &generated_at)
    }

    pub fn render_at(
        &self,
        markdown: &str,
        title: &str,
        assets: &AssetPaths,
        generated_at: &str,
    ) -> RenderedReport {
        let conversion = self.converter.convert(markdown);
        let (content, sections) = postprocess::post_process(&conversion.html);

        let ctx = TemplateContext {
            title,
            content: &content,
            stylesheet: &assets.stylesheet,
            script: &assets.script,
            generated_at,
            sections: &sections,
        };

        let (html, template_error) = match self.template.render(&ctx) {
            Ok(html) => (html, None),
            Err(e) => {
                warn!(error = %e, "report template failed, using minimal page");
                (minimal_document(&ctx), Some(e.to_string()))
            }
        };

        RenderedReport {
            html,
            sections,
            code_blocks: conversion.code_blocks,
            unmatched: conversion.unmatched,
            template_error,
        }
    }
}

/// `<dir>/<stem>.html` next to a markdown report.
pub fn html_path_for(markdown_path: &Path) -> PathBuf {
    markdown_path.with_extension("html")
}
