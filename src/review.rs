use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::category::Category;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::feedback::{ParseResult, parse_feedback};
use crate::llm::{CompletionProvider, Mode, complete_with_timeout, timeout_fallback};
use crate::pdf::{CommandPdfRenderer, PdfRenderer};
use crate::prompts::{PromptEngine, PromptVars};
use crate::report::postprocess::ReportSection;
use crate::report::{AssetPaths, ReportRenderer, ReportTemplate, html_path_for, write_assets};
use crate::source::SourceFile;
use crate::store::{ResponseStore, SavedResponse};

/// Receives user-facing messages from review and report runs.
pub trait Notifier: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default notifier that prints to stderr.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn info(&self, message: &str) {
        eprintln!("[critiq] {message}");
    }

    fn warn(&self, message: &str) {
        eprintln!("[critiq] warning: {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("[critiq] error: {message}");
    }
}

/// Outcome of a quick review.
#[derive(Debug, Clone)]
pub struct QuickReview {
    pub feedback: ParseResult,
    pub attempts: u32,
    pub saved: Option<SavedResponse>,
}

/// Files produced for a report. `html` and `pdf` are `None` when that step
/// was skipped or failed.
#[derive(Debug, Clone)]
pub struct ReportArtifacts {
    pub markdown: PathBuf,
    pub html: Option<PathBuf>,
    pub pdf: Option<PathBuf>,
    pub sections: Vec<ReportSection>,
}

/// Turns a markdown report into HTML (and optionally PDF) next to it.
pub struct ReportPublisher<'a, N> {
    config: &'a Config,
    notifier: &'a N,
}

impl<'a, N: Notifier> ReportPublisher<'a, N> {
    pub fn new(config: &'a Config, notifier: &'a N) -> Self {
        Self { config, notifier }
    }

    /// Convert an existing markdown report file.
    pub async fn render_markdown(&self, md_path: &Path, pdf: bool) -> Result<ReportArtifacts> {
        if !md_path.is_file() {
            return Err(Error::NoInput(md_path.to_path_buf()));
        }
        let markdown = std::fs::read_to_string(md_path)?;
        let title = title_for(md_path);
        self.publish(md_path, &markdown, &title, pdf).await
    }

    /// Write HTML next to `md_path`, then PDF when asked. Failures after the
    /// markdown exists degrade to the last good artifact with a warning.
    pub async fn publish(
        &self,
        md_path: &Path,
        markdown: &str,
        title: &str,
        pdf: bool,
    ) -> Result<ReportArtifacts> {
        let dir = md_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let assets = match write_assets(dir) {
            Ok(paths) => paths,
            Err(e) => {
                self.notifier
                    .warn(&format!("could not write report assets: {e}"));
                AssetPaths::default()
            }
        };

        let (template, template_warning) =
            ReportTemplate::load(self.config.template_path.as_deref());
        if let Some(message) = template_warning {
            self.notifier.warn(&message);
        }

        let rendered = ReportRenderer::new(template).render(markdown, title, &assets);
        if let Some(ref e) = rendered.template_error {
            self.notifier
                .warn(&format!("{e}; the report uses a minimal page layout"));
        }
        if !rendered.unmatched.is_empty() {
            self.notifier.warn(&format!(
                "{} code block(s) could not be restored: {}",
                rendered.unmatched.len(),
                rendered.unmatched.join(", ")
            ));
        }

        let mut artifacts = ReportArtifacts {
            markdown: md_path.to_path_buf(),
            html: None,
            pdf: None,
            sections: rendered.sections,
        };

        let html_path = html_path_for(md_path);
        if let Err(e) = std::fs::write(&html_path, &rendered.html) {
            self.notifier.warn(&format!(
                "could not write {}: {e}; the markdown report is at {}",
                html_path.display(),
                md_path.display()
            ));
            return Ok(artifacts);
        }
        info!(
            path = %html_path.display(),
            code_blocks = rendered.code_blocks,
            "html report written"
        );
        artifacts.html = Some(html_path.clone());

        if pdf {
            let converted = match CommandPdfRenderer::from_command_line(&self.config.pdf_command) {
                Ok(renderer) => {
                    renderer
                        .with_timeout(self.config.timeout_for(Mode::Report))
                        .render_pdf(&html_path)
                        .await
                }
                Err(e) => Err(e),
            };
            match converted {
                Ok(path) => artifacts.pdf = Some(path),
                Err(e) => self.notifier.warn(&format!(
                    "{e}; the HTML report is at {}",
                    html_path.display()
                )),
            }
        }

        Ok(artifacts)
    }
}

/// Runs model-backed reviews for single source files.
pub struct ReviewService<'a, P, N = StderrNotifier> {
    config: &'a Config,
    provider: P,
    prompts: PromptEngine,
    store: ResponseStore,
    notifier: N,
}

impl<'a, P: CompletionProvider> ReviewService<'a, P> {
    pub fn new(config: &'a Config, provider: P) -> Self {
        Self::with_notifier(config, provider, StderrNotifier)
    }
}

impl<'a, P: CompletionProvider, N: Notifier> ReviewService<'a, P, N> {
    pub fn with_notifier(config: &'a Config, provider: P, notifier: N) -> Self {
        Self {
            config,
            provider,
            prompts: PromptEngine::new(config.prompts_dir.clone()),
            store: ResponseStore::new(config.responses_dir.clone()),
            notifier,
        }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Send one request; a timeout becomes the canned response for the mode.
    async fn request(&self, prompt: &str, mode: Mode) -> Result<String> {
        let deadline = self.config.timeout_for(mode);
        match complete_with_timeout(&self.provider, prompt, mode, deadline).await {
            Err(Error::Timeout(d)) => {
                warn!(%mode, timeout = ?d, "model request timed out, using fallback");
                self.notifier.warn(&format!(
                    "the model did not answer within {}s; showing a placeholder result",
                    d.as_secs()
                ));
                Ok(timeout_fallback(mode))
            }
            other => other,
        }
    }

    fn save(
        &self,
        stem: &str,
        mode: Mode,
        raw: &str,
        parsed: Option<&ParseResult>,
    ) -> Option<SavedResponse> {
        match self.store.save(stem, mode, raw, parsed) {
            Ok(saved) => Some(saved),
            Err(e) => {
                self.notifier.warn(&format!("response not saved: {e}"));
                None
            }
        }
    }

    /// Quick review of one file. An empty parse is re-requested up to
    /// `max_retries` times before failing with `Error::EmptyResponse`.
    pub async fn review_file(&self, path: &Path) -> Result<QuickReview> {
        let source = SourceFile::load(path)?;
        let file_name = source.file_name();
        let prompt = self.prompts.render(
            Mode::Quick,
            &PromptVars {
                file_name: &file_name,
                language: source.language,
                code: &source.code,
            },
        )?;

        let max_attempts = self.config.max_retries + 1;
        let mut attempts = 0;
        loop {
            attempts += 1;
            info!(file = %file_name, attempt = attempts, "requesting quick review");
            let raw = self.request(&prompt, Mode::Quick).await?;
            let feedback = parse_feedback(&raw);

            if !feedback.is_empty() {
                let saved = self.save(&source.stem(), Mode::Quick, &raw, Some(&feedback));
                return Ok(QuickReview {
                    feedback,
                    attempts,
                    saved,
                });
            }

            self.save(&source.stem(), Mode::Quick, &raw, None);
            if attempts >= max_attempts {
                return Err(Error::EmptyResponse(attempts));
            }
            self.notifier.warn(&format!(
                "no feedback parsed from the response, retrying ({attempts}/{max_attempts})"
            ));
        }
    }

    /// Write the markdown next to the source, or into the responses
    /// directory when that location is not writable.
    fn write_markdown(&self, source: &Path, markdown: &str) -> Result<PathBuf> {
        let preferred = markdown_path_for(source);
        let err = match std::fs::write(&preferred, markdown) {
            Ok(()) => return Ok(preferred),
            Err(e) => e,
        };

        let fallback =
            markdown_path_for(&self.store.dir().join(source.file_name().unwrap_or_default()));
        std::fs::create_dir_all(self.store.dir())?;
        std::fs::write(&fallback, markdown)?;
        self.notifier.warn(&format!(
            "could not write {}: {err}; using {} instead",
            preferred.display(),
            fallback.display()
        ));
        Ok(fallback)
    }

    /// Full report: markdown next to the source, then HTML and optional PDF.
    pub async fn generate_report(&self, path: &Path, pdf: bool) -> Result<ReportArtifacts> {
        let source = SourceFile::load(path)?;
        let file_name = source.file_name();
        let prompt = self.prompts.render(
            Mode::Report,
            &PromptVars {
                file_name: &file_name,
                language: source.language,
                code: &source.code,
            },
        )?;

        info!(file = %file_name, "requesting report");
        let markdown = self.request(&prompt, Mode::Report).await?;
        self.save(&source.stem(), Mode::Report, &markdown, None);

        let md_path = self.write_markdown(&source.path, &markdown)?;
        self.notifier
            .info(&format!("markdown report written to {}", md_path.display()));

        let title = format!("Code Review: {file_name}");
        ReportPublisher::new(self.config, &self.notifier)
            .publish(&md_path, &markdown, &title, pdf)
            .await
    }
}

/// `<dir>/<stem>-review.md` next to the reviewed file.
pub fn markdown_path_for(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "code".to_string());
    source.with_file_name(format!("{stem}-review.md"))
}

fn title_for(md_path: &Path) -> String {
    let stem = md_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = stem.strip_suffix("-review").unwrap_or(&stem);
    format!("Code Review: {name}")
}

/// Category tree: each category with its severity and numbered items.
pub fn format_tree(result: &ParseResult) -> String {
    let mut out = String::new();
    for (category, items) in result.iter() {
        let _ = writeln!(
            out,
            "{category} [{}] ({})",
            category.severity(),
            items.len()
        );
        if items.is_empty() {
            out.push_str("  No issues found.\n");
            continue;
        }
        for (i, item) in items.iter().enumerate() {
            let marker = format!("  {}. ", i + 1);
            let indent = " ".repeat(marker.len());
            for (n, line) in item.lines().enumerate() {
                if n == 0 {
                    let _ = writeln!(out, "{marker}{line}");
                } else {
                    let _ = writeln!(out, "{indent}{line}");
                }
            }
        }
    }
    out
}

/// Look up an item by category label and 1-based index.
pub fn find_item<'r>(
    result: &'r ParseResult,
    label: &str,
    index: usize,
) -> Result<(Category, &'r str)> {
    let category = Category::from_label(label)
        .ok_or_else(|| Error::ItemNotFound(format!("unknown category '{label}'")))?;
    let items = result.get(category);
    index
        .checked_sub(1)
        .and_then(|i| items.get(i))
        .map(|item| (category, item.as_str()))
        .ok_or_else(|| {
            Error::ItemNotFound(format!(
                "{category} has {} item(s), no item {index}",
                items.len()
            ))
        })
}

/// Detail view for a single item.
pub fn format_detail(category: Category, index: usize, content: &str) -> String {
    format!(
        "Category: {category}\nSeverity: {}\nItem: {index}\n\n{content}\n",
        category.severity()
    )
}
