mod common;

use std::path::PathBuf;
use std::time::Duration;

use common::{
    QUICK_RESPONSE, RecordingNotifier, REPORT_RESPONSE, ScriptedProvider, default_test_config,
};
use critiq::category::Category;
use critiq::config::Config;
use critiq::error::Error;
use critiq::llm::Mode;
use critiq::review::{ReportPublisher, ReviewService};
use critiq::store::ResponseStore;
use tempfile::TempDir;

fn source_file(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, "var x = eval(input);\n").unwrap();
    path
}

fn service<'a>(
    config: &'a Config,
    provider: &'a ScriptedProvider,
) -> ReviewService<'a, &'a ScriptedProvider, RecordingNotifier> {
    ReviewService::with_notifier(config, provider, RecordingNotifier::default())
}

#[tokio::test]
async fn quick_review_parses_and_saves() {
    let dir = TempDir::new().unwrap();
    let config = default_test_config(dir.path());
    let provider = ScriptedProvider::new(&[QUICK_RESPONSE]);
    let file = source_file(&dir, "app.js");

    let review = service(&config, &provider).review_file(&file).await.unwrap();

    assert_eq!(review.attempts, 1);
    assert_eq!(review.feedback.len(), 10);
    let serious = review.feedback.get(Category::SeriousProblems);
    assert_eq!(serious.len(), 2);
    assert!(serious[1].ends_with("```js\nconst x = 1;\n```"));
    assert!(review.feedback.get(Category::Warnings).is_empty());
    assert_eq!(review.feedback.get(Category::SecurityIssues).len(), 1);

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].0, Mode::Quick);
    assert!(prompts[0].1.contains("var x = eval(input);"));
    assert!(prompts[0].1.contains("app.js"));

    let saved = review.saved.unwrap();
    assert!(saved.raw_path.starts_with(dir.path().join("responses")));
    let loaded = ResponseStore::new(&config.responses_dir)
        .load_parsed(&saved.json_path.unwrap())
        .unwrap();
    assert_eq!(loaded, review.feedback);
}

#[tokio::test]
async fn empty_responses_stop_at_retry_bound() {
    let dir = TempDir::new().unwrap();
    let config = default_test_config(dir.path());
    let provider = ScriptedProvider::new(&["I cannot review this file."]);
    let file = source_file(&dir, "app.py");

    let svc = service(&config, &provider);
    let err = svc.review_file(&file).await.unwrap_err();

    assert!(matches!(err, Error::EmptyResponse(3)));
    assert_eq!(provider.calls(), 3);
    assert_eq!(svc.notifier().warnings().len(), 2);
}

#[tokio::test]
async fn zero_retries_means_single_attempt() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        max_retries: 0,
        ..default_test_config(dir.path())
    };
    let provider = ScriptedProvider::new(&[""]);
    let file = source_file(&dir, "app.py");

    let err = service(&config, &provider).review_file(&file).await.unwrap_err();
    assert!(matches!(err, Error::EmptyResponse(1)));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn empty_then_valid_response_recovers() {
    let dir = TempDir::new().unwrap();
    let config = default_test_config(dir.path());
    let provider = ScriptedProvider::new(&["#### Warnings\nNo issues found.", QUICK_RESPONSE]);
    let file = source_file(&dir, "app.ts");

    let review = service(&config, &provider).review_file(&file).await.unwrap();
    assert_eq!(review.attempts, 2);
    assert_eq!(provider.calls(), 2);
    assert_eq!(review.feedback.total_items(), 4);
}

#[tokio::test]
async fn every_attempt_keeps_its_raw_response() {
    let dir = TempDir::new().unwrap();
    let config = default_test_config(dir.path());
    let provider = ScriptedProvider::new(&["nothing useful", "still nothing", QUICK_RESPONSE]);
    let file = source_file(&dir, "app.js");

    let review = service(&config, &provider).review_file(&file).await.unwrap();
    assert_eq!(review.attempts, 3);

    let mut raw = Vec::new();
    let mut json = 0;
    for entry in std::fs::read_dir(&config.responses_dir).unwrap() {
        let path = entry.unwrap().path();
        match path.extension().and_then(|e| e.to_str()) {
            Some("txt") => raw.push(std::fs::read_to_string(&path).unwrap()),
            Some("json") => json += 1,
            _ => {}
        }
    }
    assert_eq!(raw.len(), 3);
    assert_eq!(json, 1);
    assert!(raw.iter().any(|r| r == "nothing useful"));
    assert!(raw.iter().any(|r| r == "still nothing"));
}

#[tokio::test]
async fn timeout_substitutes_fallback() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        quick_timeout: 1,
        ..default_test_config(dir.path())
    };
    let provider = ScriptedProvider::new(&[QUICK_RESPONSE]).with_delay(Duration::from_secs(30));
    let file = source_file(&dir, "main.go");

    let svc = service(&config, &provider);
    let review = svc.review_file(&file).await.unwrap();

    assert_eq!(review.feedback.total_items(), 1);
    assert!(review.feedback.get(Category::OtherFeedback)[0].contains("timed out"));
    assert!(svc.notifier().warnings().iter().any(|w| w.contains("within 1s")));
}

#[tokio::test]
async fn unsupported_file_sends_no_request() {
    let dir = TempDir::new().unwrap();
    let config = default_test_config(dir.path());
    let provider = ScriptedProvider::new(&[QUICK_RESPONSE]);
    let file = source_file(&dir, "notes.txt");

    let err = service(&config, &provider).review_file(&file).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedFileType(_)));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn missing_file_is_no_input() {
    let dir = TempDir::new().unwrap();
    let config = default_test_config(dir.path());
    let provider = ScriptedProvider::new(&[QUICK_RESPONSE]);

    let err = service(&config, &provider)
        .review_file(&dir.path().join("gone.rs"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoInput(_)));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn report_writes_markdown_html_and_assets() {
    let dir = TempDir::new().unwrap();
    let config = default_test_config(dir.path());
    let provider = ScriptedProvider::new(&[REPORT_RESPONSE]);
    let file = source_file(&dir, "app.js");

    let svc = service(&config, &provider);
    let artifacts = svc.generate_report(&file, false).await.unwrap();

    assert_eq!(artifacts.markdown, dir.path().join("app-review.md"));
    assert_eq!(
        std::fs::read_to_string(&artifacts.markdown).unwrap(),
        REPORT_RESPONSE
    );
    let html_path = artifacts.html.unwrap();
    assert_eq!(html_path, dir.path().join("app-review.html"));
    assert!(artifacts.pdf.is_none());
    assert!(dir.path().join("assets/report.css").is_file());
    assert!(dir.path().join("assets/report.js").is_file());

    let html = std::fs::read_to_string(&html_path).unwrap();
    assert!(html.contains("<title>Code Review: app.js</title>"));
    assert!(html.contains(r#"<h2 id="executive-summary">"#));
    assert!(html.contains(r#"<h2 id="security">"#));
    assert!(html.contains(r#"<h2 id="recommendations">"#));
    assert!(html.contains(r#"<div class="score-badge score-medium">6/10</div>"#));
    assert!(html.contains(r#"<div class="score-badge score-bad">3/10</div>"#));
    assert!(html.contains("<strong>I/O</strong>"));
    assert!(html.contains("eval(req.body.code);"));
    assert!(!html.contains("Sure! Here is the report."));
    assert!(!html.contains("CODE_BLOCK_PLACEHOLDER"));

    assert_eq!(provider.prompts()[0].0, Mode::Report);
    assert!(svc.notifier().warnings().is_empty());
    assert!(
        artifacts
            .sections
            .iter()
            .any(|s| s.anchor.as_deref() == Some("security"))
    );
}

#[tokio::test]
async fn unwritable_markdown_path_falls_back_to_responses_dir() {
    let dir = TempDir::new().unwrap();
    let config = default_test_config(dir.path());
    let provider = ScriptedProvider::new(&[REPORT_RESPONSE]);
    let file = source_file(&dir, "app.js");
    // a directory where the markdown file would go
    std::fs::create_dir(dir.path().join("app-review.md")).unwrap();

    let svc = service(&config, &provider);
    let artifacts = svc.generate_report(&file, false).await.unwrap();

    let fallback = config.responses_dir.join("app-review.md");
    assert_eq!(artifacts.markdown, fallback);
    assert_eq!(std::fs::read_to_string(&fallback).unwrap(), REPORT_RESPONSE);
    assert_eq!(
        artifacts.html.unwrap(),
        config.responses_dir.join("app-review.html")
    );
    let warnings = svc.notifier().warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("app-review.md"));
}

#[cfg(unix)]
#[tokio::test]
async fn report_pdf_uses_configured_converter() {
    let dir = TempDir::new().unwrap();
    let config = default_test_config(dir.path());
    let provider = ScriptedProvider::new(&[REPORT_RESPONSE]);
    let file = source_file(&dir, "app.js");

    let artifacts = service(&config, &provider)
        .generate_report(&file, true)
        .await
        .unwrap();
    let pdf = artifacts.pdf.unwrap();
    assert_eq!(pdf, dir.path().join("app-review.pdf"));
    assert!(pdf.is_file());
}

#[tokio::test]
async fn pdf_failure_keeps_html() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        pdf_command: "no-such-pdf-converter-xyz {html} {pdf}".to_string(),
        ..default_test_config(dir.path())
    };
    let provider = ScriptedProvider::new(&[REPORT_RESPONSE]);
    let file = source_file(&dir, "app.js");

    let svc = service(&config, &provider);
    let artifacts = svc.generate_report(&file, true).await.unwrap();

    assert!(artifacts.pdf.is_none());
    assert!(artifacts.html.unwrap().is_file());
    let warnings = svc.notifier().warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("HTML report"));
}

#[tokio::test]
async fn missing_template_falls_back_with_warning() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        template_path: Some(dir.path().join("missing.html")),
        ..default_test_config(dir.path())
    };
    let notifier = RecordingNotifier::default();
    let md = dir.path().join("lib-review.md");
    std::fs::write(&md, "# Review\n## Conclusion\nFine.").unwrap();

    let artifacts = ReportPublisher::new(&config, &notifier)
        .render_markdown(&md, false)
        .await
        .unwrap();

    let html = std::fs::read_to_string(artifacts.html.unwrap()).unwrap();
    assert!(html.contains("<title>Code Review: lib</title>"));
    assert!(html.contains(r#"<h2 id="conclusion">"#));
    assert!(notifier.warnings()[0].contains("built-in"));
}

#[tokio::test]
async fn render_missing_markdown_is_no_input() {
    let dir = TempDir::new().unwrap();
    let config = default_test_config(dir.path());
    let notifier = RecordingNotifier::default();
    let err = ReportPublisher::new(&config, &notifier)
        .render_markdown(&dir.path().join("nope.md"), false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoInput(_)));
}
