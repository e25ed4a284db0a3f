#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use critiq::config::Config;
use critiq::error::Result;
use critiq::llm::{CompletionProvider, Mode};
use critiq::review::Notifier;

/// Sensible default `Config` for tests. Callers can override fields via struct update syntax.
pub fn default_test_config(dir: &Path) -> Config {
    Config {
        api_url: "http://127.0.0.1:1/v1/chat/completions".to_string(),
        api_key_env: "CRITIQ_TEST_API_KEY".to_string(),
        model: "test-model".to_string(),
        quick_timeout: 5,
        report_timeout: 5,
        max_retries: 2,
        responses_dir: dir.join("responses"),
        template_path: None,
        pdf_command: "cp {html} {pdf}".to_string(),
        prompts_dir: None,
    }
}

/// Replays canned responses in order; the last one repeats.
pub struct ScriptedProvider {
    responses: Vec<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<(Mode, String)>>,
}

impl ScriptedProvider {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: responses.iter().map(|s| s.to_string()).collect(),
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<(Mode, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, prompt: &str, mode: Mode) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push((mode, prompt.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let idx = n.min(self.responses.len().saturating_sub(1));
        Ok(self.responses.get(idx).cloned().unwrap_or_default())
    }
}

impl CompletionProvider for &ScriptedProvider {
    async fn complete(&self, prompt: &str, mode: Mode) -> Result<String> {
        (**self).complete(prompt, mode).await
    }
}

/// Collects notifier messages for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    pub infos: Mutex<Vec<String>>,
    pub warnings: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

pub const QUICK_RESPONSE: &str = "\
#### Serious Problems
1. Use const instead of var
2. Avoid nested callbacks
```js
const x = 1;
```
#### Warnings
No issues found.
#### Refactoring Suggestions
- Extract the retry loop into a helper
#### Coding Conventions
No issues found.
#### Performance Optimization
No issues found.
#### Security Issues
- `eval` is called on user input
#### Best Practices
No issues found.
#### Readability and Maintainability
No issues found.
#### Code Style and Formatting
No issues found.
#### Other Feedback
No issues found.
";

pub const REPORT_RESPONSE: &str = "\
Sure! Here is the report.

# Code Review: app.js

## 1. Executive Summary
Section Score: 6/10

The module works but mixes **I/O** and *parsing*.

## 2. Security Analysis
Security score: 3/10

- `eval` runs on request data
- Secrets are logged

```js
eval(req.body.code);
```

## 3. Recommendations
1. Remove eval
";
