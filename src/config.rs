use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::pdf::DEFAULT_PDF_COMMAND;

pub const DEFAULT_CONFIG_FILE: &str = "critiq.toml";
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_RESPONSES_DIR: &str = ".critiq/responses";
/// Re-requests after an empty quick review (three attempts in total).
pub const MAX_EMPTY_RETRIES: u32 = 2;
const MAX_RETRIES_CAP: u32 = 5;

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub quick_timeout: Option<u64>,
    pub report_timeout: Option<u64>,
    pub max_retries: Option<u32>,
    pub responses_dir: Option<String>,
    pub template_path: Option<String>,
    pub pdf_command: Option<String>,
    pub prompts_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub api_key_env: String,
    pub model: String,
    /// Seconds.
    pub quick_timeout: u64,
    /// Seconds.
    pub report_timeout: u64,
    pub max_retries: u32,
    pub responses_dir: PathBuf,
    pub template_path: Option<PathBuf>,
    pub pdf_command: String,
    pub prompts_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            model: DEFAULT_MODEL.to_string(),
            quick_timeout: 60,
            report_timeout: 180,
            max_retries: MAX_EMPTY_RETRIES,
            responses_dir: PathBuf::from(DEFAULT_RESPONSES_DIR),
            template_path: None,
            pdf_command: DEFAULT_PDF_COMMAND.to_string(),
            prompts_dir: None,
        }
    }
}

impl Config {
    /// Read the config file and merge CLI flags over it.
    ///
    /// An explicit `--config` must exist; the default `critiq.toml` is optional.
    pub fn load(cli: &Cli) -> Result<Self> {
        let file_config = match cli.config {
            Some(ref path) => {
                let path = Path::new(path);
                if !path.exists() {
                    return Err(Error::ConfigNotFound(path.to_path_buf()));
                }
                parse_config(&std::fs::read_to_string(path)?)?
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    parse_config(&std::fs::read_to_string(path)?)?
                } else {
                    ConfigFile::default()
                }
            }
        };

        let config = merge(file_config, cli);
        validate_merged(&config)?;
        Ok(config)
    }

    pub fn timeout_for(&self, mode: crate::llm::Mode) -> Duration {
        match mode {
            crate::llm::Mode::Quick => Duration::from_secs(self.quick_timeout),
            crate::llm::Mode::Report => Duration::from_secs(self.report_timeout),
        }
    }
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    if let Some(ref url) = config.api_url
        && url.trim().is_empty()
    {
        return Err(Error::ConfigValidation(
            "api_url must not be empty".to_string(),
        ));
    }
    if let Some(ref command) = config.pdf_command
        && command.trim().is_empty()
    {
        return Err(Error::ConfigValidation(
            "pdf_command must not be empty".to_string(),
        ));
    }
    check_timeout("quick_timeout", config.quick_timeout)?;
    check_timeout("report_timeout", config.report_timeout)?;
    check_retries(config.max_retries)?;
    Ok(())
}

fn validate_merged(config: &Config) -> Result<()> {
    if config.api_url.trim().is_empty() {
        return Err(Error::ConfigValidation(
            "api_url must not be empty".to_string(),
        ));
    }
    check_timeout("quick_timeout", Some(config.quick_timeout))?;
    check_timeout("report_timeout", Some(config.report_timeout))?;
    check_retries(Some(config.max_retries))
}

fn check_timeout(name: &str, value: Option<u64>) -> Result<()> {
    if value == Some(0) {
        return Err(Error::ConfigValidation(format!("{name} must be > 0")));
    }
    Ok(())
}

fn check_retries(value: Option<u32>) -> Result<()> {
    if let Some(n) = value
        && n > MAX_RETRIES_CAP
    {
        return Err(Error::ConfigValidation(format!(
            "max_retries must be <= {MAX_RETRIES_CAP}"
        )));
    }
    Ok(())
}

pub fn merge(file: ConfigFile, cli: &Cli) -> Config {
    let defaults = Config::default();
    Config {
        api_url: cli
            .api_url
            .clone()
            .or(file.api_url)
            .unwrap_or(defaults.api_url),
        api_key_env: cli
            .api_key_env
            .clone()
            .or(file.api_key_env)
            .unwrap_or(defaults.api_key_env),
        model: cli.model.clone().or(file.model).unwrap_or(defaults.model),
        quick_timeout: cli
            .quick_timeout
            .or(file.quick_timeout)
            .unwrap_or(defaults.quick_timeout),
        report_timeout: cli
            .report_timeout
            .or(file.report_timeout)
            .unwrap_or(defaults.report_timeout),
        max_retries: cli
            .max_retries
            .or(file.max_retries)
            .unwrap_or(defaults.max_retries),
        responses_dir: cli
            .responses_dir
            .clone()
            .or(file.responses_dir)
            .map(PathBuf::from)
            .unwrap_or(defaults.responses_dir),
        template_path: cli
            .template_path
            .clone()
            .or(file.template_path)
            .map(PathBuf::from),
        pdf_command: cli
            .pdf_command
            .clone()
            .or(file.pdf_command)
            .unwrap_or(defaults.pdf_command),
        prompts_dir: cli.prompts_dir.clone().or(file.prompts_dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
api_url = "http://localhost:8080/v1/chat/completions"
model = "local-model"
quick_timeout = 30
report_timeout = 300
max_retries = 1
responses_dir = "/tmp/responses"
pdf_command = "wkhtmltopdf --quiet {html} {pdf}"
"#;
        let config = parse_config(toml).unwrap();
        assert_eq!(config.model.as_deref(), Some("local-model"));
        assert_eq!(config.quick_timeout, Some(30));
        assert_eq!(config.max_retries, Some(1));
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_parse_zero_timeout() {
        let err = parse_config("quick_timeout = 0").unwrap_err();
        assert!(err.to_string().contains("quick_timeout must be > 0"));
        let err = parse_config("report_timeout = 0").unwrap_err();
        assert!(err.to_string().contains("report_timeout must be > 0"));
    }

    #[test]
    fn test_parse_retries_capped() {
        let err = parse_config("max_retries = 9").unwrap_err();
        assert!(err.to_string().contains("max_retries must be <= 5"));
    }

    #[test]
    fn test_parse_empty_api_url() {
        let err = parse_config(r#"api_url = "  ""#).unwrap_err();
        assert!(err.to_string().contains("api_url must not be empty"));
    }

    #[test]
    fn test_parse_empty_pdf_command() {
        let err = parse_config(r#"pdf_command = """#).unwrap_err();
        assert!(err.to_string().contains("pdf_command"));
    }

    #[test]
    fn test_parse_unknown_field() {
        let err = parse_config(r#"bogus = "value""#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn test_cli_overrides_config() {
        let file = ConfigFile {
            model: Some("file-model".to_string()),
            quick_timeout: Some(90),
            responses_dir: Some("file-responses".to_string()),
            ..Default::default()
        };
        let cli = Cli::parse_from([
            "critiq",
            "review",
            "app.js",
            "--model",
            "cli-model",
            "--max-retries",
            "0",
        ]);
        let config = merge(file, &cli);
        assert_eq!(config.model, "cli-model"); // CLI wins
        assert_eq!(config.max_retries, 0); // CLI wins
        assert_eq!(config.quick_timeout, 90); // file value kept
        assert_eq!(config.responses_dir, PathBuf::from("file-responses"));
    }

    #[test]
    fn test_defaults_applied() {
        let cli = Cli::parse_from(["critiq", "review", "app.js"]);
        let config = merge(ConfigFile::default(), &cli);
        assert_eq!(config, Config::default());
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.quick_timeout, 60);
        assert_eq!(config.report_timeout, 180);
        assert_eq!(config.max_retries, MAX_EMPTY_RETRIES);
        assert_eq!(config.pdf_command, "wkhtmltopdf {html} {pdf}");
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let cli = Cli::parse_from([
            "critiq",
            "review",
            "app.js",
            "--config",
            "/nonexistent/critiq.toml",
        ]);
        assert!(matches!(
            Config::load(&cli).unwrap_err(),
            Error::ConfigNotFound(_)
        ));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "model = \"from-file\"\nreport_timeout = 10\n").unwrap();
        let cli = Cli::parse_from([
            "critiq",
            "report",
            "app.js",
            "--config",
            path.to_str().unwrap(),
        ]);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.model, "from-file");
        assert_eq!(
            config.timeout_for(crate::llm::Mode::Report),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_cli_zero_timeout_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("empty.toml");
        std::fs::write(&path, "").unwrap();
        let cli = Cli::parse_from([
            "critiq",
            "review",
            "app.js",
            "--config",
            path.to_str().unwrap(),
            "--quick-timeout",
            "0",
        ]);
        assert!(matches!(
            Config::load(&cli).unwrap_err(),
            Error::ConfigValidation(_)
        ));
    }
}
