use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    ConfigValidation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no input file: {0}")]
    NoInput(PathBuf),

    #[error("unsupported file type: {0} (see `critiq review --help` for supported extensions)")]
    UnsupportedFileType(String),

    #[error("model request timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion error: {0}")]
    Completion(String),

    #[error("model returned no usable feedback after {0} attempt(s)")]
    EmptyResponse(u32),

    #[error("not found: {0}")]
    ItemNotFound(String),

    #[error("prompt error: {0}")]
    Prompt(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("response store error: {0}")]
    Store(String),

    #[error("process error: {0}")]
    Process(String),

    #[error("pdf error: {0}")]
    Pdf(String),
}

pub type Result<T> = std::result::Result<T, Error>;
