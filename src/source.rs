use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Extensions accepted for review, with the language name used in prompts.
pub const SUPPORTED_EXTENSIONS: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("py", "python"),
    ("java", "java"),
    ("c", "c"),
    ("cpp", "cpp"),
    ("cc", "cpp"),
    ("h", "c"),
    ("hpp", "cpp"),
    ("cs", "csharp"),
    ("go", "go"),
    ("rb", "ruby"),
    ("php", "php"),
    ("rs", "rust"),
    ("swift", "swift"),
    ("kt", "kotlin"),
    ("kts", "kotlin"),
    ("scala", "scala"),
    ("m", "objectivec"),
    ("mm", "objectivec"),
    ("sh", "bash"),
    ("html", "html"),
    ("css", "css"),
    ("vue", "vue"),
    ("dart", "dart"),
    ("lua", "lua"),
    ("r", "r"),
    ("sql", "sql"),
];

/// Language name for a supported extension (case-insensitive).
pub fn language_for(extension: &str) -> Option<&'static str> {
    let extension = extension.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, lang)| *lang)
}

/// A source file accepted for review.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub language: &'static str,
    pub code: String,
}

impl SourceFile {
    /// Check the extension, then read the file. Unsupported types are
    /// rejected before any I/O.
    pub fn load(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let language = language_for(extension).ok_or_else(|| {
            Error::UnsupportedFileType(if extension.is_empty() {
                path.display().to_string()
            } else {
                format!(".{extension}")
            })
        })?;

        if !path.is_file() {
            return Err(Error::NoInput(path.to_path_buf()));
        }

        let code = std::fs::read_to_string(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            language,
            code,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "review".to_string())
    }
}
