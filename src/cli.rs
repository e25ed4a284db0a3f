use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// critiq: categorized code review feedback from a language model
#[derive(Parser, Debug, Clone)]
#[command(name = "critiq", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,

    /// Path to config file (default: critiq.toml, optional)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Chat-completions endpoint
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Environment variable holding the API key
    #[arg(long, global = true)]
    pub api_key_env: Option<String>,

    /// Model name sent with each request
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Quick review timeout in seconds
    #[arg(long, global = true)]
    pub quick_timeout: Option<u64>,

    /// Report timeout in seconds
    #[arg(long, global = true)]
    pub report_timeout: Option<u64>,

    /// Re-requests allowed when a quick review parses empty
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Directory for saved raw and parsed responses
    #[arg(long, global = true)]
    pub responses_dir: Option<String>,

    /// HTML template for reports
    #[arg(long = "template", global = true)]
    pub template_path: Option<String>,

    /// PDF converter command line; {html} and {pdf} are substituted
    #[arg(long, global = true)]
    pub pdf_command: Option<String>,

    /// Directory with quick-review.md / report-review.md prompt overrides
    #[arg(long, global = true)]
    pub prompts_dir: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Quick review: print feedback grouped by category
    Review {
        /// Source file to review
        file: PathBuf,
    },

    /// Full report: write markdown and HTML next to the source file
    Report {
        /// Source file to review
        file: PathBuf,

        /// Also convert the HTML report to PDF
        #[arg(long)]
        pdf: bool,
    },

    /// Convert an existing markdown report to HTML without calling the model
    Render {
        /// Markdown report to convert
        markdown: PathBuf,

        /// Also convert the HTML report to PDF
        #[arg(long)]
        pdf: bool,
    },

    /// Parse a saved raw response and print the categories as JSON
    Parse {
        /// Raw response text file
        response: PathBuf,
    },

    /// Show one feedback item from a saved JSON result
    Show {
        /// Parsed feedback JSON file
        json: PathBuf,

        /// Category label, e.g. "Security Issues"
        #[arg(long)]
        category: String,

        /// Item number within the category, starting at 1
        #[arg(long, default_value_t = 1)]
        index: usize,
    },
}
