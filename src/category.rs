use std::fmt;

use serde::Serialize;

/// Display severity of a feedback category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// The fixed feedback taxonomy. Declaration order is taxonomy order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    SeriousProblems,
    Warnings,
    RefactoringSuggestions,
    CodingConventions,
    PerformanceOptimization,
    SecurityIssues,
    BestPractices,
    ReadabilityAndMaintainability,
    CodeStyleAndFormatting,
    OtherFeedback,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::SeriousProblems,
        Category::Warnings,
        Category::RefactoringSuggestions,
        Category::CodingConventions,
        Category::PerformanceOptimization,
        Category::SecurityIssues,
        Category::BestPractices,
        Category::ReadabilityAndMaintainability,
        Category::CodeStyleAndFormatting,
        Category::OtherFeedback,
    ];

    /// Header text as it appears in the model response.
    pub fn label(self) -> &'static str {
        match self {
            Category::SeriousProblems => "Serious Problems",
            Category::Warnings => "Warnings",
            Category::RefactoringSuggestions => "Refactoring Suggestions",
            Category::CodingConventions => "Coding Conventions",
            Category::PerformanceOptimization => "Performance Optimization",
            Category::SecurityIssues => "Security Issues",
            Category::BestPractices => "Best Practices",
            Category::ReadabilityAndMaintainability => "Readability and Maintainability",
            Category::CodeStyleAndFormatting => "Code Style and Formatting",
            Category::OtherFeedback => "Other Feedback",
        }
    }

    /// Exact, case-sensitive lookup after trimming surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Category> {
        let label = label.trim();
        Category::ALL.into_iter().find(|c| c.label() == label)
    }

    pub fn severity(self) -> Severity {
        match self {
            Category::SeriousProblems => Severity::Error,
            Category::Warnings | Category::SecurityIssues => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
