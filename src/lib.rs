pub mod category;
pub mod cli;
pub mod config;
pub mod error;
pub mod feedback;
pub mod llm;
pub mod markdown;
pub mod pdf;
pub mod process;
pub mod prompts;
pub mod report;
pub mod review;
pub mod segmenter;
pub mod source;
pub mod store;
