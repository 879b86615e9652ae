#![doc = include_str!("../README.md")]

use std::path::PathBuf;

pub mod antigen;
pub mod cli;
pub mod generate;
pub mod output;
pub mod report;
pub mod smart_reader;
pub mod tally;
pub mod template;
pub mod typing;

pub use antigen::{AntigenSet, Locus};
pub use generate::{GenerateConfig, Tabulation, generate_frequency_files, tabulate};
pub use output::{OutputError, OutputFormat};
pub use tally::{FrequencyRecord, FrequencyTally};
pub use template::TemplateError;
pub use typing::{InputError, Typing};

/// Outcome of a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    /// Typings read, the denominator of every probability.
    pub rows: u64,
    pub distinct_sets: usize,
    pub empty_rows: usize,
    pub blank_a_rows: usize,
    pub blank_b_rows: usize,
    pub frequency_path: PathBuf,
    pub metadata_path: PathBuf,
    pub report_path: Option<PathBuf>,
}
