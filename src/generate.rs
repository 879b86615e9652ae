use std::path::PathBuf;

use anyhow::{Context as _, Result, ensure};

use crate::{
    GenerationSummary,
    antigen::{AntigenSet, Locus},
    output::{self, OutputFormat, OutputPaths},
    report::RunReportBuilder,
    tally::FrequencyTally,
    template::{Context, TemplateSet},
    typing::{self, InputError, Typing},
};

/// Label of the single population stratum.
pub const DEFAULT_STRATUM: &str = "Default";
/// Weight of the single population stratum, as written to the metadata.
pub const DEFAULT_STRATUM_WEIGHT: &str = "1.00";
/// Decimal digits of rendered probabilities.
pub const DEFAULT_PRECISION: usize = 24;

/// Configuration required to drive a generation run.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub input: PathBuf,
    pub freq_name: String,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    /// Directory holding custom `template_freq.csv` / `template_meta.csv`.
    pub template_dir: Option<PathBuf>,
    pub precision: usize,
    pub write_report: bool,
}

impl GenerateConfig {
    pub fn new(input: impl Into<PathBuf>, freq_name: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            freq_name: freq_name.into(),
            output_dir: PathBuf::from("."),
            format: OutputFormat::default(),
            template_dir: None,
            precision: DEFAULT_PRECISION,
            write_report: false,
        }
    }
}

/// Result of scanning a typing table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tabulation {
    pub tally: FrequencyTally,
    /// Typings without a single antigen.
    pub empty_rows: usize,
    pub blank_a_rows: usize,
    pub blank_b_rows: usize,
}

/// Counts the antigen sets of every typing. Stops at the first bad row.
pub fn tabulate<I>(typings: I) -> Result<Tabulation, InputError>
where
    I: IntoIterator<Item = Result<Typing, InputError>>,
{
    let mut tabulation = Tabulation::default();

    for typing in typings {
        let typing = typing?;
        let antigens = AntigenSet::from_typing(&typing);

        if antigens.is_empty() {
            tracing::debug!(line = typing.line, "typing carries no antigens");
            tabulation.empty_rows += 1;
        }
        if antigens.locus_count(Locus::A) == 0 {
            tabulation.blank_a_rows += 1;
        }
        if antigens.locus_count(Locus::B) == 0 {
            tabulation.blank_b_rows += 1;
        }

        tabulation.tally.add(antigens);
    }

    Ok(tabulation)
}

/// Reads the typing table and writes `<name>_freq.csv` and `<name>_meta.csv`.
pub fn generate_frequency_files(config: &GenerateConfig) -> Result<GenerationSummary> {
    validate_freq_name(&config.freq_name)?;

    tracing::info!(
        input = %config.input.display(),
        freq_name = %config.freq_name,
        output_dir = %config.output_dir.display(),
        format = config.format.name(),
        "starting frequency generation",
    );

    // load templates before touching the input
    let templates = match &config.template_dir {
        Some(dir) => TemplateSet::from_dir(dir)?,
        None => TemplateSet::builtin(config.format)?,
    };

    let reader = typing::open(&config.input)?;
    let tabulation = tabulate(reader)?;
    let tally = &tabulation.tally;
    tracing::info!(
        rows = tally.denominator(),
        distinct = tally.distinct(),
        "tabulated antigen sets"
    );
    if tally.is_empty() {
        tracing::warn!(input = %config.input.display(), "input contains no typings");
    }

    let records = tally.records();
    let context = Context {
        freq_name: &config.freq_name,
        ethnicities: DEFAULT_STRATUM,
        ethnicity_frequencies: DEFAULT_STRATUM_WEIGHT,
        denominator: tally.denominator(),
        frequencies: &records,
        precision: config.precision,
    };

    let paths = OutputPaths::new(&config.output_dir, &config.freq_name);
    output::write_outputs(&paths, &templates, &context)?;

    let summary = GenerationSummary {
        rows: tally.denominator(),
        distinct_sets: tally.distinct(),
        empty_rows: tabulation.empty_rows,
        blank_a_rows: tabulation.blank_a_rows,
        blank_b_rows: tabulation.blank_b_rows,
        frequency_path: paths.frequencies,
        metadata_path: paths.metadata,
        report_path: None,
    };

    if !config.write_report {
        return Ok(summary);
    }

    let report = RunReportBuilder {
        freq_name: config.freq_name.clone(),
        input_path: config.input.display().to_string(),
        format: config.format,
        template_dir: config
            .template_dir
            .as_ref()
            .map(|dir| dir.display().to_string()),
        precision: config.precision,
    }
    .build(&summary);
    let report_path = report
        .write(&config.output_dir)
        .with_context(|| format!("failed to write run report for {}", config.freq_name))?;

    Ok(GenerationSummary {
        report_path: Some(report_path),
        ..summary
    })
}

fn validate_freq_name(name: &str) -> Result<()> {
    ensure!(!name.trim().is_empty(), "frequency table name must not be empty");
    ensure!(
        !name.contains(['/', '\\']),
        "frequency table name '{name}' must not contain a path separator"
    );
    Ok(())
}
