use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use crate::{
    GenerationSummary, OutputFormat,
    generate::{DEFAULT_PRECISION, GenerateConfig, generate_frequency_files},
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Generates files which can be used by the cPRA web service for custom population frequencies.",
    long_about = None
)]
struct Cli {
    /// Input frequency table file (CSV with A1, A2, B1, B2 columns; may be gzipped)
    #[arg(long = "input_file", alias = "input-file", value_name = "PATH")]
    input_file: PathBuf,

    /// Name of frequency table; outputs are <NAME>_freq.csv and <NAME>_meta.csv
    #[arg(long = "freq_name", alias = "freq-name", value_name = "NAME")]
    freq_name: String,

    /// Directory receiving the generated files
    #[arg(long = "output_dir", alias = "output-dir", value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Built-in template set
    #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
    format: OutputFormat,

    /// Directory with custom template_freq.csv and template_meta.csv
    #[arg(long = "template_dir", alias = "template-dir", value_name = "DIR")]
    template_dir: Option<PathBuf>,

    /// Decimal digits of rendered probabilities
    #[arg(long, default_value_t = DEFAULT_PRECISION)]
    precision: usize,

    /// Also write <NAME>_report.json describing the run
    #[arg(long)]
    report: bool,

    /// Logging verbosity (e.g. error, warn, info, debug)
    #[arg(long = "log_level", alias = "log-level", default_value = "info")]
    log_level: String,
}

impl Cli {
    fn into_config(self) -> GenerateConfig {
        GenerateConfig {
            input: self.input_file,
            freq_name: self.freq_name,
            output_dir: self.output_dir,
            format: self.format,
            template_dir: self.template_dir,
            precision: self.precision,
            write_report: self.report,
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    println!("Generating frequency files...");
    let config = cli.into_config();
    let summary = generate_frequency_files(&config)?;
    print_summary(&summary);
    println!("Done");

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
    Ok(())
}

fn print_summary(summary: &GenerationSummary) {
    println!(
        "Processed {rows} typings into {distinct} distinct antigen sets.",
        rows = summary.rows,
        distinct = summary.distinct_sets,
    );

    if summary.empty_rows > 0 {
        println!(
            "{count} typings carried no A or B antigen.",
            count = summary.empty_rows
        );
    }

    println!("Wrote {}", summary.frequency_path.display());
    println!("Wrote {}", summary.metadata_path.display());
    if let Some(report) = &summary.report_path {
        println!("Wrote {}", report.display());
    }
}
