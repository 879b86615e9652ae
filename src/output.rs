use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use thiserror::Error;

use crate::template::{Context, TemplateSet};

/// Built-in layouts for the generated files.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// `label,count,probability,denominator` rows and a `name,stratum,weight` line.
    #[default]
    Plain,
    /// `key,value,comment` configuration loaded by the cPRA web service.
    Calculator,
}

impl OutputFormat {
    pub fn name(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Calculator => "calculator",
        }
    }
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to create output directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Destination of the two generated files for a frequency table name.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OutputPaths {
    pub frequencies: PathBuf,
    pub metadata: PathBuf,
}

impl OutputPaths {
    /// `<dir>/<name>_freq.csv` and `<dir>/<name>_meta.csv`.
    pub fn new(dir: &Path, freq_name: &str) -> Self {
        Self {
            frequencies: dir.join(format!("{freq_name}_freq.csv")),
            metadata: dir.join(format!("{freq_name}_meta.csv")),
        }
    }
}

/// Renders both templates and writes them to `paths`.
pub fn write_outputs(
    paths: &OutputPaths,
    templates: &TemplateSet,
    context: &Context<'_>,
) -> Result<(), OutputError> {
    for path in [&paths.frequencies, &paths.metadata] {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| OutputError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    write_rendered(&paths.frequencies, &templates.frequencies.render(context))?;
    tracing::info!(path = %paths.frequencies.display(), "wrote frequency table");

    write_rendered(&paths.metadata, &templates.metadata.render(context))?;
    tracing::info!(path = %paths.metadata.display(), "wrote metadata");

    Ok(())
}

/// Writes rendered template output with surrounding whitespace removed and a
/// single trailing newline. Empty output produces an empty file.
pub fn write_rendered(path: &Path, contents: &str) -> Result<(), OutputError> {
    let to_error = |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = File::create(path).map(BufWriter::new).map_err(to_error)?;
    let contents = contents.trim();
    if !contents.is_empty() {
        writer.write_all(contents.as_bytes()).map_err(to_error)?;
        writer.write_all(b"\n").map_err(to_error)?;
    }
    writer.flush().map_err(to_error)
}
