use std::{
    io::{self, BufRead, Read},
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::smart_reader;

/// Header names the typing table must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = ["A1", "A2", "B1", "B2"];

/// HLA-A and HLA-B typing of a single donor or recipient.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Typing {
    /// Line of the input the row was read from (the header is line 1).
    pub line: u64,
    pub a1: String,
    pub a2: String,
    pub b1: String,
    pub b2: String,
}

impl Typing {
    pub fn new(a1: &str, a2: &str, b1: &str, b2: &str) -> Self {
        Self {
            line: 0,
            a1: a1.to_string(),
            a2: a2.to_string(),
            b1: b1.to_string(),
            b2: b2.to_string(),
        }
    }
}

/// Errors raised while reading the typing table.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to open input {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("input is missing required column(s): {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },
    #[error("unreadable CSV at line {line}")]
    Csv {
        line: u64,
        #[source]
        source: csv::Error,
    },
    #[error("malformed CSV at line {line}: {found} field(s), column {column} is missing")]
    Malformed {
        line: u64,
        found: usize,
        column: &'static str,
    },
    #[error("allele {allele:?} at line {line} contains a CSV or label delimiter")]
    InvalidAllele { line: u64, allele: String },
}

/// Characters that would break the label or the rendered CSV row.
const RESERVED_CHARS: [char; 5] = [',', ';', '"', '\n', '\r'];

/// Iterator over the typings of a CSV table with `A1,A2,B1,B2` columns.
///
/// Columns may appear in any order and extra columns or trailing fields are
/// ignored. Fields are trimmed and blank lines are skipped. A row too short
/// to hold every required column is malformed.
pub struct Reader<R> {
    inner: csv::Reader<R>,
    columns: [usize; 4],
    record: csv::StringRecord,
}

impl<R> Reader<R>
where
    R: Read,
{
    /// Reads the header row and resolves the required columns.
    pub fn new(inner: R) -> Result<Self, InputError> {
        let mut inner = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(inner);

        let headers = inner
            .headers()
            .map_err(|source| InputError::Csv { line: 1, source })?
            .clone();
        let columns = resolve_columns(&headers)?;
        tracing::debug!(columns = ?columns, "resolved typing columns");

        Ok(Self {
            inner,
            columns,
            record: csv::StringRecord::new(),
        })
    }
}

impl<R> Iterator for Reader<R>
where
    R: Read,
{
    type Item = Result<Typing, InputError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.read_record(&mut self.record) {
            Ok(false) => None,
            Ok(true) => Some(self.typing()),
            Err(source) => {
                let line = source.position().map_or(0, |pos| pos.line());
                Some(Err(InputError::Csv { line, source }))
            }
        }
    }
}

impl<R> Reader<R> {
    fn typing(&self) -> Result<Typing, InputError> {
        let line = self.record.position().map_or(0, |pos| pos.line());
        let mut fields = [""; 4];
        let columns = self.columns.iter().zip(REQUIRED_COLUMNS);
        for (slot, (&index, column)) in fields.iter_mut().zip(columns) {
            let value = self.record.get(index).ok_or(InputError::Malformed {
                line,
                found: self.record.len(),
                column,
            })?;
            if value.contains(RESERVED_CHARS) {
                return Err(InputError::InvalidAllele {
                    line,
                    allele: value.to_string(),
                });
            }
            *slot = value;
        }

        let [a1, a2, b1, b2] = fields;
        Ok(Typing {
            line,
            ..Typing::new(a1, a2, b1, b2)
        })
    }
}

/// Opens a typing table on disk (plain or gzip-compressed).
pub fn open(path: &Path) -> Result<Reader<Box<dyn BufRead + Send>>, InputError> {
    let stream = smart_reader::open_input(path).map_err(|source| InputError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Reader::new(stream)
}

fn resolve_columns(headers: &csv::StringRecord) -> Result<[usize; 4], InputError> {
    let mut columns = [0usize; 4];
    let mut missing = Vec::new();
    for (slot, name) in columns.iter_mut().zip(REQUIRED_COLUMNS) {
        match headers.iter().position(|header| header == name) {
            Some(index) => *slot = index,
            None => missing.push(name.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(columns)
    } else {
        Err(InputError::MissingColumns { missing })
    }
}
