//! Output templates.
//!
//! Templates use a small subset of Jinja syntax: `{{ name }}` substitutes a
//! value and `{% for row in frequencies %} ... {% endfor %}` repeats its body
//! once per frequency record, with `{{ row.label }}`, `{{ row.count }}`,
//! `{{ row.probability }}` and `{{ row.denominator }}` available inside.
//! Names are resolved when the template is parsed, so a template that loads
//! always renders.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::output::OutputFormat;
use crate::tally::FrequencyRecord;

/// File name of the frequency template inside a template directory.
pub const FREQ_TEMPLATE: &str = "template_freq.csv";
/// File name of the metadata template inside a template directory.
pub const META_TEMPLATE: &str = "template_meta.csv";

const LOOP_SOURCE: &str = "frequencies";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{template}: unclosed `{opening}` tag")]
    Unclosed {
        template: String,
        opening: &'static str,
    },
    #[error("{template}: unknown variable `{name}`")]
    UnknownVariable { template: String, name: String },
    #[error("{template}: unsupported tag `{tag}`")]
    UnsupportedTag { template: String, tag: String },
    #[error("{template}: nested loops are not supported")]
    NestedLoop { template: String },
    #[error("{template}: `endfor` without a matching `for`")]
    UnmatchedEndfor { template: String },
    #[error("{template}: `for` loop is never closed")]
    UnclosedLoop { template: String },
}

/// Values available outside of a loop.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Scalar {
    FreqName,
    Ethnicities,
    EthnicityFrequencies,
    Denominator,
    Distinct,
}

impl Scalar {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "freq_name" => Some(Self::FreqName),
            "ethnicities" => Some(Self::Ethnicities),
            "ethnicity_frequencies" => Some(Self::EthnicityFrequencies),
            "denominator" => Some(Self::Denominator),
            "distinct" => Some(Self::Distinct),
            _ => None,
        }
    }
}

/// Fields of the loop variable.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Field {
    Label,
    Count,
    Probability,
    Denominator,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "label" => Some(Self::Label),
            "count" => Some(Self::Count),
            "probability" => Some(Self::Probability),
            "denominator" => Some(Self::Denominator),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Node {
    Text(String),
    Scalar(Scalar),
    Field(Field),
    Loop(Vec<Node>),
}

/// Everything a template can refer to.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub freq_name: &'a str,
    pub ethnicities: &'a str,
    pub ethnicity_frequencies: &'a str,
    pub denominator: u64,
    pub frequencies: &'a [FrequencyRecord],
    /// Decimal digits used when rendering probabilities.
    pub precision: usize,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

enum Token<'s> {
    Text(&'s str),
    Expr(&'s str),
    Tag(&'s str),
}

impl Template {
    pub fn parse(name: &str, source: &str) -> Result<Self, TemplateError> {
        let tokens = tokenize(name, source)?;

        // innermost frame last; a frame with a binding is an open loop
        let mut frames: Vec<(Option<String>, Vec<Node>)> = vec![(None, Vec::new())];
        for token in tokens {
            match token {
                Token::Text(text) => push(&mut frames, Node::Text(text.to_string())),
                Token::Expr(expr) => {
                    let binding = frames.last().and_then(|(binding, _)| binding.as_deref());
                    let node = resolve(name, expr.trim(), binding)?;
                    push(&mut frames, node);
                }
                Token::Tag(tag) => {
                    let words: Vec<&str> = tag.split_whitespace().collect();
                    match words.as_slice() {
                        ["for", binding, "in", source] => {
                            if *source != LOOP_SOURCE {
                                return Err(TemplateError::UnknownVariable {
                                    template: name.to_string(),
                                    name: source.to_string(),
                                });
                            }
                            if frames.len() > 1 {
                                return Err(TemplateError::NestedLoop {
                                    template: name.to_string(),
                                });
                            }
                            frames.push((Some(binding.to_string()), Vec::new()));
                        }
                        ["endfor"] => {
                            if frames.len() < 2 {
                                return Err(TemplateError::UnmatchedEndfor {
                                    template: name.to_string(),
                                });
                            }
                            if let Some((_, body)) = frames.pop() {
                                push(&mut frames, Node::Loop(body));
                            }
                        }
                        _ => {
                            return Err(TemplateError::UnsupportedTag {
                                template: name.to_string(),
                                tag: tag.trim().to_string(),
                            });
                        }
                    }
                }
            }
        }

        if frames.len() > 1 {
            return Err(TemplateError::UnclosedLoop {
                template: name.to_string(),
            });
        }
        let nodes = frames.pop().map(|(_, nodes)| nodes).unwrap_or_default();

        Ok(Self {
            name: name.to_string(),
            nodes,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let source = fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse(&name, &source)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render(&self, context: &Context<'_>) -> String {
        let mut out = String::new();
        render_nodes(&self.nodes, context, None, &mut out);
        out
    }
}

fn push(frames: &mut [(Option<String>, Vec<Node>)], node: Node) {
    if let Some((_, nodes)) = frames.last_mut() {
        nodes.push(node);
    }
}

fn tokenize<'s>(name: &str, source: &'s str) -> Result<Vec<Token<'s>>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = source;

    while let Some(start) = rest.find('{') {
        let after = &rest[start..];
        let (opening, closing) = if after.starts_with("{{") {
            ("{{", "}}")
        } else if after.starts_with("{%") {
            ("{%", "%}")
        } else {
            // lone brace, keep scanning after it
            let split = start + 1;
            tokens.push(Token::Text(&rest[..split]));
            rest = &rest[split..];
            continue;
        };

        if start > 0 {
            tokens.push(Token::Text(&rest[..start]));
        }
        let inner_start = start + opening.len();
        let inner_len = rest[inner_start..]
            .find(closing)
            .ok_or_else(|| TemplateError::Unclosed {
                template: name.to_string(),
                opening,
            })?;
        let inner = &rest[inner_start..inner_start + inner_len];
        tokens.push(if opening == "{{" {
            Token::Expr(inner)
        } else {
            Token::Tag(inner)
        });
        rest = &rest[inner_start + inner_len + closing.len()..];
    }

    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    Ok(tokens)
}

fn resolve(template: &str, expr: &str, binding: Option<&str>) -> Result<Node, TemplateError> {
    if let Some(binding) = binding
        && let Some((head, field)) = expr.split_once('.')
        && head == binding
        && let Some(field) = Field::parse(field)
    {
        return Ok(Node::Field(field));
    }

    Scalar::parse(expr)
        .map(Node::Scalar)
        .ok_or_else(|| TemplateError::UnknownVariable {
            template: template.to_string(),
            name: expr.to_string(),
        })
}

fn render_nodes(
    nodes: &[Node],
    context: &Context<'_>,
    record: Option<&FrequencyRecord>,
    out: &mut String,
) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Scalar(scalar) => out.push_str(&scalar_value(*scalar, context)),
            Node::Field(field) => {
                if let Some(record) = record {
                    out.push_str(&field_value(*field, record, context.precision));
                }
            }
            Node::Loop(body) => {
                for record in context.frequencies {
                    render_nodes(body, context, Some(record), out);
                }
            }
        }
    }
}

fn scalar_value(scalar: Scalar, context: &Context<'_>) -> String {
    match scalar {
        Scalar::FreqName => context.freq_name.to_string(),
        Scalar::Ethnicities => context.ethnicities.to_string(),
        Scalar::EthnicityFrequencies => context.ethnicity_frequencies.to_string(),
        Scalar::Denominator => context.denominator.to_string(),
        Scalar::Distinct => context.frequencies.len().to_string(),
    }
}

fn field_value(field: Field, record: &FrequencyRecord, precision: usize) -> String {
    match field {
        Field::Label => record.label.clone(),
        Field::Count => record.count.to_string(),
        Field::Probability => format!("{:.*}", precision, record.probability),
        Field::Denominator => record.denominator.to_string(),
    }
}

/// The pair of templates producing the frequency and metadata files.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TemplateSet {
    pub frequencies: Template,
    pub metadata: Template,
}

impl TemplateSet {
    /// Templates compiled into the binary for `format`.
    pub fn builtin(format: OutputFormat) -> Result<Self, TemplateError> {
        let (freq, meta) = match format {
            OutputFormat::Plain => (
                include_str!("../templates/plain/template_freq.csv"),
                include_str!("../templates/plain/template_meta.csv"),
            ),
            OutputFormat::Calculator => (
                include_str!("../templates/calculator/template_freq.csv"),
                include_str!("../templates/calculator/template_meta.csv"),
            ),
        };
        Ok(Self {
            frequencies: Template::parse(FREQ_TEMPLATE, freq)?,
            metadata: Template::parse(META_TEMPLATE, meta)?,
        })
    }

    /// Loads `template_freq.csv` and `template_meta.csv` from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, TemplateError> {
        Ok(Self {
            frequencies: Template::from_file(&dir.join(FREQ_TEMPLATE))?,
            metadata: Template::from_file(&dir.join(META_TEMPLATE))?,
        })
    }
}
