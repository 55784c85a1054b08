//! Ingestion of the clustering payload into an immutable, validated matrix.
//!
//! Row and column order comes from the upstream clustering and is kept as-is.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::MalformedDataError;

/// Number of rows (genes) and columns (samples).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MatrixDims {
    pub rows: usize,
    pub cols: usize,
}

impl MatrixDims {
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}

/// Extra information the clustering service attaches to a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MatrixMetadata {
    /// Genes in the dataset before the variance filter.
    #[serde(default)]
    pub total_genes: Option<usize>,
    /// `[rows, cols]` of the filtered matrix as reported by the service.
    #[serde(default)]
    pub filtered_shape: Option<[usize; 2]>,
}

/// Wire shape of the clustering response. Every field is optional here so
/// that a missing one surfaces as `MissingField` instead of a serde message.
#[derive(Debug, Deserialize)]
struct ClusteringPayload {
    genes: Option<Vec<String>>,
    samples: Option<Vec<String>>,
    expression_data: Option<Vec<Vec<Option<f64>>>>,
    #[serde(default)]
    metadata: Option<MatrixMetadata>,
}

/// Ordered gene × sample matrix of normalized scores.
#[derive(Debug, Clone)]
pub struct ClusteredMatrix {
    genes: Vec<String>,
    samples: Vec<String>,
    /// Row-major, `genes.len() * samples.len()` entries. NaN is stored as `None`.
    values: Vec<Option<f32>>,
    gene_index: HashMap<String, usize>,
    sample_index: HashMap<String, usize>,
    metadata: Option<MatrixMetadata>,
}

impl ClusteredMatrix {
    /// Build a matrix from ordered labels and rows, validating the shape.
    pub fn new(
        genes: Vec<String>,
        samples: Vec<String>,
        rows: Vec<Vec<Option<f64>>>,
    ) -> Result<Self, MalformedDataError> {
        if rows.len() != genes.len() {
            return Err(MalformedDataError::RowCount {
                expected: genes.len(),
                found: rows.len(),
            });
        }

        let cols = samples.len();
        let mut values = Vec::with_capacity(genes.len() * cols);
        for (row, entries) in rows.into_iter().enumerate() {
            if entries.len() != cols {
                return Err(MalformedDataError::RaggedRow {
                    row,
                    expected: cols,
                    found: entries.len(),
                });
            }
            values.extend(
                entries
                    .into_iter()
                    .map(|v| v.filter(|x| x.is_finite()).map(|x| x as f32)),
            );
        }

        let gene_index = first_occurrence_index(&genes);
        let sample_index = first_occurrence_index(&samples);

        Ok(Self {
            genes,
            samples,
            values,
            gene_index,
            sample_index,
            metadata: None,
        })
    }

    /// Parse and validate the service's JSON response.
    ///
    /// Bare `NaN`, `Infinity` and `-Infinity` tokens, as written by Python's
    /// JSON encoder, are read as missing values.
    pub fn from_json(json: &str) -> Result<Self, MalformedDataError> {
        let json = null_non_finite_tokens(json);
        let payload: ClusteringPayload = serde_json::from_str(&json)?;
        let genes = payload
            .genes
            .ok_or(MalformedDataError::MissingField("genes"))?;
        let samples = payload
            .samples
            .ok_or(MalformedDataError::MissingField("samples"))?;
        let rows = payload
            .expression_data
            .ok_or(MalformedDataError::MissingField("expression_data"))?;

        let mut matrix = Self::new(genes, samples, rows)?;
        matrix.metadata = payload.metadata;
        Ok(matrix)
    }

    pub fn dims(&self) -> MatrixDims {
        MatrixDims {
            rows: self.genes.len(),
            cols: self.samples.len(),
        }
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn metadata(&self) -> Option<&MatrixMetadata> {
        self.metadata.as_ref()
    }

    /// Score at (row, col); `None` for missing data or out-of-range indices.
    pub fn value(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.genes.len() || col >= self.samples.len() {
            return None;
        }
        self.values[row * self.samples.len() + col]
    }

    pub fn gene_index(&self, gene: &str) -> Option<usize> {
        self.gene_index.get(gene).copied()
    }

    pub fn sample_index(&self, sample: &str) -> Option<usize> {
        self.sample_index.get(sample).copied()
    }

    /// Number of cells holding a defined score.
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

const NON_FINITE_TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

/// Replace non-finite number literals outside of strings with `null`.
fn null_non_finite_tokens(json: &str) -> Cow<'_, str> {
    if !json.contains("NaN") && !json.contains("Infinity") {
        return Cow::Borrowed(json);
    }

    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;
    while i < json.len() {
        let rest = &json[i..];
        let Some(c) = rest.chars().next() else {
            break;
        };
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if let Some(token) = NON_FINITE_TOKENS.iter().find(|t| starts_token(rest, t)) {
            out.push_str("null");
            i += token.len();
            continue;
        }
        out.push(c);
        i += c.len_utf8();
    }
    Cow::Owned(out)
}

fn starts_token(rest: &str, token: &str) -> bool {
    rest.starts_with(token)
        && !rest[token.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn first_occurrence_index(labels: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(labels.len());
    for (i, label) in labels.iter().enumerate() {
        index.entry(label.clone()).or_insert(i);
    }
    index
}
