//! The shared parameter store the pipeline passes between modules.
//!
//! Values are addressed by `(section, name)`, both case-insensitive. Typed
//! getters are lenient in the ways ini-driven configuration needs: text is
//! parsed on read, integers read as doubles, and a scalar reads as a
//! one-element array.

use crate::error::BlockError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Row-major matrix of doubles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct RawMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = BlockError;

    fn try_from(raw: RawMatrix) -> Result<Self, Self::Error> {
        Matrix::new(raw.rows, raw.cols, raw.data)
    }
}

impl Matrix {
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, BlockError> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(BlockError::BadMatrix {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build from nested rows. Every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, BlockError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let data: Vec<f64> = rows.into_iter().flatten().collect();
        Self::new(n_rows, n_cols, data)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn row(&self, i: usize) -> Option<&[f64]> {
        if i >= self.rows {
            return None;
        }
        self.data.get(i * self.cols..(i + 1) * self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Flattened row-major view.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        if self.cols == 0 {
            return vec![Vec::new(); self.rows];
        }
        self.data.chunks(self.cols).map(<[f64]>::to_vec).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    DoubleArray(Vec<f64>),
    DoubleMatrix(Matrix),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Str(_) => "string",
            Value::DoubleArray(_) => "double array",
            Value::DoubleMatrix(_) => "double matrix",
        }
    }
}

enum Mismatch {
    Type,
    Parse(String),
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "1" => Some(true),
        "f" | "false" | "n" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Whitespace- or comma-separated list of numbers.
pub(crate) fn parse_vector(raw: &str) -> Option<Vec<f64>> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|tok| !tok.is_empty())
        .map(|tok| tok.parse::<f64>().ok())
        .collect()
}

fn as_double(value: &Value) -> Result<f64, Mismatch> {
    match value {
        Value::Double(x) => Ok(*x),
        Value::Int(i) => Ok(*i as f64),
        Value::Str(s) => s.trim().parse().map_err(|_| Mismatch::Parse(s.clone())),
        _ => Err(Mismatch::Type),
    }
}

fn as_int(value: &Value) -> Result<i64, Mismatch> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Str(s) => s.trim().parse().map_err(|_| Mismatch::Parse(s.clone())),
        _ => Err(Mismatch::Type),
    }
}

fn as_bool(value: &Value) -> Result<bool, Mismatch> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Int(i) => Ok(*i != 0),
        Value::Str(s) => parse_bool(s).ok_or_else(|| Mismatch::Parse(s.clone())),
        _ => Err(Mismatch::Type),
    }
}

fn as_string(value: &Value) -> Result<String, Mismatch> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        _ => Err(Mismatch::Type),
    }
}

fn as_double_array(value: &Value) -> Result<Vec<f64>, Mismatch> {
    match value {
        Value::DoubleArray(v) => Ok(v.clone()),
        Value::Double(x) => Ok(vec![*x]),
        Value::Int(i) => Ok(vec![*i as f64]),
        Value::Str(s) => parse_vector(s).ok_or_else(|| Mismatch::Parse(s.clone())),
        _ => Err(Mismatch::Type),
    }
}

fn as_double_matrix(value: &Value) -> Result<Matrix, Mismatch> {
    match value {
        Value::DoubleMatrix(m) => Ok(m.clone()),
        _ => Err(Mismatch::Type),
    }
}

fn typed<T>(
    section: &str,
    name: &str,
    value: &Value,
    expected: &'static str,
    convert: fn(&Value) -> Result<T, Mismatch>,
) -> Result<T, BlockError> {
    convert(value).map_err(|mismatch| match mismatch {
        Mismatch::Type => BlockError::WrongType {
            section: section.to_string(),
            name: name.to_string(),
            expected,
            found: value.kind(),
        },
        Mismatch::Parse(raw) => BlockError::Parse {
            section: section.to_string(),
            name: name.to_string(),
            raw,
            expected,
        },
    })
}

/// Access to the shared store.
///
/// Implementors supply [`get`](DataBlock::get) and [`put`](DataBlock::put);
/// the typed accessors are derived from them.
pub trait DataBlock {
    fn get(&self, section: &str, name: &str) -> Result<&Value, BlockError>;

    fn put(&mut self, section: &str, name: &str, value: Value);

    fn has_value(&self, section: &str, name: &str) -> bool {
        self.get(section, name).is_ok()
    }

    fn get_double(&self, section: &str, name: &str) -> Result<f64, BlockError> {
        typed(section, name, self.get(section, name)?, "double", as_double)
    }

    fn get_int(&self, section: &str, name: &str) -> Result<i64, BlockError> {
        typed(section, name, self.get(section, name)?, "int", as_int)
    }

    fn get_bool(&self, section: &str, name: &str) -> Result<bool, BlockError> {
        typed(section, name, self.get(section, name)?, "bool", as_bool)
    }

    fn get_string(&self, section: &str, name: &str) -> Result<String, BlockError> {
        typed(section, name, self.get(section, name)?, "string", as_string)
    }

    fn get_double_array(&self, section: &str, name: &str) -> Result<Vec<f64>, BlockError> {
        typed(section, name, self.get(section, name)?, "double array", as_double_array)
    }

    fn get_double_matrix(&self, section: &str, name: &str) -> Result<Matrix, BlockError> {
        typed(section, name, self.get(section, name)?, "double matrix", as_double_matrix)
    }

    /// Like [`get_bool`](DataBlock::get_bool), but an absent value yields `default`.
    fn get_bool_or(&self, section: &str, name: &str, default: bool) -> Result<bool, BlockError> {
        match self.get_bool(section, name) {
            Err(err) if err.is_missing() => Ok(default),
            other => other,
        }
    }

    fn get_string_or(&self, section: &str, name: &str, default: &str) -> Result<String, BlockError> {
        match self.get_string(section, name) {
            Err(err) if err.is_missing() => Ok(default.to_string()),
            other => other,
        }
    }

    fn put_double(&mut self, section: &str, name: &str, value: f64) {
        self.put(section, name, Value::Double(value));
    }

    fn put_double_array(&mut self, section: &str, name: &str, value: Vec<f64>) {
        self.put(section, name, Value::DoubleArray(value));
    }

    fn put_double_matrix(&mut self, section: &str, name: &str, value: Matrix) {
        self.put(section, name, Value::DoubleMatrix(value));
    }
}

/// In-process [`DataBlock`] backed by ordered maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryBlock {
    sections: BTreeMap<String, BTreeMap<String, Value>>,
}

fn key(s: &str) -> String {
    s.to_ascii_lowercase()
}

impl MemoryBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(&key(section))
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Names stored in `section`, in sorted order.
    pub fn value_names(&self, section: &str) -> Vec<&str> {
        self.sections
            .get(&key(section))
            .map(|values| values.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn remove(&mut self, section: &str, name: &str) -> Option<Value> {
        self.sections.get_mut(&key(section))?.remove(&key(name))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let block: MemoryBlock = serde_json::from_str(json)?;
        // Normalise keys written by hand in mixed case.
        let mut normalised = MemoryBlock::new();
        for (section, values) in block.sections {
            for (name, value) in values {
                normalised.put(&section, &name, value);
            }
        }
        Ok(normalised)
    }
}

impl DataBlock for MemoryBlock {
    fn get(&self, section: &str, name: &str) -> Result<&Value, BlockError> {
        let values = self
            .sections
            .get(&key(section))
            .ok_or_else(|| BlockError::SectionNotFound {
                section: section.to_string(),
            })?;
        values.get(&key(name)).ok_or_else(|| BlockError::NameNotFound {
            section: section.to_string(),
            name: name.to_string(),
        })
    }

    fn put(&mut self, section: &str, name: &str, value: Value) {
        self.sections.entry(key(section)).or_default().insert(key(name), value);
    }
}
