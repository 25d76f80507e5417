//! Question tables: the CSV input of a batch.

use crate::models::{ProbeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Clinical domain of a question table, derived from its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    #[serde(rename = "Eval_Manage")]
    EvalManage,
    #[serde(rename = "Diagnosis")]
    Diagnosis,
}

impl Domain {
    /// Classify a file name by case-insensitive substring.
    ///
    /// "eval" is tested before "diagnosis"; names matching neither yield `None`.
    pub fn classify(file_name: &str) -> Option<Self> {
        let lower = file_name.to_lowercase();
        if lower.contains("eval") {
            Some(Self::EvalManage)
        } else if lower.contains("diagnosis") {
            Some(Self::Diagnosis)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EvalManage => "Eval_Manage",
            Self::Diagnosis => "Diagnosis",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the short file label written into each record.
///
/// Takes the file stem, drops `prefix`, the domain tags and underscores, and trims.
pub fn file_label(file_name: &str, prefix: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());

    let stem = if prefix.is_empty() {
        stem
    } else {
        stem.replace(prefix, "")
    };

    stem.replace(Domain::EvalManage.as_str(), "")
        .replace(Domain::Diagnosis.as_str(), "")
        .replace('_', "")
        .trim()
        .to_string()
}

/// One row of a question table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionRow {
    /// Prompt template; bracketed spans are demographic placeholders
    pub prompt: String,
    pub correct: String,
    pub incorrect_1: String,
    pub incorrect_2: String,
    pub incorrect_3: String,
    pub subspecialty: String,
    pub source: String,
    pub differential_formation: String,
    pub treatment_strategies: String,
}

pub const PROMPT_COLUMN: &str = "Prompt";

/// Column positions resolved from a header row.
#[derive(Debug, Default)]
struct Columns {
    prompt: usize,
    correct: Option<usize>,
    incorrect_1: Option<usize>,
    incorrect_2: Option<usize>,
    incorrect_3: Option<usize>,
    subspecialty: Option<usize>,
    source: Option<usize>,
    differential_formation: Option<usize>,
    treatment_strategies: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord, path: &Path) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let prompt = find(PROMPT_COLUMN).ok_or_else(|| ProbeError::MissingColumn {
            path: path.to_owned(),
            column: PROMPT_COLUMN.to_string(),
        })?;

        Ok(Self {
            prompt,
            correct: find("Correct answer"),
            incorrect_1: find("Incorrect Answer 1"),
            incorrect_2: find("Incorrect Answer 2"),
            incorrect_3: find("Incorrect Answer 3"),
            subspecialty: find("Subspecialty"),
            source: find("Source"),
            differential_formation: find("Differential Formation"),
            // Older sheets carry the header misspelled.
            treatment_strategies: find("Treatment Strategies").or_else(|| find("Treatment Stragies")),
        })
    }

    fn row(&self, record: &csv::StringRecord) -> QuestionRow {
        let get = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .unwrap_or_default()
                .to_string()
        };

        QuestionRow {
            prompt: get(Some(self.prompt)),
            correct: get(self.correct),
            incorrect_1: get(self.incorrect_1),
            incorrect_2: get(self.incorrect_2),
            incorrect_3: get(self.incorrect_3),
            subspecialty: get(self.subspecialty),
            source: get(self.source),
            differential_formation: get(self.differential_formation),
            treatment_strategies: get(self.treatment_strategies),
        }
    }
}

/// Load every row of a question table, in file order.
///
/// Short rows read their absent trailing cells as `""`. A missing `Prompt`
/// column, a row with more fields than the header, or malformed CSV fails
/// the whole table.
pub fn load_questions(path: &Path) -> Result<Vec<QuestionRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ProbeError::Csv {
            path: path.to_owned(),
            source: e,
        })?;

    let headers = reader
        .headers()
        .map_err(|e| ProbeError::Csv {
            path: path.to_owned(),
            source: e,
        })?
        .clone();
    let columns = Columns::resolve(&headers, path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ProbeError::Csv {
            path: path.to_owned(),
            source: e,
        })?;
        if record.len() > headers.len() {
            return Err(ProbeError::ExtraFields {
                path: path.to_owned(),
                line: record.position().map_or(0, |p| p.line()),
                expected: headers.len(),
                found: record.len(),
            });
        }
        rows.push(columns.row(&record));
    }

    Ok(rows)
}
