//! Result types: what a batch produces and what gets persisted.

use crate::models::{Domain, QuestionRow};
use serde::{Deserialize, Serialize};

/// Where a manufactured prompt came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptInfo {
    pub domain: Domain,
    /// Cleaned file label
    pub file: String,
    pub group: String,
    /// Zero-based row position within the file
    pub idx: usize,
    #[serde(default)]
    pub subspecialty: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub differential_formation: String,
    #[serde(default)]
    pub treatment_strategies: String,
    /// Template with every placeholder replaced by `group`
    pub prompt: String,
}

/// Answer key copied from the question row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerKey {
    #[serde(default)]
    pub correct: String,
    #[serde(default)]
    pub incorrect_1: String,
    #[serde(default)]
    pub incorrect_2: String,
    #[serde(default)]
    pub incorrect_3: String,
}

impl From<&QuestionRow> for AnswerKey {
    fn from(row: &QuestionRow) -> Self {
        Self {
            correct: row.correct.clone(),
            incorrect_1: row.incorrect_1.clone(),
            incorrect_2: row.incorrect_2.clone(),
            incorrect_3: row.incorrect_3.clone(),
        }
    }
}

/// One (file, group, row) combination and its responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub prompt_info: PromptInfo,
    pub answer_key: AnswerKey,
    /// One entry per configured repetition; failed queries hold an error string
    pub chat_responses: Vec<String>,
}

impl ResultRecord {
    pub fn new(
        domain: Domain,
        file: &str,
        group: &str,
        idx: usize,
        row: &QuestionRow,
        prompt: String,
        chat_responses: Vec<String>,
    ) -> Self {
        Self {
            prompt_info: PromptInfo {
                domain,
                file: file.to_string(),
                group: group.to_string(),
                idx,
                subspecialty: row.subspecialty.clone(),
                source: row.source.clone(),
                differential_formation: row.differential_formation.clone(),
                treatment_strategies: row.treatment_strategies.clone(),
                prompt,
            },
            answer_key: AnswerKey::from(row),
            chat_responses,
        }
    }
}

/// The persisted document of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    /// Label of the model that answered
    #[serde(rename = "LLM")]
    pub llm: String,
    pub results: Vec<ResultRecord>,
}

/// Statistics for a batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Tables that were classified and processed
    pub files_processed: usize,

    /// Tables skipped for an unrecognized name
    pub files_skipped: usize,

    /// Records produced
    pub total_records: usize,

    /// Queries issued (each possibly with several attempts)
    pub total_queries: usize,

    /// Queries whose every attempt failed
    pub failed_queries: usize,

    /// Total runtime in seconds
    pub runtime_secs: f64,
}

impl RunStats {
    /// Fraction of queries that produced a model answer.
    pub fn success_rate(&self) -> f64 {
        if self.total_queries == 0 {
            return 1.0;
        }
        (self.total_queries - self.failed_queries) as f64 / self.total_queries as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> QuestionRow {
        QuestionRow {
            prompt: "A [ ] presents".to_string(),
            correct: "A".to_string(),
            incorrect_1: "B".to_string(),
            incorrect_2: "C".to_string(),
            incorrect_3: "D".to_string(),
            subspecialty: "Hand".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_record_json_shape() {
        let record = ResultRecord::new(
            Domain::Diagnosis,
            "Hand",
            "asian female",
            4,
            &sample_row(),
            "A asian female presents".to_string(),
            vec!["ok".to_string()],
        );
        let output = RunOutput {
            llm: "Chat GPT 4".to_string(),
            results: vec![record],
        };

        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["LLM"], "Chat GPT 4");
        let first = &value["results"][0];
        assert_eq!(first["prompt_info"]["domain"], "Diagnosis");
        assert_eq!(first["prompt_info"]["file"], "Hand");
        assert_eq!(first["prompt_info"]["group"], "asian female");
        assert_eq!(first["prompt_info"]["idx"], 4);
        assert_eq!(first["prompt_info"]["subspecialty"], "Hand");
        assert_eq!(first["prompt_info"]["treatment_strategies"], "");
        assert_eq!(first["prompt_info"]["prompt"], "A asian female presents");
        assert_eq!(first["answer_key"]["correct"], "A");
        assert_eq!(first["answer_key"]["incorrect_3"], "D");
        assert_eq!(first["chat_responses"][0], "ok");
    }

    #[test]
    fn test_success_rate() {
        let stats = RunStats {
            total_queries: 4,
            failed_queries: 1,
            ..Default::default()
        };
        assert!((stats.success_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(RunStats::default().success_rate(), 1.0);
    }
}
