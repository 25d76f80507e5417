//! End-to-end batch tests with a deterministic stub client.

use async_trait::async_trait;
use bias_probe::models::BatchConfig;
use bias_probe::{
    BatchDriver, CompletionClient, Domain, Result, ResultWriter, RetryPolicy, RunOutput,
    read_run_output,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Answers `ok:<prompt>` and counts calls.
#[derive(Default)]
struct EchoClient {
    calls: AtomicUsize,
}

#[async_trait]
impl CompletionClient for EchoClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("ok:{prompt}"))
    }
}

const HEADER: &str = "Prompt,Correct answer,Incorrect Answer 1,Incorrect Answer 2,Incorrect Answer 3";

fn batch_config(dir: &Path, groups: &[&str]) -> BatchConfig {
    BatchConfig {
        input_dir: dir.to_path_buf(),
        groups: groups.iter().map(|g| g.to_string()).collect(),
        responses_per_prompt: 1,
        label_prefix: String::new(),
    }
}

async fn run_batch(dir: &Path, groups: &[&str]) -> (RunOutput, usize) {
    let client = Arc::new(EchoClient::default());
    let driver = BatchDriver::new(
        batch_config(dir, groups),
        Arc::clone(&client),
        RetryPolicy::default(),
    );
    let batch = driver.run().await.unwrap();
    let output = RunOutput {
        llm: "stub".to_string(),
        results: batch.records,
    };
    (output, client.calls.load(Ordering::SeqCst))
}

#[tokio::test]
async fn test_single_file_two_groups() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("Spine_eval.csv"),
        format!("{HEADER}\nThe patient is a [ ] and...,A,B,C,D\n"),
    )
    .unwrap();

    let (output, calls) = run_batch(dir.path(), &["white male", "black female"]).await;

    assert_eq!(calls, 2);
    assert_eq!(output.results.len(), 2);

    let first = &output.results[0];
    assert_eq!(first.prompt_info.prompt, "The patient is a white male and...");
    assert_eq!(
        first.chat_responses,
        vec!["ok:The patient is a white male and...".to_string()]
    );
    assert_eq!(first.prompt_info.domain, Domain::EvalManage);
    assert_eq!(first.prompt_info.file, "Spineeval");
    assert_eq!(first.prompt_info.idx, 0);
    assert_eq!(first.answer_key.correct, "A");
    assert_eq!(first.answer_key.incorrect_1, "B");
    assert_eq!(first.answer_key.incorrect_2, "C");
    assert_eq!(first.answer_key.incorrect_3, "D");

    let second = &output.results[1];
    assert_eq!(second.prompt_info.prompt, "The patient is a black female and...");
    assert_eq!(
        second.chat_responses,
        vec!["ok:The patient is a black female and...".to_string()]
    );
}

#[tokio::test]
async fn test_runs_are_deterministic() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("b_Diagnosis.csv"),
        format!("{HEADER}\nDx for [g] one,A,B,C,D\nDx for [g] two,E,F,G,H\n"),
    )
    .unwrap();
    fs::write(
        dir.path().join("a_eval.csv"),
        format!("{HEADER}\nMgmt of [g],I,J,K,L\n"),
    )
    .unwrap();

    let groups = ["asian male", "hispanic female"];
    let (first, _) = run_batch(dir.path(), &groups).await;
    let (second, _) = run_batch(dir.path(), &groups).await;

    assert_eq!(first, second);

    // files sorted by name, then groups, then rows
    let order: Vec<_> = first
        .results
        .iter()
        .map(|r| {
            (
                r.prompt_info.domain,
                r.prompt_info.group.as_str(),
                r.prompt_info.idx,
            )
        })
        .collect();
    assert_eq!(
        order,
        vec![
            (Domain::EvalManage, "asian male", 0),
            (Domain::EvalManage, "hispanic female", 0),
            (Domain::Diagnosis, "asian male", 0),
            (Domain::Diagnosis, "asian male", 1),
            (Domain::Diagnosis, "hispanic female", 0),
            (Domain::Diagnosis, "hispanic female", 1),
        ]
    );
    for record in &first.results {
        assert!(!record.prompt_info.prompt.contains('['));
    }
}

#[tokio::test]
async fn test_unrecognized_file_is_skipped() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("misc.csv"), format!("{HEADER}\nX [g],A,B,C,D\n")).unwrap();
    fs::write(dir.path().join("EVAL.csv"), format!("{HEADER}\nY [g],A,B,C,D\n")).unwrap();

    let client = Arc::new(EchoClient::default());
    let driver = BatchDriver::new(
        batch_config(dir.path(), &["g"]),
        Arc::clone(&client),
        RetryPolicy::default(),
    );
    let batch = driver.run().await.unwrap();

    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.records[0].prompt_info.prompt, "Y g");
    assert_eq!(batch.stats.files_processed, 1);
    assert_eq!(batch.stats.files_skipped, 1);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_second_write_does_not_overwrite() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("eval.csv"),
        format!("{HEADER}\nThe patient is a [ ] and...,A,B,C,D\n"),
    )
    .unwrap();
    let results_dir = dir.path().join("results");
    let writer = ResultWriter::new(&results_dir, "chatGPT_responses.json");

    let (output, _) = run_batch(dir.path(), &["white male"]).await;
    let first_path = writer.write(&output).unwrap();
    let first_content = fs::read_to_string(&first_path).unwrap();

    let second_path = writer.write(&output).unwrap();

    assert_ne!(first_path, second_path);
    assert_eq!(fs::read_to_string(&first_path).unwrap(), first_content);
    let name = second_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("chatGPT_responses_"));
    assert!(name.ends_with(".json"));
    assert_eq!(read_run_output(&second_path).unwrap(), output);

    // results/ sits inside the input dir but is not a CSV, so it is never read
    let (again, _) = run_batch(dir.path(), &["white male"]).await;
    assert_eq!(again.results.len(), 1);
}
