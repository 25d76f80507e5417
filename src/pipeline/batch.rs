//! Batch driver.
//!
//! Pipeline flow:
//! Tables → classify → rows × groups → substitute → query (× repetitions) → records
//!
//! Iteration order is files (sorted by name), then groups (configured order),
//! then rows (file order). Queries run one at a time.

use crate::client::{CompletionClient, RetryPolicy, query};
use crate::models::{
    BatchConfig, Domain, ProbeError, Result, ResultRecord, RunStats, file_label, load_questions,
};
use crate::pipeline::{placeholder_count, substitute};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Records and statistics of one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub records: Vec<ResultRecord>,
    pub stats: RunStats,
}

/// Drives question tables through the completion client.
pub struct BatchDriver<C: CompletionClient + ?Sized> {
    config: BatchConfig,
    client: Arc<C>,
    policy: RetryPolicy,
    show_progress: bool,
}

impl<C: CompletionClient + ?Sized> BatchDriver<C> {
    pub fn new(config: BatchConfig, client: Arc<C>, policy: RetryPolicy) -> Self {
        Self {
            config,
            client,
            policy,
            show_progress: false,
        }
    }

    /// Draw a progress bar per table.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// List the CSV tables of the input directory, sorted by file name.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let dir = &self.config.input_dir;
        let entries = fs::read_dir(dir).map_err(|e| ProbeError::InputDir {
            path: dir.clone(),
            source: e,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ProbeError::InputDir {
                path: dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if is_csv && path.is_file() {
                files.push(path);
            }
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Run every table of the input directory.
    ///
    /// Unrecognized file names are skipped. A table that cannot be read
    /// aborts the whole batch.
    pub async fn run(&self) -> Result<BatchResult> {
        let start = Instant::now();
        let files = self.discover()?;
        info!(
            count = files.len(),
            dir = %self.config.input_dir.display(),
            "Found CSV files"
        );

        let mut result = BatchResult::default();

        for path in &files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let Some(domain) = Domain::classify(&file_name) else {
                warn!(file = %file_name, "Skipping file: domain not recognized");
                result.stats.files_skipped += 1;
                continue;
            };

            let records = self
                .process_file(path, &file_name, domain, &mut result.stats)
                .await?;
            result.records.extend(records);
            result.stats.files_processed += 1;
        }

        result.stats.total_records = result.records.len();
        result.stats.runtime_secs = start.elapsed().as_secs_f64();

        info!(
            files = result.stats.files_processed,
            skipped = result.stats.files_skipped,
            records = result.stats.total_records,
            failed_queries = result.stats.failed_queries,
            "Batch complete"
        );

        Ok(result)
    }

    /// Expand one table into records, groups outer and rows inner.
    pub async fn process_file(
        &self,
        path: &Path,
        file_name: &str,
        domain: Domain,
        stats: &mut RunStats,
    ) -> Result<Vec<ResultRecord>> {
        let rows = load_questions(path)?;
        let label = file_label(file_name, &self.config.label_prefix);
        let repetitions = self.config.responses_per_prompt;

        info!(
            file = %file_name,
            domain = %domain,
            label = %label,
            rows = rows.len(),
            "Processing file"
        );

        let total = (self.config.groups.len() * rows.len() * repetitions) as u64;
        let pb = self.progress_bar(total);

        let mut records = Vec::with_capacity(self.config.groups.len() * rows.len());
        for group in &self.config.groups {
            for (idx, row) in rows.iter().enumerate() {
                let prompt = substitute(&row.prompt, group).into_owned();
                debug!(
                    domain = %domain,
                    file = %label,
                    group = %group,
                    idx,
                    placeholders = placeholder_count(&row.prompt),
                    prompt = %prompt,
                    "Prompt"
                );

                let mut responses = Vec::with_capacity(repetitions);
                for rep in 0..repetitions {
                    debug!(response = rep + 1, "Requesting response");
                    let outcome = query(&*self.client, &prompt, &self.policy).await;
                    stats.total_queries += 1;
                    if outcome.is_failed() {
                        stats.failed_queries += 1;
                        warn!(file = %label, group = %group, idx, "Query failed after all attempts");
                    }
                    responses.push(outcome.into_response());
                    pb.inc(1);
                }

                records.push(ResultRecord::new(
                    domain, &label, group, idx, row, prompt, responses,
                ));
            }
        }

        pb.finish_and_clear();
        Ok(records)
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}",
        )
        .map(|s| s.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }
}
