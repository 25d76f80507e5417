//! bias-probe - demographic-substitution prompt batches against chat-completion LLMs.
//!
//! ## Architecture
//!
//! - **Substitution**: every `[...]` span of a prompt template becomes a group label
//! - **Client**: one chat-completion call per attempt, wrapped in a fixed-delay retry
//! - **Batch driver**: files → groups → rows → repetitions, strictly sequential
//! - **Writer**: one pretty JSON document per run, never overwriting an earlier one
//! - **Report**: grouped plain text and a paginated PDF built from that document
//!
//! Query failures never abort a run: once retries are exhausted the failure is
//! stored as an `Error: ...` string in the record's `chat_responses`.

pub mod client;
pub mod models;
pub mod pipeline;
pub mod report;

// Re-exports for convenience
pub use client::{ChatClient, CompletionClient, QueryOutcome, RetryPolicy, query, retry};
pub use models::{Config, Domain, ProbeError, QuestionRow, Result, ResultRecord, RunOutput, RunStats};
pub use pipeline::{BatchDriver, BatchResult, ResultWriter, read_run_output, substitute};
pub use report::{render_text, write_reports};
