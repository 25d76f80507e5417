//! Plain-text rendering of a result document, grouped by row index.

use crate::models::{Domain, ResultRecord, RunOutput};

/// Render the records whose row index is below `max_idx`.
///
/// Each index gets its own block. Inside a block the file header and
/// answer key are printed whenever the file changes, followed by the
/// group, prompt and responses of every record.
pub fn render_text(output: &RunOutput, max_idx: usize) -> String {
    let mut lines: Vec<String> = Vec::new();

    for idx in 0..max_idx {
        lines.push(format!("=== Results for idx {idx} ==="));

        let entries: Vec<&ResultRecord> = output
            .results
            .iter()
            .filter(|r| r.prompt_info.idx == idx)
            .collect();

        if entries.is_empty() {
            lines.push("No entries found for this idx.".to_string());
            lines.push(String::new());
            continue;
        }

        // Labels drop the domain tag, so two tables can share one.
        let mut current_file: Option<(Domain, &str)> = None;
        for entry in entries {
            let file = (entry.prompt_info.domain, entry.prompt_info.file.as_str());
            if current_file != Some(file) {
                current_file = Some(file);
                push_file_header(&mut lines, entry);
            }

            lines.push("Group:".to_string());
            lines.push(entry.prompt_info.group.clone());
            lines.push("Prompt:".to_string());
            lines.push(entry.prompt_info.prompt.clone());
            lines.push("Chat Responses:".to_string());
            lines.push(
                serde_json::to_string(&entry.chat_responses)
                    .unwrap_or_else(|_| entry.chat_responses.join(", ")),
            );
            lines.push(String::new());
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

fn push_file_header(lines: &mut Vec<String>, entry: &ResultRecord) {
    let file = &entry.prompt_info.file;
    let domain = entry.prompt_info.domain;
    let key = &entry.answer_key;
    lines.push(format!("=== Results for {domain} {file} ==="));
    lines.push(format!("File: {file}"));
    lines.push("Correct Answer:".to_string());
    lines.push(key.correct.clone());
    lines.push("Incorrect Options:".to_string());
    lines.push(format!("  1. {}", key.incorrect_1));
    lines.push(format!("  2. {}", key.incorrect_2));
    lines.push(format!("  3. {}", key.incorrect_3));
}

/// Insert a space after every run of `max_chars` non-whitespace characters
/// so that unbroken strings can wrap.
pub fn force_word_break(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + text.len() / max_chars);
    let mut run = 0;
    for c in text.chars() {
        out.push(c);
        if c.is_whitespace() {
            run = 0;
        } else {
            run += 1;
            if run == max_chars {
                out.push(' ');
                run = 0;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionRow;

    fn record(file: &str, group: &str, idx: usize, correct: &str) -> ResultRecord {
        record_in(Domain::EvalManage, file, group, idx, correct)
    }

    fn record_in(
        domain: Domain,
        file: &str,
        group: &str,
        idx: usize,
        correct: &str,
    ) -> ResultRecord {
        let row = QuestionRow {
            prompt: "P [x]".to_string(),
            correct: correct.to_string(),
            incorrect_1: "i1".to_string(),
            incorrect_2: "i2".to_string(),
            incorrect_3: "i3".to_string(),
            ..Default::default()
        };
        ResultRecord::new(
            domain,
            file,
            group,
            idx,
            &row,
            format!("P {group}"),
            vec![format!("answer for {group}")],
        )
    }

    #[test]
    fn test_force_word_break() {
        assert_eq!(force_word_break("abcdefg", 3), "abc def g");
        assert_eq!(force_word_break("ab cd", 3), "ab cd");
        // A run of exactly the width still gets the space
        assert_eq!(force_word_break("abc def", 3), "abc  def ");
        assert_eq!(force_word_break("", 3), "");
    }

    #[test]
    fn test_empty_idx_block() {
        let output = RunOutput {
            llm: "m".to_string(),
            results: vec![],
        };
        assert_eq!(
            render_text(&output, 1),
            "=== Results for idx 0 ===\nNo entries found for this idx.\n"
        );
    }

    #[test]
    fn test_file_header_printed_on_file_change() {
        let output = RunOutput {
            llm: "m".to_string(),
            results: vec![
                record("Spine", "g1", 0, "A"),
                record("Spine", "g2", 0, "A"),
                record("Hand", "g1", 0, "Z"),
                record("Spine", "g1", 1, "B"),
            ],
        };
        let text = render_text(&output, 2);

        assert_eq!(text.matches("=== Results for Eval_Manage Spine ===").count(), 2);
        assert_eq!(text.matches("=== Results for Eval_Manage Hand ===").count(), 1);
        assert_eq!(text.matches("Group:").count(), 4);
        assert!(text.contains("Chat Responses:\n[\"answer for g2\"]"));
        assert!(text.contains("Correct Answer:\nZ\nIncorrect Options:\n  1. i1\n  2. i2\n  3. i3"));

        let idx1 = text.find("=== Results for idx 1 ===").unwrap();
        let hand = text.find("=== Results for Eval_Manage Hand ===").unwrap();
        assert!(hand < idx1);
    }

    #[test]
    fn test_same_label_in_two_domains_gets_two_headers() {
        let output = RunOutput {
            llm: "m".to_string(),
            results: vec![
                record_in(Domain::EvalManage, "Spine", "g1", 0, "EVAL_KEY"),
                record_in(Domain::Diagnosis, "Spine", "g1", 0, "DIAG_KEY"),
            ],
        };
        let text = render_text(&output, 1);

        assert!(text.contains("=== Results for Eval_Manage Spine ===\nFile: Spine\nCorrect Answer:\nEVAL_KEY"));
        assert!(text.contains("=== Results for Diagnosis Spine ===\nFile: Spine\nCorrect Answer:\nDIAG_KEY"));
        assert_eq!(text.matches("Group:").count(), 2);
    }

    #[test]
    fn test_records_beyond_max_idx_are_ignored() {
        let output = RunOutput {
            llm: "m".to_string(),
            results: vec![record("Spine", "g1", 5, "A")],
        };
        let text = render_text(&output, 2);
        assert!(!text.contains("Spine"));
    }
}
