//! Single-shot persistence of a run's result document.

use crate::models::{ProbeError, Result, RunOutput};
use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Timestamp inserted into the file name on collision.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Writes the result document once, never overwriting an earlier run.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    dir: PathBuf,
    filename: String,
}

impl ResultWriter {
    pub fn new(dir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            filename: filename.into(),
        }
    }

    /// Path the document would be written to at `now`.
    ///
    /// The default name is used when free. Otherwise `_<YYYYMMDD_HHMMSS>` is
    /// inserted before the extension, with a further `_N` when that is taken
    /// too.
    pub fn resolve_path(&self, now: DateTime<Local>) -> PathBuf {
        let default = self.dir.join(&self.filename);
        if !default.exists() {
            return default;
        }

        let (base, ext) = split_extension(&self.filename);
        let stamp = now.format(TIMESTAMP_FORMAT).to_string();
        let stamped = self.dir.join(format!("{base}_{stamp}{ext}"));
        if !stamped.exists() {
            return stamped;
        }

        (1..)
            .map(|n| self.dir.join(format!("{base}_{stamp}_{n}{ext}")))
            .find(|p| !p.exists())
            .unwrap_or(stamped)
    }

    /// Write `output` as pretty JSON and return the chosen path.
    pub fn write(&self, output: &RunOutput) -> Result<PathBuf> {
        self.write_at(output, Local::now())
    }

    pub fn write_at(&self, output: &RunOutput, now: DateTime<Local>) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| ProbeError::io(format!("creating {}", self.dir.display()), e))?;

        let path = self.resolve_path(now);
        persist(&path, |writer| encode(writer, output))?;

        info!(
            path = %path.display(),
            records = output.results.len(),
            "Results written"
        );
        Ok(path)
    }
}

/// Create `path` and fill it with `fill`; a failed fill removes the file.
fn persist<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| ProbeError::io(format!("creating {}", path.display()), e))?;

    let mut writer = BufWriter::new(file);
    let result = fill(&mut writer);
    if result.is_err() {
        drop(writer);
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "Failed to remove partial results");
        }
    }
    result
}

/// Serialize `output` as pretty JSON into `writer` and flush it.
fn encode<W: Write>(mut writer: W, output: &RunOutput) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, output).map_err(|e| {
        if e.is_io() {
            ProbeError::io("writing results", e.into())
        } else {
            ProbeError::Internal(format!("Failed to serialize results: {e}"))
        }
    })?;
    writer
        .flush()
        .map_err(|e| ProbeError::io("flushing results", e))
}

/// Split `name` into stem and extension (with its dot), like `os.path.splitext`.
fn split_extension(name: &str) -> (&str, &str) {
    match Path::new(name).extension() {
        Some(ext) if !ext.is_empty() => {
            let cut = name.len() - ext.len() - 1;
            name.split_at(cut)
        }
        _ => (name, ""),
    }
}

/// Read a result document back.
pub fn read_run_output(path: &Path) -> Result<RunOutput> {
    let content = fs::read_to_string(path)
        .map_err(|e| ProbeError::io(format!("reading {}", path.display()), e))?;
    serde_json::from_str(&content)
        .map_err(|e| ProbeError::Parse(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io;
    use tempfile::TempDir;

    fn output(llm: &str) -> RunOutput {
        RunOutput {
            llm: llm.to_string(),
            results: Vec::new(),
        }
    }

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 4, 14, 19, 12, 52).unwrap()
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("chatGPT_responses.json"), ("chatGPT_responses", ".json"));
        assert_eq!(split_extension("results"), ("results", ""));
        assert_eq!(split_extension("a.b.json"), ("a.b", ".json"));
    }

    #[test]
    fn test_first_write_uses_default_name() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path().join("results"), "chatGPT_responses.json");

        let path = writer.write_at(&output("first"), fixed_time()).unwrap();
        assert_eq!(path, dir.path().join("results").join("chatGPT_responses.json"));
        assert_eq!(read_run_output(&path).unwrap(), output("first"));
    }

    #[test]
    fn test_collision_appends_timestamp_and_keeps_original() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), "chatGPT_responses.json");

        let first = writer.write_at(&output("first"), fixed_time()).unwrap();
        let original = fs::read_to_string(&first).unwrap();

        let second = writer.write_at(&output("second"), fixed_time()).unwrap();
        assert_eq!(
            second,
            dir.path().join("chatGPT_responses_20250414_191252.json")
        );
        assert_eq!(fs::read_to_string(&first).unwrap(), original);
        assert_eq!(read_run_output(&second).unwrap().llm, "second");
    }

    #[test]
    fn test_same_second_collision_gets_counter() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), "out.json");

        writer.write_at(&output("a"), fixed_time()).unwrap();
        writer.write_at(&output("b"), fixed_time()).unwrap();
        let third = writer.write_at(&output("c"), fixed_time()).unwrap();

        assert_eq!(third, dir.path().join("out_20250414_191252_1.json"));
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::StorageFull, "no space left"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_io_error() {
        let err = encode(FullDisk, &output("m")).unwrap_err();
        assert!(matches!(err, ProbeError::Io { .. }), "got {err:?}");
    }

    #[test]
    fn test_failed_fill_removes_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");

        let err = persist(&path, |writer| {
            writer.write_all(b"{\"LLM\": ").map_err(|e| ProbeError::io("test", e))?;
            encode(FullDisk, &output("m"))
        })
        .unwrap_err();

        assert!(matches!(err, ProbeError::Io { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_document_is_pretty_printed() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), "out.json");

        let path = writer.write_at(&output("m"), fixed_time()).unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("\n  \"LLM\": \"m\""));
    }
}
