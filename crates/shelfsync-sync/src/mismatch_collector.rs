//! Per-run mismatch accumulation and flush to disk.
//!
//! Mismatches are collected in memory for the duration of a run and
//! flushed once at the end, one file per mismatch. A write failure for a
//! single file is logged and skipped rather than failing the whole run —
//! the rest of the run's work (HC mutations already applied) is not worth
//! discarding over a filesystem hiccup.

use std::path::PathBuf;

use shelfsync_core::domain::Mismatch;
use tracing::warn;

pub struct MismatchCollector {
    output_dir: PathBuf,
    mismatches: Vec<Mismatch>,
}

impl MismatchCollector {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir, mismatches: Vec::new() }
    }

    pub fn push(&mut self, mismatch: Mismatch) {
        self.mismatches.push(mismatch);
    }

    pub fn len(&self) -> usize {
        self.mismatches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Writes each collected mismatch to `NNN_<sanitized-title>.json` under
    /// the output directory. Individual file failures are logged and do
    /// not stop the rest of the flush.
    pub async fn flush(self) {
        if self.mismatches.is_empty() {
            return;
        }

        if let Err(err) = tokio::fs::create_dir_all(&self.output_dir).await {
            warn!(dir = %self.output_dir.display(), error = %err, "could not create mismatch output directory, dropping mismatches");
            return;
        }

        for (index, mismatch) in self.mismatches.into_iter().enumerate() {
            let filename = mismatch_filename(index + 1, &mismatch.title);
            let path = self.output_dir.join(&filename);
            let payload = mismatch.into_edition_creation_payload();

            let body = match serde_json::to_vec_pretty(&payload) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "could not serialize mismatch payload");
                    continue;
                }
            };

            if let Err(err) = tokio::fs::write(&path, body).await {
                warn!(file = %path.display(), error = %err, "could not write mismatch file");
            }
        }
    }
}

fn mismatch_filename(index: usize, title: &str) -> String {
    format!("{:03}_{}.json", index, Mismatch::sanitize_title(title))
}
