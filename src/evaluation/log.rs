use crate::error::{EvalError, Result};
use crate::evaluation::{EvaluationRecord, HitValue};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only CSV log of accepted evaluations
///
/// Appends are serialized through a mutex and each row reaches the file in a
/// single write, so concurrent submissions never interleave. The header is
/// written when the file is first created (or found empty).
pub struct EvaluationLog {
    path: PathBuf,
    placeholder: String,
    slots: usize,
    lock: Mutex<()>,
}

impl EvaluationLog {
    pub fn new(path: PathBuf, placeholder: String, slots: usize) -> Self {
        Self {
            path,
            placeholder,
            slots,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Column names, with one value/score pair per slot
    pub fn header(&self) -> Vec<String> {
        let mut columns: Vec<String> = [
            "record_id",
            "date_time",
            "model_name",
            "passage_id",
            "query_index",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();

        for n in 1..=self.slots {
            columns.push(format!("p{}_val", n));
            columns.push(format!("p{}_score", n));
        }
        columns
    }

    pub async fn append(&self, record: &EvaluationRecord) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.append_locked(record)
            .await
            .map_err(|source| EvalError::AppendFault {
                path: self.path.clone(),
                source,
            })
    }

    async fn append_locked(&self, record: &EvaluationRecord) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let needs_header = file.metadata().await?.len() == 0;
        let bytes = self.encode(record, needs_header)?;

        file.write_all(&bytes).await?;
        file.flush().await?;
        file.sync_data().await?;

        tracing::debug!(
            "Appended evaluation {} to {:?} ({} bytes)",
            record.record_id,
            self.path,
            bytes.len()
        );
        Ok(())
    }

    fn encode(&self, record: &EvaluationRecord, with_header: bool) -> io::Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        if with_header {
            writer.write_record(self.header())?;
        }
        writer.write_record(self.row(record))?;
        writer.into_inner().map_err(|e| e.into_error())
    }

    fn row(&self, record: &EvaluationRecord) -> Vec<String> {
        let mut row = vec![
            record.record_id.to_string(),
            record.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            record.model_name.to_string(),
            record.passage_id.clone(),
            record.query_index.to_string(),
        ];

        for hit in &record.hits {
            row.push(match hit.value {
                HitValue::Placeholder => self.placeholder.clone(),
                HitValue::Passage(id) => id.to_string(),
            });
            row.push(hit.score.to_string());
        }
        row
    }
}
