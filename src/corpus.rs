//! Passage/question corpus
//!
//! One `{passage_id}.json` document per passage:
//! `{"passage": "...", "num_questions": 3, "questions": ["...", ...]}`.

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A passage and the evaluation questions written against it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassageDocument {
    #[serde(default)]
    pub passage: String,
    #[serde(default)]
    pub num_questions: usize,
    #[serde(default)]
    pub questions: Vec<String>,
}

/// Read-only access to the passage directory
#[derive(Debug, Clone)]
pub struct PassageStore {
    data_dir: PathBuf,
}

impl PassageStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn is_available(&self) -> bool {
        self.data_dir.is_dir()
    }

    /// All passage ids, numeric ids first in numeric order, then the rest lexically
    pub async fn list_ids(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.data_dir)
            .await
            .map_err(|e| EvalError::Io {
                source: e,
                context: format!("Failed to read data directory {:?}", self.data_dir),
            })?;

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| EvalError::Io {
            source: e,
            context: format!("Failed to list data directory {:?}", self.data_dir),
        })? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if !entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(stem) if is_valid_id(stem) => ids.push(stem.to_string()),
                _ => tracing::debug!("Skipping {:?}: not a valid passage id", path),
            }
        }

        ids.sort_by_cached_key(|id| (id.parse::<u64>().unwrap_or(u64::MAX), id.clone()));
        Ok(ids)
    }

    pub async fn load(&self, passage_id: &str) -> Result<PassageDocument> {
        let not_found = || EvalError::PassageNotFound {
            id: passage_id.to_string(),
        };

        // Ids map straight to file names, so anything path-like is unknown
        if !is_valid_id(passage_id) {
            return Err(not_found());
        }

        let path = self.data_dir.join(format!("{}.json", passage_id));
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            _ => return Err(not_found()),
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| EvalError::Io {
                source: e,
                context: format!("Failed to read passage file {:?}", path),
            })?;

        serde_json::from_str(&content).map_err(|e| {
            tracing::error!("Error parsing {:?}: {}", path, e);
            EvalError::Json {
                source: e,
                context: format!("Could not process data for passage ID '{}'", passage_id),
            }
        })
    }

    /// 1-based question indexes of a passage
    pub async fn question_indexes(&self, passage_id: &str) -> Result<(String, Vec<usize>)> {
        let document = self.load(passage_id).await?;
        let indexes = (1..=document.num_questions).collect();
        Ok((document.passage, indexes))
    }

    /// Question text at a 1-based index
    pub async fn question(&self, passage_id: &str, index: i64) -> Result<String> {
        let document = self.load(passage_id).await?;
        let available = document.questions.len();

        let out_of_range = || EvalError::QuestionOutOfRange {
            id: passage_id.to_string(),
            index,
            available,
        };

        let zero_based = usize::try_from(index)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .ok_or_else(out_of_range)?;

        document
            .questions
            .into_iter()
            .nth(zero_based)
            .ok_or_else(out_of_range)
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_passage(dir: &Path, id: &str, questions: &[&str]) {
        let doc = serde_json::json!({
            "passage": format!("Passage {}", id),
            "num_questions": questions.len(),
            "questions": questions,
        });
        std::fs::write(dir.join(format!("{}.json", id)), doc.to_string()).unwrap();
    }

    #[tokio::test]
    async fn test_list_ids_sorted() {
        let temp = TempDir::new().unwrap();
        for id in ["10", "2", "1"] {
            write_passage(temp.path(), id, &["q"]);
        }
        std::fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let store = PassageStore::new(temp.path().to_path_buf());
        assert_eq!(store.list_ids().await.unwrap(), vec!["1", "2", "10"]);
    }

    #[tokio::test]
    async fn test_every_listed_id_loads() {
        let temp = TempDir::new().unwrap();
        for id in ["3", "intro_a", "draft.v2", "with space"] {
            write_passage(temp.path(), id, &["q"]);
        }
        std::fs::create_dir(temp.path().join("9.json")).unwrap();

        let store = PassageStore::new(temp.path().to_path_buf());
        let ids = store.list_ids().await.unwrap();
        assert_eq!(ids, vec!["3", "intro_a"]);
        for id in &ids {
            assert!(store.load(id).await.is_ok(), "{}", id);
        }

        // A directory named like a passage is not a passage
        assert!(matches!(
            store.load("9").await.unwrap_err(),
            EvalError::PassageNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_question_lookup() {
        let temp = TempDir::new().unwrap();
        write_passage(temp.path(), "42", &["first?", "second?"]);
        let store = PassageStore::new(temp.path().to_path_buf());

        assert_eq!(store.question("42", 2).await.unwrap(), "second?");

        let (passage, indexes) = store.question_indexes("42").await.unwrap();
        assert_eq!(passage, "Passage 42");
        assert_eq!(indexes, vec![1, 2]);

        for bad in [0, -1, 3] {
            let err = store.question("42", bad).await.unwrap_err();
            assert!(matches!(err, EvalError::QuestionOutOfRange { available: 2, .. }));
        }
    }

    #[tokio::test]
    async fn test_unknown_and_unsafe_ids() {
        let temp = TempDir::new().unwrap();
        let store = PassageStore::new(temp.path().to_path_buf());

        for id in ["7", "../etc/passwd", "", "a/b"] {
            let err = store.load(id).await.unwrap_err();
            assert!(matches!(err, EvalError::PassageNotFound { .. }), "{}", id);
        }
    }

    #[tokio::test]
    async fn test_corrupt_document() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("5.json"), "{not json").unwrap();
        let store = PassageStore::new(temp.path().to_path_buf());

        assert!(matches!(
            store.load("5").await.unwrap_err(),
            EvalError::Json { .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let store = PassageStore::new(PathBuf::from("/nonexistent/qna_data"));
        assert!(!store.is_available());
        assert!(store.list_ids().await.is_err());
    }
}
