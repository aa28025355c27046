use crate::{ConversionMode, JobErrorKind, JobId, JobOutcome, SourceFile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryResult {
    Delivered { filename: String, bytes: u64 },
    Failed { kind: JobErrorKind, message: String },
}

/// Summary of one settled job, kept for the current session only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub job_id: JobId,
    pub mode: ConversionMode,
    pub file_names: Vec<String>,
    pub result: HistoryResult,
}

impl HistoryEntry {
    pub fn new(
        job_id: JobId,
        mode: ConversionMode,
        files: &[SourceFile],
        outcome: &JobOutcome,
    ) -> Self {
        let result = match outcome {
            Ok(artifact) => HistoryResult::Delivered {
                filename: artifact.suggested_filename.clone(),
                bytes: artifact.payload.len() as u64,
            },
            Err(err) => HistoryResult::Failed {
                kind: err.kind,
                message: err.message.clone(),
            },
        };
        Self {
            job_id,
            mode,
            file_names: files.iter().map(|f| f.name.clone()).collect(),
            result,
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.result, HistoryResult::Delivered { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionHistory {
    entries: Vec<HistoryEntry>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Entries in settlement order, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|e| e.succeeded()).count()
    }
}
