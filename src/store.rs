use anyhow::Context;
use std::path::{Path, PathBuf};

use crate::student::StudentRecord;

pub const STUDENTS_FILE: &str = "students.json";

/// Whole-collection persistence boundary. Every mutation loads the full set,
/// edits it in memory and saves the full set back; the store itself enforces
/// no constraints.
///
/// Two interleaved load/save cycles lose the earlier write. The daemon only
/// ever drives a store from its single request loop.
pub trait RecordStore {
    fn load(&self) -> anyhow::Result<Vec<StudentRecord>>;
    fn save(&self, all: &[StudentRecord]) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(workspace).with_context(|| {
            format!("failed to create workspace {}", workspace.to_string_lossy())
        })?;
        Ok(Self {
            path: workspace.join(STUDENTS_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for JsonFileStore {
    /// A missing file is an empty collection and an unreadable one degrades to
    /// empty with a warning. Content that does not parse, down to a single
    /// record, is an error; callers must not save over it.
    fn load(&self) -> anyhow::Result<Vec<StudentRecord>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "could not read student store");
                return Ok(Vec::new());
            }
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<serde_json::Value> = serde_json::from_str(&text).with_context(|| {
            format!("{} is not a JSON array", self.path.to_string_lossy())
        })?;

        let mut out = Vec::with_capacity(raw.len());
        for (idx, v) in raw.into_iter().enumerate() {
            let id = v.get("id").map(|id| id.to_string()).unwrap_or_default();
            let record = serde_json::from_value::<StudentRecord>(v).with_context(|| {
                format!(
                    "student record {} (id {}) in {} is unreadable",
                    idx + 1,
                    id,
                    self.path.to_string_lossy()
                )
            })?;
            out.push(record);
        }
        Ok(out)
    }

    fn save(&self, all: &[StudentRecord]) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(all).context("failed to serialize students")?;
        let tmp = self.path.with_extension("json.saving");
        std::fs::write(&tmp, text)
            .with_context(|| format!("failed to write {}", tmp.to_string_lossy()))?;
        std::fs::rename(&tmp, &self.path).with_context(|| {
            format!("failed to move store into {}", self.path.to_string_lossy())
        })?;
        tracing::debug!(path = %self.path.display(), count = all.len(), "saved student store");
        Ok(())
    }
}
