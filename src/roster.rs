use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use uuid::Uuid;

use crate::store::RecordStore;
use crate::student::{number_text, validate, StudentRecord, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a student with G.R. No. {gr_no} already exists")]
    DuplicateGrNo { gr_no: String },
    #[error("student not found")]
    NotFound { id: String },
    #[error("import row {row}: {message}")]
    ImportRow {
        row: usize,
        message: String,
        fields: BTreeMap<String, String>,
    },
    #[error("spreadsheet is empty or invalid")]
    ImportEmpty,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Imported rows become the whole roster.
    #[default]
    Replace,
    /// Imported rows are added after the existing records.
    Append,
}

impl ImportMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "replace" => Some(Self::Replace),
            "append" => Some(Self::Append),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub search: Option<String>,
    pub class_studying: Option<String>,
    pub section: Option<String>,
}

impl StudentFilter {
    pub fn matches(&self, s: &StudentRecord) -> bool {
        if let Some(q) = self.search.as_deref() {
            let q = q.trim().to_lowercase();
            let hit = [&s.student_name, &s.gr_no, &s.father_name, &s.guardian_cnic]
                .iter()
                .any(|field| field.to_lowercase().contains(&q));
            if !q.is_empty() && !hit {
                return false;
            }
        }
        if let Some(c) = self.class_studying.as_deref() {
            if c != "all" && s.class_studying != c {
                return false;
            }
        }
        if let Some(sec) = self.section.as_deref() {
            if sec != "all" && s.section != sec {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterListing {
    pub students: Vec<StudentRecord>,
    /// Distinct values over the whole roster, for filter pickers.
    pub classes: Vec<String>,
    pub sections: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: usize,
    pub total: usize,
}

pub struct Roster<'a, S: RecordStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> Roster<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn list(&self, filter: &StudentFilter) -> Result<RosterListing, RosterError> {
        let all = self.store.load()?;
        let classes: BTreeSet<String> = all.iter().map(|s| s.class_studying.clone()).collect();
        let sections: BTreeSet<String> = all.iter().map(|s| s.section.clone()).collect();
        let students = all.into_iter().filter(|s| filter.matches(s)).collect();
        Ok(RosterListing {
            students,
            classes: classes.into_iter().collect(),
            sections: sections.into_iter().collect(),
        })
    }

    pub fn get(&self, id: &str) -> Result<StudentRecord, RosterError> {
        self.store
            .load()?
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| RosterError::NotFound { id: id.to_string() })
    }

    /// Looks up several ids, keeping the caller's order.
    pub fn get_many(&self, ids: &[String]) -> Result<Vec<StudentRecord>, RosterError> {
        let all = self.store.load()?;
        ids.iter()
            .map(|id| {
                all.iter()
                    .find(|s| &s.id == id)
                    .cloned()
                    .ok_or_else(|| RosterError::NotFound { id: id.clone() })
            })
            .collect()
    }

    pub fn add(&self, candidate: &Value) -> Result<StudentRecord, RosterError> {
        let mut record = validate(candidate)?;
        let mut all = self.store.load()?;
        if all.iter().any(|s| s.gr_no == record.gr_no) {
            return Err(RosterError::DuplicateGrNo {
                gr_no: record.gr_no,
            });
        }
        record.id = new_id();
        all.insert(0, record.clone());
        self.store.save(&all)?;
        tracing::info!(id = %record.id, gr_no = %record.gr_no, "student added");
        Ok(record)
    }

    pub fn update(&self, id: &str, candidate: &Value) -> Result<StudentRecord, RosterError> {
        let mut all = self.store.load()?;
        let Some(idx) = all.iter().position(|s| s.id == id) else {
            return Err(RosterError::NotFound { id: id.to_string() });
        };
        let mut record = validate(candidate)?;
        if all.iter().any(|s| s.gr_no == record.gr_no && s.id != id) {
            return Err(RosterError::DuplicateGrNo {
                gr_no: record.gr_no,
            });
        }
        record.id = id.to_string();
        all[idx] = record.clone();
        self.store.save(&all)?;
        tracing::info!(id = %id, "student updated");
        Ok(record)
    }

    pub fn delete(&self, id: &str) -> Result<(), RosterError> {
        let mut all = self.store.load()?;
        let before = all.len();
        all.retain(|s| s.id != id);
        if all.len() == before {
            return Err(RosterError::NotFound { id: id.to_string() });
        }
        self.store.save(&all)?;
        tracing::info!(id = %id, "student deleted");
        Ok(())
    }

    /// Validates every row before touching the store; the first bad row
    /// aborts the whole import. Row numbers are 1-based data rows.
    pub fn import(&self, rows: &[Value], mode: ImportMode) -> Result<ImportSummary, RosterError> {
        if rows.is_empty() {
            return Err(RosterError::ImportEmpty);
        }
        let existing = match mode {
            ImportMode::Replace => Vec::new(),
            ImportMode::Append => self.store.load()?,
        };
        let mut gr_nos: HashSet<String> = existing.iter().map(|s| s.gr_no.clone()).collect();
        let mut ids: HashSet<String> = existing.iter().map(|s| s.id.clone()).collect();

        let mut imported = Vec::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            let row_no = idx + 1;
            let mut record = validate(row).map_err(|e| RosterError::ImportRow {
                row: row_no,
                message: e.to_string(),
                fields: e.fields,
            })?;
            if !gr_nos.insert(record.gr_no.clone()) {
                let mut fields = BTreeMap::new();
                fields.insert("grNo".to_string(), "duplicate G.R No".to_string());
                return Err(RosterError::ImportRow {
                    row: row_no,
                    message: format!("G.R. No. {} appears more than once", record.gr_no),
                    fields,
                });
            }
            let supplied = row
                .get("id")
                .and_then(|v| match v {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(number_text(n)),
                    _ => None,
                })
                .filter(|s| !s.is_empty() && !ids.contains(s));
            record.id = supplied.unwrap_or_else(new_id);
            ids.insert(record.id.clone());
            imported.push(record);
        }

        let count = imported.len();
        let mut all = existing;
        all.extend(imported);
        self.store.save(&all)?;
        tracing::info!(imported = count, total = all.len(), ?mode, "students imported");
        Ok(ImportSummary {
            imported: count,
            total: all.len(),
        })
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}
