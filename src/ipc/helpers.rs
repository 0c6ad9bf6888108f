use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::certificate::CertificateError;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::roster::RosterError;
use crate::store::JsonFileStore;
use crate::student;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<RosterError> for HandlerErr {
    fn from(e: RosterError) -> Self {
        let message = e.to_string();
        match e {
            RosterError::Validation(v) => HandlerErr::new("validation_failed", message)
                .with_details(json!({ "fields": v.fields })),
            RosterError::DuplicateGrNo { gr_no } => {
                HandlerErr::new("duplicate_gr_no", message).with_details(json!({ "grNo": gr_no }))
            }
            RosterError::NotFound { id } => {
                HandlerErr::new("not_found", message).with_details(json!({ "id": id }))
            }
            RosterError::ImportRow { row, fields, .. } => HandlerErr::new("import_failed", message)
                .with_details(json!({ "row": row, "fields": fields })),
            RosterError::ImportEmpty => HandlerErr::new("import_failed", message),
            RosterError::Store(e) => {
                tracing::error!(error = ?e, "student store failure");
                HandlerErr::new("store_io_failed", format!("{e:#}"))
            }
        }
    }
}

impl From<CertificateError> for HandlerErr {
    fn from(e: CertificateError) -> Self {
        let message = e.to_string();
        match e {
            CertificateError::MissingRequiredOverride { field } => {
                HandlerErr::new("missing_override", message).with_details(json!({ "field": field }))
            }
            CertificateError::MissingLeavingDate => HandlerErr::new("missing_leaving_date", message),
        }
    }
}

pub fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

pub fn get_optional_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub fn store<'a>(state: &'a AppState) -> Result<&'a JsonFileStore, HandlerErr> {
    state
        .store
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

/// Issue date for certificates. Callers may pin it with `params.today`.
pub fn today(req: &Request) -> Result<NaiveDate, HandlerErr> {
    match req.params.get("today").and_then(|v| v.as_str()) {
        Some(raw) => student::parse_date(raw)
            .ok_or_else(|| HandlerErr::new("bad_params", "today must be a date (YYYY-MM-DD)")),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

pub fn respond(req: &Request, result: Result<Value, HandlerErr>) -> Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}
