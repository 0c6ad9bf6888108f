use std::path::PathBuf;

use serde::Deserialize;

use crate::store::JsonFileStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Owned by the single request loop; every store mutation goes through it.
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<JsonFileStore>,
}
