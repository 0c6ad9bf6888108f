use crate::auth::{AuthError, Authenticator, StaticCredentials};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::settings::{self, SettingsSection};
use serde_json::json;

fn credentials(state: &AppState) -> anyhow::Result<StaticCredentials> {
    match state.workspace.as_deref() {
        Some(ws) => Ok(StaticCredentials::from_security_section(
            &settings::load_section(ws, SettingsSection::Security)?,
        )),
        None => Ok(StaticCredentials::default()),
    }
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let email = req
        .params
        .get("email")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim();
    let password = req
        .params
        .get("password")
        .and_then(|v| v.as_str())
        .unwrap_or("");

    let creds = match credentials(state) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "store_io_failed", format!("{e:#}"), None),
    };
    match creds.authenticate(email, password) {
        Ok(()) => {
            tracing::info!(email, "login accepted");
            ok(&req.id, json!({ "authenticated": true, "email": email }))
        }
        Err(e @ (AuthError::InvalidEmail | AuthError::MissingPassword)) => {
            err(&req.id, "bad_params", e.to_string(), None)
        }
        Err(e @ AuthError::InvalidCredentials) => {
            tracing::warn!(email, "login rejected");
            err(&req.id, "invalid_credentials", e.to_string(), None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        _ => None,
    }
}
