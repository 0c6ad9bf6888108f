use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::settings::{self, SettingsSection};
use serde_json::json;

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let mut out = serde_json::Map::new();
    for section in SettingsSection::ALL {
        match settings::load_section(&ws, section) {
            Ok(v) => {
                out.insert(
                    section.key().to_string(),
                    settings::public_view(section, v),
                );
            }
            Err(e) => return err(&req.id, "store_io_failed", format!("{e:#}"), None),
        }
    }
    ok(&req.id, serde_json::Value::Object(out))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_key) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SettingsSection::parse(section_key) else {
        return err(
            &req.id,
            "bad_params",
            format!("unknown section: {}", section_key),
            None,
        );
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match settings::load_section(&ws, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "store_io_failed", format!("{e:#}"), None),
    };
    if let Err(msg) = settings::merge_section_patch(section, &mut current, patch) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = settings::save_section(&ws, section, &current) {
        return err(&req.id, "store_io_failed", format!("{e:#}"), None);
    }
    tracing::info!(section = section.key(), "settings updated");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
