use crate::ipc::helpers::{get_optional_str, get_required_str, respond, store, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::roster::{ImportMode, Roster, StudentFilter};
use crate::tabular;
use serde_json::json;
use std::path::PathBuf;

fn student_param(req: &Request) -> Result<&serde_json::Value, HandlerErr> {
    req.params
        .get("student")
        .filter(|v| v.is_object())
        .ok_or_else(|| HandlerErr::new("bad_params", "student must be an object"))
}

fn filter_params(req: &Request) -> StudentFilter {
    StudentFilter {
        search: get_optional_str(&req.params, "search"),
        class_studying: get_optional_str(&req.params, "classStudying"),
        section: get_optional_str(&req.params, "section"),
    }
}

fn list(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = store(state)?;
    let listing = Roster::new(store).list(&filter_params(req))?;
    Ok(json!(listing))
}

fn get(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = store(state)?;
    let id = get_required_str(&req.params, "id")?;
    let student = Roster::new(store).get(&id)?;
    Ok(json!({ "student": student }))
}

fn create(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = store(state)?;
    let student = Roster::new(store).add(student_param(req)?)?;
    Ok(json!({ "student": student }))
}

fn update(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = store(state)?;
    let id = get_required_str(&req.params, "id")?;
    let student = Roster::new(store).update(&id, student_param(req)?)?;
    Ok(json!({ "student": student }))
}

fn delete(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = store(state)?;
    let id = get_required_str(&req.params, "id")?;
    Roster::new(store).delete(&id)?;
    Ok(json!({ "ok": true }))
}

fn import(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = store(state)?;
    let path = PathBuf::from(get_required_str(&req.params, "path")?);
    let mode = match get_optional_str(&req.params, "mode") {
        None => ImportMode::default(),
        Some(m) => ImportMode::parse(&m)
            .ok_or_else(|| HandlerErr::new("bad_params", "mode must be replace or append"))?,
    };
    if !path.is_file() {
        return Err(HandlerErr::new("not_found", "import file not found")
            .with_details(json!({ "path": path.to_string_lossy() })));
    }
    let rows = tabular::read_rows(&path).map_err(|e| {
        HandlerErr::new("import_failed", format!("{e:#}"))
            .with_details(json!({ "path": path.to_string_lossy() }))
    })?;
    let summary = Roster::new(store).import(&rows, mode)?;
    Ok(json!(summary))
}

fn export_csv(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = store(state)?;
    let out_path = get_required_str(&req.params, "outPath")?;
    let students = Roster::new(store).list(&filter_params(req))?.students;
    let export_err = |e: anyhow::Error| {
        HandlerErr::new("export_failed", format!("{e:#}"))
            .with_details(json!({ "path": out_path.clone() }))
    };
    let csv = tabular::students_to_csv(&students).map_err(export_err)?;
    tabular::write_text_file(&PathBuf::from(&out_path), &csv).map_err(export_err)?;
    tracing::info!(path = %out_path, rows = students.len(), "students exported");
    Ok(json!({ "rowsExported": students.len(), "path": out_path }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" => list(state, req),
        "students.get" => get(state, req),
        "students.create" => create(state, req),
        "students.update" => update(state, req),
        "students.delete" => delete(state, req),
        "students.import" => import(state, req),
        "students.exportCsv" => export_csv(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
