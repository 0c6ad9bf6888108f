use crate::certificate::{self, CertificateRequest, CertificateType};
use crate::ipc::helpers::{get_optional_str, get_required_str, respond, store, today, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::render;
use crate::roster::Roster;
use crate::settings;
use crate::student::StudentRecord;
use crate::tabular;
use serde_json::json;
use std::path::PathBuf;

fn certificate_type(req: &Request) -> Result<CertificateType, HandlerErr> {
    let raw = get_required_str(&req.params, "certificateType")?;
    CertificateType::parse(&raw).ok_or_else(|| {
        HandlerErr::new(
            "bad_params",
            format!("unknown certificateType: {}", raw),
        )
        .with_details(json!({
            "allowed": CertificateType::ALL.iter().map(|t| t.label()).collect::<Vec<_>>()
        }))
    })
}

fn student_ids(req: &Request) -> Result<Vec<String>, HandlerErr> {
    let ids: Vec<String> = req
        .params
        .get("studentIds")
        .and_then(|v| v.as_array())
        .ok_or_else(|| HandlerErr::new("bad_params", "studentIds must be an array"))?
        .iter()
        .filter_map(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if ids.is_empty() {
        return Err(HandlerErr::new("bad_params", "select at least one student"));
    }
    Ok(ids)
}

fn build_requests(
    req: &Request,
    certificate_type: CertificateType,
    students: Vec<StudentRecord>,
) -> Vec<CertificateRequest> {
    let grade_override = get_optional_str(&req.params, "gradeOverride");
    let character_override = get_optional_str(&req.params, "characterOverride");
    students
        .into_iter()
        .map(|student| CertificateRequest {
            certificate_type,
            student,
            grade_override: grade_override.clone(),
            character_override: character_override.clone(),
        })
        .collect()
}

fn derive_selected(
    state: &AppState,
    req: &Request,
) -> Result<(CertificateType, Vec<certificate::CertificateContent>), HandlerErr> {
    let store = store(state)?;
    let certificate_type = certificate_type(req)?;
    let ids = student_ids(req)?;
    let today = today(req)?;
    let students = Roster::new(store).get_many(&ids)?;
    let requests = build_requests(req, certificate_type, students);

    match certificate::derive_batch(&requests, today) {
        Ok(contents) => Ok((certificate_type, contents)),
        Err(failures) => {
            let details: Vec<serde_json::Value> = failures
                .into_iter()
                .map(|(student_id, e)| {
                    let code = HandlerErr::from(e.clone()).code;
                    json!({ "studentId": student_id, "code": code, "message": e.to_string() })
                })
                .collect();
            Err(HandlerErr::new(
                "certificate_failed",
                format!("{} of {} certificates could not be generated", details.len(), ids.len()),
            )
            .with_details(json!({ "failures": details })))
        }
    }
}

fn derive(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let store = store(state)?;
    let certificate_type = certificate_type(req)?;
    let id = get_required_str(&req.params, "studentId")?;
    let today = today(req)?;
    let student = Roster::new(store).get(&id)?;
    let request = build_requests(req, certificate_type, vec![student])
        .into_iter()
        .next()
        .ok_or_else(|| HandlerErr::new("not_found", "student not found"))?;
    let content = certificate::derive(&request, today)?;
    Ok(json!({ "content": content, "text": content.body.to_text() }))
}

fn derive_batch(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let (_, contents) = derive_selected(state, req)?;
    tracing::info!(count = contents.len(), "certificates derived");
    Ok(json!({ "contents": contents }))
}

fn render_html(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let (certificate_type, contents) = derive_selected(state, req)?;
    let school = settings::school_profile(state.workspace.as_deref())
        .map_err(|e| HandlerErr::new("store_io_failed", format!("{e:#}")))?;
    let html = render::render_html(certificate_type, &contents, &school);
    let file_name = render::suggested_file_name(certificate_type, &contents, today(req)?, "html");

    match get_optional_str(&req.params, "outPath").filter(|p| !p.trim().is_empty()) {
        Some(out_path) => {
            tabular::write_text_file(&PathBuf::from(&out_path), &html).map_err(|e| {
                HandlerErr::new("export_failed", format!("{e:#}"))
                    .with_details(json!({ "path": out_path.clone() }))
            })?;
            tracing::info!(path = %out_path, count = contents.len(), "certificates rendered");
            Ok(json!({ "path": out_path, "fileName": file_name, "count": contents.len() }))
        }
        None => Ok(json!({ "html": html, "fileName": file_name, "count": contents.len() })),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "certificates.derive" => derive(state, req),
        "certificates.deriveBatch" => derive_batch(state, req),
        "certificates.renderHtml" => render_html(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
