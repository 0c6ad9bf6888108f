mod test_support;

use serde_json::json;
use test_support::{open_workspace, request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn default_account_logs_in_without_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let ok = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "auth.login",
        json!({ "email": "admin@campusflow.com", "password": "password123" }),
    );
    assert_eq!(ok["authenticated"], json!(true));

    let bad = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "auth.login",
        json!({ "email": "admin@campusflow.com", "password": "nope" }),
    );
    assert_eq!(bad["code"], json!("invalid_credentials"));
    assert_eq!(bad["message"], json!("Invalid email or password."));

    let malformed = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "auth.login",
        json!({ "email": "admin", "password": "password123" }),
    );
    assert_eq!(malformed["code"], json!("bad_params"));
}

#[test]
fn setup_sections_roundtrip_and_password_change() {
    let workspace = temp_dir("campusflow-setup");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    open_workspace(&mut stdin, &mut reader, &workspace);

    let defaults = request_ok(&mut stdin, &mut reader, "1", "setup.get", json!({}));
    assert_eq!(defaults["school"]["secondSignatory"], json!("Chief Headmaster"));
    assert!(defaults["security"].get("passwordSha256").is_none());

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "setup.update",
        json!({
            "section": "security",
            "patch": { "adminEmail": "office@school.edu.pk", "password": "s3cret" }
        }),
    );
    let bad = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "setup.update",
        json!({ "section": "school", "patch": { "motto": "x" } }),
    );
    assert_eq!(bad["code"], json!("bad_params"));

    let updated = request_ok(&mut stdin, &mut reader, "4", "setup.get", json!({}));
    assert_eq!(updated["security"]["adminEmail"], json!("office@school.edu.pk"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "auth.login",
        json!({ "email": "office@school.edu.pk", "password": "s3cret" }),
    );
    let old = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "auth.login",
        json!({ "email": "admin@campusflow.com", "password": "password123" }),
    );
    assert_eq!(old["code"], json!("invalid_credentials"));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn health_and_unknown_methods() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health["version"].is_string());
    assert!(health["workspacePath"].is_null());

    let e = request_err(&mut stdin, &mut reader, "2", "classes.list", json!({}));
    assert_eq!(e["code"], json!("not_implemented"));
}
