#[path = "../src/backup.rs"]
mod backup;

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

#[test]
fn zip_export_and_import_roundtrip() {
    let workspace = temp_dir("campusflow-backup-src");
    let workspace2 = temp_dir("campusflow-backup-dst");
    let out_dir = temp_dir("campusflow-backup-out");

    let students = br#"[{"id":"s1","grNo":"1001"}]"#;
    let settings = br#"{"school":{"name":"Model High School"}}"#;
    std::fs::write(workspace.join("students.json"), students).expect("write students");
    std::fs::write(workspace.join("settings.json"), settings).expect("write settings");

    let bundle_path = out_dir.join("workspace.campusflow.zip");
    let export = backup::export_workspace_bundle(&workspace, &bundle_path).expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT_V1);
    assert_eq!(export.entry_count, 3);

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    assert!(manifest.contains(backup::BUNDLE_FORMAT_V1));
    archive
        .by_name("data/students.json")
        .expect("student entry in bundle");

    let import = backup::import_workspace_bundle(&bundle_path, &workspace2).expect("import bundle");
    assert_eq!(import.bundle_format_detected, backup::BUNDLE_FORMAT_V1);

    let restored = std::fs::read(workspace2.join("students.json")).expect("read restored");
    assert_eq!(restored, students);
    let restored = std::fs::read(workspace2.join("settings.json")).expect("read settings");
    assert_eq!(restored, settings);

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(workspace2);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn export_without_students_fails() {
    let workspace = temp_dir("campusflow-backup-empty");
    let out = workspace.join("out.zip");
    assert!(backup::export_workspace_bundle(&workspace, &out).is_err());
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn legacy_students_json_import_is_supported() {
    let out_dir = temp_dir("campusflow-backup-legacy");
    let workspace = temp_dir("campusflow-backup-legacy-dst");

    let legacy_file = out_dir.join("students-export.json");
    let bytes = br#"[{"id":"1","grNo":"77"}]"#;
    std::fs::write(&legacy_file, bytes).expect("write legacy file");

    let import =
        backup::import_workspace_bundle(&legacy_file, &workspace).expect("import legacy file");
    assert_eq!(import.bundle_format_detected, "legacy-students-json");

    let restored = std::fs::read(workspace.join("students.json")).expect("read restored");
    assert_eq!(restored, bytes);

    let not_array = out_dir.join("object.json");
    std::fs::write(&not_array, b"{}").expect("write object file");
    assert!(backup::import_workspace_bundle(&not_array, &workspace).is_err());

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}
