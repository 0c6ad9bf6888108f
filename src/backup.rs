use anyhow::{anyhow, Context};
use serde_json::json;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const STUDENTS_ENTRY: &str = "data/students.json";
const SETTINGS_ENTRY: &str = "data/settings.json";
const STUDENTS_FILE: &str = "students.json";
const SETTINGS_FILE: &str = "settings.json";
pub const BUNDLE_FORMAT_V1: &str = "campusflow-workspace-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
}

pub fn export_workspace_bundle(
    workspace_path: &Path,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let students_path = workspace_path.join(STUDENTS_FILE);
    if !students_path.is_file() {
        return Err(anyhow!(
            "workspace student store not found: {}",
            students_path.to_string_lossy()
        ));
    }

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let exported_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": exported_at,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;
    let mut entry_count = 1;

    for (entry, path) in [
        (STUDENTS_ENTRY, students_path),
        (SETTINGS_ENTRY, workspace_path.join(SETTINGS_FILE)),
    ] {
        if !path.is_file() {
            continue;
        }
        zip.start_file(entry, opts)
            .with_context(|| format!("failed to start {} entry", entry))?;
        let mut f = File::open(&path)
            .with_context(|| format!("failed to open {}", path.to_string_lossy()))?;
        std::io::copy(&mut f, &mut zip).with_context(|| format!("failed to write {} entry", entry))?;
        entry_count += 1;
    }

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count,
    })
}

/// Restores a bundle into `workspace_path`. A bare JSON array file is taken
/// as a students.json copy from an older install.
pub fn import_workspace_bundle(
    in_path: &Path,
    workspace_path: &Path,
) -> anyhow::Result<ImportSummary> {
    std::fs::create_dir_all(workspace_path).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace_path.to_string_lossy()
        )
    })?;

    if !is_zip_file(in_path)? {
        let text = std::fs::read_to_string(in_path)
            .with_context(|| format!("failed to read {}", in_path.to_string_lossy()))?;
        let parsed: serde_json::Value =
            serde_json::from_str(&text).context("legacy student file is invalid JSON")?;
        if !parsed.is_array() {
            return Err(anyhow!("legacy student file must hold a JSON array"));
        }
        replace_file(workspace_path, STUDENTS_FILE, text.as_bytes())?;
        return Ok(ImportSummary {
            bundle_format_detected: "legacy-students-json".to_string(),
        });
    }

    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let mut students = Vec::new();
    archive
        .by_name(STUDENTS_ENTRY)
        .context("bundle missing data/students.json")?
        .read_to_end(&mut students)
        .context("failed to extract student store")?;
    let mut settings = None;
    if let Ok(mut entry) = archive.by_name(SETTINGS_ENTRY) {
        let mut buf = Vec::new();
        entry
            .read_to_end(&mut buf)
            .context("failed to extract settings")?;
        settings = Some(buf);
    }

    replace_file(workspace_path, STUDENTS_FILE, &students)?;
    if let Some(buf) = settings {
        replace_file(workspace_path, SETTINGS_FILE, &buf)?;
    }

    Ok(ImportSummary {
        bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
    })
}

fn replace_file(workspace_path: &Path, name: &str, bytes: &[u8]) -> anyhow::Result<()> {
    let dst = workspace_path.join(name);
    let tmp_dst = workspace_path.join(format!("{}.importing", name));
    let mut out = File::create(&tmp_dst)
        .with_context(|| format!("failed to create temp file {}", tmp_dst.to_string_lossy()))?;
    out.write_all(bytes)
        .with_context(|| format!("failed to write {}", tmp_dst.to_string_lossy()))?;
    out.flush().context("failed to flush extracted file")?;
    std::fs::rename(&tmp_dst, &dst)
        .with_context(|| format!("failed to move extracted file to {}", dst.to_string_lossy()))
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.to_string_lossy()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read file signature")?;
    if read < 4 {
        return Ok(false);
    }
    Ok(sig == [0x50, 0x4B, 0x03, 0x04])
}
