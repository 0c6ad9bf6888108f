use anyhow::{anyhow, Context};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, DataType, Reader, Sheets};
use serde_json::{json, Map, Value};
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use crate::student::{format_date_iso, StudentRecord};

/// Column order for roster exports. Import headers are matched against these
/// names ignoring case, spaces and punctuation, so "G.R No" maps to `grNo`.
pub const COLUMNS: [&str; 33] = [
    "id",
    "grNo",
    "studentName",
    "fatherName",
    "raceAndCaste",
    "religion",
    "placeOfBirth",
    "bForm",
    "cnic",
    "disability",
    "vaccine",
    "dateOfBirth",
    "dateOfBirthInWords",
    "admissionDate",
    "dateOfLeaving",
    "guardianName",
    "guardianCnic",
    "relationshipWithGuardian",
    "contactNo",
    "lastSchoolAttended",
    "classInWhichAdmitted",
    "classStudying",
    "section",
    "newEnrolReEnrol",
    "progress",
    "conduct",
    "grade",
    "examination",
    "underSeatNo",
    "sscRollNo",
    "sscType",
    "reasonOfLeaving",
    "remarks",
];

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Zip container (xlsx, xlsm, ods) and OLE compound file (xls).
const WORKBOOK_SIGNATURES: [[u8; 4]; 2] = [[0x50, 0x4B, 0x03, 0x04], [0xD0, 0xCF, 0x11, 0xE0]];

fn has_workbook_signature(bytes: &[u8]) -> bool {
    WORKBOOK_SIGNATURES.iter().any(|sig| bytes.starts_with(sig))
}

/// Reads the first sheet of a workbook, or a CSV file, into one JSON object
/// per non-empty data row keyed by the header row. Workbooks are recognised
/// by extension or by file signature.
pub fn read_rows(path: &Path) -> anyhow::Result<Vec<Value>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let grid = if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
        let mut workbook = open_workbook_auto(path)
            .with_context(|| format!("failed to open workbook {}", path.to_string_lossy()))?;
        first_sheet_grid(&mut workbook)?
    } else {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
        if has_workbook_signature(&bytes) {
            let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
                .with_context(|| format!("failed to open workbook {}", path.to_string_lossy()))?;
            first_sheet_grid(&mut workbook)?
        } else {
            let text = String::from_utf8_lossy(&bytes);
            parse_csv(text.trim_start_matches('\u{feff}'))
                .into_iter()
                .map(|r| r.into_iter().map(Value::String).collect())
                .collect()
        }
    };
    Ok(rows_from_grid(grid))
}

fn first_sheet_grid<RS: Read + Seek>(workbook: &mut Sheets<RS>) -> anyhow::Result<Vec<Vec<Value>>> {
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("workbook has no sheets"))?;
    let range = workbook
        .worksheet_range(&first)
        .with_context(|| format!("failed to read sheet {}", first))?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_value).collect())
        .collect())
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Float(f) => json!(f),
        Data::Int(i) => json!(i),
        Data::Bool(b) => Value::Bool(*b),
        other => other
            .as_date()
            .map(|d| Value::String(format_date_iso(d)))
            .unwrap_or_else(|| Value::String(other.to_string())),
    }
}

fn rows_from_grid(grid: Vec<Vec<Value>>) -> Vec<Value> {
    let mut it = grid.into_iter();
    let Some(header) = it.next() else {
        return Vec::new();
    };
    let keys: Vec<String> = header
        .iter()
        .map(|h| canonical_column(&cell_text(h)))
        .collect();

    let mut out = Vec::new();
    for row in it {
        if row.iter().all(is_blank) {
            continue;
        }
        let mut obj = Map::new();
        for (key, cell) in keys.iter().zip(row) {
            if key.is_empty() {
                continue;
            }
            obj.insert(key.clone(), cell);
        }
        out.push(Value::Object(obj));
    }
    out
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn canonical_column(header: &str) -> String {
    let key = squash(header);
    COLUMNS
        .iter()
        .find(|c| squash(c) == key)
        .map(|c| c.to_string())
        .unwrap_or_else(|| header.to_string())
}

/// Splits CSV text into records. Quoted fields may contain commas, doubled
/// quotes and line breaks.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                buf.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => row.push(std::mem::take(&mut buf)),
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                row.push(std::mem::take(&mut buf));
                rows.push(std::mem::take(&mut row));
            }
            _ => buf.push(ch),
        }
    }
    if !buf.is_empty() || !row.is_empty() {
        row.push(buf);
        rows.push(row);
    }
    rows
}

pub fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn students_to_csv(students: &[StudentRecord]) -> anyhow::Result<String> {
    let mut csv = COLUMNS.join(",");
    csv.push('\n');
    for s in students {
        let v = serde_json::to_value(s).context("failed to serialize student")?;
        let cells: Vec<String> = COLUMNS
            .iter()
            .map(|c| csv_quote(&cell_text(v.get(*c).unwrap_or(&Value::Null))))
            .collect();
        csv.push_str(&cells.join(","));
        csv.push('\n');
    }
    Ok(csv)
}

pub fn write_text_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write {}", path.to_string_lossy()))
}
