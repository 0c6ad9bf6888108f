use anyhow::Context;
use serde_json::{json, Map, Value};
use std::path::Path;

use crate::auth;

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSection {
    School,
    Security,
}

impl SettingsSection {
    pub const ALL: [SettingsSection; 2] = [Self::School, Self::Security];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "school" => Some(Self::School),
            "security" => Some(Self::Security),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::School => "school",
            Self::Security => "security",
        }
    }
}

fn default_section(section: SettingsSection) -> Value {
    match section {
        SettingsSection::School => json!({
            "name": "Govt: (N) NOOR MUHAMMAD HIGH SCHOOL HYDERABAD",
            "firstSignatory": "First Assistant",
            "secondSignatory": "Chief Headmaster"
        }),
        SettingsSection::Security => json!({
            "adminEmail": auth::DEFAULT_ADMIN_EMAIL,
            "passwordSha256": auth::password_digest(auth::DEFAULT_ADMIN_PASSWORD)
        }),
    }
}

/// Header and signatory captions printed on every certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchoolProfile {
    pub name: String,
    pub first_signatory: String,
    pub second_signatory: String,
}

impl SchoolProfile {
    pub fn from_section(v: &Value) -> Self {
        let get = |k: &str| {
            v.get(k)
                .and_then(|x| x.as_str())
                .map(str::to_string)
                .unwrap_or_default()
        };
        Self {
            name: get("name"),
            first_signatory: get("firstSignatory"),
            second_signatory: get("secondSignatory"),
        }
    }
}

impl Default for SchoolProfile {
    fn default() -> Self {
        Self::from_section(&default_section(SettingsSection::School))
    }
}

fn read_file(workspace: &Path) -> anyhow::Result<Map<String, Value>> {
    let path = workspace.join(SETTINGS_FILE);
    let text = match std::fs::read_to_string(&path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.to_string_lossy()))
        }
    };
    let v: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is invalid JSON", path.to_string_lossy()))?;
    match v {
        Value::Object(m) => Ok(m),
        _ => anyhow::bail!("{} must hold a JSON object", path.to_string_lossy()),
    }
}

/// Stored values layered over the defaults; unknown stored keys are dropped.
pub fn load_section(workspace: &Path, section: SettingsSection) -> anyhow::Result<Value> {
    let file = read_file(workspace)?;
    let mut current = default_section(section);
    if let (Some(obj), Some(Value::Object(stored))) =
        (current.as_object_mut(), file.get(section.key()))
    {
        for (k, v) in stored {
            if obj.contains_key(k) {
                obj.insert(k.clone(), v.clone());
            }
        }
    }
    Ok(current)
}

pub fn save_section(workspace: &Path, section: SettingsSection, value: &Value) -> anyhow::Result<()> {
    let mut file = read_file(workspace)?;
    file.insert(section.key().to_string(), value.clone());
    let path = workspace.join(SETTINGS_FILE);
    let text = serde_json::to_string_pretty(&Value::Object(file))
        .context("failed to serialize settings")?;
    let tmp = path.with_extension("json.saving");
    std::fs::write(&tmp, text)
        .with_context(|| format!("failed to write {}", tmp.to_string_lossy()))?;
    std::fs::rename(&tmp, &path)
        .with_context(|| format!("failed to move settings into {}", path.to_string_lossy()))
}

pub fn school_profile(workspace: Option<&Path>) -> anyhow::Result<SchoolProfile> {
    match workspace {
        Some(ws) => Ok(SchoolProfile::from_section(&load_section(
            ws,
            SettingsSection::School,
        )?)),
        None => Ok(SchoolProfile::default()),
    }
}

/// Section as shown to the front end; the password digest never leaves.
pub fn public_view(section: SettingsSection, mut value: Value) -> Value {
    if section == SettingsSection::Security {
        if let Some(obj) = value.as_object_mut() {
            obj.remove("passwordSha256");
        }
    }
    value
}

fn parse_string_len(v: &Value, key: &str, min_len: usize, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.chars().count() < min_len {
        return Err(format!("{} must not be empty", key));
    }
    if s.chars().count() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

pub fn merge_section_patch(
    section: SettingsSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = current
        .as_object_mut()
        .ok_or_else(|| "internal settings object must be a JSON object".to_string())?;
    for (k, v) in patch {
        match section {
            SettingsSection::School => match k.as_str() {
                "name" => {
                    obj.insert(k.clone(), Value::String(parse_string_len(v, k, 1, 120)?));
                }
                "firstSignatory" | "secondSignatory" => {
                    obj.insert(k.clone(), Value::String(parse_string_len(v, k, 1, 60)?));
                }
                _ => return Err(format!("unknown school field: {}", k)),
            },
            SettingsSection::Security => match k.as_str() {
                "adminEmail" => {
                    let email = parse_string_len(v, k, 1, 254)?;
                    if !auth::looks_like_email(&email) {
                        return Err("adminEmail must be a valid email".into());
                    }
                    obj.insert(k.clone(), Value::String(email));
                }
                "password" => {
                    let Some(p) = v.as_str().filter(|p| !p.is_empty()) else {
                        return Err("password must be a non-empty string".into());
                    };
                    if p.chars().count() > 128 {
                        return Err("password length must be <= 128".into());
                    }
                    obj.insert(
                        "passwordSha256".to_string(),
                        Value::String(auth::password_digest(p)),
                    );
                }
                _ => return Err(format!("unknown security field: {}", k)),
            },
        }
    }
    Ok(())
}
