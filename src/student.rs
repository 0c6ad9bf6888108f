use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::words;

pub const DEFAULT_DISABILITY: &str = "N/A";

/// Closed set of literal values accepted for an enum-typed student field.
/// Matching is exact and case-sensitive.
pub trait Choice: Copy + Sized + 'static {
    const ALL: &'static [Self];

    fn label(self) -> &'static str;

    fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.label() == s)
    }

    fn allowed() -> String {
        Self::ALL
            .iter()
            .map(|c| c.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vaccine {
    Yes,
    No,
}

impl Choice for Vaccine {
    const ALL: &'static [Self] = &[Self::Yes, Self::No];

    fn label(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Enrolment {
    #[serde(rename = "New Enrol")]
    NewEnrol,
    #[serde(rename = "Re-Enrol")]
    ReEnrol,
}

impl Choice for Enrolment {
    const ALL: &'static [Self] = &[Self::NewEnrol, Self::ReEnrol];

    fn label(self) -> &'static str {
        match self {
            Self::NewEnrol => "New Enrol",
            Self::ReEnrol => "Re-Enrol",
        }
    }
}

/// Shared scale for `progress` and `conduct`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Excellent,
    Good,
    Average,
    Poor,
}

impl Choice for Rating {
    const ALL: &'static [Self] = &[Self::Excellent, Self::Good, Self::Average, Self::Poor];

    fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Average => "Average",
            Self::Poor => "Poor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Examination {
    #[serde(rename = "Class 6")]
    Class6,
    #[serde(rename = "Class 7")]
    Class7,
    #[serde(rename = "Class 8")]
    Class8,
    #[serde(rename = "S.S.C Part-I Annual")]
    SscPartOne,
    #[serde(rename = "S.S.C Part-II Annual")]
    SscPartTwo,
}

impl Choice for Examination {
    const ALL: &'static [Self] = &[
        Self::Class6,
        Self::Class7,
        Self::Class8,
        Self::SscPartOne,
        Self::SscPartTwo,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Class6 => "Class 6",
            Self::Class7 => "Class 7",
            Self::Class8 => "Class 8",
            Self::SscPartOne => "S.S.C Part-I Annual",
            Self::SscPartTwo => "S.S.C Part-II Annual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SscType {
    #[serde(rename = "SSC I")]
    SscOne,
    #[serde(rename = "SSC II")]
    SscTwo,
}

impl Choice for SscType {
    const ALL: &'static [Self] = &[Self::SscOne, Self::SscTwo];

    fn label(self) -> &'static str {
        match self {
            Self::SscOne => "SSC I",
            Self::SscTwo => "SSC II",
        }
    }
}

macro_rules! display_via_label {
    ($($t:ty),*) => {
        $(impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        })*
    };
}

display_via_label!(Vaccine, Enrolment, Rating, Examination, SscType);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: String,
    pub gr_no: String,
    pub student_name: String,
    pub father_name: String,
    pub race_and_caste: String,
    pub religion: String,
    pub place_of_birth: String,
    pub b_form: String,
    #[serde(default)]
    pub cnic: String,
    #[serde(default = "default_disability")]
    pub disability: String,
    pub vaccine: Vaccine,
    #[serde(with = "date_serde")]
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub date_of_birth_in_words: String,
    #[serde(with = "date_serde")]
    pub admission_date: NaiveDate,
    #[serde(default, with = "opt_date_serde")]
    pub date_of_leaving: Option<NaiveDate>,
    pub guardian_name: String,
    pub guardian_cnic: String,
    pub relationship_with_guardian: String,
    pub contact_no: String,
    #[serde(default)]
    pub last_school_attended: String,
    pub class_in_which_admitted: String,
    pub class_studying: String,
    pub section: String,
    pub new_enrol_re_enrol: Enrolment,
    pub progress: Rating,
    pub conduct: Rating,
    pub grade: String,
    pub examination: Examination,
    pub under_seat_no: String,
    #[serde(default)]
    pub ssc_roll_no: String,
    #[serde(default)]
    pub ssc_type: Option<SscType>,
    #[serde(default)]
    pub reason_of_leaving: String,
    #[serde(default)]
    pub remarks: String,
}

fn default_disability() -> String {
    DEFAULT_DISABILITY.to_string()
}

/// Field-level validation failures keyed by wire field name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid student record: {}", summarize(.fields))]
pub struct ValidationError {
    pub fields: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.to_string(), message.into());
        Self { fields }
    }
}

fn summarize(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validates a candidate record. The returned record carries an empty `id`;
/// callers assign a fresh id on create and keep the stored one on update.
pub fn validate(candidate: &Value) -> Result<StudentRecord, ValidationError> {
    let Some(obj) = candidate.as_object() else {
        return Err(ValidationError::single("student", "must be an object"));
    };
    let mut r = FieldReader {
        obj,
        errors: BTreeMap::new(),
    };

    let gr_no = r.required_str("grNo", "G.R No is required");
    let student_name = r.required_str("studentName", "Student name is required");
    let father_name = r.required_str("fatherName", "Father's name is required");
    let race_and_caste = r.required_str("raceAndCaste", "Race and Caste is required");
    let religion = r.required_str("religion", "Religion is required");
    let place_of_birth = r.required_str("placeOfBirth", "Place of birth is required");
    let b_form = r.required_str("bForm", "B. Form is required");
    let cnic = r.optional_str("cnic");
    let disability = r.optional_str("disability");
    let vaccine = r.required_choice::<Vaccine>("vaccine", "Vaccine status is required");
    let date_of_birth = r.required_date("dateOfBirth", "Date of Birth is required");
    let date_of_birth_in_words = r.optional_str("dateOfBirthInWords");
    let admission_date = r.required_date("admissionDate", "Admission Date is required");
    let date_of_leaving = r.optional_date("dateOfLeaving");
    let guardian_name = r.required_str("guardianName", "Guardian Name is required");
    let guardian_cnic = r.required_str("guardianCnic", "Guardian CNIC is required");
    let relationship_with_guardian = r.required_str(
        "relationshipWithGuardian",
        "Relationship with Guardian is required",
    );
    let contact_no = r.required_str("contactNo", "Contact No. is required");
    let last_school_attended = r.optional_str("lastSchoolAttended");
    let class_in_which_admitted = r.required_str(
        "classInWhichAdmitted",
        "Class in which admitted is required",
    );
    let class_studying = r.required_str("classStudying", "Class is required");
    let section = r.required_str("section", "Section is required");
    let new_enrol_re_enrol =
        r.required_choice::<Enrolment>("newEnrolReEnrol", "Enrollment status is required");
    let progress = r.required_choice::<Rating>("progress", "Progress is required");
    let conduct = r.required_choice::<Rating>("conduct", "Conduct is required");
    let grade = r.required_str("grade", "Grade is required");
    let examination = r.required_choice::<Examination>("examination", "Examination is required");
    let under_seat_no = r.required_str("underSeatNo", "Seat No. is required");
    let ssc_roll_no = r.optional_str("sscRollNo");
    let ssc_type = r.optional_choice::<SscType>("sscType");
    let reason_of_leaving = r.optional_str("reasonOfLeaving");
    let remarks = r.optional_str("remarks");

    let (
        Some(vaccine),
        Some(date_of_birth),
        Some(admission_date),
        Some(new_enrol_re_enrol),
        Some(progress),
        Some(conduct),
        Some(examination),
    ) = (
        vaccine,
        date_of_birth,
        admission_date,
        new_enrol_re_enrol,
        progress,
        conduct,
        examination,
    )
    else {
        return Err(r.into_error());
    };
    if !r.errors.is_empty() {
        return Err(r.into_error());
    }

    let disability = if disability.is_empty() {
        default_disability()
    } else {
        disability
    };
    let date_of_birth_in_words = if date_of_birth_in_words.is_empty() {
        words::date_in_words(date_of_birth)
    } else {
        date_of_birth_in_words
    };

    Ok(StudentRecord {
        id: String::new(),
        gr_no,
        student_name,
        father_name,
        race_and_caste,
        religion,
        place_of_birth,
        b_form,
        cnic,
        disability,
        vaccine,
        date_of_birth,
        date_of_birth_in_words,
        admission_date,
        date_of_leaving,
        guardian_name,
        guardian_cnic,
        relationship_with_guardian,
        contact_no,
        last_school_attended,
        class_in_which_admitted,
        class_studying,
        section,
        new_enrol_re_enrol,
        progress,
        conduct,
        grade,
        examination,
        under_seat_no,
        ssc_roll_no,
        ssc_type,
        reason_of_leaving,
        remarks,
    })
}

struct FieldReader<'a> {
    obj: &'a Map<String, Value>,
    errors: BTreeMap<String, String>,
}

impl FieldReader<'_> {
    fn fail(&mut self, key: &str, message: impl Into<String>) {
        self.errors
            .entry(key.to_string())
            .or_insert_with(|| message.into());
    }

    /// Text form of a scalar. Spreadsheet numbers arrive as JSON numbers.
    fn text(&mut self, key: &str) -> Option<String> {
        match self.obj.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(number_text(n)),
            Some(Value::Bool(b)) => Some(b.to_string()),
            Some(_) => {
                self.fail(key, "must be a string");
                None
            }
        }
    }

    fn required_str(&mut self, key: &str, missing: &str) -> String {
        match self.text(key) {
            Some(s) if !s.is_empty() => s,
            _ => {
                self.fail(key, missing);
                String::new()
            }
        }
    }

    fn optional_str(&mut self, key: &str) -> String {
        self.text(key).unwrap_or_default()
    }

    fn required_choice<T: Choice>(&mut self, key: &str, missing: &str) -> Option<T> {
        match self.text(key) {
            Some(s) if !s.is_empty() => self.choice(key, &s),
            _ => {
                self.fail(key, missing);
                None
            }
        }
    }

    fn optional_choice<T: Choice>(&mut self, key: &str) -> Option<T> {
        match self.text(key) {
            Some(s) if !s.is_empty() => self.choice(key, &s),
            _ => None,
        }
    }

    fn choice<T: Choice>(&mut self, key: &str, s: &str) -> Option<T> {
        let parsed = T::parse(s);
        if parsed.is_none() {
            self.fail(key, format!("must be one of: {}", T::allowed()));
        }
        parsed
    }

    fn required_date(&mut self, key: &str, missing: &str) -> Option<NaiveDate> {
        match self.obj.get(key) {
            None | Some(Value::Null) => {
                self.fail(key, missing);
                None
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                self.fail(key, missing);
                None
            }
            Some(v) => self.date(key, v),
        }
    }

    fn optional_date(&mut self, key: &str) -> Option<NaiveDate> {
        match self.obj.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(v) => self.date(key, v),
        }
    }

    fn date(&mut self, key: &str, v: &Value) -> Option<NaiveDate> {
        let parsed = v.as_str().and_then(parse_date);
        if parsed.is_none() {
            self.fail(key, "must be a valid date");
        }
        parsed
    }

    fn into_error(self) -> ValidationError {
        ValidationError {
            fields: self.errors,
        }
    }
}

pub(crate) fn number_text(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

/// Parses the textual date forms found in stored records and spreadsheets.
/// Timestamps keep the calendar day as written; no timezone shift is applied.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in ["%d-%m-%Y", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

pub fn format_date_iso(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

mod date_serde {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_date_iso(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_date(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", raw)))
    }
}

mod opt_date_serde {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_str(&super::format_date_iso(*d)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => super::parse_date(s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", s))),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::candidate;
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_candidate_gets_defaults() {
        let rec = validate(&candidate("101", "Ali Khan")).expect("valid");
        assert_eq!(rec.disability, "N/A");
        assert_eq!(rec.cnic, "");
        assert_eq!(rec.date_of_leaving, None);
        assert_eq!(rec.ssc_type, None);
        assert_eq!(
            rec.date_of_birth_in_words,
            "Fourteenth March Two Thousand Eight"
        );
        assert!(rec.id.is_empty());
    }

    #[test]
    fn reports_every_failing_field() {
        let mut c = candidate("", "Ali Khan");
        c["vaccine"] = json!("yes");
        c["admissionDate"] = json!("not a date");
        c.as_object_mut().expect("object").remove("section");

        let e = validate(&c).expect_err("invalid");
        assert_eq!(e.fields.get("grNo").map(String::as_str), Some("G.R No is required"));
        assert_eq!(
            e.fields.get("vaccine").map(String::as_str),
            Some("must be one of: Yes, No")
        );
        assert_eq!(
            e.fields.get("admissionDate").map(String::as_str),
            Some("must be a valid date")
        );
        assert_eq!(
            e.fields.get("section").map(String::as_str),
            Some("Section is required")
        );
        assert_eq!(e.fields.len(), 4);
    }

    #[test]
    fn enum_labels_are_case_sensitive() {
        let mut c = candidate("1", "A");
        c["examination"] = json!("class 6");
        assert!(validate(&c).is_err());
        c["examination"] = json!("Class 6");
        assert_eq!(
            validate(&c).expect("valid").examination,
            Examination::Class6
        );
    }

    #[test]
    fn optional_leaving_date_must_parse_when_present() {
        let mut c = candidate("1", "A");
        c["dateOfLeaving"] = json!("");
        assert_eq!(validate(&c).expect("valid").date_of_leaving, None);
        c["dateOfLeaving"] = json!("31/02/2024");
        assert!(validate(&c).is_err());
        c["dateOfLeaving"] = json!("2024-03-31T00:00:00.000Z");
        assert_eq!(
            validate(&c).expect("valid").date_of_leaving,
            NaiveDate::from_ymd_opt(2024, 3, 31)
        );
    }

    #[test]
    fn leaving_before_admission_is_accepted() {
        let mut c = candidate("1", "A");
        c["dateOfLeaving"] = json!("2019-01-01");
        assert!(validate(&c).is_ok());
    }

    #[test]
    fn spreadsheet_numbers_become_text() {
        let mut c = candidate("1", "A");
        c["grNo"] = json!(1234);
        c["contactNo"] = json!(3001234567.0);
        let rec = validate(&c).expect("valid");
        assert_eq!(rec.gr_no, "1234");
        assert_eq!(rec.contact_no, "3001234567");
    }

    #[test]
    fn validate_is_idempotent() {
        let mut c = candidate("77", "Sara Ali");
        c["sscType"] = json!("SSC II");
        c["dateOfLeaving"] = json!("2024-05-30");
        c["remarks"] = json!("  transferred  ");
        let once = validate(&c).expect("valid");
        let again = validate(&serde_json::to_value(&once).expect("json")).expect("valid");
        assert_eq!(once, again);
        assert_eq!(once.remarks, "transferred");
    }

    #[test]
    fn parse_date_accepts_stored_forms() {
        let d = NaiveDate::from_ymd_opt(2020, 1, 10);
        assert_eq!(parse_date("2020-01-10"), d);
        assert_eq!(parse_date("2020-01-10T00:00:00.000Z"), d);
        assert_eq!(parse_date("2020-01-10T23:30:00+05:00"), d);
        assert_eq!(parse_date("10-01-2020"), d);
        assert_eq!(parse_date("10/01/2020"), d);
        assert_eq!(parse_date("2020-13-01"), None);
    }
}
