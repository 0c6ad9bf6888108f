//! Certificate content derivation.
//!
//! Turns a student record plus a certificate selection into the text or field
//! list printed on the certificate. Derivation is pure: the issue date is
//! passed in, so identical requests produce identical content.

use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::student::StudentRecord;

/// Filler printed wherever a value is missing, so a certificate never shows a
/// collapsed gap.
pub const PLACEHOLDER: &str = "________________";

pub const ATTESTATION: &str =
    "Certified that the above information is in accordance with the school General Register.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CertificateType {
    Appearance,
    Character,
    Pass,
    #[serde(rename = "School Leaving")]
    SchoolLeaving,
}

impl CertificateType {
    pub const ALL: [CertificateType; 4] = [
        Self::Appearance,
        Self::Character,
        Self::Pass,
        Self::SchoolLeaving,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Appearance" => Some(Self::Appearance),
            "Character" => Some(Self::Character),
            "Pass" => Some(Self::Pass),
            "School Leaving" | "SchoolLeaving" => Some(Self::SchoolLeaving),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Appearance => "Appearance",
            Self::Character => "Character",
            Self::Pass => "Pass",
            Self::SchoolLeaving => "School Leaving",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Appearance => "APPEARANCE CERTIFICATE",
            Self::Character => "CHARACTER CERTIFICATE",
            Self::Pass => "PASS CERTIFICATE",
            Self::SchoolLeaving => "SCHOOL LEAVING CERTIFICATE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CertificateRequest {
    pub certificate_type: CertificateType,
    pub student: StudentRecord,
    pub grade_override: Option<String>,
    pub character_override: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateField {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CertificateBody {
    /// Paragraphs in print order.
    Text { paragraphs: Vec<String> },
    Fields {
        fields: Vec<CertificateField>,
        attestation: &'static str,
    },
}

impl CertificateBody {
    /// Plain-text form; paragraphs are separated by a blank line.
    pub fn to_text(&self) -> String {
        match self {
            CertificateBody::Text { paragraphs } => paragraphs.join("\n\n"),
            CertificateBody::Fields {
                fields,
                attestation,
            } => {
                let mut out: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{} {}", f.label, f.value))
                    .collect();
                out.push(String::new());
                out.push((*attestation).to_string());
                out.join("\n")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateContent {
    pub certificate_type: CertificateType,
    pub title: &'static str,
    pub student_id: String,
    pub student_name: String,
    pub body: CertificateBody,
    pub final_grade: Option<String>,
    pub final_character: Option<String>,
    pub issue_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CertificateError {
    #[error("{field} is required for this certificate")]
    MissingRequiredOverride { field: &'static str },
    #[error("leaving details missing: add a date of leaving before generating this certificate")]
    MissingLeavingDate,
}

/// Long-form calendar date, e.g. "June 05, 2024".
pub fn format_long_date(d: NaiveDate) -> String {
    d.format("%B %d, %Y").to_string()
}

fn value_or_placeholder(v: &str) -> String {
    let t = v.trim();
    if t.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        t.to_string()
    }
}

fn date_or_placeholder(d: Option<NaiveDate>) -> String {
    d.map(format_long_date)
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn non_empty(v: Option<&str>) -> Option<String> {
    v.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn derive(
    req: &CertificateRequest,
    today: NaiveDate,
) -> Result<CertificateContent, CertificateError> {
    let s = &req.student;
    let final_grade =
        non_empty(req.grade_override.as_deref()).or_else(|| non_empty(Some(&s.grade)));
    // Conduct is a closed vocabulary, so character always resolves.
    let final_character = non_empty(req.character_override.as_deref())
        .unwrap_or_else(|| s.conduct.to_string());

    let body = match req.certificate_type {
        CertificateType::Appearance => {
            let grade = final_grade
                .as_deref()
                .ok_or(CertificateError::MissingRequiredOverride { field: "grade" })?;
            appearance_body(s, grade, today)
        }
        CertificateType::Character => character_body(s, &final_character, today),
        CertificateType::Pass => pass_body(s, today),
        CertificateType::SchoolLeaving => {
            let left = s.date_of_leaving.ok_or(CertificateError::MissingLeavingDate)?;
            let grade = final_grade
                .as_deref()
                .ok_or(CertificateError::MissingRequiredOverride { field: "grade" })?;
            leaving_body(s, left, grade)
        }
    };

    Ok(CertificateContent {
        certificate_type: req.certificate_type,
        title: req.certificate_type.title(),
        student_id: s.id.clone(),
        student_name: s.student_name.clone(),
        body,
        final_grade,
        final_character: Some(final_character),
        issue_date: format_long_date(today),
    })
}

/// Derives each request independently and returns the results in request
/// order. Any failure fails the whole batch.
pub fn derive_batch(
    requests: &[CertificateRequest],
    today: NaiveDate,
) -> Result<Vec<CertificateContent>, Vec<(String, CertificateError)>> {
    let results: Vec<Result<CertificateContent, CertificateError>> =
        requests.par_iter().map(|r| derive(r, today)).collect();

    let failures: Vec<(String, CertificateError)> = requests
        .iter()
        .zip(results.iter())
        .filter_map(|(r, res)| res.as_ref().err().map(|e| (r.student.id.clone(), e.clone())))
        .collect();
    if !failures.is_empty() {
        return Err(failures);
    }
    Ok(results.into_iter().flatten().collect())
}

fn enrolment_window(s: &StudentRecord, today: NaiveDate) -> (String, String) {
    (
        format_long_date(s.admission_date),
        format_long_date(s.date_of_leaving.unwrap_or(today)),
    )
}

fn appearance_body(s: &StudentRecord, grade: &str, today: NaiveDate) -> CertificateBody {
    let (from, to) = enrolment_window(s, today);
    CertificateBody::Text {
        paragraphs: vec![
            format!(
                "This is to certify that {} S/O {} was a bonafide student of this School from {} to {}. \
                 He has filled the form of SSC part II Annual Examination {} and it is expected that he \
                 will secure atleast Grade {} at the above said Examination.",
                value_or_placeholder(&s.student_name),
                value_or_placeholder(&s.father_name),
                from,
                to,
                today.year(),
                grade
            ),
            format!(
                "His date of birth as entered in this School General Register is {}.",
                format_long_date(s.date_of_birth)
            ),
            "He bears a good Character and I wish him success in future.".to_string(),
        ],
    }
}

fn character_body(s: &StudentRecord, character: &str, today: NaiveDate) -> CertificateBody {
    let (from, to) = enrolment_window(s, today);
    CertificateBody::Text {
        paragraphs: vec![
            format!(
                "This is to certify that {}, S/O {} was a bonafide student of this School from {} to {}.",
                value_or_placeholder(&s.student_name),
                value_or_placeholder(&s.father_name),
                from,
                to
            ),
            format!(
                "To the best of my knowledge he bears a {} Moral character. I wish him good luck.",
                character
            ),
        ],
    }
}

fn pass_body(s: &StudentRecord, today: NaiveDate) -> CertificateBody {
    let (from, to) = enrolment_window(s, today);
    CertificateBody::Text {
        paragraphs: vec![
            format!(
                "This is to certify that Mr. {} S/o {} by Caste {} was enrolled under G.R.No: {} and \
                 has been a bonafide student of this school from {} to {}. He has Passed class {}.",
                value_or_placeholder(&s.student_name),
                value_or_placeholder(&s.father_name),
                value_or_placeholder(&s.race_and_caste),
                value_or_placeholder(&s.gr_no),
                from,
                to,
                s.examination
            ),
            format!(
                "According to School Record his date of Birth is {} in words {}.",
                format_long_date(s.date_of_birth),
                value_or_placeholder(&s.date_of_birth_in_words)
            ),
            "He bears a good moral and I wish him success in future.".to_string(),
        ],
    }
}

fn leaving_body(s: &StudentRecord, left: NaiveDate, grade: &str) -> CertificateBody {
    let field = |label: &'static str, value: String| CertificateField { label, value };
    CertificateBody::Fields {
        fields: vec![
            field("Name of Student:", value_or_placeholder(&s.student_name)),
            field("G.R No:", value_or_placeholder(&s.gr_no)),
            field("Father's Name:", value_or_placeholder(&s.father_name)),
            field(
                "Race and Caste (With Sub-Caste):",
                value_or_placeholder(&s.race_and_caste),
            ),
            field("Religion:", value_or_placeholder(&s.religion)),
            field("Place of Birth:", value_or_placeholder(&s.place_of_birth)),
            field(
                "Date of Birth (in Figures):",
                date_or_placeholder(Some(s.date_of_birth)),
            ),
            field(
                "Date of Birth (in words):",
                value_or_placeholder(&s.date_of_birth_in_words),
            ),
            field(
                "Last School Attended:",
                value_or_placeholder(&s.last_school_attended),
            ),
            field(
                "Date of Admission:",
                date_or_placeholder(Some(s.admission_date)),
            ),
            field(
                "Class in which admitted:",
                value_or_placeholder(&s.class_in_which_admitted),
            ),
            field(
                "Class in which studying:",
                value_or_placeholder(&s.class_studying),
            ),
            field("Progress:", s.progress.to_string()),
            field("Conduct:", s.conduct.to_string()),
            field("Date of Leaving the School:", date_or_placeholder(Some(left))),
            field(
                "Reason of Leaving the School:",
                value_or_placeholder(&s.reason_of_leaving),
            ),
            field("Examination:", s.examination.to_string()),
            field("Under Seat No:", value_or_placeholder(&s.under_seat_no)),
            field("Grade:", value_or_placeholder(grade)),
        ],
        attestation: ATTESTATION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::student::{fixtures::candidate, validate, Rating};
    use serde_json::json;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn ali() -> StudentRecord {
        let mut s = validate(&candidate("101", "Ali Khan")).expect("valid");
        s.id = "s-1".into();
        s
    }

    fn request(t: CertificateType, student: StudentRecord) -> CertificateRequest {
        CertificateRequest {
            certificate_type: t,
            student,
            grade_override: None,
            character_override: None,
        }
    }

    #[test]
    fn appearance_scenario() {
        let c = derive(&request(CertificateType::Appearance, ali()), ymd(2024, 6, 1))
            .expect("derive");
        let text = c.body.to_text();
        for needle in [
            "Ali Khan",
            "Karim Khan",
            "January 10, 2020",
            "June 01, 2024",
            "A1",
            "Examination 2024",
            "March 14, 2008",
        ] {
            assert!(text.contains(needle), "missing {needle:?} in {text}");
        }
        assert_eq!(c.final_grade.as_deref(), Some("A1"));
        assert_eq!(c.issue_date, "June 01, 2024");
        assert_eq!(c.title, "APPEARANCE CERTIFICATE");
    }

    #[test]
    fn appearance_uses_leaving_date_when_present() {
        let mut s = ali();
        s.date_of_leaving = Some(ymd(2023, 3, 31));
        let c = derive(&request(CertificateType::Appearance, s), ymd(2024, 6, 1))
            .expect("derive");
        assert!(c.body.to_text().contains("to March 31, 2023."));
    }

    #[test]
    fn grade_override_wins_and_blank_override_falls_back() {
        let mut r = request(CertificateType::Appearance, ali());
        r.grade_override = Some("B".into());
        let c = derive(&r, ymd(2024, 6, 1)).expect("derive");
        assert_eq!(c.final_grade.as_deref(), Some("B"));
        assert!(c.body.to_text().contains("Grade B at"));

        r.grade_override = Some("   ".into());
        let c = derive(&r, ymd(2024, 6, 1)).expect("derive");
        assert_eq!(c.final_grade.as_deref(), Some("A1"));
    }

    #[test]
    fn appearance_without_any_grade_fails() {
        let mut s = ali();
        s.grade = String::new();
        let e = derive(&request(CertificateType::Appearance, s), ymd(2024, 6, 1))
            .expect_err("no grade");
        assert_eq!(e, CertificateError::MissingRequiredOverride { field: "grade" });
    }

    #[test]
    fn character_override_beats_conduct() {
        let mut s = ali();
        s.conduct = Rating::Average;
        let mut r = request(CertificateType::Character, s);
        r.character_override = Some("Excellent".into());
        let c = derive(&r, ymd(2024, 6, 1)).expect("derive");
        let text = c.body.to_text();
        assert!(text.contains("Excellent"));
        assert!(!text.contains("Average"));
        assert_eq!(c.final_character.as_deref(), Some("Excellent"));
    }

    #[test]
    fn character_defaults_to_conduct() {
        let c = derive(&request(CertificateType::Character, ali()), ymd(2024, 6, 1))
            .expect("derive");
        assert!(c.body.to_text().contains("bears a Good Moral character"));
    }

    #[test]
    fn pass_states_register_details() {
        let c = derive(&request(CertificateType::Pass, ali()), ymd(2024, 6, 1)).expect("derive");
        let text = c.body.to_text();
        assert!(text.contains("by Caste Pathan"));
        assert!(text.contains("G.R.No: 101"));
        assert!(text.contains("Passed class S.S.C Part-II Annual"));
        assert!(text.contains("Fourteenth March Two Thousand Eight"));
    }

    #[test]
    fn school_leaving_requires_leaving_date() {
        let e = derive(
            &request(CertificateType::SchoolLeaving, ali()),
            ymd(2024, 6, 1),
        )
        .expect_err("no leaving date");
        assert_eq!(e, CertificateError::MissingLeavingDate);
    }

    #[test]
    fn school_leaving_with_leaving_date_still_needs_a_grade() {
        let mut s = ali();
        s.date_of_leaving = Some(ymd(2024, 3, 31));
        s.grade = "  ".into();
        let mut r = request(CertificateType::SchoolLeaving, s);
        let e = derive(&r, ymd(2024, 6, 1)).expect_err("no grade");
        assert_eq!(e, CertificateError::MissingRequiredOverride { field: "grade" });

        r.grade_override = Some("B".into());
        let c = derive(&r, ymd(2024, 6, 1)).expect("derive");
        assert_eq!(c.final_grade.as_deref(), Some("B"));
    }

    #[test]
    fn school_leaving_lists_fields_in_register_order() {
        let mut s = ali();
        s.date_of_leaving = Some(ymd(2024, 5, 30));
        s.reason_of_leaving = "Completed SSC".into();
        let c = derive(&request(CertificateType::SchoolLeaving, s), ymd(2024, 6, 1))
            .expect("derive");
        let CertificateBody::Fields {
            fields,
            attestation,
        } = &c.body
        else {
            panic!("expected field body");
        };
        assert_eq!(fields.len(), 19);
        assert_eq!(fields[0].label, "Name of Student:");
        assert_eq!(fields[14].value, "May 30, 2024");
        assert_eq!(fields[15].value, "Completed SSC");
        assert_eq!(fields[18].value, "A1");
        assert_eq!(*attestation, ATTESTATION);
    }

    #[test]
    fn absent_optional_values_render_as_placeholder() {
        let mut s = ali();
        s.date_of_leaving = Some(ymd(2024, 5, 30));
        s.last_school_attended = String::new();
        s.reason_of_leaving = String::new();
        s.race_and_caste = String::new();
        let leaving = derive(&request(CertificateType::SchoolLeaving, s.clone()), ymd(2024, 6, 1))
            .expect("derive")
            .body
            .to_text();
        assert!(leaving.contains(&format!("Last School Attended: {}", PLACEHOLDER)));
        assert!(leaving.contains(&format!("Reason of Leaving the School: {}", PLACEHOLDER)));
        assert!(!leaving.contains("undefined"));

        let pass = derive(&request(CertificateType::Pass, s), ymd(2024, 6, 1))
            .expect("derive")
            .body
            .to_text();
        assert!(pass.contains(&format!("by Caste {} was", PLACEHOLDER)));
    }

    #[test]
    fn derivation_is_deterministic_for_fixed_today() {
        let mut s = ali();
        s.date_of_leaving = Some(ymd(2024, 5, 30));
        for t in CertificateType::ALL {
            let r = request(t, s.clone());
            let a = serde_json::to_string(&derive(&r, ymd(2024, 6, 1)).expect("derive"))
                .expect("json");
            let b = serde_json::to_string(&derive(&r, ymd(2024, 6, 1)).expect("derive"))
                .expect("json");
            assert_eq!(a, b);
        }
    }

    #[test]
    fn batch_keeps_selection_order_and_reports_all_failures() {
        let students: Vec<StudentRecord> = (0..12)
            .map(|i| {
                let mut s = validate(&candidate(&i.to_string(), &format!("Student {i}")))
                    .expect("valid");
                s.id = format!("id-{i}");
                s
            })
            .collect();
        let reqs: Vec<CertificateRequest> = students
            .iter()
            .cloned()
            .map(|s| request(CertificateType::Character, s))
            .collect();
        let out = derive_batch(&reqs, ymd(2024, 6, 1)).expect("batch");
        let ids: Vec<&str> = out.iter().map(|c| c.student_id.as_str()).collect();
        let expected: Vec<String> = (0..12).map(|i| format!("id-{i}")).collect();
        assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());

        let mut leaving: Vec<CertificateRequest> = students
            .into_iter()
            .map(|s| request(CertificateType::SchoolLeaving, s))
            .collect();
        leaving[3].student.date_of_leaving = Some(ymd(2024, 1, 1));
        let failures = derive_batch(&leaving, ymd(2024, 6, 1)).expect_err("missing dates");
        assert_eq!(failures.len(), 11);
        assert!(failures.iter().all(|(_, e)| *e == CertificateError::MissingLeavingDate));
        assert!(failures.iter().all(|(id, _)| id != "id-3"));
    }

    #[test]
    fn type_labels_round_trip_on_the_wire() {
        assert_eq!(
            serde_json::to_value(CertificateType::SchoolLeaving).expect("json"),
            json!("School Leaving")
        );
        for t in CertificateType::ALL {
            assert_eq!(CertificateType::parse(t.label()), Some(t));
        }
    }
}
