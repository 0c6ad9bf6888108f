use chrono::NaiveDate;
use std::fmt::Write;

use crate::certificate::{CertificateBody, CertificateContent, CertificateType};
use crate::settings::SchoolProfile;

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn page_rule(t: CertificateType) -> &'static str {
    match t {
        CertificateType::SchoolLeaving => "A4 portrait",
        CertificateType::Appearance | CertificateType::Character | CertificateType::Pass => {
            "A5 landscape"
        }
    }
}

/// Renders certificates of one type as a printable HTML document, one page
/// per certificate in the given order.
pub fn render_html(
    certificate_type: CertificateType,
    contents: &[CertificateContent],
    school: &SchoolProfile,
) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>\n\
         @page {{ size: {page}; margin: 8mm; }}\n\
         body {{ font-family: Helvetica, Arial, sans-serif; color: #000; margin: 0; }}\n\
         .certificate {{ border: 3px double #000; padding: 12mm; page-break-after: always; }}\n\
         .certificate:last-child {{ page-break-after: auto; }}\n\
         header {{ text-align: center; }}\n\
         h1 {{ font-size: 16pt; margin: 0 0 6mm; }}\n\
         h2 {{ font-size: 14pt; letter-spacing: 0.1em; border-top: 1px solid #000; padding-top: 4mm; }}\n\
         .field .value {{ text-decoration: underline; text-transform: uppercase; padding: 0 6px; }}\n\
         footer {{ display: flex; justify-content: space-between; margin-top: 18mm; }}\n\
         .signatory {{ border-top: 1px solid #000; padding: 4px 36px 0; }}\n\
         </style>\n</head>\n<body>\n",
        title = escape_html(certificate_type.title()),
        page = page_rule(certificate_type),
    );
    for c in contents {
        render_one(&mut html, c, school);
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn render_one(html: &mut String, c: &CertificateContent, school: &SchoolProfile) {
    let _ = write!(
        html,
        "<section class=\"certificate\" data-student-id=\"{id}\">\n<header>\n<h1>{school}</h1>\n<h2>{title}</h2>\n</header>\n<main>\n",
        id = escape_html(&c.student_id),
        school = escape_html(&school.name),
        title = escape_html(c.title),
    );
    match &c.body {
        CertificateBody::Text { paragraphs } => {
            for p in paragraphs {
                let _ = writeln!(html, "<p>{}</p>", escape_html(p));
            }
        }
        CertificateBody::Fields {
            fields,
            attestation,
        } => {
            for f in fields {
                let _ = writeln!(
                    html,
                    "<div class=\"field\"><b>{}</b> <span class=\"value\">{}</span></div>",
                    escape_html(f.label),
                    escape_html(&f.value)
                );
            }
            let _ = writeln!(html, "<p><b>{}</b></p>", escape_html(attestation));
        }
    }
    let _ = write!(
        html,
        "</main>\n<footer>\n<div><b>Date:</b> {date}</div>\n<div class=\"signatory\">{first}</div>\n<div class=\"signatory\">{second}</div>\n</footer>\n</section>\n",
        date = escape_html(&c.issue_date),
        first = escape_html(&school.first_signatory),
        second = escape_html(&school.second_signatory),
    );
}

/// Download name for a single certificate or a batch.
pub fn suggested_file_name(
    certificate_type: CertificateType,
    contents: &[CertificateContent],
    today: NaiveDate,
    ext: &str,
) -> String {
    match contents {
        [one] => format!(
            "{}-{}-Certificate.{}",
            one.student_name,
            certificate_type.label(),
            ext
        ),
        _ => format!(
            "Certificates-{}-{}.{}",
            certificate_type.label(),
            today.format("%Y-%m-%d"),
            ext
        ),
    }
}
