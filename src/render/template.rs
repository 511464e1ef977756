use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::dictionary::Labels;
use super::qr::qr_code_data_uri;
use crate::database::models::Certificate;
use crate::types::Language;

/// Values substituted into a certificate template
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateBindings {
    pub user_name: String,
    pub course_title: String,
    pub score: f64,
    pub issued_at: DateTime<Utc>,
    pub cert_id: String,
    pub verification_url: String,
    pub lang: Language,
}

impl From<&Certificate> for CertificateBindings {
    fn from(cert: &Certificate) -> Self {
        Self {
            user_name: cert.user_name.clone(),
            course_title: cert.course_title.clone(),
            score: cert.score,
            issued_at: cert.issued_at,
            cert_id: cert.uid.clone(),
            verification_url: cert.verification_url.clone(),
            lang: cert.lang,
        }
    }
}

impl CertificateBindings {
    /// Placeholder name to raw (unescaped) value
    pub fn placeholders(&self) -> HashMap<&'static str, String> {
        let labels = Labels::for_language(self.lang);
        HashMap::from([
            ("USER_NAME", self.user_name.clone()),
            ("COURSE_TITLE", self.course_title.clone()),
            ("SCORE", self.score.to_string()),
            ("DATE", format_date(&self.issued_at)),
            ("CERT_ID", self.cert_id.clone()),
            ("VERIFICATION_URL", self.verification_url.clone()),
            ("QR_CODE", qr_code_data_uri(&self.verification_url).unwrap_or_default()),
            ("LANG", self.lang.code().to_string()),
            ("LABEL_TITLE", labels.title.to_string()),
            ("LABEL_AWARDED_TO", labels.awarded_to.to_string()),
            ("LABEL_COMPLETION", labels.completion.to_string()),
            ("LABEL_SCORE", labels.score.to_string()),
            ("LABEL_DATE", labels.date.to_string()),
            ("LABEL_CERT_ID", labels.cert_id.to_string()),
            ("LABEL_VERIFY", labels.verify.to_string()),
        ])
    }
}

/// Long US-style date, e.g. "October 19, 2026"
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

pub fn html_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Substitute `{{NAME}}` placeholders in a single pass. Substituted text is
/// never rescanned; unknown placeholders are left as they are.
pub fn render_template(template: &str, bindings: &CertificateBindings) -> String {
    let values = bindings.placeholders();
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                match values.get(name) {
                    Some(value) => out.push_str(&html_escape(value)),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bindings() -> CertificateBindings {
        CertificateBindings {
            user_name: "Abebe <Bikila>".to_string(),
            course_title: "Intro".to_string(),
            score: 92.5,
            issued_at: Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap(),
            cert_id: "cert-1".to_string(),
            verification_url: "http://localhost:4000/api/certificates/cert-1".to_string(),
            lang: Language::En,
        }
    }

    #[test]
    fn substitutes_and_escapes_values() {
        let html = render_template(
            "<h1>{{LABEL_TITLE}}</h1><p>{{USER_NAME}}</p><p>{{SCORE}} / {{DATE}}</p><a href=\"{{VERIFICATION_URL}}\">{{CERT_ID}}</a>",
            &bindings(),
        );
        assert_eq!(
            html,
            "<h1>Certificate of Completion</h1><p>Abebe &lt;Bikila&gt;</p><p>92.5 / October 19, 2026</p>\
             <a href=\"http://localhost:4000/api/certificates/cert-1\">cert-1</a>"
        );
    }

    #[test]
    fn leaves_unknown_and_unterminated_placeholders() {
        let html = render_template("{{SIGNATURE}} {{ LANG }} {{SCORE", &bindings());
        assert_eq!(html, "{{SIGNATURE}} en {{SCORE");
    }

    #[test]
    fn qr_code_points_at_the_verification_url() {
        let html = render_template("<img src=\"{{QR_CODE}}\">", &bindings());
        let expected = qr_code_data_uri("http://localhost:4000/api/certificates/cert-1").unwrap();
        assert_eq!(html, format!("<img src=\"{}\">", expected));
        assert!(html.starts_with("<img src=\"data:image/svg+xml;base64,"));
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let mut b = bindings();
        b.user_name = "{{CERT_ID}}".to_string();
        assert_eq!(render_template("{{USER_NAME}}", &b), "{{CERT_ID}}");
    }

    #[test]
    fn whole_scores_print_without_fraction() {
        let mut b = bindings();
        b.score = 85.0;
        assert_eq!(render_template("{{SCORE}}", &b), "85");
    }
}
