// Input validation utilities

use chrono::{Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::error::ValidationError;

/// A parsed `"Display Name" <email>` or bare `email`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    pub name: Option<String>,
    pub email: String,
}

fn mailbox_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s*"?([^"<]*?)"?\s*<\s*([^<>\s]*)\s*>\s*$"#).ok())
        .as_ref()
}

/// Parse a sender string. Returns `None` for blank input.
pub fn parse_mailbox(raw: &str) -> Option<Mailbox> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(caps) = mailbox_re().and_then(|re| re.captures(s)) {
        let name = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        let email = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
        return Some(Mailbox {
            name: (!name.is_empty()).then(|| name.to_string()),
            email: email.to_string(),
        });
    }

    Some(Mailbox {
        name: None,
        email: s.to_string(),
    })
}

/// `Name <email>` when a name is present, else the bare email.
pub fn format_mailbox(name: &str, email: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        email.to_string()
    } else {
        format!("{} <{}>", name, email)
    }
}

const LOCAL_DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Convert a local `YYYY-MM-DDTHH:MM` value (as produced by a datetime-local input) to an
/// ISO-8601 UTC timestamp.
pub fn local_to_utc_iso(local: &str) -> Result<String, ValidationError> {
    let s = local.trim();
    let naive = LOCAL_DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .ok_or_else(|| ValidationError::InvalidScheduleTime(s.to_string()))?;

    // `earliest` resolves DST-ambiguous times; a time skipped by DST has no mapping.
    let local_dt = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| ValidationError::InvalidScheduleTime(s.to_string()))?;

    Ok(local_dt
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true))
}

const CSV_MIME_TYPES: [&str; 3] = ["text/csv", "application/csv", "application/vnd.ms-excel"];

/// Accept a file if either its MIME type or its extension says CSV.
pub fn is_csv_file(file_name: &str, mime_type: Option<&str>) -> bool {
    let mime_ok = mime_type
        .map(|m| {
            let m = m.trim().to_ascii_lowercase();
            CSV_MIME_TYPES.iter().any(|t| m.starts_with(t))
        })
        .unwrap_or(false);

    mime_ok || file_name.trim().to_ascii_lowercase().ends_with(".csv")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_display_name() {
        let m = parse_mailbox("\"Jane Corp\" <mailer@ex.com>").unwrap();
        assert_eq!(m.name.as_deref(), Some("Jane Corp"));
        assert_eq!(m.email, "mailer@ex.com");
    }

    #[test]
    fn parses_unquoted_display_name() {
        let m = parse_mailbox("Jane Corp <mailer@ex.com>").unwrap();
        assert_eq!(m.name.as_deref(), Some("Jane Corp"));
        assert_eq!(m.email, "mailer@ex.com");
    }

    #[test]
    fn parses_bare_email() {
        let m = parse_mailbox("  mailer@ex.com ").unwrap();
        assert!(m.name.is_none());
        assert_eq!(m.email, "mailer@ex.com");
    }

    #[test]
    fn angle_brackets_without_name() {
        let m = parse_mailbox("<mailer@ex.com>").unwrap();
        assert!(m.name.is_none());
        assert_eq!(m.email, "mailer@ex.com");
    }

    #[test]
    fn blank_is_none() {
        assert!(parse_mailbox("   ").is_none());
    }

    #[test]
    fn format_mailbox_omits_empty_name() {
        assert_eq!(format_mailbox("  ", "a@b.com"), "a@b.com");
        assert_eq!(format_mailbox(" Jane ", "a@b.com"), "Jane <a@b.com>");
    }

    #[test]
    fn local_datetime_converts_to_utc_iso() {
        let iso = local_to_utc_iso("2030-05-01T09:30").unwrap();
        assert!(iso.ends_with('Z'), "expected UTC suffix: {}", iso);
        let parsed = chrono::DateTime::parse_from_rfc3339(&iso).unwrap();
        let expected = Local
            .from_local_datetime(
                &NaiveDateTime::parse_from_str("2030-05-01T09:30", "%Y-%m-%dT%H:%M").unwrap(),
            )
            .earliest()
            .unwrap();
        assert_eq!(parsed.timestamp(), expected.timestamp());
    }

    #[test]
    fn garbage_datetime_is_rejected() {
        assert_eq!(
            local_to_utc_iso("tomorrow"),
            Err(ValidationError::InvalidScheduleTime("tomorrow".to_string()))
        );
    }

    #[test]
    fn csv_detection_by_mime_or_extension() {
        assert!(is_csv_file("contacts.CSV", None));
        assert!(is_csv_file("export", Some("text/csv; charset=utf-8")));
        assert!(is_csv_file("export.txt", Some("application/vnd.ms-excel")));
        assert!(!is_csv_file("contacts.xlsx", Some("application/octet-stream")));
    }
}
