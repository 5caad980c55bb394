// Column → contact field mapping
//
// Headers are normalized (lowercase, no whitespace or underscores) and looked up in a synonym
// table first, then against the available field names, else skipped.

use std::collections::BTreeMap;

pub const SKIP: &str = "skip";

/// The identity field. At least one column must map to it.
pub const EMAIL_FIELD: &str = "Email";

pub const STANDARD_FIELDS: &[&str] = &["Email", "FirstName", "LastName", "Phone", "Company"];

const SYNONYMS: &[(&str, &[&str])] = &[
    ("Email", &["email", "emailaddress", "e-mail", "e-mailaddress", "mail"]),
    ("FirstName", &["firstname", "first", "fname", "givenname", "forename"]),
    ("LastName", &["lastname", "last", "lname", "surname", "familyname"]),
    ("Phone", &["phone", "phonenumber", "mobile", "mobilephone", "telephone", "tel"]),
    ("Company", &["company", "companyname", "organization", "organisation", "employer"]),
];

pub fn normalize(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Standard fields followed by the account's custom fields, without duplicates.
pub fn available_fields(custom_fields: &[String]) -> Vec<String> {
    let mut fields: Vec<String> = STANDARD_FIELDS.iter().map(|s| s.to_string()).collect();
    for f in custom_fields {
        if !fields.iter().any(|existing| existing.eq_ignore_ascii_case(f)) {
            fields.push(f.clone());
        }
    }
    fields
}

pub fn suggest(header: &str, available: &[String]) -> String {
    let key = normalize(header);
    if key.is_empty() {
        return SKIP.to_string();
    }

    if let Some((field, _)) = SYNONYMS
        .iter()
        .find(|(_, variants)| variants.contains(&key.as_str()))
    {
        return field.to_string();
    }

    available
        .iter()
        .find(|f| normalize(f) == key)
        .cloned()
        .unwrap_or_else(|| SKIP.to_string())
}

/// Ordered header → target field assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMapping {
    available: Vec<String>,
    entries: Vec<(String, String)>,
}

impl ImportMapping {
    pub fn auto(headers: &[String], custom_fields: &[String]) -> Self {
        let available = available_fields(custom_fields);
        let entries = headers
            .iter()
            .map(|h| (h.clone(), suggest(h, &available)))
            .collect();
        Self { available, entries }
    }

    pub fn available_fields(&self) -> &[String] {
        &self.available
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn target(&self, header: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, t)| t.as_str())
    }

    /// Override one column. Unknown headers and targets outside the field list are ignored.
    pub fn set(&mut self, header: &str, target: &str) -> bool {
        let valid_target = target == SKIP || self.available.iter().any(|f| f == target);
        match self.entries.iter_mut().find(|(h, _)| h == header) {
            Some(entry) if valid_target => {
                entry.1 = target.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn email_mapped(&self) -> bool {
        self.entries.iter().any(|(_, t)| t == EMAIL_FIELD)
    }

    /// Non-skip assignments, as sent with the upload.
    pub fn to_wire(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .filter(|(_, t)| t != SKIP)
            .map(|(h, t)| (h.clone(), t.clone()))
            .collect()
    }
}
