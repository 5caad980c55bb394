// Template resolver
//
// The email builder stores its own state in the saved HTML: a hidden element with
// `id="megamail-builder-state"` whose `data-state` attribute is Base64-encoded JSON. When it
// parses, its subject/from name win over the template's own subject field. Any failure along
// the way just means "no embedded state".

use base64::Engine;
use log::{debug, info};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use crate::api::MailApi;
use crate::error::ApiError;
use crate::models::draft::DraftPatch;
use crate::models::responses::Template;
use crate::models::state::DraftStore;

pub const STATE_MARKER_ID: &str = "megamail-builder-state";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddedState {
    pub from_name: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    pub name: String,
    pub subject: String,
    pub from_name: Option<String>,
}

fn marker_tag_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r#"<[^>]*\bid\s*=\s*["']{}["'][^>]*>"#,
            regex::escape(STATE_MARKER_ID)
        ))
        .ok()
    })
    .as_ref()
}

fn state_attr_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\bdata-state\s*=\s*["']([^"']*)["']"#).ok())
        .as_ref()
}

/// Locate, decode and parse the builder state blob.
pub fn extract_embedded_state(html: &str) -> Option<EmbeddedState> {
    let tag = marker_tag_re()?.find(html)?.as_str();
    let encoded = state_attr_re()?.captures(tag)?.get(1)?.as_str();

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| debug!("[PHASE: send_wizard] [STEP: template] state blob is not base64: {}", e))
        .ok()?;
    let text = String::from_utf8(bytes).ok()?;
    serde_json::from_str(&text)
        .map_err(|e| debug!("[PHASE: send_wizard] [STEP: template] state blob is not JSON: {}", e))
        .ok()
}

pub fn resolve(template: &Template) -> ResolvedTemplate {
    let embedded = template.html().and_then(extract_embedded_state);
    let own_subject = template.subject.clone().unwrap_or_default();

    match embedded {
        Some(state) => ResolvedTemplate {
            name: template.name.clone(),
            subject: state.subject.unwrap_or(own_subject),
            from_name: state.from_name,
        },
        None => ResolvedTemplate {
            name: template.name.clone(),
            subject: own_subject,
            from_name: None,
        },
    }
}

/// Fetch a template and seed the draft's template, subject, from name and (through the
/// subject default) campaign name.
pub async fn select_template(
    api: &dyn MailApi,
    store: &DraftStore,
    name: &str,
) -> Result<ResolvedTemplate, ApiError> {
    let template = api.template(name).await?;
    let resolved = resolve(&template);

    info!(
        "[PHASE: send_wizard] [STEP: template] Selected template '{}' (embedded_from_name={})",
        resolved.name,
        resolved.from_name.is_some()
    );

    store
        .merge(DraftPatch {
            template: Some(Some(resolved.name.clone())),
            subject: Some(resolved.subject.clone()),
            from_name: resolved.from_name.clone(),
            ..Default::default()
        })
        .await;

    Ok(resolved)
}
