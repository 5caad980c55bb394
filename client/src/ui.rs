// Presentation-layer interfaces
//
// The workflows never render anything themselves. They emit notices (toasts), ask for a route
// change, check permissions through `Capabilities` and resolve user-facing text through a
// `Translator`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Actions gated by the remotely configured module list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    SendCampaign,
    SaveCampaign,
    ImportContacts,
}

impl Action {
    pub fn as_id(&self) -> &'static str {
        match self {
            Action::SendCampaign => "send_campaign",
            Action::SaveCampaign => "save_campaign",
            Action::ImportContacts => "import_contacts",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_id())
    }
}

/// Permission check injected into the workflows.
pub trait Capabilities: Send + Sync {
    fn can(&self, action: Action) -> bool;
}

/// Everything unlocked. Used by the command-line driver.
pub struct AllowAll;

impl Capabilities for AllowAll {
    fn can(&self, _action: Action) -> bool {
        true
    }
}

/// Translate-by-key. `params` are interpolated by the implementation.
pub trait Translator: Send + Sync {
    fn translate(&self, key: &str, params: &BTreeMap<String, String>) -> String;
}

/// Built-in English strings, `{name}` placeholders.
pub struct EnglishTranslator;

impl Translator for EnglishTranslator {
    fn translate(&self, key: &str, params: &BTreeMap<String, String>) -> String {
        let template = match key {
            keys::CAMPAIGN_DRAFT_SAVED => "Campaign \"{name}\" saved as draft.",
            keys::CAMPAIGN_SENT => "Campaign \"{name}\" is on its way.",
            keys::CAMPAIGN_SCHEDULED => "Campaign \"{name}\" scheduled for {when}.",
            keys::CAMPAIGN_SUBMIT_FAILED => "Could not save the campaign: {error}",
            keys::IMPORT_STARTED => "Import of {file} started.",
            keys::IMPORT_FAILED => "Import failed: {error}",
            keys::VALIDATION_FAILED => "{error}",
            other => other,
        };
        interpolate(template, params)
    }
}

fn interpolate(template: &str, params: &BTreeMap<String, String>) -> String {
    let mut out = template.to_string();
    for (k, v) in params {
        out = out.replace(&format!("{{{}}}", k), v);
    }
    out
}

pub mod keys {
    pub const CAMPAIGN_DRAFT_SAVED: &str = "campaigns.notice.draft_saved";
    pub const CAMPAIGN_SENT: &str = "campaigns.notice.sent";
    pub const CAMPAIGN_SCHEDULED: &str = "campaigns.notice.scheduled";
    pub const CAMPAIGN_SUBMIT_FAILED: &str = "campaigns.notice.submit_failed";
    pub const IMPORT_STARTED: &str = "contacts.import.started";
    pub const IMPORT_FAILED: &str = "contacts.import.failed";
    pub const VALIDATION_FAILED: &str = "common.validation_failed";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// A toast: a translation key plus interpolation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub kind: NoticeKind,
    pub key: String,
    pub params: BTreeMap<String, String>,
}

impl Notice {
    pub fn success(key: &str) -> Self {
        Self {
            kind: NoticeKind::Success,
            key: key.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn error(key: &str) -> Self {
        Self {
            kind: NoticeKind::Error,
            key: key.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    pub fn render(&self, translator: &dyn Translator) -> String {
        translator.translate(&self.key, &self.params)
    }
}

/// Where the UI should go after a terminal action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Route {
    Campaigns,
    Contacts,
}
