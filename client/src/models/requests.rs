// API request models
// Wire shapes for the Elastic Email compatible v4 endpoints.
//
// Fields that do not apply to a given draft are `Option` + `skip_serializing_if`, so they are
// absent from the serialized body rather than sent as `null`. Fields the API expects to always
// be present (`ReplyTo`, `Body`, both recipient arrays) are not optional.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =========================
// Campaigns
// =========================

pub const ALL_CONTACTS_SEGMENT: &str = "All Contacts";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignStatus {
    Draft,
    Active,
    Processing,
    Sending,
    Completed,
    Paused,
    Cancelled,
    Deleted,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeliveryOptimization {
    #[default]
    None,
    ToEngagedFirst,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Utm {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub medium: String,
    #[serde(default)]
    pub campaign: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CampaignContent {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub reply_to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm: Option<Utm>,
    /// Always `null` on write; the body comes from the template.
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CampaignRecipients {
    #[serde(default)]
    pub list_names: Vec<String>,
    #[serde(default)]
    pub segment_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CampaignOptions {
    #[serde(default = "default_true")]
    pub track_opens: bool,
    #[serde(default = "default_true")]
    pub track_clicks: bool,
    #[serde(default)]
    pub delivery_optimization: DeliveryOptimization,
    #[serde(default)]
    pub enable_send_time_optimization: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_for: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for CampaignOptions {
    fn default() -> Self {
        Self {
            track_opens: true,
            track_clicks: true,
            delivery_optimization: DeliveryOptimization::None,
            enable_send_time_optimization: false,
            schedule_for: None,
        }
    }
}

/// Body of `POST /campaigns` and `PUT /campaigns/{name}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CampaignPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: CampaignStatus,
    pub content: Vec<CampaignContent>,
    pub recipients: CampaignRecipients,
    pub options: CampaignOptions,
}

impl CampaignPayload {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// =========================
// Contacts
// =========================

/// Contact count query: either every contact, or those matching a segment rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CountQuery {
    AllContacts,
    Rule(String),
}

impl CountQuery {
    /// Rule matching the members of a static list.
    pub fn for_list(list_name: &str) -> Self {
        CountQuery::Rule(format!("ListName = '{}'", list_name.replace('\'', "\\'")))
    }
}

/// Multipart body of the bulk contact import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub list_name: Option<String>,
    pub allow_update: bool,
    /// CSV header -> contact field, non-skip entries only.
    pub mapping: BTreeMap<String, String>,
}

impl ImportUpload {
    /// JSON for the `mapping` form part; `None` when there is nothing to send.
    pub fn mapping_json(&self) -> Option<String> {
        if self.mapping.is_empty() {
            return None;
        }
        serde_json::to_string(&self.mapping).ok()
    }
}
