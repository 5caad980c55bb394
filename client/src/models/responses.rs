// API response models
// Read-only records returned by the lists/segments/domains/templates/campaigns endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::requests::{CampaignContent, CampaignOptions, CampaignRecipients, CampaignStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContactList {
    pub list_name: String,
    #[serde(default, rename = "PublicListID")]
    pub public_list_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Segment {
    pub name: String,
    #[serde(default)]
    pub rule: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Domain {
    pub domain: String,
    #[serde(default)]
    pub default_sender: Option<String>,
    #[serde(default)]
    pub spf: Value,
    #[serde(default)]
    pub dkim: Value,
}

impl Domain {
    /// Verified means SPF and DKIM are both reported as the literal string `"true"`.
    pub fn is_verified(&self) -> bool {
        is_literal_true(&self.spf) && is_literal_true(&self.dkim)
    }
}

fn is_literal_true(v: &Value) -> bool {
    matches!(v, Value::String(s) if s == "true")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateSummary {
    pub name: String,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateBodyPart {
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    pub name: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Vec<TemplateBodyPart>,
}

impl Template {
    /// The HTML part, falling back to the first part of any type.
    pub fn html(&self) -> Option<&str> {
        self.body
            .iter()
            .find(|p| p.content_type.eq_ignore_ascii_case("html"))
            .or_else(|| self.body.first())
            .map(|p| p.content.as_str())
    }
}

/// A campaign as stored by the API, used to re-hydrate the send wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Campaign {
    pub name: String,
    pub status: CampaignStatus,
    #[serde(default)]
    pub content: Vec<CampaignContent>,
    #[serde(default)]
    pub recipients: CampaignRecipients,
    #[serde(default)]
    pub options: CampaignOptions,
}
