// Campaign draft
//
// The in-progress campaign edited by the send wizard. Every step writes through `merge` so the
// field invariants live in one place:
// - recipient names are only kept for the selected target
// - disabling reply-to clears the reply-to fields
// - engaged-first delivery and send-time optimization are never both on
// - subject edits flow into the campaign name until the user names the campaign

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::requests::{
    CampaignStatus, DeliveryOptimization, Utm, ALL_CONTACTS_SEGMENT,
};
use super::responses::Campaign;
use crate::utils::validation::parse_mailbox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignType {
    #[default]
    Unset,
    Regular,
}

impl CampaignType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignType::Unset => "unset",
            CampaignType::Regular => "regular",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientTarget {
    #[default]
    None,
    All,
    List,
    Segment,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipients {
    #[serde(default)]
    pub list_names: Vec<String>,
    #[serde(default)]
    pub segment_names: Vec<String>,
}

impl Recipients {
    pub fn lists(names: &[&str]) -> Self {
        Self {
            list_names: dedupe(names.iter().map(|s| s.to_string())),
            segment_names: Vec::new(),
        }
    }

    pub fn segments(names: &[&str]) -> Self {
        Self {
            list_names: Vec::new(),
            segment_names: dedupe(names.iter().map(|s| s.to_string())),
        }
    }
}

/// Derived recipient count. Never authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecipientCount {
    #[default]
    Unknown,
    Loading,
    Known(u64),
}

impl RecipientCount {
    pub fn known(&self) -> Option<u64> {
        match self {
            RecipientCount::Known(n) => Some(*n),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendAction {
    Schedule,
    #[default]
    Now,
    /// Save as draft and send later.
    Later,
}

impl SendAction {
    pub fn is_sending(&self) -> bool {
        matches!(self, SendAction::Now | SendAction::Schedule)
    }
}

/// The delivery step's single radio group, mapped onto the two exclusive flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationChoice {
    None,
    Engaged,
    Optimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CampaignDraft {
    #[serde(rename = "type")]
    pub campaign_type: CampaignType,
    pub recipient_target: RecipientTarget,
    pub recipients: Recipients,
    #[serde(skip_deserializing)]
    pub recipient_count: RecipientCount,
    pub template: Option<String>,
    pub from_name: String,
    pub subject: String,
    pub campaign_name: String,
    /// Set once the user types a campaign name of their own. Derived, never read from a file.
    #[serde(skip)]
    pub campaign_name_overridden: bool,
    pub enable_reply_to: bool,
    pub reply_to_name: String,
    pub reply_to_prefix: String,
    pub reply_to_domain: String,
    pub track_opens: bool,
    pub track_clicks: bool,
    pub delivery_optimization: DeliveryOptimization,
    pub enable_send_time_optimization: bool,
    pub utm_enabled: bool,
    pub utm: Utm,
    pub send_action: SendAction,
    /// Local date-time, `YYYY-MM-DDTHH:MM`.
    pub schedule_date_time: Option<String>,
}

impl Default for CampaignDraft {
    fn default() -> Self {
        Self {
            campaign_type: CampaignType::Unset,
            recipient_target: RecipientTarget::None,
            recipients: Recipients::default(),
            recipient_count: RecipientCount::Unknown,
            template: None,
            from_name: String::new(),
            subject: String::new(),
            campaign_name: String::new(),
            campaign_name_overridden: false,
            enable_reply_to: false,
            reply_to_name: String::new(),
            reply_to_prefix: String::new(),
            reply_to_domain: String::new(),
            track_opens: true,
            track_clicks: true,
            delivery_optimization: DeliveryOptimization::None,
            enable_send_time_optimization: false,
            utm_enabled: false,
            utm: Utm::default(),
            send_action: SendAction::Now,
            schedule_date_time: None,
        }
    }
}

/// Partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftPatch {
    pub campaign_type: Option<CampaignType>,
    pub recipient_target: Option<RecipientTarget>,
    pub recipients: Option<Recipients>,
    pub template: Option<Option<String>>,
    pub from_name: Option<String>,
    pub subject: Option<String>,
    pub campaign_name: Option<String>,
    pub enable_reply_to: Option<bool>,
    pub reply_to_name: Option<String>,
    pub reply_to_prefix: Option<String>,
    pub reply_to_domain: Option<String>,
    pub track_opens: Option<bool>,
    pub track_clicks: Option<bool>,
    pub delivery_optimization: Option<DeliveryOptimization>,
    pub enable_send_time_optimization: Option<bool>,
    pub utm_enabled: Option<bool>,
    pub utm: Option<Utm>,
    pub send_action: Option<SendAction>,
    pub schedule_date_time: Option<Option<String>>,
}

impl DraftPatch {
    pub fn optimization(choice: OptimizationChoice) -> Self {
        let (delivery, send_time) = match choice {
            OptimizationChoice::None => (DeliveryOptimization::None, false),
            OptimizationChoice::Engaged => (DeliveryOptimization::ToEngagedFirst, false),
            OptimizationChoice::Optimal => (DeliveryOptimization::None, true),
        };
        Self {
            delivery_optimization: Some(delivery),
            enable_send_time_optimization: Some(send_time),
            ..Default::default()
        }
    }
}

impl From<CampaignDraft> for DraftPatch {
    fn from(d: CampaignDraft) -> Self {
        Self {
            campaign_type: Some(d.campaign_type),
            recipient_target: Some(d.recipient_target),
            recipients: Some(d.recipients),
            template: Some(d.template),
            from_name: Some(d.from_name),
            subject: Some(d.subject),
            campaign_name: Some(d.campaign_name),
            enable_reply_to: Some(d.enable_reply_to),
            reply_to_name: Some(d.reply_to_name),
            reply_to_prefix: Some(d.reply_to_prefix),
            reply_to_domain: Some(d.reply_to_domain),
            track_opens: Some(d.track_opens),
            track_clicks: Some(d.track_clicks),
            delivery_optimization: Some(d.delivery_optimization),
            enable_send_time_optimization: Some(d.enable_send_time_optimization),
            utm_enabled: Some(d.utm_enabled),
            utm: Some(d.utm),
            send_action: Some(d.send_action),
            schedule_date_time: Some(d.schedule_date_time),
        }
    }
}

/// What a merge touched that other components react to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DraftChange {
    pub audience_changed: bool,
}

impl CampaignDraft {
    pub fn merge(&mut self, patch: DraftPatch) -> DraftChange {
        let audience_before = (self.recipient_target, self.recipients.clone());

        if let Some(t) = patch.campaign_type {
            self.campaign_type = t;
        }
        if let Some(target) = patch.recipient_target {
            self.recipient_target = target;
        }
        if let Some(r) = patch.recipients {
            self.recipients = Recipients {
                list_names: dedupe(r.list_names),
                segment_names: dedupe(r.segment_names),
            };
        }
        self.retain_recipients_for_target();

        if let Some(template) = patch.template {
            self.template = template;
        }
        if let Some(name) = patch.from_name {
            self.from_name = name;
        }
        if let Some(name) = patch.campaign_name {
            self.campaign_name_overridden = !name.trim().is_empty();
            self.campaign_name = name;
        }
        if let Some(subject) = patch.subject {
            if !self.campaign_name_overridden {
                self.campaign_name = subject.clone();
            }
            self.subject = subject;
        }

        if let Some(v) = patch.reply_to_name {
            self.reply_to_name = v;
        }
        if let Some(v) = patch.reply_to_prefix {
            self.reply_to_prefix = v;
        }
        if let Some(v) = patch.reply_to_domain {
            self.reply_to_domain = v;
        }
        if let Some(enabled) = patch.enable_reply_to {
            self.enable_reply_to = enabled;
        }
        if !self.enable_reply_to {
            self.reply_to_name.clear();
            self.reply_to_prefix.clear();
            self.reply_to_domain.clear();
        }

        if let Some(v) = patch.track_opens {
            self.track_opens = v;
        }
        if let Some(v) = patch.track_clicks {
            self.track_clicks = v;
        }

        // Send-time optimization is applied last, so it wins a conflicting patch.
        if let Some(d) = patch.delivery_optimization {
            self.delivery_optimization = d;
            if d == DeliveryOptimization::ToEngagedFirst {
                self.enable_send_time_optimization = false;
            }
        }
        if let Some(enabled) = patch.enable_send_time_optimization {
            self.enable_send_time_optimization = enabled;
            if enabled {
                self.delivery_optimization = DeliveryOptimization::None;
            }
        }

        if let Some(v) = patch.utm_enabled {
            self.utm_enabled = v;
        }
        if let Some(v) = patch.utm {
            self.utm = v;
        }
        if let Some(v) = patch.send_action {
            self.send_action = v;
        }
        if let Some(v) = patch.schedule_date_time {
            self.schedule_date_time = v;
        }

        DraftChange {
            audience_changed: audience_before != (self.recipient_target, self.recipients.clone()),
        }
    }

    /// Replay a draft built outside the wizard (a draft file) through `merge` onto the defaults.
    /// A campaign name equal to the subject is treated as the subject default.
    pub fn normalized(self) -> Self {
        let mut patch = DraftPatch::from(self);
        if patch.campaign_name == patch.subject {
            patch.campaign_name = None;
        }
        let mut draft = CampaignDraft::default();
        draft.merge(patch);
        draft
    }

    fn retain_recipients_for_target(&mut self) {
        match self.recipient_target {
            RecipientTarget::List => self.recipients.segment_names.clear(),
            RecipientTarget::Segment => self.recipients.list_names.clear(),
            RecipientTarget::All | RecipientTarget::None => {
                self.recipients.list_names.clear();
                self.recipients.segment_names.clear();
            }
        }
    }

    /// Whether the selection names an audience at all. Counts are not consulted.
    pub fn has_recipients(&self) -> bool {
        match self.recipient_target {
            RecipientTarget::All => true,
            RecipientTarget::List => !self.recipients.list_names.is_empty(),
            RecipientTarget::Segment => !self.recipients.segment_names.is_empty(),
            RecipientTarget::None => false,
        }
    }

    pub fn optimization_choice(&self) -> OptimizationChoice {
        if self.enable_send_time_optimization {
            OptimizationChoice::Optimal
        } else if self.delivery_optimization == DeliveryOptimization::ToEngagedFirst {
            OptimizationChoice::Engaged
        } else {
            OptimizationChoice::None
        }
    }

    /// Re-hydrate a draft from a stored campaign for editing.
    pub fn from_campaign(campaign: &Campaign) -> Self {
        let mut draft = CampaignDraft {
            campaign_type: CampaignType::Regular,
            ..Default::default()
        };

        let r = &campaign.recipients;
        if r.segment_names.iter().any(|s| s == ALL_CONTACTS_SEGMENT) {
            draft.recipient_target = RecipientTarget::All;
        } else if !r.list_names.is_empty() {
            draft.recipient_target = RecipientTarget::List;
            draft.recipients.list_names = dedupe(r.list_names.clone());
        } else if !r.segment_names.is_empty() {
            draft.recipient_target = RecipientTarget::Segment;
            draft.recipients.segment_names = dedupe(r.segment_names.clone());
        }

        if let Some(content) = campaign.content.first() {
            if let Some(from) = parse_mailbox(&content.from) {
                draft.from_name = from.name.unwrap_or_default();
            }
            draft.subject = content.subject.clone().unwrap_or_default();
            draft.template = content.template_name.clone();

            if let Some(reply_to) = parse_mailbox(&content.reply_to) {
                if let Some((prefix, domain)) = reply_to.email.split_once('@') {
                    draft.enable_reply_to = true;
                    draft.reply_to_name = reply_to.name.unwrap_or_default();
                    draft.reply_to_prefix = prefix.to_string();
                    draft.reply_to_domain = domain.to_string();
                }
            }

            if let Some(utm) = &content.utm {
                draft.utm_enabled = true;
                draft.utm = utm.clone();
            }
        }

        draft.campaign_name = campaign.name.clone();
        draft.campaign_name_overridden = campaign.name != draft.subject;

        let o = &campaign.options;
        draft.track_opens = o.track_opens;
        draft.track_clicks = o.track_clicks;
        draft.delivery_optimization = o.delivery_optimization;
        draft.enable_send_time_optimization = o.enable_send_time_optimization;
        if draft.enable_send_time_optimization {
            draft.delivery_optimization = DeliveryOptimization::None;
        }

        let scheduled = o
            .schedule_for
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%dT%H:%M").to_string());

        if let Some(local) = scheduled {
            draft.send_action = SendAction::Schedule;
            draft.schedule_date_time = Some(local);
        } else if campaign.status == CampaignStatus::Draft {
            draft.send_action = SendAction::Later;
        } else {
            draft.send_action = SendAction::Now;
        }

        draft
    }
}

fn dedupe(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for n in names {
        if !out.contains(&n) {
            out.push(n);
        }
    }
    out
}
