// Submit controller
//
// Validates the draft, picks create vs update, writes the campaign and turns the result into a
// notice + navigation. Failures never touch the draft; the caller stays on the current step.

use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::payload::{assemble, resolve_sender_email};
use crate::api::MailApi;
use crate::error::{ValidationError, WizardError, WizardResult};
use crate::models::draft::{CampaignDraft, CampaignType, RecipientCount, SendAction};
use crate::models::requests::{CampaignPayload, CampaignStatus};
use crate::models::responses::Domain;
use crate::ui::{keys, Action, Capabilities, Notice, Route};
use crate::utils::logging::mask_email;
use crate::utils::validation::local_to_utc_iso;

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub correlation_id: String,
    pub status: CampaignStatus,
    pub payload: CampaignPayload,
    pub notice: Notice,
    pub route: Route,
}

/// Releases the in-flight flag however the submission ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> WizardResult<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| InFlight(flag))
            .map_err(|_| WizardError::InFlight)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SubmitController {
    api: Arc<dyn MailApi>,
    capabilities: Arc<dyn Capabilities>,
    /// Name of the campaign being edited, as originally loaded. Updates are addressed by it.
    campaign_to_load: Option<String>,
    in_flight: AtomicBool,
}

impl SubmitController {
    pub fn new(
        api: Arc<dyn MailApi>,
        capabilities: Arc<dyn Capabilities>,
        campaign_to_load: Option<String>,
    ) -> Self {
        Self {
            api,
            capabilities,
            campaign_to_load,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_editing(&self) -> bool {
        self.campaign_to_load.is_some()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Everything checked before the network is touched.
    pub fn validate(&self, draft: &CampaignDraft) -> WizardResult<()> {
        if draft.campaign_type != CampaignType::Regular {
            return Err(
                ValidationError::UnsupportedCampaignType(draft.campaign_type.as_str().into()).into(),
            );
        }

        if draft.send_action.is_sending() {
            let empty_audience = draft.recipient_count == RecipientCount::Known(0);
            if !draft.has_recipients() || empty_audience {
                return Err(ValidationError::NoRecipients.into());
            }
        }

        if draft.send_action == SendAction::Schedule {
            let when = draft
                .schedule_date_time
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .ok_or(ValidationError::MissingScheduleTime)?;
            local_to_utc_iso(when)?;
        }

        let action = required_action(draft);
        if !self.capabilities.can(action) {
            return Err(WizardError::Locked(action));
        }
        Ok(())
    }

    pub async fn submit(
        &self,
        draft: &CampaignDraft,
        domains: &[Domain],
    ) -> WizardResult<SubmitOutcome> {
        let _guard = InFlight::acquire(&self.in_flight).map_err(|e| {
            warn!("[PHASE: submit] [STEP: guard] Ignoring submit while another is in flight");
            e
        })?;

        self.validate(draft).map_err(|e| {
            warn!("[PHASE: submit] [STEP: validate] {}", e);
            e
        })?;

        let correlation_id = Uuid::new_v4().to_string();
        let payload = assemble(draft, domains);
        info!(
            "[PHASE: submit] [STEP: assemble] sender={} recipients={:?} (correlation_id={})",
            mask_email(&resolve_sender_email(domains)),
            draft.recipient_target,
            correlation_id
        );

        let result = match &self.campaign_to_load {
            Some(original) => {
                info!(
                    "[PHASE: submit] [STEP: update] Updating campaign '{}' status={:?} (correlation_id={})",
                    original, payload.status, correlation_id
                );
                self.api.update_campaign(original, &payload).await
            }
            None => {
                info!(
                    "[PHASE: submit] [STEP: create] Creating campaign status={:?} (correlation_id={})",
                    payload.status, correlation_id
                );
                self.api.create_campaign(&payload).await
            }
        };

        if let Err(e) = result {
            error!(
                "[PHASE: submit] [STEP: write] Campaign write failed (correlation_id={}): {}",
                correlation_id, e
            );
            return Err(e.into());
        }

        let notice = success_notice(draft, payload.status);
        info!(
            "[PHASE: submit] [STEP: complete] {} (correlation_id={})",
            notice.key, correlation_id
        );

        Ok(SubmitOutcome {
            correlation_id,
            status: payload.status,
            payload,
            notice,
            route: Route::Campaigns,
        })
    }
}

/// Capability a submission needs: sending or scheduling vs just saving.
pub fn required_action(draft: &CampaignDraft) -> Action {
    if draft.send_action.is_sending() {
        Action::SendCampaign
    } else {
        Action::SaveCampaign
    }
}

fn success_notice(draft: &CampaignDraft, status: CampaignStatus) -> Notice {
    let key = match (status, draft.send_action) {
        (CampaignStatus::Active, SendAction::Schedule) => keys::CAMPAIGN_SCHEDULED,
        (CampaignStatus::Active, _) => keys::CAMPAIGN_SENT,
        _ => keys::CAMPAIGN_DRAFT_SAVED,
    };
    let notice = Notice::success(key).with("name", draft.campaign_name.clone());
    match (key, &draft.schedule_date_time) {
        (keys::CAMPAIGN_SCHEDULED, Some(when)) => notice.with("when", when.clone()),
        _ => notice,
    }
}

/// Toast for a failed submission. API failures carry the raw server message.
pub fn failure_notice(err: &WizardError) -> Notice {
    match err {
        WizardError::Validation(_) | WizardError::Locked(_) | WizardError::InFlight => {
            Notice::error(keys::VALIDATION_FAILED).with("error", err.to_string())
        }
        _ => Notice::error(keys::CAMPAIGN_SUBMIT_FAILED).with("error", err.to_string()),
    }
}
