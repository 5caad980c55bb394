// Send wizard
//
// One campaign composition session: step position, the draft, the debounced recipient recount
// and the submit path. The draft is only ever written through `DraftStore::merge`.

pub mod payload;
pub mod recipients;
pub mod sequencer;
pub mod submit;
pub mod template;

use log::info;
use std::sync::Arc;
use std::time::Duration;

use crate::api::MailApi;
use crate::error::{ApiError, WizardResult};
use crate::models::draft::{
    CampaignDraft, CampaignType, DraftPatch, OptimizationChoice, RecipientCount, RecipientTarget,
    Recipients, SendAction,
};
use crate::models::requests::CampaignPayload;
use crate::models::responses::{ContactList, Domain, Segment, TemplateSummary};
use crate::models::state::DraftStore;
use crate::ui::Capabilities;

use recipients::{check_credits, CreditStatus, RecountScheduler};
use sequencer::StepSequencer;
use submit::{SubmitController, SubmitOutcome};
use template::ResolvedTemplate;

/// Read-only account data shown by the recipient, template and settings steps.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub lists: Vec<ContactList>,
    pub segments: Vec<Segment>,
    pub domains: Vec<Domain>,
    pub templates: Vec<TemplateSummary>,
}

pub struct SendWizard {
    api: Arc<dyn MailApi>,
    sequencer: StepSequencer,
    store: DraftStore,
    recount: RecountScheduler,
    submitter: SubmitController,
    domains: Option<Vec<Domain>>,
}

impl SendWizard {
    /// Fresh session with a default draft.
    pub fn new(
        api: Arc<dyn MailApi>,
        capabilities: Arc<dyn Capabilities>,
        debounce: Duration,
    ) -> Self {
        Self::with_draft(
            api,
            capabilities,
            debounce,
            CampaignDraft::default(),
            StepSequencer::new(),
            None,
        )
    }

    /// Session editing a stored campaign. Starts on the recipients step with every step open.
    pub async fn edit(
        api: Arc<dyn MailApi>,
        capabilities: Arc<dyn Capabilities>,
        debounce: Duration,
        campaign_name: &str,
    ) -> WizardResult<Self> {
        let campaign = api.campaign(campaign_name).await?;
        let draft = CampaignDraft::from_campaign(&campaign);
        info!(
            "[PHASE: send_wizard] [STEP: load] Editing campaign '{}' status={:?}",
            campaign.name, campaign.status
        );

        let wizard = Self::with_draft(
            api,
            capabilities,
            debounce,
            draft,
            StepSequencer::for_existing_campaign(),
            Some(campaign.name),
        );
        Ok(wizard)
    }

    /// Session over a prepared draft, e.g. one read from a file. The draft is replayed through
    /// `merge` first. With `campaign_to_load` the submit updates that stored campaign instead of
    /// creating a new one.
    pub fn from_draft(
        api: Arc<dyn MailApi>,
        capabilities: Arc<dyn Capabilities>,
        debounce: Duration,
        draft: CampaignDraft,
        campaign_to_load: Option<String>,
    ) -> Self {
        let sequencer = match campaign_to_load {
            Some(_) => StepSequencer::for_existing_campaign(),
            None => StepSequencer::new(),
        };
        Self::with_draft(
            api,
            capabilities,
            debounce,
            draft.normalized(),
            sequencer,
            campaign_to_load,
        )
    }

    fn with_draft(
        api: Arc<dyn MailApi>,
        capabilities: Arc<dyn Capabilities>,
        debounce: Duration,
        draft: CampaignDraft,
        sequencer: StepSequencer,
        campaign_to_load: Option<String>,
    ) -> Self {
        let store = DraftStore::new(draft);
        Self {
            recount: RecountScheduler::new(Arc::clone(&api), store.clone(), debounce),
            submitter: SubmitController::new(Arc::clone(&api), capabilities, campaign_to_load),
            api,
            sequencer,
            store,
            domains: None,
        }
    }

    /// Fetch lists, segments, domains and templates. Segments feed the recount, domains feed
    /// sender resolution.
    pub async fn load_reference_data(&mut self) -> Result<ReferenceData, ApiError> {
        let (lists, segments, domains, templates) = tokio::try_join!(
            self.api.lists(),
            self.api.segments(),
            self.api.domains(),
            self.api.templates()
        )?;

        info!(
            "[PHASE: send_wizard] [STEP: load] lists={} segments={} domains={} templates={}",
            lists.len(),
            segments.len(),
            domains.len(),
            templates.len()
        );

        self.recount.set_segments(segments.clone()).await;
        self.domains = Some(domains.clone());

        // An edited campaign's audience needs a count as soon as segment rules are known.
        if self.submitter.is_editing() {
            self.recount.trigger().await;
        }

        Ok(ReferenceData {
            lists,
            segments,
            domains,
            templates,
        })
    }

    pub fn step(&self) -> u8 {
        self.sequencer.step()
    }

    pub fn max_step_reached(&self) -> u8 {
        self.sequencer.max_step_reached()
    }

    pub fn advance(&mut self) {
        self.sequencer.advance();
    }

    pub fn retreat(&mut self) {
        self.sequencer.retreat();
    }

    pub fn jump_to(&mut self, step: u8) -> bool {
        self.sequencer.jump_to(step)
    }

    pub fn is_editing(&self) -> bool {
        self.submitter.is_editing()
    }

    pub async fn draft(&self) -> CampaignDraft {
        self.store.snapshot().await
    }

    pub async fn recipient_count(&self) -> RecipientCount {
        self.store.recipient_count().await
    }

    /// Recount the current audience regardless of whether it changed.
    pub async fn recount(&self) -> u64 {
        self.recount.trigger().await
    }

    /// Wait for any pending recount.
    pub async fn settle_count(&self) {
        self.recount.settle().await;
    }

    pub async fn select_type(&self, campaign_type: CampaignType) {
        self.store
            .merge(DraftPatch {
                campaign_type: Some(campaign_type),
                ..Default::default()
            })
            .await;
    }

    pub async fn set_recipients(&self, target: RecipientTarget, recipients: Recipients) {
        self.apply_settings(DraftPatch {
            recipient_target: Some(target),
            recipients: Some(recipients),
            ..Default::default()
        })
        .await;
    }

    pub async fn select_template(&self, name: &str) -> Result<ResolvedTemplate, ApiError> {
        template::select_template(self.api.as_ref(), &self.store, name).await
    }

    /// Merge any settings change. Audience changes schedule a recount.
    pub async fn apply_settings(&self, patch: DraftPatch) {
        let change = self.store.merge(patch).await;
        if change.audience_changed {
            self.recount.trigger().await;
        }
    }

    pub async fn choose_optimization(&self, choice: OptimizationChoice) {
        self.store.merge(DraftPatch::optimization(choice)).await;
    }

    pub async fn choose_send_action(&self, action: SendAction, schedule: Option<String>) {
        self.store
            .merge(DraftPatch {
                send_action: Some(action),
                schedule_date_time: Some(schedule),
                ..Default::default()
            })
            .await;
    }

    async fn domains(&self) -> Result<Vec<Domain>, ApiError> {
        match &self.domains {
            Some(domains) => Ok(domains.clone()),
            None => self.api.domains().await,
        }
    }

    /// The body the review step shows; identical to what `submit` sends.
    pub async fn preview(&self) -> Result<CampaignPayload, ApiError> {
        let draft = self.store.snapshot().await;
        let domains = self.domains().await?;
        Ok(payload::assemble(&draft, &domains))
    }

    pub async fn credit_status(&self, available_credits: Option<u64>) -> CreditStatus {
        check_credits(self.store.recipient_count().await, available_credits)
    }

    pub async fn submit(&self) -> WizardResult<SubmitOutcome> {
        let draft = self.store.snapshot().await;
        let domains = self.domains().await?;
        self.submitter.submit(&draft, &domains).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::stub::{Recorded, StubMailApi};
    use crate::models::requests::{
        CampaignContent, CampaignOptions, CampaignRecipients, CampaignStatus, CountQuery,
    };
    use crate::models::responses::{Campaign, Template, TemplateBodyPart};
    use crate::ui::AllowAll;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn stub() -> StubMailApi {
        StubMailApi::new()
            .with_domain(Domain {
                domain: "ex.com".into(),
                default_sender: Some("\"Jane Corp\" <mailer@ex.com>".into()),
                spf: json!("true"),
                dkim: json!("true"),
            })
            .with_template(Template {
                name: "T1".into(),
                subject: Some("Hi".into()),
                body: vec![TemplateBodyPart {
                    content_type: "HTML".into(),
                    content: "<p>Hello</p>".into(),
                }],
            })
            .with_segment("Engaged", "Status = 'Engaged'")
            .with_count(CountQuery::AllContacts, 100)
            .with_count(CountQuery::for_list("Newsletter"), 40)
            .with_count(CountQuery::Rule("Status = 'Engaged'".into()), 12)
    }

    fn wizard(api: Arc<StubMailApi>) -> SendWizard {
        SendWizard::new(api, Arc::new(AllowAll), Duration::ZERO)
    }

    #[tokio::test]
    async fn full_flow_sends_to_all_contacts() {
        let api = Arc::new(stub());
        let mut w = wizard(api.clone());
        w.load_reference_data().await.unwrap();

        w.select_type(CampaignType::Regular).await;
        w.advance();
        w.set_recipients(RecipientTarget::All, Recipients::default()).await;
        w.settle_count().await;
        assert_eq!(w.recipient_count().await, RecipientCount::Known(100));
        w.advance();
        w.select_template("T1").await.unwrap();
        w.advance();
        w.apply_settings(DraftPatch {
            from_name: Some("Jane".into()),
            ..Default::default()
        })
        .await;
        w.advance();
        assert_eq!(w.step(), 5);

        let preview = w.preview().await.unwrap();
        let out = w.submit().await.unwrap();
        assert_eq!(out.payload, preview);
        assert_eq!(out.status, CampaignStatus::Active);
        assert_eq!(out.payload.content[0].from, "Jane <mailer@ex.com>");
        assert_eq!(out.payload.name.as_deref(), Some("Hi"));
        assert!(matches!(&api.recorded()[0], Recorded::Create(_)));
    }

    #[tokio::test]
    async fn segment_selection_is_counted_with_loaded_rules() {
        let api = Arc::new(stub());
        let mut w = wizard(api);
        w.load_reference_data().await.unwrap();

        w.set_recipients(RecipientTarget::Segment, Recipients::segments(&["Engaged"]))
            .await;
        w.settle_count().await;
        assert_eq!(w.recipient_count().await, RecipientCount::Known(12));
        assert_eq!(w.credit_status(Some(5)).await, CreditStatus::Insufficient {
            needed: 12,
            available: 5
        });
    }

    #[tokio::test]
    async fn unchanged_audience_does_not_recount() {
        let api = Arc::new(stub());
        let w = wizard(api.clone());
        w.set_recipients(RecipientTarget::List, Recipients::lists(&["Newsletter"]))
            .await;
        w.settle_count().await;
        assert_eq!(api.count_calls.load(Ordering::SeqCst), 1);

        w.apply_settings(DraftPatch {
            subject: Some("New subject".into()),
            ..Default::default()
        })
        .await;
        w.set_recipients(RecipientTarget::List, Recipients::lists(&["Newsletter"]))
            .await;
        w.settle_count().await;
        assert_eq!(api.count_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn optimization_choice_flips_exclusive_flags() {
        let w = wizard(Arc::new(stub()));
        w.choose_optimization(OptimizationChoice::Optimal).await;
        let d = w.draft().await;
        assert!(d.enable_send_time_optimization);
        assert_eq!(d.delivery_optimization, crate::models::requests::DeliveryOptimization::None);

        w.choose_optimization(OptimizationChoice::Engaged).await;
        let d = w.draft().await;
        assert!(!d.enable_send_time_optimization);
        assert_eq!(
            d.delivery_optimization,
            crate::models::requests::DeliveryOptimization::ToEngagedFirst
        );
    }

    #[tokio::test]
    async fn failed_submit_keeps_draft_and_step() {
        let api = Arc::new(stub().failing_writes(ApiError::Http {
            status: 500,
            message: "Server busy".into(),
        }));
        let mut w = wizard(api);
        w.select_type(CampaignType::Regular).await;
        w.set_recipients(RecipientTarget::All, Recipients::default()).await;
        for _ in 0..4 {
            w.advance();
        }
        let before = w.draft().await;

        assert!(w.submit().await.is_err());
        assert_eq!(w.step(), 5);
        assert_eq!(w.draft().await.recipient_target, before.recipient_target);
    }

    #[tokio::test]
    async fn editing_rehydrates_and_updates_by_original_name() {
        let stored = Campaign {
            name: "Spring promo".into(),
            status: CampaignStatus::Draft,
            content: vec![CampaignContent {
                from: "Jane <mailer@ex.com>".into(),
                reply_to: String::new(),
                subject: Some("Spring sale".into()),
                template_name: Some("T1".into()),
                utm: None,
                body: None,
            }],
            recipients: CampaignRecipients {
                list_names: vec!["Newsletter".into()],
                segment_names: vec![],
            },
            options: CampaignOptions::default(),
        };
        let api = Arc::new(stub().with_campaign(stored));
        let mut w = SendWizard::edit(api.clone(), Arc::new(AllowAll), Duration::ZERO, "Spring promo")
            .await
            .unwrap();

        assert!(w.is_editing());
        assert_eq!(w.step(), 2);
        assert_eq!(w.max_step_reached(), 5);

        w.load_reference_data().await.unwrap();
        w.settle_count().await;
        assert_eq!(w.recipient_count().await, RecipientCount::Known(40));

        w.apply_settings(DraftPatch {
            campaign_name: Some("Spring promo v2".into()),
            ..Default::default()
        })
        .await;
        w.choose_send_action(SendAction::Now, None).await;
        w.submit().await.unwrap();

        match &api.recorded()[0] {
            Recorded::Update(name, p) => {
                assert_eq!(name, "Spring promo");
                assert_eq!(p.name.as_deref(), Some("Spring promo v2"));
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn editing_missing_campaign_is_an_api_error() {
        let api = Arc::new(stub());
        let result = SendWizard::edit(api, Arc::new(AllowAll), Duration::ZERO, "Nope").await;
        assert!(matches!(result, Err(crate::error::WizardError::Api(_))));
    }
}
