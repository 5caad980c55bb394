// Scripted `MailApi` for deterministic tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::MailApi;
use crate::error::ApiError;
use crate::models::requests::{CampaignPayload, CountQuery, ImportUpload};
use crate::models::responses::{
    Campaign, ContactList, Domain, Segment, Template, TemplateSummary,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Create(CampaignPayload),
    Update(String, CampaignPayload),
    Import(ImportUpload),
}

#[derive(Default)]
pub struct StubMailApi {
    pub lists: Vec<ContactList>,
    pub segments: Vec<Segment>,
    pub domains: Vec<Domain>,
    pub templates: HashMap<String, Template>,
    pub campaigns: HashMap<String, Campaign>,
    pub counts: HashMap<CountQuery, Result<u64, ApiError>>,
    pub count_delays: HashMap<CountQuery, Duration>,
    pub write_error: Option<ApiError>,
    pub write_delay: Duration,
    pub count_calls: AtomicU32,
    pub template_calls: AtomicU32,
    pub recorded: Mutex<Vec<Recorded>>,
}

impl StubMailApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_count(mut self, query: CountQuery, n: u64) -> Self {
        self.counts.insert(query, Ok(n));
        self
    }

    pub fn with_count_error(mut self, query: CountQuery, err: ApiError) -> Self {
        self.counts.insert(query, Err(err));
        self
    }

    pub fn with_count_delay(mut self, query: CountQuery, delay: Duration) -> Self {
        self.count_delays.insert(query, delay);
        self
    }

    pub fn with_segment(mut self, name: &str, rule: &str) -> Self {
        self.segments.push(Segment {
            name: name.to_string(),
            rule: rule.to_string(),
        });
        self
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domains.push(domain);
        self
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.templates.insert(template.name.clone(), template);
        self
    }

    pub fn with_campaign(mut self, campaign: Campaign) -> Self {
        self.campaigns.insert(campaign.name.clone(), campaign);
        self
    }

    pub fn failing_writes(mut self, err: ApiError) -> Self {
        self.write_error = Some(err);
        self
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().map(|r| r.clone()).unwrap_or_default()
    }

    async fn write(&self, entry: Recorded) -> Result<(), ApiError> {
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        if let Some(err) = &self.write_error {
            return Err(err.clone());
        }
        if let Ok(mut r) = self.recorded.lock() {
            r.push(entry);
        }
        Ok(())
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::Http {
        status: 404,
        message: format!("{} not found", what),
    }
}

#[async_trait]
impl MailApi for StubMailApi {
    async fn lists(&self) -> Result<Vec<ContactList>, ApiError> {
        Ok(self.lists.clone())
    }

    async fn segments(&self) -> Result<Vec<Segment>, ApiError> {
        Ok(self.segments.clone())
    }

    async fn domains(&self) -> Result<Vec<Domain>, ApiError> {
        Ok(self.domains.clone())
    }

    async fn templates(&self) -> Result<Vec<TemplateSummary>, ApiError> {
        Ok(self
            .templates
            .values()
            .map(|t| TemplateSummary {
                name: t.name.clone(),
                subject: t.subject.clone(),
            })
            .collect())
    }

    async fn template(&self, name: &str) -> Result<Template, ApiError> {
        self.template_calls.fetch_add(1, Ordering::SeqCst);
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(&format!("Template '{}'", name)))
    }

    async fn count_contacts(&self, query: &CountQuery) -> Result<u64, ApiError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.count_delays.get(query) {
            tokio::time::sleep(*delay).await;
        }
        self.counts
            .get(query)
            .cloned()
            .unwrap_or_else(|| Err(not_found("Count rule")))
    }

    async fn campaign(&self, name: &str) -> Result<Campaign, ApiError> {
        self.campaigns
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(&format!("Campaign '{}'", name)))
    }

    async fn create_campaign(&self, payload: &CampaignPayload) -> Result<(), ApiError> {
        self.write(Recorded::Create(payload.clone())).await
    }

    async fn update_campaign(
        &self,
        name: &str,
        payload: &CampaignPayload,
    ) -> Result<(), ApiError> {
        self.write(Recorded::Update(name.to_string(), payload.clone()))
            .await
    }

    async fn import_contacts(&self, upload: ImportUpload) -> Result<(), ApiError> {
        self.write(Recorded::Import(upload)).await
    }
}
