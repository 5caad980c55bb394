// MegaMail REST API
//
// `MailApi` is the seam between the workflows and the HTTP layer. Production code uses
// `HttpMailApi`; tests use the scripted `StubMailApi`.

pub mod http;

#[cfg(test)]
pub(crate) mod stub;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::models::requests::{CampaignPayload, CountQuery, ImportUpload};
use crate::models::responses::{
    Campaign, ContactList, Domain, Segment, Template, TemplateSummary,
};

pub use http::HttpMailApi;

#[async_trait]
pub trait MailApi: Send + Sync {
    /// `GET /lists`
    async fn lists(&self) -> Result<Vec<ContactList>, ApiError>;

    /// `GET /segments`
    async fn segments(&self) -> Result<Vec<Segment>, ApiError>;

    /// `GET /domains`
    async fn domains(&self) -> Result<Vec<Domain>, ApiError>;

    /// `GET /templates`
    async fn templates(&self) -> Result<Vec<TemplateSummary>, ApiError>;

    /// `GET /templates/{name}`
    async fn template(&self, name: &str) -> Result<Template, ApiError>;

    /// Number of contacts matching the query.
    async fn count_contacts(&self, query: &CountQuery) -> Result<u64, ApiError>;

    /// `GET /campaigns/{name}`
    async fn campaign(&self, name: &str) -> Result<Campaign, ApiError>;

    /// `POST /campaigns`
    async fn create_campaign(&self, payload: &CampaignPayload) -> Result<(), ApiError>;

    /// `PUT /campaigns/{name}`, addressed by the campaign's stored name.
    async fn update_campaign(&self, name: &str, payload: &CampaignPayload)
        -> Result<(), ApiError>;

    /// Bulk contact import (multipart).
    async fn import_contacts(&self, upload: ImportUpload) -> Result<(), ApiError>;
}
