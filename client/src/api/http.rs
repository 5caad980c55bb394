// HTTP implementation of `MailApi` (reqwest)
//
// Reads are retried with exponential backoff + jitter, but only for transport failures; an HTTP
// error status is the server's answer and is returned as-is. Writes are never retried.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use url::Url;

use super::MailApi;
use crate::config::Settings;
use crate::error::ApiError;
use crate::models::requests::{CampaignPayload, CountQuery, ImportUpload};
use crate::models::responses::{
    Campaign, ContactList, Domain, Segment, Template, TemplateSummary,
};

const API_KEY_HEADER: &str = "X-ElasticEmail-ApiKey";

pub struct HttpMailApi {
    client: Client,
    base: Url,
    api_key: String,
    read_retries: usize,
}

impl HttpMailApi {
    pub fn new(settings: &Settings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        let base = Url::parse(settings.api_base_url.trim())?;
        if base.cannot_be_a_base() {
            return Err(ApiError::Url(settings.api_base_url.clone()));
        }

        Ok(Self {
            client,
            base,
            api_key: settings.api_key.clone(),
            read_retries: settings.read_retries,
        })
    }

    /// Base URL + percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Url(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_once<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let resp = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        resp.json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        debug!("[PHASE: api] [STEP: get] {}", url.path());

        let retry_strategy = ExponentialBackoff::from_millis(150)
            .factor(2)
            .max_delay(Duration::from_secs(2))
            .take(self.read_retries)
            .map(jitter);

        RetryIf::spawn(
            retry_strategy,
            || self.get_once::<T>(url.clone()),
            |e: &ApiError| {
                let retry = e.is_transient();
                if retry {
                    warn!("[PHASE: api] [STEP: retry] {} ({})", url.path(), e);
                }
                retry
            },
        )
        .await
    }
}

/// Turn a non-success status into `ApiError::Http` carrying the server's own message.
async fn check_status(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Http {
        status: status.as_u16(),
        message: server_message(status.as_u16(), &body),
    })
}

/// Pull the message out of an error body: `{"Error": ..}`, `{"message": ..}` or raw text.
fn server_message(status: u16, body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["Error", "error", "Message", "message"] {
            if let Some(s) = v.get(key).and_then(|m| m.as_str()) {
                if !s.trim().is_empty() {
                    return s.trim().to_string();
                }
            }
        }
    }
    let text = body.trim();
    if text.is_empty() {
        format!("HTTP {}", status)
    } else {
        text.to_string()
    }
}

#[async_trait]
impl MailApi for HttpMailApi {
    async fn lists(&self) -> Result<Vec<ContactList>, ApiError> {
        self.get_json(self.endpoint(&["lists"])?).await
    }

    async fn segments(&self) -> Result<Vec<Segment>, ApiError> {
        self.get_json(self.endpoint(&["segments"])?).await
    }

    async fn domains(&self) -> Result<Vec<Domain>, ApiError> {
        self.get_json(self.endpoint(&["domains"])?).await
    }

    async fn templates(&self) -> Result<Vec<TemplateSummary>, ApiError> {
        self.get_json(self.endpoint(&["templates"])?).await
    }

    async fn template(&self, name: &str) -> Result<Template, ApiError> {
        self.get_json(self.endpoint(&["templates", name])?).await
    }

    async fn count_contacts(&self, query: &CountQuery) -> Result<u64, ApiError> {
        let mut url = self.endpoint(&["contacts", "count"])?;
        match query {
            CountQuery::AllContacts => {
                url.query_pairs_mut().append_pair("allContacts", "true");
            }
            CountQuery::Rule(rule) => {
                url.query_pairs_mut().append_pair("rule", rule);
            }
        }
        self.get_json(url).await
    }

    async fn campaign(&self, name: &str) -> Result<Campaign, ApiError> {
        self.get_json(self.endpoint(&["campaigns", name])?).await
    }

    async fn create_campaign(&self, payload: &CampaignPayload) -> Result<(), ApiError> {
        let resp = self
            .client
            .post(self.endpoint(&["campaigns"])?)
            .header(API_KEY_HEADER, &self.api_key)
            .json(payload)
            .send()
            .await?;
        check_status(resp).await.map(|_| ())
    }

    async fn update_campaign(
        &self,
        name: &str,
        payload: &CampaignPayload,
    ) -> Result<(), ApiError> {
        let resp = self
            .client
            .put(self.endpoint(&["campaigns", name])?)
            .header(API_KEY_HEADER, &self.api_key)
            .json(payload)
            .send()
            .await?;
        check_status(resp).await.map(|_| ())
    }

    async fn import_contacts(&self, upload: ImportUpload) -> Result<(), ApiError> {
        let mapping = upload.mapping_json();
        let file = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)?;

        let mut form = Form::new()
            .part("file", file)
            .text("allowUpdate", upload.allow_update.to_string());
        if let Some(list) = upload.list_name.filter(|l| !l.trim().is_empty()) {
            form = form.text("listName", list);
        }
        if let Some(mapping) = mapping {
            form = form.text("mapping", mapping);
        }

        let resp = self
            .client
            .post(self.endpoint(&["contacts", "import"])?)
            .header(API_KEY_HEADER, &self.api_key)
            .multipart(form)
            .send()
            .await?;
        check_status(resp).await.map(|_| ())
    }
}
