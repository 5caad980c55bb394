// Command bodies for the `megamail` binary
//
// Each command drives the same workflow objects the UI uses, against any `MailApi`.

use anyhow::{anyhow, bail, Context, Result};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::api::MailApi;
use crate::import::{self, ImportOutcome, ImportWizard, UploadForm};
use crate::models::draft::{CampaignDraft, RecipientTarget, Recipients};
use crate::ui::{Capabilities, Translator};
use crate::wizard::recipients::count_recipients;
use crate::wizard::submit::{self, SubmitOutcome};
use crate::wizard::SendWizard;

/// Read a TOML draft and replay it through the draft invariants.
pub fn load_draft(path: &Path) -> Result<CampaignDraft> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read draft file {}", path.display()))?;
    let draft: CampaignDraft = toml::from_str(&text)
        .with_context(|| format!("Invalid draft file {}", path.display()))?;
    Ok(draft.normalized())
}

/// `all`, `lists:A,B` or `segments:A,B`.
pub fn parse_count_target(spec: &str) -> Option<(RecipientTarget, Recipients)> {
    let spec = spec.trim();
    if spec.eq_ignore_ascii_case("all") {
        return Some((RecipientTarget::All, Recipients::default()));
    }

    let (kind, names) = spec.split_once(':')?;
    let names: Vec<&str> = names
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        return None;
    }

    match kind.trim().to_ascii_lowercase().as_str() {
        "lists" | "list" => Some((RecipientTarget::List, Recipients::lists(&names))),
        "segments" | "segment" => Some((RecipientTarget::Segment, Recipients::segments(&names))),
        _ => None,
    }
}

/// JSON body that `send` would write for this draft.
pub async fn preview(
    api: Arc<dyn MailApi>,
    capabilities: Arc<dyn Capabilities>,
    draft: CampaignDraft,
) -> Result<String> {
    let wizard = SendWizard::from_draft(api, capabilities, Duration::ZERO, draft, None);
    let payload = wizard.preview().await?;
    payload.to_json().context("Failed to serialize campaign payload")
}

pub async fn send(
    api: Arc<dyn MailApi>,
    capabilities: Arc<dyn Capabilities>,
    translator: &dyn Translator,
    debounce: Duration,
    draft: CampaignDraft,
    campaign: Option<String>,
) -> Result<SubmitOutcome> {
    let mut wizard = SendWizard::from_draft(api, capabilities, debounce, draft, campaign);
    wizard.load_reference_data().await?;
    wizard.recount().await;
    wizard.settle_count().await;
    info!(
        "[PHASE: cli] [STEP: send] Recipient count before submit: {:?}",
        wizard.recipient_count().await
    );

    wizard
        .submit()
        .await
        .map_err(|e| anyhow!(submit::failure_notice(&e).render(translator)))
}

pub async fn count(api: Arc<dyn MailApi>, spec: &str) -> Result<u64> {
    let Some((target, recipients)) = parse_count_target(spec) else {
        bail!("Invalid count target '{}'", spec);
    };
    let segments = match target {
        RecipientTarget::Segment => api.segments().await?,
        _ => Vec::new(),
    };
    Ok(count_recipients(api.as_ref(), target, &recipients, &segments).await?)
}

pub struct ImportArgs {
    pub file: PathBuf,
    pub consent: bool,
    pub list_name: Option<String>,
    pub allow_update: bool,
}

pub async fn import_contacts(
    api: Arc<dyn MailApi>,
    capabilities: Arc<dyn Capabilities>,
    translator: &dyn Translator,
    args: ImportArgs,
) -> Result<ImportOutcome> {
    let mut wizard = ImportWizard::new(api, capabilities, Vec::new());
    let form = UploadForm {
        file: Some(args.file),
        mime_type: None,
        consent: args.consent,
        list_name: args.list_name,
        allow_update: args.allow_update,
    };

    if let Err(e) = wizard.proceed(form).await {
        bail!(import::failure_notice(&e).render(translator));
    }
    if let Some(mapping) = wizard.mapping() {
        for (header, target) in mapping.entries() {
            info!("[PHASE: cli] [STEP: import] '{}' -> {}", header, target);
        }
    }

    wizard
        .commit()
        .await
        .map_err(|e| anyhow!(import::failure_notice(&e).render(translator)))
}
