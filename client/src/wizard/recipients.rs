// Recipient count aggregation
//
// One count query per selected list/segment, issued concurrently and summed. Recounts are
// debounced and generation-checked: only the most recent trigger may write the draft's count,
// whatever order the responses arrive in.

use futures::future::{join_all, try_join_all};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::api::MailApi;
use crate::error::CountError;
use crate::models::draft::{RecipientCount, RecipientTarget, Recipients};
use crate::models::requests::CountQuery;
use crate::models::responses::Segment;
use crate::models::state::DraftStore;

/// Total contacts addressed by a target + selection.
///
/// A failed list query contributes zero (logged); the aggregate only fails when every list
/// query failed. Segment queries are all-or-nothing.
pub async fn count_recipients(
    api: &dyn MailApi,
    target: RecipientTarget,
    recipients: &Recipients,
    segments: &[Segment],
) -> Result<u64, CountError> {
    match target {
        RecipientTarget::None => Ok(0),
        RecipientTarget::All => Ok(api.count_contacts(&CountQuery::AllContacts).await?),
        RecipientTarget::List => {
            if recipients.list_names.is_empty() {
                return Ok(0);
            }
            let queries: Vec<CountQuery> = recipients
                .list_names
                .iter()
                .map(|name| CountQuery::for_list(name))
                .collect();
            let results = join_all(queries.iter().map(|q| api.count_contacts(q))).await;

            let mut total = 0u64;
            let mut first_error = None;
            let mut failures = 0usize;
            for (name, result) in recipients.list_names.iter().zip(results) {
                match result {
                    Ok(n) => total += n,
                    Err(e) => {
                        warn!(
                            "[PHASE: send_wizard] [STEP: recount] Count for list '{}' failed, counting as 0: {}",
                            name, e
                        );
                        failures += 1;
                        first_error.get_or_insert(e);
                    }
                }
            }

            match first_error {
                Some(e) if failures == recipients.list_names.len() => Err(e.into()),
                _ => Ok(total),
            }
        }
        RecipientTarget::Segment => {
            let rules = recipients
                .segment_names
                .iter()
                .map(|name| {
                    segments
                        .iter()
                        .find(|s| &s.name == name)
                        .map(|s| CountQuery::Rule(s.rule.clone()))
                        .ok_or_else(|| CountError::UnknownSegment(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;

            let counts = try_join_all(rules.iter().map(|q| api.count_contacts(q))).await?;
            Ok(counts.into_iter().sum())
        }
    }
}

/// Debounced, last-trigger-wins recount of the draft's recipient count.
pub struct RecountScheduler {
    api: Arc<dyn MailApi>,
    store: DraftStore,
    debounce: Duration,
    segments: Arc<RwLock<Vec<Segment>>>,
    /// Newest recount task and its generation.
    pending: Mutex<Option<(u64, JoinHandle<()>)>>,
}

impl RecountScheduler {
    pub fn new(api: Arc<dyn MailApi>, store: DraftStore, debounce: Duration) -> Self {
        Self {
            api,
            store,
            debounce,
            segments: Arc::new(RwLock::new(Vec::new())),
            pending: Mutex::new(None),
        }
    }

    /// Segment rules used to resolve selected segment names.
    pub async fn set_segments(&self, segments: Vec<Segment>) {
        *self.segments.write().await = segments;
    }

    /// Mark the count as loading and (re)start the debounce timer. Supersedes any pending
    /// recount. Returns the generation of this recount.
    pub async fn trigger(&self) -> u64 {
        let (generation, draft) = self.store.begin_recount().await;
        let target = draft.recipient_target;
        let recipients = draft.recipients;

        let api = Arc::clone(&self.api);
        let store = self.store.clone();
        let segments = Arc::clone(&self.segments);
        let debounce = self.debounce;

        let task = tokio::spawn(async move {
            if !debounce.is_zero() {
                tokio::time::sleep(debounce).await;
            }

            let segments = segments.read().await.clone();
            let count = match count_recipients(api.as_ref(), target, &recipients, &segments).await
            {
                Ok(n) => RecipientCount::Known(n),
                Err(e) => {
                    warn!(
                        "[PHASE: send_wizard] [STEP: recount] Recipient count unavailable (generation={}): {}",
                        generation, e
                    );
                    RecipientCount::Unknown
                }
            };

            if store.commit_count(generation, count).await {
                info!(
                    "[PHASE: send_wizard] [STEP: recount] Recipient count {:?} (generation={})",
                    count, generation
                );
            } else {
                debug!(
                    "[PHASE: send_wizard] [STEP: recount] Discarded stale count (generation={})",
                    generation
                );
            }
        });

        self.supersede(generation, task);
        generation
    }

    /// Keep only the task of the newest generation. A trigger that lost the race to a newer one
    /// aborts its own task.
    fn supersede(&self, generation: u64, task: JoinHandle<()>) {
        let Ok(mut pending) = self.pending.lock() else {
            task.abort();
            return;
        };
        match pending.as_ref() {
            Some((newest, _)) if *newest > generation => task.abort(),
            _ => {
                if let Some((_, previous)) = pending.replace((generation, task)) {
                    previous.abort();
                }
            }
        }
    }

    /// Wait for the pending recount, if any, to finish.
    pub async fn settle(&self) {
        let task = self.pending.lock().ok().and_then(|mut p| p.take());
        if let Some((_, task)) = task {
            let _ = task.await;
        }
    }
}

impl Drop for RecountScheduler {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some((_, task)) = pending.take() {
                task.abort();
            }
        }
    }
}

/// Advisory credit check for the review step. Never blocks sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditStatus {
    Sufficient,
    Insufficient { needed: u64, available: u64 },
    Unknown,
}

pub fn check_credits(count: RecipientCount, available: Option<u64>) -> CreditStatus {
    match (count.known(), available) {
        (Some(needed), Some(available)) if needed > available => {
            CreditStatus::Insufficient { needed, available }
        }
        (Some(_), Some(_)) => CreditStatus::Sufficient,
        _ => CreditStatus::Unknown,
    }
}
