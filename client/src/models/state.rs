// Draft store (in-memory)
//
// NOTE: This is NOT persisted; the draft lives for one wizard session. Every writer goes through
// this handle, and the recount generation lives under the same lock as the draft so a stale
// count can never land after a newer "loading" marker.

use std::sync::Arc;
use tokio::sync::Mutex;

use super::draft::{CampaignDraft, DraftChange, DraftPatch, RecipientCount};

#[derive(Debug, Clone, Default)]
pub struct DraftStore {
    inner: Arc<Mutex<DraftStoreInner>>,
}

#[derive(Debug, Default)]
struct DraftStoreInner {
    draft: CampaignDraft,
    count_generation: u64,
}

impl DraftStore {
    pub fn new(draft: CampaignDraft) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DraftStoreInner {
                draft,
                count_generation: 0,
            })),
        }
    }

    pub async fn snapshot(&self) -> CampaignDraft {
        self.inner.lock().await.draft.clone()
    }

    pub async fn merge(&self, patch: DraftPatch) -> DraftChange {
        self.inner.lock().await.draft.merge(patch)
    }

    /// Start a new recount: bumps the generation, marks the count as loading and returns the
    /// draft the recount must count for, all under one lock.
    pub async fn begin_recount(&self) -> (u64, CampaignDraft) {
        let mut inner = self.inner.lock().await;
        inner.count_generation += 1;
        inner.draft.recipient_count = RecipientCount::Loading;
        (inner.count_generation, inner.draft.clone())
    }

    /// Commit a recount result. Returns false (and writes nothing) if a newer recount started.
    pub async fn commit_count(&self, generation: u64, count: RecipientCount) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.count_generation != generation {
            return false;
        }
        inner.draft.recipient_count = count;
        true
    }

    pub async fn recipient_count(&self) -> RecipientCount {
        self.inner.lock().await.draft.recipient_count
    }
}
