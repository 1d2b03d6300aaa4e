use crate::draft::CheckoutDraft;
use std::collections::HashMap;
use std::sync::Mutex;

/// Storage key for the single in-progress draft
pub const DRAFT_KEY: &str = "cinehold.checkout.draft";

/// Tab-scoped string storage the draft persists into.
///
/// One entry per key; nothing here is shared across tabs or survives the
/// session. Implementations are expected to be cheap synchronous KV access
/// (session storage, or the in-memory backend below).
pub trait SessionBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// In-memory backend, also the test double
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn put(&self, key: &str, value: String) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Draft serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persists the in-progress checkout across full-page reloads within one tab.
///
/// `restore` only hands a draft back when its booking id matches the booking
/// currently being loaded; a draft left over from a different booking in the
/// same tab is treated as absent, never merged.
pub struct CheckoutSessionStore<B: SessionBackend> {
    backend: B,
}

impl<B: SessionBackend> CheckoutSessionStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn save(&self, draft: &CheckoutDraft) -> Result<(), StoreError> {
        let json = serde_json::to_string(draft)?;
        self.backend.put(DRAFT_KEY, json);
        Ok(())
    }

    pub fn restore(&self, current_booking_id: Option<&str>) -> Option<CheckoutDraft> {
        let json = self.backend.get(DRAFT_KEY)?;

        let draft: CheckoutDraft = match serde_json::from_str(&json) {
            Ok(draft) => draft,
            Err(err) => {
                // Corrupt entry: treat as absent rather than failing the flow
                tracing::warn!(error = %err, "discarding unreadable checkout draft");
                self.backend.remove(DRAFT_KEY);
                return None;
            }
        };

        if draft.booking_id.as_deref() != current_booking_id {
            tracing::debug!(
                stored = ?draft.booking_id,
                current = ?current_booking_id,
                "stored draft belongs to a different booking, ignoring"
            );
            return None;
        }

        Some(draft)
    }

    pub fn clear(&self) {
        self.backend.remove(DRAFT_KEY);
    }
}
