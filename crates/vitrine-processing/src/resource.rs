//! Object URL bookkeeping
//!
//! Previews and compressed outputs are exposed as `blob:vitrine/<uuid>` URLs.
//! Each pipeline owns one tracker; every URL it hands out must be revoked
//! exactly once.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;
use vitrine_core::constants::OBJECT_URL_PREFIX;

/// Blob behind an object URL
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectBlob {
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug, Default)]
struct TrackerState {
    live: HashMap<String, ObjectBlob>,
    revoked_total: usize,
}

impl Drop for TrackerState {
    fn drop(&mut self) {
        if !self.live.is_empty() {
            tracing::debug!(
                released = self.live.len(),
                "Releasing object URLs with their tracker"
            );
        }
    }
}

/// Cloneable handle to a set of live object URLs
#[derive(Debug, Clone, Default)]
pub struct ResourceTracker {
    inner: Arc<Mutex<TrackerState>>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::error!("Resource tracker lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Track a URL created elsewhere. Re-registering a live URL replaces its blob.
    pub fn register_url(&self, url: impl Into<String>, blob: ObjectBlob) {
        let url = url.into();
        tracing::trace!(url = %url, size = blob.data.len(), "Registering object URL");
        self.state().live.insert(url, blob);
    }

    /// Mint a fresh object URL for `data`
    pub fn create_object_url(&self, data: Bytes, content_type: impl Into<String>) -> String {
        let url = format!("{}{}", OBJECT_URL_PREFIX, Uuid::new_v4());
        self.register_url(
            url.clone(),
            ObjectBlob {
                content_type: content_type.into(),
                data,
            },
        );
        url
    }

    pub fn resolve(&self, url: &str) -> Option<ObjectBlob> {
        self.state().live.get(url).cloned()
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.state().live.contains_key(url)
    }

    /// Release one URL. Returns `false` if it was unknown or already revoked.
    pub fn revoke(&self, url: &str) -> bool {
        let mut state = self.state();
        if state.live.remove(url).is_some() {
            state.revoked_total += 1;
            tracing::trace!(url = %url, "Revoked object URL");
            true
        } else {
            false
        }
    }

    /// Release every live URL, returning how many were released.
    pub fn revoke_all(&self) -> usize {
        let mut state = self.state();
        let released = state.live.len();
        state.live.clear();
        state.revoked_total += released;
        if released > 0 {
            tracing::debug!(released = released, "Revoked all object URLs");
        }
        released
    }

    pub fn live_count(&self) -> usize {
        self.state().live.len()
    }

    /// URLs revoked over the tracker's lifetime
    pub fn revoked_total(&self) -> usize {
        self.state().revoked_total
    }
}
