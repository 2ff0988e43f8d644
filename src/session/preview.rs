use crate::upload::SelectedFile;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use std::collections::HashSet;
use std::sync::Mutex;
use uuid::Uuid;

/// A revocable local preview of the selected file.
///
/// Not `Clone`: only the holder can hand it back to the store.
#[derive(Debug, PartialEq, Eq)]
pub struct PreviewRef {
    pub id: Uuid,
    pub uri: String,
}

pub trait PreviewStore: Send + Sync {
    fn create(&self, file: &SelectedFile) -> PreviewRef;

    /// Release a preview. Returns false if it was not live.
    fn revoke(&self, preview: PreviewRef) -> bool;
}

/// Issues `data:` URIs and tracks which ones are still live
#[derive(Debug, Default)]
pub struct DataUrlPreviewStore {
    inner: Mutex<PreviewLedger>,
}

#[derive(Debug, Default)]
struct PreviewLedger {
    live: HashSet<Uuid>,
    created: usize,
    revoked: usize,
}

impl DataUrlPreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.ledger().live.len()
    }

    pub fn created_count(&self) -> usize {
        self.ledger().created
    }

    pub fn revoked_count(&self) -> usize {
        self.ledger().revoked
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, PreviewLedger> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PreviewStore for DataUrlPreviewStore {
    fn create(&self, file: &SelectedFile) -> PreviewRef {
        let id = Uuid::new_v4();
        let uri = format!(
            "data:{};base64,{}",
            file.media_type,
            BASE64_STANDARD.encode(&file.bytes)
        );

        let mut ledger = self.ledger();
        ledger.live.insert(id);
        ledger.created += 1;
        tracing::debug!("Preview {} created for {}", id, file.name);

        PreviewRef { id, uri }
    }

    fn revoke(&self, preview: PreviewRef) -> bool {
        let mut ledger = self.ledger();
        if ledger.live.remove(&preview.id) {
            ledger.revoked += 1;
            tracing::debug!("Preview {} revoked", preview.id);
            true
        } else {
            tracing::warn!("Preview {} was not live, ignoring revoke", preview.id);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> SelectedFile {
        SelectedFile::new("me.png", "image/png", b"\x89PNG\r\n\x1a\nrest".to_vec())
    }

    #[test]
    fn test_preview_is_data_uri() {
        let store = DataUrlPreviewStore::new();
        let preview = store.create(&file());
        assert!(preview.uri.starts_with("data:image/png;base64,"));
        assert_eq!(store.live_count(), 1);
    }

    #[test]
    fn test_revoke_once() {
        let store = DataUrlPreviewStore::new();
        let preview = store.create(&file());
        let id = preview.id;

        assert!(store.revoke(preview));
        assert_eq!(store.live_count(), 0);

        let stale = PreviewRef {
            id,
            uri: String::new(),
        };
        assert!(!store.revoke(stale));
        assert_eq!(store.revoked_count(), 1);
    }
}
