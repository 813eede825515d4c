//! Runtime store of per-device signing keys learned from pairing messages.

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// MAC -> shared-secret map. Created empty at startup, never persisted,
/// discarded on shutdown. Safe to share across tasks.
#[derive(Debug, Default)]
pub struct KeyStore {
    keys: RwLock<HashMap<String, Vec<u8>>>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the key carried by a pairing message, replacing any earlier
    /// key for the same device. Devices re-pair without a listener restart,
    /// so overwrite is the correct behavior, not an error.
    pub fn observe_pairing(&self, mac: &str, key: Vec<u8>) {
        debug!(mac, key_len = key.len(), "Learned pairing key");
        self.keys.write().insert(mac.to_string(), key);
    }

    /// The key for `mac`, if one has been observed.
    pub fn lookup(&self, mac: &str) -> Option<Vec<u8>> {
        self.keys.read().get(mac).cloned()
    }
}
