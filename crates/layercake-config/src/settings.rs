// SPDX-License-Identifier: Apache-2.0
//! Non-functional settings a `Db`/`Connector`/`MultiEditManager` can load
//! at startup and persist across runs, independent of any particular
//! `ConfigStore` backend.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigService, ConfigStore};

/// Persisted sync tuning, mirroring a connector's causal-ordering, ack,
/// identity, and dedup-memory knobs. Kept as a plain data type here
/// rather than reusing the sync crate's own config type, so this crate
/// has no dependency on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Attach causal sequence/predecessor metadata to outgoing payloads.
    pub causal_ordering: bool,
    /// Require peer acks before `sendWithAck` resolves.
    pub require_ack: bool,
    /// Milliseconds `sendWithAck` waits before timing out.
    pub ack_timeout_ms: u64,
    /// Attach an opaque per-connector client-identity token.
    pub include_client_identity: bool,
    /// Refs held per dedup generation before rotating.
    pub max_dedup_set_size: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            causal_ordering: false,
            require_ack: false,
            ack_timeout_ms: 10_000,
            include_client_identity: false,
            max_dedup_set_size: 10_000,
        }
    }
}

/// Config-facing port for loading/saving this store's non-functional
/// settings.
pub trait SettingsPort {
    /// Load sync settings (returns the default if missing or unreadable).
    fn load_sync_settings(&self) -> SyncSettings;
    /// Persist sync settings (best-effort; impl may log errors internally).
    fn save_sync_settings(&self, settings: &SyncSettings);
}

const SYNC_SETTINGS_KEY: &str = "sync_settings";

impl<S: ConfigStore> SettingsPort for ConfigService<S> {
    fn load_sync_settings(&self) -> SyncSettings {
        self.load::<SyncSettings>(SYNC_SETTINGS_KEY).ok().flatten().unwrap_or_default()
    }

    fn save_sync_settings(&self, settings: &SyncSettings) {
        let _ = self.save(SYNC_SETTINGS_KEY, settings);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::{SettingsPort, SyncSettings};
    use crate::config::{ConfigError, ConfigService, ConfigStore};

    struct MemStore(RefCell<HashMap<String, Vec<u8>>>);

    impl ConfigStore for MemStore {
        fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
            self.0.borrow().get(key).cloned().ok_or(ConfigError::NotFound)
        }

        fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
            self.0.borrow_mut().insert(key.to_owned(), data.to_vec());
            Ok(())
        }
    }

    #[test]
    fn missing_settings_fall_back_to_defaults() {
        let service = ConfigService::new(MemStore(RefCell::new(HashMap::new())));
        assert_eq!(service.load_sync_settings(), SyncSettings::default());
    }

    #[test]
    fn saved_settings_round_trip() {
        let service = ConfigService::new(MemStore(RefCell::new(HashMap::new())));
        let settings = SyncSettings {
            causal_ordering: true,
            require_ack: true,
            ack_timeout_ms: 2_000,
            include_client_identity: true,
            max_dedup_set_size: 500,
        };
        service.save_sync_settings(&settings);
        assert_eq!(service.load_sync_settings(), settings);
    }
}
