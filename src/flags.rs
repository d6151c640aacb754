//! Feature flags - runtime toggles gating blockchain-dependent behavior
//!
//! Every flag defaults to on. The whole set is persisted through a
//! `FlagStorage` backend after each mutation and loaded once at
//! construction; a missing or unreadable persisted set falls back to the
//! defaults and the failure is logged, never surfaced.
//!
//! | Flag | Gates |
//! |------|-------|
//! | `ENABLE_WALLET_CONNECT` | wallet session connect |
//! | `ENABLE_MINTING` | batch token minting UI |
//! | `ENABLE_REDEMPTION` | token redemption UI |
//! | `ENABLE_MARKETPLACE` | marketplace listings |
//! | `ENABLE_DISTRIBUTOR_REGISTRATION` | distributor onboarding |
//! | `ENABLE_VERIFICATION` | batch verification UI |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Recognized flag keys. Toggling is constrained to this closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureFlag {
    WalletConnect,
    Minting,
    Redemption,
    Marketplace,
    DistributorRegistration,
    Verification,
}

impl FeatureFlag {
    pub const ALL: &'static [FeatureFlag] = &[
        FeatureFlag::WalletConnect,
        FeatureFlag::Minting,
        FeatureFlag::Redemption,
        FeatureFlag::Marketplace,
        FeatureFlag::DistributorRegistration,
        FeatureFlag::Verification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureFlag::WalletConnect => "ENABLE_WALLET_CONNECT",
            FeatureFlag::Minting => "ENABLE_MINTING",
            FeatureFlag::Redemption => "ENABLE_REDEMPTION",
            FeatureFlag::Marketplace => "ENABLE_MARKETPLACE",
            FeatureFlag::DistributorRegistration => "ENABLE_DISTRIBUTOR_REGISTRATION",
            FeatureFlag::Verification => "ENABLE_VERIFICATION",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ENABLE_WALLET_CONNECT" => Some(FeatureFlag::WalletConnect),
            "ENABLE_MINTING" => Some(FeatureFlag::Minting),
            "ENABLE_REDEMPTION" => Some(FeatureFlag::Redemption),
            "ENABLE_MARKETPLACE" => Some(FeatureFlag::Marketplace),
            "ENABLE_DISTRIBUTOR_REGISTRATION" => Some(FeatureFlag::DistributorRegistration),
            "ENABLE_VERIFICATION" => Some(FeatureFlag::Verification),
            _ => None,
        }
    }
}

fn enabled() -> bool { true }

/// Total mapping flag → bool. Keys absent from a persisted set keep their
/// default; unrecognized keys in persisted JSON are ignored on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlagSet {
    #[serde(rename = "ENABLE_WALLET_CONNECT", default = "enabled")]
    pub wallet_connect: bool,
    #[serde(rename = "ENABLE_MINTING", default = "enabled")]
    pub minting: bool,
    #[serde(rename = "ENABLE_REDEMPTION", default = "enabled")]
    pub redemption: bool,
    #[serde(rename = "ENABLE_MARKETPLACE", default = "enabled")]
    pub marketplace: bool,
    #[serde(rename = "ENABLE_DISTRIBUTOR_REGISTRATION", default = "enabled")]
    pub distributor_registration: bool,
    #[serde(rename = "ENABLE_VERIFICATION", default = "enabled")]
    pub verification: bool,
}

impl Default for FeatureFlagSet {
    fn default() -> Self {
        Self {
            wallet_connect: true,
            minting: true,
            redemption: true,
            marketplace: true,
            distributor_registration: true,
            verification: true,
        }
    }
}

impl FeatureFlagSet {
    pub fn get(&self, flag: FeatureFlag) -> bool {
        match flag {
            FeatureFlag::WalletConnect => self.wallet_connect,
            FeatureFlag::Minting => self.minting,
            FeatureFlag::Redemption => self.redemption,
            FeatureFlag::Marketplace => self.marketplace,
            FeatureFlag::DistributorRegistration => self.distributor_registration,
            FeatureFlag::Verification => self.verification,
        }
    }

    fn set(&mut self, flag: FeatureFlag, value: bool) {
        match flag {
            FeatureFlag::WalletConnect => self.wallet_connect = value,
            FeatureFlag::Minting => self.minting = value,
            FeatureFlag::Redemption => self.redemption = value,
            FeatureFlag::Marketplace => self.marketplace = value,
            FeatureFlag::DistributorRegistration => self.distributor_registration = value,
            FeatureFlag::Verification => self.verification = value,
        }
    }

    pub fn toggle(&mut self, flag: FeatureFlag) {
        self.set(flag, !self.get(flag));
    }
}

/// Durable key-value boundary for the serialized flag set. Best-effort:
/// callers tolerate an absent or failing backend.
pub trait FlagStorage: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, raw: &str) -> std::io::Result<()>;
}

/// File-backed storage under the platform data dir (or `BREWTRACE_DATA_DIR`).
pub struct FileFlagStorage {
    path: PathBuf,
}

impl FileFlagStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `<data dir>/<app>/flags.json`
    pub fn default_path(app: &str) -> PathBuf {
        let root = std::env::var("BREWTRACE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")));
        root.join(app).join("flags.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FlagStorage for FileFlagStorage {
    fn load(&self) -> Option<String> {
        std::fs::read_to_string(&self.path).ok()
    }

    fn save(&self, raw: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, raw)
    }
}

/// In-memory storage for tests and mock mode.
#[derive(Default)]
pub struct MemoryFlagStorage {
    raw: Mutex<Option<String>>,
}

impl MemoryFlagStorage {
    pub fn new() -> Self { Self::default() }
}

impl FlagStorage for MemoryFlagStorage {
    fn load(&self) -> Option<String> {
        self.raw.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn save(&self, raw: &str) -> std::io::Result<()> {
        *self.raw.lock().unwrap_or_else(|p| p.into_inner()) = Some(raw.to_string());
        Ok(())
    }
}

/// Process-wide flag store. Single writer, synchronous; shared via `Arc`.
pub struct FeatureFlagStore {
    flags: Mutex<FeatureFlagSet>,
    storage: Box<dyn FlagStorage>,
}

impl FeatureFlagStore {
    /// Load persisted flags through `storage`, falling back to defaults.
    /// A persisted set fully replaces the defaults; there is no per-key merge.
    pub fn open(storage: Box<dyn FlagStorage>) -> Self {
        let flags = match storage.load() {
            Some(raw) => match serde_json::from_str::<FeatureFlagSet>(&raw) {
                Ok(set) => set,
                Err(e) => {
                    tracing::warn!("persisted flags unreadable, using defaults: {}", e);
                    FeatureFlagSet::default()
                }
            },
            None => FeatureFlagSet::default(),
        };
        Self { flags: Mutex::new(flags), storage }
    }

    pub fn in_memory() -> Self {
        Self::open(Box::new(MemoryFlagStorage::new()))
    }

    /// Current flag set. Never fails.
    pub fn get(&self) -> FeatureFlagSet {
        *self.flags.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn is_enabled(&self, flag: FeatureFlag) -> bool {
        self.get().get(flag)
    }

    /// Flip `flag` and persist the whole set.
    pub fn toggle(&self, flag: FeatureFlag) {
        let set = {
            let mut guard = self.flags.lock().unwrap_or_else(|p| p.into_inner());
            guard.toggle(flag);
            *guard
        };
        self.persist(&set);
    }

    /// Restore the defaults, discarding all persisted overrides.
    pub fn reset(&self) {
        let set = FeatureFlagSet::default();
        *self.flags.lock().unwrap_or_else(|p| p.into_inner()) = set;
        self.persist(&set);
    }

    fn persist(&self, set: &FeatureFlagSet) {
        let raw = match serde_json::to_string(set) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("flag serialization failed: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.save(&raw) {
            tracing::debug!("flag persistence failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_negates_every_call() {
        let store = FeatureFlagStore::in_memory();
        for &flag in FeatureFlag::ALL {
            let before = store.is_enabled(flag);
            store.toggle(flag);
            assert_eq!(store.is_enabled(flag), !before);
            store.toggle(flag);
            assert_eq!(store.is_enabled(flag), before);
        }
    }

    #[test]
    fn reset_restores_defaults() {
        let store = FeatureFlagStore::in_memory();
        store.toggle(FeatureFlag::Minting);
        store.toggle(FeatureFlag::Marketplace);
        store.toggle(FeatureFlag::WalletConnect);
        store.reset();
        assert_eq!(store.get(), FeatureFlagSet::default());
    }

    #[test]
    fn defaults_are_all_on() {
        let set = FeatureFlagSet::default();
        for &flag in FeatureFlag::ALL {
            assert!(set.get(flag), "{} should default on", flag.as_str());
        }
    }

    #[test]
    fn key_round_trip() {
        for &flag in FeatureFlag::ALL {
            assert_eq!(FeatureFlag::from_str(flag.as_str()), Some(flag));
        }
        assert_eq!(FeatureFlag::from_str("enable_minting"), Some(FeatureFlag::Minting));
        assert_eq!(FeatureFlag::from_str("ENABLE_TIME_TRAVEL"), None);
    }

    #[test]
    fn unknown_persisted_keys_ignored_missing_keys_default() {
        let raw = r#"{"ENABLE_MINTING": false, "ENABLE_ESPRESSO": true}"#;
        let set: FeatureFlagSet = serde_json::from_str(raw).expect("parse");
        assert!(!set.minting);
        assert!(set.wallet_connect);
        assert!(set.verification);
    }
}
