//! Crate errors - everything here is recoverable; the worst outcome is a
//! session that stays disconnected.

use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum WalletError {
    /// No injected wallet provider was detected at startup.
    #[error("no wallet provider available")]
    ProviderUnavailable,

    /// ENABLE_WALLET_CONNECT is off; connecting falls back to mock behavior.
    #[error("wallet connect is disabled by feature flag")]
    FeatureDisabled,

    /// The provider declined the request (e.g. the user dismissed the prompt).
    #[error("provider rejected request (code {code}): {message}")]
    Rejected { code: i64, message: String },

    /// Flag storage read/write failed. Logged and swallowed by callers,
    /// never surfaced to the UI.
    #[error("flag storage: {0}")]
    Storage(String),
}

impl From<ProviderError> for WalletError {
    fn from(e: ProviderError) -> Self {
        WalletError::Rejected { code: e.code, message: e.message }
    }
}
