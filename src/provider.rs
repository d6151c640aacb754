//! Wallet provider boundary - the injected-provider contract plus the
//! in-process dev provider used when no browser wallet exists.
//!
//! The manager only ever sees this trait: `request` for the EIP-1193 style
//! method calls and `events` for provider-pushed notifications. Events go
//! through a broadcast channel; each `events()` call hands out a fresh
//! receiver and the session manager subscribes exactly once.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;
use tokio::sync::broadcast;

use crate::chains;

/// Request methods the session manager dispatches.
pub mod methods {
    pub const REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    pub const ACCOUNTS: &str = "eth_accounts";
    pub const CHAIN_ID: &str = "eth_chainId";
    pub const SWITCH_CHAIN: &str = "wallet_switchEthereumChain";
    pub const ADD_CHAIN: &str = "wallet_addEthereumChain";
}

/// User dismissed the wallet prompt.
pub const USER_REJECTED: i64 = 4001;
/// Switch target not registered with the wallet; add-then-retry applies.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
/// Method not supported by this provider.
pub const UNSUPPORTED_METHOD: i64 = -32601;

#[derive(Debug, Clone, thiserror::Error)]
#[error("provider error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(USER_REJECTED, message)
    }

    pub fn unrecognized_chain(chain_id: u64) -> Self {
        Self::new(UNRECOGNIZED_CHAIN, format!("unrecognized chain id {}", chain_id))
    }
}

/// Provider-pushed notifications.
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    /// Authorized account list changed; empty means access was revoked.
    AccountsChanged(Vec<String>),
    /// Active chain changed.
    ChainChanged(u64),
    /// Provider dropped the connection entirely.
    Disconnect,
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Dispatch a request to the wallet. Suspends until the wallet responds.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    /// Subscribe to provider-pushed events. Each call yields a fresh receiver.
    fn events(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Fixed development account served by [`DevProvider`].
pub const DEV_ACCOUNT: &str = "0xc0ffee254729296a45a3885639ac7e10f9d54979";

struct DevProviderInner {
    authorized: bool,
    deny_requests: bool,
    chain_id: u64,
    added_chains: Vec<u64>,
}

/// In-process provider for running the dashboard without a browser wallet.
///
/// Serves one fixed dev account. Chains from the static table switch
/// directly; anything else is rejected with 4902 until registered via
/// `wallet_addEthereumChain`, matching injected-wallet behavior. Event
/// firing is exposed so callers (and tests) can simulate wallet pushes.
pub struct DevProvider {
    inner: Mutex<DevProviderInner>,
    events: broadcast::Sender<ProviderEvent>,
}

impl Default for DevProvider {
    fn default() -> Self { Self::new() }
}

impl DevProvider {
    /// Unauthorized provider on Polygon Amoy; `eth_requestAccounts` grants.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Mutex::new(DevProviderInner {
                authorized: false,
                deny_requests: false,
                chain_id: 80002,
                added_chains: Vec::new(),
            }),
            events,
        }
    }

    /// Provider that already authorized the dev account, as a wallet that
    /// remembered this origin would.
    pub fn pre_authorized() -> Self {
        let provider = Self::new();
        provider.lock().authorized = true;
        provider
    }

    pub fn with_chain(self, chain_id: u64) -> Self {
        self.lock().chain_id = chain_id;
        self
    }

    /// Make `eth_requestAccounts` fail as if the user declined the prompt.
    pub fn deny_requests(&self, deny: bool) {
        self.lock().deny_requests = deny;
    }

    pub fn fire_accounts_changed(&self, accounts: Vec<String>) {
        let _ = self.events.send(ProviderEvent::AccountsChanged(accounts));
    }

    pub fn fire_chain_changed(&self, chain_id: u64) {
        let _ = self.events.send(ProviderEvent::ChainChanged(chain_id));
    }

    pub fn fire_disconnect(&self) {
        let _ = self.events.send(ProviderEvent::Disconnect);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DevProviderInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn switch_target(params: &Value) -> Result<u64, ProviderError> {
        params
            .get(0)
            .and_then(|p| p.get("chainId"))
            .and_then(chains::parse_chain_id)
            .ok_or_else(|| ProviderError::new(-32602, "missing chainId parameter"))
    }
}

#[async_trait]
impl WalletProvider for DevProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        match method {
            methods::ACCOUNTS => {
                let inner = self.lock();
                if inner.authorized {
                    Ok(json!([DEV_ACCOUNT]))
                } else {
                    Ok(json!([]))
                }
            }
            methods::REQUEST_ACCOUNTS => {
                let mut inner = self.lock();
                if inner.deny_requests {
                    return Err(ProviderError::rejected("user declined connection"));
                }
                inner.authorized = true;
                Ok(json!([DEV_ACCOUNT]))
            }
            methods::CHAIN_ID => {
                let inner = self.lock();
                Ok(json!(chains::chain_id_to_hex(inner.chain_id)))
            }
            methods::SWITCH_CHAIN => {
                let target = Self::switch_target(&params)?;
                {
                    let mut inner = self.lock();
                    if !chains::is_known(target) && !inner.added_chains.contains(&target) {
                        return Err(ProviderError::unrecognized_chain(target));
                    }
                    inner.chain_id = target;
                }
                // Real wallets notify after a successful switch.
                self.fire_chain_changed(target);
                Ok(Value::Null)
            }
            methods::ADD_CHAIN => {
                let target = params
                    .get(0)
                    .and_then(|p| p.get("chainId"))
                    .and_then(chains::parse_chain_id)
                    .ok_or_else(|| ProviderError::new(-32602, "missing chainId parameter"))?;
                let mut inner = self.lock();
                if !inner.added_chains.contains(&target) {
                    inner.added_chains.push(target);
                }
                Ok(Value::Null)
            }
            other => Err(ProviderError::new(
                UNSUPPORTED_METHOD,
                format!("unsupported method: {}", other),
            )),
        }
    }

    fn events(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn grants_after_request() {
        let provider = DevProvider::new();
        let accounts = provider.request(methods::ACCOUNTS, Value::Null).await.unwrap();
        assert_eq!(accounts, json!([]));

        let granted = provider.request(methods::REQUEST_ACCOUNTS, Value::Null).await.unwrap();
        assert_eq!(granted, json!([DEV_ACCOUNT]));

        let accounts = provider.request(methods::ACCOUNTS, Value::Null).await.unwrap();
        assert_eq!(accounts, json!([DEV_ACCOUNT]));
    }

    #[tokio::test]
    async fn denial_rejects_with_4001() {
        let provider = DevProvider::new();
        provider.deny_requests(true);
        let err = provider.request(methods::REQUEST_ACCOUNTS, Value::Null).await.unwrap_err();
        assert_eq!(err.code, USER_REJECTED);
    }

    #[tokio::test]
    async fn switch_known_chain_fires_event() {
        let provider = DevProvider::pre_authorized();
        let mut rx = provider.events();

        provider
            .request(methods::SWITCH_CHAIN, json!([{ "chainId": "0x89" }]))
            .await
            .unwrap();

        let chain = provider.request(methods::CHAIN_ID, Value::Null).await.unwrap();
        assert_eq!(chain, json!("0x89"));
        match rx.try_recv().unwrap() {
            ProviderEvent::ChainChanged(id) => assert_eq!(id, 137),
            other => panic!("expected ChainChanged, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_chain_needs_add() {
        let provider = DevProvider::new();
        let err = provider
            .request(methods::SWITCH_CHAIN, json!([{ "chainId": "0xf4240" }]))
            .await
            .unwrap_err();
        assert_eq!(err.code, UNRECOGNIZED_CHAIN);

        provider
            .request(methods::ADD_CHAIN, json!([{ "chainId": "0xf4240", "chainName": "Custom" }]))
            .await
            .unwrap();
        provider
            .request(methods::SWITCH_CHAIN, json!([{ "chainId": "0xf4240" }]))
            .await
            .unwrap();
    }
}
