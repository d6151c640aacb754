//! Wallet session - connection lifecycle against the injected provider
//!
//! One manager owns the session for the whole process. UI consumers read
//! snapshots (or watch for them) and dispatch operations; only the manager
//! writes.
//!
//! # State machine
//!
//! | From | Event/Call | To |
//! |------|-----------|----|
//! | Disconnected | `connect()` | Connecting |
//! | Connecting | provider grants | Connected |
//! | Connecting | provider rejects | Disconnected |
//! | Connected | `accountsChanged` (empty) | Disconnected |
//! | Connected | `accountsChanged` (other address) | Connected |
//! | Connected | `chainChanged` | Connected |
//! | Connected | `disconnect` event | Disconnected |
//! | Connected/Disconnected | `disconnect_wallet()` | Disconnected |
//!
//! `Unavailable` is terminal: it is computed once at startup when no
//! provider is detected and nothing transitions out of it.
//!
//! Provider-pushed events and in-flight calls may interleave; mutations
//! take the inner lock briefly and never across an await, so the last
//! write to a field wins. Concurrent `connect()` calls are not
//! deduplicated; the UI disables the connect action while one is in
//! flight.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chains;
use crate::error::WalletError;
use crate::flags::{FeatureFlag, FeatureFlagStore};
use crate::provider::{methods, ProviderError, ProviderEvent, WalletProvider, UNRECOGNIZED_CHAIN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unavailable,
    Disconnected,
    Connecting,
    Connected,
}

/// Read-only session snapshot published to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletSession {
    /// Lowercase hex address, `None` while disconnected.
    pub account: Option<String>,
    /// Provider-reported chain id, 0 while disconnected.
    pub chain_id: u64,
    pub is_connected: bool,
    pub is_connecting: bool,
    pub network_name: String,
    pub provider_available: bool,
    pub state: SessionState,
}

struct SessionInner {
    account: Option<String>,
    chain_id: u64,
    is_connecting: bool,
    provider_available: bool,
}

impl SessionInner {
    fn snapshot(&self) -> WalletSession {
        let is_connected = self.account.as_deref().is_some_and(|a| !a.is_empty());
        let state = if !self.provider_available {
            SessionState::Unavailable
        } else if is_connected {
            SessionState::Connected
        } else if self.is_connecting {
            SessionState::Connecting
        } else {
            SessionState::Disconnected
        };
        WalletSession {
            account: self.account.clone(),
            chain_id: self.chain_id,
            is_connected,
            is_connecting: self.is_connecting,
            network_name: chains::network_name(self.chain_id).to_string(),
            provider_available: self.provider_available,
            state,
        }
    }
}

/// Mediates all interaction with the injected wallet provider.
pub struct WalletSessionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    flags: Arc<FeatureFlagStore>,
    inner: Arc<Mutex<SessionInner>>,
    publish: watch::Sender<WalletSession>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl WalletSessionManager {
    /// Detect the provider, probe for an already-authorized account, and
    /// start the single event-listener task.
    pub async fn start(
        provider: Option<Arc<dyn WalletProvider>>,
        flags: Arc<FeatureFlagStore>,
    ) -> Self {
        let mut inner = SessionInner {
            account: None,
            chain_id: 0,
            is_connecting: false,
            provider_available: provider.is_some(),
        };

        if let Some(p) = &provider {
            // Silent reconnect: wallets that already authorized this origin
            // return accounts from eth_accounts without a prompt.
            match p.request(methods::ACCOUNTS, Value::Null).await {
                Ok(value) => {
                    if let Some(account) = first_account(&value) {
                        inner.chain_id = query_chain_id(p.as_ref()).await.unwrap_or(0);
                        info!(account = %account, chain_id = inner.chain_id, "restored wallet session");
                        inner.account = Some(account);
                    }
                }
                Err(e) => debug!("account probe failed: {}", e),
            }
        }

        let (publish, _) = watch::channel(inner.snapshot());
        let manager = Self {
            provider,
            flags,
            inner: Arc::new(Mutex::new(inner)),
            publish,
            listener: Mutex::new(None),
        };
        if let Some(p) = &manager.provider {
            manager.spawn_listener(p.events());
        }
        manager
    }

    /// Current snapshot.
    pub fn session(&self) -> WalletSession {
        self.lock().snapshot()
    }

    pub fn state(&self) -> SessionState {
        self.session().state
    }

    /// Watch for snapshot updates. Every mutation publishes a fresh value.
    pub fn subscribe(&self) -> watch::Receiver<WalletSession> {
        self.publish.subscribe()
    }

    /// Request wallet access. Fails fast when the feature flag is off or no
    /// provider exists, without touching session state. Not deduplicated:
    /// a second in-flight call races and the last response wins.
    pub async fn connect(&self) -> Result<String, WalletError> {
        if !self.flags.is_enabled(FeatureFlag::WalletConnect) {
            return Err(WalletError::FeatureDisabled);
        }
        let provider = self
            .provider
            .clone()
            .ok_or(WalletError::ProviderUnavailable)?;

        self.update(|inner| inner.is_connecting = true);

        let granted = provider
            .request(methods::REQUEST_ACCOUNTS, Value::Null)
            .await
            .map_err(WalletError::from)
            .and_then(|value| {
                first_account(&value).ok_or_else(|| {
                    WalletError::from(ProviderError::rejected("no accounts granted"))
                })
            });

        match granted {
            Ok(account) => {
                let chain_id = query_chain_id(provider.as_ref()).await.unwrap_or(0);
                self.update(|inner| {
                    inner.is_connecting = false;
                    inner.account = Some(account.clone());
                    inner.chain_id = chain_id;
                });
                info!(account = %account, chain_id, "wallet connected");
                Ok(account)
            }
            Err(e) => {
                self.update(|inner| inner.is_connecting = false);
                debug!("connect failed: {}", e);
                Err(e)
            }
        }
    }

    /// Clear local session state. Injected providers expose no revocation
    /// API, so the wallet-side authorization stays in place.
    pub fn disconnect_wallet(&self) {
        self.update(|inner| {
            inner.account = None;
            inner.chain_id = 0;
            inner.is_connecting = false;
        });
        info!("wallet disconnected locally");
    }

    /// Ask the wallet to switch chains. Never errors to the caller: a 4902
    /// response triggers one registration attempt plus one retry, anything
    /// else is logged and reported as `false`.
    pub async fn switch_network(&self, chain_id: u64) -> bool {
        let Some(provider) = self.provider.clone() else {
            debug!(chain_id, "switch_network without provider");
            return false;
        };

        match request_switch(provider.as_ref(), chain_id).await {
            Ok(()) => {
                self.apply_chain(chain_id);
                true
            }
            Err(e) if e.code == UNRECOGNIZED_CHAIN => {
                let Some(params) = chains::add_chain_params(chain_id) else {
                    warn!(chain_id, "no registration parameters for chain");
                    return false;
                };
                if let Err(e) = provider.request(methods::ADD_CHAIN, json!([params])).await {
                    warn!(chain_id, error = %e, "chain registration failed");
                    return false;
                }
                match request_switch(provider.as_ref(), chain_id).await {
                    Ok(()) => {
                        self.apply_chain(chain_id);
                        true
                    }
                    Err(e) => {
                        warn!(chain_id, error = %e, "network switch failed after registration");
                        false
                    }
                }
            }
            Err(e) => {
                warn!(chain_id, error = %e, "network switch failed");
                false
            }
        }
    }

    /// Stop the event-listener task. Idempotent; safe to call on teardown
    /// of the owning scope however many times it remounts.
    pub fn close(&self) {
        let handle = self
            .listener
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
            debug!("provider event listener stopped");
        }
    }

    fn spawn_listener(&self, mut rx: broadcast::Receiver<ProviderEvent>) {
        let inner = self.inner.clone();
        let publish = self.publish.clone();
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => apply_event(&inner, &publish, event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("dropped {} provider events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        *self.listener.lock().unwrap_or_else(|p| p.into_inner()) = Some(handle);
    }

    fn apply_chain(&self, chain_id: u64) {
        self.update(|inner| inner.chain_id = chain_id);
        info!(chain_id, network = chains::network_name(chain_id), "network switched");
    }

    fn update(&self, f: impl FnOnce(&mut SessionInner)) {
        let mut guard = self.lock();
        f(&mut guard);
        self.publish.send_replace(guard.snapshot());
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

fn apply_event(
    inner: &Mutex<SessionInner>,
    publish: &watch::Sender<WalletSession>,
    event: ProviderEvent,
) {
    let mut guard = inner.lock().unwrap_or_else(|p| p.into_inner());
    match event {
        ProviderEvent::AccountsChanged(accounts) => {
            match accounts.into_iter().find(|a| !a.is_empty()) {
                Some(account) => {
                    // Chain is untouched unless a chainChanged also fires.
                    guard.account = Some(account.to_lowercase());
                    info!(account = %guard.account.as_deref().unwrap_or(""), "active account changed");
                }
                None => {
                    guard.account = None;
                    guard.chain_id = 0;
                    info!("wallet access revoked");
                }
            }
        }
        ProviderEvent::ChainChanged(chain_id) => {
            guard.chain_id = chain_id;
            debug!(chain_id, network = chains::network_name(chain_id), "chain changed");
        }
        ProviderEvent::Disconnect => {
            guard.account = None;
            guard.chain_id = 0;
            info!("provider disconnected");
        }
    }
    publish.send_replace(guard.snapshot());
}

async fn request_switch(
    provider: &dyn WalletProvider,
    chain_id: u64,
) -> Result<(), ProviderError> {
    provider
        .request(
            methods::SWITCH_CHAIN,
            json!([{ "chainId": chains::chain_id_to_hex(chain_id) }]),
        )
        .await
        .map(|_| ())
}

fn first_account(value: &Value) -> Option<String> {
    value
        .as_array()?
        .iter()
        .filter_map(|v| v.as_str())
        .find(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
}

async fn query_chain_id(provider: &dyn WalletProvider) -> Option<u64> {
    match provider.request(methods::CHAIN_ID, Value::Null).await {
        Ok(value) => chains::parse_chain_id(&value),
        Err(e) => {
            debug!("chain id query failed: {}", e);
            None
        }
    }
}
