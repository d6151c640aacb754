//! Brewtrace: wallet connectivity core for the coffee traceability dashboard.
//!
//! # Architecture
//!
//! ```text
//! WalletSessionManager (session lifecycle, single writer)
//!   │
//!   ├── WalletProvider (injected wallet boundary)
//!   │     ├── request: eth_accounts / eth_requestAccounts / eth_chainId
//!   │     │            wallet_switchEthereumChain / wallet_addEthereumChain
//!   │     └── events: accountsChanged / chainChanged / disconnect
//!   │
//!   ├── FeatureFlagStore (gates connect; persisted via FlagStorage)
//!   │
//!   └── watch channel → UI consumers (read-only snapshots)
//! ```
//!
//! # Session states
//!
//! | State | Meaning |
//! |-------|---------|
//! | `Unavailable` | no provider detected at startup |
//! | `Disconnected` | provider present, no account |
//! | `Connecting` | account request in flight |
//! | `Connected` | account granted, chain tracked |
//!
//! # Usage
//!
//! ```ignore
//! use brewtrace::{DevProvider, FeatureFlagStore, WalletSessionManager};
//! use std::sync::Arc;
//!
//! let flags = Arc::new(FeatureFlagStore::in_memory());
//! let provider = Arc::new(DevProvider::new());
//! let manager = WalletSessionManager::start(Some(provider), flags).await;
//!
//! let address = manager.connect().await?;
//! let switched = manager.switch_network(137).await;
//! ```
//!
//! # Features
//!
//! - `server` - axum HTTP surface for the dashboard UI (default)

pub mod chains;
pub mod error;
pub mod flags;
pub mod logging;
pub mod provider;
pub mod runtime;
pub mod session;

#[cfg(feature = "server")]
pub mod server;

pub use error::WalletError;
pub use flags::{
    FeatureFlag, FeatureFlagSet, FeatureFlagStore, FileFlagStorage, FlagStorage,
    MemoryFlagStorage,
};
pub use provider::{DevProvider, ProviderError, ProviderEvent, WalletProvider, DEV_ACCOUNT};
pub use runtime::{install_signal_handlers, Shutdown};
pub use session::{SessionState, WalletSession, WalletSessionManager};

#[cfg(feature = "server")]
pub use server::{create_router, create_router_with_name};
