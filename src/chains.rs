//! Chain identity table - chain id → network name and registration params
//!
//! Static config only. `network_name` backs the session's derived label;
//! `add_chain_params` produces the `wallet_addEthereumChain` payload used
//! on the 4902 add-then-retry path.

use serde_json::{json, Value};

pub const UNKNOWN_NETWORK: &str = "Unknown Network";

struct ChainInfo {
    id: u64,
    name: &'static str,
    currency_name: &'static str,
    symbol: &'static str,
    decimals: u8,
    rpc_url: &'static str,
    explorer_url: Option<&'static str>,
}

const CHAINS: &[ChainInfo] = &[
    ChainInfo {
        id: 1,
        name: "Ethereum Mainnet",
        currency_name: "Ether",
        symbol: "ETH",
        decimals: 18,
        rpc_url: "https://eth.llamarpc.com",
        explorer_url: Some("https://etherscan.io"),
    },
    ChainInfo {
        id: 137,
        name: "Polygon",
        currency_name: "POL",
        symbol: "POL",
        decimals: 18,
        rpc_url: "https://polygon-rpc.com",
        explorer_url: Some("https://polygonscan.com"),
    },
    ChainInfo {
        id: 11155111,
        name: "Sepolia",
        currency_name: "Sepolia Ether",
        symbol: "ETH",
        decimals: 18,
        rpc_url: "https://rpc.sepolia.org",
        explorer_url: Some("https://sepolia.etherscan.io"),
    },
    ChainInfo {
        id: 80002,
        name: "Polygon Amoy",
        currency_name: "POL",
        symbol: "POL",
        decimals: 18,
        rpc_url: "https://rpc-amoy.polygon.technology",
        explorer_url: Some("https://amoy.polygonscan.com"),
    },
    ChainInfo {
        id: 31337,
        name: "Localhost",
        currency_name: "Ether",
        symbol: "ETH",
        decimals: 18,
        rpc_url: "http://127.0.0.1:8545",
        explorer_url: None,
    },
];

fn lookup(chain_id: u64) -> Option<&'static ChainInfo> {
    CHAINS.iter().find(|c| c.id == chain_id)
}

/// Human-readable network label. Unmapped ids (including 0) map to
/// [`UNKNOWN_NETWORK`].
pub fn network_name(chain_id: u64) -> &'static str {
    lookup(chain_id).map(|c| c.name).unwrap_or(UNKNOWN_NETWORK)
}

pub fn is_known(chain_id: u64) -> bool {
    lookup(chain_id).is_some()
}

/// `wallet_addEthereumChain` parameters, or `None` for chains the
/// dashboard cannot register.
pub fn add_chain_params(chain_id: u64) -> Option<Value> {
    let chain = lookup(chain_id)?;
    let explorers = match chain.explorer_url {
        Some(url) => json!([url]),
        None => json!([]),
    };
    Some(json!({
        "chainId": chain_id_to_hex(chain.id),
        "chainName": chain.name,
        "nativeCurrency": {
            "name": chain.currency_name,
            "symbol": chain.symbol,
            "decimals": chain.decimals,
        },
        "rpcUrls": [chain.rpc_url],
        "blockExplorerUrls": explorers,
    }))
}

/// Wallet wire format for chain ids ("0x89" for 137).
pub fn chain_id_to_hex(chain_id: u64) -> String {
    format!("{:#x}", chain_id)
}

/// Parse a provider-reported chain id: hex string, decimal string, or number.
pub fn parse_chain_id(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                u64::from_str_radix(hex, 16).ok()
            } else {
                s.parse().ok()
            }
        }
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_networks_resolve() {
        assert_eq!(network_name(1), "Ethereum Mainnet");
        assert_eq!(network_name(137), "Polygon");
        assert_eq!(network_name(80002), "Polygon Amoy");
    }

    #[test]
    fn unmapped_ids_are_unknown() {
        assert_eq!(network_name(0), UNKNOWN_NETWORK);
        assert_eq!(network_name(424242), UNKNOWN_NETWORK);
    }

    #[test]
    fn hex_round_trip() {
        assert_eq!(chain_id_to_hex(137), "0x89");
        assert_eq!(parse_chain_id(&json!("0x89")), Some(137));
        assert_eq!(parse_chain_id(&json!("137")), Some(137));
        assert_eq!(parse_chain_id(&json!(137)), Some(137));
        assert_eq!(parse_chain_id(&json!(null)), None);
        assert_eq!(parse_chain_id(&json!("0xzz")), None);
    }

    #[test]
    fn add_params_shape() {
        let params = add_chain_params(137).expect("params");
        assert_eq!(params["chainId"], "0x89");
        assert_eq!(params["chainName"], "Polygon");
        assert_eq!(params["nativeCurrency"]["decimals"], 18);
        assert_eq!(params["rpcUrls"].as_array().unwrap().len(), 1);

        // Localhost has no explorer
        let local = add_chain_params(31337).expect("params");
        assert!(local["blockExplorerUrls"].as_array().unwrap().is_empty());

        assert!(add_chain_params(424242).is_none());
    }
}
