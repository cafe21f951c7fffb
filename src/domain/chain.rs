//! Static catalog of supported chains

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Connection parameters for one supported chain.
///
/// Defined once at startup and never mutated; the full descriptor is what
/// gets handed to the wallet when it does not know the chain yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    /// Numeric chain id (unique key)
    pub id: u64,
    /// Display name
    pub name: String,
    /// Native currency symbol (e.g., "ETH", "MATIC")
    pub symbol: String,
    /// Native currency decimals (18 for every chain we ship)
    pub decimals: u8,
    /// Default JSON-RPC endpoint
    pub rpc_url: String,
    /// Block explorer base URL, if the chain has one
    pub explorer_url: Option<String>,
}

/// Catalog of chains the application supports, keyed by chain id.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<u64, ChainDescriptor>,
}

impl ChainRegistry {
    /// Empty registry (mainly for tests)
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in catalog
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for chain in builtin_chains() {
            registry.insert(chain);
        }
        registry
    }

    /// Insert or replace a descriptor (config-defined chains override built-ins)
    pub fn insert(&mut self, chain: ChainDescriptor) {
        self.chains.insert(chain.id, chain);
    }

    pub fn get(&self, chain_id: u64) -> Option<&ChainDescriptor> {
        self.chains.get(&chain_id)
    }

    pub fn contains(&self, chain_id: u64) -> bool {
        self.chains.contains_key(&chain_id)
    }

    /// All descriptors, ordered by chain id
    pub fn iter(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.values()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Display name for a chain id, falling back to the bare number
    pub fn display_name(&self, chain_id: u64) -> String {
        self.get(chain_id)
            .map(|chain| chain.name.clone())
            .unwrap_or_else(|| format!("chain {chain_id}"))
    }
}

fn descriptor(
    id: u64,
    name: &str,
    symbol: &str,
    rpc_url: &str,
    explorer_url: Option<&str>,
) -> ChainDescriptor {
    ChainDescriptor {
        id,
        name: name.to_string(),
        symbol: symbol.to_string(),
        decimals: 18,
        rpc_url: rpc_url.to_string(),
        explorer_url: explorer_url.map(str::to_string),
    }
}

fn builtin_chains() -> Vec<ChainDescriptor> {
    vec![
        descriptor(
            1,
            "Ethereum",
            "ETH",
            "https://eth.merkle.io",
            Some("https://etherscan.io"),
        ),
        descriptor(
            11155111,
            "Sepolia",
            "ETH",
            "https://sepolia.drpc.org",
            Some("https://sepolia.etherscan.io"),
        ),
        descriptor(
            137,
            "Polygon",
            "MATIC",
            "https://polygon-rpc.com",
            Some("https://polygonscan.com"),
        ),
        descriptor(
            80001,
            "Polygon Mumbai",
            "MATIC",
            "https://rpc.ankr.com/polygon_mumbai",
            Some("https://mumbai.polygonscan.com"),
        ),
        descriptor(
            42161,
            "Arbitrum One",
            "ETH",
            "https://arb1.arbitrum.io/rpc",
            Some("https://arbiscan.io"),
        ),
        descriptor(
            421614,
            "Arbitrum Sepolia",
            "ETH",
            "https://sepolia-rollup.arbitrum.io/rpc",
            Some("https://sepolia.arbiscan.io"),
        ),
        descriptor(
            10,
            "OP Mainnet",
            "ETH",
            "https://mainnet.optimism.io",
            Some("https://optimistic.etherscan.io"),
        ),
        descriptor(
            11155420,
            "OP Sepolia",
            "ETH",
            "https://sepolia.optimism.io",
            Some("https://sepolia-optimism.etherscan.io"),
        ),
        descriptor(
            8453,
            "Base",
            "ETH",
            "https://mainnet.base.org",
            Some("https://basescan.org"),
        ),
        descriptor(
            84532,
            "Base Sepolia",
            "ETH",
            "https://sepolia.base.org",
            Some("https://sepolia.basescan.org"),
        ),
        descriptor(
            7777777,
            "Zora",
            "ETH",
            "https://rpc.zora.energy",
            Some("https://explorer.zora.energy"),
        ),
        descriptor(
            999999999,
            "Zora Sepolia",
            "ETH",
            "https://sepolia.rpc.zora.energy",
            Some("https://sepolia.explorer.zora.energy"),
        ),
        descriptor(31337, "Localhost", "ETH", "http://127.0.0.1:8545", None),
    ]
}
