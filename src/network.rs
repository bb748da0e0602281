//! Network constants for the Arc testnet deployment.

/// Chain ID of the Arc testnet.
pub const ARC_TESTNET_CHAIN_ID: u64 = 5_042_002;

/// Default JSON-RPC endpoint.
pub const DEFAULT_RPC_URL: &str = "https://rpc.testnet.arc.network";

/// Default block explorer.
pub const DEFAULT_EXPLORER_URL: &str = "https://testnet.arcscan.app";
