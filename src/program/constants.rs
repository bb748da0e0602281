//! Constants for the BreakPoint game contract ABI.

use sha3::{Digest, Keccak256};

/// ABI word size in bytes.
pub const WORD: usize = 32;

/// Number of counters in the `PlayerStats` tuple.
pub const PLAYER_STATS_FIELDS: usize = 9;

lazy_static::lazy_static! {
    /// Selector for `performAction(uint8,bytes,address)`.
    pub static ref PERFORM_ACTION_SELECTOR: [u8; 4] =
        selector("performAction(uint8,bytes,address)");

    /// Selector for `getPlayerStats(address)`.
    pub static ref GET_PLAYER_STATS_SELECTOR: [u8; 4] =
        selector("getPlayerStats(address)");
}

/// First four bytes of the keccak-256 hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}
