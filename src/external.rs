//! External capabilities the engine is given by its environment.
//!
//! The engine is a pure orchestration layer: signing, bundled submission,
//! call encoding, profile reads, and durable storage are all supplied through
//! these traits. The crate ships default implementations where one exists
//! that needs no wallet integration ([`MemoryStore`], [`LocalKeyGenerator`],
//! the encoder in [`crate::program`]); everything else is the host
//! application's job.

use async_trait::async_trait;
use rand::RngCore;
use sha3::{Digest, Keccak256};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{ReadError, SettlementError, StorageError};
use crate::profile::PlayerStats;
use crate::session::Secret;
use crate::shared::{ActionKind, AddressStr};

// ─── Bundled submission ──────────────────────────────────────────────────────

/// One contract call inside a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub target: AddressStr,
    pub data: Vec<u8>,
}

/// Opaque handle for a submitted bundle, used to await settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle(pub String);

impl std::fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Finalized result of a settled bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

/// Bundled-submission service: submits 1..=50 calls as one logical unit and
/// resolves once the bundle is finalized or rejected.
#[async_trait]
pub trait Bundler: Send + Sync {
    async fn submit(&self, calls: &[Call]) -> Result<OperationHandle, SettlementError>;

    async fn await_settlement(
        &self,
        handle: &OperationHandle,
    ) -> Result<SettlementReceipt, SettlementError>;
}

// ─── Call encoding ───────────────────────────────────────────────────────────

/// Pure call encoder. Invoked once per action at submission time, never at
/// enqueue time.
pub trait ActionEncoder: Send + Sync {
    /// Contract the encoded calls are addressed to.
    fn target(&self) -> AddressStr;

    fn encode(
        &self,
        kind: ActionKind,
        note: Option<&str>,
        referrer: Option<&AddressStr>,
    ) -> Vec<u8>;
}

// ─── Profile reads ───────────────────────────────────────────────────────────

/// Authoritative on-chain counters for one identity.
#[async_trait]
pub trait ProfileReader: Send + Sync {
    async fn read(&self, player: &AddressStr) -> Result<PlayerStats, ReadError>;
}

// ─── Durable key-value storage ───────────────────────────────────────────────

/// Durable client-side storage. Used only by the session store, for the
/// credential and the duration preference.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory [`KeyValueStore`]. The default when no platform storage is
/// wired in; sessions then last only as long as the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().expect("store poisoned").get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .expect("store poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().expect("store poisoned").remove(key);
        Ok(())
    }
}

// ─── Key generation ──────────────────────────────────────────────────────────

/// Freshly generated key material for a session credential.
pub struct GeneratedKey {
    pub address: AddressStr,
    pub secret: Secret,
}

/// Session credential generator. The engine treats the output as opaque; a
/// wallet integration should supply a generator backed by its real signer.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self) -> GeneratedKey;
}

/// Default generator: 32 random bytes of secret material, with an address
/// identifier taken from the last 20 bytes of its keccak digest. Suitable
/// wherever the credential only needs to be unique and unguessable — real
/// on-chain delegation needs a signer-backed [`KeyGenerator`].
#[derive(Default)]
pub struct LocalKeyGenerator;

impl KeyGenerator for LocalKeyGenerator {
    fn generate(&self) -> GeneratedKey {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);

        let digest = Keccak256::digest(secret);
        let address = AddressStr::new(format!("0x{}", hex::encode(&digest[12..])));

        GeneratedKey {
            address,
            secret: Secret::new(format!("0x{}", hex::encode(secret))),
        }
    }
}
