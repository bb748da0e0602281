//! ABI call encoding for the game contract, and decoding of its
//! `PlayerStats` return tuple.

use crate::error::ReadError;
use crate::external::ActionEncoder;
use crate::profile::PlayerStats;
use crate::shared::{note_to_metadata, ActionKind, AddressStr};

use super::constants::{
    GET_PLAYER_STATS_SELECTOR, PERFORM_ACTION_SELECTOR, PLAYER_STATS_FIELDS, WORD,
};

/// Encode `performAction(uint8 action, bytes metadata, address referrer)`.
pub fn encode_perform_action(kind: ActionKind, metadata: &[u8], referrer: [u8; 20]) -> Vec<u8> {
    let padded_len = metadata.len().div_ceil(WORD) * WORD;
    let mut data = Vec::with_capacity(4 + 4 * WORD + padded_len);

    data.extend_from_slice(&*PERFORM_ACTION_SELECTOR);
    data.extend_from_slice(&uint_word(u128::from(kind.as_u8())));
    // offset to the dynamic `bytes` argument: three head words
    data.extend_from_slice(&uint_word(3 * WORD as u128));
    data.extend_from_slice(&address_word(referrer));

    data.extend_from_slice(&uint_word(metadata.len() as u128));
    data.extend_from_slice(metadata);
    data.resize(data.len() + (padded_len - metadata.len()), 0);

    data
}

/// Encode `getPlayerStats(address player)`.
pub fn encode_get_player_stats(player: [u8; 20]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + WORD);
    data.extend_from_slice(&*GET_PLAYER_STATS_SELECTOR);
    data.extend_from_slice(&address_word(player));
    data
}

/// Decode the `PlayerStats` tuple: nine packed `uint256` words.
pub fn decode_player_stats(data: &[u8]) -> Result<PlayerStats, ReadError> {
    if data.len() != PLAYER_STATS_FIELDS * WORD {
        return Err(ReadError(format!(
            "player stats payload is {} bytes, expected {}",
            data.len(),
            PLAYER_STATS_FIELDS * WORD
        )));
    }

    let mut fields = [0u128; PLAYER_STATS_FIELDS];
    for (i, field) in fields.iter_mut().enumerate() {
        *field = decode_uint_word(&data[i * WORD..(i + 1) * WORD])?;
    }

    Ok(PlayerStats {
        xp: fields[0],
        total_actions: fields[1],
        dodges: fields[2],
        scans: fields[3],
        boosts: fields[4],
        claims: fields[5],
        referral_xp: fields[6],
        total_claimed_xp: fields[7],
        last_action_block: fields[8],
    })
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn address_word(address: [u8; 20]) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 20..].copy_from_slice(&address);
    word
}

fn decode_uint_word(word: &[u8]) -> Result<u128, ReadError> {
    if word[..WORD - 16].iter().any(|b| *b != 0) {
        return Err(ReadError("counter exceeds u128 range".into()));
    }
    let mut raw = [0u8; 16];
    raw.copy_from_slice(&word[WORD - 16..]);
    Ok(u128::from_be_bytes(raw))
}

// ─── GameCallEncoder ─────────────────────────────────────────────────────────

/// Default [`ActionEncoder`] for the game contract.
pub struct GameCallEncoder {
    target: AddressStr,
}

impl GameCallEncoder {
    pub fn new(target: AddressStr) -> Self {
        Self { target }
    }

    fn referrer_bytes(referrer: Option<&AddressStr>) -> [u8; 20] {
        match referrer {
            None => [0u8; 20],
            Some(addr) => addr.to_bytes().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "malformed referrer address, using zero");
                [0u8; 20]
            }),
        }
    }
}

impl ActionEncoder for GameCallEncoder {
    fn target(&self) -> AddressStr {
        self.target.clone()
    }

    fn encode(
        &self,
        kind: ActionKind,
        note: Option<&str>,
        referrer: Option<&AddressStr>,
    ) -> Vec<u8> {
        let metadata = note_to_metadata(note);
        encode_perform_action(kind, &metadata, Self::referrer_bytes(referrer))
    }
}
