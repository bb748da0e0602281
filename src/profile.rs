//! Player profile — authoritative on-chain counters and the refresher that
//! republishes them after settlement.

use serde::{Deserialize, Serialize};

use crate::engine::ActionEngine;

/// On-chain counters for one player, as returned by the game contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub xp: u128,
    pub total_actions: u128,
    pub dodges: u128,
    pub scans: u128,
    pub boosts: u128,
    pub claims: u128,
    pub referral_xp: u128,
    pub total_claimed_xp: u128,
    pub last_action_block: u128,
}

/// Sub-component for profile reads. Both submission paths call
/// [`Profile::refresh`] on settlement.
pub struct Profile<'a> {
    pub(crate) engine: &'a ActionEngine,
}

impl Profile<'_> {
    /// Pull current stats from the read interface and republish them into
    /// the engine's shared profile slot.
    ///
    /// Read failures are logged and swallowed — a stale profile is preferred
    /// over surfacing a read error mid-interaction.
    pub async fn refresh(&self) {
        match self.engine.reader.read(&self.engine.identity).await {
            Ok(stats) => {
                tracing::debug!(total_actions = %stats.total_actions, "player stats refreshed");
                *self.engine.profile.write().await = Some(stats);
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to refresh player stats");
            }
        }
    }

    /// Last successfully published stats, if any.
    pub async fn current(&self) -> Option<PlayerStats> {
        self.engine.profile.read().await.clone()
    }
}
