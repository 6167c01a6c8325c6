//! Identity-state freshness against the state-transition acceptance window.
//!
//! A proof is generated against the holder's (or issuer's) state at proving
//! time. If the chain has moved on since, the proof is still accepted while
//! the claimed state was replaced no longer than the window ago: block
//! confirmation lags wallet proving. The window edge is inclusive.

use crate::backend::ResolvedState;
use zkauth_types::Timestamp;

/// Default acceptance window for state transitions (5 minutes).
pub const DEFAULT_STATE_TRANSITION_DELAY_SECS: u64 = 300;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freshness {
    /// The claimed state is the latest on-chain state.
    Latest,
    /// Replaced `age_secs` ago, still inside the window.
    WithinWindow { age_secs: u64 },
    /// Replaced `age_secs` ago, outside the window.
    Stale { age_secs: u64 },
}

impl Freshness {
    pub fn is_acceptable(&self) -> bool {
        !matches!(self, Self::Stale { .. })
    }
}

/// Judge the on-chain record of the claimed state. The age is measured
/// from the moment the claimed state was superseded.
pub fn assess(claimed: &ResolvedState, now: Timestamp, window_secs: u64) -> Freshness {
    let Some(replaced_at) = claimed.replaced_at else {
        return Freshness::Latest;
    };
    let age_secs = replaced_at.elapsed_since(now);
    if age_secs <= window_secs {
        Freshness::WithinWindow { age_secs }
    } else {
        Freshness::Stale { age_secs }
    }
}
