//! Nullable chain state.

use crate::lock;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use zkauth_types::{Did, Timestamp};
use zkauth_verification::backend::{ResolveError, ResolvedState, StateResolver};

/// Per-identity state history, oldest first, set by the test.
#[derive(Default)]
pub struct NullStateResolver {
    histories: Mutex<HashMap<String, Vec<ResolvedState>>>,
    failures: Mutex<VecDeque<ResolveError>>,
    lookups: Mutex<Vec<(String, String)>>,
}

impl NullStateResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `state` as the latest state of `did` at `published_at`. The
    /// previous latest state is marked replaced at the same moment.
    pub fn set_state(&self, did: &str, state: &str, published_at: u64) {
        let at = Timestamp::new(published_at);
        let mut histories = lock(&self.histories);
        let history = histories.entry(did.to_string()).or_default();
        if let Some(previous) = history.last_mut() {
            previous.replaced_at = Some(at);
        }
        history.push(ResolvedState {
            state: state.to_string(),
            published_at: at,
            replaced_at: None,
        });
    }

    pub fn fail_next(&self, error: ResolveError) {
        lock(&self.failures).push_back(error);
    }

    /// `(network, did)` pairs resolved so far.
    pub fn lookups(&self) -> Vec<(String, String)> {
        lock(&self.lookups).clone()
    }
}

#[async_trait]
impl StateResolver for NullStateResolver {
    async fn resolve(
        &self,
        network: &str,
        _contract_address: &str,
        did: &Did,
        state: &str,
    ) -> Result<ResolvedState, ResolveError> {
        lock(&self.lookups).push((network.to_string(), did.to_string()));
        if let Some(error) = lock(&self.failures).pop_front() {
            return Err(error);
        }
        let histories = lock(&self.histories);
        let history = histories
            .get(did.as_str())
            .ok_or_else(|| ResolveError::Unresolvable(did.to_string()))?;
        history
            .iter()
            .find(|record| record.state == state)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownState {
                did: did.to_string(),
                state: state.to_string(),
            })
    }
}
