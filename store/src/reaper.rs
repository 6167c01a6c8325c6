//! Background TTL eviction.

use crate::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use zkauth_types::Clock;

/// Periodically drops sessions older than `ttl_secs`.
pub struct SessionReaper {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    ttl_secs: u64,
    every: Duration,
}

impl SessionReaper {
    pub fn new(
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        ttl_secs: u64,
        every: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            ttl_secs,
            every,
        }
    }

    /// One sweep. Returns the number of sessions evicted.
    pub async fn sweep(&self) -> usize {
        let evicted = self.store.reap(self.clock.now(), self.ttl_secs).await;
        if evicted > 0 {
            let remaining = self.store.len().await;
            tracing::debug!(evicted, remaining, "reaped expired sessions");
        }
        evicted
    }

    /// Sweep every `every` until `shutdown` fires.
    pub fn spawn(self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep().await;
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("session reaper stopped");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySessionStore;
    use std::sync::atomic::{AtomicU64, Ordering};
    use zkauth_types::{AuthorizationRequest, AuthorizationRequestBody, SessionId, Timestamp};

    struct FixedClock(AtomicU64);

    impl Clock for FixedClock {
        fn now(&self) -> Timestamp {
            Timestamp::new(self.0.load(Ordering::SeqCst))
        }
    }

    fn challenge() -> AuthorizationRequest {
        AuthorizationRequest {
            id: "t".into(),
            thid: "t".into(),
            typ: zkauth_types::message::MEDIA_TYPE_PLAIN.into(),
            message_type: zkauth_types::message::AUTH_REQUEST_TYPE.into(),
            from: "did:example:verifier".into(),
            body: AuthorizationRequestBody {
                callback_url: "https://verifier.example/api/callback".into(),
                reason: "login".into(),
                message: None,
                scope: vec![],
            },
        }
    }

    #[tokio::test]
    async fn sweep_uses_the_injected_clock() {
        let store = Arc::new(MemorySessionStore::new());
        let id = SessionId::parse("reap-me").unwrap();
        store.put(id.clone(), challenge(), Timestamp::new(1_000)).await.unwrap();

        let clock = Arc::new(FixedClock(AtomicU64::new(1_100)));
        let reaper = SessionReaper::new(store.clone(), clock.clone(), 300, Duration::from_secs(60));
        assert_eq!(reaper.sweep().await, 0);

        clock.0.store(1_301, Ordering::SeqCst);
        assert_eq!(reaper.sweep().await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_reaper_stops_on_shutdown() {
        let store = Arc::new(MemorySessionStore::new());
        let clock = Arc::new(FixedClock(AtomicU64::new(0)));
        let reaper = SessionReaper::new(store, clock, 300, Duration::from_secs(1));

        let (tx, rx) = broadcast::channel(1);
        let handle = reaper.spawn(rx);
        tokio::time::sleep(Duration::from_secs(3)).await;
        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
