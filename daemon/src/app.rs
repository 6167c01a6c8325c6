//! Wiring: turns a [`ServerConfig`] into a running server.

use crate::config::ServerConfig;
use anyhow::Context;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use zkauth_clients::{FsKeyLoader, HttpDocumentFetcher, HttpProofEngine, HttpStateResolver};
use zkauth_rpc::{router, AppState, RpcServer};
use zkauth_store::{MemorySessionStore, SessionReaper, SessionStore};
use zkauth_types::{Clock, SystemClock};
use zkauth_utils::ShutdownController;
use zkauth_verification::{ChallengeBuilder, ProtocolVerifier, ResponseHandler, StatusQuery};

pub struct App {
    pub router: Router,
    pub store: Arc<dyn SessionStore>,
    pub clock: Arc<dyn Clock>,
}

impl App {
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn SessionStore> =
            Arc::new(MemorySessionStore::with_capacity(config.max_sessions));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        if !config.key_dir.is_dir() {
            tracing::warn!(
                key_dir = %config.key_dir.display(),
                "key directory missing; every verification will fail with KeyNotFound"
            );
        }

        let mut verifier = ProtocolVerifier::new(
            Arc::new(FsKeyLoader::new(config.key_dir.clone())),
            Arc::new(HttpDocumentFetcher::new(&config.ipfs_gateway, &config.http)?),
            Arc::new(HttpProofEngine::new(&config.proof_engine_url, &config.http)?),
            clock.clone(),
            config.verifier.clone(),
        );
        for r in &config.resolvers {
            tracing::info!(
                network = %r.network,
                contract = %r.contract_address,
                "state resolver registered"
            );
            verifier = verifier.with_resolver(
                r.network.clone(),
                r.contract_address.clone(),
                Arc::new(HttpStateResolver::new(&r.endpoint, &config.http)?),
            );
        }

        let challenges = ChallengeBuilder::new(
            store.clone(),
            config.sign_in_policy(),
            config.reissue,
            clock.clone(),
        )
        .context("invalid sign-in policy")?;

        let state = AppState {
            store: store.clone(),
            challenges: Arc::new(challenges),
            responses: ResponseHandler::new(store.clone(), Arc::new(verifier), clock.clone()),
            status: StatusQuery::new(store.clone()),
            allow_client_session_ids: config.rpc.allow_client_session_ids,
        };

        Ok(Self {
            router: router(state, &config.rpc),
            store,
            clock,
        })
    }

    /// Serve until `shutdown` fires. The reaper stops with the server.
    pub async fn run(
        self,
        config: &ServerConfig,
        shutdown: ShutdownController,
    ) -> anyhow::Result<()> {
        let stop = shutdown.signalled();
        let reaper = SessionReaper::new(
            self.store.clone(),
            self.clock.clone(),
            config.session_ttl_secs,
            Duration::from_secs(config.reap_interval_secs.max(1)),
        )
        .spawn(shutdown.subscribe());

        let server = RpcServer::bind(&config.listen_addr, self.router)
            .await
            .with_context(|| format!("cannot bind {}", config.listen_addr))?;
        tracing::info!(
            addr = %server.local_addr()?,
            callback = %config.callback_url(),
            "zkauth listening"
        );

        let result = server.serve(stop).await;
        shutdown.shutdown();
        if let Err(e) = reaper.await {
            tracing::warn!(error = %e, "session reaper task failed");
        }
        result.context("server error")
    }
}
