use crate::auth::{IdentityProvider, TokenVerifier};
use pulse_core::clock::Clock;
use pulse_core::config::Config;
use pulse_core::identity::IdentityResolver;
use pulse_core::store::RecordStore;
use std::sync::Arc;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub resolver: IdentityResolver,
    pub identity: Arc<dyn IdentityProvider>,
    pub clock: Clock,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        resolver: IdentityResolver,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            store,
            resolver,
            identity,
            clock: Clock::System,
        }
    }

    /// Bearer-token identity and resolver settings taken from `config.auth`.
    pub fn from_config(store: Arc<dyn RecordStore>, config: &Config) -> Self {
        if config.auth.identity().fallback_subject.is_some() {
            tracing::warn!("fallback subject enabled: unauthenticated requests are not rejected");
        }
        Self::new(
            store,
            IdentityResolver::new(config.auth.identity()),
            Arc::new(TokenVerifier::new(&config.auth.token_secret)),
        )
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}
