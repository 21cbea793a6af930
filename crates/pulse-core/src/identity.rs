use crate::error::{PulseError, Result};
use crate::store::RecordStore;
use crate::user::User;
use serde::{Deserialize, Serialize};

/// Identity settings injected into [`IdentityResolver::new`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Subject used when a request carries no verified identity.
    ///
    /// Development convenience only: anyone reaching the server acts as this
    /// subject. Leave unset in production.
    #[serde(default)]
    pub fallback_subject: Option<String>,
}

impl IdentityConfig {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_fallback(subject: impl Into<String>) -> Self {
        Self {
            fallback_subject: Some(subject.into()),
        }
    }
}

/// Maps a verified external subject id to the internal [`User`].
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    config: IdentityConfig,
}

impl IdentityResolver {
    pub fn new(config: IdentityConfig) -> Self {
        Self { config }
    }

    pub fn fallback_enabled(&self) -> bool {
        self.config.fallback_subject.is_some()
    }

    fn effective_subject<'a>(&'a self, subject: Option<&'a str>) -> Result<&'a str> {
        match subject.filter(|s| !s.trim().is_empty()) {
            Some(s) => Ok(s),
            None => match self.config.fallback_subject.as_deref() {
                Some(fallback) => {
                    tracing::warn!(subject = fallback, "no verified identity, using fallback subject");
                    Ok(fallback)
                }
                None => Err(PulseError::Unauthorized),
            },
        }
    }

    /// Look up the user for `subject`. `NotFound` when the subject has never
    /// signed in.
    pub fn resolve(&self, store: &dyn RecordStore, subject: Option<&str>) -> Result<User> {
        let subject = self.effective_subject(subject)?;
        store
            .find_user_by_external_id(subject)?
            .ok_or_else(|| PulseError::UserNotFound(subject.to_string()))
    }

    /// First-sign-in upsert keyed by external id. A new row is seeded with
    /// baseline targets, role `advisor` and team `Test Team`; an existing row
    /// only has its timestamps refreshed.
    pub fn sign_in(
        &self,
        store: &dyn RecordStore,
        subject: Option<&str>,
        display_name: Option<String>,
    ) -> Result<User> {
        let subject = self.effective_subject(subject)?;
        let seeded = User::seeded(subject, display_name);
        let stored = store.upsert_user_by_external_id(&seeded)?;
        if stored.id == seeded.id {
            tracing::info!(user = %stored.id, external_id = subject, "user created on first sign-in");
        } else {
            tracing::debug!(user = %stored.id, "returning user signed in");
        }
        Ok(stored)
    }
}
