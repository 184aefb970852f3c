//! Application state shared across handlers.

use std::sync::Arc;

use axum::extract::FromRef;
use lettre::transport::smtp::Error as SmtpError;
use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::services::analytics::AnalyticsCache;
use crate::services::email::EmailService;
use crate::services::events::EventBus;

/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    analytics_cache: AnalyticsCache,
    events: EventBus,
    email: Option<EmailService>,
}

impl AppState {
    /// # Errors
    ///
    /// Returns an error if SMTP is configured but the relay cannot be set up.
    pub fn new(config: AdminConfig, pool: PgPool) -> Result<Self, SmtpError> {
        let email = config.email.as_ref().map(EmailService::new).transpose()?;
        if email.is_none() {
            tracing::info!("SMTP not configured, low-stock alerts disabled");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                analytics_cache: AnalyticsCache::default(),
                events: EventBus::default(),
                email,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn analytics_cache(&self) -> &AnalyticsCache {
        &self.inner.analytics_cache
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.inner.pool.clone()
    }
}
