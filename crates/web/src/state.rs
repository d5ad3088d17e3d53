//! Application state shared across handlers.

use std::sync::Arc;

use axum::http::HeaderValue;
use sqlx::PgPool;

use crate::config::DarConfig;
use crate::middleware::content_security_policy;
use crate::services::{EmailService, Geocoder, HomeCache, ImageStore};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid SMTP configuration: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("invalid content security policy: {0}")]
    Csp(#[from] axum::http::header::InvalidHeaderValue),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: DarConfig,
    pool: PgPool,
    images: ImageStore,
    geocoder: Option<Geocoder>,
    email: Option<EmailService>,
    home_cache: HomeCache,
    csp_header: HeaderValue,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay or CSP header cannot be built.
    pub fn new(config: DarConfig, pool: PgPool) -> Result<Self, StateError> {
        let images = ImageStore::from_config(&config.images);
        let geocoder = config.geocode_api_key.clone().map(Geocoder::new);
        let email = config.email.as_ref().map(EmailService::new).transpose()?;
        let csp_header =
            HeaderValue::from_str(&content_security_policy(config.images.image_origin()))?;

        if geocoder.is_none() {
            tracing::info!("GEOCODE_API_KEY not set, listings use manual coordinates");
        }
        if email.is_none() {
            tracing::warn!("SMTP_HOST not set, password reset emails will not be sent");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                images,
                geocoder,
                email,
                home_cache: HomeCache::new(),
                csp_header,
            }),
        })
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &DarConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Listing image storage.
    #[must_use]
    pub fn images(&self) -> &ImageStore {
        &self.inner.images
    }

    /// Address geocoder, when an API key is configured.
    #[must_use]
    pub fn geocoder(&self) -> Option<&Geocoder> {
        self.inner.geocoder.as_ref()
    }

    /// Outgoing mail, when SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// Cache of the home page sections.
    #[must_use]
    pub fn home_cache(&self) -> &HomeCache {
        &self.inner.home_cache
    }

    /// Precomputed `Content-Security-Policy` value.
    #[must_use]
    pub fn csp_header(&self) -> &HeaderValue {
        &self.inner.csp_header
    }
}
