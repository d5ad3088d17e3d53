//! HTTP route handlers for Dar.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page (offers, rent, sale)
//! GET  /health                    - Liveness check
//! GET  /health/ready              - Readiness check (database)
//!
//! # Browsing
//! GET  /listings                  - All listings, filtered by the search bar
//! GET  /offers                    - Listings on offer
//! GET  /category/{type}           - Rent or sale listings
//! GET  /category/{type}/{id}      - Listing detail
//! GET  /listings/{id}/contact     - Contact the landlord
//! POST /listings/{id}/contact     - Redirect to a prefilled mailto: link
//!
//! # Listing management (requires auth)
//! GET  /create-listing            - New listing form
//! POST /create-listing            - Create listing (multipart)
//! GET  /edit-listing/{id}         - Edit form
//! POST /edit-listing/{id}         - Update listing (multipart)
//! GET  /listings/{id}/delete      - Delete confirmation
//! POST /listings/{id}/delete      - Delete listing
//! GET  /profile                   - Profile and own listings
//! POST /profile                   - Change display name
//!
//! # Auth
//! GET  /sign-in                   - Sign-in page
//! POST /sign-in                   - Sign-in action
//! GET  /sign-up                   - Sign-up page
//! POST /sign-up                   - Sign-up action
//! POST /sign-out                  - Sign-out action
//! GET  /forgot-password           - Request a reset link
//! POST /forgot-password           - Send the reset link
//! GET  /reset-password?token=     - Choose a new password
//! POST /reset-password            - Set the new password
//! ```

pub mod auth;
pub mod contact;
pub mod home;
pub mod listings;
pub mod manage;
pub mod profile;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::middleware::{
    auth_rate_limiter, create_session_layer, request_id_middleware, security_headers_middleware,
    upload_rate_limiter,
};
use crate::services::images::{MAX_IMAGE_BYTES, MAX_IMAGES};
use crate::state::AppState;

/// Directory holding the compiled stylesheet and other static assets.
const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Room for every image at the size limit plus the text fields.
const LISTING_BODY_LIMIT: usize = MAX_IMAGES * MAX_IMAGE_BYTES + 1024 * 1024;

// =============================================================================
// Notices
// =============================================================================

/// `?error=` / `?success=` codes set by redirects.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

impl MessageQuery {
    /// Text for the `error` code, if any.
    #[must_use]
    pub fn error_notice(&self) -> Option<&'static str> {
        self.error.as_deref().map(notice_text)
    }

    /// Text for the `success` code, if any.
    #[must_use]
    pub fn success_notice(&self) -> Option<&'static str> {
        self.success.as_deref().map(notice_text)
    }
}

/// User-facing text for a notice code.
#[must_use]
pub fn notice_text(code: &str) -> &'static str {
    match code {
        "credentials" => "Invalid credentials",
        "email_taken" => "An account with this email already exists",
        "invalid_email" => "Please enter a valid email address",
        "invalid_name" => "Please enter a name of at most 64 characters",
        "password_too_short" => "Password must be at least 8 characters",
        "password_mismatch" => "Passwords do not match",
        "invalid_reset_link" => "This reset link is invalid or has expired",
        "email_sent" => "If an account exists for that email, a reset link is on its way",
        "password_reset" => "Your password has been changed",
        "profile_updated" => "Profile details updated",
        "listing_deleted" => "Successfully deleted the listing",
        "empty_message" => "Please write a message to the landlord",
        "no_landlord" => "Could not get landlord data",
        _ => "Something went wrong, please try again",
    }
}

// =============================================================================
// Select Options
// =============================================================================

/// One `<option>` of a rendered `<select>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    /// Build options from `(value, label)` pairs, marking `current` selected.
    pub fn list<'a>(
        choices: impl IntoIterator<Item = (&'a str, &'a str)>,
        current: &str,
    ) -> Vec<Self> {
        choices
            .into_iter()
            .map(|(value, label)| Self {
                value: value.to_string(),
                label: label.to_string(),
                selected: value.eq_ignore_ascii_case(current),
            })
            .collect()
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Listing browsing and contact routes.
pub fn browse_routes() -> Router<AppState> {
    Router::new()
        .route("/listings", get(listings::index))
        .route("/offers", get(listings::offers))
        .route("/category/{type}", get(listings::category))
        .route("/category/{type}/{id}", get(listings::show))
        .route(
            "/listings/{id}/contact",
            get(contact::contact_page).post(contact::contact),
        )
}

/// Listing create and edit routes, which accept image uploads.
///
/// Only the form posts are rate limited.
pub fn manage_routes() -> Router<AppState> {
    let limiter = upload_rate_limiter();
    Router::new()
        .route(
            "/create-listing",
            get(manage::create_page).merge(post(manage::create).layer(limiter.clone())),
        )
        .route(
            "/edit-listing/{id}",
            get(manage::edit_page).merge(post(manage::update).layer(limiter)),
        )
        .layer(DefaultBodyLimit::max(LISTING_BODY_LIMIT))
}

/// Profile and listing deletion routes.
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile::show).post(profile::update))
        .route(
            "/listings/{id}/delete",
            get(manage::delete_page).post(manage::delete),
        )
}

/// Sign-in, sign-up and password reset routes.
///
/// Only the form posts are rate limited.
pub fn auth_routes() -> Router<AppState> {
    let limiter = auth_rate_limiter();
    Router::new()
        .route(
            "/sign-in",
            get(auth::sign_in_page).merge(post(auth::sign_in).layer(limiter.clone())),
        )
        .route(
            "/sign-up",
            get(auth::sign_up_page).merge(post(auth::sign_up).layer(limiter.clone())),
        )
        .route(
            "/forgot-password",
            get(auth::forgot_password_page)
                .merge(post(auth::forgot_password).layer(limiter.clone())),
        )
        .route(
            "/reset-password",
            get(auth::reset_password_page).merge(post(auth::reset_password).layer(limiter)),
        )
        .route("/sign-out", post(auth::sign_out))
}

/// Create all page routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .merge(browse_routes())
        .merge(manage_routes())
        .merge(profile_routes())
        .merge(auth_routes())
}

/// Build the complete application: pages, health checks, static files,
/// sessions and the middleware stack.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.pool(), state.config());

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR));

    if let Some(dir) = state.images().local_dir() {
        router = router.nest_service("/uploads", ServeDir::new(dir));
    }

    router
        .layer(session_layer)
        .layer(from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_notices() {
        let query = MessageQuery {
            error: Some("credentials".to_string()),
            success: None,
        };
        assert_eq!(query.error_notice(), Some("Invalid credentials"));
        assert_eq!(query.success_notice(), None);
        assert_eq!(
            notice_text("<script>"),
            "Something went wrong, please try again"
        );
    }

    #[test]
    fn test_select_options() {
        let options = SelectOption::list([("rent", "Rent"), ("sale", "Sale")], "SALE");
        assert!(!options[0].selected);
        assert!(options[1].selected);
        assert_eq!(options[1].label, "Sale");
    }
}
