//! Contact-the-landlord route handlers.
//!
//! There is no messaging system: the form turns into a prefilled `mailto:`
//! link to the owner's address.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use dar_core::{Email, ListingId};

use crate::db::{ListingRepository, UserRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{CurrentUser, Listing, User};
use crate::routes::{MessageQuery, notice_text};
use crate::state::AppState;

/// Contact form data.
#[derive(Debug, Deserialize)]
pub struct ContactForm {
    pub message: String,
}

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub current_user: Option<CurrentUser>,
    pub listing: Listing,
    /// `None` when the owner's account no longer exists.
    pub landlord: Option<User>,
    pub error: Option<&'static str>,
}

/// Build a `mailto:` URL with an encoded address, subject and body.
///
/// Both sides of the `@` are percent-encoded (RFC 6068), so addresses with
/// non-ASCII characters, `?` or `&` stay one recipient and a valid header.
#[must_use]
pub fn mailto_url(to: &Email, subject: &str, body: &str) -> String {
    let (local, domain) = to.as_str().rsplit_once('@').unwrap_or((to.as_str(), ""));
    format!(
        "mailto:{}@{}?subject={}&body={}",
        urlencoding::encode(local),
        urlencoding::encode(domain),
        urlencoding::encode(subject),
        urlencoding::encode(body)
    )
}

async fn load_listing(state: &AppState, id: i32) -> Result<Listing, AppError> {
    ListingRepository::new(state.pool())
        .get(ListingId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Listing".to_string()))
}

/// Show the contact form with the landlord's name.
///
/// Owners are sent back to their listing.
#[instrument(skip(state, current_user, query))]
pub async fn contact_page(
    State(state): State<AppState>,
    OptionalAuth(current_user): OptionalAuth,
    Path(id): Path<i32>,
    Query(query): Query<MessageQuery>,
) -> Result<Response, AppError> {
    let listing = load_listing(&state, id).await?;

    if current_user
        .as_ref()
        .is_some_and(|user| listing.is_owned_by(user.id))
    {
        return Ok(Redirect::to(&listing.detail_path()).into_response());
    }

    let landlord = UserRepository::new(state.pool())
        .get_by_id(listing.owner_id)
        .await?;
    let error = if landlord.is_none() {
        Some(notice_text("no_landlord"))
    } else {
        query.error_notice()
    };

    Ok(ContactTemplate {
        current_user,
        listing,
        landlord,
        error,
    }
    .into_response())
}

/// Redirect to a `mailto:` link addressed to the landlord.
#[instrument(skip(state, form))]
pub async fn contact(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<ContactForm>,
) -> Result<Redirect, AppError> {
    let listing = load_listing(&state, id).await?;

    let message = form.message.trim();
    if message.is_empty() {
        return Ok(Redirect::to(&format!(
            "/listings/{id}/contact?error=empty_message"
        )));
    }

    let Some(landlord) = UserRepository::new(state.pool())
        .get_by_id(listing.owner_id)
        .await?
    else {
        return Ok(Redirect::to(&format!(
            "/listings/{id}/contact?error=no_landlord"
        )));
    };

    tracing::info!(listing_id = %listing.id, "Contact link issued");
    Ok(Redirect::to(&mailto_url(
        &landlord.email,
        &listing.name,
        message,
    )))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mailto_url_encodes_subject_and_body() {
        let to = Email::parse("owner@example.com").unwrap();
        let url = mailto_url(&to, "Villa & pool", "Is it free?\nThanks");
        assert_eq!(
            url,
            "mailto:owner@example.com?subject=Villa%20%26%20pool&body=Is%20it%20free%3F%0AThanks"
        );
    }

    #[test]
    fn test_mailto_url_percent_encodes_utf8() {
        let to = Email::parse("owner@example.com").unwrap();
        let url = mailto_url(&to, "Riad à Fès", "Bonjour");
        assert!(url.contains("subject=Riad%20%C3%A0%20F%C3%A8s"));
    }

    #[test]
    fn test_mailto_url_encodes_non_ascii_address() {
        let to = Email::parse("amína@example.ma").unwrap();
        let url = mailto_url(&to, "Riad", "Salam");

        assert!(url.starts_with("mailto:am%C3%ADna@example.ma?subject="));
        assert!(url.is_ascii());
        let response = Redirect::to(&url).into_response();
        assert_eq!(response.headers()["location"], url.as_str());
    }

    #[test]
    fn test_mailto_url_keeps_query_characters_in_the_address() {
        let to = Email::parse("a?cc=x@example.ma").unwrap();
        let url = mailto_url(&to, "Riad", "Salam");

        assert_eq!(
            url,
            "mailto:a%3Fcc%3Dx@example.ma?subject=Riad&body=Salam"
        );
    }
}
