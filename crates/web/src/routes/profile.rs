//! Profile route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::db::ListingRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireAuth, auth::SIGN_IN_PATH, clear_current_user, set_current_user};
use crate::models::{CurrentUser, Listing, User};
use crate::routes::MessageQuery;
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

/// Profile form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub name: String,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub current_user: Option<CurrentUser>,
    pub user: User,
    pub listings: Vec<Listing>,
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
}

/// Show the user's details and their listings, newest first.
#[instrument(skip(state, session, current, query), fields(user_id = %current.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<Response, AppError> {
    let user = match AuthService::new(state.pool()).get_user(current.id).await {
        Ok(user) => user,
        Err(AuthError::UserNotFound) => {
            tracing::warn!("Session refers to a deleted user");
            clear_current_user(&session).await?;
            return Ok(Redirect::to(SIGN_IN_PATH).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let listings = ListingRepository::new(state.pool())
        .list_by_owner(user.id)
        .await?;

    Ok(ProfileTemplate {
        current_user: Some(current),
        user,
        listings,
        error: query.error_notice(),
        success: query.success_notice(),
    }
    .into_response())
}

/// Change the display name.
#[instrument(skip(state, session, current, form), fields(user_id = %current.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect, AppError> {
    let user = match AuthService::new(state.pool())
        .update_name(current.id, &form.name)
        .await
    {
        Ok(user) => user,
        Err(e @ AuthError::InvalidName(_)) => {
            return Ok(Redirect::to(&format!("/profile?error={}", e.code())));
        }
        Err(e) => return Err(e.into()),
    };

    set_current_user(&session, &CurrentUser::from(&user)).await?;
    Ok(Redirect::to("/profile?success=profile_updated"))
}
