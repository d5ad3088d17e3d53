//! Authentication route handlers.
//!
//! Handles sign-in, sign-up, sign-out and password reset with local
//! accounts (argon2 password hashes, `PostgreSQL` sessions).

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

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::routes::{MessageQuery, notice_text};
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Sign-in form data.
#[derive(Debug, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

/// Sign-up form data.
#[derive(Debug, Deserialize)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub token: String,
    pub password: String,
    pub password_confirm: String,
}

/// Query parameters of the reset link.
#[derive(Debug, Deserialize)]
pub struct ResetQuery {
    pub token: Option<String>,
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Sign-in page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/sign_in.html")]
pub struct SignInTemplate {
    pub current_user: Option<CurrentUser>,
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
}

/// Sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/sign_up.html")]
pub struct SignUpTemplate {
    pub current_user: Option<CurrentUser>,
    pub error: Option<&'static str>,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub current_user: Option<CurrentUser>,
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub current_user: Option<CurrentUser>,
    pub token: String,
    pub error: Option<&'static str>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Put the user in the session and tag Sentry events with them.
async fn sign_in_user(session: &Session, user: &User) -> Result<(), AppError> {
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Redirect back to a form with the error's code, or fail for server errors.
fn auth_redirect(path: &str, err: AuthError) -> Result<Response, AppError> {
    match err {
        AuthError::Repository(_) | AuthError::PasswordHash => Err(err.into()),
        err => {
            tracing::debug!(error = %err, "Auth form rejected");
            Ok(Redirect::to(&format!("{path}?error={}", err.code())).into_response())
        }
    }
}

// =============================================================================
// Sign In / Sign Up / Sign Out
// =============================================================================

/// Display the sign-in page. Signed-in users go home.
pub async fn sign_in_page(
    OptionalAuth(current_user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    if current_user.is_some() {
        return Redirect::to("/").into_response();
    }
    SignInTemplate {
        current_user,
        error: query.error_notice(),
        success: query.success_notice(),
    }
    .into_response()
}

/// Handle sign-in form submission.
#[instrument(skip(state, session, form))]
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignInForm>,
) -> Result<Response, AppError> {
    match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            sign_in_user(&session, &user).await?;
            tracing::info!(user_id = %user.id, "User signed in");
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => auth_redirect("/sign-in", e),
    }
}

/// Display the sign-up page. Signed-in users go home.
pub async fn sign_up_page(
    OptionalAuth(current_user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    if current_user.is_some() {
        return Redirect::to("/").into_response();
    }
    SignUpTemplate {
        current_user,
        error: query.error_notice(),
    }
    .into_response()
}

/// Handle sign-up form submission.
#[instrument(skip(state, session, form))]
pub async fn sign_up(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignUpForm>,
) -> Result<Response, AppError> {
    match AuthService::new(state.pool())
        .register(&form.name, &form.email, &form.password)
        .await
    {
        Ok(user) => {
            sign_in_user(&session, &user).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => auth_redirect("/sign-up", e),
    }
}

/// Sign out and return home.
pub async fn sign_out(session: Session) -> Result<Redirect, AppError> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}

// =============================================================================
// Password Reset
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(
    OptionalAuth(current_user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    ForgotPasswordTemplate {
        current_user,
        error: query.error_notice(),
        success: query.success_notice(),
    }
}

/// Handle forgot password form submission.
///
/// Always reports success, whether or not the account exists.
#[instrument(skip(state, form))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Form(form): Form<ForgotPasswordForm>,
) -> Redirect {
    match AuthService::new(state.pool())
        .create_reset_token(&form.email)
        .await
    {
        Ok(Some((user, token))) => {
            let reset_url = reset_link(&state.config().base_url, &token);
            match state.email() {
                Some(email) => {
                    if let Err(e) = email
                        .send_password_reset(&user.email, &user.name, &reset_url)
                        .await
                    {
                        tracing::error!(error = %e, user_id = %user.id, "Failed to send reset email");
                    }
                }
                None => {
                    tracing::warn!(user_id = %user.id, "SMTP not configured, reset email not sent");
                }
            }
        }
        Ok(None) => {}
        Err(e) => tracing::error!(error = %e, "Password reset request failed"),
    }

    Redirect::to("/forgot-password?success=email_sent")
}

/// Absolute reset link for the email.
fn reset_link(base_url: &str, token: &str) -> String {
    format!(
        "{}/reset-password?token={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(token)
    )
}

/// Display the reset password page for a usable token.
pub async fn reset_password_page(
    State(state): State<AppState>,
    OptionalAuth(current_user): OptionalAuth,
    Query(query): Query<ResetQuery>,
) -> Result<Response, AppError> {
    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        return Ok(Redirect::to("/forgot-password?error=invalid_reset_link").into_response());
    };

    if !AuthService::new(state.pool())
        .is_reset_token_valid(&token)
        .await?
    {
        return Ok(Redirect::to("/forgot-password?error=invalid_reset_link").into_response());
    }

    Ok(ResetPasswordTemplate {
        current_user,
        token,
        error: query.error.as_deref().map(notice_text),
    }
    .into_response())
}

/// Handle reset password form submission and sign the user in.
#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response, AppError> {
    match AuthService::new(state.pool())
        .reset_password(&form.token, &form.password, &form.password_confirm)
        .await
    {
        Ok(user) => {
            sign_in_user(&session, &user).await?;
            Ok(Redirect::to("/profile?success=password_reset").into_response())
        }
        Err(AuthError::InvalidResetToken) => {
            Ok(Redirect::to("/forgot-password?error=invalid_reset_link").into_response())
        }
        Err(e @ (AuthError::PasswordMismatch | AuthError::WeakPassword(_))) => {
            let path = format!(
                "/reset-password?token={}&error={}",
                urlencoding::encode(&form.token),
                e.code()
            );
            Ok(Redirect::to(&path).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_link() {
        assert_eq!(
            reset_link("https://dar.example.com/", "abc_-1"),
            "https://dar.example.com/reset-password?token=abc_-1"
        );
    }

    #[test]
    fn test_auth_redirect_codes() {
        let response = auth_redirect("/sign-in", AuthError::InvalidCredentials).unwrap();
        assert_eq!(
            response.headers()["location"],
            "/sign-in?error=credentials"
        );

        let response = auth_redirect("/sign-up", AuthError::UserAlreadyExists).unwrap();
        assert_eq!(response.headers()["location"], "/sign-up?error=email_taken");

        assert!(auth_redirect("/sign-in", AuthError::PasswordHash).is_err());
    }
}
