use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::Form;
use serde::Deserialize;

use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::session::{clear_session_cookie, session_cookie};
use crate::db::models::{NewUser, User};
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::RequestContext;
use crate::routes::home::{Action, Html, OutcomeTemplate};
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hobby: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Blank age is stored as NULL; anything else must be an integer.
fn parse_age(raw: &str) -> AppResult<Option<i64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| AppError::BadRequest(format!("Invalid age: {raw}")))
}

async fn register_user(state: &AppState, form: RegisterForm) -> AppResult<User> {
    let age = parse_age(&form.age)?;
    let password_hash = hash_password_blocking(form.password, state.config.auth.bcrypt_cost).await?;

    let conn = state.db.get()?;
    let user = users::create(
        &conn,
        NewUser {
            name: form.name,
            hobby: form.hobby,
            age,
            email: form.email,
            password_hash,
        },
    )?;
    Ok(user)
}

/// `Ok(None)` for an unknown email or a wrong password alike.
///
/// An unknown email still pays one bcrypt round so both failures take
/// the same time.
async fn check_credentials(state: &AppState, form: LoginForm) -> AppResult<Option<User>> {
    let user = {
        let conn = state.db.get()?;
        users::find_by_email(&conn, &form.email)?
    };

    let Some(user) = user else {
        hash_password_blocking(form.password, state.config.auth.bcrypt_cost).await?;
        return Ok(None);
    };

    let matches = verify_password_blocking(form.password, user.password_hash.clone()).await?;
    Ok(matches.then_some(user))
}

// -- Handlers --

/// POST /register — create an account
pub async fn register(
    State(state): State<AppState>,
    ctx: RequestContext,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> Html<OutcomeTemplate> {
    let registered = match form {
        Ok(Form(form)) => register_user(&state, form).await,
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    };

    let result = match registered {
        Ok(user) => {
            tracing::info!("Registered user {}", user.id);
            true
        }
        Err(e) => {
            tracing::warn!("Registration failed: {}", e);
            false
        }
    };

    Html(OutcomeTemplate {
        user: ctx.user,
        action: Action::Register,
        result,
    })
}

/// POST /login — verify credentials and issue the session cookie
pub async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let outcome = match form {
        Ok(Form(form)) => check_credentials(&state, form).await,
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    };

    match outcome {
        Ok(Some(user)) => {
            tracing::info!("User {} logged in", user.id);
            let cookie = session_cookie(
                &state.config.auth.cookie_name,
                &user.id,
                state.config.auth.session_secs,
            );
            return (
                AppendHeaders([(header::SET_COOKIE, cookie)]),
                Html(OutcomeTemplate {
                    user: Some(user),
                    action: Action::Login,
                    result: true,
                }),
            )
                .into_response();
        }
        Ok(None) => tracing::info!("Login rejected"),
        Err(AppError::Hash(e)) => tracing::error!("Stored password hash is unusable: {}", e),
        Err(e) => tracing::warn!("Login failed: {}", e),
    }

    Html(OutcomeTemplate {
        user: ctx.user,
        action: Action::Login,
        result: false,
    })
    .into_response()
}

/// GET /logout — clear the session cookie and go home
pub async fn logout(State(state): State<AppState>) -> Response {
    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, "/".to_string()),
            (
                header::SET_COOKIE,
                clear_session_cookie(&state.config.auth.cookie_name),
            ),
        ],
        "",
    )
        .into_response()
}
