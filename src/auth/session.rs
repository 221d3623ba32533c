use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;

use crate::db::models::User;
use crate::db::users;
use crate::extractors::RequestContext;
use crate::state::{AppState, DbPool};

/// Session cookie carrying the user id. Expires after `max_age_secs`.
pub fn session_cookie(name: &str, user_id: &str, max_age_secs: u64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, user_id, max_age_secs
    )
}

pub fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

pub fn get_cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}

/// Resolve a session cookie value to a user.
///
/// Unknown ids and store errors both resolve to `None`: a stale cookie
/// degrades to an anonymous request, it never fails one.
pub fn resolve_user(pool: &DbPool, user_id: Option<&str>) -> Option<User> {
    let user_id = user_id?;

    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            tracing::debug!("Session lookup skipped, no connection: {}", e);
            return None;
        }
    };

    match users::find_by_id(&conn, user_id) {
        Ok(Some(user)) => Some(user),
        Ok(None) => {
            tracing::debug!("Session cookie references unknown user {}", user_id);
            None
        }
        Err(e) => {
            tracing::debug!("Session lookup failed: {}", e);
            None
        }
    }
}

/// Middleware that attaches a [`RequestContext`] to every request.
/// Never rejects; handlers decide whether they need a user.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let cookie = get_cookie_value(req.headers(), &state.config.auth.cookie_name);
    let user = resolve_user(&state.db, cookie);

    req.extensions_mut().insert(RequestContext { user });
    next.run(req).await
}
