use axum::routing::{get, post};
use axum::Router;

use crate::auth::handlers;
use crate::routes::home;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(home::login_page).post(handlers::login))
        .route("/signup", get(home::signup_page))
        .route("/register", post(handlers::register))
        .route("/logout", get(handlers::logout))
        .route("/welcome", get(home::welcome))
}
