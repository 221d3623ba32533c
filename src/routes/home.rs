use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::db::models::User;
use crate::extractors::RequestContext;

#[derive(Template)]
#[template(path = "pages/index.html")]
pub struct IndexTemplate {
    pub user: Option<User>,
}

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub user: Option<User>,
}

#[derive(Template)]
#[template(path = "pages/signup.html")]
pub struct SignupTemplate {
    pub user: Option<User>,
}

#[derive(Template)]
#[template(path = "pages/create.html")]
pub struct CreateTemplate {
    pub user: Option<User>,
}

#[derive(Template)]
#[template(path = "pages/welcome.html")]
pub struct WelcomeTemplate {
    pub user: Option<User>,
}

/// Which form an [`OutcomeTemplate`] reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Register,
    Login,
    Post,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::Register => "Registration",
            Action::Login => "Login",
            Action::Post => "Posting",
        }
    }

    pub fn next_href(&self) -> &'static str {
        match self {
            Action::Register => "/login",
            Action::Login => "/welcome",
            Action::Post => "/board",
        }
    }

    pub fn retry_href(&self) -> &'static str {
        match self {
            Action::Register => "/signup",
            Action::Login => "/login",
            Action::Post => "/create",
        }
    }
}

/// Shared success/failure page for form submissions.
#[derive(Template)]
#[template(path = "pages/outcome.html")]
pub struct OutcomeTemplate {
    pub user: Option<User>,
    pub action: Action,
    pub result: bool,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

pub async fn index(ctx: RequestContext) -> Html<IndexTemplate> {
    Html(IndexTemplate { user: ctx.user })
}

pub async fn login_page(ctx: RequestContext) -> Html<LoginTemplate> {
    Html(LoginTemplate { user: ctx.user })
}

pub async fn signup_page(ctx: RequestContext) -> Html<SignupTemplate> {
    Html(SignupTemplate { user: ctx.user })
}

pub async fn create_page(ctx: RequestContext) -> Html<CreateTemplate> {
    Html(CreateTemplate { user: ctx.user })
}

/// Post-login landing page. The session middleware has already resolved
/// the cookie for this request.
pub async fn welcome(ctx: RequestContext) -> Html<WelcomeTemplate> {
    if ctx.user.is_none() {
        tracing::debug!("Welcome page requested without a live session");
    }
    Html(WelcomeTemplate { user: ctx.user })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User {
            id: "u1".into(),
            name: "Alice <admin>".into(),
            hobby: String::new(),
            age: None,
            email: "a@x.com".into(),
            password_hash: "hash".into(),
            created_at: "2025-01-15 12:00:00".into(),
        }
    }

    #[test]
    fn nav_shows_login_links_when_anonymous() {
        let html = IndexTemplate { user: None }.render().unwrap();
        assert!(html.contains("href=\"/login\""));
        assert!(html.contains("href=\"/signup\""));
        assert!(!html.contains("href=\"/logout\""));
    }

    #[test]
    fn nav_shows_escaped_user_name_when_logged_in() {
        let html = IndexTemplate {
            user: Some(alice()),
        }
        .render()
        .unwrap();
        assert!(html.contains("href=\"/logout\""));
        assert!(html.contains("Alice &lt;admin&gt;"));
    }

    #[test]
    fn outcome_links_depend_on_result() {
        let ok = OutcomeTemplate {
            user: None,
            action: Action::Login,
            result: true,
        }
        .render()
        .unwrap();
        assert!(ok.contains("Login succeeded"));
        assert!(ok.contains("href=\"/welcome\""));

        let failed = OutcomeTemplate {
            user: None,
            action: Action::Register,
            result: false,
        }
        .render()
        .unwrap();
        assert!(failed.contains("Registration failed"));
        assert!(failed.contains("href=\"/signup\""));
    }

    #[test]
    fn create_page_asks_anonymous_users_to_log_in() {
        let html = CreateTemplate { user: None }.render().unwrap();
        assert!(!html.contains("action=\"/post\""));

        let html = CreateTemplate {
            user: Some(alice()),
        }
        .render()
        .unwrap();
        assert!(html.contains("action=\"/post\""));
        assert!(html.contains("multipart/form-data"));
    }
}
