use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::db::models::User;
use crate::error::AppError;

/// Identity resolved for this request by the session middleware.
///
/// Built once per request and never mutated afterwards. Extracting it where
/// the middleware did not run yields an anonymous context.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user: Option<User>,
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Extractor that requires an authenticated user.
/// Returns 401 when the request is anonymous.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequestContext { user } = match RequestContext::from_request_parts(parts, state).await
        {
            Ok(ctx) => ctx,
            Err(never) => match never {},
        };
        user.map(CurrentUser).ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn user() -> User {
        User {
            id: "u1".into(),
            name: "Alice".into(),
            hobby: String::new(),
            age: None,
            email: "a@x.com".into(),
            password_hash: "hash".into(),
            created_at: "2025-01-15 12:00:00".into(),
        }
    }

    fn parts_with(ctx: Option<RequestContext>) -> Parts {
        let mut req = Request::new(());
        if let Some(ctx) = ctx {
            req.extensions_mut().insert(ctx);
        }
        req.into_parts().0
    }

    #[tokio::test]
    async fn missing_context_is_anonymous() {
        let mut parts = parts_with(None);
        let ctx = RequestContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(ctx.user.is_none());
    }

    #[tokio::test]
    async fn current_user_rejects_anonymous() {
        let mut parts = parts_with(Some(RequestContext::default()));
        let result = CurrentUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn current_user_reads_context() {
        let mut parts = parts_with(Some(RequestContext { user: Some(user()) }));
        let CurrentUser(found) = CurrentUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(found.id, "u1");
    }
}
