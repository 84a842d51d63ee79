use axum::{
    body::Body,
    extract::{FromRequestParts, Query, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::entities::users;

/// Largest request body the auth gate will buffer while looking for an
/// `apiKey` field.
const MAX_SNIFF_BODY_BYTES: usize = 64 * 1024;

/// The authenticated user, resolved from the token on every request and
/// inserted as a request extension by [`require_auth`].
#[derive(Debug, Clone)]
pub struct Identity(pub users::Model);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Authentication middleware. The token is accepted, in precedence order,
/// from:
/// 1. `Authorization: Bearer <token>` header
/// 2. `?token=` query parameter
/// 3. `apiKey` field of a JSON request body
///
/// The third source requires buffering the body; it is restored before the
/// request continues so extractors downstream see it untouched.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();

    let mut token = bearer_token(&parts.headers);

    if token.is_none()
        && let Ok(Query(query)) = Query::<TokenQuery>::try_from_uri(&parts.uri)
    {
        token = query.token;
    }

    let body = if token.is_some() {
        body
    } else {
        let bytes = axum::body::to_bytes(body, MAX_SNIFF_BODY_BYTES)
            .await
            .map_err(|_| ApiError::validation("Request body too large"))?;

        token = serde_json::from_slice::<serde_json::Value>(&bytes)
            .ok()
            .and_then(|value| {
                value
                    .get("apiKey")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
            });

        Body::from(bytes)
    };

    let Some(token) = token else {
        return Err(ApiError::Unauthorized("Authentication required".to_string()));
    };

    let user_id = state.tokens().verify_session(&token)?;

    // A valid signature whose subject no longer exists is a deleted account,
    // not a bad credential.
    let user = state
        .store()
        .get_user(user_id)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    tracing::Span::current().record("user_id", user.id);
    parts.extensions.insert(Identity(user));

    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Admin gate; composes after [`require_auth`], which populates the identity.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    match request.extensions().get::<Identity>() {
        Some(identity) if identity.0.is_admin => Ok(next.run(request).await),
        Some(_) => Err(ApiError::Forbidden(
            "Administrator access required".to_string(),
        )),
        None => Err(ApiError::Unauthorized(
            "Authentication required".to_string(),
        )),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn test_bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
