use crate::api::rest::{ApiError, AppState};
use crate::error::Error;
use crate::security::{Claims, SCOPE_BACKOFFICE, SCOPE_THIRDPARTY};
use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;

/// Bearer token check for `/backoffice` routes
pub async fn require_backoffice<B>(
    State(state): State<AppState>,
    request: Request<B>,
    next: Next<B>,
) -> Result<Response, ApiError> {
    authorize(&state, request, next, SCOPE_BACKOFFICE).await
}

/// Bearer token check for `/thirdparty` routes
pub async fn require_third_party<B>(
    State(state): State<AppState>,
    request: Request<B>,
    next: Next<B>,
) -> Result<Response, ApiError> {
    authorize(&state, request, next, SCOPE_THIRDPARTY).await
}

async fn authorize<B>(
    state: &AppState,
    mut request: Request<B>,
    next: Next<B>,
    scope: &str,
) -> Result<Response, ApiError> {
    let claims = if state.security.token_check() {
        let token = bearer_token(request.headers())
            .ok_or_else(|| Error::Authentication("Missing bearer token".to_string()))?;
        state.security.authorize(&token, scope)?
    } else {
        Claims::unchecked(scope)
    };

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (kind, token) = value.split_once(' ')?;
    if kind.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim().to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer   xyz "));
        assert_eq!(bearer_token(&headers).as_deref(), Some("xyz"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
