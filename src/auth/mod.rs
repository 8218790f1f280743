use anyhow::Result;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::prelude::*;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::models::User;
use crate::shortlink::{CodeGenerator, RandomCodeGenerator};
use crate::storage::Storage;

const TOKEN_LENGTH: usize = 40;
const TOKEN_SCHEME: &str = "Token";

/// Generate a new API token. Only its digest should ever be stored.
pub fn generate_token() -> String {
    RandomCodeGenerator::new(TOKEN_LENGTH).generate()
}

/// SHA-256 of the token, base64url without padding
pub fn token_digest(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    BASE64_URL_SAFE_NO_PAD.encode(digest)
}

/// Extract the token from an `Authorization: Token <token>` header.
/// `None` when no header is present, `Err` when it is present but malformed.
fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| ApiError::Unauthorized)?;
    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(ApiError::Unauthorized)?;

    if !scheme.eq_ignore_ascii_case(TOKEN_SCHEME) {
        return Err(ApiError::Unauthorized);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    Ok(Some(token))
}

pub struct AuthService {
    storage: Arc<dyn Storage>,
}

impl AuthService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn authenticate(&self, token: &str) -> Result<Option<User>> {
        self.storage.find_user_by_token(&token_digest(token)).await
    }
}

/// The authenticated user of the current request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// The authenticated user, if the request carried a token.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|user| user.id)
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts
                .extensions
                .get::<CurrentUser>()
                .map(|current| current.0.clone()),
        ))
    }
}

/// Resolve the request's token to a user.
///
/// Requests without a token pass through anonymously; handlers that need a
/// user take a [`CurrentUser`] and reject those with 401. A token that is
/// present but unknown is rejected here.
pub async fn auth_middleware(
    auth_service: Arc<AuthService>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&headers) {
        Ok(token) => token,
        Err(err) => return err.into_response(),
    };

    if let Some(token) = token {
        match auth_service.authenticate(token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(CurrentUser(user));
            }
            Ok(None) => {
                tracing::debug!("rejected unknown API token");
                return ApiError::Unauthorized.into_response();
            }
            Err(err) => return ApiError::Internal(err).into_response(),
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_token_digest_is_stable() {
        let digest = token_digest("secret");
        assert_eq!(digest, token_digest("secret"));
        assert_ne!(digest, token_digest("Secret"));
        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(digest.len(), 43);
    }

    #[test]
    fn test_generate_token() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert!(matches!(bearer_token(&HeaderMap::new()), Ok(None)));
        assert!(matches!(
            bearer_token(&headers_with("Token abc123")),
            Ok(Some("abc123"))
        ));
        assert!(matches!(
            bearer_token(&headers_with("token   abc123 ")),
            Ok(Some("abc123"))
        ));
        assert!(bearer_token(&headers_with("Bearer abc123")).is_err());
        assert!(bearer_token(&headers_with("Token")).is_err());
        assert!(bearer_token(&headers_with("Token   ")).is_err());
    }
}
