use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

/// Resolve the calling user from the `Authorization: Bearer` token, or from
/// `x-user-id` when dev overrides are enabled outside production.
pub async fn require_user_id(state: &AppState, headers: &HeaderMap) -> AppResult<String> {
    if state.config.auth_dev_overrides_enabled() {
        if let Some(user_id) = header_str(headers, "x-user-id") {
            return Ok(user_id);
        }
    }

    let token = bearer_token(headers).ok_or_else(|| {
        AppError::Unauthorized("Unauthorized: missing bearer token.".to_string())
    })?;
    let secret = state.config.auth_jwt_secret.as_deref().ok_or_else(|| {
        AppError::Dependency("Authentication is not configured. Set AUTH_JWT_SECRET.".to_string())
    })?;

    user_id_from_token(&token, secret)
}

fn user_id_from_token(token: &str, secret: &str) -> AppResult<String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|error| {
            tracing::debug!(error = %error, "Rejected bearer token");
            AppError::Unauthorized("Unauthorized: invalid token.".to_string())
        })?;

    let user_id = data.claims.sub.trim().to_string();
    if user_id.is_empty() {
        return Err(AppError::Unauthorized(
            "Unauthorized: missing user.".to_string(),
        ));
    }
    Ok(user_id)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = header_str(headers, "authorization")?;
    let (scheme, token) = raw.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim().to_string()).filter(|value| !value.is_empty())
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}
