// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::{common::error::AppError, config::AppState};

// O middleware em si: compara a chave apresentada (header X-API-Key ou
// query param api_key) com a chave guardada em app_settings.
//
// Enquanto nenhuma chave foi gerada, o guard deixa passar: é o estado de
// bootstrap de uma instalação nova, antes do primeiro POST de chave.
pub async fn api_key_guard(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let stored = app_state.settings_service.stored_api_key().await?;

    let Some(stored) = stored else {
        return Ok(next.run(request).await);
    };

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let query_key = request.uri().query().and_then(api_key_from_query);

    let presented = header_key.or(query_key);

    match presented {
        Some(key) if key == stored => Ok(next.run(request).await),
        _ => Err(AppError::Unauthorized),
    }
}

fn api_key_from_query(query: &str) -> Option<String> {
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("api_key="))
        .map(str::to_string)
}

// Extrator da identidade de quem age, para as preferências por usuário.
// Header opcional: sem X-User-Id, tudo cai no usuário 0 (instalação de
// um usuário só).
#[derive(Debug, Clone, Copy)]
pub struct UserContext(pub i64);

impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.headers.get("x-user-id") {
            None => Ok(UserContext(0)),
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|raw| raw.trim().parse::<i64>().ok())
                .map(UserContext)
                .ok_or(AppError::InvalidHeader("X-User-Id")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_is_read_from_the_query_string() {
        assert_eq!(
            api_key_from_query("api_key=abc123&foo=bar").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            api_key_from_query("foo=bar&api_key=abc123").as_deref(),
            Some("abc123")
        );
        assert!(api_key_from_query("foo=bar").is_none());
    }
}
