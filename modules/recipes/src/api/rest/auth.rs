//! Token authentication: `Authorization: Token <key>` (or `Bearer <key>`)
//! resolved to an active user on every request.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

use crate::api::rest::error::{from_parts, map_domain_error};
use crate::contract::model::User;
use crate::domain::error::DomainError;
use crate::domain::users::UsersService;

/// The authenticated caller. Requires `Extension<Arc<UsersService>>` on the route.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let instance = parts.uri.path().to_owned();

        let Some(svc) = parts.extensions.get::<Arc<UsersService>>().cloned() else {
            error!("UsersService extension missing on an authenticated route");
            return Err(map_domain_error(
                &DomainError::internal("authentication is not configured"),
                &instance,
            )
            .into_response());
        };

        let Some(key) = token_from_headers(&parts.headers) else {
            return Err(unauthorized(
                "Authentication credentials were not provided.",
                &instance,
            ));
        };

        match svc.authenticate(key).await {
            Ok(user) => Ok(AuthUser(user)),
            Err(DomainError::InvalidToken) => {
                debug!("rejected token");
                Err(unauthorized("Invalid token.", &instance))
            }
            Err(e) => Err(map_domain_error(&e, &instance).into_response()),
        }
    }
}

/// Key from `Authorization: Token <key>`; `Bearer` is accepted too.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, key) = value.trim().split_once(' ')?;
    if !(scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer")) {
        return None;
    }
    let key = key.trim();
    (!key.is_empty() && !key.contains(' ')).then_some(key)
}

fn unauthorized(detail: &str, instance: &str) -> Response {
    let mut resp = from_parts(
        StatusCode::UNAUTHORIZED,
        "AUTH_UNAUTHORIZED",
        "Unauthorized",
        detail,
        instance,
    )
    .into_response();
    resp.headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Token"));
    resp
}
