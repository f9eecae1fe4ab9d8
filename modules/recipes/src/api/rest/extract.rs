use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::Json;
use modkit::api::problem::ProblemResponse;
use serde::de::DeserializeOwned;

use crate::api::rest::error::from_parts;

/// `Json<T>` whose rejections are problem documents. Malformed and
/// mistyped bodies are both 400.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let instance = req.uri().path().to_owned();
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_problem(&rejection, &instance)),
        }
    }
}

fn json_problem(rejection: &JsonRejection, instance: &str) -> ProblemResponse {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => from_parts(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "UNSUPPORTED_MEDIA_TYPE",
            "Unsupported media type",
            rejection.body_text(),
            instance,
        ),
        _ => from_parts(
            StatusCode::BAD_REQUEST,
            "RECIPES_VALIDATION",
            "Malformed request",
            rejection.body_text(),
            instance,
        ),
    }
}
