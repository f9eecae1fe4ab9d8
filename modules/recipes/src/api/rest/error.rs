use axum::http::StatusCode;
use modkit::api::problem::{Problem, ProblemResponse, ValidationError};

use crate::domain::error::{DomainError, FieldError};

/// Helper to create a ProblemResponse with less boilerplate
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> ProblemResponse {
    let problem = Problem::new(status, title, detail)
        .with_type(format!("https://errors.example.com/{code}"))
        .with_code(code)
        .with_instance(instance);
    ProblemResponse(problem)
}

fn with_field_errors(mut resp: ProblemResponse, errors: &[FieldError]) -> ProblemResponse {
    resp.0 = resp.0.with_errors(
        errors
            .iter()
            .map(|e| ValidationError::field(&e.field, e.message.clone()))
            .collect(),
    );
    resp
}

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    match e {
        DomainError::Validation { errors } => with_field_errors(
            from_parts(
                StatusCode::BAD_REQUEST,
                "RECIPES_VALIDATION",
                "Validation error",
                "Request validation failed",
                instance,
            ),
            errors,
        ),
        DomainError::EmailRequired => with_field_errors(
            from_parts(
                StatusCode::BAD_REQUEST,
                "RECIPES_VALIDATION",
                "Validation error",
                format!("{e}"),
                instance,
            ),
            &[FieldError::new("email", "This field is required.")],
        ),
        DomainError::EmailAlreadyExists { email } => with_field_errors(
            from_parts(
                StatusCode::BAD_REQUEST,
                "USERS_EMAIL_EXISTS",
                "Email already exists",
                format!("Email '{email}' is already in use"),
                instance,
            ),
            &[FieldError::new("email", "user with this email already exists.")],
        ),
        DomainError::InvalidCredentials => from_parts(
            StatusCode::BAD_REQUEST,
            "AUTH_INVALID_CREDENTIALS",
            "Invalid credentials",
            "Unable to authenticate with provided credentials.",
            instance,
        ),
        DomainError::InvalidToken => from_parts(
            StatusCode::UNAUTHORIZED,
            "AUTH_UNAUTHORIZED",
            "Unauthorized",
            "Invalid token.",
            instance,
        ),
        DomainError::RecipeNotFound { .. } => from_parts(
            StatusCode::NOT_FOUND,
            "RECIPES_NOT_FOUND",
            "Not found",
            "No recipe matches the given query.",
            instance,
        ),
        DomainError::Database { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = ?e, "Database error occurred");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_DB",
                "Internal error",
                "An internal database error occurred",
                instance,
            )
        }
        DomainError::Internal { .. } => {
            tracing::error!(error = ?e, "Internal error occurred");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal error",
                "An internal error occurred",
                instance,
            )
        }
    }
}
