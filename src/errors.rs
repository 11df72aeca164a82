// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Custom application error with conversions from common Rust and 3rd-party errors.

use actix::MailboxError;
use actix::dev::SendError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use awc::error::{PayloadError, SendRequestError};
use derive_more::Display;
use log::error;

use crate::server::web_model::ApiResponse;

#[derive(Debug, Display, PartialEq)]
pub enum ServiceError {
    /// Invalid credentials or rejected token refresh. Requires new user input.
    #[display("Authentication failed: {_0}")]
    AuthError(String),

    /// Transient network or cloud failure. Retried with the next poll.
    #[display("Cloud API error: {_0}")]
    ApiError(String),

    /// Command not supported by the blind motor. Rejected locally without a cloud call.
    #[display("Unsupported command: {_0}")]
    UnsupportedCommand(String),

    #[display("Internal server error")]
    InternalServerError(String),

    #[display("Internal serialization error")]
    SerializationError(String),

    #[display("BadRequest: {_0}")]
    BadRequest(String),

    #[display("Not found: {_0}")]
    NotFound(String),

    #[display("Service unavailable: {_0}")]
    ServiceUnavailable(String),
}

impl std::error::Error for ServiceError {}

impl From<std::io::Error> for ServiceError {
    fn from(e: std::io::Error) -> Self {
        ServiceError::InternalServerError(format!("{e:?}"))
    }
}

impl From<MailboxError> for ServiceError {
    fn from(e: MailboxError) -> Self {
        ServiceError::InternalServerError(format!("Internal message error: {e:?}"))
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        error!("{e:?}");
        ServiceError::SerializationError(e.to_string())
    }
}

impl<T> From<SendError<T>> for ServiceError {
    fn from(e: SendError<T>) -> Self {
        ServiceError::InternalServerError(format!("Error sending internal message: {e:?}"))
    }
}

impl From<SendRequestError> for ServiceError {
    fn from(e: SendRequestError) -> Self {
        ServiceError::ApiError(format!("Request failed: {e}"))
    }
}

impl From<PayloadError> for ServiceError {
    fn from(e: PayloadError) -> Self {
        ServiceError::ApiError(format!("Invalid response payload: {e}"))
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::AuthError(_) => StatusCode::UNAUTHORIZED,
            ServiceError::ApiError(_) => StatusCode::BAD_GATEWAY,
            ServiceError::UnsupportedCommand(_) | ServiceError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::InternalServerError(_) | ServiceError::SerializationError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let code = match self {
            ServiceError::AuthError(_) => "AUTH_ERROR",
            ServiceError::ApiError(_) => "API_ERROR",
            ServiceError::UnsupportedCommand(_) => "UNSUPPORTED_COMMAND",
            ServiceError::InternalServerError(_) => "INTERNAL_ERROR",
            ServiceError::SerializationError(_) => "SERIALIZATION_ERROR",
            ServiceError::BadRequest(_) => "BAD_REQUEST",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        };
        let message = self.to_string();
        HttpResponse::build(self.status_code()).json(ApiResponse::new(code, &message))
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceError;
    use actix_web::ResponseError;
    use actix_web::http::StatusCode;
    use rstest::rstest;

    #[rstest]
    #[case(ServiceError::AuthError("x".into()), StatusCode::UNAUTHORIZED)]
    #[case(ServiceError::ApiError("x".into()), StatusCode::BAD_GATEWAY)]
    #[case(ServiceError::UnsupportedCommand("x".into()), StatusCode::BAD_REQUEST)]
    #[case(ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND)]
    #[case(ServiceError::ServiceUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE)]
    fn error_maps_to_http_status(#[case] error: ServiceError, #[case] expected: StatusCode) {
        assert_eq!(expected, error.status_code());
    }
}
