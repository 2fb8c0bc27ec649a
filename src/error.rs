use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{models::ErrorBody, store::StoreError, validation::ValidationError};

/// Failures of `POST /api/contact`. Only the fixed messages below reach the
/// client; store details are logged.
#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error("invalid input: {0}")]
    ServerValidationFailed(#[from] ValidationError),

    #[error("could not connect to database: {0}")]
    StorageUnavailable(#[source] StoreError),

    #[error("storing message failed: {0}")]
    StorageWriteFailed(#[source] StoreError),
}

impl IntoResponse for ContactError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ContactError::ServerValidationFailed(reason) => {
                tracing::debug!(%reason, "rejected contact message");
                (StatusCode::UNPROCESSABLE_ENTITY, "Invalid input.")
            }
            ContactError::StorageUnavailable(e) => {
                tracing::error!("Database connection failed: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Could not connect to database.")
            }
            ContactError::StorageWriteFailed(e) => {
                tracing::error!("Database insert failed: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storing message failed!")
            }
        };

        let body = Json(ErrorBody {
            message: message.to_string(),
        });

        (status, body).into_response()
    }
}
