use crate::storage::StoreError;
use crate::tracker::UnknownMetric;
use axum::http::StatusCode;
use tracing::error;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let status = match err {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Conflict(_) => StatusCode::CONFLICT,
            StoreError::Io(_) | StoreError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("store failure: {err}");
        }

        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<UnknownMetric> for AppError {
    fn from(err: UnknownMetric) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_status() {
        assert_eq!(
            AppError::from(StoreError::NotFound("user u1".into())).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(StoreError::Conflict("u1".into())).status,
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(UnknownMetric("sleep".into())).status,
            StatusCode::BAD_REQUEST
        );
    }
}
