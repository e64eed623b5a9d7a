use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::{EngineError, RemoteError};

use api_types::error::ErrorResponse;
pub use server::{ServerState, router, run_with_listener, spawn_with_listener};

mod goals;
mod server;

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Remote(RemoteError),
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::GoalNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidAmount(_)
        | EngineError::InvalidCurrency(_)
        | EngineError::InvalidVersion(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Persistence(msg) => {
            tracing::error!("storage error: {msg}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Remote(err) => {
                tracing::error!("authority failure: {err}");
                (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<RemoteError> for ServerError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn goal_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::GoalNotFound(Uuid::new_v4())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_maps_to_422() {
        let res = ServerError::from(EngineError::InvalidAmount("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn exhausted_version_maps_to_422() {
        let res = ServerError::from(EngineError::InvalidVersion(u64::MAX)).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn persistence_maps_to_500() {
        let res = ServerError::from(EngineError::Persistence("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unreachable_authority_maps_to_503() {
        let res =
            ServerError::from(RemoteError::Unreachable("down".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
