use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::time::timeout;

use super::data_source::*;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

fn unavailable(message: &str) -> Response {
    let body = serde_json::json!({ "status": "failure", "message": message });
    (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
}

/// Ready once the secret store answers a metadata probe in time.
#[tracing::instrument]
pub async fn handler(data_src: StateDataSource) -> Response {
    match timeout(HEALTH_CHECK_TIMEOUT, data_src.is_ready()).await {
        Ok(Ok(())) => (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))).into_response(),
        Ok(Err(DataSourceError::DependencyFailure)) => {
            unavailable("secret store isn't available")
        }
        Err(_) => {
            tracing::warn!(
                timeout_secs = HEALTH_CHECK_TIMEOUT.as_secs(),
                "readiness probe timed out"
            );
            unavailable("health check timed out")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    use crate::http::health::data_source::tests::*;

    #[tokio::test]
    async fn test_handler_direct() {
        let response = handler(StateDataSource::new(Arc::new(MockReadiness::Ready))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = handler(StateDataSource::new(Arc::new(
            MockReadiness::DependencyFailure,
        )))
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
