use actix_web::{HttpResponse, web};
use serde_json::json;
use tracing::error;

use crate::store::EmployeeStore;

/// Liveness plus a round-trip to the record store.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database reachable", body = Object, example = json!({
            "status": "healthy",
            "database": "connected"
        })),
        (status = 503, description = "Database unreachable", body = Object, example = json!({
            "status": "unhealthy"
        }))
    ),
    tag = "Health"
)]
pub async fn health(store: web::Data<dyn EmployeeStore>) -> HttpResponse {
    match store.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "healthy",
            "database": "connected"
        })),
        Err(e) => {
            error!(error = %e, "Health check failed");
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "unhealthy"
            }))
        }
    }
}
