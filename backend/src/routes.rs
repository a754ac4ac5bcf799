use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError, error, web};
use log::warn;
use serde::Serialize;
use shared::{ErrorResponse, MODEL_TAG, SensorReading};

use crate::artifacts::classifier::INPUT_DIM;
use crate::inference::InferenceService;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model: &'static str,
    features: i64,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(web::resource("/predict/pytorch").route(web::post().to(predict)))
        .service(web::resource("/health").route(web::get().to(health)));
}

/// Bodies that do not deserialize into a `SensorReading` never reach the handler; they are
/// answered with 422 and the same `{"error": ...}` shape. Other payload rejections keep
/// actix's status (413 for oversized bodies, and so on).
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(json_error)
}

fn json_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    let message = err.to_string();
    warn!("Rejected body for {}: {}", req.path(), message);
    let status = match &err {
        error::JsonPayloadError::Deserialize(_) => StatusCode::UNPROCESSABLE_ENTITY,
        other => other.status_code(),
    };
    let response = HttpResponse::build(status).json(ErrorResponse { error: message });
    error::InternalError::from_response(err, response).into()
}

// Inference failures are reported in the body with a 200, same as successes.
async fn predict(
    service: web::Data<InferenceService>,
    reading: web::Json<SensorReading>,
) -> HttpResponse {
    HttpResponse::Ok().json(service.respond(&reading))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        model: MODEL_TAG,
        features: INPUT_DIM,
    })
}
