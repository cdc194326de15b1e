use actix_web::error::JsonPayloadError;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::{error, info, warn};
use serde_json::json;
use tera::Context;

use crate::generator::{GenerateError, ImageGenerator};
use crate::web::models::{GenerateImageRequest, GenerateImageResponse};
use crate::AppState;

// Index page handler
pub async fn index(data: web::Data<AppState>) -> impl Responder {
    let context = Context::new();
    match data.tera.render("index.html", &context) {
        Ok(html) => HttpResponse::Ok().content_type("text/html").body(html),
        Err(e) => {
            error!("Template error: {}", e);
            HttpResponse::InternalServerError().body("Template error")
        }
    }
}

// Health check endpoint
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

// Image generation API endpoint
pub async fn generate_image(
    generator: web::Data<ImageGenerator>,
    req: web::Json<GenerateImageRequest>,
) -> Result<HttpResponse, GenerateError> {
    let prompt = req.into_inner().prompt.unwrap_or_default();

    match generator.generate_image(&prompt).await {
        Ok(url) => Ok(HttpResponse::Ok().json(GenerateImageResponse { url })),
        Err(e) => {
            match &e {
                GenerateError::InvalidInput => info!("Rejected request without a prompt"),
                GenerateError::Timeout(_) => warn!("Image generation timed out"),
                GenerateError::GenerationFailed { code, stderr } => {
                    error!("Image tool failed (exit code {:?}): {}", code, stderr)
                }
                other => error!("Image generation error: {}", other),
            }
            Err(e)
        }
    }
}

/// Malformed request bodies get the same `{ "error": ... }` shape as every other failure.
pub fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    warn!("Rejected request body: {}", err);
    GenerateError::Unexpected(anyhow::Error::msg(err.to_string())).into()
}
