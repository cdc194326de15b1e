use actix_web::web;
use crate::web::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api").service(
            web::resource("/generate-image")
                .app_data(web::JsonConfig::default().error_handler(handlers::json_error))
                .route(web::post().to(handlers::generate_image)),
        ),
    )
    .route("/", web::get().to(handlers::index))
    .route("/health", web::get().to(handlers::health_check));
}
