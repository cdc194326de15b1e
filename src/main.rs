mod config;
mod generator;
mod web;

use actix_cors::Cors;
use actix_files as fs;
use actix_web::{web::Data, App, HttpServer};
use dotenv::dotenv;
use log::{error, info};
use tera::Tera;

use config::AppConfig;
use generator::ImageGenerator;
use web::routes;

// App state structure
pub struct AppState {
    tera: Tera,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting image relay");

    let config = AppConfig::from_env();
    let generator = Data::new(ImageGenerator::new(config.tool.clone()));

    // Initialize template engine
    let mut tera = match Tera::new(&config.template_glob) {
        Ok(t) => t,
        Err(e) => {
            error!("Template parsing error: {}", e);
            std::process::exit(1);
        }
    };
    tera.autoescape_on(vec![".html"]);

    let app_state = Data::new(AppState { tera });
    let static_dir = config.static_dir.clone();

    info!("Listening on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(app_state.clone())
            .app_data(generator.clone())
            .configure(routes::configure)
            .service(fs::Files::new("/static", &static_dir))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
