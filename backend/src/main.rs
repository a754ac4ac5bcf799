use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use backend::artifacts::Artifacts;
use backend::config::ServiceConfig;
use backend::inference::InferenceService;
use backend::routes::configure_routes;
use std::env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = ServiceConfig::load().map_err(|e| {
        log::error!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    let artifacts = Artifacts::load(&config.artifacts).map_err(|e| {
        log::error!("Failed to load artifacts at startup: {}", e);
        std::io::Error::other(format!("Artifact loading failed: {}", e))
    })?;

    let service = web::Data::new(InferenceService::new(artifacts));
    let bind_address = config.bind_address();

    log::info!("Machine Failure Prediction (PyTorch) listening on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(service.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
