mod auth;
mod config;
mod diagnosis;
mod history;
mod inference;
mod retry;
mod routes;
mod scan;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use auth::cognito_service::CognitoService;
use auth::jwt::JwtService;
use auth::middleware::AuthMiddleware;
use auth::service::AuthService;
use aws_config::BehaviorVersion;
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use config::{AppConfig, CropCatalogue, HistoryBackend};
use history::HistoryRepository;
use history::dynamodb_repository::DynamoDbHistoryRepository;
use history::memory_repository::MemoryHistoryRepository;
use history::service::HistoryService;
use inference::FileModelLoader;
use inference::registry::ModelRegistry;
use routes::configure_routes;
use std::env;
use std::sync::Arc;

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", context, err);
    std::io::Error::other(format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    let app_config =
        AppConfig::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    let catalogue = CropCatalogue::load(&app_config.crops_config)
        .map_err(|e| startup_error("Failed to read crop catalogue", e))?;
    let registry = ModelRegistry::new(catalogue, Arc::new(FileModelLoader));
    registry.preload();
    let registry = web::Data::new(registry);

    // Initialize AWS configuration
    let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;

    let history_repo: Arc<dyn HistoryRepository> = match &app_config.history_backend {
        HistoryBackend::DynamoDb { table } => {
            log::info!("Scan history stored in DynamoDB table {}", table);
            Arc::new(DynamoDbHistoryRepository::new(
                DynamoDbClient::new(&aws_config),
                table.clone(),
            ))
        }
        HistoryBackend::Memory => {
            log::warn!("Scan history kept in memory, it will be lost on restart");
            Arc::new(MemoryHistoryRepository::new())
        }
    };
    let history_service = web::Data::new(HistoryService::new(
        history_repo,
        app_config.retry.clone(),
    ));

    let jwt_service = JwtService::new(&app_config.jwt_secret, app_config.session_ttl_hours);
    let cognito_service = CognitoService::new(
        CognitoClient::new(&aws_config),
        app_config.cognito_client_id.clone(),
    );
    let auth_service = web::Data::new(AuthService::new(
        Arc::new(cognito_service),
        jwt_service.clone(),
    ));
    let auth_middleware = AuthMiddleware::new(jwt_service);

    let bind_address = format!("0.0.0.0:{}", app_config.port);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(registry.clone())
            .app_data(history_service.clone())
            .app_data(auth_service.clone())
            .configure(|cfg| configure_routes(cfg, auth_middleware.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
