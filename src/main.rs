use std::sync::Arc;

use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clagate::config::Config;
use clagate::handlers::{configure_link_routes, configure_webhook_routes};
use clagate::services::{ClaReconciler, DocumentStore, GithubClient, LinkService, PgSigningStore};
use clagate::AppState;

/// Health check endpoint
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "clagate"
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clagate=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");

    info!("Starting clagate server on {}:{}", config.host, config.port);

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .expect("Failed to create database pool");

    info!("Database connection pool established");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");

    info!("Database migrations completed");

    // Per-repo CLA configuration snapshot, passed to every reconciliation
    let repo_config = Config::load_repo_config(&config.repo_config_path)
        .expect("Failed to load repo config snapshot");
    info!(
        "Loaded CLA configuration for {} repos",
        repo_config.repos.len()
    );

    let store = Arc::new(PgSigningStore::new(db_pool.clone()));
    let platform = Arc::new(GithubClient::new(
        config.platform_token.clone(),
        config.platform_api_base.clone(),
    ));

    let links = LinkService::new(
        store.clone(),
        platform.clone(),
        DocumentStore::new(config.file_dir.clone()),
        config.lock_dir.clone(),
        config.supported_languages.clone(),
    );

    let cla = ClaReconciler::new(
        store,
        platform,
        config.sign_url.clone(),
        config.faq_of_checking_by_author.clone(),
        config.faq_of_checking_by_committer.clone(),
    );

    let host = config.host.clone();
    let port = config.port;
    let app_state = web::Data::new(AppState {
        config,
        links,
        cla,
        repo_config,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/v1")
                    .configure(configure_link_routes)
                    .configure(configure_webhook_routes),
            )
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
