//! Storefront - mutation backend for a small online shop

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{SqlxItemRepository, SqlxUserRepository},
    },
    services::{MutationService, SmtpMailTransport, TokenIssuer},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting storefront...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");
    if config.auth.app_secret == "change-me" {
        tracing::warn!("Using the default app secret; set STOREFRONT_APP_SECRET");
    }

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    // Outgoing mail
    let mailer = Arc::new(SmtpMailTransport::new(&config.mail)?);
    tracing::info!("SMTP transport ready: {}:{}", config.mail.host, config.mail.port);

    let mutations = MutationService::new(
        SqlxUserRepository::boxed(pool.clone()),
        SqlxItemRepository::boxed(pool.clone()),
        TokenIssuer::new(&config.auth.app_secret),
        mailer,
        config.auth.frontend_url.clone(),
        config.mail.from.clone(),
    );

    let state = AppState {
        pool: pool.clone(),
        mutations: Arc::new(mutations),
    };

    // Build router
    let app = api::build_router(state, &config.server.cors_origin)?;

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    pool.close().await;
    Ok(())
}
