use dotenvy::dotenv;
use std::env;
use storefront::{
    config::{self, database},
    core::{account, category},
    errors::Result,
    web::{AppState, build_router},
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = config::load_app_configuration()?;

    // 4. Connect and make sure the schema exists
    let db_url = database::get_database_url(&app_config.database.url);
    let db = database::create_connection(&db_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed categories and the optional staff account
    let seeded = category::seed_categories(&db, &app_config.categories).await?;
    info!(seeded, "Categories seeded.");

    match (
        env::var("STOREFRONT_ADMIN_EMAIL"),
        env::var("STOREFRONT_ADMIN_PASSWORD"),
    ) {
        (Ok(email), Ok(password)) => {
            let admin = account::create_superuser(&db, &email, &password).await?;
            info!(user_id = admin.id, "Staff account ready.");
        }
        (Ok(_), Err(_)) => warn!("STOREFRONT_ADMIN_EMAIL set without STOREFRONT_ADMIN_PASSWORD; skipping."),
        _ => {}
    }

    // 6. Serve
    let bind_address = app_config.server.bind_address();
    let app = build_router(AppState::new(db, app_config));
    let listener = TcpListener::bind(&bind_address)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", bind_address, e))?;
    info!("Storefront listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}
