use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tenant_notes_api::{
    config::Config,
    db::{self, PgStore},
    router, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let store = Arc::new(PgStore::new(pool));
    let state = AppState::new(config.clone(), store.clone(), store);
    if !config.production {
        info!("APP_ENV is not production: session cookies are sent without Secure");
    }

    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("tenant-notes API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
