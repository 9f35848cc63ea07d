//! Loomfront service entry point.

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loomfront::api::{router, AppState};
use loomfront::catalog::PgCatalog;
use loomfront::domain::events::ProductFeed;
use loomfront::token::PgTokenStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = PgPoolOptions::new().max_connections(10).connect(&std::env::var("DATABASE_URL")?).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match std::env::var("NATS_URL") {
        Ok(url) => match async_nats::connect(&url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, product events stay in-process");
                None
            }
        },
        Err(_) => None,
    };

    let client_password = std::env::var("CLIENT_ACCESS_PASSWORD")?;
    let state = AppState {
        catalog: PgCatalog::new(db.clone()),
        tokens: PgTokenStore::new(db),
        feed: ProductFeed::new(nats),
        client_password,
    };

    let app = router(state);
    let port = std::env::var("PORT").unwrap_or_else(|_| "8083".to_string());
    tracing::info!("loomfront listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
