use std::sync::Arc;

use anyhow::Context;
use time::Duration;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use api::db::{self, PgStore};
use api::{AppContext, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let settings = Settings::new().context("Failed to load settings")?;

    let pool = db::connect(&settings.database)
        .await
        .context("Failed to connect to database")?;
    db::migrate(&pool)
        .await
        .context("Failed to run migrations")?;

    let session_store = PostgresStore::new(pool.clone());
    session_store
        .migrate()
        .await
        .context("Failed to create the session table")?;

    let key = match settings.session.key_bytes()? {
        Some(bytes) => Key::from(&bytes),
        None => {
            tracing::warn!("No session key configured; sessions will not survive a restart");
            Key::generate()
        }
    };
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(settings.session.secure)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::days(settings.session.expiry)))
        .with_signed(key);

    let address = settings.server.address();
    let ctx = AppContext::new(Arc::new(PgStore::new(pool)), settings);
    let app = web::router(ctx).layer(session_layer);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    tracing::info!("Server listening on {}", address);

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
