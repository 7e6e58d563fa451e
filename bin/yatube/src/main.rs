//! # Yatube Binary
//!
//! The entry point that assembles the application from the plugins enabled
//! at compile time.

use std::time::Duration;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use secrecy::ExposeSecret;
use yt_api::handlers::{self, AppState};
use yt_api::{configure_routes, middleware};
use yt_config::Settings;
use yt_core::cache::PageCache;

#[cfg(feature = "db-sqlite")]
use yt_db_sqlite::SqliteStore;

#[cfg(feature = "auth-simple")]
use yt_auth_simple::SimpleAuthProvider;

#[cfg(feature = "storage-local")]
use yt_storage_local::LocalMediaStore;

/// URL prefix uploaded pictures are served under.
const MEDIA_URL: &str = "/media";

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::load().context("failed to load settings")?;

    // 1. Storage
    #[cfg(feature = "db-sqlite")]
    let repo = SqliteStore::new(&settings.database_url)
        .await
        .with_context(|| format!("failed to open {}", settings.database_url))?;

    // 2. Identity
    #[cfg(feature = "auth-simple")]
    let auth = SimpleAuthProvider::new(
        settings.session_secret.expose_secret(),
        chrono::Duration::hours(settings.session_ttl_hours),
    );

    // 3. Media
    #[cfg(feature = "storage-local")]
    let media = LocalMediaStore::new(&settings.media_dir, MEDIA_URL);

    // 4. Shared state (dynamic dispatch over the enabled plugins)
    let state = web::Data::new(AppState::new(
        Box::new(repo),
        Box::new(auth),
        Box::new(media),
        PageCache::new(Duration::from_secs(settings.index_cache_ttl_secs)),
        settings.posts_per_page,
        settings.rating_delta,
    ));

    std::fs::create_dir_all(&settings.media_dir)
        .with_context(|| format!("failed to create {}", settings.media_dir))?;
    let media_dir = settings.media_dir.clone();

    log::info!("Yatube starting on http://{}", settings.bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::cors_policy())
            .wrap(middleware::security_headers())
            .wrap(middleware::standard_middleware())
            .configure(configure_routes)
            .service(actix_files::Files::new(MEDIA_URL, &media_dir))
            .default_service(web::route().to(handlers::not_found))
    })
    .bind(&settings.bind_addr)
    .with_context(|| format!("failed to bind {}", settings.bind_addr))?
    .run()
    .await?;

    Ok(())
}
