use std::sync::Arc;

use dharani_backend::{build_router, nagarnigam, AppConfig, AppState, MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load()?;
    log::info!("Loaded config: {:?}", config);

    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(database_url) => {
            let store = PgStore::connect(database_url, config.db_pool_size)?;
            store.run_migrations().await?;
            Arc::new(store)
        }
        None => {
            log::warn!("DATABASE_URL is not set; using the in-memory store, data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    nagarnigam::seed_authority(store.as_ref(), &config).await?;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Starting server on {}", addr);

    let app = build_router(AppState::new(config, store));
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
