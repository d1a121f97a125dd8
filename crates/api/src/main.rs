use std::sync::Arc;

use anyhow::Context;

use storefront_api::app::{AppServices, Paging, build_app};
use storefront_infra::config::{AppConfig, LogFormat};
use storefront_infra::file_storage::InMemoryFileStorage;
use storefront_infra::store::{InMemoryStore, PostgresStore, Store};
use storefront_observability::OutputFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    storefront_observability::init_with(match config.log_format {
        LogFormat::Json => OutputFormat::Json,
        LogFormat::Pretty => OutputFormat::Pretty,
    });

    if config.jwt_secret_is_default {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) => {
            let store = PostgresStore::connect(url, config.database_max_connections)
                .await
                .context("failed to connect to database")?;
            store.migrate().await.context("failed to apply schema")?;
            tracing::info!(max_connections = config.database_max_connections, "using postgres store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    let services = AppServices::new(
        store,
        Arc::new(InMemoryFileStorage::new()),
        Paging {
            default_size: config.default_page_size,
            max_size: config.max_page_size,
        },
    );
    let app = build_app(services, config.jwt_secret);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
