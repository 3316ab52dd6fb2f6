use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shellac_core::{AlbumRepository, RedisStore};
use shellac_server::{
    infra::{app_state::AppState, config::ConfigLoader},
    routes,
};

#[derive(Debug, Parser)]
#[command(name = "shellac-server", about = "Album catalog service")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listen address from the configuration
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(
                        "info,shellac_server=debug,shellac_core=debug",
                    )
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = args.config {
        loader = loader.with_config_path(path);
    }
    let mut config = loader.load().context("failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    let store = RedisStore::connect(&config.redis.url, config.redis.pool_size)
        .await
        .context("failed to connect to the album store")?;
    let repository = AlbumRepository::new(Arc::new(store))
        .with_top_retry_limit(config.catalog.top_retry_limit);

    let bind = config.server.bind;
    let state = AppState::new(Arc::new(repository), Arc::new(config));
    let app = routes::create_router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!("listening on {bind}");
    axum::serve(listener, app).await?;

    Ok(())
}
