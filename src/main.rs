//! Empatify Back binary entrypoint wiring REST, SSE, Spotify and the lobby store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "couch-store")]
use empatify_back::dao::lobby_store::couchdb::{CouchConfig, CouchLobbyStore};
use empatify_back::{
    config::AppConfig,
    dao::{
        lobby_store::{LobbyStore, memory::MemoryLobbyStore},
        storage::StorageError,
    },
    routes,
    services::{
        spotify::{SpotifyClient, SpotifyConfig, TokenCache},
        storage_supervisor,
    },
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let spotify = build_spotify_client()?;
    let app_state = AppState::with_spotify(config, spotify);

    spawn_storage_supervisor(app_state.clone())?;
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

fn build_spotify_client() -> anyhow::Result<Option<SpotifyClient>> {
    let Some(config) = SpotifyConfig::from_env() else {
        warn!("SPOTIFY_CLIENT_ID/SPOTIFY_CLIENT_SECRET not set; spotify endpoints disabled");
        return Ok(None);
    };

    let client = SpotifyClient::new(config, Arc::new(TokenCache::new()))
        .context("building spotify client")?;
    Ok(Some(client))
}

/// Start the background task that installs the configured lobby store.
///
/// `STORAGE_BACKEND` selects `couch` (default when compiled in) or `memory`.
fn spawn_storage_supervisor(state: SharedState) -> anyhow::Result<()> {
    let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| default_backend().to_owned());

    match backend.as_str() {
        "memory" => {
            info!("using in-memory lobby store; lobbies are lost on restart");
            let store = MemoryLobbyStore::new();
            tokio::spawn(storage_supervisor::run(state, move || {
                let store = store.clone();
                async move { Ok::<Arc<dyn LobbyStore>, StorageError>(Arc::new(store)) }
            }));
        }
        #[cfg(feature = "couch-store")]
        "couch" | "couchdb" => {
            let couch = CouchConfig::from_env().context("reading CouchDB configuration")?;
            info!(base_url = %couch.base_url, database = %couch.database, "using CouchDB lobby store");
            tokio::spawn(storage_supervisor::run(state, move || {
                let couch = couch.clone();
                async move {
                    let store = CouchLobbyStore::connect(couch)
                        .await
                        .map_err(StorageError::from)?;
                    Ok::<Arc<dyn LobbyStore>, StorageError>(Arc::new(store))
                }
            }));
        }
        other => bail!("unsupported STORAGE_BACKEND `{other}`"),
    }

    Ok(())
}

fn default_backend() -> &'static str {
    if cfg!(feature = "couch-store") {
        "couch"
    } else {
        "memory"
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
