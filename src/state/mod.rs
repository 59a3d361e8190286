pub mod completion;
pub mod lobby;
mod sse;

use std::{future::Future, sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::{
    config::AppConfig, dao::lobby_store::LobbyStore, error::ServiceError,
    services::spotify::SpotifyClient, state::lobby::LobbySession,
};

pub use self::sse::{LobbyHubs, SseHub};

pub type SharedState = Arc<AppState>;
pub const DEFAULT_MUTATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Central application state: configuration, storage handle, per-lobby locks and SSE hubs.
pub struct AppState {
    config: AppConfig,
    lobby_store: RwLock<Option<Arc<dyn LobbyStore>>>,
    degraded: watch::Sender<bool>,
    lobby_locks: DashMap<Uuid, Arc<Mutex<()>>>,
    lobby_hubs: LobbyHubs,
    spotify: Option<SpotifyClient>,
    mutation_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_spotify(config, None)
    }

    /// Same as [`AppState::new`] with an optional Spotify client for track lookups.
    pub fn with_spotify(config: AppConfig, spotify: Option<SpotifyClient>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            lobby_hubs: LobbyHubs::new(config.sse_capacity),
            config,
            lobby_store: RwLock::new(None),
            degraded: degraded_tx,
            lobby_locks: DashMap::new(),
            spotify,
            mutation_timeout: Some(DEFAULT_MUTATION_TIMEOUT),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current lobby store, if one is installed.
    pub async fn lobby_store(&self) -> Option<Arc<dyn LobbyStore>> {
        let guard = self.lobby_store.read().await;
        guard.as_ref().cloned()
    }

    /// Like [`AppState::lobby_store`] but fails with [`ServiceError::Degraded`] when absent.
    pub async fn require_lobby_store(&self) -> Result<Arc<dyn LobbyStore>, ServiceError> {
        self.lobby_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new lobby store implementation and leave degraded mode.
    pub async fn set_lobby_store(&self, store: Arc<dyn LobbyStore>) {
        {
            let mut guard = self.lobby_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current lobby store and enter degraded mode.
    pub async fn clear_lobby_store(&self) {
        {
            let mut guard = self.lobby_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.lobby_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Broadcast hubs keyed by lobby.
    pub fn lobby_hubs(&self) -> &LobbyHubs {
        &self.lobby_hubs
    }

    /// Spotify client, when credentials were provided at startup.
    pub fn spotify(&self) -> Option<&SpotifyClient> {
        self.spotify.as_ref()
    }

    fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    fn lobby_lock(&self, lobby_id: Uuid) -> Arc<Mutex<()>> {
        self.lobby_locks
            .entry(lobby_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lobby's lock entry once no other request holds a handle to it.
    fn release_lobby_lock(&self, lobby_id: Uuid) {
        self.lobby_locks
            .remove_if(&lobby_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Load a lobby, apply `mutate` and persist the result while holding the lobby's lock.
    ///
    /// Writes to the same lobby are serialised; different lobbies proceed in parallel.
    /// Nothing is saved when `mutate` fails. The whole read-modify-write is bounded by
    /// [`DEFAULT_MUTATION_TIMEOUT`].
    pub async fn run_lobby_mutation<F, T>(
        &self,
        lobby_id: Uuid,
        mutate: F,
    ) -> Result<(T, LobbySession), ServiceError>
    where
        F: FnOnce(&mut LobbySession) -> Result<T, ServiceError>,
    {
        let store = self.require_lobby_store().await?;
        let lock = self.lobby_lock(lobby_id);

        let work = async move {
            let _guard = lock.lock().await;
            let mut session = load_session(store.as_ref(), lobby_id).await?;
            let value = mutate(&mut session)?;
            store.save_lobby(session.clone().into()).await?;
            Ok((value, session))
        };

        let result = self.bounded(lobby_id, work).await;
        self.release_lobby_lock(lobby_id);
        result
    }

    /// Delete a lobby under its lock once `authorize` accepted the stored snapshot.
    ///
    /// Returns the last snapshot.
    pub async fn run_lobby_removal<F>(
        &self,
        lobby_id: Uuid,
        authorize: F,
    ) -> Result<LobbySession, ServiceError>
    where
        F: FnOnce(&LobbySession) -> Result<(), ServiceError>,
    {
        let store = self.require_lobby_store().await?;
        let lock = self.lobby_lock(lobby_id);

        let work = async move {
            let _guard = lock.lock().await;
            let session = load_session(store.as_ref(), lobby_id).await?;
            authorize(&session)?;
            if !store.delete_lobby(lobby_id).await? {
                return Err(not_found(lobby_id));
            }
            Ok(session)
        };

        let result = self.bounded(lobby_id, work).await;
        self.release_lobby_lock(lobby_id);
        result
    }

    async fn bounded<T, Fut>(&self, lobby_id: Uuid, work: Fut) -> Result<T, ServiceError>
    where
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        match self.mutation_timeout {
            Some(limit) => match timeout(limit, work).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(%lobby_id, "lobby mutation timed out");
                    Err(ServiceError::Timeout)
                }
            },
            None => work.await,
        }
    }
}

async fn load_session(store: &dyn LobbyStore, lobby_id: Uuid) -> Result<LobbySession, ServiceError> {
    store
        .find_lobby(lobby_id)
        .await?
        .map(LobbySession::from)
        .ok_or_else(|| not_found(lobby_id))
}

fn not_found(lobby_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("lobby `{lobby_id}` not found"))
}
