//! Process-local [`LobbyStore`] used for development and tests.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    lobby_store::LobbyStore,
    models::{LobbyEntity, LobbyListItemEntity},
    storage::StorageResult,
};

/// Lobbies kept in a concurrent map; nothing survives a restart.
#[derive(Clone, Default)]
pub struct MemoryLobbyStore {
    lobbies: Arc<DashMap<Uuid, LobbyEntity>>,
}

impl MemoryLobbyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LobbyStore for MemoryLobbyStore {
    fn save_lobby(&self, lobby: LobbyEntity) -> BoxFuture<'static, StorageResult<()>> {
        let lobbies = self.lobbies.clone();
        Box::pin(async move {
            lobbies.insert(lobby.id, lobby);
            Ok(())
        })
    }

    fn find_lobby(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<LobbyEntity>>> {
        let lobbies = self.lobbies.clone();
        Box::pin(async move { Ok(lobbies.get(&id).map(|entry| entry.value().clone())) })
    }

    fn list_lobbies(&self) -> BoxFuture<'static, StorageResult<Vec<LobbyListItemEntity>>> {
        let lobbies = self.lobbies.clone();
        Box::pin(async move {
            let mut items = lobbies
                .iter()
                .map(|entry| entry.value().clone().into())
                .collect::<Vec<LobbyListItemEntity>>();
            items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(items)
        })
    }

    fn delete_lobby(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let lobbies = self.lobbies.clone();
        Box::pin(async move { Ok(lobbies.remove(&id).is_some()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::dao::models::{GameModeEntity, ParticipantEntity};

    fn lobby(created_at: SystemTime) -> LobbyEntity {
        let host = Uuid::new_v4();
        LobbyEntity {
            id: Uuid::new_v4(),
            host_id: host,
            category: Some("indie".into()),
            max_rounds: 3,
            game_mode: GameModeEntity::MultiDevice,
            created_at,
            updated_at: created_at,
            participants: vec![ParticipantEntity {
                id: host,
                name: "host".into(),
                avatar_url: None,
                joined_at: created_at,
            }],
            songs: Vec::new(),
            ratings: Vec::new(),
        }
    }

    #[tokio::test]
    async fn save_find_and_delete() {
        let store = MemoryLobbyStore::new();
        let entity = lobby(SystemTime::now());
        let id = entity.id;

        store.save_lobby(entity.clone()).await.unwrap();
        assert_eq!(store.find_lobby(id).await.unwrap(), Some(entity));

        assert!(store.delete_lobby(id).await.unwrap());
        assert!(!store.delete_lobby(id).await.unwrap());
        assert_eq!(store.find_lobby(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let store = MemoryLobbyStore::new();
        let now = SystemTime::now();
        let older = lobby(now - Duration::from_secs(60));
        let newer = lobby(now);

        store.save_lobby(older.clone()).await.unwrap();
        store.save_lobby(newer.clone()).await.unwrap();

        let ids = store
            .list_lobbies()
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![newer.id, older.id]);
    }
}
