use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dao::{
    lobby_store::couchdb::error::CouchDaoError,
    models::{GameModeEntity, LobbyEntity, ParticipantEntity, RatingEntity, SongEntity},
};

pub const LOBBY_PREFIX: &str = "lobby::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Revision metadata returned when only `_rev` matters.
#[derive(Debug, Deserialize)]
pub struct RevisionOnly {
    #[serde(rename = "_rev")]
    pub rev: String,
}

/// A whole lobby aggregate stored as one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchLobbyDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub lobby: LobbyBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyBody {
    pub host_id: Uuid,
    #[serde(default)]
    pub category: Option<String>,
    pub max_rounds: u32,
    pub game_mode: GameModeEntity,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub participants: Vec<ParticipantEntity>,
    #[serde(default)]
    pub songs: Vec<SongEntity>,
    #[serde(default)]
    pub ratings: Vec<RatingEntity>,
}

impl From<(LobbyEntity, Option<String>)> for CouchLobbyDocument {
    fn from((lobby, rev): (LobbyEntity, Option<String>)) -> Self {
        Self {
            id: lobby_doc_id(lobby.id),
            rev,
            lobby: LobbyBody {
                host_id: lobby.host_id,
                category: lobby.category,
                max_rounds: lobby.max_rounds,
                game_mode: lobby.game_mode,
                created_at: lobby.created_at,
                updated_at: lobby.updated_at,
                participants: lobby.participants,
                songs: lobby.songs,
                ratings: lobby.ratings,
            },
        }
    }
}

impl TryFrom<CouchLobbyDocument> for LobbyEntity {
    type Error = CouchDaoError;

    fn try_from(doc: CouchLobbyDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: extract_uuid(&doc.id)?,
            host_id: doc.lobby.host_id,
            category: doc.lobby.category,
            max_rounds: doc.lobby.max_rounds,
            game_mode: doc.lobby.game_mode,
            created_at: doc.lobby.created_at,
            updated_at: doc.lobby.updated_at,
            participants: doc.lobby.participants,
            songs: doc.lobby.songs,
            ratings: doc.lobby.ratings,
        })
    }
}

pub fn lobby_doc_id(id: Uuid) -> String {
    format!("{}{}", LOBBY_PREFIX, id)
}

pub fn extract_uuid(doc_id: &str) -> Result<Uuid, CouchDaoError> {
    let (_, id) = doc_id
        .split_once("::")
        .ok_or_else(|| CouchDaoError::InvalidDocId {
            doc_id: doc_id.to_string(),
            kind: "missing separator",
        })?;

    Uuid::parse_str(id).map_err(|_| CouchDaoError::InvalidDocId {
        doc_id: doc_id.to_string(),
        kind: "invalid UUID",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_id_round_trips_through_extract() {
        let id = Uuid::new_v4();
        assert_eq!(extract_uuid(&lobby_doc_id(id)).unwrap(), id);
    }

    #[test]
    fn malformed_doc_ids_are_rejected() {
        assert!(matches!(
            extract_uuid("lobby-123"),
            Err(CouchDaoError::InvalidDocId {
                kind: "missing separator",
                ..
            })
        ));
        assert!(matches!(
            extract_uuid("lobby::not-a-uuid"),
            Err(CouchDaoError::InvalidDocId {
                kind: "invalid UUID",
                ..
            })
        ));
    }

    #[test]
    fn document_keeps_revision_out_of_new_documents() {
        let host = Uuid::new_v4();
        let now = SystemTime::now();
        let entity = LobbyEntity {
            id: Uuid::new_v4(),
            host_id: host,
            category: None,
            max_rounds: 2,
            game_mode: GameModeEntity::SingleDevice,
            created_at: now,
            updated_at: now,
            participants: Vec::new(),
            songs: Vec::new(),
            ratings: Vec::new(),
        };

        let doc = CouchLobbyDocument::from((entity.clone(), None));
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("_rev").is_none());
        assert_eq!(json["_id"], lobby_doc_id(entity.id));
        assert_eq!(json["game_mode"], "single_device");

        let back = LobbyEntity::try_from(doc).unwrap();
        assert_eq!(back, entity);
    }
}
