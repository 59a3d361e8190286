use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::services::spotify::ApiTrack;

/// Query string accepted by `GET /spotify/search`.
#[derive(Debug, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Free-text search, e.g. an artist or a title.
    #[validate(length(min = 1, max = 200))]
    pub q: String,
    /// Maximum number of tracks returned (1 to 50, default 10).
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<u8>,
}

impl SearchQuery {
    pub const DEFAULT_LIMIT: u8 = 10;

    pub fn limit(&self) -> u8 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }
}

/// Track metadata exposed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackSummary {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album: Option<String>,
    /// Cover art, largest first as returned by Spotify.
    pub image_url: Option<String>,
    /// 30 second MP3 preview, not available for every track.
    pub preview_url: Option<String>,
    pub duration_ms: u64,
    /// Link opening the track in Spotify.
    pub external_url: Option<String>,
}

impl From<ApiTrack> for TrackSummary {
    fn from(track: ApiTrack) -> Self {
        let (album, image_url) = match track.album {
            Some(album) => {
                let image = album.images.into_iter().next().map(|image| image.url);
                (Some(album.name), image)
            }
            None => (None, None),
        };

        Self {
            id: track.id,
            name: track.name,
            artists: track.artists.into_iter().map(|artist| artist.name).collect(),
            album,
            image_url,
            preview_url: track.preview_url,
            duration_ms: track.duration_ms,
            external_url: track.external_urls.spotify,
        }
    }
}
