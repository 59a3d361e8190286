use std::time::Duration;

use futures::Stream;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    config::{AppConfig, MIN_POLL_INTERVAL},
    dto::lobby::LobbyStateResponse,
    routes::identity::USER_ID_HEADER,
    state::completion::{self, Evaluation},
};

/// Failures of a single poll. The stream keeps running after any of them.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to build http client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    #[error("lobby request failed")]
    Request {
        #[source]
        source: reqwest::Error,
    },
    #[error("server answered {0}")]
    Status(StatusCode),
    #[error("failed to decode lobby snapshot")]
    Decode {
        #[source]
        source: reqwest::Error,
    },
}

/// One poll result: the raw snapshot plus the locally derived evaluation.
#[derive(Debug, Clone)]
pub struct LobbyView {
    pub snapshot: LobbyStateResponse,
    pub evaluation: Evaluation,
}

impl LobbyView {
    /// Build a view by re-running the evaluator over the snapshot's raw arrays.
    pub fn from_snapshot(snapshot: LobbyStateResponse) -> Self {
        let evaluation = completion::evaluate(
            snapshot.lobby.max_rounds,
            &snapshot.participants,
            &snapshot.songs,
            &snapshot.ratings,
        );
        Self {
            snapshot,
            evaluation,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.evaluation.is_finished
    }

    /// `false` when the server and the local evaluation disagree on completion.
    pub fn agrees_with_server(&self) -> bool {
        self.snapshot.is_finished == self.evaluation.is_finished
    }
}

/// Polls `GET /lobbies/{id}` on a fixed interval.
#[derive(Debug, Clone)]
pub struct LobbyWatcher {
    http: Client,
    base_url: String,
    lobby_id: Uuid,
    user_id: Uuid,
    interval: Duration,
}

impl LobbyWatcher {
    /// Watch `lobby_id` as `user_id`, polling at the configured `poll_interval`.
    pub fn new(
        base_url: impl Into<String>,
        lobby_id: Uuid,
        user_id: Uuid,
        config: &AppConfig,
    ) -> Result<Self, WatchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|source| WatchError::ClientBuilder { source })?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            lobby_id,
            user_id,
            interval: config.poll_interval.max(MIN_POLL_INTERVAL),
        })
    }

    /// Override the poll interval; values below [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fetch and evaluate the lobby once.
    pub async fn fetch_once(&self) -> Result<LobbyView, WatchError> {
        let url = format!("{}/lobbies/{}", self.base_url, self.lobby_id);
        let response = self
            .http
            .get(&url)
            .header(USER_ID_HEADER, self.user_id.to_string())
            .send()
            .await
            .map_err(|source| WatchError::Request { source })?;

        if !response.status().is_success() {
            return Err(WatchError::Status(response.status()));
        }

        let snapshot = response
            .json::<LobbyStateResponse>()
            .await
            .map_err(|source| WatchError::Decode { source })?;

        let view = LobbyView::from_snapshot(snapshot);
        if !view.agrees_with_server() {
            warn!(
                lobby_id = %self.lobby_id,
                server = view.snapshot.is_finished,
                local = view.evaluation.is_finished,
                "server and local completion state disagree"
            );
        }
        Ok(view)
    }

    /// Poll forever, starting immediately. Dropping the stream stops the polling.
    ///
    /// Every tick is an independent fetch; errors are yielded and polling goes on.
    pub fn into_stream(self) -> impl Stream<Item = Result<LobbyView, WatchError>> {
        async_stream::stream! {
            let mut ticker = interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let result = self.fetch_once().await;
                match &result {
                    Ok(view) => debug!(
                        lobby_id = %self.lobby_id,
                        finished = view.is_finished(),
                        "lobby polled"
                    ),
                    Err(err) => warn!(lobby_id = %self.lobby_id, error = %err, "lobby poll failed"),
                }
                yield result;
            }
        }
    }
}
