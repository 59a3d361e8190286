//! Polling client that keeps a local, evaluated view of one lobby.

mod watcher;

pub use self::watcher::{LobbyView, LobbyWatcher, WatchError};
