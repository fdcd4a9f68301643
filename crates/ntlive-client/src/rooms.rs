//! Room list polling and the rows it renders to.

use std::sync::Arc;
use std::time::Duration;

use ntlive_shared::Room;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::api::LiveApi;
use crate::directory::UserDirectory;
use crate::session::AuthSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRow {
    /// Owner user id, which is also the room name.
    pub id: String,
    pub owner_name: Option<String>,
    pub participants: u32,
    pub href: String,
}

/// Rooms with at least one participant, owner names resolved.
pub fn visible_rooms(rooms: &[Room], directory: &UserDirectory) -> Vec<RoomRow> {
    rooms
        .iter()
        .filter(|room| room.is_live())
        .map(|room| RoomRow {
            id: room.name.clone(),
            owner_name: directory.find_by_id(&room.name).map(|u| u.name),
            participants: room.num_participants,
            href: room_path(&room.name),
        })
        .collect()
}

/// Path of the signed-in user's own room.
pub fn create_room_target(session: &AuthSession, directory: &UserDirectory) -> Option<String> {
    let user = session.user()?;
    directory.find_by_name(&user.name).map(|u| room_path(&u.id))
}

fn room_path(id: &str) -> String {
    format!("/{id}")
}

/// Fetches the room list right away and then on every interval tick.
pub struct RoomListPoller {
    rx: watch::Receiver<Vec<Room>>,
    task: JoinHandle<()>,
}

impl RoomListPoller {
    pub fn spawn(api: Arc<dyn LiveApi>, user: impl Into<String>, every: Duration) -> Self {
        let (tx, rx) = watch::channel(Vec::new());
        let task = tokio::spawn(poll_loop(api, user.into(), every, tx));
        Self { rx, task }
    }

    pub fn rooms(&self) -> Vec<Room> {
        self.rx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Vec<Room>> {
        self.rx.clone()
    }
}

impl Drop for RoomListPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn poll_loop(api: Arc<dyn LiveApi>, user: String, every: Duration, tx: watch::Sender<Vec<Room>>) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match api.list_rooms(&user).await {
            Ok(rooms) => {
                debug!(user = %user, count = rooms.len(), "Room list updated");
                tx.send_replace(rooms);
            }
            Err(e) => {
                warn!(user = %user, error = %e, "Room list fetch failed");
            }
        }
    }
}
