//! Headless live-room client.
//!
//! Joins an in-process room as the user named by `NTLIVE_USER_ID` /
//! `NTLIVE_USER_NAME` and reads commands from stdin:
//!
//! - `/gift` sends the default gift
//! - `/rooms` prints the live rooms
//! - `/me` prints the profile summary
//! - `/quit` leaves
//!
//! Any other line is sent as chat. Live events are printed as JSON.

use std::sync::Arc;

use ntlive_client::loopback::LoopbackRoom;
use ntlive_client::{
    visible_rooms, AuthSession, ClientConfig, DirectoryProvider, HttpApi, LiveRoom,
    ProfileSummary, RoomListPoller, RoomServices, SessionUser, TransportSession,
};
use ntlive_shared::Participant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ntlive_client::init_tracing();

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    let identity = std::env::var("NTLIVE_USER_ID").unwrap_or_else(|_| "guest".to_string());
    let name = std::env::var("NTLIVE_USER_NAME").unwrap_or_else(|_| identity.clone());
    let room = std::env::args().nth(1).unwrap_or_else(|| identity.clone());
    let auth = AuthSession::signed_in(SessionUser {
        name: name.clone(),
        email: std::env::var("NTLIVE_USER_EMAIL").ok(),
        image: None,
    });

    // -----------------------------------------------------------------------
    // Collaborators
    // -----------------------------------------------------------------------
    let api = Arc::new(HttpApi::new(&config)?);
    let provider = Arc::new(DirectoryProvider::new(api.clone()));
    if provider.refresh().await.is_err() {
        info!("Continuing with an empty user directory");
    }
    let directory = provider.directory();

    let hub = LoopbackRoom::new(room.clone());
    let session: Arc<dyn TransportSession> = hub.join(Participant::new(identity, name.clone()));

    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "Failed to serialize event"),
            }
        }
    });

    let live = LiveRoom::join(
        room,
        session,
        auth.authenticated,
        RoomServices {
            directory: directory.clone(),
            api: api.clone(),
            revalidator: provider.clone(),
        },
        Arc::new(tx),
        &config,
    );
    let poller = RoomListPoller::spawn(api.clone(), name, config.room_poll_interval);

    // -----------------------------------------------------------------------
    // Input loop
    // -----------------------------------------------------------------------
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        };
        let Some(line) = line else { break };

        match line.trim() {
            "/quit" => break,
            "/gift" => match live.send_gift().await {
                Ok(ticket) => info!(balance = ticket.balance, "Gift sent"),
                Err(e) => warn!(error = %e, "Gift not sent"),
            },
            "/rooms" => {
                for row in visible_rooms(&poller.rooms(), &directory) {
                    let owner = row.owner_name.as_deref().unwrap_or(&row.id);
                    println!("{} {} ({} watching)", row.href, owner, row.participants);
                }
            }
            "/me" => match ProfileSummary::resolve(&auth, &directory) {
                Some(profile) => println!("{}", serde_json::to_string(&profile)?),
                None => println!("Not signed in"),
            },
            text => {
                if let Err(e) = live.submit(text).await {
                    warn!(error = %e, "Chat message not sent");
                }
            }
        }
    }

    info!(room = %live.name(), "Leaving live room");
    Ok(())
}
