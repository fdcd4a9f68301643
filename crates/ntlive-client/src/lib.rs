pub mod api;
pub mod chat;
pub mod config;
pub mod controller;
pub mod directory;
pub mod dispatcher;
pub mod entry;
pub mod error;
pub mod events;
pub mod format;
pub mod gift;
pub mod loopback;
pub mod observable;
pub mod room;
pub mod rooms;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

use tracing_subscriber::{fmt, EnvFilter};

pub use api::{HttpApi, LiveApi};
pub use chat::{setup_chat, ChatOptions, ChatSender, ChatSetup};
pub use config::ClientConfig;
pub use controller::ChatController;
pub use directory::{DirectoryProvider, Revalidator, UserDirectory};
pub use dispatcher::GiftDispatcher;
pub use entry::{render_entry, ChatEntryView, LinkAction, MessageFormatter};
pub use error::{ApiError, ClientError, GiftError, Result, TransportError};
pub use events::{EventSink, LiveEvent, TracingSink};
pub use gift::{can_send_gift, GiftFlow, PointBalance};
pub use room::{LiveRoom, RoomServices};
pub use rooms::{create_room_target, visible_rooms, RoomListPoller, RoomRow};
pub use session::{AuthSession, ProfileSummary, SessionUser};
pub use transport::{DataReceived, TransportSession};

/// Install the fmt subscriber. `RUST_LOG` overrides the default filter.
/// Later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ntlive_client=debug,ntlive_shared=info,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
