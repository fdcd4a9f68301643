//! Types shared between the live-room client and anything that speaks its
//! data-channel protocol.

pub mod constants;
pub mod error;
pub mod protocol;
pub mod types;

pub use error::ProtocolError;
pub use protocol::{ChatFrame, Frame, GiftEvent};
pub use types::{ChatMessage, DataPacketKind, Participant, ReceivedChatMessage, Room, User};
