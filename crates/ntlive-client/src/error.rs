use ntlive_shared::ProtocolError;
use thiserror::Error;

/// Top-level error for the live-room client.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Gift error: {0}")]
    Gift(#[from] GiftError),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transport session is closed")]
    Closed,

    #[error("Publish failed: {0}")]
    Publish(String),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {url} returned status {status}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GiftError {
    #[error("Local participant identity is not known yet")]
    IdentityUnknown,

    #[error("Gifts are not available in this room")]
    NotAvailable,

    #[error("Insufficient points: balance {balance}, gift costs {cost}")]
    InsufficientPoints { balance: i64, cost: i64 },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
