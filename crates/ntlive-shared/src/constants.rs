/// Discriminant carried in the `channelId` field of gift frames.
pub const GIFT_CHANNEL_ID: &str = "gift";

/// Data-channel topic used by the chat codec.
pub const CHAT_TOPIC: &str = "lk-chat-topic";

/// Identifier of the only gift currently offered.
pub const DEFAULT_GIFT_ID: &str = "gift";

/// Points debited per gift.
pub const GIFT_COST: i64 = 10;

/// Text broadcast automatically once the chat send path is ready.
pub const JOIN_ANNOUNCEMENT: &str = "加入了直播間";

/// Delay between the chat becoming ready and the join announcement.
pub const DEFAULT_JOIN_DELAY_MS: u64 = 3_000;

/// Room list polling interval.
pub const DEFAULT_ROOM_POLL_MS: u64 = 5_000;

/// Default API origin for local development.
pub const DEFAULT_API_BASE: &str = "http://localhost:3000";

/// HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

/// Locale used when none is configured.
pub const DEFAULT_LOCALE: &str = "en-US";
