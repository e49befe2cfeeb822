use std::time::Duration;

/// Protocol number of the 1.21.x client series.
pub const NETWORK_PROTOCOL_VERSION: i32 = 771;

/// Hard cap on a single frame, before and after decompression.
pub const NETWORK_MAX_FRAME_BYTES: usize = 2 * 1024 * 1024;

/// How often the server pings a play-phase client.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// How long more than one ping may stay unanswered before the
/// connection is declared dead.
pub const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Keepalive ids are drawn from `[1, KEEPALIVE_ID_MAX)`.
pub const KEEPALIVE_ID_MAX: i64 = 1 << 31;

pub const DIMENSION_OVERWORLD: &str = "minecraft:overworld";

pub const BRAND_CHANNEL: &str = "minecraft:brand";
pub const BRAND_NAME: &str = "CustomServer";

/// Client view distance is clamped into this range when stored.
pub const VIEW_DISTANCE_MIN: i8 = 2;
pub const VIEW_DISTANCE_MAX: i8 = 32;

/// Teleport id of the initial position sync; the client echoes it back.
pub const INITIAL_TELEPORT_ID: i32 = 1;
