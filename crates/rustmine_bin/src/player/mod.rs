mod connection;
mod keepalive;
mod play_state;

use std::fmt::{self, Display};

use uuid::Uuid;

pub use connection::Connection;
pub use keepalive::KeepaliveLedger;
pub use play_state::PlaySession;

/// Offline-mode identity: a v3 UUID of the nil namespace over
/// `OfflinePlayer:<name>`. Deterministic, stable across restarts.
pub fn uuid_offline(name: &str) -> Uuid {
    Uuid::new_v3(&Uuid::nil(), format!("OfflinePlayer:{name}").as_bytes())
}

/// Player position and view direction, updated from movement packets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x:         f64,
    pub y:         f64,
    pub z:         f64,
    pub yaw:       f32,
    pub pitch:     f32,
    pub on_ground: bool,
}

impl Default for Pose {
    fn default() -> Self {
        // Where the initial position sync places the client.
        Self {
            x:         0.5,
            y:         65.0,
            z:         0.5,
            yaw:       0.0,
            pitch:     0.0,
            on_ground: false,
        }
    }
}

impl Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_uuid_pinned_literal() {
        let expect = "2e5dcd13-3805-3256-b49c-819167bf4871".parse::<Uuid>().unwrap();
        assert_eq!(uuid_offline("Player"), expect);
        assert_eq!(
            uuid_offline("Player"),
            Uuid::new_v3(&Uuid::nil(), b"OfflinePlayer:Player")
        );
    }

    #[test]
    fn test_offline_uuid_is_deterministic_and_distinct() {
        assert_eq!(uuid_offline("Steve"), uuid_offline("Steve"));
        assert_ne!(uuid_offline("Steve"), uuid_offline("Alex"));
    }
}
