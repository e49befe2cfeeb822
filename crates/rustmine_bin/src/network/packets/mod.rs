//! The packet vocabulary, one tagged variant per direction. Ids and field
//! layouts follow protocol 771 (the 1.21.x client series).

mod clientbound;
mod serverbound;

pub use clientbound::{ChunkData, ClientBound, JoinGame, PlayerInfoEntry};
pub use serverbound::{ClientSettings, NextState, ServerBound};
