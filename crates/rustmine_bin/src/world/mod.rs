mod region;

pub use region::{ChunkEntry, RegionError, RegionHeader};
