mod column;

pub use column::{column_data, heightmap};
