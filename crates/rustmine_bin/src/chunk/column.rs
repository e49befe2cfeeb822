//! Synthesized chunk content: an all-air 24-section column and a flat
//! heightmap. The Chunk Data packet carries both opaquely.

use crate::nbt::{Tag, TagId};
use crate::network::protocol::write_varint;

/// Sections per column, spanning build heights -64 to 320.
const SECTION_COUNT: i32 = 24;

/// Biomes per section: a 4x4x4 grid.
const BIOMES_PER_SECTION: usize = 64;

/// Heightmap entries pack seven 9-bit heights per long; 37 longs cover the
/// 256 columns of a chunk.
const HEIGHTMAP_LONGS: usize = 37;
const HEIGHTS_PER_LONG: u32 = 7;
const HEIGHT_BITS: u32 = 9;

/// Ground level reported for every column.
const SURFACE_HEIGHT: i64 = 64;

/// Build the column payload for an empty chunk: every section all air with a
/// single-entry palette, one biome, and empty light data.
pub fn column_data() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&write_varint(SECTION_COUNT));

    for _ in 0..SECTION_COUNT {
        // Non-air block count.
        out.extend_from_slice(&0i16.to_be_bytes());

        // Block states: single-entry palette holding air, no data array.
        out.extend_from_slice(&write_varint(1));
        out.extend_from_slice(&write_varint(0));
        out.extend_from_slice(&write_varint(0));

        // Biome grid, one id per cell.
        let mut biomes = Vec::with_capacity(BIOMES_PER_SECTION);
        for _ in 0..BIOMES_PER_SECTION {
            biomes.extend_from_slice(&write_varint(0));
        }
        out.extend_from_slice(&write_varint(biomes.len() as i32));
        out.extend_from_slice(&biomes);

        // Light: no sky or block data, every section flagged empty.
        out.extend_from_slice(&write_varint(0));
        out.extend_from_slice(&write_varint(0));
        out.extend_from_slice(&write_varint(0xFFFF_FFFFu32 as i32));
        out.extend_from_slice(&write_varint(0xFFFF_FFFFu32 as i32));
        out.extend_from_slice(&write_varint(0));
    }

    // No block entities, untrusted edges, empty light update lists.
    out.extend_from_slice(&write_varint(0));
    out.push(0x00);
    out.extend_from_slice(&write_varint(0));
    out.extend_from_slice(&write_varint(0));

    out
}

/// Heightmap compound for the same flat column: `MOTION_BLOCKING` and
/// `WORLD_SURFACE`, each a long-array wrapper with every height at ground
/// level.
pub fn heightmap() -> Tag {
    let longs = packed_height_longs();
    let entry = || {
        Tag::Compound(vec![
            ("type".to_string(), Tag::String("LONG_ARRAY".to_string())),
            (
                "value".to_string(),
                Tag::List {
                    elem:  TagId::Long,
                    items: longs.iter().map(|v| Tag::Long(*v)).collect(),
                },
            ),
        ])
    };

    Tag::Compound(vec![
        ("MOTION_BLOCKING".to_string(), entry()),
        ("WORLD_SURFACE".to_string(), entry()),
    ])
}

fn packed_height_longs() -> Vec<i64> {
    let mut word = 0i64;
    for slot in 0..HEIGHTS_PER_LONG {
        word |= SURFACE_HEIGHT << (slot * HEIGHT_BITS);
    }
    vec![word; HEIGHTMAP_LONGS]
}
