use serde_json::Value;

use crate::nbt::{NbtError, Tag, TagId};

/// Map a JSON tree onto NBT with a fixed, bit-stable rule set:
///
/// | JSON | NBT |
/// |---|---|
/// | object | Compound (insertion order kept) |
/// | array | List, element tag taken from the first element |
/// | bool | Byte (1/0) |
/// | integer | Int |
/// | float | Float |
/// | string | String |
///
/// Mixed-type arrays, nulls, and integers outside the i32 range have no
/// mapping and are rejected.
pub fn json_to_nbt(value: &Value) -> Result<Tag, NbtError> {
    Ok(match value {
        Value::Object(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (key, child) in map {
                entries.push((key.clone(), json_to_nbt(child)?));
            }
            Tag::Compound(entries)
        }
        Value::Array(values) => {
            let mut items = Vec::with_capacity(values.len());
            for child in values {
                items.push(json_to_nbt(child)?);
            }
            let elem = match items.first() {
                Some(first) => first.id(),
                None => TagId::End,
            };
            if items.iter().any(|item| item.id() != elem) {
                return Err(NbtError::MixedListTypes);
            }
            Tag::List { elem, items }
        }
        Value::Bool(b) => Tag::Byte(i8::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                let i = i32::try_from(i).map_err(|_| NbtError::UnsupportedValue)?;
                Tag::Int(i)
            } else if let Some(f) = n.as_f64() {
                Tag::Float(f as f32)
            } else {
                return Err(NbtError::UnsupportedValue);
            }
        }
        Value::String(s) => Tag::String(s.clone()),
        Value::Null => return Err(NbtError::UnsupportedValue),
    })
}
