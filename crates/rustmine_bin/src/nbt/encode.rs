use crate::nbt::{MAX_NAME_LEN, NbtError, Tag, TagId};

/// Encode one named top-level tag: `u8 id · u16 name-length · name · payload`.
///
/// Network NBT uses this with the empty name, so every packet-embedded
/// compound starts `0A 00 00`.
pub fn to_named_bytes(name: &str, tag: &Tag) -> Result<Vec<u8>, NbtError> {
    let mut out = Vec::new();
    out.push(tag.id() as u8);
    write_name(&mut out, name)?;
    write_payload(&mut out, tag)?;
    Ok(out)
}

fn write_name(out: &mut Vec<u8>, name: &str) -> Result<(), NbtError> {
    if name.len() > MAX_NAME_LEN {
        return Err(NbtError::NameTooLong(name.len()));
    }
    out.extend_from_slice(&(name.len() as u16).to_be_bytes());
    out.extend_from_slice(name.as_bytes());
    Ok(())
}

fn write_payload(out: &mut Vec<u8>, tag: &Tag) -> Result<(), NbtError> {
    match tag {
        Tag::End => {}
        Tag::Byte(v) => out.push(*v as u8),
        Tag::Short(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Float(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Double(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::ByteArray(v) => {
            out.extend_from_slice(&(v.len() as i32).to_be_bytes());
            out.extend_from_slice(v);
        }
        Tag::String(v) => {
            // String payloads share the u16 length framing of names.
            let len = u16::try_from(v.len()).map_err(|_| NbtError::NameTooLong(v.len()))?;
            out.extend_from_slice(&len.to_be_bytes());
            out.extend_from_slice(v.as_bytes());
        }
        Tag::List { elem, items } => {
            for item in items {
                if item.id() != *elem {
                    return Err(NbtError::MixedListTypes);
                }
            }
            out.push(*elem as u8);
            out.extend_from_slice(&(items.len() as i32).to_be_bytes());
            for item in items {
                write_payload(out, item)?;
            }
        }
        Tag::Compound(entries) => {
            for (name, child) in entries {
                out.push(child.id() as u8);
                write_name(out, name)?;
                write_payload(out, child)?;
            }
            out.push(TagId::End as u8);
        }
        Tag::IntArray(v) => {
            out.extend_from_slice(&(v.len() as i32).to_be_bytes());
            for n in v {
                out.extend_from_slice(&n.to_be_bytes());
            }
        }
        Tag::LongArray(v) => {
            out.extend_from_slice(&(v.len() as i32).to_be_bytes());
            for n in v {
                out.extend_from_slice(&n.to_be_bytes());
            }
        }
    }
    Ok(())
}
