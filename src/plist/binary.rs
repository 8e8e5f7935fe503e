//! Binary property list reader (`bplist00`).
//!
//! ## File Format
//! 1. Header: `bplist00` magic
//! 2. Objects: each starts with a marker byte (high nibble = type, low nibble =
//!    size or length, `0xF` meaning "length follows as an integer object")
//! 3. Offset table: big-endian offsets of every object
//! 4. Trailer (32 bytes): offset size, reference size, object count, root
//!    object index, offset table position
//!
//! Only decoding is supported; requests are always written as XML.

use time::OffsetDateTime;

use crate::base::storeerror::StoreError;
use crate::plist::reader::MAX_DEPTH;
use crate::plist::{Dictionary, Value};

/// Magic bytes at the start of a binary property list.
pub const MAGIC: &[u8] = b"bplist00";

const TRAILER_LEN: usize = 32;

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z.
const APPLE_EPOCH_OFFSET: f64 = 978_307_200.0;

/// Parse a binary property list whose root must be a dictionary.
pub fn from_slice(data: &[u8]) -> Result<Dictionary, StoreError> {
    if !data.starts_with(MAGIC) {
        return Err(StoreError::malformed("missing bplist00 magic"));
    }
    if data.len() < MAGIC.len() + TRAILER_LEN {
        return Err(truncated());
    }

    let trailer = &data[data.len() - TRAILER_LEN..];
    let offset_size = usize::from(trailer[6]);
    let ref_size = usize::from(trailer[7]);
    let num_objects = to_usize(read_be(&trailer[8..16]))?;
    let top_object = to_usize(read_be(&trailer[16..24]))?;
    let table_offset = to_usize(read_be(&trailer[24..32]))?;

    if !(1..=8).contains(&offset_size) || !(1..=8).contains(&ref_size) {
        return Err(StoreError::malformed("invalid offset or reference size"));
    }

    let body_end = data.len() - TRAILER_LEN;
    let table_len = num_objects
        .checked_mul(offset_size)
        .ok_or_else(truncated)?;
    let table = data
        .get(table_offset..table_offset.checked_add(table_len).ok_or_else(truncated)?)
        .filter(|_| table_offset + table_len <= body_end)
        .ok_or_else(truncated)?;

    let offsets = table
        .chunks(offset_size)
        .map(|chunk| to_usize(read_be(chunk)))
        .collect::<Result<Vec<_>, _>>()?;

    let document = Document {
        data: &data[..body_end],
        offsets,
        ref_size,
    };

    match document.read_object(top_object, 0)? {
        Value::Dictionary(dict) => Ok(dict),
        _ => Err(StoreError::malformed("root object is not a dictionary")),
    }
}

fn truncated() -> StoreError {
    StoreError::malformed("truncated binary section")
}

fn to_usize(value: u64) -> Result<usize, StoreError> {
    usize::try_from(value).map_err(|_| StoreError::malformed("offset out of range"))
}

/// Read a big-endian unsigned integer of up to 8 bytes.
fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
}

struct Document<'a> {
    data: &'a [u8],
    offsets: Vec<usize>,
    ref_size: usize,
}

impl<'a> Document<'a> {
    fn slice(&self, start: usize, len: usize) -> Result<&'a [u8], StoreError> {
        let end = start.checked_add(len).ok_or_else(truncated)?;
        self.data.get(start..end).ok_or_else(truncated)
    }

    /// Object length from the marker's low nibble or the integer that follows it.
    /// Returns the length and the position of the payload.
    fn length(&self, offset: usize, info: u8) -> Result<(usize, usize), StoreError> {
        if info != 0x0F {
            return Ok((usize::from(info), offset + 1));
        }
        let marker = *self.slice(offset + 1, 1)?.first().ok_or_else(truncated)?;
        if marker >> 4 != 0x1 {
            return Err(StoreError::malformed("invalid length marker"));
        }
        let int_len = 1usize << (marker & 0x0F);
        let value = to_usize(read_be(self.slice(offset + 2, int_len)?))?;
        Ok((value, offset + 2 + int_len))
    }

    fn object_ref(&self, start: usize, index: usize) -> Result<usize, StoreError> {
        let pos = index
            .checked_mul(self.ref_size)
            .and_then(|o| o.checked_add(start))
            .ok_or_else(truncated)?;
        to_usize(read_be(self.slice(pos, self.ref_size)?))
    }

    fn read_object(&self, index: usize, depth: usize) -> Result<Value, StoreError> {
        if depth > MAX_DEPTH {
            return Err(StoreError::malformed("nesting too deep"));
        }
        let offset = *self
            .offsets
            .get(index)
            .ok_or_else(|| StoreError::malformed("object reference out of range"))?;
        let marker = *self.slice(offset, 1)?.first().ok_or_else(truncated)?;
        let info = marker & 0x0F;

        match marker >> 4 {
            0x0 => match info {
                0x8 => Ok(Value::Boolean(false)),
                0x9 => Ok(Value::Boolean(true)),
                _ => Err(StoreError::malformed(format!(
                    "unsupported object marker 0x{marker:02x}"
                ))),
            },
            0x1 => {
                let len = 1usize << info;
                let bytes = self.slice(offset + 1, len)?;
                // 16-byte integers carry the value in their low 8 bytes
                let low = &bytes[bytes.len().saturating_sub(8)..];
                Ok(Value::Integer(read_be(low) as i64))
            }
            0x2 => {
                let len = 1usize << info;
                let bytes = self.slice(offset + 1, len)?;
                match len {
                    4 => Ok(Value::Real(f64::from(f32::from_bits(read_be(bytes) as u32)))),
                    8 => Ok(Value::Real(f64::from_bits(read_be(bytes)))),
                    _ => Err(StoreError::malformed("invalid real size")),
                }
            }
            0x3 => {
                if info != 0x3 {
                    return Err(StoreError::malformed("invalid date marker"));
                }
                let seconds = f64::from_bits(read_be(self.slice(offset + 1, 8)?));
                let nanos = ((seconds + APPLE_EPOCH_OFFSET) * 1e9) as i128;
                OffsetDateTime::from_unix_timestamp_nanos(nanos)
                    .map(Value::Date)
                    .map_err(|_| StoreError::malformed("date out of range"))
            }
            0x4 => {
                let (len, start) = self.length(offset, info)?;
                Ok(Value::Data(self.slice(start, len)?.to_vec()))
            }
            0x5 => {
                let (len, start) = self.length(offset, info)?;
                let bytes = self.slice(start, len)?;
                String::from_utf8(bytes.to_vec())
                    .map(Value::String)
                    .map_err(|_| StoreError::malformed("invalid ASCII string"))
            }
            0x6 => {
                let (len, start) = self.length(offset, info)?;
                let byte_len = len.checked_mul(2).ok_or_else(truncated)?;
                let units: Vec<u16> = self
                    .slice(start, byte_len)?
                    .chunks(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16(&units)
                    .map(Value::String)
                    .map_err(|_| StoreError::malformed("invalid UTF-16 string"))
            }
            0x8 => {
                // UID, surfaced as its integer value
                let bytes = self.slice(offset + 1, usize::from(info) + 1)?;
                Ok(Value::Integer(read_be(bytes) as i64))
            }
            0xA => {
                let (count, start) = self.length(offset, info)?;
                let mut items = Vec::with_capacity(count.min(1024));
                for i in 0..count {
                    let child = self.object_ref(start, i)?;
                    items.push(self.read_object(child, depth + 1)?);
                }
                Ok(Value::Array(items))
            }
            0xD => {
                let (count, start) = self.length(offset, info)?;
                let values_start = count
                    .checked_mul(self.ref_size)
                    .and_then(|o| o.checked_add(start))
                    .ok_or_else(truncated)?;
                let mut dict = Dictionary::new();
                for i in 0..count {
                    let key = match self.read_object(self.object_ref(start, i)?, depth + 1)? {
                        Value::String(key) => key,
                        _ => return Err(StoreError::malformed("dictionary key is not a string")),
                    };
                    let value = self.read_object(self.object_ref(values_start, i)?, depth + 1)?;
                    dict.insert(key, value);
                }
                Ok(Value::Dictionary(dict))
            }
            _ => Err(StoreError::malformed(format!(
                "unknown object marker 0x{marker:02x}"
            ))),
        }
    }
}
