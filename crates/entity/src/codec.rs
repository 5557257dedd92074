//! Binary version record format.
//!
//! Every version kind shares one header. Integers are big-endian.
//!
//! # Record Layout
//!
//! ```text
//! ┌──────────────────┬──────────────┬──────────────────┬──────────────────────┐
//! │ Size hint (i32)  │ Token (u8)   │ Stamp nid (i32)  │ Payload (variable)   │
//! └──────────────────┴──────────────┴──────────────────┴──────────────────────┘
//! ```
//!
//! The size hint is the length of the whole record including the size field
//! itself: `VERSION_HEADER_SIZE (9) + payload size`.
//!
//! # Payload Layouts
//!
//! ```text
//! Concept:      (empty)
//! Pattern:      purpose i32, meaning i32, count i32, count x (meaning, purpose, type) i32
//! Description:  language i32, case i32, type i32, text length i32, UTF-8 text
//! Relationship: destination i32, type i32, group i32, characteristic i32
//! LogicGraph:   count i32, count x (meaning i32, concept i32 (0 = none),
//!               child count i32, child indices i32...)
//! Stamp:        status i32, time i64, author i32, module i32, path i32
//! ```
//!
//! Decoding checks the token against the kind being constructed and fails
//! with `FormatMismatch` on any difference; a payload that does not exactly
//! fill its record is `Corruption`.

use crate::kind::VersionKind;
use crate::logic_graph::{LogicGraph, LogicVertex};
use crate::version::{
    Description, EntityVersion, FieldDefinition, PatternDefinition, Relationship, VersionData,
};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;
use termstore_core::{Error, Nid, Result, Stamp, Timestamp};

/// Fixed bytes per version record: size hint (4) + token (1) + stamp nid (4)
pub const VERSION_HEADER_SIZE: usize = 9;

const STAMP_PAYLOAD_SIZE: usize = 24;

// ============================================================================
// Reading
// ============================================================================

/// Bounds-checked big-endian reader over a byte slice
pub(crate) struct ByteReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        ByteReader {
            cursor: Cursor::new(bytes),
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub(crate) fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    pub(crate) fn read_u8(&mut self, what: &str) -> Result<u8> {
        self.cursor.read_u8().map_err(|_| truncated(what))
    }

    pub(crate) fn read_i32(&mut self, what: &str) -> Result<i32> {
        self.cursor
            .read_i32::<BigEndian>()
            .map_err(|_| truncated(what))
    }

    pub(crate) fn read_i64(&mut self, what: &str) -> Result<i64> {
        self.cursor
            .read_i64::<BigEndian>()
            .map_err(|_| truncated(what))
    }

    pub(crate) fn read_nid(&mut self, what: &str) -> Result<Nid> {
        self.read_i32(what).map(Nid::from_raw)
    }

    /// Read a count and check that `count * min_item_size` bytes remain
    pub(crate) fn read_count(&mut self, what: &str, min_item_size: usize) -> Result<usize> {
        let count = self.read_i32(what)?;
        if count < 0 {
            return Err(Error::Corruption(format!("negative {}: {}", what, count)));
        }
        let count = count as usize;
        if count.saturating_mul(min_item_size) > self.remaining() {
            return Err(Error::Corruption(format!(
                "{} {} exceeds remaining {} bytes",
                what,
                count,
                self.remaining()
            )));
        }
        Ok(count)
    }

    pub(crate) fn read_slice(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(truncated(what));
        }
        let bytes: &'a [u8] = *self.cursor.get_ref();
        let start = self.position();
        self.cursor.set_position((start + len) as u64);
        Ok(&bytes[start..start + len])
    }
}

fn truncated(what: &str) -> Error {
    Error::Corruption(format!("truncated record reading {}", what))
}

// ============================================================================
// Writing
// ============================================================================

#[inline]
pub(crate) fn put_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_be_bytes());
}

#[inline]
pub(crate) fn put_i64(out: &mut Vec<u8>, value: i64) {
    out.extend_from_slice(&value.to_be_bytes());
}

#[inline]
pub(crate) fn put_nid(out: &mut Vec<u8>, nid: Nid) {
    put_i32(out, nid.as_i32());
}

/// Write a size, length or count field
///
/// # Errors
///
/// `InvalidOperation` if `value` does not fit an i32.
pub(crate) fn put_len<T>(out: &mut Vec<u8>, value: T, what: &str) -> Result<()>
where
    T: Copy + std::fmt::Display,
    i32: TryFrom<T>,
{
    let encoded = i32::try_from(value).map_err(|_| {
        Error::InvalidOperation(format!("{} {} is too large to encode", what, value))
    })?;
    put_i32(out, encoded);
    Ok(())
}

// ============================================================================
// Version records
// ============================================================================

/// Bytes the payload of `data` occupies
pub fn payload_size(data: &VersionData) -> usize {
    match data {
        VersionData::Concept => 0,
        VersionData::Pattern(p) => 12 + 12 * p.fields.len(),
        VersionData::Description(d) => 16 + d.text.len(),
        VersionData::Relationship(_) => 16,
        VersionData::LogicGraph(g) => {
            4 + g
                .vertices()
                .iter()
                .map(|v| 12 + 4 * v.children.len())
                .sum::<usize>()
        }
        VersionData::Stamp(_) => STAMP_PAYLOAD_SIZE,
    }
}

/// Full record length of `version`, the value written as the size hint
pub fn version_size(version: &EntityVersion) -> usize {
    VERSION_HEADER_SIZE + payload_size(version.data())
}

/// Append the record for `version` to `out`
///
/// # Errors
///
/// `InvalidOperation` if the record, its text or one of its counts is too
/// large for an i32 field. `out` may hold a partial record afterwards.
pub fn encode_version(version: &EntityVersion, out: &mut Vec<u8>) -> Result<()> {
    let size = version_size(version);
    let start = out.len();
    put_len(out, size, "version size")?;
    out.reserve(size);
    // token leads the record body so serialized versions order by kind
    out.push(version.kind().token());
    put_nid(out, version.stamp_nid());
    encode_payload(version.data(), out)?;
    debug_assert_eq!(out.len() - start, size);
    Ok(())
}

/// Encode one version as a standalone record
///
/// # Errors
///
/// As [`encode_version`].
pub fn version_to_bytes(version: &EntityVersion) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(version_size(version));
    encode_version(version, &mut out)?;
    Ok(out)
}

/// Decode one record that must be of kind `expected`
///
/// Returns the version and the number of bytes consumed.
///
/// # Errors
///
/// - `FormatMismatch` if the record's token is not `expected`'s token
/// - `Corruption` if the size hint is inconsistent or the payload is malformed
pub fn decode_version(expected: VersionKind, bytes: &[u8]) -> Result<(EntityVersion, usize)> {
    let mut reader = ByteReader::new(bytes);
    let size = reader.read_i32("version size")?;
    if size < VERSION_HEADER_SIZE as i32 || size as usize > bytes.len() {
        return Err(Error::Corruption(format!(
            "version size hint {} invalid for {} available bytes",
            size,
            bytes.len()
        )));
    }
    let size = size as usize;

    let token = reader.read_u8("version token")?;
    if token != expected.token() {
        return Err(Error::FormatMismatch {
            expected: expected.token(),
            actual: token,
        });
    }
    let stamp_nid = reader.read_nid("stamp nid")?;

    let mut payload = ByteReader::new(&bytes[VERSION_HEADER_SIZE..size]);
    let data = decode_payload(expected, &mut payload)?;
    if payload.remaining() != 0 {
        return Err(Error::Corruption(format!(
            "{} trailing bytes after {} payload",
            payload.remaining(),
            expected.name()
        )));
    }
    Ok((EntityVersion::new(stamp_nid, data), size))
}

/// Decode one record of whatever kind its token names
///
/// # Errors
///
/// `Corruption` for a token outside the closed set, otherwise as
/// [`decode_version`].
pub fn decode_any_version(bytes: &[u8]) -> Result<(EntityVersion, usize)> {
    let token = *bytes
        .get(4)
        .ok_or_else(|| truncated("version token"))?;
    let kind = VersionKind::from_token(token)
        .ok_or_else(|| Error::Corruption(format!("unknown version token {:#04x}", token)))?;
    decode_version(kind, bytes)
}

// ============================================================================
// Payloads
// ============================================================================

fn encode_payload(data: &VersionData, out: &mut Vec<u8>) -> Result<()> {
    match data {
        VersionData::Concept => {}
        VersionData::Pattern(p) => {
            put_nid(out, p.semantic_purpose);
            put_nid(out, p.semantic_meaning);
            put_len(out, p.fields.len(), "pattern field count")?;
            for field in &p.fields {
                put_nid(out, field.meaning);
                put_nid(out, field.purpose);
                put_nid(out, field.data_type);
            }
        }
        VersionData::Description(d) => {
            put_nid(out, d.language);
            put_nid(out, d.case_significance);
            put_nid(out, d.description_type);
            put_len(out, d.text.len(), "description text length")?;
            out.extend_from_slice(d.text.as_bytes());
        }
        VersionData::Relationship(r) => {
            put_nid(out, r.destination);
            put_nid(out, r.relationship_type);
            put_i32(out, r.group);
            put_nid(out, r.characteristic);
        }
        VersionData::LogicGraph(g) => {
            put_len(out, g.len(), "logic graph vertex count")?;
            for vertex in g.vertices() {
                put_nid(out, vertex.meaning);
                put_nid(out, vertex.concept.unwrap_or(Nid::UNASSIGNED));
                put_len(out, vertex.children.len(), "logic vertex child count")?;
                for &child in &vertex.children {
                    put_len(out, child, "logic vertex child index")?;
                }
            }
        }
        VersionData::Stamp(s) => {
            put_nid(out, s.status);
            put_i64(out, s.time.as_millis());
            put_nid(out, s.author);
            put_nid(out, s.module);
            put_nid(out, s.path);
        }
    }
    Ok(())
}

fn decode_payload(kind: VersionKind, reader: &mut ByteReader<'_>) -> Result<VersionData> {
    let data = match kind {
        VersionKind::Concept => VersionData::Concept,
        VersionKind::Pattern => {
            let semantic_purpose = reader.read_nid("pattern purpose")?;
            let semantic_meaning = reader.read_nid("pattern meaning")?;
            let count = reader.read_count("field count", 12)?;
            let mut fields = Vec::with_capacity(count);
            for _ in 0..count {
                fields.push(FieldDefinition {
                    meaning: reader.read_nid("field meaning")?,
                    purpose: reader.read_nid("field purpose")?,
                    data_type: reader.read_nid("field data type")?,
                });
            }
            VersionData::Pattern(PatternDefinition {
                semantic_purpose,
                semantic_meaning,
                fields,
            })
        }
        VersionKind::Description => {
            let language = reader.read_nid("language")?;
            let case_significance = reader.read_nid("case significance")?;
            let description_type = reader.read_nid("description type")?;
            let len = reader.read_count("text length", 1)?;
            let raw = reader.read_slice(len, "text")?;
            let text = std::str::from_utf8(raw)
                .map_err(|e| Error::Corruption(format!("description text: {}", e)))?
                .to_string();
            VersionData::Description(Description {
                language,
                text,
                case_significance,
                description_type,
            })
        }
        VersionKind::Relationship => VersionData::Relationship(Relationship {
            destination: reader.read_nid("destination")?,
            relationship_type: reader.read_nid("relationship type")?,
            group: reader.read_i32("group")?,
            characteristic: reader.read_nid("characteristic")?,
        }),
        VersionKind::LogicGraph => {
            let count = reader.read_count("vertex count", 12)?;
            let mut vertices = Vec::with_capacity(count);
            for _ in 0..count {
                let meaning = reader.read_nid("vertex meaning")?;
                let concept = reader.read_nid("vertex concept")?;
                let child_count = reader.read_count("child count", 4)?;
                let mut children = Vec::with_capacity(child_count);
                for _ in 0..child_count {
                    let child = reader.read_i32("child index")?;
                    if child < 0 {
                        return Err(Error::Corruption(format!("negative child index {}", child)));
                    }
                    children.push(child as u32);
                }
                let concept = if concept.is_assigned() {
                    Some(concept)
                } else {
                    None
                };
                vertices.push(LogicVertex::with_children(meaning, concept, children));
            }
            VersionData::LogicGraph(LogicGraph::new(vertices)?)
        }
        VersionKind::Stamp => VersionData::Stamp(Stamp::new(
            reader.read_nid("status")?,
            Timestamp::from_millis(reader.read_i64("time")?),
            reader.read_nid("author")?,
            reader.read_nid("module")?,
            reader.read_nid("path")?,
        )),
    };
    Ok(data)
}
