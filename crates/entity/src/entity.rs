//! Entity chronologies
//!
//! An `Entity` is a component's identity plus its append-only version log.
//! The log is kept in insertion order; nothing here assumes it is ordered by
//! time. Versions are never removed or edited: a correction is a new version.
//!
//! # Chronology Layout
//!
//! ```text
//! ┌────────────┬────────────┬──────────┬──────────────┬─────────────────────┐
//! │ Format (1) │ Token (1)  │ Nid (4)  │ UUID count(4)│ UUIDs (16 each)     │
//! ├────────────┴────────────┴──────────┴──────────────┴─────────────────────┤
//! │ Kind fields: semantic = pattern (4), referenced component (4), kind (1) │
//! ├──────────────────────┬──────────────────────────────────────────────────┤
//! │ Version count (4)    │ Version records (see `codec`)                    │
//! └──────────────────────┴──────────────────────────────────────────────────┘
//! ```
//!
//! UUIDs are written as most-significant then least-significant 64 bits,
//! big-endian, like every other integer in the record.

use crate::codec::{decode_version, encode_version, put_i64, put_len, put_nid, version_size, ByteReader};
use crate::kind::{EntityKind, VersionKind, ENTITY_CONCEPT, ENTITY_PATTERN, ENTITY_SEMANTIC, ENTITY_STAMP};
use crate::version::{EntityVersion, VersionData};
use termstore_core::{Error, Nid, PublicId, Result, Stamp};
use uuid::Uuid;

/// Current chronology format version
pub const ENTITY_FORMAT_VERSION: u8 = 1;

/// A component and its version history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    nid: Nid,
    public_id: PublicId,
    kind: EntityKind,
    versions: Vec<EntityVersion>,
}

impl Entity {
    /// New chronology with no versions
    pub fn new(nid: Nid, public_id: PublicId, kind: EntityKind) -> Self {
        Entity {
            nid,
            public_id,
            kind,
            versions: Vec::new(),
        }
    }

    /// Stamp chronology holding its single stamp version
    ///
    /// The version's stamp reference is the stamp's own nid.
    pub fn stamp(nid: Nid, public_id: PublicId, stamp: Stamp) -> Self {
        Entity {
            nid,
            public_id,
            kind: EntityKind::Stamp,
            versions: vec![EntityVersion::new(nid, VersionData::Stamp(stamp))],
        }
    }

    /// Native identifier
    #[inline]
    pub fn nid(&self) -> Nid {
        self.nid
    }

    /// Public identifier
    #[inline]
    pub fn public_id(&self) -> &PublicId {
        &self.public_id
    }

    /// Chronology kind
    #[inline]
    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// Versions in log order
    ///
    /// The returned slice is a snapshot: appending requires `&mut self`, so
    /// it cannot change while borrowed.
    #[inline]
    pub fn versions(&self) -> &[EntityVersion] {
        &self.versions
    }

    /// Number of versions
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// The stamp nids of all versions, in log order
    pub fn stamp_nids(&self) -> impl Iterator<Item = Nid> + '_ {
        self.versions.iter().map(|v| v.stamp_nid())
    }

    /// Append a fully formed, already stamped version
    ///
    /// # Errors
    ///
    /// - `IncompatibleVersion` if the chronology kind does not accept the version kind
    /// - `InvalidOperation` on a second version of a stamp chronology
    pub fn append_version(&mut self, version: EntityVersion) -> Result<()> {
        if version.kind() != self.kind.version_kind() {
            return Err(Error::IncompatibleVersion {
                entity: self.kind.name(),
                version: version.kind().name(),
            });
        }
        if matches!(self.kind, EntityKind::Stamp) && !self.versions.is_empty() {
            return Err(Error::InvalidOperation(format!(
                "stamp {} is immutable",
                self.nid
            )));
        }
        self.versions.push(version);
        Ok(())
    }

    /// Add UUIDs learned from a merge
    pub fn merge_public_id(&mut self, other: &PublicId) {
        self.public_id = self.public_id.merged(other);
    }

    /// The stamp payload of a stamp chronology
    pub fn as_stamp(&self) -> Option<Stamp> {
        match (self.kind, self.versions.first().map(|v| v.data())) {
            (EntityKind::Stamp, Some(VersionData::Stamp(stamp))) => Some(*stamp),
            _ => None,
        }
    }

    // ========================================================================
    // Binary form
    // ========================================================================

    /// Serialize the chronology
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if a length or count does not fit its i32 field.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let versions_len: usize = self.versions.iter().map(version_size).sum();
        let mut out = Vec::with_capacity(32 + 16 * self.public_id.len() + versions_len);
        out.push(ENTITY_FORMAT_VERSION);
        out.push(self.kind.token());
        put_nid(&mut out, self.nid);
        put_len(&mut out, self.public_id.len(), "uuid count")?;
        for uuid in self.public_id.uuids() {
            let (msb, lsb) = uuid.as_u64_pair();
            put_i64(&mut out, msb as i64);
            put_i64(&mut out, lsb as i64);
        }
        if let EntityKind::Semantic {
            pattern,
            referenced_component,
            version_kind,
        } = self.kind
        {
            put_nid(&mut out, pattern);
            put_nid(&mut out, referenced_component);
            out.push(version_kind.token());
        }
        put_len(&mut out, self.versions.len(), "version count")?;
        for version in &self.versions {
            encode_version(version, &mut out)?;
        }
        Ok(out)
    }

    /// Deserialize a chronology
    ///
    /// # Errors
    ///
    /// - `FormatMismatch` for an unknown format version or a version record
    ///   whose token differs from the chronology's version kind
    /// - `Corruption` for truncated or trailing bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (header, offset) = EntityHeader::read(bytes)?;
        let expected = header.kind.version_kind();
        let mut versions = Vec::with_capacity(header.version_count);
        let mut cursor = offset;
        for _ in 0..header.version_count {
            let (version, consumed) = decode_version(expected, &bytes[cursor..])?;
            versions.push(version);
            cursor += consumed;
        }
        if cursor != bytes.len() {
            return Err(Error::Corruption(format!(
                "{} trailing bytes after chronology {}",
                bytes.len() - cursor,
                header.nid
            )));
        }
        Ok(Entity {
            nid: header.nid,
            public_id: header.public_id,
            kind: header.kind,
            versions,
        })
    }
}

/// Chronology header, readable without decoding the versions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityHeader {
    /// Native identifier
    pub nid: Nid,
    /// Public identifier
    pub public_id: PublicId,
    /// Chronology kind
    pub kind: EntityKind,
    /// Number of version records that follow
    pub version_count: usize,
}

impl EntityHeader {
    /// Read the header, returning it and the offset of the first version record
    ///
    /// # Errors
    ///
    /// As [`Entity::from_bytes`] for the header portion.
    pub fn read(bytes: &[u8]) -> Result<(Self, usize)> {
        let mut reader = ByteReader::new(bytes);
        let format = reader.read_u8("format version")?;
        if format != ENTITY_FORMAT_VERSION {
            return Err(Error::FormatMismatch {
                expected: ENTITY_FORMAT_VERSION,
                actual: format,
            });
        }
        let token = reader.read_u8("entity token")?;
        let nid = reader.read_nid("entity nid")?;
        let uuid_count = reader.read_count("uuid count", 16)?;
        let mut uuids = Vec::with_capacity(uuid_count);
        for _ in 0..uuid_count {
            let msb = reader.read_i64("uuid msb")? as u64;
            let lsb = reader.read_i64("uuid lsb")? as u64;
            uuids.push(Uuid::from_u64_pair(msb, lsb));
        }
        let public_id = PublicId::new(uuids)
            .map_err(|e| Error::Corruption(format!("chronology {}: {}", nid, e)))?;

        let kind = match token {
            ENTITY_CONCEPT => EntityKind::Concept,
            ENTITY_PATTERN => EntityKind::Pattern,
            ENTITY_STAMP => EntityKind::Stamp,
            ENTITY_SEMANTIC => {
                let pattern = reader.read_nid("semantic pattern")?;
                let referenced_component = reader.read_nid("referenced component")?;
                let kind_token = reader.read_u8("semantic version kind")?;
                let version_kind = VersionKind::from_token(kind_token)
                    .filter(|k| k.is_semantic())
                    .ok_or_else(|| {
                        Error::Corruption(format!(
                            "chronology {} has non-semantic version kind {:#04x}",
                            nid, kind_token
                        ))
                    })?;
                EntityKind::Semantic {
                    pattern,
                    referenced_component,
                    version_kind,
                }
            }
            other => {
                return Err(Error::Corruption(format!(
                    "unknown chronology token {:#04x}",
                    other
                )))
            }
        };
        // each version record is at least a header
        let version_count = reader.read_count("version count", crate::codec::VERSION_HEADER_SIZE)?;
        Ok((
            EntityHeader {
                nid,
                public_id,
                kind,
                version_count,
            },
            reader.position(),
        ))
    }
}
