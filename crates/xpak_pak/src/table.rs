//! Multi-item table containers.
//!
//! A table container concatenates several named items behind an index. Two
//! index layouts exist:
//!
//! - [`TableLayout::Prefixed`]: `"XTBL"`, item count (u64 LE), then per item
//!   a u16 LE name length, the name bytes, size (u32 LE) and offset (u32 LE).
//! - [`TableLayout::Fixed`]: item count (u64 LE), then per item a 64-byte
//!   NUL-padded name, size (u32 LE) and offset (u32 LE).
//!
//! Offsets are absolute within the container. The first item starts right
//! after the index and every following item starts where the previous one
//! ends.

use std::collections::HashSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::PakError;

/// Leading tag of a [`TableLayout::Prefixed`] container.
pub const TABLE_TAG: [u8; 4] = *b"XTBL";
const FIXED_NAME_LEN: usize = 64;
const COUNT_LEN: usize = 8;
const SIZE_OFFSET_LEN: usize = 8;

/// Index layout of a table container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableLayout {
    /// Fixed 64-byte NUL-terminated names; at most 63 bytes per name.
    Fixed,
    /// Length-prefixed names of up to 65 535 bytes.
    #[default]
    Prefixed,
}

impl TableLayout {
    /// Longest name, in bytes, this layout can store.
    pub const fn max_name_len(&self) -> usize {
        match self {
            Self::Fixed => FIXED_NAME_LEN - 1,
            Self::Prefixed => u16::MAX as usize,
        }
    }

    fn entry_len(&self, name: &str) -> usize {
        match self {
            Self::Fixed => FIXED_NAME_LEN + SIZE_OFFSET_LEN,
            Self::Prefixed => 2 + name.len() + SIZE_OFFSET_LEN,
        }
    }

    fn preamble_len(&self) -> usize {
        match self {
            Self::Fixed => COUNT_LEN,
            Self::Prefixed => TABLE_TAG.len() + COUNT_LEN,
        }
    }
}

/// One index record of a table container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableEntry {
    /// Item name, unique within the container.
    pub name: String,
    /// Item length in bytes.
    pub size: u32,
    /// Absolute offset of the item within the container.
    pub offset: u32,
}

impl TableEntry {
    /// Byte range of the item within the container.
    pub fn range(&self) -> Range<usize> {
        let start = self.offset as usize;
        start..start + self.size as usize
    }
}

/// An encoded table container together with its decoded index.
#[derive(Clone, Debug)]
pub struct PakTable {
    layout: TableLayout,
    header_size: usize,
    entries: Vec<TableEntry>,
    bytes: Vec<u8>,
}

impl PakTable {
    /// Encodes `items` in order into a new table container.
    pub fn build<N, D>(layout: TableLayout, items: &[(N, D)]) -> Result<Self, PakError>
    where
        N: AsRef<str>,
        D: AsRef<[u8]>,
    {
        let mut seen = HashSet::new();
        let mut header_size = layout.preamble_len();
        for (name, _) in items {
            let name = name.as_ref();
            validate_name(layout, name)?;
            if !seen.insert(name) {
                return Err(PakError::InvalidName {
                    name: name.to_string(),
                    reason: "duplicate entry".into(),
                });
            }
            header_size += layout.entry_len(name);
        }

        let total = items
            .iter()
            .fold(header_size as u64, |acc, (_, data)| {
                acc + data.as_ref().len() as u64
            });
        if total > u64::from(u32::MAX) {
            return Err(PakError::TableTooLarge { size: total });
        }

        let mut entries = Vec::with_capacity(items.len());
        let mut offset = header_size as u32;
        for (name, data) in items {
            // Fits: the whole container was checked against u32 above.
            let size = data.as_ref().len() as u32;
            entries.push(TableEntry {
                name: name.as_ref().to_string(),
                size,
                offset,
            });
            offset += size;
        }

        let mut bytes = Vec::with_capacity(total as usize);
        if layout == TableLayout::Prefixed {
            bytes.extend_from_slice(&TABLE_TAG);
        }
        bytes.extend_from_slice(&(entries.len() as u64).to_le_bytes());
        for entry in &entries {
            match layout {
                TableLayout::Fixed => {
                    let mut name = [0u8; FIXED_NAME_LEN];
                    name[..entry.name.len()].copy_from_slice(entry.name.as_bytes());
                    bytes.extend_from_slice(&name);
                }
                TableLayout::Prefixed => {
                    bytes.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
                    bytes.extend_from_slice(entry.name.as_bytes());
                }
            }
            bytes.extend_from_slice(&entry.size.to_le_bytes());
            bytes.extend_from_slice(&entry.offset.to_le_bytes());
        }
        debug_assert_eq!(bytes.len(), header_size);
        for (_, data) in items {
            bytes.extend_from_slice(data.as_ref());
        }

        Ok(Self {
            layout,
            header_size,
            entries,
            bytes,
        })
    }

    /// Decodes a table container, detecting its layout from the leading tag.
    ///
    /// The index must describe the buffer exactly: contiguous items starting
    /// at the end of the index and ending at the end of the buffer.
    pub fn parse(bytes: Vec<u8>) -> Result<Self, PakError> {
        if bytes.len() > u32::MAX as usize {
            return Err(PakError::TableTooLarge {
                size: bytes.len() as u64,
            });
        }
        let layout = if bytes.starts_with(&TABLE_TAG) {
            TableLayout::Prefixed
        } else {
            TableLayout::Fixed
        };

        let mut cursor = Cursor::new(&bytes);
        if layout == TableLayout::Prefixed {
            cursor.take(TABLE_TAG.len())?;
        }
        let count = cursor.u64()?;
        let min_entry = match layout {
            TableLayout::Fixed => FIXED_NAME_LEN + SIZE_OFFSET_LEN,
            TableLayout::Prefixed => 2 + SIZE_OFFSET_LEN,
        } as u64;
        if count.saturating_mul(min_entry) > cursor.remaining() as u64 {
            return Err(PakError::malformed(format!(
                "index declares {count} entries, buffer holds {} bytes",
                bytes.len()
            )));
        }

        let mut raw = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = match layout {
                TableLayout::Fixed => {
                    let field = cursor.take(FIXED_NAME_LEN)?;
                    let end = field.iter().position(|&b| b == 0).ok_or_else(|| {
                        PakError::malformed("fixed-width name is not NUL-terminated")
                    })?;
                    decode_name(&field[..end])?
                }
                TableLayout::Prefixed => {
                    let len = cursor.u16()? as usize;
                    decode_name(cursor.take(len)?)?
                }
            };
            let size = cursor.u32()?;
            let offset = cursor.u32()?;
            raw.push(TableEntry { name, size, offset });
        }

        let header_size = cursor.position();
        let mut expected = header_size as u64;
        let mut seen = HashSet::new();
        for entry in &raw {
            if u64::from(entry.offset) != expected {
                return Err(PakError::malformed(format!(
                    "entry '{}' starts at {}, expected {expected}",
                    entry.name, entry.offset
                )));
            }
            expected += u64::from(entry.size);
            if expected > bytes.len() as u64 {
                return Err(PakError::malformed(format!(
                    "entry '{}' ends at {expected}, past the end of the {}-byte container",
                    entry.name,
                    bytes.len()
                )));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(PakError::malformed(format!(
                    "duplicate entry '{}'",
                    entry.name
                )));
            }
        }
        if expected != bytes.len() as u64 {
            return Err(PakError::malformed(format!(
                "{} trailing bytes after the last entry",
                bytes.len() as u64 - expected
            )));
        }

        Ok(Self {
            layout,
            header_size,
            entries: raw,
            bytes,
        })
    }

    /// Index layout of this container.
    pub fn layout(&self) -> TableLayout {
        self.layout
    }

    /// Size of the index, which is also the offset of the first item.
    pub fn header_size(&self) -> usize {
        self.header_size
    }

    /// Index records in container order.
    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    /// Returns the bytes of the item called `name`.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &self.bytes[e.range()])
    }

    /// Iterates over `(entry, bytes)` pairs in container order.
    pub fn iter(&self) -> impl Iterator<Item = (&TableEntry, &[u8])> + '_ {
        self.entries.iter().map(|e| (e, &self.bytes[e.range()]))
    }

    /// The encoded container.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the table and returns the encoded container.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

fn validate_name(layout: TableLayout, name: &str) -> Result<(), PakError> {
    let max = layout.max_name_len();
    if name.len() > max {
        return Err(PakError::NameTooLong {
            name: name.to_string(),
            len: name.len(),
            max,
        });
    }
    if name.is_empty() {
        return Err(PakError::InvalidName {
            name: String::new(),
            reason: "name is empty".into(),
        });
    }
    if name.contains('\0') {
        return Err(PakError::InvalidName {
            name: name.escape_default().to_string(),
            reason: "name contains a NUL byte".into(),
        });
    }
    Ok(())
}

fn decode_name(raw: &[u8]) -> Result<String, PakError> {
    String::from_utf8(raw.to_vec())
        .map_err(|_| PakError::malformed("entry name is not valid UTF-8"))
}

/// Bounds-checked little-endian reader over the index.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], PakError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                PakError::malformed(format!("index truncated at byte {}", self.pos))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16, PakError> {
        let mut buf = [0u8; 2];
        buf.copy_from_slice(self.take(2)?);
        Ok(u16::from_le_bytes(buf))
    }

    fn u32(&mut self) -> Result<u32, PakError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u64(&mut self) -> Result<u64, PakError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(layout: TableLayout) -> PakTable {
        PakTable::build(layout, &[("a", "xx"), ("b", "yyy")]).unwrap()
    }

    #[test]
    fn offsets_follow_header() {
        for layout in [TableLayout::Fixed, TableLayout::Prefixed] {
            let table = sample(layout);
            let entries = table.entries();
            let header = table.header_size();
            assert_eq!(entries[0].offset as usize, header);
            assert_eq!(entries[1].offset as usize, header + 2);
            assert_eq!(&table.as_bytes()[header..], b"xxyyy");
        }
    }

    #[test]
    fn header_sizes() {
        assert_eq!(sample(TableLayout::Fixed).header_size(), 8 + 2 * 72);
        assert_eq!(
            sample(TableLayout::Prefixed).header_size(),
            4 + 8 + 2 * (2 + 1 + 8)
        );
    }

    #[test]
    fn fixed_layout_rejects_64_byte_name() {
        let name = "n".repeat(64);
        let err = PakTable::build(TableLayout::Fixed, &[(name.as_str(), "data")]).unwrap_err();
        assert!(matches!(err, PakError::NameTooLong { len: 64, max: 63, .. }));

        let ok = "n".repeat(63);
        assert!(PakTable::build(TableLayout::Fixed, &[(ok.as_str(), "data")]).is_ok());
    }

    #[test]
    fn prefixed_layout_accepts_long_names() {
        let name = "scenes/levels/".repeat(20);
        let table = PakTable::build(TableLayout::Prefixed, &[(name.as_str(), "data")]).unwrap();
        let parsed = PakTable::parse(table.into_bytes()).unwrap();
        assert_eq!(parsed.get(&name), Some(&b"data"[..]));
    }

    #[test]
    fn prefixed_layout_rejects_oversized_name() {
        let name = "n".repeat(70_000);
        let err =
            PakTable::build(TableLayout::Prefixed, &[(name.as_str(), "")]).unwrap_err();
        assert!(matches!(err, PakError::NameTooLong { .. }));
    }

    #[test]
    fn parse_detects_layout() {
        for layout in [TableLayout::Fixed, TableLayout::Prefixed] {
            let bytes = sample(layout).into_bytes();
            let parsed = PakTable::parse(bytes).unwrap();
            assert_eq!(parsed.layout(), layout);
            assert_eq!(parsed.get("a"), Some(&b"xx"[..]));
            assert_eq!(parsed.get("b"), Some(&b"yyy"[..]));
            assert_eq!(parsed.get("c"), None);
            let names: Vec<_> = parsed.iter().map(|(e, _)| e.name.as_str()).collect();
            assert_eq!(names, ["a", "b"]);
        }
    }

    #[test]
    fn empty_table() {
        let table = PakTable::build::<&str, &[u8]>(TableLayout::Prefixed, &[]).unwrap();
        assert_eq!(table.as_bytes().len(), 12);
        let parsed = PakTable::parse(table.into_bytes()).unwrap();
        assert!(parsed.entries().is_empty());
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = PakTable::build(TableLayout::Prefixed, &[("a", "1"), ("a", "2")]).unwrap_err();
        assert!(matches!(err, PakError::InvalidName { .. }));
    }

    #[test]
    fn nul_in_name_rejected() {
        let err = PakTable::build(TableLayout::Fixed, &[("a\0b", "1")]).unwrap_err();
        assert!(matches!(err, PakError::InvalidName { .. }));
    }

    #[test]
    fn truncated_container_rejected() {
        let mut bytes = sample(TableLayout::Prefixed).into_bytes();
        bytes.pop();
        assert!(matches!(
            PakTable::parse(bytes).unwrap_err(),
            PakError::MalformedTable { .. }
        ));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = sample(TableLayout::Fixed).into_bytes();
        bytes.push(0);
        assert!(matches!(
            PakTable::parse(bytes).unwrap_err(),
            PakError::MalformedTable { .. }
        ));
    }

    #[test]
    fn tampered_offset_rejected() {
        let table = sample(TableLayout::Prefixed);
        let mut bytes = table.into_bytes();
        // Offset field of the second entry: tag + count + first entry + len + name + size.
        let pos = 4 + 8 + (2 + 1 + 8) + 2 + 1 + 4;
        bytes[pos..pos + 4].copy_from_slice(&1000u32.to_le_bytes());
        assert!(matches!(
            PakTable::parse(bytes).unwrap_err(),
            PakError::MalformedTable { .. }
        ));
    }

    #[test]
    fn absurd_count_rejected() {
        let mut bytes = b"XTBL".to_vec();
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(
            PakTable::parse(bytes).unwrap_err(),
            PakError::MalformedTable { .. }
        ));
    }
}
