//! RUF container header: fixed common fields, model-specific fields and the
//! subfile table.
//!
//! # Layout
//! | Offset | Field | Width |
//! |--------|-------|-------|
//! | 0x00 | file type | 6 |
//! | 0x06 | endianness marker (`"LE"` / `"BE"`, NUL padded) | 4 |
//! | 0x0A | reserved | 2 |
//! | 0x0C | firmware date | 32 |
//! | 0x2C | manufacturer | 8 |
//! | 0x34 | model (NUL padded) | 32 |
//! | 0x54 | secondary fields, widths per model | 36 or 38 |
//! | follows | encrypted size (u32) | 4 |
//! | 0xC1 | subfile count (u8) | 1 |
//! | 0x120 | subfile table, 64-byte slots | up to 0x800 |
//!
//! Every multi-byte integer, table fields included, uses the byte order the
//! marker declares.  The count at 0xC1 and the table at 0x120 sit at fixed
//! offsets whatever the model-specific widths are.

use byteorder::ReadBytesExt;
use log::{debug, trace, warn};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::ops::Range;

use crate::error::{Error, Result};
use crate::registry::{ModelProfile, ModelRegistry};
use crate::subfile::{read_u32, write_u32, SubfileEntry, SLOT_SIZE};

/// Bytes at the start of the container that are never encrypted.
pub const HEADER_SIZE: usize = 0x800;
pub const SECONDARY_OFFSET: usize = 0x54;
pub const SUBFILE_COUNT_OFFSET: usize = 0xC1;
pub const TABLE_OFFSET: usize = 0x120;
/// Slots between the table start and the end of the header region.
pub const TABLE_SLOTS: usize = (HEADER_SIZE - TABLE_OFFSET) / SLOT_SIZE;

const DATE_LEN: usize = 32;
const MANUFACTURER_LEN: usize = 8;
const MODEL_LEN: usize = 32;

// ── ByteOrder ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// `"BE"` selects big-endian; any other marker is little-endian.
    pub fn from_marker(marker: &[u8]) -> Self {
        if trim_nul(marker) == "BE" { ByteOrder::Big } else { ByteOrder::Little }
    }

    pub fn marker(self) -> [u8; 4] {
        match self {
            ByteOrder::Little => *b"LE\0\0",
            ByteOrder::Big    => *b"BE\0\0",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ByteOrder::Little => "little-endian",
            ByteOrder::Big    => "big-endian",
        }
    }
}

// ── ContainerHeader ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub file_type:      [u8; 6],
    pub endian_marker:  [u8; 4],
    pub byte_order:     ByteOrder,
    pub reserved:       [u8; 2],
    pub firmware_date:  String,
    pub manufacturer:   String,
    pub model:          String,
    /// Raw model-specific fields, widths per `profile.secondary_widths`.
    pub secondary:      (Vec<u8>, Vec<u8>),
    pub encrypted_size: u32,
    pub subfile_count:  u8,
    /// Non-empty table entries in table order.
    pub subfiles:       Vec<SubfileEntry>,
    pub profile:        ModelProfile,
    /// Total length of the source the header was parsed from.
    pub container_len:  u64,
}

impl ContainerHeader {
    /// A header with no subfiles and an empty body for `profile`.
    pub fn new(profile: &ModelProfile, byte_order: ByteOrder) -> Self {
        let (w1, w2) = profile.secondary_widths;
        Self {
            file_type:      *b"RUF\0\0\0",
            endian_marker:  byte_order.marker(),
            byte_order,
            reserved:       [0u8; 2],
            firmware_date:  String::new(),
            manufacturer:   String::new(),
            model:          profile.model.clone(),
            secondary:      (vec![0u8; w1], vec![0u8; w2]),
            encrypted_size: 0,
            subfile_count:  0,
            subfiles:       Vec::new(),
            profile:        profile.clone(),
            container_len:  HEADER_SIZE as u64,
        }
    }

    /// Parse the header of the container in `source`.
    ///
    /// The model is resolved before anything model-dependent is read.  The
    /// source is rewound to offset 0 on success.
    pub fn parse<R: Read + Seek>(source: &mut R, registry: &ModelRegistry) -> Result<Self> {
        let container_len = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;

        let file_type:     [u8; 6]         = read_array(source)?;
        let endian_marker: [u8; 4]         = read_array(source)?;
        let reserved:      [u8; 2]         = read_array(source)?;
        let date:          [u8; DATE_LEN]  = read_array(source)?;
        let manufacturer:  [u8; MANUFACTURER_LEN] = read_array(source)?;
        let model_raw:     [u8; MODEL_LEN] = read_array(source)?;

        let byte_order = ByteOrder::from_marker(&endian_marker);
        let marker = trim_nul(&endian_marker);
        if marker != "LE" && marker != "BE" {
            warn!("unrecognised endianness marker {marker:?}, assuming little-endian");
        }

        let model = trim_nul(&model_raw);
        let profile = registry.lookup(&model)?.clone();

        let (w1, w2) = profile.secondary_widths;
        let mut secondary = (vec![0u8; w1], vec![0u8; w2]);
        source.read_exact(&mut secondary.0)?;
        source.read_exact(&mut secondary.1)?;

        let encrypted_size = read_u32(source, byte_order)?;

        source.seek(SeekFrom::Start(SUBFILE_COUNT_OFFSET as u64))?;
        let subfile_count = source.read_u8()?;

        let subfiles = read_table(source, byte_order, &profile, subfile_count as usize, container_len)?;

        let header = Self {
            file_type,
            endian_marker,
            byte_order,
            reserved,
            firmware_date: trim_nul(&date),
            manufacturer:  trim_nul(&manufacturer),
            model,
            secondary,
            encrypted_size,
            subfile_count,
            subfiles,
            profile,
            container_len,
        };

        // table consistency outranks body alignment
        let required = TABLE_OFFSET as u64 + header.total_subfile_size();
        if required > container_len {
            return Err(Error::Format { required, actual: container_len });
        }
        if encrypted_size % 16 != 0 {
            return Err(Error::Alignment(encrypted_size));
        }

        source.seek(SeekFrom::Start(0))?;
        debug!(
            "parsed {} header: {}, body {} bytes, {} subfiles",
            header.model, byte_order.name(), encrypted_size, header.subfiles.len()
        );
        Ok(header)
    }

    /// Encode the 0x800-byte header region.  Text fields are NUL padded or
    /// truncated to their widths; secondary fields to the profile's widths.
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let mut buf = Cursor::new(vec![0u8; HEADER_SIZE]);
        buf.write_all(&self.file_type)?;
        buf.write_all(&self.endian_marker)?;
        buf.write_all(&self.reserved)?;
        buf.write_all(&pad_nul(&self.firmware_date, DATE_LEN))?;
        buf.write_all(&pad_nul(&self.manufacturer, MANUFACTURER_LEN))?;
        buf.write_all(&pad_nul(&self.model, MODEL_LEN))?;

        let (w1, w2) = self.profile.secondary_widths;
        buf.write_all(&fit(&self.secondary.0, w1))?;
        buf.write_all(&fit(&self.secondary.1, w2))?;
        write_u32(&mut buf, self.byte_order, self.encrypted_size)?;

        buf.seek(SeekFrom::Start(SUBFILE_COUNT_OFFSET as u64))?;
        buf.write_all(&[self.subfile_count])?;

        for entry in &self.subfiles {
            if entry.slot >= TABLE_SLOTS {
                return Err(io::Error::new(io::ErrorKind::InvalidInput,
                    format!("table slot {} out of range", entry.slot)));
            }
            buf.seek(SeekFrom::Start((TABLE_OFFSET + entry.slot * SLOT_SIZE) as u64))?;
            entry.write(&mut buf, self.byte_order, self.profile.entry_shape)?;
        }

        writer.write_all(buf.get_ref())
    }

    /// Byte range of the encrypted body within the container.
    pub fn body_range(&self) -> Range<u64> {
        let start = HEADER_SIZE as u64;
        start..start + self.encrypted_size as u64
    }

    /// Plain bytes after the encrypted body.
    pub fn trailer_len(&self) -> u64 {
        self.container_len.saturating_sub(self.body_range().end)
    }

    pub fn total_subfile_size(&self) -> u64 {
        self.subfiles.iter().map(|e| e.size as u64).sum()
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

/// Scan 64-byte slots from `TABLE_OFFSET` until `count` non-empty entries
/// are found.  Empty slots (ordinal 0) are skipped and not counted.
fn read_table<R: Read + Seek>(
    source:        &mut R,
    order:         ByteOrder,
    profile:       &ModelProfile,
    count:         usize,
    container_len: u64,
) -> Result<Vec<SubfileEntry>> {
    let table_end = (HEADER_SIZE as u64).min(container_len);
    source.seek(SeekFrom::Start(TABLE_OFFSET as u64))?;

    let mut entries = Vec::with_capacity(count);
    let mut slot_buf = [0u8; SLOT_SIZE];
    let mut slot = 0usize;
    while entries.len() < count {
        let slot_end = (TABLE_OFFSET + (slot + 1) * SLOT_SIZE) as u64;
        if slot_end > table_end {
            return Err(Error::TruncatedTable { found: entries.len(), expected: count });
        }
        source.read_exact(&mut slot_buf)?;
        let entry = SubfileEntry::read(&slot_buf[..], order, profile.entry_shape, slot)?;
        slot += 1;

        if entry.ordinal == 0 {
            trace!("slot {} empty", entry.slot);
            continue;
        }
        if entry.name().is_none() {
            return Err(Error::UnknownPart { ordinal: entry.ordinal, slot: entry.slot });
        }
        trace!("slot {}: part {} size {}", entry.slot, entry.ordinal, entry.size);
        entries.push(entry);
    }
    Ok(entries)
}

fn read_array<R: Read, const N: usize>(r: &mut R) -> io::Result<[u8; N]> {
    let mut b = [0u8; N];
    r.read_exact(&mut b)?;
    Ok(b)
}

/// Strip trailing NUL padding.
pub(crate) fn trim_nul(buf: &[u8]) -> String {
    let end = buf.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

fn pad_nul(s: &str, width: usize) -> Vec<u8> {
    fit(s.as_bytes(), width)
}

fn fit(bytes: &[u8], width: usize) -> Vec<u8> {
    let mut out = bytes[..bytes.len().min(width)].to_vec();
    out.resize(width, 0);
    out
}
