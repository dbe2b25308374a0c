use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::header::ByteOrder;
use crate::registry::EntryShape;

/// Size of one subfile-table slot.
pub const SLOT_SIZE: usize = 0x40;

/// Partition names, indexed by `ordinal - 1`.
pub const PART_NAMES: [&str; 10] = [
    "exe.img",
    "Image",
    "rootfs.img",
    "appdata.img",
    "loader",
    "onboot",
    "boot_image.raw",
    "bootsound",
    "cmac.bin",
    "key.bin",
];

/// Catalog name for a 1-based part number.
pub fn part_name(ordinal: u32) -> Option<&'static str> {
    let idx = (ordinal as usize).checked_sub(1)?;
    PART_NAMES.get(idx).copied()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubfileEntry {
    pub ordinal:  u32,
    pub size:     u32,
    /// Present only in the extended entry shape.  Never verified.
    pub checksum: Option<u32>,
    pub reserved: [u8; 4],
    /// Index of the table slot this entry came from.
    pub slot:     usize,
}

impl SubfileEntry {
    /// Catalog name, `None` for an out-of-range ordinal.
    pub fn name(&self) -> Option<&'static str> {
        part_name(self.ordinal)
    }

    /// Decode the significant prefix of one slot.  The caller has already
    /// read the whole slot; only `shape.prefix_len()` bytes are consumed.
    pub fn read<R: Read>(mut reader: R, order: ByteOrder, shape: EntryShape, slot: usize) -> io::Result<Self> {
        let ordinal = read_u32(&mut reader, order)?;
        let size    = read_u32(&mut reader, order)?;
        let checksum = match shape {
            EntryShape::Extended => Some(read_u32(&mut reader, order)?),
            EntryShape::Compact  => None,
        };
        let mut reserved = [0u8; 4];
        reader.read_exact(&mut reserved)?;
        Ok(Self { ordinal, size, checksum, reserved, slot })
    }

    /// Encode this entry as a full zero-padded slot.
    pub fn write<W: Write>(&self, mut writer: W, order: ByteOrder, shape: EntryShape) -> io::Result<()> {
        write_u32(&mut writer, order, self.ordinal)?;
        write_u32(&mut writer, order, self.size)?;
        if shape == EntryShape::Extended {
            write_u32(&mut writer, order, self.checksum.unwrap_or(0))?;
        }
        writer.write_all(&self.reserved)?;
        writer.write_all(&[0u8; SLOT_SIZE][shape.prefix_len()..])?;
        Ok(())
    }
}

pub(crate) fn read_u32<R: Read>(reader: &mut R, order: ByteOrder) -> io::Result<u32> {
    match order {
        ByteOrder::Little => reader.read_u32::<byteorder::LittleEndian>(),
        ByteOrder::Big    => reader.read_u32::<byteorder::BigEndian>(),
    }
}

pub(crate) fn write_u32<W: Write>(writer: &mut W, order: ByteOrder, v: u32) -> io::Result<()> {
    match order {
        ByteOrder::Little => writer.write_u32::<byteorder::LittleEndian>(v),
        ByteOrder::Big    => writer.write_u32::<byteorder::BigEndian>(v),
    }
}
