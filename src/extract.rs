//! Slice a decrypted container into its named partition images.

use log::debug;

use crate::error::{Error, Result};
use crate::header::{ContainerHeader, HEADER_SIZE};
use crate::subfile::part_name;

/// One partition image borrowed from the decrypted buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subfile<'a> {
    pub ordinal: u32,
    pub name:    &'static str,
    /// Offset of `data` within the decrypted container.
    pub offset:  usize,
    pub data:    &'a [u8],
}

impl Subfile<'_> {
    /// Output file name, e.g. `"03.rootfs.img"`.
    pub fn file_name(&self) -> String {
        format!("{:02}.{}", self.ordinal, self.name)
    }
}

/// Walk the subfile table in table order, taking `size` bytes per entry
/// from offset 0x800 onward.
///
/// Nothing is copied; every slice borrows `plaintext`.
pub fn extract<'a>(plaintext: &'a [u8], header: &ContainerHeader) -> Result<Vec<Subfile<'a>>> {
    let mut cursor = HEADER_SIZE;
    let mut out = Vec::with_capacity(header.subfiles.len());

    for entry in &header.subfiles {
        let name = part_name(entry.ordinal)
            .ok_or(Error::UnknownPart { ordinal: entry.ordinal, slot: entry.slot })?;
        let available = plaintext.len().saturating_sub(cursor);
        let size = entry.size as usize;
        if size > available {
            return Err(Error::TruncatedData {
                ordinal:   entry.ordinal,
                needed:    entry.size as u64,
                available: available as u64,
            });
        }
        debug!("part {:02} {} at {:#x}, {} bytes", entry.ordinal, name, cursor, size);
        out.push(Subfile {
            ordinal: entry.ordinal,
            name,
            offset:  cursor,
            data:    &plaintext[cursor..cursor + size],
        });
        cursor += size;
    }
    Ok(out)
}
