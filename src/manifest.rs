use serde::{Deserialize, Serialize};

use crate::header::ContainerHeader;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub ordinal:   u32,
    pub name:      String,
    pub file_name: String,
    pub size:      u32,
    /// Reported as found in the table; never verified.
    pub checksum:  Option<u32>,
    pub slot:      usize,
}

/// Serializable summary of a parsed container header.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub file_type:      String,
    pub byte_order:     String,
    pub firmware_date:  String,
    pub manufacturer:   String,
    pub model:          String,
    pub encrypted_size: u32,
    pub container_len:  u64,
    pub trailer_len:    u64,
    pub subfile_count:  u8,
    pub subfiles:       Vec<ManifestEntry>,
}

impl Manifest {
    pub fn from_header(h: &ContainerHeader) -> Self {
        let subfiles = h.subfiles.iter().map(|e| {
            let name = e.name().unwrap_or("unknown");
            ManifestEntry {
                ordinal:   e.ordinal,
                name:      name.to_owned(),
                file_name: format!("{:02}.{}", e.ordinal, name),
                size:      e.size,
                checksum:  e.checksum,
                slot:      e.slot,
            }
        }).collect();

        Self {
            file_type:      hex::encode(h.file_type),
            byte_order:     h.byte_order.name().to_owned(),
            firmware_date:  h.firmware_date.clone(),
            manufacturer:   h.manufacturer.clone(),
            model:          h.model.clone(),
            encrypted_size: h.encrypted_size,
            container_len:  h.container_len,
            trailer_len:    h.trailer_len(),
            subfile_count:  h.subfile_count,
            subfiles,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::ByteOrder;
    use crate::registry::ModelRegistry;
    use crate::subfile::SubfileEntry;

    #[test]
    fn manifest_lists_parts() {
        let reg = ModelRegistry::builtin();
        let mut h = ContainerHeader::new(reg.lookup("C5500").unwrap(), ByteOrder::Big);
        h.manufacturer = "SAMSUNG".into();
        h.encrypted_size = 0x100;
        h.container_len = 0x900;
        h.subfile_count = 1;
        h.subfiles = vec![SubfileEntry { ordinal: 7, size: 0x80, checksum: Some(0x1234), reserved: [0; 4], slot: 0 }];

        let m = Manifest::from_header(&h);
        assert_eq!(m.file_type, "525546000000");
        assert_eq!(m.byte_order, "big-endian");
        assert_eq!(m.trailer_len, 0);
        assert_eq!(m.subfiles[0].file_name, "07.boot_image.raw");
        assert_eq!(m.subfiles[0].checksum, Some(0x1234));

        let json = m.to_json().unwrap();
        assert!(json.contains("\"model\": \"C5500\""));
        assert_eq!(Manifest::from_json(&json).unwrap(), m);
    }
}
