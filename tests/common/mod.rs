#![allow(dead_code)]

use aes::Aes128;
use cbc::cipher::{block_padding::NoPadding, BlockEncryptMut, KeyIvInit};
use ruf::{ByteOrder, ContainerHeader, ModelRegistry, SubfileEntry};

pub fn encrypt(plain: &[u8], key: &[u8; 16]) -> Vec<u8> {
    let mut buf = plain.to_vec();
    let len = buf.len();
    cbc::Encryptor::<Aes128>::new(key.into(), &[0u8; 16].into())
        .encrypt_padded_mut::<NoPadding>(&mut buf, len)
        .unwrap();
    buf
}

/// Build a complete container whose body holds `parts` back to back,
/// zero padded to the cipher block size, followed by a plain `trailer`.
pub fn build_container(model: &str, order: ByteOrder, parts: &[(u32, &[u8])], trailer: &[u8]) -> Vec<u8> {
    let registry = ModelRegistry::builtin();
    let profile = registry.lookup(model).unwrap();

    let mut body: Vec<u8> = parts.iter().flat_map(|(_, d)| d.iter().copied()).collect();
    body.resize(body.len().div_ceil(16) * 16, 0);

    let mut h = ContainerHeader::new(profile, order);
    h.firmware_date = "2010.06.14".into();
    h.manufacturer = "SAMSUNG".into();
    h.encrypted_size = body.len() as u32;
    h.subfile_count = parts.len() as u8;
    h.subfiles = parts
        .iter()
        .enumerate()
        .map(|(slot, (ordinal, data))| SubfileEntry {
            ordinal: *ordinal,
            size: data.len() as u32,
            checksum: Some(0),
            reserved: [0; 4],
            slot,
        })
        .collect();

    let mut out = Vec::new();
    h.write(&mut out).unwrap();
    out.extend(encrypt(&body, &profile.key));
    out.extend_from_slice(trailer);
    out
}

/// A container whose table claims far more data than the file holds.
pub fn oversized_container() -> Vec<u8> {
    let mut bytes = build_container("C6900", ByteOrder::Little, &[(3, &[1u8; 16])], &[]);
    // size field of the entry in slot 0 (little-endian)
    bytes[0x124..0x128].copy_from_slice(&0x0100_0000u32.to_le_bytes());
    bytes
}
