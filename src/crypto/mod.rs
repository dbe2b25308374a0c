//! AES-128-CBC body decryption for RUF containers.
//!
//! Layout of a container after decryption is identical to the input except
//! for the body:
//!
//! [ header (0x800 B, plain) | body (encrypted_size B, AES-128-CBC) | trailer (plain) ]
//!
//! The body uses the model key, a zero IV and no padding.  Two formulations
//! of the chaining are provided and must agree on block-aligned input:
//!   - [`decrypt_cbc`]: one standard CBC pass (the canonical path),
//!   - [`decrypt_chained_blocks`]: per-block AES decryption XORed with the
//!     previous ciphertext block, the first one with zeros.

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, KeyInit};
use aes::Aes128;
use cbc::cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit};
use log::debug;
use std::io::{Read, Seek, SeekFrom};

use crate::error::{Error, Result};
use crate::header::{ContainerHeader, HEADER_SIZE};

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;
/// Every container body is chained from an all-zero IV.
pub const ZERO_IV: [u8; BLOCK_SIZE] = [0u8; BLOCK_SIZE];

type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Decrypt the whole container in `source`.
///
/// Returns a buffer of the same length as the container: the header region
/// and trailer copied verbatim, the body replaced by plaintext.  The source
/// is rewound to offset 0 afterwards.
pub fn decrypt<R: Read + Seek>(source: &mut R, header: &ContainerHeader) -> Result<Vec<u8>> {
    let size = header.encrypted_size;
    if size as usize % BLOCK_SIZE != 0 {
        return Err(Error::Alignment(size));
    }

    let container_len = source.seek(SeekFrom::End(0))?;
    let required = header.body_range().end;
    if required > container_len {
        return Err(Error::TruncatedBody { required, actual: container_len });
    }

    source.seek(SeekFrom::Start(0))?;
    let mut out = Vec::with_capacity(container_len as usize);
    source.read_to_end(&mut out)?;
    source.seek(SeekFrom::Start(0))?;

    debug!("decrypting {} body bytes with {} key", size, header.profile.model);
    let body = &mut out[HEADER_SIZE..HEADER_SIZE + size as usize];
    decrypt_cbc_in_place(body, &header.profile.key)?;
    Ok(out)
}

/// Standard AES-128-CBC decryption with a zero IV.
pub fn decrypt_cbc(data: &[u8], key: &[u8; 16]) -> Result<Vec<u8>> {
    let mut buf = data.to_vec();
    decrypt_cbc_in_place(&mut buf, key)?;
    Ok(buf)
}

fn decrypt_cbc_in_place(buf: &mut [u8], key: &[u8; 16]) -> Result<()> {
    let len = buf.len() as u32;
    if buf.len() % BLOCK_SIZE != 0 {
        return Err(Error::Alignment(len));
    }
    Aes128CbcDec::new(key.into(), &ZERO_IV.into())
        .decrypt_padded_mut::<NoPadding>(buf)
        .map_err(|_| Error::Alignment(len))?;
    Ok(())
}

/// Block-wise formulation: `P[i] = D(C[i]) ^ C[i-1]`, `C[-1] = 0`.
pub fn decrypt_chained_blocks(data: &[u8], key: &[u8; 16]) -> Result<Vec<u8>> {
    if data.len() % BLOCK_SIZE != 0 {
        return Err(Error::Alignment(data.len() as u32));
    }
    let cipher = Aes128::new(GenericArray::from_slice(key));
    let mut out = Vec::with_capacity(data.len());
    let mut prev = ZERO_IV;
    for chunk in data.chunks_exact(BLOCK_SIZE) {
        let mut block = GenericArray::clone_from_slice(chunk);
        cipher.decrypt_block(&mut block);
        out.extend(block.iter().zip(prev.iter()).map(|(p, c)| p ^ c));
        prev.copy_from_slice(chunk);
    }
    Ok(out)
}
