//! Model registry: per-device-model cipher keys and header layouts.
//!
//! Every RUF container names the device model it targets.  The model decides
//! three things the parser cannot infer from the file itself:
//!   - the AES-128 key that protects the body,
//!   - the widths of the two secondary header fields that follow the model
//!     string (and therefore where the encrypted size lives),
//!   - the shape of each subfile-table entry.
//!
//! The registry is a plain value.  Build it once (usually with
//! [`ModelRegistry::builtin`], optionally merged with a profiles file) and
//! pass it by reference to [`crate::header::ContainerHeader::parse`].
//! Supporting a new model is a data insertion, never a parser change.
//!
//! # Profiles file
//! ```json
//! [
//!   { "model": "C6800", "key": "00112233445566778899aabbccddeeff",
//!     "secondary_widths": [31, 5], "entry_shape": "extended" }
//! ]
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ── Built-in keys ────────────────────────────────────────────────────────────

/// BD-C6900 body key.
pub const KEY_C6900: [u8; 16] = [
    0xEA,0xEA,0x51,0x2D, 0xA9,0x1F,0x87,0xE1,
    0xC4,0x15,0x4C,0x3E, 0xDB,0x7A,0xAD,0xB8,
];
/// BD-C5500 body key.
pub const KEY_C5500: [u8; 16] = [
    0x48,0x77,0x81,0x5A, 0x17,0x51,0x14,0x80,
    0xF9,0xD1,0x5B,0xDF, 0xE3,0x0C,0x21,0x63,
];

/// Secondary fields start at 0x54 and the encrypted size that follows them
/// must end before the subfile count at 0xC1.
pub const MAX_SECONDARY_LEN: usize = 0xC1 - 0x54 - 4;

// ── EntryShape ───────────────────────────────────────────────────────────────

/// Significant prefix of a 64-byte subfile-table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryShape {
    /// 12 bytes: ordinal, size, reserved.
    Compact,
    /// 16 bytes: ordinal, size, checksum, reserved.
    Extended,
}

impl EntryShape {
    /// Number of leading slot bytes that carry data.
    pub fn prefix_len(self) -> usize {
        match self {
            EntryShape::Compact  => 12,
            EntryShape::Extended => 16,
        }
    }
}

// ── ModelProfile ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelProfile {
    pub model:            String,
    pub key:              [u8; 16],
    /// Widths of the two raw fields starting at 0x54.
    pub secondary_widths: (usize, usize),
    pub entry_shape:      EntryShape,
}

impl ModelProfile {
    pub fn new(model: &str, key: [u8; 16], secondary_widths: (usize, usize), entry_shape: EntryShape) -> Self {
        Self { model: model.to_owned(), key, secondary_widths, entry_shape }
    }

    /// Total bytes of model-specific fields between the model string and the
    /// encrypted size.
    pub fn secondary_len(&self) -> usize {
        self.secondary_widths.0 + self.secondary_widths.1
    }

    pub fn key_hex(&self) -> String {
        hex::encode_upper(self.key)
    }
}

/// On-disk form of a profile in a profiles file.
#[derive(Debug, Serialize, Deserialize)]
struct ProfileRecord {
    model:            String,
    key:              String,
    secondary_widths: (usize, usize),
    #[serde(default = "default_shape")]
    entry_shape:      EntryShape,
}

fn default_shape() -> EntryShape { EntryShape::Extended }

impl TryFrom<ProfileRecord> for ModelProfile {
    type Error = Error;

    fn try_from(r: ProfileRecord) -> Result<Self> {
        if r.model.is_empty() || r.model.len() > 32 {
            return Err(Error::Profile(format!("model id {:?} must be 1..=32 bytes", r.model)));
        }
        let (a, b) = r.secondary_widths;
        if a + b > MAX_SECONDARY_LEN {
            return Err(Error::Profile(format!(
                "{}: secondary fields {a}+{b} overrun the subfile count at 0xC1", r.model)));
        }
        let bytes = hex::decode(r.key.trim())
            .map_err(|e| Error::Profile(format!("{}: bad key hex: {e}", r.model)))?;
        let key: [u8; 16] = bytes.as_slice().try_into()
            .map_err(|_| Error::Profile(format!("{}: key must be 16 bytes, got {}", r.model, bytes.len())))?;
        Ok(ModelProfile {
            model: r.model,
            key,
            secondary_widths: r.secondary_widths,
            entry_shape: r.entry_shape,
        })
    }
}

// ── ModelRegistry ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    profiles: BTreeMap<String, ModelProfile>,
}

impl ModelRegistry {
    /// An empty registry.  Every lookup fails until profiles are inserted.
    pub fn new() -> Self {
        Self::default()
    }

    /// The models known to this build.
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        reg.insert(ModelProfile::new("C6900", KEY_C6900, (31, 5), EntryShape::Extended));
        reg.insert(ModelProfile::new("C5500", KEY_C5500, (33, 5), EntryShape::Extended));
        reg
    }

    /// Add a profile, replacing any existing one for the same model.
    pub fn insert(&mut self, profile: ModelProfile) {
        self.profiles.insert(profile.model.clone(), profile);
    }

    /// Resolve a model string (already stripped of NUL padding).
    pub fn lookup(&self, model: &str) -> Result<&ModelProfile> {
        self.profiles
            .get(model)
            .ok_or_else(|| Error::UnknownModel(model.to_owned()))
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Merge profiles from a JSON array.  Returns how many were added.
    pub fn load_json<R: Read>(&mut self, reader: R) -> Result<usize> {
        let records: Vec<ProfileRecord> = serde_json::from_reader(reader)?;
        let n = records.len();
        for record in records {
            let profile = ModelProfile::try_from(record)?;
            debug!("loaded profile for model {}", profile.model);
            self.insert(profile);
        }
        Ok(n)
    }

    /// Built-in profiles merged with those in `path`.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reg = Self::builtin();
        reg.load_json(BufReader::new(File::open(path)?))?;
        Ok(reg)
    }
}
