//! High-level [`Container`] API, the primary embedding surface.
//!
//! ```no_run
//! use ruf::container::Container;
//! use ruf::registry::ModelRegistry;
//!
//! let registry = ModelRegistry::builtin();
//! let fw = Container::open("BD-C6900.RUF", &registry)?;
//! for part in fw.subfiles()? {
//!     println!("{} ({} bytes)", part.file_name(), part.data.len());
//! }
//! fw.extract_all("BD-C6900")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use log::{info, warn};
use std::fs::{self, File};
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use crate::crypto::decrypt;
use crate::error::Result;
use crate::extract::{extract, Subfile};
use crate::header::ContainerHeader;
use crate::manifest::Manifest;
use crate::registry::ModelRegistry;

/// A parsed and decrypted container.
#[derive(Debug, Clone)]
pub struct Container {
    header:    ContainerHeader,
    plaintext: Vec<u8>,
}

impl Container {
    // ── Constructors ─────────────────────────────────────────────────────────

    pub fn open<P: AsRef<Path>>(path: P, registry: &ModelRegistry) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::from_reader(&mut reader, registry)
    }

    /// Parse and decrypt any seekable source.  The source is left at
    /// offset 0.
    pub fn from_reader<R: Read + Seek>(reader: &mut R, registry: &ModelRegistry) -> Result<Self> {
        let header = ContainerHeader::parse(reader, registry)?;
        let plaintext = decrypt(reader, &header)?;
        Ok(Self { header, plaintext })
    }

    // ── Read ──────────────────────────────────────────────────────────────────

    pub fn header(&self) -> &ContainerHeader { &self.header }

    /// The whole decrypted container, header and trailer included.
    pub fn plaintext(&self) -> &[u8] { &self.plaintext }

    pub fn manifest(&self) -> Manifest { Manifest::from_header(&self.header) }

    pub fn subfiles(&self) -> Result<Vec<Subfile<'_>>> {
        extract(&self.plaintext, &self.header)
    }

    // ── Write ─────────────────────────────────────────────────────────────────

    /// Write every subfile into `dest`, creating it if necessary.
    ///
    /// All slices are resolved before the first file is created, so a
    /// truncated container produces no output at all.  If a write fails,
    /// the files already written are removed again, and so is `dest` when
    /// this call created it.
    pub fn extract_all<P: AsRef<Path>>(&self, dest: P) -> Result<Vec<PathBuf>> {
        let dest = dest.as_ref();
        let parts = self.subfiles()?;
        let created = !dest.exists();
        fs::create_dir_all(dest)?;

        let mut written = Vec::with_capacity(parts.len());
        for part in parts {
            let out = dest.join(part.file_name());
            if let Err(e) = fs::write(&out, part.data) {
                written.push(out);
                discard(&written, created.then_some(dest));
                return Err(e.into());
            }
            info!("wrote {} ({} bytes)", out.display(), part.data.len());
            written.push(out);
        }
        Ok(written)
    }

    /// Persist the full decrypted container.
    pub fn write_plaintext<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, &self.plaintext)?;
        Ok(())
    }
}

/// Undo a failed `extract_all`.
fn discard(files: &[PathBuf], dir: Option<&Path>) {
    for f in files.iter().filter(|f| f.is_file()) {
        if let Err(e) = fs::remove_file(f) {
            warn!("could not remove {}: {}", f.display(), e);
        }
    }
    if let Some(dir) = dir {
        if let Err(e) = fs::remove_dir(dir) {
            warn!("could not remove {}: {}", dir.display(), e);
        }
    }
}

/// Default extraction directory: the input path without its extension
/// (`fw/BD-C6900.RUF` → `fw/BD-C6900`), or with `.dir` appended when there
/// is no extension to strip.
pub fn default_output_dir<P: AsRef<Path>>(input: P) -> PathBuf {
    let input = input.as_ref();
    if input.extension().is_some() {
        input.with_extension("")
    } else {
        let mut name = input.as_os_str().to_owned();
        name.push(".dir");
        PathBuf::from(name)
    }
}
