pub mod error;
pub mod registry;
pub mod subfile;
pub mod header;
pub mod crypto;
pub mod extract;
pub mod manifest;
pub mod container;
pub mod batch;

pub use error::{Error, Result};
pub use registry::{EntryShape, ModelProfile, ModelRegistry};
pub use header::{ByteOrder, ContainerHeader};
pub use subfile::{part_name, SubfileEntry};
pub use crypto::decrypt;
pub use extract::{extract, Subfile};
pub use container::Container;
