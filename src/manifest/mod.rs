mod codec;
pub mod error;
pub mod generate;
pub mod path;
pub mod types;

pub use codec::MANIFEST_FILE_NAME;
pub use error::{ManifestError, ManifestResult};
pub use generate::{GenerateOptions, ManifestGenerator};
pub use types::{FileEntry, Group, Manifest, UpdatePolicy};
