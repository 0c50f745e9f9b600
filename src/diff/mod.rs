mod engine;
mod types;

pub use engine::DiffEngine;
pub use types::{FileDiff, GroupDiff, ManifestDiff};
