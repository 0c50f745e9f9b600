//! Distribution and incremental synchronization of versioned file bundles.
//!
//! A [`manifest::Manifest`] describes named groups of files with their sizes
//! and content hashes. [`coordinator::SyncCoordinator`] downloads a bundle
//! into a directory, verifies it, and updates it against newer manifests by
//! fetching only what the [`diff::DiffEngine`] says changed.

pub mod coordinator;
pub mod diff;
pub mod fs;
pub mod hash;
pub mod manifest;
pub mod server;
pub mod transfer;
