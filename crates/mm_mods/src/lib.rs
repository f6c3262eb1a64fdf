//! Mod composition core: loader-file provisioning, scanning and
//! classification, the external-mod registry, the in-memory mod model,
//! the loader-profile writer/parser, and presets (components B–F).
//!
//! Built on `mm_core` for paths, error context, and filesystem helpers;
//! knows nothing about launching the game or the overlay network.

pub mod classify;
pub mod error;
pub mod model;
pub mod preset;
pub mod provisioner;
pub mod registry;
pub mod types;
pub mod writer;

pub use types::{DependencyRef, ModKind, ModPackage, NativeEntry, strip_external_suffix};
