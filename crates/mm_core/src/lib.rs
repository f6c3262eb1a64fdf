//! Shared foundation for every other crate in this workspace: the
//! install-root path resolver (component A), logging, error types,
//! bounded-concurrency job running, small filesystem helpers, and
//! foreign-process tracking / elevation.
//!
//! Nothing here knows about mods, loaders, profiles, or the overlay
//! network; those live in `mm_mods`, `mm_launch`, and `mm_overlay`.

pub mod error;
pub mod fsutil;
pub mod jobs;
pub mod paths;
pub mod print;
pub mod process;

pub use error::{IntoIoError, IntoJsonError, IntoStringError, IoError, JsonError, JsonFileError};
pub use jobs::{do_jobs, do_jobs_with_limit, retry};
