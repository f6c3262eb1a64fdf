//! Game Launcher (component G): composes the final loader invocation,
//! persists the active profile, sweeps conflicting processes, and
//! spawns the loader detached so it survives this process exiting.

pub mod detach;
pub mod error;
pub mod launcher;
pub mod params;

pub use error::LaunchError;
pub use launcher::{launch, quick_launch};
pub use params::LaunchParams;
