//! Overlay network: config generation, supervision, network
//! optimization, room storage/share-codes, and auxiliary-tool
//! provisioning (components H–L).
//!
//! Built on `mm_core` for paths, process tracking/elevation, and
//! filesystem helpers; `mm_launch` and `modmesh` drive this crate but it
//! knows nothing about either.

pub mod config;
pub mod error;
pub mod optimizer;
pub mod rooms;
pub mod supervisor;
pub mod tool_provisioner;
pub mod types;

pub use supervisor::OverlaySupervisor;
pub use types::{OverlayEvent, OverlayState, RoomConfig};
