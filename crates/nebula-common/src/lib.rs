//! Common types and utilities shared by the OpenNebula machine driver.
//!
//! This crate provides:
//! - Core domain types (VmId, ImageId, MachineState, VM/image descriptions)
//! - Error handling types
//! - Driver configuration

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use config::{DriverConfig, NetworkSelector};
pub use error::{Error, Result};
pub use types::{ImageId, ImageInfo, MachineState, Nic, VmId, VmInfo};
