//! Domain types used throughout the OpenNebula machine driver.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric identifier the orchestrator assigns to a VM.
///
/// Only valid for the duration of one top-level operation: VMs are always
/// re-resolved by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VmId(u32);

impl VmId {
    /// Wrap a raw orchestrator id.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw numeric id.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for VmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for VmId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Numeric identifier the orchestrator assigns to a disk image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(u32);

impl ImageId {
    /// Wrap a raw orchestrator id.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw numeric id.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ImageId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// State of a machine as seen by callers of the driver.
///
/// This is a projection of the orchestrator's two-level state and is
/// recomputed on every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineState {
    /// Unknown or unresolved
    None,
    /// Pending, booting or being staged
    Starting,
    /// Guest is executing
    Running,
    /// Powered off
    Stopped,
    /// Memory saved to disk
    Saved,
    /// Shutting down or cleaning up
    Stopping,
    /// Failed, finished, or unrecognized
    Error,
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineState::None => write!(f, ""),
            MachineState::Starting => write!(f, "Starting"),
            MachineState::Running => write!(f, "Running"),
            MachineState::Stopped => write!(f, "Stopped"),
            MachineState::Saved => write!(f, "Saved"),
            MachineState::Stopping => write!(f, "Stopping"),
            MachineState::Error => write!(f, "Error"),
        }
    }
}

/// A network interface as reported in a VM description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nic {
    /// Name of the virtual network the interface is attached to
    pub network: Option<String>,
    /// Address leased to the interface
    pub ip: Option<String>,
}

/// Description of a VM as reported by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmInfo {
    /// Orchestrator id
    pub id: VmId,
    /// VM name
    pub name: String,
    /// Coarse lifecycle state (e.g. `ACTIVE`, `POWEROFF`)
    pub state: String,
    /// Fine-grained sub-state, meaningful only when `state` is `ACTIVE`
    pub lcm_state: String,
    /// Network interfaces in template order
    #[serde(default)]
    pub nics: Vec<Nic>,
}

impl VmInfo {
    /// Create a description with no network interfaces.
    pub fn new(
        id: VmId,
        name: impl Into<String>,
        state: impl Into<String>,
        lcm_state: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            state: state.into(),
            lcm_state: lcm_state.into(),
            nics: Vec::new(),
        }
    }

    /// Attach a NIC with the given address.
    pub fn with_nic_ip(mut self, ip: impl Into<String>) -> Self {
        self.nics.push(Nic {
            network: None,
            ip: Some(ip.into()),
        });
        self
    }
}

/// Description of a disk image as reported by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Orchestrator id
    pub id: ImageId,
    /// Image name
    pub name: String,
    /// Image state (e.g. `INIT`, `LOCKED`, `READY`)
    pub state: String,
}
