//! # nebula-driver
//!
//! Machine driver provisioning Docker hosts as OpenNebula VMs.
//! Works against any [`Orchestrator`] implementation.
//!
//! ## Quick Start
//!
//! ```no_run
//! use nebula_driver::{Driver, DriverConfig, Orchestrator};
//! use std::sync::Arc;
//!
//! # async fn example(orchestrator: Arc<dyn Orchestrator>) -> nebula_driver::Result<()> {
//! let config = DriverConfig::from_env()?;
//! let mut driver = Driver::new("docker-1", "/var/lib/machine", config, orchestrator)?;
//!
//! // Registers the boot image, instantiates the VM and waits for SSH
//! driver.create().await?;
//! println!("{}", driver.get_url().await?);
//!
//! driver.stop().await?;
//! driver.remove().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Lifecycle Management**: Create, start, stop, restart, kill, and remove machines
//! - **Image Reuse**: Boot images are registered once per machine and reused on retry
//! - **State Translation**: Orchestrator VM/LCM state pairs mapped to machine states
//! - **Template Rendering**: VM and image specs rendered to the orchestrator's template format

mod address;
mod driver;
mod image;
mod orchestrator;
mod poll;
mod spec;
mod ssh;
mod state;
mod template;

pub use address::nic_address;
pub use driver::{Driver, DOCKER_PORT, DRIVER_NAME};
pub use image::{image_name, ImageProvisioner};
pub use orchestrator::Orchestrator;
pub use poll::{poll_until, PollPolicy, Step};
pub use spec::{ContextSpec, DiskSpec, GraphicsSpec, ImageSpec, VmSpec, VmSpecBuilder, DEV_PREFIX};
pub use ssh::{public_key_path, KeyManager, ReachabilityProbe, SshBannerProbe, SshKeygen};
pub use state::{machine_state, translate};
pub use template::{Template, Vector};

pub use nebula_common::{
    DriverConfig, Error, ImageId, ImageInfo, MachineState, NetworkSelector, Nic, Result, VmId,
    VmInfo,
};
