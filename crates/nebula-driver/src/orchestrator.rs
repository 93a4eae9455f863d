//! Remote orchestrator seam.

use crate::template::Template;
use async_trait::async_trait;
use nebula_common::{ImageId, ImageInfo, Result, VmId, VmInfo};

/// Operations the driver needs from the OpenNebula front-end.
///
/// This abstraction keeps the transport (XML-RPC, authentication) out of
/// the lifecycle logic. Implementations report failures as
/// [`nebula_common::Error::Remote`]; the driver propagates them unchanged.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Resolve a VM name to its id.
    ///
    /// # Returns
    /// `None` when no VM with that name is visible.
    async fn lookup_vm_by_name(&self, name: &str) -> Result<Option<VmId>>;

    /// Fetch a fresh description of a VM.
    async fn describe_vm(&self, id: VmId) -> Result<VmInfo>;

    /// Instantiate a VM from a template.
    ///
    /// # Arguments
    /// * `template` - VM template
    /// * `hold` - create the VM on hold instead of deploying it immediately
    async fn create_vm(&self, template: &Template, hold: bool) -> Result<VmId>;

    /// Resume a stopped, suspended, undeployed or powered-off VM.
    async fn resume_vm(&self, id: VmId) -> Result<()>;

    /// Power off a VM, either through ACPI or by destroying the hypervisor process.
    async fn power_off_vm(&self, id: VmId, hard: bool) -> Result<()>;

    /// Reboot a VM.
    async fn reboot_vm(&self, id: VmId) -> Result<()>;

    /// Shut a VM down and release its resources.
    async fn terminate_vm(&self, id: VmId, hard: bool) -> Result<()>;

    /// Resolve an image name to its id.
    ///
    /// # Returns
    /// `None` when no image with that name is visible.
    async fn lookup_image_by_name(&self, name: &str) -> Result<Option<ImageId>>;

    /// Fetch a fresh description of an image.
    async fn describe_image(&self, id: ImageId) -> Result<ImageInfo>;

    /// Register a new image in a datastore.
    async fn create_image(&self, template: &Template, datastore: u32) -> Result<ImageId>;
}
