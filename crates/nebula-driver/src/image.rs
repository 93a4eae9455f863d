//! Boot image provisioning.
//!
//! Every machine boots from an image named `b2d-<machine-name>` registered in
//! a datastore. The image is created on first use and reused afterwards, so
//! a create that fails after this point can simply be retried.

use crate::orchestrator::Orchestrator;
use crate::poll::{poll_until, PollPolicy, Step};
use crate::spec::ImageSpec;
use nebula_common::config::parse_datastore_id;
use nebula_common::{Error, ImageId, Result};

/// Name of the boot image registered for a machine.
pub fn image_name(machine_name: &str) -> String {
    format!("b2d-{machine_name}")
}

/// Ensures a machine's boot image exists and is ready.
pub struct ImageProvisioner<'a> {
    orchestrator: &'a dyn Orchestrator,
    policy: PollPolicy,
}

impl<'a> ImageProvisioner<'a> {
    /// Create a provisioner polling new images with the given policy.
    pub fn new(orchestrator: &'a dyn Orchestrator, policy: PollPolicy) -> Self {
        Self {
            orchestrator,
            policy,
        }
    }

    /// Return the id of the machine's boot image, registering it if needed.
    ///
    /// # Arguments
    /// * `machine_name` - Machine the image belongs to
    /// * `source_url` - Where the orchestrator downloads the image from
    /// * `datastore_id` - Numeric id of the target datastore
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] for a malformed datastore id before
    /// any remote call, [`Error::UnexpectedImageState`] if a new image
    /// reports anything but `INIT`, `LOCKED` or `READY`, and
    /// [`Error::Timeout`] if it is not ready in time.
    pub async fn ensure_image(
        &self,
        machine_name: &str,
        source_url: &str,
        datastore_id: &str,
    ) -> Result<ImageId> {
        let datastore = parse_datastore_id(datastore_id)?;
        let name = image_name(machine_name);

        if let Some(id) = self.orchestrator.lookup_image_by_name(&name).await? {
            let image = self.orchestrator.describe_image(id).await?;
            tracing::info!(image = %name, image_id = %id, state = %image.state, "Reusing registered boot image");
            return Ok(id);
        }

        tracing::info!(image = %name, datastore, source = %source_url, "Registering boot image");
        let spec = ImageSpec::new(&name, source_url);
        let id = self
            .orchestrator
            .create_image(&spec.to_template(), datastore)
            .await?;
        tracing::debug!(image = %name, image_id = %id, "Image created, waiting until ready");

        self.wait_until_ready(&name, id).await?;

        tracing::info!(image = %name, image_id = %id, "Boot image registered");
        Ok(id)
    }

    async fn wait_until_ready(&self, name: &str, id: ImageId) -> Result<()> {
        let orchestrator = self.orchestrator;
        let what = format!("image {name} to become ready");

        poll_until(self.policy, &what, || async move {
            let image = orchestrator.describe_image(id).await?;
            match image.state.as_str() {
                "READY" => Ok(Step::Ready(())),
                "INIT" | "LOCKED" => Ok(Step::Pending(image.state.clone())),
                _ => {
                    tracing::error!(image = %name, state = %image.state, "Unexpected image state");
                    Err(Error::UnexpectedImageState {
                        image: name.to_string(),
                        state: image.state.clone(),
                    })
                }
            }
        })
        .await
    }
}
