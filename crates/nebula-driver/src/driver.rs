//! Machine lifecycle driven through the orchestrator.

use crate::address;
use crate::image::ImageProvisioner;
use crate::orchestrator::Orchestrator;
use crate::poll::{poll_until, PollPolicy, Step};
use crate::spec::VmSpec;
use crate::ssh::{public_key_path, KeyManager, ReachabilityProbe, SshBannerProbe, SshKeygen};
use crate::state;
use nebula_common::{DriverConfig, Error, MachineState, Result, VmId};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Name the driver registers under.
pub const DRIVER_NAME: &str = "opennebula";

/// Port the Docker daemon in the guest listens on.
pub const DOCKER_PORT: u16 = 2376;

/// Drives one named machine through its lifecycle.
///
/// Every verb resolves the VM by name once and threads the resolved id
/// through the rest of the operation; nothing but the last known address is
/// kept between calls.
pub struct Driver {
    machine_name: String,
    store_path: PathBuf,
    config: DriverConfig,
    ip_address: Option<String>,
    orchestrator: Arc<dyn Orchestrator>,
    keys: Arc<dyn KeyManager>,
    probe: Arc<dyn ReachabilityProbe>,
}

impl Driver {
    /// Create a driver for the named machine.
    ///
    /// Uses `ssh-keygen` for key material and waits for the SSH banner for
    /// reachability; see [`Driver::with_key_manager`] and
    /// [`Driver::with_reachability_probe`] to replace them.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if the configuration is invalid. No
    /// remote call is made.
    pub fn new(
        machine_name: impl Into<String>,
        store_path: impl Into<PathBuf>,
        config: DriverConfig,
        orchestrator: Arc<dyn Orchestrator>,
    ) -> Result<Self> {
        config.validate()?;
        let probe = SshBannerProbe::new(config.ssh_timeout());

        Ok(Self {
            machine_name: machine_name.into(),
            store_path: store_path.into(),
            config,
            ip_address: None,
            orchestrator,
            keys: Arc::new(SshKeygen),
            probe: Arc::new(probe),
        })
    }

    /// Replace the key manager.
    pub fn with_key_manager(mut self, keys: Arc<dyn KeyManager>) -> Self {
        self.keys = keys;
        self
    }

    /// Replace the reachability probe.
    pub fn with_reachability_probe(mut self, probe: Arc<dyn ReachabilityProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Name of this driver.
    pub fn driver_name(&self) -> &'static str {
        DRIVER_NAME
    }

    /// Name of the machine this driver manages.
    pub fn machine_name(&self) -> &str {
        &self.machine_name
    }

    /// Configuration in use.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Last known address, without contacting the orchestrator.
    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    /// Private key used to log into the machine.
    pub fn ssh_key_path(&self) -> PathBuf {
        self.store_path
            .join("machines")
            .join(&self.machine_name)
            .join("id_rsa")
    }

    /// Public half of [`Driver::ssh_key_path`].
    pub fn public_ssh_key_path(&self) -> PathBuf {
        public_key_path(&self.ssh_key_path())
    }

    /// User to log in as.
    pub fn get_ssh_username(&self) -> &str {
        &self.config.ssh_user
    }

    /// Port the guest's SSH daemon listens on.
    pub fn get_ssh_port(&self) -> u16 {
        self.config.ssh_port
    }

    /// Check that a create can be attempted.
    pub fn pre_create_check(&self) -> Result<()> {
        self.config.validate()
    }

    /// Create the machine and wait until it is reachable over SSH.
    ///
    /// This will:
    /// 1. Generate the SSH key pair
    /// 2. Register the boot image, or reuse it if already registered
    /// 3. Instantiate the VM from the assembled template
    /// 4. Record its address
    /// 5. Wait for it to run and accept SSH connections
    ///
    /// Nothing is rolled back on failure; a registered image is reused by
    /// the next attempt.
    pub async fn create(&mut self) -> Result<()> {
        let start = Instant::now();
        tracing::info!(machine = %self.machine_name, "Creating machine");

        let key_path = self.ssh_key_path();
        tracing::debug!(machine = %self.machine_name, path = %key_path.display(), "Creating SSH key");
        self.keys.generate(&key_path).await?;
        let public_key = self.keys.public_key(&key_path).await?;

        let image_policy = PollPolicy::deadline(
            self.config.image_poll_interval(),
            self.config.image_ready_timeout(),
        );
        let image_id = ImageProvisioner::new(self.orchestrator.as_ref(), image_policy)
            .ensure_image(
                &self.machine_name,
                &self.config.boot2docker_url,
                &self.config.datastore_id,
            )
            .await?;

        let spec = VmSpec::from_config(&self.machine_name, &self.config, image_id, &public_key)?;
        tracing::info!(machine = %self.machine_name, image_id = %image_id, "Starting VM");
        let id = self.orchestrator.create_vm(&spec.to_template(), false).await?;
        tracing::debug!(machine = %self.machine_name, vm_id = %id, "VM instantiated");

        let ip = self.address_of(id).await?;
        tracing::debug!(machine = %self.machine_name, vm_id = %id, ip = %ip, "Address assigned");

        self.wait_until_reachable(id).await?;

        tracing::info!(
            machine = %self.machine_name,
            vm_id = %id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Machine created"
        );
        Ok(())
    }

    /// Resume the machine and wait until it is reachable over SSH.
    ///
    /// A rejected resume is tolerated when the VM is already starting or
    /// running, so starting a booting machine waits for it instead.
    ///
    /// # Errors
    /// Returns the resume error if the VM is in any other state,
    /// [`Error::VmErrorState`] as soon as the VM reports a failure, and
    /// [`Error::Timeout`] if it is not running after the configured number
    /// of polls.
    pub async fn start(&mut self) -> Result<()> {
        let id = self.resolve().await?;
        tracing::info!(machine = %self.machine_name, vm_id = %id, "Starting machine");

        if let Err(e) = self.orchestrator.resume_vm(id).await {
            let info = self.orchestrator.describe_vm(id).await?;
            match state::machine_state(&info) {
                current @ (MachineState::Starting | MachineState::Running) => {
                    tracing::warn!(
                        machine = %self.machine_name,
                        vm_id = %id,
                        state = %current,
                        error = %e,
                        "Resume rejected, VM already up"
                    );
                }
                _ => return Err(e),
            }
        }

        self.wait_until_reachable(id).await
    }

    /// Power the machine off gracefully. Does not wait for it to stop.
    pub async fn stop(&self) -> Result<()> {
        let id = self.resolve().await?;
        tracing::info!(machine = %self.machine_name, vm_id = %id, "Stopping machine");
        self.orchestrator.power_off_vm(id, false).await
    }

    /// Terminate the machine without waiting for a graceful shutdown.
    pub async fn remove(&self) -> Result<()> {
        let id = self.resolve().await?;
        tracing::info!(machine = %self.machine_name, vm_id = %id, "Removing machine");
        self.orchestrator.terminate_vm(id, true).await
    }

    /// Reboot the machine. Does not wait for it to come back.
    pub async fn restart(&self) -> Result<()> {
        let id = self.resolve().await?;
        tracing::info!(machine = %self.machine_name, vm_id = %id, "Restarting machine");
        self.orchestrator.reboot_vm(id).await
    }

    /// Power the machine off immediately.
    pub async fn kill(&self) -> Result<()> {
        let id = self.resolve().await?;
        tracing::warn!(machine = %self.machine_name, vm_id = %id, "Killing machine");
        self.orchestrator.power_off_vm(id, true).await
    }

    /// Current state of the machine.
    ///
    /// # Errors
    /// Lookup and describe failures are returned as-is; there is no
    /// fallback state.
    pub async fn get_state(&self) -> Result<MachineState> {
        let id = self.resolve().await?;
        let info = self.orchestrator.describe_vm(id).await?;
        let state = state::machine_state(&info);
        tracing::debug!(
            machine = %self.machine_name,
            vm_id = %id,
            vm_state = %info.state,
            lcm_state = %info.lcm_state,
            state = ?state,
            "Machine state"
        );
        Ok(state)
    }

    /// Address of the machine.
    ///
    /// # Errors
    /// Returns [`Error::AddressNotSet`] if the orchestrator reports no
    /// address and none was seen before.
    pub async fn get_ip(&mut self) -> Result<String> {
        let id = self.resolve().await?;
        self.address_of(id).await
    }

    /// Docker endpoint of the machine.
    pub async fn get_url(&mut self) -> Result<String> {
        let ip = self.get_ip().await?;
        Ok(format!("tcp://{ip}:{DOCKER_PORT}"))
    }

    /// Host to SSH into.
    pub async fn get_ssh_hostname(&mut self) -> Result<String> {
        self.get_ip().await
    }

    async fn resolve(&self) -> Result<VmId> {
        self.orchestrator
            .lookup_vm_by_name(&self.machine_name)
            .await?
            .ok_or_else(|| Error::VmNotFound(self.machine_name.clone()))
    }

    async fn address_of(&mut self, id: VmId) -> Result<String> {
        let info = self.orchestrator.describe_vm(id).await?;
        if let Some(ip) = address::nic_address(&info) {
            self.ip_address = Some(ip.to_string());
        }
        self.ip_address.clone().ok_or(Error::AddressNotSet)
    }

    /// Poll until the VM runs, then wait for SSH on its address.
    async fn wait_until_reachable(&mut self, id: VmId) -> Result<()> {
        let orchestrator = self.orchestrator.as_ref();
        let policy = PollPolicy::attempts(
            self.config.start_poll_interval(),
            self.config.start_max_polls,
        );
        let what = format!("VM {id} to reach running");

        let info = poll_until(policy, &what, || async move {
            let info = orchestrator.describe_vm(id).await?;
            match state::machine_state(&info) {
                MachineState::Running => Ok(Step::Ready(info)),
                MachineState::Error => {
                    tracing::error!(
                        vm_id = %id,
                        vm_state = %info.state,
                        lcm_state = %info.lcm_state,
                        "VM in error state"
                    );
                    Err(Error::VmErrorState)
                }
                other => Ok(Step::Pending(format!(
                    "{other} ({}/{})",
                    info.state, info.lcm_state
                ))),
            }
        })
        .await?;
        tracing::info!(machine = %self.machine_name, vm_id = %id, "VM running");

        if self.ip_address.is_none() {
            self.ip_address = address::nic_address(&info).map(str::to_string);
        }
        let ip = self.ip_address.clone().ok_or(Error::AddressNotSet)?;

        tracing::info!(machine = %self.machine_name, ip = %ip, "Waiting for SSH...");
        self.probe.wait_for_ssh(&ip, self.config.ssh_port).await
    }
}
