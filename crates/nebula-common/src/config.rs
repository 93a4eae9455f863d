//! Driver configuration.
//!
//! Every option can come from a file or from `ONE_*` environment variables,
//! matching the docker-machine `--opennebula-*` flag names.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prefix of the environment variables read by [`DriverConfig::from_env`].
pub const ENV_PREFIX: &str = "ONE";

/// Default boot image registered in the datastore for each machine.
pub const DEFAULT_BOOT2DOCKER_URL: &str =
    "https://s3.eu-central-1.amazonaws.com/one-boot2d/boot2docker-v1.9.1.iso";

/// Configuration for one machine driven through OpenNebula.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// CPU share (may be fractional)
    #[serde(default = "default_cpu")]
    pub cpu: f64,
    /// Virtual CPU count; omitted from the VM template when unset
    #[serde(default)]
    pub vcpu: Option<u32>,
    /// Memory in MB
    #[serde(default = "default_memory")]
    pub memory: u32,
    /// Size of the scratch disk in MB
    #[serde(default = "default_disk_size")]
    pub disk_size: u32,
    /// User to log in as over SSH
    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,
    /// Port the guest's SSH daemon listens on
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
    /// Virtual network to attach to, by name
    #[serde(default)]
    pub network_name: Option<String>,
    /// Owner of the network named by `network_name`
    #[serde(default)]
    pub network_owner: Option<String>,
    /// Virtual network to attach to, by id
    #[serde(default)]
    pub network_id: Option<String>,
    /// Datastore the boot image is registered in
    #[serde(default = "default_datastore_id")]
    pub datastore_id: String,
    /// Source of the boot image
    #[serde(default = "default_boot2docker_url")]
    pub boot2docker_url: String,
    /// Interval between image state polls in seconds
    #[serde(default = "default_image_poll_interval")]
    pub image_poll_interval_secs: u64,
    /// Give up on an image that is not ready after this many seconds
    #[serde(default = "default_image_ready_timeout")]
    pub image_ready_timeout_secs: u64,
    /// Interval between VM state polls in seconds
    #[serde(default = "default_start_poll_interval")]
    pub start_poll_interval_secs: u64,
    /// Maximum number of VM state polls while starting
    #[serde(default = "default_start_max_polls")]
    pub start_max_polls: u32,
    /// Give up waiting for SSH after this many seconds
    #[serde(default = "default_ssh_timeout")]
    pub ssh_timeout_secs: u64,
}

fn default_cpu() -> f64 {
    1.0
}

fn default_memory() -> u32 {
    1024
}

fn default_disk_size() -> u32 {
    20000
}

fn default_ssh_user() -> String {
    "docker".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_datastore_id() -> String {
    "1".to_string()
}

fn default_boot2docker_url() -> String {
    DEFAULT_BOOT2DOCKER_URL.to_string()
}

fn default_image_poll_interval() -> u64 {
    1
}

fn default_image_ready_timeout() -> u64 {
    600
}

fn default_start_poll_interval() -> u64 {
    2
}

fn default_start_max_polls() -> u32 {
    50
}

fn default_ssh_timeout() -> u64 {
    180
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            cpu: default_cpu(),
            vcpu: None,
            memory: default_memory(),
            disk_size: default_disk_size(),
            ssh_user: default_ssh_user(),
            ssh_port: default_ssh_port(),
            network_name: None,
            network_owner: None,
            network_id: None,
            datastore_id: default_datastore_id(),
            boot2docker_url: default_boot2docker_url(),
            image_poll_interval_secs: default_image_poll_interval(),
            image_ready_timeout_secs: default_image_ready_timeout(),
            start_poll_interval_secs: default_start_poll_interval(),
            start_max_polls: default_start_max_polls(),
            ssh_timeout_secs: default_ssh_timeout(),
        }
    }
}

/// How the VM's network interface is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkSelector {
    /// Attach to a network by name, optionally qualified by its owner.
    ByName {
        /// Network name
        name: String,
        /// Owner's user name
        owner: Option<String>,
    },
    /// Attach to a network by numeric id.
    ById(u32),
}

impl DriverConfig {
    /// Load configuration from `ONE_*` environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `ONE_CPU` | `1` |
    /// | `ONE_VCPU` | unset |
    /// | `ONE_MEMORY` | `1024` |
    /// | `ONE_DISK_SIZE` | `20000` |
    /// | `ONE_SSH_USER` | `docker` |
    /// | `ONE_SSH_PORT` | `22` |
    /// | `ONE_NETWORK_NAME` | unset |
    /// | `ONE_NETWORK_OWNER` | unset |
    /// | `ONE_NETWORK_ID` | unset |
    /// | `ONE_DATASTORE_ID` | `1` |
    /// | `ONE_BOOT2DOCKER_URL` | [`DEFAULT_BOOT2DOCKER_URL`] |
    ///
    /// Empty variables are treated as unset.
    pub fn from_env() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Load configuration from a file, with `ONE_*` variables taking precedence.
    pub fn from_file(path: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Resolve the network attachment.
    ///
    /// Exactly one of `network_name` and `network_id` must be set.
    pub fn network(&self) -> Result<NetworkSelector> {
        let name = non_empty(&self.network_name);
        let id = non_empty(&self.network_id);

        match (name, id) {
            (None, None) => Err(Error::InvalidConfig(
                "specify a network to connect to with network_name or network_id".to_string(),
            )),
            (Some(_), Some(_)) => Err(Error::InvalidConfig(
                "specify a network to connect to either with network_name or network_id, not both"
                    .to_string(),
            )),
            (Some(name), None) => Ok(NetworkSelector::ByName {
                name: name.to_string(),
                owner: non_empty(&self.network_owner).map(str::to_string),
            }),
            (None, Some(id)) => id.parse().map(NetworkSelector::ById).map_err(|e| {
                Error::InvalidConfig(format!("network_id {id:?} is not a valid id: {e}"))
            }),
        }
    }

    /// Parse the numeric datastore id.
    pub fn datastore(&self) -> Result<u32> {
        parse_datastore_id(&self.datastore_id)
    }

    /// Validate the configuration without contacting the orchestrator.
    pub fn validate(&self) -> Result<()> {
        self.network()?;
        self.datastore()?;

        if self.memory == 0 {
            return Err(Error::InvalidConfig("memory must be > 0".to_string()));
        }
        if self.disk_size == 0 {
            return Err(Error::InvalidConfig("disk_size must be > 0".to_string()));
        }
        if self.vcpu == Some(0) {
            return Err(Error::InvalidConfig("vcpu must be > 0".to_string()));
        }
        if !(self.cpu > 0.0) {
            return Err(Error::InvalidConfig("cpu must be > 0".to_string()));
        }
        if self.start_max_polls == 0 {
            return Err(Error::InvalidConfig("start_max_polls must be > 0".to_string()));
        }
        Ok(())
    }

    /// Get the image poll interval as a Duration.
    pub fn image_poll_interval(&self) -> Duration {
        Duration::from_secs(self.image_poll_interval_secs)
    }

    /// Get the image readiness deadline as a Duration.
    pub fn image_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.image_ready_timeout_secs)
    }

    /// Get the VM start poll interval as a Duration.
    pub fn start_poll_interval(&self) -> Duration {
        Duration::from_secs(self.start_poll_interval_secs)
    }

    /// Get the SSH wait deadline as a Duration.
    pub fn ssh_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh_timeout_secs)
    }
}

/// Parse a numeric datastore id.
pub fn parse_datastore_id(raw: &str) -> Result<u32> {
    raw.trim()
        .parse()
        .map_err(|e| Error::InvalidConfig(format!("datastore_id {raw:?} is not a valid id: {e}")))
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX).ignore_empty(true)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
