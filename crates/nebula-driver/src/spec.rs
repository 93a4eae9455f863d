//! VM and image specifications.
//!
//! A [`VmSpec`] is built fresh for every create call and rendered into the
//! template the orchestrator instantiates.

use crate::template::Template;
use nebula_common::{DriverConfig, ImageId, NetworkSelector, Result};

/// Device prefix for every disk attached to a machine.
pub const DEV_PREFIX: &str = "sd";

/// A disk attached to the VM.
#[derive(Debug, Clone, PartialEq)]
pub enum DiskSpec {
    /// A registered image, attached as-is.
    Image {
        /// Image to boot from
        image_id: ImageId,
        /// Device name prefix hint
        dev_prefix: String,
    },
    /// A scratch disk created with the VM.
    Volatile {
        /// Disk format (e.g. `raw`)
        format: String,
        /// Disk type (e.g. `fs`)
        disk_type: String,
        /// Size in MB
        size_mb: u32,
        /// Device name prefix hint
        dev_prefix: String,
    },
}

/// Guest bootstrap data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSpec {
    /// Let the guest configure its network from the NIC metadata
    pub network: bool,
    /// Public key injected verbatim into the guest
    pub ssh_public_key: String,
}

/// Remote console configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicsSpec {
    /// Console protocol
    pub kind: String,
    /// Address the console listens on
    pub listen: String,
}

impl Default for GraphicsSpec {
    fn default() -> Self {
        Self {
            kind: "vnc".to_string(),
            listen: "0.0.0.0".to_string(),
        }
    }
}

/// Declarative description of a VM.
#[derive(Debug, Clone, PartialEq)]
pub struct VmSpec {
    /// VM name
    pub name: String,
    /// CPU share
    pub cpu: f64,
    /// Virtual CPU count, if overridden
    pub vcpu: Option<u32>,
    /// Memory in MB
    pub memory_mb: u32,
    /// Network attachment
    pub network: NetworkSelector,
    /// Attached disks, boot disk first
    pub disks: Vec<DiskSpec>,
    /// Guest bootstrap data
    pub context: ContextSpec,
    /// Remote console
    pub graphics: GraphicsSpec,
}

impl VmSpec {
    /// Start building a spec for the named VM.
    pub fn builder(name: impl Into<String>, network: NetworkSelector) -> VmSpecBuilder {
        VmSpecBuilder::new(name, network)
    }

    /// Assemble the spec for a machine from its configuration.
    ///
    /// # Arguments
    /// * `name` - Machine name
    /// * `config` - Driver configuration
    /// * `image_id` - Boot image
    /// * `ssh_public_key` - Public key material to inject
    ///
    /// # Errors
    /// Returns an error if the network selector in `config` is invalid.
    pub fn from_config(
        name: &str,
        config: &DriverConfig,
        image_id: ImageId,
        ssh_public_key: &[u8],
    ) -> Result<Self> {
        let mut builder = Self::builder(name, config.network()?)
            .cpu(config.cpu)
            .memory_mb(config.memory)
            .boot_image(image_id)
            .scratch_disk(config.disk_size)
            .ssh_public_key(String::from_utf8_lossy(ssh_public_key));

        if let Some(vcpu) = config.vcpu {
            builder = builder.vcpu(vcpu);
        }

        Ok(builder.build())
    }

    /// Render the spec into an orchestrator template.
    pub fn to_template(&self) -> Template {
        let mut template = Template::new();
        template
            .add_value("NAME", &self.name)
            .add_value("CPU", self.cpu)
            .add_value("MEMORY", self.memory_mb);

        if let Some(vcpu) = self.vcpu {
            template.add_value("VCPU", vcpu);
        }

        let nic = template.new_vector("NIC");
        match &self.network {
            NetworkSelector::ByName { name, owner } => {
                nic.add_value("NETWORK", name);
                if let Some(owner) = owner {
                    nic.add_value("NETWORK_UNAME", owner);
                }
            }
            NetworkSelector::ById(id) => {
                nic.add_value("NETWORK_ID", id);
            }
        }

        for disk in &self.disks {
            let vector = template.new_vector("DISK");
            match disk {
                DiskSpec::Image {
                    image_id,
                    dev_prefix,
                } => {
                    vector
                        .add_value("IMAGE_ID", image_id)
                        .add_value("DEV_PREFIX", dev_prefix);
                }
                DiskSpec::Volatile {
                    format,
                    disk_type,
                    size_mb,
                    dev_prefix,
                } => {
                    vector
                        .add_value("FORMAT", format)
                        .add_value("TYPE", disk_type)
                        .add_value("SIZE", size_mb)
                        .add_value("DEV_PREFIX", dev_prefix);
                }
            }
        }

        template
            .new_vector("CONTEXT")
            .add_value("NETWORK", if self.context.network { "YES" } else { "NO" })
            .add_value("SSH_PUBLIC_KEY", &self.context.ssh_public_key);

        template
            .new_vector("GRAPHICS")
            .add_value("LISTEN", &self.graphics.listen)
            .add_value("TYPE", &self.graphics.kind);

        template
    }
}

/// Fluent builder for [`VmSpec`].
#[derive(Debug, Clone)]
pub struct VmSpecBuilder {
    spec: VmSpec,
}

impl VmSpecBuilder {
    /// Create a builder with one CPU, 1024 MB of memory and no disks.
    pub fn new(name: impl Into<String>, network: NetworkSelector) -> Self {
        Self {
            spec: VmSpec {
                name: name.into(),
                cpu: 1.0,
                vcpu: None,
                memory_mb: 1024,
                network,
                disks: Vec::new(),
                context: ContextSpec {
                    network: true,
                    ssh_public_key: String::new(),
                },
                graphics: GraphicsSpec::default(),
            },
        }
    }

    /// Set the CPU share.
    pub fn cpu(mut self, cpu: f64) -> Self {
        self.spec.cpu = cpu;
        self
    }

    /// Override the virtual CPU count.
    pub fn vcpu(mut self, vcpu: u32) -> Self {
        self.spec.vcpu = Some(vcpu);
        self
    }

    /// Set the memory in MB.
    pub fn memory_mb(mut self, memory_mb: u32) -> Self {
        self.spec.memory_mb = memory_mb;
        self
    }

    /// Attach a registered image.
    pub fn boot_image(mut self, image_id: ImageId) -> Self {
        self.spec.disks.push(DiskSpec::Image {
            image_id,
            dev_prefix: DEV_PREFIX.to_string(),
        });
        self
    }

    /// Attach a raw scratch disk of the given size.
    pub fn scratch_disk(mut self, size_mb: u32) -> Self {
        self.spec.disks.push(DiskSpec::Volatile {
            format: "raw".to_string(),
            disk_type: "fs".to_string(),
            size_mb,
            dev_prefix: DEV_PREFIX.to_string(),
        });
        self
    }

    /// Set the public key injected into the guest.
    pub fn ssh_public_key(mut self, key: impl Into<String>) -> Self {
        self.spec.context.ssh_public_key = key.into();
        self
    }

    /// Set the remote console configuration.
    pub fn graphics(mut self, graphics: GraphicsSpec) -> Self {
        self.spec.graphics = graphics;
        self
    }

    /// Finish building.
    pub fn build(self) -> VmSpec {
        self.spec
    }
}

/// Description of a boot image to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    /// Image name
    pub name: String,
    /// Path or URL the orchestrator imports the image from
    pub path: String,
}

impl ImageSpec {
    /// Create an image spec.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Render the spec into an orchestrator template.
    pub fn to_template(&self) -> Template {
        let mut template = Template::new();
        template
            .add_value("NAME", &self.name)
            .add_value("PATH", &self.path);
        template
    }
}
