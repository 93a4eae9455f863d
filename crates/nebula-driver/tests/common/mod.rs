//! Scripted test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use nebula_driver::{
    Error, ImageId, ImageInfo, KeyManager, Orchestrator, ReachabilityProbe, Result, Template,
    VmId, VmInfo,
};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const PUBLIC_KEY: &[u8] = b"ssh-rsa AAAAB3NzaC1yc2E test@nebula\n";

/// A state-changing call made against the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Resume(VmId),
    PowerOff { id: VmId, hard: bool },
    Reboot(VmId),
    Terminate { id: VmId, hard: bool },
}

#[derive(Default)]
struct Inner {
    next_id: u32,
    vms: HashMap<String, VmId>,
    vm_ips: HashMap<VmId, String>,
    vm_state: (String, String),
    vm_script: VecDeque<(String, String)>,
    leased_ip: Option<String>,
    images: HashMap<String, ImageId>,
    image_state: String,
    image_script: VecDeque<String>,
    fail_lookups: Option<String>,
    fail_resume: Option<String>,
    fail_next_create_vm: Option<String>,
    fail_create_image: Option<String>,
    fail_describe_image: Option<String>,
    calls: Vec<Call>,
    describe_vm_calls: u32,
    describe_image_calls: u32,
    created_vms: Vec<(Template, bool)>,
    created_images: Vec<(Template, u32)>,
}

/// In-memory orchestrator replaying scripted VM and image states.
///
/// Each describe call pops the next scripted state; once the script is
/// empty the last state is repeated.
pub struct FakeOrchestrator {
    inner: Mutex<Inner>,
}

impl FakeOrchestrator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 100,
                vm_state: ("PENDING".to_string(), "LCM_INIT".to_string()),
                image_state: "INIT".to_string(),
                ..Inner::default()
            }),
        }
    }

    /// Register an existing VM.
    pub fn with_vm(self, name: &str, id: u32, ip: Option<&str>) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.vms.insert(name.to_string(), VmId::new(id));
            if let Some(ip) = ip {
                inner.vm_ips.insert(VmId::new(id), ip.to_string());
            }
        }
        self
    }

    /// States reported by successive VM describe calls.
    pub fn script_vm(self, states: &[(&str, &str)]) -> Self {
        self.inner.lock().unwrap().vm_script = states
            .iter()
            .map(|(vm, lcm)| (vm.to_string(), lcm.to_string()))
            .collect();
        self
    }

    /// Address given to VMs created through the fake.
    pub fn lease_ip(self, ip: &str) -> Self {
        self.inner.lock().unwrap().leased_ip = Some(ip.to_string());
        self
    }

    /// Register an existing image.
    pub fn with_image(self, name: &str, id: u32, state: &str) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.images.insert(name.to_string(), ImageId::new(id));
            inner.image_state = state.to_string();
        }
        self
    }

    /// States reported by successive image describe calls.
    pub fn script_image(self, states: &[&str]) -> Self {
        self.inner.lock().unwrap().image_script =
            states.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Make every lookup fail with a remote error.
    pub fn fail_lookups(self, message: &str) -> Self {
        self.inner.lock().unwrap().fail_lookups = Some(message.to_string());
        self
    }

    /// Reject every resume request.
    pub fn fail_resume(self, message: &str) -> Self {
        self.inner.lock().unwrap().fail_resume = Some(message.to_string());
        self
    }

    /// Reject the next VM create request only.
    pub fn fail_next_create_vm(self, message: &str) -> Self {
        self.inner.lock().unwrap().fail_next_create_vm = Some(message.to_string());
        self
    }

    /// Reject every image create request.
    pub fn fail_create_image(self, message: &str) -> Self {
        self.inner.lock().unwrap().fail_create_image = Some(message.to_string());
        self
    }

    /// Make every image describe call fail.
    pub fn fail_describe_image(self, message: &str) -> Self {
        self.inner.lock().unwrap().fail_describe_image = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn describe_vm_calls(&self) -> u32 {
        self.inner.lock().unwrap().describe_vm_calls
    }

    pub fn describe_image_calls(&self) -> u32 {
        self.inner.lock().unwrap().describe_image_calls
    }

    pub fn created_vms(&self) -> Vec<(Template, bool)> {
        self.inner.lock().unwrap().created_vms.clone()
    }

    pub fn created_images(&self) -> Vec<(Template, u32)> {
        self.inner.lock().unwrap().created_images.clone()
    }

    /// Total number of remote calls of any kind.
    pub fn remote_calls(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.calls.len()
            + inner.describe_vm_calls as usize
            + inner.describe_image_calls as usize
            + inner.created_vms.len()
            + inner.created_images.len()
    }

    fn record(&self, call: Call) -> Result<()> {
        self.inner.lock().unwrap().calls.push(call);
        Ok(())
    }
}

#[async_trait]
impl Orchestrator for FakeOrchestrator {
    async fn lookup_vm_by_name(&self, name: &str) -> Result<Option<VmId>> {
        let inner = self.inner.lock().unwrap();
        if let Some(message) = &inner.fail_lookups {
            return Err(Error::Remote(message.clone()));
        }
        Ok(inner.vms.get(name).copied())
    }

    async fn describe_vm(&self, id: VmId) -> Result<VmInfo> {
        let mut inner = self.inner.lock().unwrap();
        inner.describe_vm_calls += 1;

        let name = inner
            .vms
            .iter()
            .find(|(_, vm)| **vm == id)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| Error::Remote(format!("[one.vm.info] Error getting VM [{id}]")))?;

        if let Some(next) = inner.vm_script.pop_front() {
            inner.vm_state = next;
        }

        let (state, lcm_state) = inner.vm_state.clone();
        let info = VmInfo::new(id, name, state, lcm_state);
        Ok(match inner.vm_ips.get(&id) {
            Some(ip) => info.with_nic_ip(ip.clone()),
            None => info,
        })
    }

    async fn create_vm(&self, template: &Template, hold: bool) -> Result<VmId> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(message) = inner.fail_next_create_vm.take() {
            return Err(Error::Remote(message));
        }
        let name = template
            .get("NAME")
            .ok_or_else(|| Error::Remote("template has no NAME".to_string()))?
            .to_string();

        inner.next_id += 1;
        let id = VmId::new(inner.next_id);
        inner.vms.insert(name, id);
        if let Some(ip) = inner.leased_ip.clone() {
            inner.vm_ips.insert(id, ip);
        }
        inner.created_vms.push((template.clone(), hold));
        Ok(id)
    }

    async fn resume_vm(&self, id: VmId) -> Result<()> {
        self.record(Call::Resume(id))?;
        let failure = self.inner.lock().unwrap().fail_resume.clone();
        match failure {
            Some(message) => Err(Error::Remote(message)),
            None => Ok(()),
        }
    }

    async fn power_off_vm(&self, id: VmId, hard: bool) -> Result<()> {
        self.record(Call::PowerOff { id, hard })
    }

    async fn reboot_vm(&self, id: VmId) -> Result<()> {
        self.record(Call::Reboot(id))
    }

    async fn terminate_vm(&self, id: VmId, hard: bool) -> Result<()> {
        self.record(Call::Terminate { id, hard })
    }

    async fn lookup_image_by_name(&self, name: &str) -> Result<Option<ImageId>> {
        let inner = self.inner.lock().unwrap();
        if let Some(message) = &inner.fail_lookups {
            return Err(Error::Remote(message.clone()));
        }
        Ok(inner.images.get(name).copied())
    }

    async fn describe_image(&self, id: ImageId) -> Result<ImageInfo> {
        let mut inner = self.inner.lock().unwrap();
        inner.describe_image_calls += 1;
        if let Some(message) = &inner.fail_describe_image {
            return Err(Error::Remote(message.clone()));
        }

        let name = inner
            .images
            .iter()
            .find(|(_, image)| **image == id)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| Error::Remote(format!("[one.image.info] Error getting image [{id}]")))?;

        if let Some(next) = inner.image_script.pop_front() {
            inner.image_state = next;
        }

        Ok(ImageInfo {
            id,
            name,
            state: inner.image_state.clone(),
        })
    }

    async fn create_image(&self, template: &Template, datastore: u32) -> Result<ImageId> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(message) = &inner.fail_create_image {
            return Err(Error::Remote(message.clone()));
        }
        let name = template
            .get("NAME")
            .ok_or_else(|| Error::Remote("template has no NAME".to_string()))?
            .to_string();

        inner.next_id += 1;
        let id = ImageId::new(inner.next_id);
        inner.images.insert(name, id);
        inner.created_images.push((template.clone(), datastore));
        Ok(id)
    }
}

/// Key manager handing out a fixed public key.
#[derive(Default)]
pub struct FakeKeys {
    generated: Mutex<Vec<PathBuf>>,
}

impl FakeKeys {
    pub fn generated(&self) -> Vec<PathBuf> {
        self.generated.lock().unwrap().clone()
    }
}

#[async_trait]
impl KeyManager for FakeKeys {
    async fn generate(&self, private_key: &Path) -> Result<()> {
        self.generated
            .lock()
            .unwrap()
            .push(private_key.to_path_buf());
        Ok(())
    }

    async fn public_key(&self, _private_key: &Path) -> Result<Vec<u8>> {
        Ok(PUBLIC_KEY.to_vec())
    }
}

/// Probe recording where it was asked to wait.
#[derive(Default)]
pub struct FakeProbe {
    unreachable: bool,
    waited: Mutex<Vec<(String, u16)>>,
}

impl FakeProbe {
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn waited(&self) -> Vec<(String, u16)> {
        self.waited.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReachabilityProbe for FakeProbe {
    async fn wait_for_ssh(&self, host: &str, port: u16) -> Result<()> {
        self.waited.lock().unwrap().push((host.to_string(), port));
        if self.unreachable {
            return Err(Error::Timeout {
                what: format!("SSH on {host}:{port}"),
                attempts: 1,
                last_observed: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}
