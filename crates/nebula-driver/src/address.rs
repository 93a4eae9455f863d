//! Network address of a VM.

use nebula_common::VmInfo;

/// First address leased to one of the VM's network interfaces.
pub fn nic_address(info: &VmInfo) -> Option<&str> {
    info.nics
        .iter()
        .filter_map(|nic| nic.ip.as_deref())
        .map(str::trim)
        .find(|ip| !ip.is_empty())
}
