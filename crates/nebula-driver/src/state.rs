//! Translation from OpenNebula VM states to driver-visible machine states.
//!
//! OpenNebula reports a coarse VM state and, while the VM is `ACTIVE`, a
//! fine-grained LCM state. Callers only see [`MachineState`].

use nebula_common::{MachineState, VmInfo};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Coarse VM states. `ACTIVE` is resolved through [`LCM_STATES`].
const VM_STATES: &[(&str, MachineState)] = &[
    ("INIT", MachineState::Starting),
    ("PENDING", MachineState::Starting),
    ("HOLD", MachineState::Starting),
    ("POWEROFF", MachineState::Stopped),
    ("UNDEPLOYED", MachineState::Stopped),
    ("STOPPED", MachineState::Saved),
    ("SUSPENDED", MachineState::Saved),
    ("DONE", MachineState::Error),
    ("FAILED", MachineState::Error),
];

/// LCM states of an `ACTIVE` VM.
const LCM_STATES: &[(&str, MachineState)] = &[
    // Guest keeps executing
    ("RUNNING", MachineState::Running),
    ("DISK_SNAPSHOT", MachineState::Running),
    ("DISK_SNAPSHOT_REVERT", MachineState::Running),
    ("DISK_SNAPSHOT_DELETE", MachineState::Running),
    ("HOTPLUG", MachineState::Running),
    ("HOTPLUG_SNAPSHOT", MachineState::Running),
    ("HOTPLUG_NIC", MachineState::Running),
    ("HOTPLUG_SAVEAS", MachineState::Running),
    // Staging, booting, migrating, resuming
    ("PROLOG", MachineState::Starting),
    ("BOOT", MachineState::Starting),
    ("MIGRATE", MachineState::Starting),
    ("PROLOG_MIGRATE", MachineState::Starting),
    ("PROLOG_RESUME", MachineState::Starting),
    ("CLEANUP_RESUBMIT", MachineState::Starting),
    ("BOOT_UNKNOWN", MachineState::Starting),
    ("BOOT_POWEROFF", MachineState::Starting),
    ("BOOT_SUSPENDED", MachineState::Starting),
    ("BOOT_STOPPED", MachineState::Starting),
    ("PROLOG_UNDEPLOY", MachineState::Starting),
    ("BOOT_UNDEPLOY", MachineState::Starting),
    ("BOOT_MIGRATE", MachineState::Starting),
    ("PROLOG_MIGRATE_SUSPEND", MachineState::Starting),
    ("SAVE_MIGRATE", MachineState::Starting),
    // Operations on a powered-off guest
    ("HOTPLUG_SAVEAS_POWEROFF", MachineState::Stopped),
    ("DISK_SNAPSHOT_POWEROFF", MachineState::Stopped),
    ("DISK_SNAPSHOT_REVERT_POWEROFF", MachineState::Stopped),
    ("DISK_SNAPSHOT_DELETE_POWEROFF", MachineState::Stopped),
    ("HOTPLUG_PROLOG_POWEROFF", MachineState::Stopped),
    ("HOTPLUG_EPILOG_POWEROFF", MachineState::Stopped),
    ("PROLOG_MIGRATE_POWEROFF", MachineState::Stopped),
    ("SAVE_STOP", MachineState::Stopped),
    // Operations on a suspended guest
    ("HOTPLUG_SAVEAS_SUSPENDED", MachineState::Saved),
    ("DISK_SNAPSHOT_SUSPENDED", MachineState::Saved),
    ("DISK_SNAPSHOT_REVERT_SUSPENDED", MachineState::Saved),
    ("DISK_SNAPSHOT_DELETE_SUSPENDED", MachineState::Saved),
    // Shutting down and cleaning up
    ("EPILOG_STOP", MachineState::Stopping),
    ("EPILOG", MachineState::Stopping),
    ("SHUTDOWN_UNDEPLOY", MachineState::Stopping),
    ("EPILOG_UNDEPLOY", MachineState::Stopping),
    ("SAVE_SUSPEND", MachineState::Stopping),
    ("SHUTDOWN", MachineState::Stopping),
    ("SHUTDOWN_POWEROFF", MachineState::Stopping),
    ("CANCEL", MachineState::Stopping),
    ("CLEANUP_DELETE", MachineState::Stopping),
    // Failures
    ("UNKNOWN", MachineState::Error),
    ("FAILURE", MachineState::Error),
    ("BOOT_FAILURE", MachineState::Error),
    ("BOOT_MIGRATE_FAILURE", MachineState::Error),
    ("PROLOG_MIGRATE_FAILURE", MachineState::Error),
    ("PROLOG_FAILURE", MachineState::Error),
    ("EPILOG_FAILURE", MachineState::Error),
    ("EPILOG_STOP_FAILURE", MachineState::Error),
    ("EPILOG_UNDEPLOY_FAILURE", MachineState::Error),
    ("PROLOG_MIGRATE_POWEROFF_FAILURE", MachineState::Error),
    ("PROLOG_MIGRATE_SUSPEND_FAILURE", MachineState::Error),
    ("BOOT_UNDEPLOY_FAILURE", MachineState::Error),
    ("BOOT_STOPPED_FAILURE", MachineState::Error),
    ("PROLOG_RESUME_FAILURE", MachineState::Error),
    ("PROLOG_UNDEPLOY_FAILURE", MachineState::Error),
];

static VM_STATE_TABLE: LazyLock<HashMap<&'static str, MachineState>> =
    LazyLock::new(|| VM_STATES.iter().copied().collect());

static LCM_STATE_TABLE: LazyLock<HashMap<&'static str, MachineState>> =
    LazyLock::new(|| LCM_STATES.iter().copied().collect());

/// Map an OpenNebula (VM state, LCM state) pair to a machine state.
///
/// Total over all inputs: anything unrecognized is [`MachineState::Error`].
/// The LCM state is only consulted when the VM state is `ACTIVE`.
pub fn translate(vm_state: &str, lcm_state: &str) -> MachineState {
    if vm_state == "ACTIVE" {
        return LCM_STATE_TABLE
            .get(lcm_state)
            .copied()
            .unwrap_or(MachineState::Error);
    }

    VM_STATE_TABLE
        .get(vm_state)
        .copied()
        .unwrap_or(MachineState::Error)
}

/// Machine state of a described VM.
pub fn machine_state(info: &VmInfo) -> MachineState {
    translate(&info.state, &info.lcm_state)
}
