//! Error types for the OpenNebula machine driver.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the OpenNebula machine driver.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration source could not be loaded or deserialized.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A call against the orchestrator failed.
    #[error("Remote call failed: {0}")]
    Remote(String),

    /// No VM with the given name is visible to the orchestrator.
    #[error("VM not found: {0}")]
    VmNotFound(String),

    /// An image reported a state the provisioner does not wait on.
    #[error("Unexpected image state {state} for image {image}")]
    UnexpectedImageState {
        /// Image name
        image: String,
        /// Reported state
        state: String,
    },

    /// The VM reached a failure state while we were waiting on it.
    #[error("VM in error state")]
    VmErrorState,

    /// A polling loop gave up.
    #[error("Timed out waiting for {what} after {attempts} attempts (last observed: {last_observed})")]
    Timeout {
        /// What was being waited on
        what: String,
        /// Number of polls made
        attempts: u32,
        /// Last observation before giving up
        last_observed: String,
    },

    /// No network address has been reported for the VM.
    #[error("IP address is not set")]
    AddressNotSet,

    /// SSH key material could not be generated or read.
    #[error("SSH key generation failed: {0}")]
    KeyGeneration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Check if this error was reported before any remote call was made.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::InvalidConfig(_) | Error::Config(_))
    }

    /// Check if this error indicates a not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::VmNotFound(_))
    }

    /// Check if this error came from a polling loop running out of budget.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}
