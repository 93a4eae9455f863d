//! SSH key material and guest reachability.

use async_trait::async_trait;
use nebula_common::{Error, Result};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::{timeout, Instant};

/// Path of the public half of a key pair.
pub fn public_key_path(private_key: &Path) -> PathBuf {
    let mut path = OsString::from(private_key.as_os_str());
    path.push(".pub");
    PathBuf::from(path)
}

/// Creates the key pair injected into the guest.
#[async_trait]
pub trait KeyManager: Send + Sync {
    /// Generate a key pair at `private_key` (public half at `<path>.pub`).
    ///
    /// Does nothing if the private key already exists.
    async fn generate(&self, private_key: &Path) -> Result<()>;

    /// Read the public half of the key pair as raw bytes.
    async fn public_key(&self, private_key: &Path) -> Result<Vec<u8>>;
}

/// [`KeyManager`] backed by the `ssh-keygen` binary.
#[derive(Debug, Clone, Default)]
pub struct SshKeygen;

#[async_trait]
impl KeyManager for SshKeygen {
    async fn generate(&self, private_key: &Path) -> Result<()> {
        if tokio::fs::try_exists(private_key).await? {
            tracing::debug!(path = %private_key.display(), "SSH key already exists");
            return Ok(());
        }

        if let Some(parent) = private_key.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tracing::debug!(path = %private_key.display(), "Generating SSH key");
        let output = Command::new("ssh-keygen")
            .args(["-t", "rsa", "-b", "2048", "-N", "", "-q", "-f"])
            .arg(private_key)
            .output()
            .await
            .map_err(|e| Error::KeyGeneration(format!("failed to run ssh-keygen: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::KeyGeneration(format!(
                "ssh-keygen exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        tracing::info!(path = %private_key.display(), "SSH key generated");
        Ok(())
    }

    async fn public_key(&self, private_key: &Path) -> Result<Vec<u8>> {
        let path = public_key_path(private_key);
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::KeyGeneration(format!("failed to read {}: {e}", path.display())))
    }
}

/// Blocks until a freshly started guest accepts SSH connections.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Wait until `host:port` speaks SSH.
    ///
    /// # Errors
    /// Returns an error once the probe's own retry budget is exhausted.
    async fn wait_for_ssh(&self, host: &str, port: u16) -> Result<()>;
}

/// Timeout for a single connect-and-read-banner attempt.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// [`ReachabilityProbe`] that waits for the SSH identification banner.
#[derive(Debug, Clone)]
pub struct SshBannerProbe {
    /// Total time to keep retrying
    pub timeout: Duration,
    /// Interval between attempts
    pub retry_interval: Duration,
}

impl Default for SshBannerProbe {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(180),
            retry_interval: Duration::from_secs(3),
        }
    }
}

impl SshBannerProbe {
    /// Create a probe giving up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Attempt a single connection and banner read.
    async fn try_connect(host: &str, port: u16) -> io::Result<String> {
        let stream = timeout(ATTEMPT_TIMEOUT, TcpStream::connect((host, port)))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;

        let mut reader = BufReader::new(stream);
        let mut banner = String::new();
        timeout(ATTEMPT_TIMEOUT, reader.read_line(&mut banner))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "no banner received"))??;

        let banner = banner.trim().to_string();
        if !banner.starts_with("SSH-") {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected banner: {banner:?}"),
            ));
        }
        Ok(banner)
    }
}

#[async_trait]
impl ReachabilityProbe for SshBannerProbe {
    async fn wait_for_ssh(&self, host: &str, port: u16) -> Result<()> {
        let start = Instant::now();
        tracing::debug!(host, port, "Waiting for SSH");

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match Self::try_connect(host, port).await {
                Ok(banner) => {
                    tracing::info!(
                        host,
                        port,
                        banner = %banner,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        attempts,
                        "SSH is available"
                    );
                    return Ok(());
                }
                Err(e) => {
                    if start.elapsed() + self.retry_interval > self.timeout {
                        tracing::warn!(
                            host,
                            port,
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            attempts,
                            "SSH wait timeout"
                        );
                        return Err(Error::Timeout {
                            what: format!("SSH on {host}:{port}"),
                            attempts,
                            last_observed: e.to_string(),
                        });
                    }
                    tracing::trace!(error = %e, attempt = attempts, "SSH not ready, retrying...");
                    tokio::time::sleep(self.retry_interval).await;
                }
            }
        }
    }
}
