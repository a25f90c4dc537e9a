use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use tokio::process::Command;

use crate::{disk::KnownPartition, error::ProvisionError, shell::CheckCommandOutput as _};

/// The surrounding installer session, injected so provisioning stays
/// independent of any concrete install framework.
#[async_trait]
pub trait InstallSession: Sync {
    /// Root of the in-progress installation.
    fn target(&self) -> &Path;

    /// Install packages into the target system.
    async fn install_packages(&self, packages: &[&str]) -> Result<()>;

    /// Run a shell command inside the target system root.
    async fn exec_in_chroot(&self, command: &str) -> Result<()>;

    /// Partitions the installer already knows about, used as a UUID fallback
    /// during identity resolution.
    fn known_partitions(&self) -> &[KnownPartition] {
        &[]
    }
}

/// Production session driving pacstrap and arch-chroot.
pub struct ArchChrootSession {
    target: PathBuf,
    known_partitions: Vec<KnownPartition>,
}

impl ArchChrootSession {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            known_partitions: Vec::new(),
        }
    }

    pub fn with_known_partitions(mut self, known_partitions: Vec<KnownPartition>) -> Self {
        self.known_partitions = known_partitions;
        self
    }
}

#[async_trait]
impl InstallSession for ArchChrootSession {
    fn target(&self) -> &Path {
        &self.target
    }

    async fn install_packages(&self, packages: &[&str]) -> Result<()> {
        Command::new("pacstrap")
            .arg(&self.target)
            .args(packages)
            .run_check_output()
            .await
            .map(drop)
            .map_err(|error| ProvisionError::ExternalCommand(format!("{error:#}")).into())
    }

    async fn exec_in_chroot(&self, command: &str) -> Result<()> {
        Command::new("arch-chroot")
            .arg(&self.target)
            .args(["sh", "-c", command])
            .run_check_output()
            .await
            .map(drop)
            .map_err(|error| ProvisionError::ExternalCommand(format!("{error:#}")).into())
    }

    fn known_partitions(&self) -> &[KnownPartition] {
        &self.known_partitions
    }
}
