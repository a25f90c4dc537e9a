//! Static system metadata written alongside the boot configuration.

use std::path::Path;

use anyhow::{Context as _, Result};
use tokio::fs;

use crate::error::ProvisionError;

pub const RELEASE_PATH: &str = "etc/logos-release";
pub const SYSCTL_HARDENING_PATH: &str = "etc/sysctl.d/99-logos-hardening.conf";

const RELEASE_FILE: &str = "\
NAME=\"LogOS\"
VERSION=\"2025.8\"
CODENAME=\"Ringed City\"
BASE=\"Arch Linux\"
";

const SYSCTL_HARDENING: &str = "\
# LogOS Kernel Hardening
kernel.kptr_restrict = 2
kernel.dmesg_restrict = 1
kernel.perf_event_paranoid = 3
kernel.sysrq = 0
kernel.unprivileged_bpf_disabled = 1
net.ipv4.conf.all.rp_filter = 1
net.ipv4.conf.default.rp_filter = 1
net.ipv4.conf.all.accept_redirects = 0
net.ipv4.conf.default.accept_redirects = 0
net.ipv4.tcp_syncookies = 1
net.ipv6.conf.all.accept_redirects = 0
net.ipv6.conf.default.accept_redirects = 0
";

/// Write the release identification file and the sysctl hardening drop-in
/// under the install target root. Plain data files, replaced on every run.
pub async fn write_system_metadata(target: &Path) -> Result<()> {
    write_metadata(target)
        .await
        .map_err(|error| ProvisionError::ConfigWrite(format!("{error:#}")).into())
}

async fn write_metadata(target: &Path) -> Result<()> {
    for (relative, content) in [
        (RELEASE_PATH, RELEASE_FILE),
        (SYSCTL_HARDENING_PATH, SYSCTL_HARDENING),
    ] {
        let path = target.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {parent:?}"))?;
        }
        fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {path:?}"))?;
    }
    Ok(())
}
