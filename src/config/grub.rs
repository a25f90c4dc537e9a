use std::path::Path;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

/// Global GRUB settings written to `etc/default/grub`.
///
/// The defaults carry the reference deployment values; a TOML file with the
/// same shape can override them.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct GrubDefaults {
    /// Seconds the menu waits before booting the default entry.
    pub timeout: u32,

    /// Remember the last selected entry across boots.
    pub save_default: bool,

    /// Distribution label used in generated entries.
    pub distributor: String,

    /// Kernel parameters grub-mkconfig appends to normal entries.
    pub cmdline_linux_default: String,

    /// Kernel parameters grub-mkconfig appends to every entry.
    pub cmdline_linux: String,

    /// Let GRUB itself read the encrypted disk. Required when /boot lives
    /// inside the LUKS container.
    pub enable_cryptodisk: bool,

    /// Suppress os-prober entries for other installed systems.
    pub disable_os_prober: bool,

    pub gfxmode: String,
    pub gfxpayload_linux: String,
    pub terminal_output: String,
}

impl GrubDefaults {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read GRUB defaults from {path:?}"))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse GRUB defaults from {path:?}"))
    }
}

impl Default for GrubDefaults {
    fn default() -> Self {
        Self {
            timeout: 10,
            save_default: true,
            distributor: "LogOS".to_owned(),
            cmdline_linux_default: String::new(),
            cmdline_linux: String::new(),
            enable_cryptodisk: true,
            disable_os_prober: false,
            gfxmode: "auto".to_owned(),
            gfxpayload_linux: "keep".to_owned(),
            terminal_output: "gfxterm".to_owned(),
        }
    }
}
