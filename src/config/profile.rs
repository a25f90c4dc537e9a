use std::path::Path;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

/// Where a profile's menu entry lives.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ProfileClass {
    /// Selectable from the top-level boot menu.
    Primary,

    /// Nested inside the recovery submenu. Recovery entries carry no hardening
    /// cmdline at all, so a bad knob can never take the rescue path down too.
    Recovery,
}

/// One bootable kernel/cmdline combination shown in the GRUB menu.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
pub struct SecurityProfile {
    /// Stable slug, used to derive the menuentry id.
    pub id: String,

    /// Full human title shown in the boot menu.
    pub display_name: String,

    /// Kernel image filename under /@/boot.
    pub kernel_image: String,

    /// Initramfs filename under /@/boot.
    pub initramfs_image: String,

    /// Kernel parameter tokens appended after the root and crypt parameters.
    #[serde(default)]
    pub cmdline: Vec<String>,

    /// Message echoed before the kernel loads. Falls back to a message built
    /// from the display name. Ignored for recovery entries.
    #[serde(default)]
    pub boot_message: Option<String>,

    pub class: ProfileClass,
}

impl SecurityProfile {
    pub fn boot_message_or_default(&self) -> String {
        self.boot_message
            .clone()
            .unwrap_or_else(|| format!("Loading {}...", self.display_name))
    }
}

/// The profile set to render, primaries and recoveries together.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
pub struct ProfileSet {
    #[serde(rename = "profile")]
    pub profiles: Vec<SecurityProfile>,
}

impl ProfileSet {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read profile set from {path:?}"))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse profile set from {path:?}"))
    }
}

impl Default for ProfileSet {
    /// The Ringed City reference deployment: three primary profiles and two
    /// fallback-initramfs recovery entries.
    fn default() -> Self {
        Self {
            profiles: vec![
                SecurityProfile {
                    id: "gael".to_owned(),
                    display_name: "LogOS - Gael [Maximum Security]".to_owned(),
                    kernel_image: "vmlinuz-linux-lts".to_owned(),
                    initramfs_image: "initramfs-linux-lts.img".to_owned(),
                    cmdline: tokens(&[
                        "audit=1",
                        "apparmor=1",
                        "lsm=landlock,lockdown,yama,integrity,apparmor,bpf",
                        "lockdown=confidentiality",
                        "mitigations=auto,nosmt",
                        "nosmt=force",
                        "init_on_alloc=1",
                        "init_on_free=1",
                        "slab_nomerge",
                        "pti=on",
                        "quiet",
                        "loglevel=3",
                    ]),
                    boot_message: Some("Loading Linux LTS with Maximum Security...".to_owned()),
                    class: ProfileClass::Primary,
                },
                SecurityProfile {
                    id: "midir".to_owned(),
                    display_name: "LogOS - Midir [Daily Driver]".to_owned(),
                    kernel_image: "vmlinuz-linux-zen".to_owned(),
                    initramfs_image: "initramfs-linux-zen.img".to_owned(),
                    cmdline: tokens(&[
                        "audit=1",
                        "apparmor=1",
                        "lsm=landlock,lockdown,yama,integrity,apparmor,bpf",
                        "mitigations=auto",
                        "quiet",
                        "loglevel=3",
                    ]),
                    boot_message: Some("Loading Linux Zen - Daily Driver...".to_owned()),
                    class: ProfileClass::Primary,
                },
                SecurityProfile {
                    id: "halflight".to_owned(),
                    display_name: "LogOS - Halflight [Performance]".to_owned(),
                    kernel_image: "vmlinuz-linux-zen".to_owned(),
                    initramfs_image: "initramfs-linux-zen.img".to_owned(),
                    cmdline: tokens(&[
                        "audit=0",
                        "mitigations=off",
                        "nowatchdog",
                        "nmi_watchdog=0",
                        "quiet",
                        "loglevel=3",
                    ]),
                    boot_message: Some("Loading Linux Zen - Performance Mode...".to_owned()),
                    class: ProfileClass::Primary,
                },
                SecurityProfile {
                    id: "recovery-lts".to_owned(),
                    display_name: "Linux LTS - Fallback Initramfs".to_owned(),
                    kernel_image: "vmlinuz-linux-lts".to_owned(),
                    initramfs_image: "initramfs-linux-lts-fallback.img".to_owned(),
                    cmdline: Vec::new(),
                    boot_message: None,
                    class: ProfileClass::Recovery,
                },
                SecurityProfile {
                    id: "recovery-mainline".to_owned(),
                    display_name: "Linux (Mainline) - Fallback".to_owned(),
                    kernel_image: "vmlinuz-linux".to_owned(),
                    initramfs_image: "initramfs-linux-fallback.img".to_owned(),
                    cmdline: Vec::new(),
                    boot_message: None,
                    class: ProfileClass::Recovery,
                },
            ],
        }
    }
}

fn tokens(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|token| (*token).to_owned()).collect()
}
