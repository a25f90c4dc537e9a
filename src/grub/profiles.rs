use std::fmt::Write as _;

use anyhow::{bail, Result};

use crate::{
    config::profile::{ProfileClass, SecurityProfile},
    disk::DiskIdentity,
};

/// GRUB modules every entry needs to decrypt and mount the root: compression,
/// partition table, filesystem, and the two encryption layers.
const DECRYPT_MODULES: &[&str] = &["gzio", "part_gpt", "btrfs", "cryptodisk", "luks2"];

const RECOVERY_SUBMENU_TITLE: &str = "LogOS Recovery Options";

/// Render the `etc/grub.d` profiles script.
///
/// The output is a self-contained bash script that cats literal menuentry
/// stanzas when grub-mkconfig executes it. Primary entries come first in the
/// given order, then one submenu holding every recovery entry in the given
/// order. Same identity and profiles render to byte-identical output.
pub fn render_profiles_script(
    identity: &DiskIdentity,
    profiles: &[SecurityProfile],
) -> Result<String> {
    if !identity.is_complete() {
        bail!("disk identity is incomplete, refusing to render boot profiles");
    }

    let mut script = String::new();
    script.push_str("#!/bin/bash\n");
    script.push_str("cat << 'MENUEOF'\n");
    script.push_str("# LogOS Ringed City Security Profiles\n");

    for profile in profiles
        .iter()
        .filter(|profile| profile.class == ProfileClass::Primary)
    {
        script.push('\n');
        push_primary_entry(&mut script, identity, profile);
    }

    let recoveries: Vec<_> = profiles
        .iter()
        .filter(|profile| profile.class == ProfileClass::Recovery)
        .collect();
    if !recoveries.is_empty() {
        script.push('\n');
        let _ = writeln!(
            script,
            "submenu \"{RECOVERY_SUBMENU_TITLE}\" --class recovery {{"
        );
        for (i, profile) in recoveries.iter().enumerate() {
            if i > 0 {
                script.push('\n');
            }
            push_recovery_entry(&mut script, identity, profile);
        }
        script.push_str("}\n");
    }

    script.push_str("MENUEOF\n");
    Ok(script)
}

fn push_primary_entry(script: &mut String, identity: &DiskIdentity, profile: &SecurityProfile) {
    let _ = writeln!(
        script,
        "menuentry \"{}\" --class logos --class gnu-linux --class gnu --class os $menuentry_id_option 'logos-{}' {{",
        profile.display_name, profile.id
    );
    script.push_str("    load_video\n");
    script.push_str("    set gfxpayload=keep\n");
    push_decrypt_preamble(script, identity, 1);
    let _ = writeln!(script, "    echo '{}'", profile.boot_message_or_default());
    let _ = writeln!(
        script,
        "    linux /@/boot/{} {}",
        profile.kernel_image,
        kernel_parameters(identity, &profile.cmdline)
    );
    script.push_str("    echo 'Loading initial ramdisk...'\n");
    let _ = writeln!(script, "    initrd /@/boot/{}", profile.initramfs_image);
    script.push_str("}\n");
}

/// Recovery entries stay minimal: same decrypt preamble, root parameters only,
/// no messaging. Nothing here may depend on a hardening knob that could itself
/// prevent boot.
fn push_recovery_entry(script: &mut String, identity: &DiskIdentity, profile: &SecurityProfile) {
    let _ = writeln!(
        script,
        "    menuentry \"{}\" --class recovery {{",
        profile.display_name
    );
    script.push_str("        load_video\n");
    push_decrypt_preamble(script, identity, 2);
    let _ = writeln!(
        script,
        "        linux /@/boot/{} {}",
        profile.kernel_image,
        kernel_parameters(identity, &profile.cmdline)
    );
    let _ = writeln!(script, "        initrd /@/boot/{}", profile.initramfs_image);
    script.push_str("    }\n");
}

fn push_decrypt_preamble(script: &mut String, identity: &DiskIdentity, indent: usize) {
    let pad = "    ".repeat(indent);
    for module in DECRYPT_MODULES {
        let _ = writeln!(script, "{pad}insmod {module}");
    }
    let _ = writeln!(script, "{pad}cryptomount -u {}", identity.crypt_uuid_compact());
    let _ = writeln!(
        script,
        "{pad}search --no-floppy --fs-uuid --set=root {}",
        identity.filesystem_uuid
    );
}

fn kernel_parameters(identity: &DiskIdentity, cmdline: &[String]) -> String {
    let mut params = vec![
        format!("root=UUID={}", identity.filesystem_uuid),
        "rootflags=subvol=@".to_owned(),
        "rw".to_owned(),
        format!("cryptdevice=UUID={}:cryptroot", identity.crypt_uuid),
    ];
    params.extend(cmdline.iter().cloned());
    params.join(" ")
}
