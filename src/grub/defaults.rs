use std::fmt::Write as _;

use crate::config::grub::GrubDefaults;

/// Render the `etc/default/grub` settings file. Pure function of the settings,
/// no identity dependency.
pub fn render_global_defaults(defaults: &GrubDefaults) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# {} GRUB Configuration", defaults.distributor);
    if defaults.save_default {
        out.push_str("GRUB_DEFAULT=saved\n");
        out.push_str("GRUB_SAVEDEFAULT=true\n");
    } else {
        out.push_str("GRUB_DEFAULT=0\n");
    }
    let _ = writeln!(out, "GRUB_TIMEOUT={}", defaults.timeout);
    let _ = writeln!(out, "GRUB_DISTRIBUTOR=\"{}\"", defaults.distributor);
    let _ = writeln!(
        out,
        "GRUB_CMDLINE_LINUX_DEFAULT=\"{}\"",
        defaults.cmdline_linux_default
    );
    let _ = writeln!(out, "GRUB_CMDLINE_LINUX=\"{}\"", defaults.cmdline_linux);
    if defaults.enable_cryptodisk {
        out.push_str("GRUB_ENABLE_CRYPTODISK=y\n");
    }
    let _ = writeln!(
        out,
        "GRUB_DISABLE_OS_PROBER={}",
        defaults.disable_os_prober
    );
    let _ = writeln!(out, "GRUB_GFXMODE={}", defaults.gfxmode);
    let _ = writeln!(out, "GRUB_GFXPAYLOAD_LINUX={}", defaults.gfxpayload_linux);
    let _ = writeln!(out, "GRUB_TERMINAL_OUTPUT={}", defaults.terminal_output);

    out
}
