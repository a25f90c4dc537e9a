use clap::{Parser, ValueEnum};

use crate::build::CLAP_LONG_VERSION;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[clap(long_version = CLAP_LONG_VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Subcommand,
}

#[derive(Parser, Debug)]
pub enum Subcommand {
    /// Install the kernel trio and GRUB and write the LogOS boot profiles into
    /// an installation target. Exits 0 when handled, 2 when the caller should
    /// fall back to its default bootloader installation.
    #[command(name = "provision")]
    Provision(ProvisionOptions),

    /// Resolve the encrypted volume and root filesystem UUIDs and print them.
    #[command(name = "resolve")]
    Resolve(ResolveOptions),

    /// Render a boot configuration artifact to stdout.
    #[command(name = "render")]
    Render(RenderOptions),
}

#[derive(Parser, Debug)]
pub struct ProvisionOptions {
    /// Mount point of the installation target root.
    #[clap(long, default_value = "/mnt/archinstall")]
    pub target: String,

    /// Mount point of the EFI system partition inside the target.
    #[clap(long, default_value = "/boot/efi")]
    pub efi_dir: String,

    /// Path to a TOML file overriding the built-in security profile set.
    #[clap(long)]
    pub profiles: Option<String>,

    /// Path to a TOML file overriding the built-in GRUB global settings.
    #[clap(long)]
    pub grub_defaults: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ResolveOptions {}

#[derive(Parser, Debug)]
pub struct RenderOptions {
    /// Which artifact to render.
    #[arg(value_enum)]
    pub artifact: RenderArtifact,

    /// UUID of the LUKS container. Resolved from the running system when omitted.
    #[clap(long)]
    pub crypt_uuid: Option<String>,

    /// UUID of the filesystem inside the decrypted mapping. Resolved when omitted.
    #[clap(long)]
    pub fs_uuid: Option<String>,

    /// Path to a TOML file overriding the built-in security profile set.
    #[clap(long)]
    pub profiles: Option<String>,

    /// Path to a TOML file overriding the built-in GRUB global settings.
    #[clap(long)]
    pub grub_defaults: Option<String>,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum RenderArtifact {
    /// The etc/default/grub settings file.
    #[clap(name = "defaults")]
    Defaults,

    /// The etc/grub.d profiles script.
    #[clap(name = "profiles")]
    Profiles,
}
