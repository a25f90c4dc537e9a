use std::os::unix::fs::PermissionsExt as _;
use std::path::Path;

use anyhow::{Context as _, Result};
use tokio::fs;

use crate::error::ProvisionError;

pub const GRUB_DEFAULTS_PATH: &str = "etc/default/grub";
pub const PROFILES_SCRIPT_PATH: &str = "etc/grub.d/41_logos_profiles";
pub const DEFAULT_GENERATOR_PATH: &str = "etc/grub.d/10_linux";

/// Write both boot configuration artifacts under the install target root.
///
/// Both files are replaced wholesale on every run. The profiles script becomes
/// executable so grub-mkconfig picks it up; the stock 10_linux generator is
/// demoted to a plain file so it stops emitting duplicate entries.
pub async fn write_boot_artifacts(
    target: &Path,
    defaults_text: &str,
    profiles_text: &str,
) -> Result<()> {
    write_artifacts(target, defaults_text, profiles_text)
        .await
        .map_err(|error| ProvisionError::ConfigWrite(format!("{error:#}")).into())
}

async fn write_artifacts(target: &Path, defaults_text: &str, profiles_text: &str) -> Result<()> {
    let defaults_path = target.join(GRUB_DEFAULTS_PATH);
    write_file(&defaults_path, defaults_text).await?;

    let profiles_path = target.join(PROFILES_SCRIPT_PATH);
    write_file(&profiles_path, profiles_text).await?;
    fs::set_permissions(&profiles_path, std::fs::Permissions::from_mode(0o755))
        .await
        .with_context(|| format!("Failed to mark {profiles_path:?} executable"))?;

    let default_generator = target.join(DEFAULT_GENERATOR_PATH);
    if fs::try_exists(&default_generator).await? {
        fs::set_permissions(&default_generator, std::fs::Permissions::from_mode(0o644))
            .await
            .with_context(|| format!("Failed to demote {default_generator:?}"))?;
    }

    Ok(())
}

async fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {parent:?}"))?;
    }
    fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {path:?}"))
}
