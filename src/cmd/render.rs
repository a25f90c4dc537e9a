use std::process::ExitCode;

use anyhow::Result;
use async_trait::async_trait;

use crate::{
    cli::{RenderArtifact, RenderOptions},
    config::{grub::GrubDefaults, profile::ProfileSet},
    disk::{self, blkid::BlkidQuery, DiskIdentity},
    grub,
};

/// Render one of the boot configuration artifacts to stdout without touching
/// the target filesystem.
pub struct RenderCommand {
    pub render_options: RenderOptions,
}

#[async_trait]
impl super::Command for RenderCommand {
    async fn run(&self) -> Result<ExitCode> {
        match self.render_options.artifact {
            RenderArtifact::Defaults => {
                let defaults = match &self.render_options.grub_defaults {
                    Some(path) => GrubDefaults::load(path).await?,
                    None => GrubDefaults::default(),
                };
                print!("{}", grub::defaults::render_global_defaults(&defaults));
            }
            RenderArtifact::Profiles => {
                let identity = self.identity().await?;
                let profiles = match &self.render_options.profiles {
                    Some(path) => ProfileSet::load(path).await?,
                    None => ProfileSet::default(),
                };
                print!(
                    "{}",
                    grub::profiles::render_profiles_script(&identity, &profiles.profiles)?
                );
            }
        }
        Ok(ExitCode::SUCCESS)
    }
}

impl RenderCommand {
    /// Use the caller-supplied UUIDs when both are given; otherwise resolve
    /// from the running system and apply whichever override is present.
    async fn identity(&self) -> Result<DiskIdentity> {
        let options = &self.render_options;
        match (&options.crypt_uuid, &options.fs_uuid) {
            (Some(crypt_uuid), Some(filesystem_uuid)) => Ok(DiskIdentity {
                crypt_uuid: crypt_uuid.clone(),
                filesystem_uuid: filesystem_uuid.clone(),
            }),
            _ => {
                BlkidQuery::preflight()?;
                let mut identity = disk::resolve_disk_identity(&BlkidQuery, &[]).await?;
                if let Some(crypt_uuid) = &options.crypt_uuid {
                    identity.crypt_uuid = crypt_uuid.clone();
                }
                if let Some(filesystem_uuid) = &options.fs_uuid {
                    identity.filesystem_uuid = filesystem_uuid.clone();
                }
                Ok(identity)
            }
        }
    }
}
