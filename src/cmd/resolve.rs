use std::process::ExitCode;

use anyhow::Result;
use async_trait::async_trait;

use crate::disk::{self, blkid::BlkidQuery};

/// Print the resolved disk identifiers, one per line, for scripting and for
/// checking a system before provisioning it.
pub struct ResolveCommand {}

#[async_trait]
impl super::Command for ResolveCommand {
    async fn run(&self) -> Result<ExitCode> {
        BlkidQuery::preflight()?;

        let identity = disk::resolve_disk_identity(&BlkidQuery, &[]).await?;

        println!("CRYPT_UUID={}", identity.crypt_uuid);
        println!("CRYPT_UUID_COMPACT={}", identity.crypt_uuid_compact());
        println!("FILESYSTEM_UUID={}", identity.filesystem_uuid);

        Ok(ExitCode::SUCCESS)
    }
}
