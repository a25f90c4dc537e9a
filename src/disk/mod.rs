pub mod blkid;

use std::path::Path;

use anyhow::Result;

use crate::error::ProvisionError;
use blkid::BlockDeviceQuery;

/// Canonical device path of the decrypted root mapping.
pub const CRYPTROOT_MAPPING: &str = "/dev/mapper/cryptroot";

/// Mapper name patterns tried in order when the canonical mapping is absent.
/// Encryption setup tools do not agree on mapping names, so first match wins.
const MAPPER_FALLBACK_PATTERNS: &[&str] = &["/dev/mapper/luks-*", "/dev/mapper/arch*"];

/// Identifiers of the encrypted root disk, resolved once per provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskIdentity {
    /// UUID of the outer LUKS container, hyphenated canonical form.
    pub crypt_uuid: String,

    /// UUID of the filesystem living inside the decrypted mapping.
    pub filesystem_uuid: String,
}

impl DiskIdentity {
    /// The container UUID with hyphens stripped, as `cryptomount -u` wants it.
    pub fn crypt_uuid_compact(&self) -> String {
        self.crypt_uuid.replace('-', "")
    }

    pub fn is_complete(&self) -> bool {
        !self.crypt_uuid.is_empty() && !self.filesystem_uuid.is_empty()
    }
}

/// A partition the surrounding installer already knows about, used as a
/// fallback source of the container UUID when no LUKS superblock is reported.
#[derive(Debug, Clone)]
pub struct KnownPartition {
    pub uuid: String,
    pub encrypted: bool,
}

/// Discover the UUID of the encrypted root container and of the filesystem
/// behind its decrypted mapping.
///
/// Query failures along the way only advance to the next fallback; the run
/// fails with [`ProvisionError::Resolution`] only once every fallback is
/// exhausted on either side.
pub async fn resolve_disk_identity(
    query: &impl BlockDeviceQuery,
    known_partitions: &[KnownPartition],
) -> Result<DiskIdentity> {
    let crypt_uuid = resolve_crypt_uuid(query, known_partitions).await;
    let filesystem_uuid = resolve_filesystem_uuid(query).await;

    match (crypt_uuid, filesystem_uuid) {
        (Some(crypt_uuid), Some(filesystem_uuid)) => {
            let identity = DiskIdentity {
                crypt_uuid,
                filesystem_uuid,
            };
            tracing::debug!(
                crypt_uuid = %identity.crypt_uuid,
                filesystem_uuid = %identity.filesystem_uuid,
                "resolved disk identity"
            );
            Ok(identity)
        }
        _ => Err(ProvisionError::Resolution(
            "no encrypted volume or no contained filesystem found".into(),
        )
        .into()),
    }
}

async fn resolve_crypt_uuid(
    query: &impl BlockDeviceQuery,
    known_partitions: &[KnownPartition],
) -> Option<String> {
    match query.first_uuid_of_fstype("crypto_LUKS").await {
        Ok(Some(uuid)) => return Some(uuid),
        Ok(None) => tracing::debug!("no LUKS container reported, trying known partitions"),
        Err(error) => {
            tracing::warn!(?error, "LUKS container query failed, trying known partitions")
        }
    }

    known_partitions
        .iter()
        .find(|partition| partition.encrypted && !partition.uuid.is_empty())
        .map(|partition| partition.uuid.clone())
}

async fn resolve_filesystem_uuid(query: &impl BlockDeviceQuery) -> Option<String> {
    match query.uuid_of_device(Path::new(CRYPTROOT_MAPPING)).await {
        Ok(Some(uuid)) => return Some(uuid),
        Ok(None) => tracing::debug!("no filesystem behind {CRYPTROOT_MAPPING}, scanning mapper names"),
        Err(error) => {
            tracing::warn!(?error, "query of {} failed, scanning mapper names", CRYPTROOT_MAPPING)
        }
    }

    for pattern in MAPPER_FALLBACK_PATTERNS {
        for path in query.mapper_candidates(pattern) {
            match query.uuid_of_device(&path).await {
                Ok(Some(uuid)) => return Some(uuid),
                Ok(None) => continue,
                Err(error) => {
                    tracing::debug!(?error, path = %path.display(), "mapper candidate query failed")
                }
            }
        }
    }

    None
}
