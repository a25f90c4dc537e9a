use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use async_trait::async_trait;
use tokio::process::Command;

use crate::shell::CheckCommandOutput as _;

/// Read-only block device metadata lookups used by identity resolution.
///
/// Kept behind a trait so resolution logic can be exercised against canned
/// results instead of real devices.
#[async_trait]
pub trait BlockDeviceQuery: Sync {
    /// UUID of the first device carrying a superblock of type `fstype`.
    async fn first_uuid_of_fstype(&self, fstype: &str) -> Result<Option<String>>;

    /// Filesystem UUID of a specific device node.
    async fn uuid_of_device(&self, device: &Path) -> Result<Option<String>>;

    /// Device nodes matching a mapper name pattern, in filesystem order.
    /// Part of the trait so fallback scanning can run against canned devices.
    fn mapper_candidates(&self, pattern: &str) -> Vec<PathBuf> {
        glob::glob(pattern)
            .map(|paths| paths.flatten().collect())
            .unwrap_or_default()
    }
}

/// Production implementation backed by the blkid tool.
pub struct BlkidQuery;

impl BlkidQuery {
    /// Check that blkid is actually available before a run depends on it.
    pub fn preflight() -> Result<()> {
        which::which("blkid").context("blkid not found in PATH")?;
        Ok(())
    }
}

#[async_trait]
impl BlockDeviceQuery for BlkidQuery {
    async fn first_uuid_of_fstype(&self, fstype: &str) -> Result<Option<String>> {
        Command::new("blkid")
            .args(["--match-token", &format!("TYPE={fstype}")])
            .args(["--match-tag", "UUID", "--output", "value"])
            .run_with_status_checker(|code, stdout, _| parse_uuid_output(code, stdout))
            .await
            .with_context(|| format!("Failed to query devices of type {fstype}"))
    }

    async fn uuid_of_device(&self, device: &Path) -> Result<Option<String>> {
        Command::new("blkid")
            .args(["--match-tag", "UUID", "--output", "value"])
            .arg(device)
            .run_with_status_checker(|code, stdout, _| parse_uuid_output(code, stdout))
            .await
            .with_context(|| format!("Failed to query UUID of {device:?}"))
    }
}

/// blkid exits 2 when nothing matched, which is "not found" rather than a
/// failure. On success only the first output line counts, since a type match
/// may report several devices.
fn parse_uuid_output(code: i32, stdout: Vec<u8>) -> Result<Option<String>> {
    match code {
        0 => {
            let stdout = String::from_utf8(stdout)?;
            let uuid = stdout.lines().next().unwrap_or("").trim();
            if uuid.is_empty() {
                Ok(None)
            } else {
                Ok(Some(uuid.to_owned()))
            }
        }
        2 => Ok(None),
        _ => bail!("Bad exit code"),
    }
}

#[cfg(test)]
mod tests {

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, b"1234abcd-0000-0000-0000-000000000001\n".to_vec(), Some("1234abcd-0000-0000-0000-000000000001"))]
    #[case(0, b"first-uuid\nsecond-uuid\n".to_vec(), Some("first-uuid"))]
    #[case(0, b"\n".to_vec(), None)]
    #[case(2, Vec::new(), None)]
    fn test_parse_uuid_output(
        #[case] code: i32,
        #[case] stdout: Vec<u8>,
        #[case] expected: Option<&str>,
    ) {
        let parsed = parse_uuid_output(code, stdout).unwrap();
        assert_eq!(parsed.as_deref(), expected);
    }

    #[test]
    fn test_parse_uuid_output_rejects_other_exit_codes() {
        assert!(parse_uuid_output(4, Vec::new()).is_err());
    }
}
