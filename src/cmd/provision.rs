use std::process::ExitCode;

use anyhow::Result;
use async_trait::async_trait;

use crate::{
    cli::ProvisionOptions,
    config::{grub::GrubDefaults, profile::ProfileSet},
    disk::{
        self,
        blkid::{BlkidQuery, BlockDeviceQuery},
    },
    grub,
    install::{ArchChrootSession, InstallSession},
    system,
};

const KERNEL_TRIO_PACKAGES: &[&str] = &[
    "linux",
    "linux-headers",
    "linux-lts",
    "linux-lts-headers",
    "linux-zen",
    "linux-zen-headers",
];

const SECURITY_PACKAGES: &[&str] = &["apparmor", "audit"];

const BOOTLOADER_PACKAGES: &[&str] = &["grub", "efibootmgr", "os-prober"];

/// Result reported to the surrounding installer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The custom flow fully succeeded. The caller must not install its own
    /// bootloader on top.
    Handled,

    /// Something failed. The caller should run its default bootloader path;
    /// artifacts already written are left in place.
    Fallback { reason: String },
}

impl ProvisionOutcome {
    /// Process exit code reported to the wrapping installer: 0 when handled,
    /// 2 when it should fall back to its default bootloader path.
    pub fn exit_code(&self) -> u8 {
        match self {
            ProvisionOutcome::Handled => 0,
            ProvisionOutcome::Fallback { .. } => 2,
        }
    }
}

/// Progress through the provisioning sequence. Exactly one terminal state is
/// reached per run, `Regenerated` or `Failed`, with no compensating actions
/// in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionState {
    NotStarted,
    KernelsInstalled,
    BootloaderInstalled,
    ProfilesWritten,
    Regenerated,
    Failed,
}

pub struct Provisioner<S, Q> {
    session: S,
    query: Q,
    defaults: GrubDefaults,
    profiles: ProfileSet,
    efi_dir: String,
    state: ProvisionState,
}

impl<S: InstallSession, Q: BlockDeviceQuery> Provisioner<S, Q> {
    pub fn new(
        session: S,
        query: Q,
        defaults: GrubDefaults,
        profiles: ProfileSet,
        efi_dir: impl Into<String>,
    ) -> Self {
        Self {
            session,
            query,
            defaults,
            profiles,
            efi_dir: efi_dir.into(),
            state: ProvisionState::NotStarted,
        }
    }

    pub fn state(&self) -> ProvisionState {
        self.state
    }

    /// Run the whole sequence. Never returns an error: any failure anywhere is
    /// logged once as a warning and reported as `Fallback` so the caller can
    /// take its default path instead.
    pub async fn provision(&mut self) -> ProvisionOutcome {
        tracing::info!("Installing Ringed City boot profiles");

        match self.try_provision().await {
            Ok(()) => {
                tracing::info!("Ringed City boot profiles installed");
                ProvisionOutcome::Handled
            }
            Err(error) => {
                self.state = ProvisionState::Failed;
                let reason = format!("{error:#}");
                tracing::warn!("Provisioning failed: {reason}");
                tracing::warn!("Falling back to default bootloader installation");
                ProvisionOutcome::Fallback { reason }
            }
        }
    }

    async fn try_provision(&mut self) -> Result<()> {
        self.install_kernel_trio().await?;
        self.state = ProvisionState::KernelsInstalled;

        self.install_bootloader().await?;
        self.state = ProvisionState::BootloaderInstalled;

        self.write_boot_profiles().await?;
        self.state = ProvisionState::ProfilesWritten;

        self.regenerate().await?;
        self.state = ProvisionState::Regenerated;

        Ok(())
    }

    async fn install_kernel_trio(&self) -> Result<()> {
        tracing::info!("Installing kernel trio");
        self.session.install_packages(KERNEL_TRIO_PACKAGES).await?;
        self.session.install_packages(SECURITY_PACKAGES).await
    }

    async fn install_bootloader(&self) -> Result<()> {
        tracing::info!("Installing GRUB");
        self.session.install_packages(BOOTLOADER_PACKAGES).await?;
        self.session
            .exec_in_chroot(&format!(
                "grub-install --target=x86_64-efi --efi-directory={} --bootloader-id=LogOS --recheck",
                self.efi_dir
            ))
            .await
    }

    async fn write_boot_profiles(&self) -> Result<()> {
        tracing::info!("Creating boot profiles");
        let identity =
            disk::resolve_disk_identity(&self.query, self.session.known_partitions()).await?;

        let defaults_text = grub::defaults::render_global_defaults(&self.defaults);
        let profiles_text =
            grub::profiles::render_profiles_script(&identity, &self.profiles.profiles)?;
        grub::artifacts::write_boot_artifacts(
            self.session.target(),
            &defaults_text,
            &profiles_text,
        )
        .await?;

        system::write_system_metadata(self.session.target()).await
    }

    async fn regenerate(&self) -> Result<()> {
        tracing::info!("Regenerating initramfs and GRUB config");
        self.session.exec_in_chroot("mkinitcpio -P").await?;
        self.session
            .exec_in_chroot("grub-mkconfig -o /boot/grub/grub.cfg")
            .await
    }
}

pub struct ProvisionCommand {
    pub provision_options: ProvisionOptions,
}

#[async_trait]
impl super::Command for ProvisionCommand {
    async fn run(&self) -> Result<ExitCode> {
        BlkidQuery::preflight()?;

        let profiles = match &self.provision_options.profiles {
            Some(path) => ProfileSet::load(path).await?,
            None => ProfileSet::default(),
        };
        let defaults = match &self.provision_options.grub_defaults {
            Some(path) => GrubDefaults::load(path).await?,
            None => GrubDefaults::default(),
        };

        let session = ArchChrootSession::new(&self.provision_options.target);
        let mut provisioner = Provisioner::new(
            session,
            BlkidQuery,
            defaults,
            profiles,
            &self.provision_options.efi_dir,
        );

        // The exit code is the "not handled" signal for the wrapping
        // installer; any failure was already logged.
        let outcome = provisioner.provision().await;
        Ok(ExitCode::from(outcome.exit_code()))
    }
}

#[cfg(test)]
mod tests {

    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use super::*;
    use crate::disk::tests::FakeQuery;
    use crate::disk::KnownPartition;
    use crate::error::ProvisionError;

    /// Records every collaborator call; optionally fails package installs or
    /// chroot commands matching a substring.
    struct FakeSession {
        target: PathBuf,
        calls: Mutex<Vec<String>>,
        fail_on_packages: bool,
        fail_on_chroot_containing: Option<String>,
    }

    impl FakeSession {
        fn new(target: &Path) -> Self {
            Self {
                target: target.to_owned(),
                calls: Mutex::new(Vec::new()),
                fail_on_packages: false,
                fail_on_chroot_containing: None,
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InstallSession for FakeSession {
        fn target(&self) -> &Path {
            &self.target
        }

        async fn install_packages(&self, packages: &[&str]) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("packages: {}", packages.join(" ")));
            if self.fail_on_packages {
                return Err(
                    ProvisionError::ExternalCommand("pacstrap exited with 1".into()).into(),
                );
            }
            Ok(())
        }

        async fn exec_in_chroot(&self, command: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("chroot: {command}"));
            if let Some(needle) = &self.fail_on_chroot_containing {
                if command.contains(needle.as_str()) {
                    return Err(ProvisionError::ExternalCommand(format!(
                        "command failed: {command}"
                    ))
                    .into());
                }
            }
            Ok(())
        }
    }

    fn provisioner_with(
        session: FakeSession,
        query: FakeQuery,
    ) -> Provisioner<FakeSession, FakeQuery> {
        Provisioner::new(
            session,
            query,
            GrubDefaults::default(),
            ProfileSet::default(),
            "/boot/efi",
        )
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(ProvisionOutcome::Handled.exit_code(), 0);
        assert_eq!(
            ProvisionOutcome::Fallback {
                reason: "boom".into()
            }
            .exit_code(),
            2
        );
    }

    #[tokio::test]
    async fn test_successful_run_is_handled() -> Result<()> {
        let target = tempfile::tempdir()?;
        let session = FakeSession::new(target.path());
        let query = FakeQuery::with_both(
            "1234abcd-0000-0000-0000-000000000001",
            "deadbeef-0000-0000-0000-000000000002",
        );

        let mut provisioner = provisioner_with(session, query);
        let outcome = provisioner.provision().await;

        assert_eq!(outcome, ProvisionOutcome::Handled);
        assert_eq!(provisioner.state(), ProvisionState::Regenerated);

        let calls = provisioner.session.calls();
        assert_eq!(calls.len(), 6);
        assert!(calls[0].starts_with("packages: linux linux-headers"));
        assert_eq!(calls[1], "packages: apparmor audit");
        assert_eq!(calls[2], "packages: grub efibootmgr os-prober");
        assert!(calls[3].contains("grub-install --target=x86_64-efi"));
        assert_eq!(calls[4], "chroot: mkinitcpio -P");
        assert_eq!(calls[5], "chroot: grub-mkconfig -o /boot/grub/grub.cfg");

        let profiles_script = tokio::fs::read_to_string(
            target.path().join(grub::artifacts::PROFILES_SCRIPT_PATH),
        )
        .await?;
        assert!(profiles_script.contains("cryptomount -u 1234abcd000000000000000000000001"));
        assert!(
            tokio::fs::try_exists(target.path().join(system::RELEASE_PATH)).await?
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_regeneration_failure_signals_fallback() -> Result<()> {
        let target = tempfile::tempdir()?;
        let mut session = FakeSession::new(target.path());
        session.fail_on_chroot_containing = Some("grub-mkconfig".to_owned());
        let query = FakeQuery::with_both(
            "1234abcd-0000-0000-0000-000000000001",
            "deadbeef-0000-0000-0000-000000000002",
        );

        let mut provisioner = provisioner_with(session, query);
        let outcome = provisioner.provision().await;

        match outcome {
            ProvisionOutcome::Fallback { reason } => assert!(reason.contains("grub-mkconfig")),
            ProvisionOutcome::Handled => panic!("expected fallback"),
        }
        assert_eq!(provisioner.state(), ProvisionState::Failed);

        // Artifacts written before the failure stay in place; no rollback.
        assert!(
            tokio::fs::try_exists(target.path().join(grub::artifacts::PROFILES_SCRIPT_PATH))
                .await?
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_resolution_failure_signals_fallback_before_any_write() -> Result<()> {
        let target = tempfile::tempdir()?;
        let session = FakeSession::new(target.path());

        let mut provisioner = provisioner_with(session, FakeQuery::empty());
        let outcome = provisioner.provision().await;

        match outcome {
            ProvisionOutcome::Fallback { reason } => {
                assert!(reason.contains("could not determine disk identifiers"))
            }
            ProvisionOutcome::Handled => panic!("expected fallback"),
        }
        assert_eq!(provisioner.state(), ProvisionState::Failed);
        assert!(
            !tokio::fs::try_exists(target.path().join(grub::artifacts::GRUB_DEFAULTS_PATH)).await?
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_package_failure_stops_the_sequence_early() -> Result<()> {
        let target = tempfile::tempdir()?;
        let mut session = FakeSession::new(target.path());
        session.fail_on_packages = true;

        let mut provisioner = provisioner_with(session, FakeQuery::empty());
        let outcome = provisioner.provision().await;

        assert!(matches!(outcome, ProvisionOutcome::Fallback { .. }));
        assert_eq!(provisioner.state(), ProvisionState::Failed);
        assert_eq!(provisioner.session.calls().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_known_partitions_feed_resolution() -> Result<()> {
        let target = tempfile::tempdir()?;

        struct PartitionSession {
            inner: FakeSession,
            known: Vec<KnownPartition>,
        }

        #[async_trait]
        impl InstallSession for PartitionSession {
            fn target(&self) -> &Path {
                self.inner.target()
            }
            async fn install_packages(&self, packages: &[&str]) -> Result<()> {
                self.inner.install_packages(packages).await
            }
            async fn exec_in_chroot(&self, command: &str) -> Result<()> {
                self.inner.exec_in_chroot(command).await
            }
            fn known_partitions(&self) -> &[KnownPartition] {
                &self.known
            }
        }

        let session = PartitionSession {
            inner: FakeSession::new(target.path()),
            known: vec![KnownPartition {
                uuid: "1234abcd-0000-0000-0000-000000000001".to_owned(),
                encrypted: true,
            }],
        };
        // LUKS type query comes back empty, but the mapping still resolves.
        let query = FakeQuery {
            luks_uuid: Ok(None),
            device_uuids: std::collections::HashMap::from([(
                crate::disk::CRYPTROOT_MAPPING.to_owned(),
                "deadbeef-0000-0000-0000-000000000002".to_owned(),
            )]),
            mapper_nodes: Vec::new(),
        };

        let mut provisioner = Provisioner::new(
            session,
            query,
            GrubDefaults::default(),
            ProfileSet::default(),
            "/boot/efi",
        );
        assert_eq!(provisioner.provision().await, ProvisionOutcome::Handled);

        let script = tokio::fs::read_to_string(
            target.path().join(grub::artifacts::PROFILES_SCRIPT_PATH),
        )
        .await?;
        assert!(script.contains("cryptdevice=UUID=1234abcd-0000-0000-0000-000000000001:cryptroot"));
        Ok(())
    }
}
