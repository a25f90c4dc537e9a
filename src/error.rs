use thiserror::Error;

/// Failure classes of a provisioning run. All of them are fatal to the run and
/// end in the fallback signal; none of them is fatal to the surrounding
/// installation.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Disk identity could not be determined.
    #[error("could not determine disk identifiers: {0}")]
    Resolution(String),

    /// Writing a boot configuration artifact to the target filesystem failed.
    #[error("failed to write boot configuration: {0}")]
    ConfigWrite(String),

    /// Package installation, chroot execution or regeneration failed.
    #[error("external command failed: {0}")]
    ExternalCommand(String),
}
