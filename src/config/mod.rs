pub mod grub;
pub mod profile;
