pub mod artifacts;
pub mod defaults;
pub mod profiles;
