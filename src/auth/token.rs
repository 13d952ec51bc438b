//! Session and delegated token models.

pub mod delegated;
pub mod secret;
