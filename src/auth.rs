//! Credential models for the remote-storage handshake.

pub mod credential;
pub mod secret;

pub use credential::*;
pub use secret::*;
