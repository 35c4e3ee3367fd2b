//! Installation credential value types.

pub mod credential;
pub mod secret;
