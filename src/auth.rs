//! Identity-domain identifiers, credential models, and the assertion signer.

pub mod id;
pub mod signer;
pub mod token;

pub use id::*;
pub use signer::*;
pub use token::{credential::*, secret::*};
