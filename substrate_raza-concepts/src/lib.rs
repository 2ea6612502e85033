#![deny(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
//! This crate encapsulates concepts which govern the exchange of substrates between a
//! discretized microenvironment and the agents living inside of it.
//! The solver in [substrate_raza-core](https://docs.rs/substrate_raza-core) is written purely
//! in terms of these traits.

mod agent;
mod atomic;
mod bulk;
mod errors;
mod execution;

pub use agent::*;
pub use atomic::*;
pub use bulk::*;
pub use errors::*;
pub use execution::*;

/// Re-exports every concept
pub mod prelude {
    pub use crate::agent::*;
    pub use crate::atomic::*;
    pub use crate::bulk::*;
    pub use crate::errors::*;
    pub use crate::execution::*;
}
