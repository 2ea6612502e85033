#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
//! # substrate_raza - Building Blocks
//!
//! Ready-made implementations of the concepts in
//! [substrate_raza-concepts](https://docs.rs/substrate_raza-concepts).
//!
//! | Module | Contents |
//! | --- | --- |
//! | [agents] | [AgentSubstrateStore](agents::AgentSubstrateStore) which keeps all agents in flat vectors |
//! | [bulk] | Uniform and region-restricted [BulkFunctor](substrate_raza_concepts::BulkFunctor)s |

pub mod agents;
pub mod bulk;

/// Re-exports all building blocks
pub mod prelude;
