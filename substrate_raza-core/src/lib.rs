#![deny(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! This crate contains the reaction-diffusion solver for substrates which are shared by agents
//! satisfying the [AgentData](substrate_raza_concepts::AgentData) concept.
//!
//! ## Solver
//! Substrates diffuse and decay on a [CartesianGrid](grid::CartesianGrid).
//! Every step is integrated implicitly with dimensional splitting
//! (see [diffusion]), followed by [Dirichlet conditions](dirichlet), [bulk] sources and sinks
//! and finally the secretion and uptake of agents (see [reduction]).
//! The [solver] module combines these stages and is generic over the
//! [ExecutionPolicy](substrate_raza_concepts::ExecutionPolicy) which determines how loops are
//! executed.
//!
//! ## Backends
//! Solvers are created by name from an explicit [BackendRegistry](backend::BackendRegistry).
//! The default registry contains a [Sequential](execution::Sequential) and a
//! [Rayon](execution::Rayon) backend.
//!
//! ## Configuration and Storage
//! A [Microenvironment](config::Microenvironment) is assembled by the
//! [MicroenvironmentBuilder](config::MicroenvironmentBuilder) or from the legacy
//! [xml] format.
//! Snapshots of all densities can be exported as json files via the [storage] module.

pub mod backend;
pub mod bulk;
pub mod config;
pub mod density;
pub mod diffusion;
pub mod dirichlet;
pub mod errors;
pub mod execution;
pub mod grid;
pub mod reduction;
pub mod solver;
pub mod storage;
pub mod time;
pub mod xml;

#[cfg(test)]
mod testing;

#[doc(hidden)]
pub use rayon;

#[cfg(feature = "tracing")]
#[doc(hidden)]
pub use tracing;
