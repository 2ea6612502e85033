#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! [substrate_raza](crate) simulates substrates which diffuse and decay inside a voxelized
//! domain while being secreted and taken up by the agents of a cellular simulation.
//!
//! The agents themselves are owned by the surrounding simulation.
//! They are only accessed through the [AgentData](concepts::AgentData) concept which exposes
//! positions, volumes and transport parameters.
//!
//! ```
//! use substrate_raza::prelude::*;
//!
//! let env = MicroenvironmentBuilder::new()
//!     .bounding_box([0.0; 3], [100.0, 100.0, 0.0], [20.0; 3], 2)
//!     .timestep(0.01)
//!     .substrate(SubstrateConfig::new("oxygen", 1e5, 0.1, 38.0))
//!     .track_internalized_substrates(true)
//!     .build()?;
//! let mut agents = AgentSubstrateStore::new(2, 1);
//! agents.add_agent(AgentSubstrateState::new(vec![50.0, 50.0], 2494.0, 1).with_uptake(0, 10.0))?;
//!
//! let mut simulation =
//!     SubstrateSimulation::new(env, Settings::default(), &BackendRegistry::with_defaults())?;
//! simulation.step(Some(&agents as &dyn AgentData), ReductionMode::Recompute);
//! assert!(agents.internalized(0, 0)? > 0.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use substrate_raza_building_blocks as building_blocks;

pub use substrate_raza_concepts as concepts;

pub use substrate_raza_core as core;

/// Re-exports the default simulation types and traits.
pub mod prelude;
