pub use substrate_raza_building_blocks::prelude::*;
pub use substrate_raza_concepts::prelude::*;

pub use substrate_raza_core::backend::*;
pub use substrate_raza_core::bulk::*;
pub use substrate_raza_core::config::*;
pub use substrate_raza_core::density::*;
pub use substrate_raza_core::diffusion::*;
pub use substrate_raza_core::dirichlet::*;
pub use substrate_raza_core::errors::*;
pub use substrate_raza_core::execution::*;
pub use substrate_raza_core::grid::*;
pub use substrate_raza_core::reduction::*;
pub use substrate_raza_core::solver::*;
pub use substrate_raza_core::storage::*;
pub use substrate_raza_core::time::*;
pub use substrate_raza_core::xml;
