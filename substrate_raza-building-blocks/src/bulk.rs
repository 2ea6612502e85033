//! Ready-made bulk sources and sinks.
use serde::{Deserialize, Serialize};
use substrate_raza_concepts::BulkFunctor;

/// Identical supply and uptake in every voxel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UniformBulk {
    /// Supply rate $S$ per substrate
    pub supply_rates: Vec<f64>,
    /// Uptake rate $U$ per substrate
    pub uptake_rates: Vec<f64>,
    /// Target density $T$ per substrate
    pub target_densities: Vec<f64>,
}

impl UniformBulk {
    /// Neither supplies nor removes anything
    pub fn new(n_substrates: usize) -> Self {
        Self {
            supply_rates: vec![0.0; n_substrates],
            uptake_rates: vec![0.0; n_substrates],
            target_densities: vec![0.0; n_substrates],
        }
    }

    /// Supplies one substrate with the given rate towards the target density
    pub fn with_supply(mut self, substrate: usize, rate: f64, target_density: f64) -> Self {
        self.supply_rates[substrate] = rate;
        self.target_densities[substrate] = target_density;
        self
    }

    /// Removes one substrate with the given rate
    pub fn with_uptake(mut self, substrate: usize, rate: f64) -> Self {
        self.uptake_rates[substrate] = rate;
        self
    }
}

impl BulkFunctor for UniformBulk {
    fn supply_rate(&self, substrate: usize, _: [usize; 3]) -> f64 {
        self.supply_rates[substrate]
    }

    fn uptake_rate(&self, substrate: usize, _: [usize; 3]) -> f64 {
        self.uptake_rates[substrate]
    }

    fn supply_target_density(&self, substrate: usize, _: [usize; 3]) -> f64 {
        self.target_densities[substrate]
    }
}

/// Acts like [UniformBulk] inside a box of voxels and does nothing outside of it.
///
/// The box contains all voxels with `min_voxel[i] <= index[i] < max_voxel[i]`.
/// ```
/// # use substrate_raza_building_blocks::prelude::*;
/// # use substrate_raza_concepts::BulkFunctor;
/// let vessel = VoxelRegionBulk {
///     min_voxel: [0, 0, 0],
///     max_voxel: [1, 10, 1],
///     inside: UniformBulk::new(1).with_supply(0, 10.0, 38.0),
/// };
/// assert_eq!(vessel.supply_rate(0, [0, 4, 0]), 10.0);
/// assert_eq!(vessel.supply_rate(0, [1, 4, 0]), 0.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoxelRegionBulk {
    /// Lower voxel indices (inclusive)
    pub min_voxel: [usize; 3],
    /// Upper voxel indices (exclusive)
    pub max_voxel: [usize; 3],
    /// Rates inside the region
    pub inside: UniformBulk,
}

impl VoxelRegionBulk {
    fn contains(&self, voxel: [usize; 3]) -> bool {
        (0..3).all(|i| self.min_voxel[i] <= voxel[i] && voxel[i] < self.max_voxel[i])
    }
}

impl BulkFunctor for VoxelRegionBulk {
    fn supply_rate(&self, substrate: usize, voxel: [usize; 3]) -> f64 {
        match self.contains(voxel) {
            true => self.inside.supply_rate(substrate, voxel),
            false => 0.0,
        }
    }

    fn uptake_rate(&self, substrate: usize, voxel: [usize; 3]) -> f64 {
        match self.contains(voxel) {
            true => self.inside.uptake_rate(substrate, voxel),
            false => 0.0,
        }
    }

    fn supply_target_density(&self, substrate: usize, voxel: [usize; 3]) -> f64 {
        self.inside.supply_target_density(substrate, voxel)
    }
}
