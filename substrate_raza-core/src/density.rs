//! Storage of the densities of all substrates in all voxels.
use core::sync::atomic::Ordering;
use substrate_raza_concepts::{AtomicF64, IndexError};

/// Densities of all substrates in all voxels.
///
/// The values of one voxel are stored contiguously such that the density of substrate `s` in the
/// voxel with linear index `v` is found at position `v * n_substrates + s`.
/// Entries are atomic which allows every solver stage to operate on a shared reference.
/// Within a stage, each entry is either written by exactly one thread or modified by atomic
/// additions only.
#[derive(Clone, Debug)]
pub struct DensityField {
    values: Vec<AtomicF64>,
    n_substrates: usize,
    n_voxels: usize,
}

impl DensityField {
    /// Creates a new field where every voxel holds the given initial densities.
    pub fn from_initial_values(n_voxels: usize, initial_values: &[f64]) -> Self {
        let n_substrates = initial_values.len();
        let values = (0..n_voxels)
            .flat_map(|_| initial_values.iter().map(|&v| AtomicF64::new(v)))
            .collect();
        Self {
            values,
            n_substrates,
            n_voxels,
        }
    }

    /// Number of substrates stored per voxel
    pub fn n_substrates(&self) -> usize {
        self.n_substrates
    }

    /// Number of voxels
    pub fn n_voxels(&self) -> usize {
        self.n_voxels
    }

    #[inline]
    fn index(&self, voxel: usize, substrate: usize) -> usize {
        debug_assert!(voxel < self.n_voxels && substrate < self.n_substrates);
        voxel * self.n_substrates + substrate
    }

    /// Density of one substrate in the voxel with given linear index
    #[inline]
    pub fn get(&self, voxel: usize, substrate: usize) -> f64 {
        self.values[self.index(voxel, substrate)].load(Ordering::Relaxed)
    }

    /// Overwrites the density of one substrate
    #[inline]
    pub fn set(&self, voxel: usize, substrate: usize, value: f64) {
        self.values[self.index(voxel, substrate)].store(value, Ordering::Relaxed)
    }

    /// Atomically adds to the density of one substrate
    #[inline]
    pub fn add(&self, voxel: usize, substrate: usize, value: f64) {
        self.values[self.index(voxel, substrate)].fetch_add(value, Ordering::Relaxed);
    }

    /// All densities of a voxel
    #[inline]
    pub fn voxel(&self, voxel: usize) -> &[AtomicF64] {
        let start = voxel * self.n_substrates;
        &self.values[start..start + self.n_substrates]
    }

    /// Checked variant of [set](Self::set) which is meant for setting up initial conditions.
    pub fn try_set(&self, voxel: usize, substrate: usize, value: f64) -> Result<(), IndexError> {
        if voxel >= self.n_voxels || substrate >= self.n_substrates {
            return Err(IndexError(format!(
                "density index (voxel {}, substrate {}) is out of bounds for {} voxels and {} \
                substrates",
                voxel, substrate, self.n_voxels, self.n_substrates
            )));
        }
        self.set(voxel, substrate, value);
        Ok(())
    }

    /// Copies all values into a plain vector using the same layout
    pub fn to_vec(&self) -> Vec<f64> {
        self.values
            .iter()
            .map(|v| v.load(Ordering::Relaxed))
            .collect()
    }

    /// Copies the densities of one substrate in linear voxel order
    pub fn substrate_values(&self, substrate: usize) -> Vec<f64> {
        (0..self.n_voxels).map(|v| self.get(v, substrate)).collect()
    }

    /// Sum over all voxels of one substrate
    pub fn total(&self, substrate: usize) -> f64 {
        (0..self.n_voxels).map(|v| self.get(v, substrate)).sum()
    }

    /// Checks if all entries are finite numbers
    pub fn is_finite(&self) -> bool {
        self.values
            .iter()
            .all(|v| v.load(Ordering::Relaxed).is_finite())
    }
}
