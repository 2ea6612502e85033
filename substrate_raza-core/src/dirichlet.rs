//! Fixed densities on the faces of the domain and on individual voxels.
use serde::{Deserialize, Serialize};
use substrate_raza_concepts::{ExecutionPolicy, IndexError};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::density::DensityField;
use crate::grid::CartesianGrid;

/// Spatial axis of the mesh
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    #[allow(missing_docs)]
    X,
    #[allow(missing_docs)]
    Y,
    #[allow(missing_docs)]
    Z,
}

impl Axis {
    /// All axes in the order in which they are processed
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Position of the axis in index arrays
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// One of the two faces perpendicular to an [Axis]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Face {
    /// Voxel layer with index `0`
    Min,
    /// Voxel layer with the largest index
    Max,
}

impl Face {
    fn index(self) -> usize {
        match self {
            Face::Min => 0,
            Face::Max => 1,
        }
    }
}

/// Per-substrate values together with their enabled flags
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinnedValues {
    /// Value to which the density is fixed
    pub values: Vec<f64>,
    /// Only substrates with this flag set are overwritten
    pub enabled: Vec<bool>,
}

impl PinnedValues {
    fn disabled(n_substrates: usize) -> Self {
        Self {
            values: vec![0.0; n_substrates],
            enabled: vec![false; n_substrates],
        }
    }

    fn any_enabled(&self) -> bool {
        self.enabled.iter().any(|e| *e)
    }

    #[inline]
    fn write(&self, density: &DensityField, voxel: usize) {
        for (s, (value, enabled)) in self.values.iter().zip(self.enabled.iter()).enumerate() {
            if *enabled {
                density.set(voxel, s, *value);
            }
        }
    }
}

/// Fixed-value constraints on faces of the domain and on individual voxels.
///
/// Faces are enforced in the order `x`, `y`, `z` and for every axis first the [Face::Min] and
/// then the [Face::Max] layer.
/// Voxels shared by multiple faces thus take the value of the last axis.
/// Pinned interior voxels are written last and override all faces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirichletConditions {
    n_substrates: usize,
    faces: [[PinnedValues; 2]; 3],
    interior: Vec<(usize, PinnedValues)>,
}

impl DirichletConditions {
    /// No substrate is constrained anywhere
    pub fn new(n_substrates: usize) -> Self {
        let face = || [PinnedValues::disabled(n_substrates), PinnedValues::disabled(n_substrates)];
        Self {
            n_substrates,
            faces: [face(), face(), face()],
            interior: Vec::new(),
        }
    }

    fn check_substrate(&self, substrate: usize) -> Result<(), IndexError> {
        if substrate >= self.n_substrates {
            return Err(IndexError(format!(
                "substrate index {} is out of range for {} substrates",
                substrate, self.n_substrates
            )));
        }
        Ok(())
    }

    /// Sets the value of one substrate on one face.
    pub fn set_boundary(
        &mut self,
        axis: Axis,
        face: Face,
        substrate: usize,
        value: f64,
        enabled: bool,
    ) -> Result<(), IndexError> {
        self.check_substrate(substrate)?;
        let pinned = &mut self.faces[axis.index()][face.index()];
        pinned.values[substrate] = value;
        pinned.enabled[substrate] = enabled;
        Ok(())
    }

    /// Configured values of a face
    pub fn boundary(&self, axis: Axis, face: Face) -> &PinnedValues {
        &self.faces[axis.index()][face.index()]
    }

    /// Pins one substrate in a single voxel to a fixed value.
    ///
    /// Setting the same voxel multiple times updates the existing entry.
    pub fn set_interior(
        &mut self,
        grid: &CartesianGrid,
        voxel: [usize; 3],
        substrate: usize,
        value: f64,
    ) -> Result<(), IndexError> {
        self.check_substrate(substrate)?;
        let n_voxels = grid.n_voxels();
        if (0..3).any(|i| voxel[i] >= n_voxels[i]) {
            return Err(IndexError(format!(
                "voxel {:?} lies outside of the mesh with {:?} voxels",
                voxel, n_voxels
            )));
        }
        let linear = grid.linear_index(voxel[0], voxel[1], voxel[2]);
        let n_substrates = self.n_substrates;
        let pinned = match self.interior.iter().position(|(v, _)| *v == linear) {
            Some(n) => &mut self.interior[n].1,
            None => {
                self.interior
                    .push((linear, PinnedValues::disabled(n_substrates)));
                let last = self.interior.len() - 1;
                &mut self.interior[last].1
            }
        };
        pinned.values[substrate] = value;
        pinned.enabled[substrate] = true;
        Ok(())
    }

    /// Releases a previously pinned substrate of an interior voxel
    pub fn unset_interior(&mut self, grid: &CartesianGrid, voxel: [usize; 3], substrate: usize) {
        let linear = grid.linear_index(voxel[0], voxel[1], voxel[2]);
        if let Some((_, pinned)) = self.interior.iter_mut().find(|(v, _)| *v == linear) {
            if let Some(enabled) = pinned.enabled.get_mut(substrate) {
                *enabled = false;
            }
        }
        self.interior.retain(|(_, pinned)| pinned.any_enabled());
    }

    /// Number of pinned interior voxels
    pub fn n_interior(&self) -> usize {
        self.interior.len()
    }

    /// `true` if no value would be overwritten
    pub fn is_empty(&self) -> bool {
        self.interior.is_empty() && self.faces.iter().flatten().all(|p| !p.any_enabled())
    }

    /// Overwrites all constrained densities
    #[cfg_attr(feature = "tracing", instrument(skip_all))]
    pub fn apply<P>(&self, grid: &CartesianGrid, density: &DensityField, policy: &P)
    where
        P: ExecutionPolicy,
    {
        let n = grid.n_voxels();
        for axis in 0..grid.dims() {
            let (a, b) = match axis {
                0 => (1, 2),
                1 => (0, 2),
                _ => (0, 1),
            };
            for (face, layer) in [Face::Min, Face::Max].into_iter().zip([0, n[axis] - 1]) {
                let pinned = &self.faces[axis][face.index()];
                if !pinned.any_enabled() {
                    continue;
                }
                policy.parallel_for(n[a] * n[b], |i| {
                    let mut voxel = [0; 3];
                    voxel[axis] = layer;
                    voxel[a] = i % n[a];
                    voxel[b] = i / n[a];
                    pinned.write(density, grid.linear_index(voxel[0], voxel[1], voxel[2]));
                });
            }
        }

        policy.parallel_for(self.interior.len(), |i| {
            let (voxel, pinned) = &self.interior[i];
            pinned.write(density, *voxel);
        });
    }
}
