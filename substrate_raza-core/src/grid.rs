//! Cartesian mesh of cuboid voxels.
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use substrate_raza_concepts::BoundaryError;

/// Immutable cartesian mesh which discretizes the simulation domain into cuboid voxels.
///
/// Meshes of dimension 1 and 2 are represented by setting the number of voxels along all
/// inactive axes to one.
/// Voxels are enumerated with the `x` index running fastest
/// ```
/// # use substrate_raza_core::grid::CartesianGrid;
/// let grid = CartesianGrid::from_bounding_box([0.0; 3], [100.0, 60.0, 20.0], [20.0; 3], 3)?;
/// assert_eq!(grid.n_voxels(), [5, 3, 1]);
/// assert_eq!(grid.voxel_count(), 15);
/// assert_eq!(grid.voxel_of(&[45.0, 21.0, 3.0]), [2, 1, 0]);
/// assert_eq!(grid.linear_index(2, 1, 0), 7);
/// assert_eq!(grid.voxel_volume(), 8000.0);
/// # Ok::<(), substrate_raza_concepts::BoundaryError>(())
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartesianGrid {
    dims: usize,
    min: Vector3<f64>,
    max: Vector3<f64>,
    dx: Vector3<f64>,
    n_voxels: Vector3<usize>,
}

impl CartesianGrid {
    fn check_min_max(min: &[f64; 3], max: &[f64; 3], dims: usize) -> Result<(), BoundaryError> {
        for i in 0..dims {
            if min[i] >= max[i] {
                return Err(BoundaryError(format!(
                    "Min {:?} must be smaller than Max {:?} for mesh boundaries!",
                    min, max
                )));
            }
        }
        Ok(())
    }

    /// Builds a new [CartesianGrid] from its bounding box and the shape of a single voxel.
    ///
    /// The number of voxels along each active axis is given by
    /// $(x_\text{max}-x_\text{min})/\Delta x$ rounded to the nearest integer.
    /// The upper boundary is then moved to $x_\text{min} + n\Delta x$ such that the voxels
    /// exactly tile the bounding box.
    /// Inactive axes (`axis >= dims`) always contain exactly one voxel whose size is given by
    /// `voxel_shape` such that the voxel volume stays consistent with the legacy
    /// configuration format.
    pub fn from_bounding_box(
        min: impl Into<[f64; 3]>,
        max: impl Into<[f64; 3]>,
        voxel_shape: impl Into<[f64; 3]>,
        dims: usize,
    ) -> Result<Self, BoundaryError> {
        use num::ToPrimitive;
        let min: [f64; 3] = min.into();
        let max: [f64; 3] = max.into();
        let voxel_shape: [f64; 3] = voxel_shape.into();
        if !(1..=3).contains(&dims) {
            return Err(BoundaryError(format!(
                "Mesh dimension must be one of 1, 2 or 3 but {} was given",
                dims
            )));
        }
        Self::check_min_max(&min, &max, dims)?;
        if voxel_shape.iter().any(|dx| !(*dx > 0.0) || !dx.is_finite()) {
            return Err(BoundaryError(format!(
                "Voxel shape {:?} must be finite and strictly positive",
                voxel_shape
            )));
        }

        let mut n_voxels = [1usize; 3];
        let mut max_adjusted = max;
        for i in 0..3 {
            if i < dims {
                let n = ((max[i] - min[i]) / voxel_shape[i]).round();
                n_voxels[i] = n.to_usize().filter(|n| *n > 0).ok_or(BoundaryError(
                    substrate_raza_concepts::format_error_message!(
                        "conversion error during mesh setup",
                        format!(
                            "Cannot fit voxels of size {} between {} and {}",
                            voxel_shape[i], min[i], max[i]
                        )
                    ),
                ))?;
                max_adjusted[i] = min[i] + n_voxels[i] as f64 * voxel_shape[i];
            } else {
                max_adjusted[i] = min[i] + voxel_shape[i];
            }
        }
        Ok(Self {
            dims,
            min: min.into(),
            max: max_adjusted.into(),
            dx: voxel_shape.into(),
            n_voxels: n_voxels.into(),
        })
    }

    /// Spatial dimension of the mesh
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Lower corner of the bounding box
    pub fn get_min(&self) -> [f64; 3] {
        self.min.into()
    }

    /// Upper corner of the bounding box
    pub fn get_max(&self) -> [f64; 3] {
        self.max.into()
    }

    /// Size of one voxel along every axis
    pub fn voxel_shape(&self) -> [f64; 3] {
        self.dx.into()
    }

    /// Number of voxels along every axis
    pub fn n_voxels(&self) -> [usize; 3] {
        self.n_voxels.into()
    }

    /// Total number of voxels
    pub fn voxel_count(&self) -> usize {
        self.n_voxels.iter().product()
    }

    /// Volume of a single voxel. Identical for all voxels.
    pub fn voxel_volume(&self) -> f64 {
        self.dx.iter().product()
    }

    /// Maps a position onto the index of the voxel which contains it.
    ///
    /// Only the first [dims](Self::dims) entries of the position are used.
    /// Positions outside of the mesh are a contract violation of the caller and are only
    /// detected in debug builds.
    #[inline]
    pub fn voxel_of(&self, position: &[f64]) -> [usize; 3] {
        debug_assert!(position.len() >= self.dims);
        let mut index = [0usize; 3];
        for i in 0..self.dims {
            let n = ((position[i] - self.min[i]) / self.dx[i]).floor();
            debug_assert!(
                n >= 0.0 && (n as usize) < self.n_voxels[i],
                "position {:?} lies outside of the mesh [{:?}, {:?}]",
                position,
                self.min,
                self.max
            );
            index[i] = n as usize;
        }
        index
    }

    /// Similar to [voxel_of](Self::voxel_of) but returns the linear voxel index.
    #[inline]
    pub fn linear_voxel_of(&self, position: &[f64]) -> usize {
        let [x, y, z] = self.voxel_of(position);
        self.linear_index(x, y, z)
    }

    /// Checked variant of [voxel_of](Self::voxel_of).
    pub fn try_voxel_of(&self, position: &[f64]) -> Result<[usize; 3], BoundaryError> {
        if position.len() < self.dims
            || (0..self.dims).any(|i| position[i] < self.min[i] || position[i] >= self.max[i])
        {
            return Err(BoundaryError(format!(
                "position {:?} is not contained in mesh with boundaries {:?} {:?}",
                position,
                self.get_min(),
                self.get_max()
            )));
        }
        Ok(self.voxel_of(position))
    }

    /// Linear index of the voxel with indices `[x, y, z]`.
    #[inline]
    pub fn linear_index(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < self.n_voxels[0] && y < self.n_voxels[1] && z < self.n_voxels[2]);
        x + self.n_voxels[0] * (y + self.n_voxels[1] * z)
    }

    /// Inverse of [linear_index](Self::linear_index)
    #[inline]
    pub fn voxel_indices(&self, linear_index: usize) -> [usize; 3] {
        let nx = self.n_voxels[0];
        let ny = self.n_voxels[1];
        [linear_index % nx, (linear_index / nx) % ny, linear_index / (nx * ny)]
    }

    /// Center of the voxel with given indices
    pub fn voxel_center(&self, voxel: [usize; 3]) -> [f64; 3] {
        let mut center = [0.0; 3];
        for i in 0..3 {
            center[i] = self.min[i] + (voxel[i] as f64 + 0.5) * self.dx[i];
        }
        center
    }

    /// Iterates over all voxel indices with the `x` index running fastest.
    pub fn all_voxel_indices(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        use itertools::iproduct;
        iproduct!(
            0..self.n_voxels[2],
            0..self.n_voxels[1],
            0..self.n_voxels[0]
        )
        .map(|(z, y, x)| [x, y, z])
    }
}

#[cfg(test)]
mod test_grid {
    use super::*;

    #[test]
    fn shape_from_bounding_box() {
        let grid =
            CartesianGrid::from_bounding_box([-500.0; 3], [500.0; 3], [20.0; 3], 3).unwrap();
        assert_eq!(grid.n_voxels(), [50; 3]);
        assert_eq!(grid.voxel_count(), 50usize.pow(3));
        assert_eq!(grid.voxel_volume(), 8000.0);
    }

    #[test]
    fn inactive_axes_have_one_voxel() {
        let grid = CartesianGrid::from_bounding_box([0.0; 3], [80.0, 0.0, 0.0], [20.0; 3], 1)
            .unwrap();
        assert_eq!(grid.n_voxels(), [4, 1, 1]);
        assert_eq!(grid.voxel_volume(), 8000.0);
        assert_eq!(grid.voxel_of(&[79.9]), [3, 0, 0]);
    }

    #[test]
    fn non_divisible_bounds_are_adjusted() {
        let grid = CartesianGrid::from_bounding_box([0.0; 3], [100.0, 0.0, 0.0], [30.0; 3], 1)
            .unwrap();
        assert_eq!(grid.n_voxels(), [3, 1, 1]);
        assert_eq!(grid.get_max(), [90.0, 30.0, 30.0]);
        assert_eq!(grid.try_voxel_of(&[89.0]).unwrap(), [2, 0, 0]);
        assert!(grid.try_voxel_of(&[95.0]).is_err());

        let grid = CartesianGrid::from_bounding_box([0.0; 3], [100.0, 0.0, 0.0], [40.0; 3], 1)
            .unwrap();
        assert_eq!(grid.n_voxels(), [3, 1, 1]);
        assert_eq!(grid.get_max()[0], 120.0);
        assert_eq!(grid.try_voxel_of(&[110.0]).unwrap(), [2, 0, 0]);
    }

    #[test]
    fn reject_invalid_bounds() {
        assert!(CartesianGrid::from_bounding_box([0.0; 3], [0.0; 3], [1.0; 3], 2).is_err());
        assert!(CartesianGrid::from_bounding_box([0.0; 3], [1.0; 3], [0.0; 3], 3).is_err());
        assert!(CartesianGrid::from_bounding_box([0.0; 3], [1.0; 3], [1.0; 3], 4).is_err());
    }

    #[test]
    fn linear_index_roundtrip() {
        let grid =
            CartesianGrid::from_bounding_box([0.0; 3], [40.0, 60.0, 80.0], [20.0; 3], 3).unwrap();
        for (n, voxel) in grid.all_voxel_indices().enumerate() {
            assert_eq!(grid.linear_index(voxel[0], voxel[1], voxel[2]), n);
            assert_eq!(grid.voxel_indices(n), voxel);
            assert_eq!(grid.voxel_of(&grid.voxel_center(voxel)), voxel);
        }
    }

    #[test]
    fn checked_voxel_lookup() {
        let grid = CartesianGrid::from_bounding_box([0.0; 3], [40.0; 3], [20.0; 3], 2).unwrap();
        assert_eq!(grid.try_voxel_of(&[39.0, 0.0]).unwrap(), [1, 0, 0]);
        assert!(grid.try_voxel_of(&[40.0, 0.0]).is_err());
        assert!(grid.try_voxel_of(&[-1.0, 3.0]).is_err());
        assert!(grid.try_voxel_of(&[1.0]).is_err());
    }
}
