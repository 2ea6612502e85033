//! Implicit diffusion and decay by alternating sweeps along all active axes.
//!
//! Every sweep solves one tridiagonal system per line of voxels with the Thomas algorithm.
//! The coefficients only depend on the mesh, the time increment and the substrate parameters
//! and are thus computed once.
use serde::{Deserialize, Serialize};
use substrate_raza_concepts::ExecutionPolicy;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::density::DensityField;
use crate::grid::CartesianGrid;

/// Precomputed decomposition of the implicit diffusion-decay matrix along one axis.
///
/// Along an axis with $n$ voxels of width $\Delta x$ the backward euler discretization of
/// \\begin{equation}
///     \frac{\partial\rho}{\partial t} = D\Delta\rho - \lambda\rho
/// \\end{equation}
/// leads to a tridiagonal matrix with constant off-diagonal entries $-r$, $r=D\Delta t/\Delta x^2$
/// and diagonal entries $b_i = 1 + \Delta t\lambda/d + r n_i$ where $d$ is the dimension of the
/// mesh and $n_i$ the number of neighbors of voxel $i$ along the axis.
/// Since this matrix does not change between time steps, its Thomas decomposition is calculated
/// once and reused for every line and every step.
/// We store the inverse pivots $b'_i$, the multipliers $e_i$ of the forward elimination and the
/// negated off-diagonal $c=r$.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThomasCoefficients {
    n: usize,
    n_substrates: usize,
    inverse_pivots: Vec<f64>,
    multipliers: Vec<f64>,
    off_diagonal: Vec<f64>,
}

impl ThomasCoefficients {
    /// Computes the decomposition for a line of `n` voxels.
    ///
    /// `diffusion_coefficients` and `decay_rates` contain one entry per substrate.
    pub fn new(
        n: usize,
        spacing: f64,
        dt: f64,
        dims: usize,
        diffusion_coefficients: &[f64],
        decay_rates: &[f64],
    ) -> Self {
        debug_assert_eq!(diffusion_coefficients.len(), decay_rates.len());
        let n_substrates = diffusion_coefficients.len();
        let mut inverse_pivots = vec![0.0; n * n_substrates];
        let mut multipliers = vec![0.0; n * n_substrates];
        let mut off_diagonal = vec![0.0; n_substrates];

        let n_neighbors = |i: usize| -> f64 {
            match (n, i) {
                (1, _) => 0.0,
                (_, 0) => 1.0,
                (_, i) if i == n - 1 => 1.0,
                _ => 2.0,
            }
        };

        for s in 0..n_substrates {
            let r = diffusion_coefficients[s] * dt / (spacing * spacing);
            let decay = dt * decay_rates[s] / dims as f64;
            off_diagonal[s] = r;

            let mut pivot = 1.0 + decay + r * n_neighbors(0);
            inverse_pivots[s] = 1.0 / pivot;
            for i in 1..n {
                let e = r / pivot;
                pivot = 1.0 + decay + r * n_neighbors(i) - r * e;
                multipliers[i * n_substrates + s] = e;
                inverse_pivots[i * n_substrates + s] = 1.0 / pivot;
            }
        }

        Self {
            n,
            n_substrates,
            inverse_pivots,
            multipliers,
            off_diagonal,
        }
    }

    /// Number of voxels along the axis
    pub fn len(&self) -> usize {
        self.n
    }

    /// Inverse pivots $b'_i$ for voxel `i` and substrate `s`
    pub fn inverse_pivot(&self, i: usize, s: usize) -> f64 {
        self.inverse_pivots[i * self.n_substrates + s]
    }

    /// Forward elimination multiplier $e_i$ (zero for `i=0`)
    pub fn multiplier(&self, i: usize, s: usize) -> f64 {
        self.multipliers[i * self.n_substrates + s]
    }

    /// Negated off-diagonal entry $c$
    pub fn off_diagonal(&self, s: usize) -> f64 {
        self.off_diagonal[s]
    }

    /// Solves the system along one line of voxels in place.
    ///
    /// The line starts at the voxel with linear index `start` and advances by `stride` voxels.
    #[inline]
    pub fn solve_line(&self, density: &DensityField, start: usize, stride: usize) {
        let n = self.n;
        let ns = self.n_substrates;
        let voxel = |i: usize| start + i * stride;
        for s in 0..ns {
            let c = self.off_diagonal[s];

            // Forward sweep
            let mut previous = density.get(voxel(0), s);
            for i in 1..n {
                let value = density.get(voxel(i), s) + self.multipliers[i * ns + s] * previous;
                density.set(voxel(i), s, value);
                previous = value;
            }

            // Back substitution
            let mut next = previous * self.inverse_pivots[(n - 1) * ns + s];
            density.set(voxel(n - 1), s, next);
            for i in (0..n - 1).rev() {
                let value = (density.get(voxel(i), s) + c * next) * self.inverse_pivots[i * ns + s];
                density.set(voxel(i), s, value);
                next = value;
            }
        }
    }
}

/// Advances densities by one implicit diffusion-decay step using dimensional splitting.
///
/// All lines along the `x` axis are solved first, followed by the `y` and `z` axis.
/// Every axis is a separate [parallel_for](ExecutionPolicy::parallel_for) and thus fully
/// completed before the next one starts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiffusionIntegrator {
    axes: Vec<(usize, ThomasCoefficients)>,
    dt: f64,
    n_voxels: [usize; 3],
}

impl DiffusionIntegrator {
    /// Precomputes the coefficients for every active axis of the grid.
    pub fn new(
        grid: &CartesianGrid,
        dt: f64,
        diffusion_coefficients: &[f64],
        decay_rates: &[f64],
    ) -> Self {
        let n_voxels = grid.n_voxels();
        let shape = grid.voxel_shape();
        let axes = (0..grid.dims())
            .map(|axis| {
                (
                    axis,
                    ThomasCoefficients::new(
                        n_voxels[axis],
                        shape[axis],
                        dt,
                        grid.dims(),
                        diffusion_coefficients,
                        decay_rates,
                    ),
                )
            })
            .collect();
        Self { axes, dt, n_voxels }
    }

    /// Time increment for which the coefficients were calculated
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Number of voxels of the mesh for which the coefficients were calculated
    pub fn n_voxels(&self) -> [usize; 3] {
        self.n_voxels
    }

    /// Coefficients of the given axis if it is active
    pub fn coefficients(&self, axis: usize) -> Option<&ThomasCoefficients> {
        self.axes
            .iter()
            .find(|(a, _)| *a == axis)
            .map(|(_, coefficients)| coefficients)
    }

    /// Performs one step
    #[cfg_attr(feature = "tracing", instrument(skip_all))]
    pub fn solve<P>(&self, grid: &CartesianGrid, density: &DensityField, policy: &P)
    where
        P: ExecutionPolicy,
    {
        let [nx, ny, nz] = grid.n_voxels();
        for (axis, coefficients) in self.axes.iter() {
            match axis {
                0 => policy.parallel_for(ny * nz, |line| {
                    coefficients.solve_line(density, line * nx, 1)
                }),
                1 => policy.parallel_for(nx * nz, |line| {
                    let x = line % nx;
                    let z = line / nx;
                    coefficients.solve_line(density, x + nx * ny * z, nx)
                }),
                _ => policy.parallel_for(nx * ny, |line| {
                    coefficients.solve_line(density, line, nx * ny)
                }),
            }
        }
    }
}
