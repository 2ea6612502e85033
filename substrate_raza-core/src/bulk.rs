//! Bulk sources and sinks which act on every voxel independently.
use substrate_raza_concepts::{BulkFunctor, ExecutionPolicy};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::density::DensityField;
use crate::grid::CartesianGrid;

/// Applies a [BulkFunctor] to every voxel of the domain.
///
/// For supply rate $S$, uptake rate $U$ and target density $T$ one implicit step reads
/// \\begin{equation}
///     \rho \leftarrow \frac{\rho + \Delta t S T}{1 + \Delta t(U+S)}.
/// \\end{equation}
pub struct BulkSourceSink {
    functor: Box<dyn BulkFunctor>,
}

impl core::fmt::Debug for BulkSourceSink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BulkSourceSink").finish_non_exhaustive()
    }
}

impl BulkSourceSink {
    /// Wraps the functor
    pub fn new(functor: impl BulkFunctor + 'static) -> Self {
        Self {
            functor: Box::new(functor),
        }
    }

    /// Wraps an already boxed functor
    pub fn from_boxed(functor: Box<dyn BulkFunctor>) -> Self {
        Self { functor }
    }

    /// Access the functor
    pub fn functor(&self) -> &dyn BulkFunctor {
        self.functor.as_ref()
    }

    /// Updates all densities
    #[cfg_attr(feature = "tracing", instrument(skip_all))]
    pub fn apply<P>(&self, grid: &CartesianGrid, density: &DensityField, dt: f64, policy: &P)
    where
        P: ExecutionPolicy,
    {
        let n_substrates = density.n_substrates();
        policy.parallel_for(grid.voxel_count(), |v| {
            let voxel = grid.voxel_indices(v);
            for s in 0..n_substrates {
                let supply = self.functor.supply_rate(s, voxel);
                let uptake = self.functor.uptake_rate(s, voxel);
                let target = self.functor.supply_target_density(s, voxel);
                let value = (density.get(v, s) + dt * supply * target)
                    / (1.0 + dt * (uptake + supply));
                density.set(v, s, value);
            }
        });
    }
}
