/// Sources and sinks which act on the whole volume of the domain.
///
/// For every voxel and substrate the solver queries the supply rate $S$, the uptake rate $U$ and
/// the target density $T$ and solves
/// \\begin{equation}
///     \frac{\partial\rho}{\partial t} = S(T-\rho) - U\rho
/// \\end{equation}
/// implicitly.
/// Voxels are identified by their `[x, y, z]` indices.
pub trait BulkFunctor: Send + Sync {
    /// Rate at which the substrate is supplied to the voxel
    fn supply_rate(&self, substrate: usize, voxel: [usize; 3]) -> f64;

    /// Rate at which the substrate is removed from the voxel
    fn uptake_rate(&self, substrate: usize, voxel: [usize; 3]) -> f64;

    /// Density which is approached by supply
    fn supply_target_density(&self, substrate: usize, voxel: [usize; 3]) -> f64;
}
