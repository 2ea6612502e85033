use crate::AtomicF64;

/// Read access to the substrate-related properties of a collection of agents.
///
/// The agents themselves are owned by an external container.
/// The solver only ever needs the position, volume and per-substrate transport parameters of each
/// agent which are exposed as flat slices indexed by the agent index
/// $0\leq a<N_\text{agents}$.
/// All per-substrate slices must have a length equal to the number of substrates of the
/// microenvironment and all positions must have a length equal to its spatial dimension.
/// These contracts are checked by debug assertions only.
///
/// Internalized substrates are stored atomically since every agent updates its own entries from
/// within parallel loops.
pub trait AgentData: Sync {
    /// Total number of agents currently stored
    fn n_agents(&self) -> usize;

    /// Position of the agent
    fn position(&self, agent: usize) -> &[f64];

    /// Volume of the agent
    fn volume(&self, agent: usize) -> f64;

    /// Secretion rates $s_i$ for every substrate
    fn secretion_rates(&self, agent: usize) -> &[f64];

    /// Uptake rates $u_i$ for every substrate
    fn uptake_rates(&self, agent: usize) -> &[f64];

    /// Densities $\rho^*_i$ towards which the secretion saturates
    fn saturation_densities(&self, agent: usize) -> &[f64];

    /// Net export rates $e_i$ which are independent of the surrounding density
    fn net_export_rates(&self, agent: usize) -> &[f64];

    /// Total amount of substrate which was taken up by this agent
    fn internalized_substrates(&self, agent: usize) -> &[AtomicF64];

    /// Fraction of internalized substrates which is released into the environment upon death
    fn fraction_released_at_death(&self, agent: usize) -> &[f64];

    /// Fraction of internalized substrates which is passed on when being ingested by another
    /// agent
    fn fraction_transferred_when_ingested(&self, agent: usize) -> &[f64];
}
