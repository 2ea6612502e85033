//! Flat storage of the substrate-related properties of agents.
use core::sync::atomic::Ordering;

use serde::{Deserialize, Serialize};
use substrate_raza_concepts::{AgentData, AtomicF64, IndexError};

/// Substrate-related properties of a single agent.
///
/// Used to insert agents into and retrieve them from an [AgentSubstrateStore].
/// ```
/// # use substrate_raza_building_blocks::prelude::*;
/// let agent = AgentSubstrateState::new(vec![10.0, 20.0], 2494.0, 2)
///     .with_secretion(1, 0.5, 10.0)
///     .with_uptake(0, 1.0);
/// assert_eq!(agent.secretion_rates, vec![0.0, 0.5]);
/// assert_eq!(agent.saturation_densities, vec![0.0, 10.0]);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSubstrateState {
    /// Position inside of the domain
    pub position: Vec<f64>,
    /// Volume of the agent
    pub volume: f64,
    /// Secretion rate of every substrate
    pub secretion_rates: Vec<f64>,
    /// Uptake rate of every substrate
    pub uptake_rates: Vec<f64>,
    /// Density at which secretion saturates
    pub saturation_densities: Vec<f64>,
    /// Net export rates independent of the surrounding density
    pub net_export_rates: Vec<f64>,
    /// Amount of substrate taken up so far
    pub internalized_substrates: Vec<f64>,
    /// Fraction of internalized substrates released upon death
    pub fraction_released_at_death: Vec<f64>,
    /// Fraction of internalized substrates passed on when being ingested
    pub fraction_transferred_when_ingested: Vec<f64>,
}

impl AgentSubstrateState {
    /// Agent which neither secretes nor takes up any substrate.
    ///
    /// Nothing is released upon death while everything is transferred when being ingested.
    pub fn new(position: Vec<f64>, volume: f64, n_substrates: usize) -> Self {
        Self {
            position,
            volume,
            secretion_rates: vec![0.0; n_substrates],
            uptake_rates: vec![0.0; n_substrates],
            saturation_densities: vec![0.0; n_substrates],
            net_export_rates: vec![0.0; n_substrates],
            internalized_substrates: vec![0.0; n_substrates],
            fraction_released_at_death: vec![0.0; n_substrates],
            fraction_transferred_when_ingested: vec![1.0; n_substrates],
        }
    }

    /// Sets secretion rate and saturation density of one substrate
    pub fn with_secretion(mut self, substrate: usize, rate: f64, saturation_density: f64) -> Self {
        self.secretion_rates[substrate] = rate;
        self.saturation_densities[substrate] = saturation_density;
        self
    }

    /// Sets the uptake rate of one substrate
    pub fn with_uptake(mut self, substrate: usize, rate: f64) -> Self {
        self.uptake_rates[substrate] = rate;
        self
    }

    /// Sets the net export rate of one substrate
    pub fn with_net_export(mut self, substrate: usize, rate: f64) -> Self {
        self.net_export_rates[substrate] = rate;
        self
    }

    /// Sets the fraction which is released upon death
    pub fn with_fraction_released_at_death(mut self, substrate: usize, fraction: f64) -> Self {
        self.fraction_released_at_death[substrate] = fraction;
        self
    }
}

/// Moves the chunk at `index` to the end, removes and returns it
fn swap_remove_chunk<T>(values: &mut Vec<T>, index: usize, width: usize) -> Vec<T> {
    if width == 0 {
        return Vec::new();
    }
    let last = values.len() / width - 1;
    if index != last {
        for k in 0..width {
            values.swap(index * width + k, last * width + k);
        }
    }
    values.split_off(last * width)
}

/// Stores the substrate-related properties of all agents in flat vectors.
///
/// Agents are identified by their index.
/// Removing an agent moves the last agent into the freed index similar to
/// [Vec::swap_remove].
/// Any addition or removal of agents changes the indices which are used by the solver and thus
/// requires a new reduction step.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentSubstrateStore {
    dims: usize,
    n_substrates: usize,
    positions: Vec<f64>,
    volumes: Vec<f64>,
    secretion_rates: Vec<f64>,
    uptake_rates: Vec<f64>,
    saturation_densities: Vec<f64>,
    net_export_rates: Vec<f64>,
    internalized_substrates: Vec<AtomicF64>,
    fraction_released_at_death: Vec<f64>,
    fraction_transferred_when_ingested: Vec<f64>,
}

impl AgentSubstrateStore {
    /// Empty store for agents of the given spatial dimension
    pub fn new(dims: usize, n_substrates: usize) -> Self {
        Self {
            dims,
            n_substrates,
            positions: Vec::new(),
            volumes: Vec::new(),
            secretion_rates: Vec::new(),
            uptake_rates: Vec::new(),
            saturation_densities: Vec::new(),
            net_export_rates: Vec::new(),
            internalized_substrates: Vec::new(),
            fraction_released_at_death: Vec::new(),
            fraction_transferred_when_ingested: Vec::new(),
        }
    }

    /// Number of stored agents
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// `true` if no agents are stored
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    fn check_agent(&self, agent: usize) -> Result<(), IndexError> {
        if agent >= self.len() {
            return Err(IndexError(format!(
                "agent index {} is out of range for {} agents",
                agent,
                self.len()
            )));
        }
        Ok(())
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

    fn check_lengths(&self, state: &AgentSubstrateState) -> Result<(), IndexError> {
        if state.position.len() != self.dims {
            return Err(IndexError(format!(
                "position {:?} does not have {} components",
                state.position, self.dims
            )));
        }
        let per_substrate = [
            ("secretion rates", state.secretion_rates.len()),
            ("uptake rates", state.uptake_rates.len()),
            ("saturation densities", state.saturation_densities.len()),
            ("net export rates", state.net_export_rates.len()),
            ("internalized substrates", state.internalized_substrates.len()),
            ("released fractions", state.fraction_released_at_death.len()),
            (
                "transferred fractions",
                state.fraction_transferred_when_ingested.len(),
            ),
        ];
        for (name, len) in per_substrate {
            if len != self.n_substrates {
                return Err(IndexError(format!(
                    "{} of agent have length {} but {} substrates are simulated",
                    name, len, self.n_substrates
                )));
            }
        }
        Ok(())
    }

    /// Inserts a new agent and returns its index
    pub fn add_agent(&mut self, state: AgentSubstrateState) -> Result<usize, IndexError> {
        self.check_lengths(&state)?;
        self.positions.extend(state.position);
        self.volumes.push(state.volume);
        self.secretion_rates.extend(state.secretion_rates);
        self.uptake_rates.extend(state.uptake_rates);
        self.saturation_densities.extend(state.saturation_densities);
        self.net_export_rates.extend(state.net_export_rates);
        self.internalized_substrates.extend(
            state
                .internalized_substrates
                .into_iter()
                .map(AtomicF64::new),
        );
        self.fraction_released_at_death
            .extend(state.fraction_released_at_death);
        self.fraction_transferred_when_ingested
            .extend(state.fraction_transferred_when_ingested);
        Ok(self.len() - 1)
    }

    /// Removes an agent and moves the last agent into its index
    pub fn remove_agent(&mut self, agent: usize) -> Result<AgentSubstrateState, IndexError> {
        self.check_agent(agent)?;
        let ns = self.n_substrates;
        let position = swap_remove_chunk(&mut self.positions, agent, self.dims);
        let volume = self.volumes.swap_remove(agent);
        Ok(AgentSubstrateState {
            position,
            volume,
            secretion_rates: swap_remove_chunk(&mut self.secretion_rates, agent, ns),
            uptake_rates: swap_remove_chunk(&mut self.uptake_rates, agent, ns),
            saturation_densities: swap_remove_chunk(&mut self.saturation_densities, agent, ns),
            net_export_rates: swap_remove_chunk(&mut self.net_export_rates, agent, ns),
            internalized_substrates: swap_remove_chunk(
                &mut self.internalized_substrates,
                agent,
                ns,
            )
            .into_iter()
            .map(AtomicF64::into_inner)
            .collect(),
            fraction_released_at_death: swap_remove_chunk(
                &mut self.fraction_released_at_death,
                agent,
                ns,
            ),
            fraction_transferred_when_ingested: swap_remove_chunk(
                &mut self.fraction_transferred_when_ingested,
                agent,
                ns,
            ),
        })
    }

    /// Copies all properties of one agent
    pub fn get_agent(&self, agent: usize) -> Option<AgentSubstrateState> {
        self.check_agent(agent).ok()?;
        Some(AgentSubstrateState {
            position: self.position(agent).to_vec(),
            volume: self.volume(agent),
            secretion_rates: self.secretion_rates(agent).to_vec(),
            uptake_rates: self.uptake_rates(agent).to_vec(),
            saturation_densities: self.saturation_densities(agent).to_vec(),
            net_export_rates: self.net_export_rates(agent).to_vec(),
            internalized_substrates: self
                .internalized_substrates(agent)
                .iter()
                .map(|v| v.load(Ordering::Relaxed))
                .collect(),
            fraction_released_at_death: self.fraction_released_at_death(agent).to_vec(),
            fraction_transferred_when_ingested: self
                .fraction_transferred_when_ingested(agent)
                .to_vec(),
        })
    }

    /// Moves an agent
    pub fn set_position(&mut self, agent: usize, position: &[f64]) -> Result<(), IndexError> {
        self.check_agent(agent)?;
        if position.len() != self.dims {
            return Err(IndexError(format!(
                "position {:?} does not have {} components",
                position, self.dims
            )));
        }
        self.positions[agent * self.dims..(agent + 1) * self.dims].copy_from_slice(position);
        Ok(())
    }

    /// Changes the volume of an agent
    pub fn set_volume(&mut self, agent: usize, volume: f64) -> Result<(), IndexError> {
        self.check_agent(agent)?;
        self.volumes[agent] = volume;
        Ok(())
    }

    fn entry(&self, agent: usize, substrate: usize) -> Result<usize, IndexError> {
        self.check_agent(agent)?;
        self.check_substrate(substrate)?;
        Ok(agent * self.n_substrates + substrate)
    }

    /// Changes secretion rate and saturation density of one substrate
    pub fn set_secretion(
        &mut self,
        agent: usize,
        substrate: usize,
        rate: f64,
        saturation_density: f64,
    ) -> Result<(), IndexError> {
        let i = self.entry(agent, substrate)?;
        self.secretion_rates[i] = rate;
        self.saturation_densities[i] = saturation_density;
        Ok(())
    }

    /// Changes the uptake rate of one substrate
    pub fn set_uptake_rate(
        &mut self,
        agent: usize,
        substrate: usize,
        rate: f64,
    ) -> Result<(), IndexError> {
        let i = self.entry(agent, substrate)?;
        self.uptake_rates[i] = rate;
        Ok(())
    }

    /// Changes the net export rate of one substrate
    pub fn set_net_export_rate(
        &mut self,
        agent: usize,
        substrate: usize,
        rate: f64,
    ) -> Result<(), IndexError> {
        let i = self.entry(agent, substrate)?;
        self.net_export_rates[i] = rate;
        Ok(())
    }

    /// Amount of one substrate taken up by an agent
    pub fn internalized(&self, agent: usize, substrate: usize) -> Result<f64, IndexError> {
        let i = self.entry(agent, substrate)?;
        Ok(self.internalized_substrates[i].load(Ordering::Relaxed))
    }

    /// Sum over all agents of one internalized substrate
    pub fn total_internalized(&self, substrate: usize) -> f64 {
        self.internalized_substrates
            .iter()
            .skip(substrate)
            .step_by(self.n_substrates.max(1))
            .map(|v| v.load(Ordering::Relaxed))
            .sum()
    }
}

impl AgentData for AgentSubstrateStore {
    fn n_agents(&self) -> usize {
        self.len()
    }

    fn position(&self, agent: usize) -> &[f64] {
        &self.positions[agent * self.dims..(agent + 1) * self.dims]
    }

    fn volume(&self, agent: usize) -> f64 {
        self.volumes[agent]
    }

    fn secretion_rates(&self, agent: usize) -> &[f64] {
        let ns = self.n_substrates;
        &self.secretion_rates[agent * ns..(agent + 1) * ns]
    }

    fn uptake_rates(&self, agent: usize) -> &[f64] {
        let ns = self.n_substrates;
        &self.uptake_rates[agent * ns..(agent + 1) * ns]
    }

    fn saturation_densities(&self, agent: usize) -> &[f64] {
        let ns = self.n_substrates;
        &self.saturation_densities[agent * ns..(agent + 1) * ns]
    }

    fn net_export_rates(&self, agent: usize) -> &[f64] {
        let ns = self.n_substrates;
        &self.net_export_rates[agent * ns..(agent + 1) * ns]
    }

    fn internalized_substrates(&self, agent: usize) -> &[AtomicF64] {
        let ns = self.n_substrates;
        &self.internalized_substrates[agent * ns..(agent + 1) * ns]
    }

    fn fraction_released_at_death(&self, agent: usize) -> &[f64] {
        let ns = self.n_substrates;
        &self.fraction_released_at_death[agent * ns..(agent + 1) * ns]
    }

    fn fraction_transferred_when_ingested(&self, agent: usize) -> &[f64] {
        let ns = self.n_substrates;
        &self.fraction_transferred_when_ingested[agent * ns..(agent + 1) * ns]
    }
}

#[cfg(test)]
mod test_agent_store {
    use super::*;

    fn store() -> AgentSubstrateStore {
        let mut store = AgentSubstrateStore::new(2, 2);
        for n in 0..4 {
            let state = AgentSubstrateState::new(vec![n as f64, 0.0], 10.0 * n as f64, 2)
                .with_secretion(0, n as f64, 1.0)
                .with_uptake(1, 0.5);
            assert_eq!(store.add_agent(state).unwrap(), n);
        }
        store
    }

    #[test]
    fn flat_access() {
        let store = store();
        assert_eq!(store.n_agents(), 4);
        assert_eq!(store.position(2), &[2.0, 0.0]);
        assert_eq!(store.volume(3), 30.0);
        assert_eq!(store.secretion_rates(3), &[3.0, 0.0]);
        assert_eq!(store.uptake_rates(1), &[0.0, 0.5]);
        assert_eq!(store.fraction_transferred_when_ingested(0), &[1.0, 1.0]);
    }

    #[test]
    fn remove_moves_last_agent() {
        let mut store = store();
        store.internalized_substrates(1)[0].store(7.0, Ordering::Relaxed);
        let removed = store.remove_agent(1).unwrap();
        assert_eq!(removed.position, vec![1.0, 0.0]);
        assert_eq!(removed.internalized_substrates, vec![7.0, 0.0]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.get_agent(1).unwrap().position, vec![3.0, 0.0]);
        assert_eq!(store.secretion_rates(1), &[3.0, 0.0]);

        let last = store.remove_agent(2).unwrap();
        assert_eq!(last.volume, 20.0);
        assert_eq!(store.len(), 2);
        assert!(store.remove_agent(2).is_err());
        assert!(store.get_agent(2).is_none());
    }

    #[test]
    fn invalid_lengths_are_rejected() {
        let mut store = AgentSubstrateStore::new(3, 2);
        assert!(store
            .add_agent(AgentSubstrateState::new(vec![0.0; 2], 1.0, 2))
            .is_err());
        assert!(store
            .add_agent(AgentSubstrateState::new(vec![0.0; 3], 1.0, 3))
            .is_err());
        assert!(store.is_empty());
        store
            .add_agent(AgentSubstrateState::new(vec![0.0; 3], 1.0, 2))
            .unwrap();
        assert!(store.set_position(0, &[1.0]).is_err());
        assert!(store.set_uptake_rate(0, 2, 1.0).is_err());
        assert!(store.set_volume(1, 1.0).is_err());
    }

    #[test]
    fn setters() {
        let mut store = store();
        store.set_position(0, &[5.0, 6.0]).unwrap();
        store.set_volume(0, 2.0).unwrap();
        store.set_secretion(0, 1, 0.3, 4.0).unwrap();
        store.set_net_export_rate(0, 0, -1.0).unwrap();
        let agent = store.get_agent(0).unwrap();
        assert_eq!(agent.position, vec![5.0, 6.0]);
        assert_eq!(agent.volume, 2.0);
        assert_eq!(agent.secretion_rates, vec![0.0, 0.3]);
        assert_eq!(agent.saturation_densities, vec![1.0, 4.0]);
        assert_eq!(agent.net_export_rates, vec![-1.0, 0.0]);
    }

    #[test]
    fn internalized_totals() {
        let store = store();
        for agent in 0..4 {
            store.internalized_substrates(agent)[1].store(agent as f64, Ordering::Relaxed);
        }
        assert_eq!(store.total_internalized(1), 6.0);
        assert_eq!(store.total_internalized(0), 0.0);
        assert_eq!(store.internalized(3, 1).unwrap(), 3.0);
        assert!(store.internalized(4, 1).is_err());
    }

    #[test]
    fn store_can_be_saved() {
        let store = store();
        store.internalized_substrates(2)[0].store(1.5, Ordering::Relaxed);
        let json = serde_json::to_string(&store).unwrap();
        let loaded: AgentSubstrateStore = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded.get_agent(2), store.get_agent(2));
        assert_eq!(loaded.internalized(2, 0).unwrap(), 1.5);
    }
}
