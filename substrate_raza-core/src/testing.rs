//! Minimal agent container used by the unit tests of this crate.
use substrate_raza_concepts::{AgentData, AtomicF64};

#[derive(Clone, Debug, Default)]
pub(crate) struct TestAgents {
    pub positions: Vec<Vec<f64>>,
    pub volumes: Vec<f64>,
    pub secretion: Vec<Vec<f64>>,
    pub uptake: Vec<Vec<f64>>,
    pub saturation: Vec<Vec<f64>>,
    pub export: Vec<Vec<f64>>,
    pub internalized: Vec<Vec<AtomicF64>>,
    pub release: Vec<Vec<f64>>,
    pub transfer: Vec<Vec<f64>>,
}

impl TestAgents {
    #[allow(clippy::too_many_arguments)]
    pub fn push(
        &mut self,
        position: &[f64],
        volume: f64,
        secretion: &[f64],
        uptake: &[f64],
        saturation: &[f64],
        export: &[f64],
    ) {
        let n_substrates = secretion.len();
        self.positions.push(position.to_vec());
        self.volumes.push(volume);
        self.secretion.push(secretion.to_vec());
        self.uptake.push(uptake.to_vec());
        self.saturation.push(saturation.to_vec());
        self.export.push(export.to_vec());
        self.internalized
            .push((0..n_substrates).map(|_| AtomicF64::new(0.0)).collect());
        self.release.push(vec![1.0; n_substrates]);
        self.transfer.push(vec![1.0; n_substrates]);
    }

    pub fn internalized(&self, agent: usize, substrate: usize) -> f64 {
        self.internalized[agent][substrate].load(core::sync::atomic::Ordering::Relaxed)
    }
}

impl AgentData for TestAgents {
    fn n_agents(&self) -> usize {
        self.positions.len()
    }

    fn position(&self, agent: usize) -> &[f64] {
        &self.positions[agent]
    }

    fn volume(&self, agent: usize) -> f64 {
        self.volumes[agent]
    }

    fn secretion_rates(&self, agent: usize) -> &[f64] {
        &self.secretion[agent]
    }

    fn uptake_rates(&self, agent: usize) -> &[f64] {
        &self.uptake[agent]
    }

    fn saturation_densities(&self, agent: usize) -> &[f64] {
        &self.saturation[agent]
    }

    fn net_export_rates(&self, agent: usize) -> &[f64] {
        &self.export[agent]
    }

    fn internalized_substrates(&self, agent: usize) -> &[AtomicF64] {
        &self.internalized[agent]
    }

    fn fraction_released_at_death(&self, agent: usize) -> &[f64] {
        &self.release[agent]
    }

    fn fraction_transferred_when_ingested(&self, agent: usize) -> &[f64] {
        &self.transfer[agent]
    }
}
