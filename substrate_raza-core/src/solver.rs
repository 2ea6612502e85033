//! Orchestrates all stages of one time step.
//!
//! Every step executes the following stages in this order.
//! Each stage is fully completed before the next one begins.
//!
//! | Stage | Implementation |
//! | --- | --- |
//! | Diffusion and decay | [DiffusionIntegrator] |
//! | Dirichlet conditions | [DirichletConditions](crate::dirichlet::DirichletConditions) |
//! | Bulk sources and sinks | [BulkSourceSink](crate::bulk::BulkSourceSink) |
//! | Secretion and uptake of agents | [AgentReductionEngine] |
use substrate_raza_concepts::{AgentData, ExecutionPolicy, TimeError};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::backend::BackendRegistry;
use crate::config::{Microenvironment, Settings};
use crate::diffusion::DiffusionIntegrator;
use crate::grid::CartesianGrid;
use crate::errors::SolverError;
use crate::reduction::{self, AgentReductionEngine, ReductionMode, ReductionReport};
use crate::storage::{JsonSnapshotWriter, SnapshotManifest};
use crate::time::TimeStepper;

/// Advances a [Microenvironment] in time.
///
/// This trait is object-safe such that solvers can be selected at runtime by name via the
/// [BackendRegistry].
pub trait DiffusionSolver: Send + Sync {
    /// Name of the execution backend
    fn name(&self) -> &'static str;

    /// Number of threads used for execution
    fn n_threads(&self) -> usize;

    /// Precomputes all quantities which stay constant between steps.
    ///
    /// Has to be called again if the time increment or the substrate parameters change.
    fn initialize(&mut self, env: &Microenvironment);

    /// Performs one step of all stages.
    ///
    /// Returns a summary of the agent reduction if agents were given.
    fn solve(
        &mut self,
        env: &Microenvironment,
        agents: Option<&dyn AgentData>,
        mode: ReductionMode,
    ) -> Option<ReductionReport>;

    /// Releases the internalized substrates of the given agents into their voxels.
    ///
    /// The agents are not removed from their container.
    /// Once they are, the cached reduction values are [invalidated](Self::invalidate).
    fn release(&self, env: &Microenvironment, agents: &dyn AgentData, dying: &[usize]);

    /// Passes internalized substrates from an ingested agent to the one ingesting it.
    fn transfer(&self, agents: &dyn AgentData, from: usize, to: usize) {
        reduction::transfer(agents, from, to)
    }

    /// Discards cached intermediate values of the agent reduction
    fn invalidate(&mut self);
}

/// The reference implementation of [DiffusionSolver] for any [ExecutionPolicy]
#[derive(Debug)]
pub struct Solver<P> {
    policy: P,
    diffusion: Option<DiffusionIntegrator>,
    reduction: AgentReductionEngine,
    parameters: Option<InitializedParameters>,
}

/// Quantities from which the precomputed coefficients were derived
#[derive(Clone, Debug, PartialEq)]
struct InitializedParameters {
    grid: CartesianGrid,
    dt: f64,
    diffusion_coefficients: Vec<f64>,
    decay_rates: Vec<f64>,
}

impl InitializedParameters {
    fn of(env: &Microenvironment) -> Self {
        Self {
            grid: env.grid().clone(),
            dt: env.dt(),
            diffusion_coefficients: env.diffusion_coefficients(),
            decay_rates: env.decay_rates(),
        }
    }

    fn matches(&self, env: &Microenvironment) -> bool {
        self.grid == *env.grid()
            && self.dt == env.dt()
            && self.diffusion_coefficients == env.diffusion_coefficients()
            && self.decay_rates == env.decay_rates()
    }
}

impl<P: ExecutionPolicy> Solver<P> {
    /// Uninitialized solver.
    /// Coefficients are computed during the first step at the latest.
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            diffusion: None,
            reduction: AgentReductionEngine::default(),
            parameters: None,
        }
    }

    /// The execution policy
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Precomputed diffusion coefficients if already initialized
    pub fn diffusion(&self) -> Option<&DiffusionIntegrator> {
        self.diffusion.as_ref()
    }

    /// Coefficients are only valid for the mesh, time increment and substrate parameters they
    /// were computed from.
    fn is_initialized_for(&self, env: &Microenvironment) -> bool {
        self.diffusion.is_some()
            && self.reduction.n_substrates() == env.n_substrates()
            && self
                .parameters
                .as_ref()
                .is_some_and(|parameters| parameters.matches(env))
    }
}

impl<P: ExecutionPolicy> DiffusionSolver for Solver<P> {
    fn name(&self) -> &'static str {
        self.policy.name()
    }

    fn n_threads(&self) -> usize {
        self.policy.n_threads()
    }

    fn initialize(&mut self, env: &Microenvironment) {
        self.diffusion = Some(DiffusionIntegrator::new(
            env.grid(),
            env.dt(),
            &env.diffusion_coefficients(),
            &env.decay_rates(),
        ));
        self.reduction = AgentReductionEngine::new(env.n_substrates());
        self.parameters = Some(InitializedParameters::of(env));
        #[cfg(feature = "tracing")]
        tracing::debug!(backend = self.name(), dt = env.dt(), "Initialized solver");
    }

    #[cfg_attr(feature = "tracing", instrument(skip_all))]
    fn solve(
        &mut self,
        env: &Microenvironment,
        agents: Option<&dyn AgentData>,
        mode: ReductionMode,
    ) -> Option<ReductionReport> {
        if !self.is_initialized_for(env) {
            self.initialize(env);
        }
        if let Some(diffusion) = &self.diffusion {
            diffusion.solve(env.grid(), env.densities(), &self.policy);
        }
        if !env.dirichlet().is_empty() {
            env.dirichlet()
                .apply(env.grid(), env.densities(), &self.policy);
        }
        if let Some(bulk) = env.bulk() {
            bulk.apply(env.grid(), env.densities(), env.dt(), &self.policy);
        }
        agents.map(|agents| {
            self.reduction.simulate(
                env.grid(),
                env.densities(),
                agents,
                env.dt(),
                env.track_internalized_substrates(),
                mode,
                &self.policy,
            )
        })
    }

    fn release(&self, env: &Microenvironment, agents: &dyn AgentData, dying: &[usize]) {
        self.policy.parallel_for(dying.len(), |n| {
            reduction::release(env.grid(), env.densities(), agents, dying[n])
        });
    }

    fn invalidate(&mut self) {
        self.reduction.invalidate();
    }
}

/// A [Microenvironment] together with the solver which advances it
pub struct SubstrateSimulation {
    env: Microenvironment,
    solver: Box<dyn DiffusionSolver>,
    settings: Settings,
    iteration: u64,
    time: f64,
}

impl core::fmt::Debug for SubstrateSimulation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubstrateSimulation")
            .field("env", &self.env)
            .field("solver", &self.solver.name())
            .field("settings", &self.settings)
            .field("iteration", &self.iteration)
            .field("time", &self.time)
            .finish()
    }
}

impl SubstrateSimulation {
    /// Creates the backend named in the [Settings] and initializes it.
    pub fn new(
        env: Microenvironment,
        settings: Settings,
        registry: &BackendRegistry,
    ) -> Result<Self, SolverError> {
        let mut solver = registry.create(&settings.backend, &settings)?;
        solver.initialize(&env);
        #[cfg(feature = "tracing")]
        tracing::info!(
            backend = solver.name(),
            n_threads = solver.n_threads(),
            "Created substrate simulation"
        );
        Ok(Self {
            env,
            solver,
            settings,
            iteration: 0,
            time: 0.0,
        })
    }

    /// The simulated domain
    pub fn env(&self) -> &Microenvironment {
        &self.env
    }

    /// Mutable access to the domain.
    /// Dirichlet conditions and bulk functors may be changed between steps.
    pub fn env_mut(&mut self) -> &mut Microenvironment {
        &mut self.env
    }

    /// The solver
    pub fn solver(&self) -> &dyn DiffusionSolver {
        self.solver.as_ref()
    }

    /// Execution settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Number of steps taken so far
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Simulation time after the steps taken so far
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Performs one step
    pub fn step(
        &mut self,
        agents: Option<&dyn AgentData>,
        mode: ReductionMode,
    ) -> Option<ReductionReport> {
        let report = self.solver.solve(&self.env, agents, mode);
        self.iteration += 1;
        self.time += self.env.dt();
        report
    }

    /// See [DiffusionSolver::release]
    pub fn release(&self, agents: &dyn AgentData, dying: &[usize]) {
        self.solver.release(&self.env, agents, dying)
    }

    /// See [DiffusionSolver::transfer]
    pub fn transfer(&self, agents: &dyn AgentData, from: usize, to: usize) {
        self.solver.transfer(agents, from, to)
    }

    /// See [DiffusionSolver::invalidate]
    pub fn invalidate(&mut self) {
        self.solver.invalidate()
    }

    /// Advances the simulation until the time stepper is exhausted.
    ///
    /// Snapshots are written at every save point if a storage location was specified in the
    /// [Settings] and the resulting manifest is returned.
    /// The increment of the time stepper has to match the time increment of the
    /// [Microenvironment].
    #[cfg_attr(feature = "tracing", instrument(skip_all))]
    pub fn run<S: TimeStepper>(
        &mut self,
        agents: Option<&dyn AgentData>,
        stepper: &mut S,
        mode: ReductionMode,
    ) -> Result<Option<SnapshotManifest>, SolverError> {
        let mut writer = self
            .settings
            .storage_location
            .as_ref()
            .map(JsonSnapshotWriter::open_or_create)
            .transpose()?;
        if stepper.saves_initial_state() {
            if let Some(writer) = writer.as_mut() {
                writer.store(&self.env.snapshot(self.iteration, self.time))?;
            }
        }
        let mut bar = match self.settings.show_progressbar {
            true => Some(stepper.initialize_bar()?),
            false => None,
        };

        while let Some(next) = stepper.advance() {
            if (next.increment - self.env.dt()).abs() > 1e-12 * self.env.dt() {
                return Err(TimeError(format!(
                    "time stepper increment {} does not match the solver increment {}",
                    next.increment,
                    self.env.dt()
                ))
                .into());
            }
            self.step(agents, mode);
            if next.save {
                if let Some(writer) = writer.as_mut() {
                    writer.store(&self.env.snapshot(self.iteration, self.time))?;
                }
            }
            if let Some(bar) = bar.as_mut() {
                stepper.update_bar(bar)?;
            }
        }
        Ok(writer.map(|writer| writer.manifest().clone()))
    }
}

#[cfg(test)]
mod test_solver {
    use super::*;
    use crate::config::{MicroenvironmentBuilder, SubstrateConfig};
    use crate::dirichlet::{Axis, Face};
    use crate::execution::{Rayon, Sequential};
    use crate::testing::TestAgents;
    use crate::time::FixedStepsize;
    use approx::assert_relative_eq;

    fn line_environment() -> Microenvironment {
        MicroenvironmentBuilder::new()
            .bounding_box([0.0; 3], [80.0, 0.0, 0.0], [20.0; 3], 1)
            .timestep(5.0)
            .substrate(SubstrateConfig::new("a", 4.0, 5.0, 1.0))
            .substrate(SubstrateConfig::new("b", 2.0, 3.0, 1.0))
            .build()
            .unwrap()
    }

    fn check_uniform_decay<P: ExecutionPolicy>(policy: P) {
        let env = line_environment();
        let mut solver = Solver::new(policy);
        assert!(solver.solve(&env, None, ReductionMode::Recompute).is_none());
        for v in 0..4 {
            assert_relative_eq!(env.densities().get(v, 0), 0.03846154, epsilon = 1e-8);
            assert_relative_eq!(env.densities().get(v, 1), 0.0625, epsilon = 1e-8);
        }
    }

    #[test]
    fn uniform_decay_sequential() {
        check_uniform_decay(Sequential);
    }

    #[test]
    fn uniform_decay_rayon() {
        check_uniform_decay(Rayon::new(2.try_into().unwrap()).unwrap());
    }

    #[test]
    fn dirichlet_follows_diffusion() {
        let env = MicroenvironmentBuilder::new()
            .bounding_box([0.0; 3], [80.0, 0.0, 0.0], [20.0; 3], 1)
            .timestep(1.0)
            .substrate(SubstrateConfig::new("a", 100.0, 0.0, 0.0))
            .dirichlet_boundary("a", Axis::X, Face::Min, 10.0)
            .build()
            .unwrap();
        let mut solver = Solver::new(Sequential);
        for _ in 0..5 {
            solver.solve(&env, None, ReductionMode::Recompute);
            assert_eq!(env.densities().get(0, 0), 10.0);
        }
        let values = env.densities().substrate_values(0);
        assert!(values.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn reinitialize_when_dt_changes() {
        let mut env = line_environment();
        let mut solver = Solver::new(Sequential);
        solver.initialize(&env);
        assert_eq!(solver.diffusion().unwrap().dt(), 5.0);
        env = MicroenvironmentBuilder::new()
            .bounding_box([0.0; 3], [80.0, 0.0, 0.0], [20.0; 3], 1)
            .timestep(1.0)
            .substrate(SubstrateConfig::new("a", 4.0, 5.0, 1.0))
            .build()
            .unwrap();
        solver.solve(&env, None, ReductionMode::Recompute);
        assert_eq!(solver.diffusion().unwrap().dt(), 1.0);
        assert_relative_eq!(env.densities().get(0, 0), 1.0 / 6.0, epsilon = 1e-12);
    }

    fn decaying_line(diffusion_coefficient: f64, decay_rate: f64, dx: f64) -> Microenvironment {
        let env = MicroenvironmentBuilder::new()
            .bounding_box([0.0; 3], [4.0 * dx, 0.0, 0.0], [dx; 3], 1)
            .timestep(0.1)
            .substrate(SubstrateConfig::new("a", diffusion_coefficient, decay_rate, 0.0))
            .build()
            .unwrap();
        env.densities().set(0, 0, 100.0);
        env
    }

    #[test]
    fn reinitialize_when_substrate_parameters_change() {
        let mut solver = Solver::new(Sequential);
        solver.solve(&decaying_line(1.0, 0.0, 20.0), None, ReductionMode::Recompute);

        for changed in [
            decaying_line(400.0, 2.0, 20.0),
            decaying_line(1.0, 2.0, 20.0),
            decaying_line(1.0, 0.0, 10.0),
        ] {
            let reference = decaying_line(
                changed.diffusion_coefficients()[0],
                changed.decay_rates()[0],
                changed.grid().voxel_shape()[0],
            );
            solver.solve(&changed, None, ReductionMode::Recompute);
            Solver::new(Sequential).solve(&reference, None, ReductionMode::Recompute);
            assert_eq!(
                changed.densities().substrate_values(0),
                reference.densities().substrate_values(0)
            );
        }
    }

    #[test]
    fn agents_secrete_after_diffusion() {
        let env = line_environment();
        let mut agents = TestAgents::default();
        agents.push(&[10.0], 800.0, &[0.1, 0.0], &[0.0; 2], &[1.0, 0.0], &[0.0; 2]);
        let mut solver = Solver::new(Sequential);
        let report = solver
            .solve(&env, Some(&agents as &dyn AgentData), ReductionMode::Recompute)
            .unwrap();
        assert!(!report.conflict);
        // n = 0.1 * 1.0 * 5.0 * 0.1 = 0.05, d = 1.05
        let diffused = 1.0 / 26.0;
        assert_relative_eq!(
            env.densities().get(0, 0),
            (diffused + 0.05) / 1.05,
            epsilon = 1e-12
        );
        assert_relative_eq!(env.densities().get(1, 0), diffused, epsilon = 1e-12);
    }

    #[test]
    fn run_writes_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            storage_location: Some(dir.path().join("snapshots")),
            ..Default::default()
        };
        let mut simulation =
            SubstrateSimulation::new(line_environment(), settings, &BackendRegistry::with_defaults())
                .unwrap();
        let mut stepper = FixedStepsize::from_partial_save_steps(0.0, 5.0, 4, 2).unwrap();
        let manifest = simulation
            .run(None, &mut stepper, ReductionMode::Recompute)
            .unwrap()
            .unwrap();
        assert_eq!(simulation.iteration(), 4);
        assert_relative_eq!(simulation.time(), 20.0);
        let iterations: Vec<_> = manifest.entries.iter().map(|e| e.iteration).collect();
        assert_eq!(iterations, vec![0, 2, 4]);
        let times: Vec<_> = manifest.entries.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![0.0, 10.0, 20.0]);
    }

    #[test]
    fn run_rejects_mismatching_increment() {
        let mut simulation = SubstrateSimulation::new(
            line_environment(),
            Settings::default(),
            &BackendRegistry::with_defaults(),
        )
        .unwrap();
        let mut stepper = FixedStepsize::from_partial_save_steps(0.0, 1.0, 4, 2).unwrap();
        assert!(matches!(
            simulation.run(None, &mut stepper, ReductionMode::Recompute),
            Err(SolverError::TimeError(_))
        ));
    }
}
