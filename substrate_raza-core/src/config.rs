//! Configuration of the microenvironment and of the solver.
//!
//! A [Microenvironment] is assembled either from a [MicroenvironmentConfig] (which can be
//! deserialized or read from the legacy xml format via [crate::xml]) or by using the
//! [MicroenvironmentBuilder].
use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use substrate_raza_concepts::{BoundaryError, BulkFunctor, ConfigError, IndexError, SetupError};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::bulk::BulkSourceSink;
use crate::density::DensityField;
use crate::dirichlet::{Axis, DirichletConditions, Face};
use crate::errors::SolverError;
use crate::grid::CartesianGrid;
use crate::storage::DensitySnapshot;

/// Bounding box and voxel shape of the simulation domain
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Lower corner
    pub min: [f64; 3],
    /// Upper corner
    pub max: [f64; 3],
    /// Size of one voxel along every axis
    pub voxel_shape: [f64; 3],
    /// Number of active spatial dimensions
    pub dims: usize,
}

impl DomainConfig {
    /// Constructs the [CartesianGrid]
    pub fn build_grid(&self) -> Result<CartesianGrid, BoundaryError> {
        CartesianGrid::from_bounding_box(self.min, self.max, self.voxel_shape, self.dims)
    }
}

/// Value of a single face which deviates from the substrate-wide default
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirichletFaceConfig {
    /// Axis perpendicular to the face
    pub axis: Axis,
    /// Lower or upper face
    pub face: Face,
    /// Fixed density
    pub value: f64,
    /// Is this face constrained
    pub enabled: bool,
}

/// Dirichlet conditions of one substrate on the faces of the domain.
///
/// Every face takes `value` if `enabled` is set.
/// Entries in `faces` replace this default for individual faces.
/// If `enabled` is not set, no face of this substrate is constrained.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DirichletConfig {
    /// Default value of all faces
    pub value: f64,
    /// Enables constraints for this substrate
    pub enabled: bool,
    /// Overrides of individual faces
    #[serde(default)]
    pub faces: Vec<DirichletFaceConfig>,
}

/// Physical parameters of one substrate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubstrateConfig {
    /// Unique name
    pub name: String,
    /// Units of the density
    pub units: String,
    /// Diffusion constant $D$
    pub diffusion_coefficient: f64,
    /// Decay rate $\lambda$
    pub decay_rate: f64,
    /// Density of every voxel at the beginning of the simulation
    pub initial_condition: f64,
    /// Constraints on the domain faces
    #[serde(default)]
    pub dirichlet: DirichletConfig,
}

impl SubstrateConfig {
    /// Substrate without any Dirichlet conditions
    pub fn new(
        name: impl Into<String>,
        diffusion_coefficient: f64,
        decay_rate: f64,
        initial_condition: f64,
    ) -> Self {
        Self {
            name: name.into(),
            units: "dimensionless".to_owned(),
            diffusion_coefficient,
            decay_rate,
            initial_condition,
            dirichlet: DirichletConfig::default(),
        }
    }
}

/// Pins one substrate inside a single voxel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteriorDirichletConfig {
    /// Name of the substrate
    pub substrate: String,
    /// Indices of the voxel
    pub voxel: [usize; 3],
    /// Fixed density
    pub value: f64,
}

/// Complete description of a [Microenvironment] except for the bulk functor
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MicroenvironmentConfig {
    /// Simulation domain
    pub domain: DomainConfig,
    /// Time increment of one solver step
    pub dt: f64,
    /// Units of time
    pub time_units: String,
    /// Units of space
    pub space_units: String,
    /// All substrates in storage order
    pub substrates: Vec<SubstrateConfig>,
    /// Pinned interior voxels
    #[serde(default)]
    pub interior_dirichlet: Vec<InteriorDirichletConfig>,
    /// Keep track of the amount of substrate taken up by every agent
    #[serde(default)]
    pub track_internalized_substrates: bool,
}

impl MicroenvironmentConfig {
    /// Checks parameters which can not be verified by the type system
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dt > 0.0) || !self.dt.is_finite() {
            return Err(ConfigError(format!(
                "time increment dt={} must be finite and positive",
                self.dt
            )));
        }
        if self.substrates.is_empty() {
            return Err(ConfigError(
                "microenvironment must contain at least one substrate".to_owned(),
            ));
        }
        for (n, substrate) in self.substrates.iter().enumerate() {
            if self.substrates[..n].iter().any(|s| s.name == substrate.name) {
                return Err(ConfigError(format!(
                    "substrate name \"{}\" is used more than once",
                    substrate.name
                )));
            }
            let parameters = [
                ("diffusion coefficient", substrate.diffusion_coefficient),
                ("decay rate", substrate.decay_rate),
            ];
            for (parameter, value) in parameters {
                if !(value >= 0.0) || !value.is_finite() {
                    return Err(ConfigError(format!(
                        "{} of substrate \"{}\" must be finite and non-negative but is {}",
                        parameter, substrate.name, value
                    )));
                }
            }
            if !substrate.initial_condition.is_finite() {
                return Err(ConfigError(format!(
                    "initial condition of substrate \"{}\" is not finite",
                    substrate.name
                )));
            }
        }
        Ok(())
    }

    fn substrate_index(&self, name: &str) -> Result<usize, ConfigError> {
        self.substrates
            .iter()
            .position(|s| s.name == name)
            .ok_or(ConfigError(format!(
                "unknown substrate \"{}\"; known substrates are {:?}",
                name,
                self.substrates.iter().map(|s| &s.name).collect::<Vec<_>>()
            )))
    }

    /// Assembles the [Microenvironment] without a bulk functor.
    #[cfg_attr(feature = "tracing", instrument(skip_all))]
    pub fn build(self) -> Result<Microenvironment, SetupError> {
        self.validate()?;
        let grid = self.domain.build_grid()?;

        let mut dirichlet = DirichletConditions::new(self.substrates.len());
        for (s, substrate) in self.substrates.iter().enumerate() {
            let config = &substrate.dirichlet;
            if !config.enabled {
                continue;
            }
            for axis in Axis::ALL {
                for face in [Face::Min, Face::Max] {
                    let (value, enabled) = config
                        .faces
                        .iter()
                        .rev()
                        .find(|f| f.axis == axis && f.face == face)
                        .map_or((config.value, true), |f| (f.value, f.enabled));
                    dirichlet.set_boundary(axis, face, s, value, enabled)?;
                }
            }
        }
        for interior in self.interior_dirichlet.iter() {
            let s = self.substrate_index(&interior.substrate)?;
            dirichlet.set_interior(&grid, interior.voxel, s, interior.value)?;
        }

        let initial: Vec<f64> = self.substrates.iter().map(|s| s.initial_condition).collect();
        let densities = DensityField::from_initial_values(grid.voxel_count(), &initial);
        #[cfg(feature = "tracing")]
        tracing::info!(
            n_voxels = grid.voxel_count(),
            n_substrates = self.substrates.len(),
            "Assembled microenvironment"
        );
        Ok(Microenvironment {
            grid,
            densities,
            dt: self.dt,
            time_units: self.time_units,
            space_units: self.space_units,
            substrates: self.substrates,
            dirichlet,
            bulk: None,
            track_internalized_substrates: self.track_internalized_substrates,
        })
    }
}

/// Options which control how a simulation is executed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Number of threads used by parallel backends
    pub n_threads: NonZeroUsize,
    /// Name of the backend in the [BackendRegistry](crate::backend::BackendRegistry)
    pub backend: String,
    /// Show a progress bar while running
    pub show_progressbar: bool,
    /// Folder in which snapshots are stored.
    /// Nothing is written if not specified.
    pub storage_location: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            n_threads: NonZeroUsize::MIN,
            backend: "sequential".to_owned(),
            show_progressbar: false,
            storage_location: None,
        }
    }
}

/// Discretized domain holding the densities of all substrates.
#[derive(Debug)]
pub struct Microenvironment {
    grid: CartesianGrid,
    densities: DensityField,
    dt: f64,
    time_units: String,
    space_units: String,
    substrates: Vec<SubstrateConfig>,
    dirichlet: DirichletConditions,
    bulk: Option<BulkSourceSink>,
    track_internalized_substrates: bool,
}

impl Microenvironment {
    /// Mesh of the domain
    pub fn grid(&self) -> &CartesianGrid {
        &self.grid
    }

    /// Current densities
    pub fn densities(&self) -> &DensityField {
        &self.densities
    }

    /// Time increment of one solver step
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Units of time
    pub fn time_units(&self) -> &str {
        &self.time_units
    }

    /// Units of space
    pub fn space_units(&self) -> &str {
        &self.space_units
    }

    /// Number of substrates
    pub fn n_substrates(&self) -> usize {
        self.substrates.len()
    }

    /// Parameters of all substrates in storage order
    pub fn substrates(&self) -> &[SubstrateConfig] {
        &self.substrates
    }

    /// Storage index of the substrate with the given name
    pub fn substrate_index(&self, name: &str) -> Result<usize, IndexError> {
        self.substrates
            .iter()
            .position(|s| s.name == name)
            .ok_or(IndexError(format!("no substrate named \"{}\"", name)))
    }

    /// Diffusion constants of all substrates
    pub fn diffusion_coefficients(&self) -> Vec<f64> {
        self.substrates
            .iter()
            .map(|s| s.diffusion_coefficient)
            .collect()
    }

    /// Decay rates of all substrates
    pub fn decay_rates(&self) -> Vec<f64> {
        self.substrates.iter().map(|s| s.decay_rate).collect()
    }

    /// Fixed-value constraints
    pub fn dirichlet(&self) -> &DirichletConditions {
        &self.dirichlet
    }

    /// Modify fixed-value constraints
    pub fn dirichlet_mut(&mut self) -> &mut DirichletConditions {
        &mut self.dirichlet
    }

    /// Bulk sources and sinks if any were registered
    pub fn bulk(&self) -> Option<&BulkSourceSink> {
        self.bulk.as_ref()
    }

    /// Registers bulk sources and sinks and replaces existing ones
    pub fn set_bulk(&mut self, functor: impl BulkFunctor + 'static) {
        self.bulk = Some(BulkSourceSink::new(functor));
    }

    /// Are internalized substrates of agents tracked
    pub fn track_internalized_substrates(&self) -> bool {
        self.track_internalized_substrates
    }

    /// Enables or disables tracking of internalized substrates
    pub fn set_track_internalized_substrates(&mut self, track: bool) {
        self.track_internalized_substrates = track;
    }

    /// Overwrites the density of one substrate in one voxel
    pub fn set_density(
        &self,
        voxel: [usize; 3],
        substrate: usize,
        value: f64,
    ) -> Result<(), IndexError> {
        let n_voxels = self.grid.n_voxels();
        if (0..3).any(|i| voxel[i] >= n_voxels[i]) {
            return Err(IndexError(format!(
                "voxel {:?} lies outside of the mesh with {:?} voxels",
                voxel, n_voxels
            )));
        }
        self.densities.try_set(
            self.grid.linear_index(voxel[0], voxel[1], voxel[2]),
            substrate,
            value,
        )
    }

    /// Density of a substrate at the given position
    pub fn density_at(&self, position: &[f64], substrate: usize) -> Result<f64, SolverError> {
        let [x, y, z] = self.grid.try_voxel_of(position)?;
        if substrate >= self.n_substrates() {
            return Err(IndexError(format!(
                "substrate index {} is out of range for {} substrates",
                substrate,
                self.n_substrates()
            ))
            .into());
        }
        Ok(self
            .densities
            .get(self.grid.linear_index(x, y, z), substrate))
    }

    /// Total amount of a substrate inside the domain
    pub fn total_amount(&self, substrate: usize) -> f64 {
        self.densities.total(substrate) * self.grid.voxel_volume()
    }

    /// Copies the current state
    pub fn snapshot(&self, iteration: u64, time: f64) -> DensitySnapshot {
        DensitySnapshot {
            iteration,
            time,
            n_voxels: self.grid.n_voxels(),
            substrates: self.substrates.iter().map(|s| s.name.clone()).collect(),
            densities: self.densities.to_vec(),
        }
    }
}

/// Incrementally assembles a [Microenvironment].
///
/// ```
/// # use substrate_raza_core::config::*;
/// # use substrate_raza_core::dirichlet::{Axis, Face};
/// let env = MicroenvironmentBuilder::new()
///     .bounding_box([0.0; 3], [100.0, 100.0, 0.0], [20.0; 3], 2)
///     .timestep(0.01)
///     .substrate(SubstrateConfig::new("oxygen", 1e5, 0.1, 38.0))
///     .dirichlet_boundary("oxygen", Axis::X, Face::Min, 38.0)
///     .build()?;
/// assert_eq!(env.grid().voxel_count(), 25);
/// # Ok::<(), substrate_raza_concepts::SetupError>(())
/// ```
#[derive(Default)]
pub struct MicroenvironmentBuilder {
    domain: Option<DomainConfig>,
    dt: Option<f64>,
    time_units: Option<String>,
    space_units: Option<String>,
    substrates: Vec<SubstrateConfig>,
    boundaries: Vec<(String, DirichletFaceConfig)>,
    interior_dirichlet: Vec<InteriorDirichletConfig>,
    track_internalized_substrates: bool,
    bulk: Option<Box<dyn BulkFunctor>>,
}

impl MicroenvironmentBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration
    pub fn from_config(config: MicroenvironmentConfig) -> Self {
        Self {
            domain: Some(config.domain),
            dt: Some(config.dt),
            time_units: Some(config.time_units),
            space_units: Some(config.space_units),
            substrates: config.substrates,
            boundaries: Vec::new(),
            interior_dirichlet: config.interior_dirichlet,
            track_internalized_substrates: config.track_internalized_substrates,
            bulk: None,
        }
    }

    /// Sets the simulation domain
    pub fn domain(mut self, domain: DomainConfig) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Sets the simulation domain from its parts
    pub fn bounding_box(
        self,
        min: [f64; 3],
        max: [f64; 3],
        voxel_shape: [f64; 3],
        dims: usize,
    ) -> Self {
        self.domain(DomainConfig {
            min,
            max,
            voxel_shape,
            dims,
        })
    }

    /// Time increment of one solver step
    pub fn timestep(mut self, dt: f64) -> Self {
        self.dt = Some(dt);
        self
    }

    /// Units of time and space
    pub fn units(mut self, time_units: impl Into<String>, space_units: impl Into<String>) -> Self {
        self.time_units = Some(time_units.into());
        self.space_units = Some(space_units.into());
        self
    }

    /// Appends a substrate
    pub fn substrate(mut self, substrate: SubstrateConfig) -> Self {
        self.substrates.push(substrate);
        self
    }

    /// Fixes the density of a substrate on one face of the domain
    pub fn dirichlet_boundary(
        mut self,
        substrate: impl Into<String>,
        axis: Axis,
        face: Face,
        value: f64,
    ) -> Self {
        self.boundaries.push((
            substrate.into(),
            DirichletFaceConfig {
                axis,
                face,
                value,
                enabled: true,
            },
        ));
        self
    }

    /// Fixes the density of a substrate inside a single voxel
    pub fn dirichlet_interior(
        mut self,
        substrate: impl Into<String>,
        voxel: [usize; 3],
        value: f64,
    ) -> Self {
        self.interior_dirichlet.push(InteriorDirichletConfig {
            substrate: substrate.into(),
            voxel,
            value,
        });
        self
    }

    /// Registers bulk sources and sinks
    pub fn bulk(mut self, functor: impl BulkFunctor + 'static) -> Self {
        self.bulk = Some(Box::new(functor));
        self
    }

    /// Keep track of the amount of substrate taken up by every agent
    pub fn track_internalized_substrates(mut self, track: bool) -> Self {
        self.track_internalized_substrates = track;
        self
    }

    /// Combines all parts into a [MicroenvironmentConfig]
    pub fn to_config(&self) -> Result<MicroenvironmentConfig, ConfigError> {
        let domain = self
            .domain
            .clone()
            .ok_or(ConfigError("no simulation domain was specified".to_owned()))?;
        let dt = self
            .dt
            .ok_or(ConfigError("no time increment was specified".to_owned()))?;
        let mut substrates = self.substrates.clone();
        for (name, face) in self.boundaries.iter() {
            let substrate = substrates
                .iter_mut()
                .find(|s| &s.name == name)
                .ok_or(ConfigError(format!(
                    "Dirichlet boundary refers to unknown substrate \"{}\"",
                    name
                )))?;
            if !substrate.dirichlet.enabled {
                // Only the explicitly listed faces are constrained
                substrate.dirichlet.enabled = true;
                for axis in Axis::ALL {
                    for f in [Face::Min, Face::Max] {
                        substrate.dirichlet.faces.push(DirichletFaceConfig {
                            axis,
                            face: f,
                            value: 0.0,
                            enabled: false,
                        });
                    }
                }
            }
            substrate.dirichlet.faces.push(face.clone());
        }
        Ok(MicroenvironmentConfig {
            domain,
            dt,
            time_units: self.time_units.clone().unwrap_or("min".to_owned()),
            space_units: self.space_units.clone().unwrap_or("micron".to_owned()),
            substrates,
            interior_dirichlet: self.interior_dirichlet.clone(),
            track_internalized_substrates: self.track_internalized_substrates,
        })
    }

    /// Assembles the [Microenvironment]
    pub fn build(self) -> Result<Microenvironment, SetupError> {
        let mut env = self.to_config()?.build()?;
        env.bulk = self.bulk.map(BulkSourceSink::from_boxed);
        Ok(env)
    }
}
