//! Explicit mapping from backend names to solver factories.
//!
//! The registry is constructed once, typically with [BackendRegistry::with_defaults], and
//! handed to whatever assembles the simulation.
//! ```
//! # use substrate_raza_core::backend::BackendRegistry;
//! # use substrate_raza_core::config::Settings;
//! let registry = BackendRegistry::with_defaults();
//! let solver = registry.create("rayon", &Settings::default())?;
//! assert_eq!(solver.name(), "rayon");
//! assert!(registry.create("gpu", &Settings::default()).is_err());
//! # Ok::<(), substrate_raza_core::errors::SolverError>(())
//! ```
use std::collections::BTreeMap;

use substrate_raza_concepts::BackendError;

use crate::config::Settings;
use crate::errors::SolverError;
use crate::execution::{Rayon, Sequential};
use crate::solver::{DiffusionSolver, Solver};

/// Creates a new solver from the [Settings]
pub type SolverFactory =
    Box<dyn Fn(&Settings) -> Result<Box<dyn DiffusionSolver>, SolverError> + Send + Sync>;

/// Name to factory map of all available solver backends
#[derive(Default)]
pub struct BackendRegistry {
    factories: BTreeMap<String, SolverFactory>,
}

impl core::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl BackendRegistry {
    /// Registry without any backends
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry containing the `"sequential"` and `"rayon"` backends
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("sequential", |_| Ok(Box::new(Solver::new(Sequential))));
        registry.register("rayon", |settings| {
            Ok(Box::new(Solver::new(Rayon::new(settings.n_threads)?)))
        });
        registry
    }

    /// Adds a backend and returns the factory previously registered under the same name
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Option<SolverFactory>
    where
        F: Fn(&Settings) -> Result<Box<dyn DiffusionSolver>, SolverError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory))
    }

    /// Factory registered under the given name
    pub fn get(&self, name: &str) -> Result<&SolverFactory, BackendError> {
        self.factories.get(name).ok_or(BackendError(format!(
            "no backend named \"{}\" is registered; available backends are {:?}",
            name,
            self.names().collect::<Vec<_>>()
        )))
    }

    /// Creates a solver of the given backend
    pub fn create(
        &self,
        name: &str,
        settings: &Settings,
    ) -> Result<Box<dyn DiffusionSolver>, SolverError> {
        self.get(name)?(settings)
    }

    /// Names of all registered backends in alphabetical order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Checks if a backend of this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}
