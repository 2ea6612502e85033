//! Controls how the simulation time is advanced

use kdam::BarExt;
use serde::{Deserialize, Serialize};

use substrate_raza_concepts::TimeError;

/// Represents the next time point which is returned by the [TimeStepper::advance] method.
#[derive(Clone, Debug, PartialEq)]
pub struct NextTimePoint {
    /// Time increment $dt$
    pub increment: f64,
    /// Time value $t$ after the step was taken
    pub time: f64,
    /// Number of completed steps
    pub iteration: u64,
    /// A snapshot should be stored after this step
    pub save: bool,
}

/// Increments time of the simulation
pub trait TimeStepper {
    /// Advances the time stepper to the next time point.
    /// Returns [None] once the final time point was reached.
    #[must_use]
    fn advance(&mut self) -> Option<NextTimePoint>;

    /// Total number of steps which will be taken
    fn n_steps(&self) -> u64;

    /// `true` if the state before the first step should be stored
    fn saves_initial_state(&self) -> bool;

    /// Creates a bar that tracks the simulation progress
    fn initialize_bar(&self) -> Result<kdam::Bar, TimeError>;

    /// Update a given bar to show the current simulation state
    fn update_bar(&self, bar: &mut kdam::Bar) -> Result<(), std::io::Error>;
}

/// Time stepping with a fixed time length
///
/// ```
/// # use substrate_raza_core::time::{FixedStepsize, TimeStepper};
/// let mut stepper = FixedStepsize::from_partial_save_steps(0.0, 0.5, 4, 2)?;
/// let saves: Vec<_> = std::iter::from_fn(|| stepper.advance())
///     .filter(|next| next.save)
///     .map(|next| next.time)
///     .collect();
/// assert_eq!(saves, vec![1.0, 2.0]);
/// # Ok::<(), substrate_raza_concepts::TimeError>(())
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FixedStepsize {
    dt: f64,
    t0: f64,
    save_iterations: Vec<u64>,
    current_iteration: u64,
    n_steps: u64,
}

impl FixedStepsize {
    fn check_increment(dt: f64) -> Result<(), TimeError> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(TimeError(format!(
                "time increment dt={dt} must be finite and strictly positive"
            )));
        }
        Ok(())
    }

    /// Construct the stepper from initial time, increment,
    /// number of steps and save interval.
    ///
    /// The initial and the final state are always saved.
    pub fn from_partial_save_steps(
        t0: f64,
        dt: f64,
        n_steps: u64,
        save_interval: u64,
    ) -> Result<Self, TimeError> {
        Self::check_increment(dt)?;
        if save_interval == 0 {
            return Err(TimeError("save interval must be larger than zero".to_owned()));
        }
        let step = usize::try_from(save_interval)
            .map_err(|e| TimeError(format!("invalid save interval {save_interval}: {e}")))?;
        let mut save_iterations: Vec<u64> = (0..=n_steps).step_by(step).collect();
        if save_iterations.last() != Some(&n_steps) {
            save_iterations.push(n_steps);
        }
        Ok(Self {
            dt,
            t0,
            save_iterations,
            current_iteration: 0,
            n_steps,
        })
    }

    /// Simple function to construct the stepper from an initial time point, the time increment
    /// and the time points at which the simulation should be saved.
    ///
    /// Save points are rounded to the nearest iteration.
    /// The last save point determines the number of steps.
    pub fn from_partial_save_points(
        t0: f64,
        dt: f64,
        partial_save_points: Vec<f64>,
    ) -> Result<Self, TimeError> {
        use num::ToPrimitive;
        Self::check_increment(dt)?;
        if partial_save_points.iter().any(|t| !(*t >= t0)) {
            return Err(TimeError(
                "Invalid time configuration! Evaluation time point is before starting time point."
                    .to_owned(),
            ));
        }
        let mut save_iterations = partial_save_points
            .into_iter()
            .map(|t_save| {
                ((t_save - t0) / dt).round().to_u64().ok_or(TimeError(format!(
                    "save point {t_save} can not be reached with increment {dt}"
                )))
            })
            .collect::<Result<Vec<_>, TimeError>>()?;
        save_iterations.sort_unstable();
        save_iterations.dedup();
        let n_steps = *save_iterations.last().ok_or(TimeError(
            "No savepoints specified. Simulation will not save any results.".to_owned(),
        ))?;
        Ok(Self {
            dt,
            t0,
            save_iterations,
            current_iteration: 0,
            n_steps,
        })
    }

    /// The fixed increment
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Initial time
    pub fn t0(&self) -> f64 {
        self.t0
    }

    /// Number of steps taken so far
    pub fn current_iteration(&self) -> u64 {
        self.current_iteration
    }

    /// Time after the steps taken so far
    pub fn current_time(&self) -> f64 {
        self.t0 + self.current_iteration as f64 * self.dt
    }

    fn saves_at(&self, iteration: u64) -> bool {
        self.save_iterations.binary_search(&iteration).is_ok()
    }
}

impl TimeStepper for FixedStepsize {
    fn advance(&mut self) -> Option<NextTimePoint> {
        if self.current_iteration >= self.n_steps {
            return None;
        }
        self.current_iteration += 1;
        Some(NextTimePoint {
            increment: self.dt,
            time: self.current_time(),
            iteration: self.current_iteration,
            save: self.saves_at(self.current_iteration),
        })
    }

    fn n_steps(&self) -> u64 {
        self.n_steps
    }

    fn saves_initial_state(&self) -> bool {
        self.saves_at(0)
    }

    fn initialize_bar(&self) -> Result<kdam::Bar, TimeError> {
        let bar_format = "\
        {desc}{percentage:3.0}%|{animation}| \
        {count}/{total} \
        [{elapsed}, \
        {rate:.2}{unit}/s{postfix}]";
        let total = usize::try_from(self.n_steps)
            .map_err(|e| TimeError(format!("number of steps exceeds usize: {e}")))?;
        Ok(kdam::BarBuilder::default()
            .total(total)
            .bar_format(bar_format)
            .dynamic_ncols(true)
            .build()?)
    }

    fn update_bar(&self, bar: &mut kdam::Bar) -> Result<(), std::io::Error> {
        bar.update(1)?;
        Ok(())
    }
}
