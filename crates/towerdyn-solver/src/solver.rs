//! Time-loop driver storing the full response history.

use nalgebra::DMatrix;

use towerdyn_model::error::{ModelError, Result};

use crate::schemes::{CompModel, InitialConditions, SchemeKind, TimeIntegrationScheme};

/// Drives a time integration scheme across the time array and records the
/// displacement, velocity and acceleration histories in reduced space.
///
/// Column `i` of each history holds the state advanced `i + 1` steps from
/// the initial conditions, driven by force column `i`.
pub struct Solver {
    array_time: Vec<f64>,
    dt: f64,
    scheme: Box<dyn TimeIntegrationScheme>,
    force: DMatrix<f64>,
    /// `(n_reduced_dofs × n_timesteps)` response histories.
    pub displacement: DMatrix<f64>,
    pub velocity: DMatrix<f64>,
    pub acceleration: DMatrix<f64>,
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("array_time", &self.array_time)
            .field("dt", &self.dt)
            .field("scheme", &"<dyn TimeIntegrationScheme>")
            .field("force", &self.force)
            .field("displacement", &self.displacement)
            .field("velocity", &self.velocity)
            .field("acceleration", &self.acceleration)
            .finish()
    }
}

impl Solver {
    pub fn new(
        array_time: Vec<f64>,
        scheme_name: &str,
        dt: f64,
        model: CompModel,
        initial_conditions: InitialConditions,
        force: DMatrix<f64>,
    ) -> Result<Self> {
        validate_force(&force, &array_time, model.n_dofs())?;
        let kind = SchemeKind::parse(scheme_name)?;
        let scheme = kind.build(dt, &model, &initial_conditions)?;

        let rows = model.n_dofs();
        let cols = array_time.len();
        Ok(Self {
            array_time,
            dt,
            scheme,
            force,
            displacement: DMatrix::zeros(rows, cols),
            velocity: DMatrix::zeros(rows, cols),
            acceleration: DMatrix::zeros(rows, cols),
        })
    }

    pub fn array_time(&self) -> &[f64] {
        &self.array_time
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn n_steps(&self) -> usize {
        self.array_time.len()
    }

    /// Runs the full time loop: advance, record, shift.
    pub fn solve(&mut self) -> Result<()> {
        for step in 0..self.array_time.len() {
            let force = self.force.column(step).into_owned();
            self.scheme.solve_single_step(&force)?;
            self.record(step);
            self.scheme.update();
        }
        Ok(())
    }

    fn record(&mut self, step: usize) {
        self.displacement
            .set_column(step, self.scheme.displacement());
        self.velocity.set_column(step, self.scheme.velocity());
        self.acceleration
            .set_column(step, self.scheme.acceleration());
    }
}

pub(crate) fn validate_force(
    force: &DMatrix<f64>,
    array_time: &[f64],
    n_dofs: usize,
) -> Result<()> {
    if force.ncols() != array_time.len() {
        return Err(ModelError::Configuration(format!(
            "the force history has {} samples but the time array has {}",
            force.ncols(),
            array_time.len()
        )));
    }
    if force.nrows() != n_dofs {
        return Err(ModelError::Configuration(format!(
            "the force history has {} DOFs but the system has {n_dofs}",
            force.nrows()
        )));
    }
    Ok(())
}
