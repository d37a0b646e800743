//! Residual-corrected time stepping for nonlinear internal forces.
//!
//! After every scheme step the instantaneous residual
//! `r = f_ext - M a - B v - f_int(u)` is driven down by a capped
//! correction loop, either Newton-style (the scheme linearizes its own
//! effective dynamics) or Picard-style (a fixed effective tangent built
//! from the assembled matrices). Each step records an explicit
//! convergence outcome; an exhausted budget is reported, never swallowed.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use towerdyn_model::error::{ModelError, Result};

use crate::schemes::{CompModel, InitialConditions, SchemeKind, TimeIntegrationScheme};
use crate::solver::validate_force;

/// Residual stopping tolerance on `max(|r|)`.
pub const RESIDUAL_TOLERANCE: f64 = 1e-12;
/// Iteration cap per time step.
pub const MAX_ITERATIONS: usize = 10;

/// Internal-force law `f_int(u)`; the linear case is `K u`.
pub type InternalForces = Box<dyn Fn(&DVector<f64>) -> DVector<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationMethod {
    /// Scheme-provided linearized increment.
    Newton,
    /// Fixed effective tangent `M + B dt + K dt²`.
    Picard,
}

/// Per-step outcome of the correction loop.
#[derive(Debug, Clone, Copy, Serialize)]
pub enum StepConvergence {
    Converged { iterations: usize },
    IterationsExhausted { residual: f64 },
}

impl StepConvergence {
    pub fn is_converged(&self) -> bool {
        matches!(self, StepConvergence::Converged { .. })
    }
}

pub struct ResidualBasedSolver {
    array_time: Vec<f64>,
    dt: f64,
    scheme: Box<dyn TimeIntegrationScheme>,
    method: IterationMethod,
    m: DMatrix<f64>,
    b: DMatrix<f64>,
    internal_forces: InternalForces,
    /// Pre-factorized fixed tangent for the Picard variant.
    fixed_tangent: nalgebra::linalg::LU<f64, nalgebra::Dyn, nalgebra::Dyn>,
    force: DMatrix<f64>,
    pub displacement: DMatrix<f64>,
    pub velocity: DMatrix<f64>,
    pub acceleration: DMatrix<f64>,
    convergence: Vec<StepConvergence>,
}

impl ResidualBasedSolver {
    /// `internal_forces = None` falls back to the linear law `K u`.
    pub fn new(
        array_time: Vec<f64>,
        scheme_name: &str,
        dt: f64,
        model: CompModel,
        initial_conditions: InitialConditions,
        force: DMatrix<f64>,
        method: IterationMethod,
        internal_forces: Option<InternalForces>,
    ) -> Result<Self> {
        validate_force(&force, &array_time, model.n_dofs())?;
        let kind = SchemeKind::parse(scheme_name)?;
        let scheme = kind.build(dt, &model, &initial_conditions)?;

        let tangent = &model.m + &model.b * dt + &model.k * (dt * dt);
        let fixed_tangent = tangent.lu();
        if fixed_tangent.determinant() == 0.0 {
            return Err(ModelError::Numerical(
                "the fixed effective tangent is singular".to_string(),
            ));
        }

        let internal_forces = match internal_forces {
            Some(law) => law,
            None => {
                let k = model.k.clone();
                Box::new(move |u: &DVector<f64>| &k * u)
            }
        };

        let rows = model.n_dofs();
        let cols = array_time.len();
        Ok(Self {
            array_time,
            dt,
            scheme,
            method,
            m: model.m,
            b: model.b,
            internal_forces,
            fixed_tangent,
            force,
            displacement: DMatrix::zeros(rows, cols),
            velocity: DMatrix::zeros(rows, cols),
            acceleration: DMatrix::zeros(rows, cols),
            convergence: Vec::with_capacity(cols),
        })
    }

    pub fn array_time(&self) -> &[f64] {
        &self.array_time
    }

    /// Per-step convergence record, one entry per completed step.
    pub fn convergence(&self) -> &[StepConvergence] {
        &self.convergence
    }

    pub fn all_converged(&self) -> bool {
        self.convergence
            .iter()
            .all(StepConvergence::is_converged)
    }

    fn residual(&self, f_ext: &DVector<f64>) -> DVector<f64> {
        f_ext
            - &self.m * self.scheme.acceleration()
            - &self.b * self.scheme.velocity()
            - (self.internal_forces)(self.scheme.displacement())
    }

    fn increment(&self, residual: &DVector<f64>) -> Result<DVector<f64>> {
        match self.method {
            IterationMethod::Newton => {
                self.scheme.residual_increment(residual).ok_or_else(|| {
                    ModelError::Configuration(
                        "the selected scheme does not provide a Newton increment; \
                         choose BackwardEuler1 or the Picard method"
                            .to_string(),
                    )
                })
            }
            IterationMethod::Picard => {
                let rhs = residual * (self.dt * self.dt);
                self.fixed_tangent.solve(&rhs).ok_or_else(|| {
                    ModelError::Numerical("failed to solve the fixed tangent system".to_string())
                })
            }
        }
    }

    fn solve_single_step(&mut self, step: usize) -> Result<StepConvergence> {
        let f_ext = self.force.column(step).into_owned();
        self.scheme.solve_single_step(&f_ext)?;

        let mut residual = self.residual(&f_ext);
        for iteration in 0..MAX_ITERATIONS {
            if residual.amax() <= RESIDUAL_TOLERANCE {
                return Ok(StepConvergence::Converged {
                    iterations: iteration,
                });
            }
            let du = self.increment(&residual)?;
            self.scheme.shift_state(&du);
            residual = self.residual(&f_ext);
        }
        if residual.amax() <= RESIDUAL_TOLERANCE {
            return Ok(StepConvergence::Converged {
                iterations: MAX_ITERATIONS,
            });
        }
        Ok(StepConvergence::IterationsExhausted {
            residual: residual.amax(),
        })
    }

    /// Runs the time loop with per-step residual correction.
    pub fn solve(&mut self) -> Result<()> {
        self.convergence.clear();
        for step in 0..self.array_time.len() {
            let outcome = self.solve_single_step(step)?;
            self.convergence.push(outcome);

            self.displacement
                .set_column(step, self.scheme.displacement());
            self.velocity.set_column(step, self.scheme.velocity());
            self.acceleration
                .set_column(step, self.scheme.acceleration());
            self.scheme.update();
        }
        Ok(())
    }
}
