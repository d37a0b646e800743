//! Single-step time integration schemes.
//!
//! Every scheme is constructed from the time step, the reduced
//! mass/damping/stiffness matrices and the initial `(u, v, a)` triple. A
//! step consists of `solve_single_step(f_next)`, which overwrites the
//! current-state triple, followed by `update()`, which shifts the current
//! state into the previous one. Time-invariant implicit left-hand sides
//! are factorized once at construction.

use nalgebra::linalg::LU;
use nalgebra::{DMatrix, DVector, Dyn};

use towerdyn_model::error::{ModelError, Result};

mod backward_euler;
mod bdf2;
mod euler12;
mod forward_euler;
mod generalized_alpha;
mod runge_kutta4;

pub use backward_euler::BackwardEuler1;
pub use bdf2::Bdf2;
pub use euler12::Euler12;
pub use forward_euler::ForwardEuler1;
pub use generalized_alpha::GeneralizedAlpha;
pub use runge_kutta4::RungeKutta4;

pub(crate) type LuFactor = LU<f64, Dyn, Dyn>;

/// Reduced-space computational model `(M, B, K)`.
#[derive(Debug, Clone)]
pub struct CompModel {
    pub m: DMatrix<f64>,
    pub b: DMatrix<f64>,
    pub k: DMatrix<f64>,
}

impl CompModel {
    pub fn new(m: DMatrix<f64>, b: DMatrix<f64>, k: DMatrix<f64>) -> Result<Self> {
        let n = m.nrows();
        for (name, matrix) in [("mass", &m), ("damping", &b), ("stiffness", &k)] {
            if matrix.nrows() != n || matrix.ncols() != n {
                return Err(ModelError::Configuration(format!(
                    "the {name} matrix is {}x{} but the system has {n} DOFs",
                    matrix.nrows(),
                    matrix.ncols()
                )));
            }
        }
        Ok(Self { m, b, k })
    }

    pub fn n_dofs(&self) -> usize {
        self.m.nrows()
    }
}

/// Initial displacement, velocity and acceleration.
#[derive(Debug, Clone)]
pub struct InitialConditions {
    pub u0: DVector<f64>,
    pub v0: DVector<f64>,
    pub a0: DVector<f64>,
}

impl InitialConditions {
    pub fn new(u0: DVector<f64>, v0: DVector<f64>, a0: DVector<f64>) -> Result<Self> {
        if u0.len() != v0.len() || u0.len() != a0.len() {
            return Err(ModelError::Configuration(format!(
                "initial condition lengths differ: u0 has {}, v0 has {}, a0 has {}",
                u0.len(),
                v0.len(),
                a0.len()
            )));
        }
        Ok(Self { u0, v0, a0 })
    }

    pub fn at_rest(n_dofs: usize) -> Self {
        Self {
            u0: DVector::zeros(n_dofs),
            v0: DVector::zeros(n_dofs),
            a0: DVector::zeros(n_dofs),
        }
    }
}

pub trait TimeIntegrationScheme {
    /// Advances the current state one step under the force `f_next`.
    fn solve_single_step(&mut self, f_next: &DVector<f64>) -> Result<()>;

    /// Shifts the current state into the previous state.
    fn update(&mut self);

    fn displacement(&self) -> &DVector<f64>;
    fn velocity(&self) -> &DVector<f64>;
    fn acceleration(&self) -> &DVector<f64>;

    /// Applies a displacement correction to the current state, updating
    /// the derived velocity and acceleration consistently with the
    /// scheme's own difference formulas. Used by the residual iteration.
    fn shift_state(&mut self, du: &DVector<f64>);

    /// Displacement increment that drives the residual `ru` to zero under
    /// the scheme's linearized dynamics. `None` when the scheme does not
    /// support Newton-style residual iteration.
    fn residual_increment(&self, ru: &DVector<f64>) -> Option<DVector<f64>> {
        let _ = ru;
        None
    }
}

/// Scheme selector, parsed from the configuration name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeKind {
    GenAlpha,
    Euler12,
    ForwardEuler1,
    BackwardEuler1,
    RungeKutta4,
    Bdf2,
}

impl SchemeKind {
    pub const ALL: [SchemeKind; 6] = [
        SchemeKind::GenAlpha,
        SchemeKind::Euler12,
        SchemeKind::ForwardEuler1,
        SchemeKind::BackwardEuler1,
        SchemeKind::RungeKutta4,
        SchemeKind::Bdf2,
    ];

    pub fn parse(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| {
                let available: Vec<&str> = Self::ALL.iter().map(|kind| kind.name()).collect();
                ModelError::Configuration(format!(
                    "the time integration scheme \"{name}\" is not available. Choose one of: {}",
                    available.join(", ")
                ))
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            SchemeKind::GenAlpha => "GenAlpha",
            SchemeKind::Euler12 => "Euler12",
            SchemeKind::ForwardEuler1 => "ForwardEuler1",
            SchemeKind::BackwardEuler1 => "BackwardEuler1",
            SchemeKind::RungeKutta4 => "RungeKutta4",
            SchemeKind::Bdf2 => "BDF2",
        }
    }

    pub fn build(
        self,
        dt: f64,
        model: &CompModel,
        initial_conditions: &InitialConditions,
    ) -> Result<Box<dyn TimeIntegrationScheme>> {
        if dt <= 0.0 {
            return Err(ModelError::Configuration(format!(
                "time step must be positive, got {dt}"
            )));
        }
        if initial_conditions.u0.len() != model.n_dofs() {
            return Err(ModelError::Configuration(format!(
                "initial conditions have {} DOFs but the system has {}",
                initial_conditions.u0.len(),
                model.n_dofs()
            )));
        }
        Ok(match self {
            SchemeKind::GenAlpha => {
                Box::new(GeneralizedAlpha::new(dt, model, initial_conditions)?)
            }
            SchemeKind::Euler12 => Box::new(Euler12::new(dt, model, initial_conditions)?),
            SchemeKind::ForwardEuler1 => {
                Box::new(ForwardEuler1::new(dt, model, initial_conditions)?)
            }
            SchemeKind::BackwardEuler1 => {
                Box::new(BackwardEuler1::new(dt, model, initial_conditions)?)
            }
            SchemeKind::RungeKutta4 => {
                Box::new(RungeKutta4::new(dt, model, initial_conditions)?)
            }
            SchemeKind::Bdf2 => Box::new(Bdf2::new(dt, model, initial_conditions)?),
        })
    }
}

pub(crate) fn factorize(matrix: DMatrix<f64>, what: &str) -> Result<LuFactor> {
    let lu = matrix.lu();
    // a fully zero pivot means the matrix is singular
    if lu.determinant() == 0.0 {
        return Err(ModelError::Numerical(format!("the {what} is singular")));
    }
    Ok(lu)
}

pub(crate) fn solve_factorized(lu: &LuFactor, rhs: &DVector<f64>, what: &str) -> Result<DVector<f64>> {
    lu.solve(rhs)
        .ok_or_else(|| ModelError::Numerical(format!("failed to solve the {what} system")))
}
