//! Explicit forward Euler, first order.
//!
//! The displacement update follows from the second-order central
//! difference with the elastic and damping forces evaluated at the
//! two previous states, so only the mass matrix has to be solved.
//! Conditionally stable; choosing a stable `dt` is the caller's job.

use nalgebra::{DMatrix, DVector};
use towerdyn_model::error::Result;

use super::{CompModel, InitialConditions, LuFactor, TimeIntegrationScheme, factorize,
            solve_factorized};

pub struct ForwardEuler1 {
    dt: f64,
    b: DMatrix<f64>,
    k: DMatrix<f64>,
    m: DMatrix<f64>,
    m_lu: LuFactor,
    // previous states at n and n-1
    un1: DVector<f64>,
    un2: DVector<f64>,
    vn1: DVector<f64>,
    an1: DVector<f64>,
    // current state
    u1: DVector<f64>,
    v1: DVector<f64>,
    a1: DVector<f64>,
}

impl ForwardEuler1 {
    pub fn new(dt: f64, model: &CompModel, initial: &InitialConditions) -> Result<Self> {
        let m_lu = factorize(model.m.clone(), "mass matrix")?;
        Ok(Self {
            dt,
            b: model.b.clone(),
            k: model.k.clone(),
            m: model.m.clone(),
            m_lu,
            un1: initial.u0.clone(),
            un2: initial.u0.clone(),
            vn1: initial.v0.clone(),
            an1: initial.a0.clone(),
            u1: initial.u0.clone(),
            v1: initial.v0.clone(),
            a1: initial.a0.clone(),
        })
    }

    fn derive_rates(&mut self) {
        self.v1 = (&self.u1 - &self.un1) / self.dt;
        self.a1 = (&self.v1 - &self.vn1) / self.dt;
    }
}

impl TimeIntegrationScheme for ForwardEuler1 {
    fn solve_single_step(&mut self, f_next: &DVector<f64>) -> Result<()> {
        let dt = self.dt;
        let mut rhs = -dt * (&self.b * &self.un1) + dt * (&self.b * &self.un2);
        rhs += -dt * dt * (&self.k * &self.un2);
        rhs += &self.m * (2.0 * &self.un1 - &self.un2);
        rhs += dt * dt * f_next;

        self.u1 = solve_factorized(&self.m_lu, &rhs, "mass")?;
        self.derive_rates();
        Ok(())
    }

    fn update(&mut self) {
        self.un2 = self.un1.clone();
        self.un1 = self.u1.clone();
        self.vn1 = self.v1.clone();
        self.an1 = self.a1.clone();
    }

    fn displacement(&self) -> &DVector<f64> {
        &self.u1
    }

    fn velocity(&self) -> &DVector<f64> {
        &self.v1
    }

    fn acceleration(&self) -> &DVector<f64> {
        &self.a1
    }

    fn shift_state(&mut self, du: &DVector<f64>) {
        self.u1 += du;
        self.derive_rates();
    }
}
