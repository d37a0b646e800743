//! Implicit BDF2, second order, A-stable.
//!
//! Velocity and acceleration follow the three-point backward difference
//! `x' = (3 x_{n+1} - 4 x_n + x_{n-1}) / (2 dt)`. The missing pre-initial
//! state is extrapolated backwards from the initial conditions, which
//! keeps the first step first-order consistent.

use nalgebra::{DMatrix, DVector};
use towerdyn_model::error::Result;

use super::{CompModel, InitialConditions, LuFactor, TimeIntegrationScheme, factorize,
            solve_factorized};

pub struct Bdf2 {
    dt: f64,
    m: DMatrix<f64>,
    b: DMatrix<f64>,
    lhs_lu: LuFactor,
    un1: DVector<f64>,
    un2: DVector<f64>,
    vn1: DVector<f64>,
    vn2: DVector<f64>,
    an1: DVector<f64>,
    u1: DVector<f64>,
    v1: DVector<f64>,
    a1: DVector<f64>,
}

impl Bdf2 {
    pub fn new(dt: f64, model: &CompModel, initial: &InitialConditions) -> Result<Self> {
        let lhs = 9.0 / (4.0 * dt * dt) * &model.m + 3.0 / (2.0 * dt) * &model.b + &model.k;
        let lhs_lu = factorize(lhs, "effective BDF2 matrix")?;
        // backwards-extrapolated pre-initial state
        let un2 = &initial.u0 - dt * &initial.v0;
        let vn2 = &initial.v0 - dt * &initial.a0;
        Ok(Self {
            dt,
            m: model.m.clone(),
            b: model.b.clone(),
            lhs_lu,
            un1: initial.u0.clone(),
            un2,
            vn1: initial.v0.clone(),
            vn2,
            an1: initial.a0.clone(),
            u1: initial.u0.clone(),
            v1: initial.v0.clone(),
            a1: initial.a0.clone(),
        })
    }

    fn derive_rates(&mut self) {
        let dt = self.dt;
        self.v1 = (3.0 * &self.u1 - 4.0 * &self.un1 + &self.un2) / (2.0 * dt);
        self.a1 = (3.0 * &self.v1 - 4.0 * &self.vn1 + &self.vn2) / (2.0 * dt);
    }
}

impl TimeIntegrationScheme for Bdf2 {
    fn solve_single_step(&mut self, f_next: &DVector<f64>) -> Result<()> {
        let dt = self.dt;
        let m_term = (12.0 * &self.un1 - 3.0 * &self.un2) / (4.0 * dt * dt)
            + (4.0 * &self.vn1 - &self.vn2) / (2.0 * dt);
        let b_term = (4.0 * &self.un1 - &self.un2) / (2.0 * dt);
        let rhs = f_next + &self.m * m_term + &self.b * b_term;

        self.u1 = solve_factorized(&self.lhs_lu, &rhs, "BDF2")?;
        self.derive_rates();
        Ok(())
    }

    fn update(&mut self) {
        self.un2 = self.un1.clone();
        self.un1 = self.u1.clone();
        self.vn2 = self.vn1.clone();
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
