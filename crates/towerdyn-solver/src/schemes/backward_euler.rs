//! Implicit backward Euler, first order.
//!
//! The effective left-hand side `M + B dt + K dt²` is time-invariant for
//! a linear system and is factorized once at construction.

use nalgebra::{DMatrix, DVector};
use towerdyn_model::error::Result;

use super::{CompModel, InitialConditions, LuFactor, TimeIntegrationScheme, factorize,
            solve_factorized};

pub struct BackwardEuler1 {
    dt: f64,
    b: DMatrix<f64>,
    m: DMatrix<f64>,
    lhs_lu: LuFactor,
    un1: DVector<f64>,
    un2: DVector<f64>,
    vn1: DVector<f64>,
    an1: DVector<f64>,
    u1: DVector<f64>,
    v1: DVector<f64>,
    a1: DVector<f64>,
}

impl BackwardEuler1 {
    pub fn new(dt: f64, model: &CompModel, initial: &InitialConditions) -> Result<Self> {
        let lhs = &model.m + &model.b * dt + &model.k * (dt * dt);
        let lhs_lu = factorize(lhs, "effective backward Euler matrix")?;
        Ok(Self {
            dt,
            b: model.b.clone(),
            m: model.m.clone(),
            lhs_lu,
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

impl TimeIntegrationScheme for BackwardEuler1 {
    fn solve_single_step(&mut self, f_next: &DVector<f64>) -> Result<()> {
        let dt = self.dt;
        let mut rhs = dt * (&self.b * &self.un1) + 2.0 * (&self.m * &self.un1);
        rhs -= &self.m * &self.un2;
        rhs += dt * dt * f_next;

        self.u1 = solve_factorized(&self.lhs_lu, &rhs, "backward Euler")?;
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

    fn residual_increment(&self, ru: &DVector<f64>) -> Option<DVector<f64>> {
        let rhs = ru * (self.dt * self.dt);
        self.lhs_lu.solve(&rhs)
    }
}
