//! Explicit mixed-order Euler: second order in displacement, first order
//! in velocity.
//!
//! The displacement advances by the truncated Taylor expansion, the
//! acceleration comes from equilibrium at the new displacement with a
//! predictor velocity in the damping term, and the velocity closes the
//! step with the trapezoidal acceleration average.

use nalgebra::{DMatrix, DVector};
use towerdyn_model::error::Result;

use super::{CompModel, InitialConditions, LuFactor, TimeIntegrationScheme, factorize,
            solve_factorized};

pub struct Euler12 {
    dt: f64,
    b: DMatrix<f64>,
    k: DMatrix<f64>,
    m_lu: LuFactor,
    un1: DVector<f64>,
    vn1: DVector<f64>,
    an1: DVector<f64>,
    u1: DVector<f64>,
    v1: DVector<f64>,
    a1: DVector<f64>,
}

impl Euler12 {
    pub fn new(dt: f64, model: &CompModel, initial: &InitialConditions) -> Result<Self> {
        let m_lu = factorize(model.m.clone(), "mass matrix")?;
        Ok(Self {
            dt,
            b: model.b.clone(),
            k: model.k.clone(),
            m_lu,
            un1: initial.u0.clone(),
            vn1: initial.v0.clone(),
            an1: initial.a0.clone(),
            u1: initial.u0.clone(),
            v1: initial.v0.clone(),
            a1: initial.a0.clone(),
        })
    }
}

impl TimeIntegrationScheme for Euler12 {
    fn solve_single_step(&mut self, f_next: &DVector<f64>) -> Result<()> {
        let dt = self.dt;
        self.u1 = &self.un1 + dt * &self.vn1 + (dt * dt / 2.0) * &self.an1;
        let v_predict = &self.vn1 + (dt / 2.0) * &self.an1;
        let rhs = f_next - &self.b * &v_predict - &self.k * &self.u1;
        self.a1 = solve_factorized(&self.m_lu, &rhs, "mass")?;
        self.v1 = &self.vn1 + (dt / 2.0) * (&self.an1 + &self.a1);
        Ok(())
    }

    fn update(&mut self) {
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
        self.v1 = (&self.u1 - &self.un1) / self.dt;
        self.a1 = (&self.v1 - &self.vn1) / self.dt;
    }
}
