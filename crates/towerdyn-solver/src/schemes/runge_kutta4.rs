//! Explicit classical Runge-Kutta, fourth order.
//!
//! The second-order system is integrated as a first-order system in
//! `(u, v)` with four stage evaluations per step; the two middle stages
//! use the force averaged between the step endpoints. The mass matrix is
//! factorized once up front.

use nalgebra::{DMatrix, DVector};
use towerdyn_model::error::Result;

use super::{CompModel, InitialConditions, LuFactor, TimeIntegrationScheme, factorize,
            solve_factorized};

pub struct RungeKutta4 {
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
    /// Force at the current step start, needed for the stage averages.
    f1: DVector<f64>,
}

impl RungeKutta4 {
    pub fn new(dt: f64, model: &CompModel, initial: &InitialConditions) -> Result<Self> {
        let m_lu = factorize(model.m.clone(), "mass matrix")?;
        // equilibrium force consistent with the initial state
        let f1 = &model.m * &initial.a0 + &model.b * &initial.v0 + &model.k * &initial.u0;
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
            f1,
        })
    }

    fn rate(&self, u: &DVector<f64>, v: &DVector<f64>, f: &DVector<f64>) -> Result<DVector<f64>> {
        let rhs = f - &self.b * v - &self.k * u;
        solve_factorized(&self.m_lu, &rhs, "mass")
    }
}

impl TimeIntegrationScheme for RungeKutta4 {
    fn solve_single_step(&mut self, f_next: &DVector<f64>) -> Result<()> {
        let dt = self.dt;
        let f_mid = (f_next + &self.f1) / 2.0;

        let k0 = dt * &self.vn1;
        let l0 = dt * self.rate(&self.un1, &self.vn1, &self.f1)?;

        let k1 = dt * (0.5 * &l0 + &self.vn1);
        let l1 = dt
            * self.rate(
                &(0.5 * &k0 + &self.un1),
                &(0.5 * &l0 + &self.vn1),
                &f_mid,
            )?;

        let k2 = dt * (0.5 * &l1 + &self.vn1);
        let l2 = dt
            * self.rate(
                &(0.5 * &k1 + &self.un1),
                &(0.5 * &l1 + &self.vn1),
                &f_mid,
            )?;

        let k3 = dt * (&l2 + &self.vn1);
        let l3 = dt * self.rate(&(&k2 + &self.un1), &(&l2 + &self.vn1), f_next)?;

        self.u1 = &self.un1 + (k0 + 2.0 * (k1 + k2) + k3) / 6.0;
        self.v1 = &self.vn1 + (l0 + 2.0 * (l1 + l2) + l3) / 6.0;
        self.a1 = (&self.v1 - &self.vn1) / dt;
        self.f1 = f_next.clone();
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
