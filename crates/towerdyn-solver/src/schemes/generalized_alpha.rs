//! Implicit generalized-alpha scheme (Chung-Hulbert), second order with
//! controllable high-frequency dissipation.
//!
//! Parameterized by the spectral radius at infinity `rho_inf`:
//!
//! ```text
//! alpha_m = (2 rho - 1) / (rho + 1)      alpha_f = rho / (rho + 1)
//! gamma   = 1/2 - alpha_m + alpha_f      beta    = 1/4 (1 - alpha_m + alpha_f)²
//! ```
//!
//! Equilibrium is enforced at the generalized midpoints
//! `(1 - alpha_m) a_{n+1} + alpha_m a_n` etc.; the Newmark relations close
//! the update. The effective left-hand side is factorized once.

use nalgebra::{DMatrix, DVector};
use towerdyn_model::error::Result;

use super::{CompModel, InitialConditions, LuFactor, TimeIntegrationScheme, factorize,
            solve_factorized};

/// Default spectral radius, matching a mildly dissipative setting.
pub const DEFAULT_RHO_INF: f64 = 0.16;

pub struct GeneralizedAlpha {
    dt: f64,
    alpha_m: f64,
    alpha_f: f64,
    beta: f64,
    gamma: f64,
    m: DMatrix<f64>,
    b: DMatrix<f64>,
    k: DMatrix<f64>,
    lhs_lu: LuFactor,
    un1: DVector<f64>,
    vn1: DVector<f64>,
    an1: DVector<f64>,
    u1: DVector<f64>,
    v1: DVector<f64>,
    a1: DVector<f64>,
    /// Force at the current step start, blended into the midpoint force.
    f1: DVector<f64>,
}

impl GeneralizedAlpha {
    pub fn new(dt: f64, model: &CompModel, initial: &InitialConditions) -> Result<Self> {
        Self::with_rho_inf(dt, model, initial, DEFAULT_RHO_INF)
    }

    pub fn with_rho_inf(
        dt: f64,
        model: &CompModel,
        initial: &InitialConditions,
        rho_inf: f64,
    ) -> Result<Self> {
        let alpha_m = (2.0 * rho_inf - 1.0) / (rho_inf + 1.0);
        let alpha_f = rho_inf / (rho_inf + 1.0);
        let gamma = 0.5 - alpha_m + alpha_f;
        let beta = 0.25 * (1.0 - alpha_m + alpha_f).powi(2);

        let lhs = (1.0 - alpha_m) / (beta * dt * dt) * &model.m
            + (1.0 - alpha_f) * gamma / (beta * dt) * &model.b
            + (1.0 - alpha_f) * &model.k;
        let lhs_lu = factorize(lhs, "effective generalized-alpha matrix")?;

        let f1 = &model.m * &initial.a0 + &model.b * &initial.v0 + &model.k * &initial.u0;
        Ok(Self {
            dt,
            alpha_m,
            alpha_f,
            beta,
            gamma,
            m: model.m.clone(),
            b: model.b.clone(),
            k: model.k.clone(),
            lhs_lu,
            un1: initial.u0.clone(),
            vn1: initial.v0.clone(),
            an1: initial.a0.clone(),
            u1: initial.u0.clone(),
            v1: initial.v0.clone(),
            a1: initial.a0.clone(),
            f1,
        })
    }

    fn newmark_rates(&mut self) {
        let dt = self.dt;
        let du = &self.u1 - &self.un1;
        self.a1 = &du / (self.beta * dt * dt)
            - &self.vn1 / (self.beta * dt)
            - (1.0 / (2.0 * self.beta) - 1.0) * &self.an1;
        self.v1 = &self.vn1 + dt * ((1.0 - self.gamma) * &self.an1 + self.gamma * &self.a1);
    }
}

impl TimeIntegrationScheme for GeneralizedAlpha {
    fn solve_single_step(&mut self, f_next: &DVector<f64>) -> Result<()> {
        let dt = self.dt;
        let (am, af, beta, gamma) = (self.alpha_m, self.alpha_f, self.beta, self.gamma);

        let force = (1.0 - af) * f_next + af * &self.f1;

        let m_term = (1.0 - am)
            * (&self.un1 / (beta * dt * dt)
                + &self.vn1 / (beta * dt)
                + (1.0 / (2.0 * beta) - 1.0) * &self.an1)
            - am * &self.an1;
        let b_term = (1.0 - af)
            * (gamma / (beta * dt) * &self.un1
                - (1.0 - gamma / beta) * &self.vn1
                - dt * (1.0 - gamma / (2.0 * beta)) * &self.an1)
            - af * &self.vn1;

        let rhs = force + &self.m * m_term + &self.b * b_term - af * (&self.k * &self.un1);

        self.u1 = solve_factorized(&self.lhs_lu, &rhs, "generalized-alpha")?;
        self.newmark_rates();
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
        self.newmark_rates();
    }
}
