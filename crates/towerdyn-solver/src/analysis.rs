//! Analysis calling contracts wiring the structure model to the solvers.
//!
//! These types own the validation of externally supplied load data, the
//! reduction of loads into the kept-DOF space, and the extension of the
//! solution histories back to the full DOF space for reporting.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use towerdyn_model::error::{ModelError, Result};

use crate::dof::ReductionAxis;
use crate::model::StructureModel;
use crate::schemes::{CompModel, InitialConditions};
use crate::solver::Solver;

/// Analysis kind requested by the configuration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisType {
    Static,
    Eigenvalue,
    Dynamic,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 3] = [
        AnalysisType::Static,
        AnalysisType::Eigenvalue,
        AnalysisType::Dynamic,
    ];

    pub fn parse(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| {
                let available: Vec<&str> = Self::ALL.iter().map(|kind| kind.name()).collect();
                ModelError::Configuration(format!(
                    "the analysis type \"{name}\" is not available. Choose one of: {}",
                    available.join(", ")
                ))
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            AnalysisType::Static => "static_analysis",
            AnalysisType::Eigenvalue => "eigenvalue_analysis",
            AnalysisType::Dynamic => "dynamic_analysis",
        }
    }
}

/// Linear static solve `K u = f` under a full-space load vector.
pub struct StaticAnalysis<'a> {
    model: &'a StructureModel,
    force: DVector<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaticResults {
    /// Full-space displacement, zero at constrained DOFs.
    pub displacement: DVector<f64>,
    /// Support reactions `K u - f` over the full DOF space.
    pub reaction: DVector<f64>,
}

impl<'a> StaticAnalysis<'a> {
    pub fn new(model: &'a StructureModel, force: DVector<f64>) -> Result<Self> {
        if force.len() != model.n_full_dofs() {
            return Err(ModelError::Configuration(format!(
                "the static load vector has {} entries but the model has {} DOFs",
                force.len(),
                model.n_full_dofs()
            )));
        }
        Ok(Self { model, force })
    }

    pub fn solve(&self) -> Result<StaticResults> {
        let k_red = self
            .model
            .reduce_to_free_dofs(&self.model.k, ReductionAxis::Both);
        let f_red = self.model.reducer().reduce_vector(&self.force);
        let u_red = k_red.lu().solve(&f_red).ok_or_else(|| {
            ModelError::Numerical("the reduced stiffness matrix is singular".to_string())
        })?;
        let displacement = self.model.reducer().extend_vector(&u_red);
        let reaction = &self.model.k * &displacement - &self.force;
        Ok(StaticResults {
            displacement,
            reaction,
        })
    }
}

/// Eigenvalue analysis report: frequencies plus the mode categorization.
#[derive(Debug, Clone, Serialize)]
pub struct EigenReport {
    /// Natural frequencies in Hz, ascending.
    pub frequencies_hz: Vec<f64>,
    /// Angular frequencies in rad/s, ascending.
    pub angular_frequencies: Vec<f64>,
    /// Category to 1-based mode ids (ascending-frequency positions).
    pub mode_categories: BTreeMap<String, Vec<usize>>,
    pub considered_modes: usize,
    pub total_mass: f64,
}

pub struct EigenvalueAnalysis<'a> {
    model: &'a mut StructureModel,
    considered_modes: usize,
}

impl<'a> EigenvalueAnalysis<'a> {
    pub fn new(model: &'a mut StructureModel, considered_modes: usize) -> Self {
        Self {
            model,
            considered_modes,
        }
    }

    pub fn solve(&mut self) -> Result<EigenReport> {
        let identification = self
            .model
            .identify_decoupled_eigenmodes(self.considered_modes)?
            .clone();
        let solution = self.model.eigen_solution()?;
        let frequencies_hz: Vec<f64> = solution
            .sorted_indices
            .iter()
            .map(|&raw| solution.frequencies_hz[raw])
            .collect();
        let angular_frequencies: Vec<f64> = solution
            .sorted_indices
            .iter()
            .map(|&raw| solution.angular_frequencies[raw])
            .collect();
        let mode_categories: BTreeMap<String, Vec<usize>> = identification
            .into_iter()
            .map(|(category, ids)| (category.name().to_string(), ids))
            .collect();
        Ok(EigenReport {
            frequencies_hz,
            angular_frequencies,
            mode_categories,
            considered_modes: self.considered_modes.min(solution.n_modes()),
            total_mass: self.model.total_mass(),
        })
    }
}

/// Transient analysis under a prescribed full-space force history.
#[derive(Debug)]
pub struct DynamicAnalysis<'a> {
    model: &'a StructureModel,
    array_time: Vec<f64>,
    dt: f64,
    /// Full-space force history, kept for the reaction computation.
    force_full: DMatrix<f64>,
    solver: Solver,
}

#[derive(Debug, Clone, Serialize)]
pub struct DynamicResults {
    pub array_time: Vec<f64>,
    /// Full-space `(n_full_dofs × n_timesteps)` histories.
    pub displacement: DMatrix<f64>,
    pub velocity: DMatrix<f64>,
    pub acceleration: DMatrix<f64>,
    /// `f_ext - M a - B v - K u`; meaningful at constrained and elastic
    /// DOFs.
    pub dynamic_reaction: DMatrix<f64>,
}

impl<'a> DynamicAnalysis<'a> {
    /// Validates the force/time contract and prepares the reduced-space
    /// solver. Fails before any integration step if the force history and
    /// time array disagree.
    pub fn new(
        model: &'a StructureModel,
        scheme_name: &str,
        force: DMatrix<f64>,
        array_time: Vec<f64>,
        dt: f64,
    ) -> Result<Self> {
        if force.nrows() != model.n_full_dofs() {
            return Err(ModelError::Configuration(format!(
                "the force history has {} DOFs but the model has {}",
                force.nrows(),
                model.n_full_dofs()
            )));
        }
        if force.ncols() != array_time.len() {
            return Err(ModelError::Configuration(format!(
                "the force history has {} samples but the time array has {}",
                force.ncols(),
                array_time.len()
            )));
        }

        let reducer = model.reducer();
        let force_reduced = reducer.reduce(&force, ReductionAxis::Row);
        let comp_model = CompModel::new(
            reducer.reduce(&model.m, ReductionAxis::Both),
            reducer.reduce(&model.b, ReductionAxis::Both),
            reducer.reduce(&model.k, ReductionAxis::Both),
        )?;
        // dynamic runs start from rest
        let initial_conditions = InitialConditions::at_rest(reducer.n_reduced());
        let solver = Solver::new(
            array_time.clone(),
            scheme_name,
            dt,
            comp_model,
            initial_conditions,
            force_reduced,
        )?;

        Ok(Self {
            model,
            array_time,
            dt,
            force_full: force,
            solver,
        })
    }

    pub fn solve(&mut self) -> Result<DynamicResults> {
        self.solver.solve()?;

        let displacement = self
            .model
            .extend_to_full_dofs(&self.solver.displacement, ReductionAxis::Row);
        let velocity = self
            .model
            .extend_to_full_dofs(&self.solver.velocity, ReductionAxis::Row);
        let acceleration = self
            .model
            .extend_to_full_dofs(&self.solver.acceleration, ReductionAxis::Row);

        let dynamic_reaction =
            self.compute_dynamic_reactions(&displacement, &velocity, &acceleration);

        Ok(DynamicResults {
            array_time: self.array_time.clone(),
            displacement,
            velocity,
            acceleration,
            dynamic_reaction,
        })
    }

    /// `f - M a - B v - K u` over the full space; entries at elastic DOFs
    /// are replaced by the spring/damper force of the elastic support
    /// (damper coefficient `a1 k` under the Rayleigh assumption).
    fn compute_dynamic_reactions(
        &self,
        displacement: &DMatrix<f64>,
        velocity: &DMatrix<f64>,
        acceleration: &DMatrix<f64>,
    ) -> DMatrix<f64> {
        let model = self.model;
        let mut reaction = &self.force_full
            - &model.m * acceleration
            - &model.b * velocity
            - &model.k * displacement;

        let a1 = model.rayleigh_coefficients[1];
        for (&dof, &stiffness) in &model.elastic_bc_dofs {
            let damping = stiffness * a1;
            for step in 0..reaction.ncols() {
                reaction[(dof, step)] =
                    stiffness * displacement[(dof, step)] + damping * velocity[(dof, step)];
            }
        }
        reaction
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use towerdyn_model::config::ModelConfig;

    fn cantilever_model() -> StructureModel {
        let config = ModelConfig::from_json_str(
            r#"{
                "domain_size": "3D",
                "system_parameters": {
                    "material": {
                        "density": 7850.0,
                        "youngs_modulus": 2.1e11,
                        "poisson_ratio": 0.3,
                        "damping_ratio": 0.01
                    },
                    "geometry": {
                        "length_x": 3.0,
                        "number_of_elements": 3,
                        "defined_on_intervals": [{
                            "interval_bounds": [0.0, "End"],
                            "length_y": [0.1],
                            "length_z": [0.2],
                            "area": [0.02],
                            "shear_area_y": [0.016667],
                            "shear_area_z": [0.016667],
                            "moment_of_inertia_y": [6.667e-5],
                            "moment_of_inertia_z": [1.667e-5],
                            "torsional_moment_of_inertia": [4.58e-5]
                        }]
                    }
                },
                "boundary_conditions": "fixed-free"
            }"#,
        )
        .unwrap();
        StructureModel::from_config(&config).unwrap()
    }

    #[test]
    fn parses_analysis_types() {
        assert_eq!(
            AnalysisType::parse("eigenvalue_analysis").unwrap(),
            AnalysisType::Eigenvalue
        );
        let err = AnalysisType::parse("buckling_analysis").unwrap_err();
        assert!(err.to_string().contains("dynamic_analysis"));
    }

    #[test]
    fn static_tip_load_matches_beam_theory() {
        let model = cantilever_model();
        let mut force = DVector::zeros(model.n_full_dofs());
        let tip_y = model.n_full_dofs() - 5; // y translation of the tip node
        force[tip_y] = -1000.0;
        let results = StaticAnalysis::new(&model, force).unwrap().solve().unwrap();

        // Timoshenko tip deflection: P L³/(3 E Iz) + P L/(G A_s)
        let l: f64 = 3.0;
        let e = 2.1e11;
        let g = e / 2.6;
        let bending = -1000.0 * l.powi(3) / (3.0 * e * 1.667e-5);
        let shear = -1000.0 * l / (g * 0.016667);
        let expected = bending + shear;
        let computed = results.displacement[tip_y];
        assert!(
            ((computed - expected) / expected).abs() < 1e-3,
            "tip deflection {computed} vs {expected}"
        );
        // the base reaction balances the applied load
        assert!((results.reaction[1] - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_static_load_of_wrong_length() {
        let model = cantilever_model();
        let force = DVector::zeros(7);
        assert!(StaticAnalysis::new(&model, force).is_err());
    }

    #[test]
    fn eigen_report_lists_ascending_frequencies() {
        let mut model = cantilever_model();
        let report = EigenvalueAnalysis::new(&mut model, 10).solve().unwrap();
        assert_eq!(report.considered_modes, 10);
        assert!(report.frequencies_hz.windows(2).all(|w| w[0] <= w[1]));
        assert!(report.frequencies_hz[0] > 0.0);
        assert!(report.mode_categories.contains_key("sway_z"));
        assert!(report.total_mass > 0.0);
    }

    #[test]
    fn dynamic_analysis_rejects_force_time_mismatch() {
        let model = cantilever_model();
        let force = DMatrix::zeros(model.n_full_dofs(), 50);
        let array_time: Vec<f64> = (0..51).map(|i| i as f64 * 0.01).collect();
        let err = DynamicAnalysis::new(&model, "GenAlpha", force, array_time, 0.01).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn dynamic_histories_are_extended_to_full_space() {
        let model = cantilever_model();
        let n_steps = 40;
        let dt = 1e-4;
        let mut force = DMatrix::zeros(model.n_full_dofs(), n_steps);
        let tip_y = model.n_full_dofs() - 5;
        for step in 0..n_steps {
            force[(tip_y, step)] = -1.0e4;
        }
        let array_time: Vec<f64> = (0..n_steps).map(|i| i as f64 * dt).collect();
        let mut analysis =
            DynamicAnalysis::new(&model, "GenAlpha", force, array_time, dt).unwrap();
        let results = analysis.solve().unwrap();

        assert_eq!(results.displacement.nrows(), model.n_full_dofs());
        assert_eq!(results.displacement.ncols(), n_steps);
        // constrained base DOFs stay zero
        for step in 0..n_steps {
            for dof in 0..6 {
                assert_eq!(results.displacement[(dof, step)], 0.0);
            }
        }
        // the loaded tip moves in the load direction
        assert!(results.displacement[(tip_y, n_steps - 1)] < 0.0);
        // base shear reaction opposes the load
        assert!(results.dynamic_reaction[(1, n_steps - 1)].abs() > 0.0);
    }

    #[test]
    fn elastic_support_reaction_is_spring_force() {
        let config = ModelConfig::from_json_str(
            r#"{
                "domain_size": "3D",
                "system_parameters": {
                    "material": {
                        "density": 7850.0,
                        "youngs_modulus": 2.1e11,
                        "poisson_ratio": 0.3,
                        "damping_ratio": 0.01
                    },
                    "geometry": {
                        "length_x": 3.0,
                        "number_of_elements": 3,
                        "defined_on_intervals": [{
                            "interval_bounds": [0.0, "End"],
                            "length_y": [0.1],
                            "length_z": [0.2],
                            "area": [0.02],
                            "shear_area_y": [0.016667],
                            "shear_area_z": [0.016667],
                            "moment_of_inertia_y": [6.667e-5],
                            "moment_of_inertia_z": [1.667e-5],
                            "torsional_moment_of_inertia": [4.58e-5]
                        }]
                    }
                },
                "boundary_conditions": "fixed-free",
                "elastic_fixity_dofs": {"1": 5.0e7}
            }"#,
        )
        .unwrap();
        let model = StructureModel::from_config(&config).unwrap();

        let n_steps = 20;
        let dt = 1e-4;
        let mut force = DMatrix::zeros(model.n_full_dofs(), n_steps);
        let tip_y = model.n_full_dofs() - 5;
        for step in 0..n_steps {
            force[(tip_y, step)] = -1.0e4;
        }
        let array_time: Vec<f64> = (0..n_steps).map(|i| i as f64 * dt).collect();
        let mut analysis =
            DynamicAnalysis::new(&model, "BackwardEuler1", force, array_time, dt).unwrap();
        let results = analysis.solve().unwrap();

        let a1 = model.rayleigh_coefficients[1];
        let step = n_steps - 1;
        let expected = 5.0e7 * results.displacement[(1, step)]
            + 5.0e7 * a1 * results.velocity[(1, step)];
        let actual = results.dynamic_reaction[(1, step)];
        assert!(
            (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0),
            "elastic reaction {actual} vs {expected}"
        );
    }
}
