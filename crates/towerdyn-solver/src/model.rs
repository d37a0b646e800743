//! The structure model: a straight prismatic beam on an equidistant grid.
//!
//! Construction runs the full setup pipeline: validate the configuration,
//! derive the parameter arrays, resolve the support pattern into
//! constrained DOFs, promote requested elastic DOFs, assemble the global
//! mass/stiffness matrices and fit the Rayleigh damping matrix (which
//! needs one eigen solve). If tuning targets are configured, the
//! optimization pipeline runs afterwards (see `optimization`).

use std::collections::BTreeMap;

use nalgebra::{DMatrix, Matrix2, Vector2};

use towerdyn_model::config::ModelConfig;
use towerdyn_model::error::{ModelError, Result};

use crate::assembly::{PointValues, assemble_mass, assemble_stiffness};
use crate::dof::{DofReducer, DomainSize, ReductionAxis, SupportCondition, resolve_signed_dof};
use crate::eigen::{
    DEFAULT_MODE_THRESHOLD, EigenSolution, ModeCategory, generalized_eigen,
    identify_decoupled_eigenmodes,
};
use crate::parameters::ModelParameters;

/// Undeformed nodal coordinates. The beam axis runs along x; all
/// transverse coordinates are zero at rest.
#[derive(Debug, Clone)]
pub struct NodalCoordinates {
    pub x0: Vec<f64>,
    pub y0: Vec<f64>,
    pub z0: Vec<f64>,
}

impl NodalCoordinates {
    fn new(n_nodes: usize, lx_i: f64) -> Self {
        Self {
            x0: (0..n_nodes).map(|i| i as f64 * lx_i).collect(),
            y0: vec![0.0; n_nodes],
            z0: vec![0.0; n_nodes],
        }
    }
}

#[derive(Debug)]
pub struct StructureModel {
    pub name: String,
    pub domain: DomainSize,
    pub support: SupportCondition,
    pub parameters: ModelParameters,
    pub nodal_coordinates: NodalCoordinates,
    /// Rigidly constrained global DOFs (after elastic promotion).
    bc_dofs: Vec<usize>,
    /// Elastic support DOFs mapped to their spring stiffness.
    pub elastic_bc_dofs: BTreeMap<usize, f64>,
    point_stiffness: PointValues,
    point_mass: PointValues,
    reducer: DofReducer,
    /// Global mass matrix, full DOF space.
    pub m: DMatrix<f64>,
    /// Global stiffness matrix, full DOF space.
    pub k: DMatrix<f64>,
    /// Rayleigh damping matrix `B = a0 M + a1 K`, full DOF space.
    pub b: DMatrix<f64>,
    /// Fitted Rayleigh coefficients `[a0, a1]`.
    pub rayleigh_coefficients: [f64; 2],
    eigen: Option<EigenSolution>,
    mode_identification: Option<BTreeMap<ModeCategory, Vec<usize>>>,
    mode_threshold: f64,
}

impl StructureModel {
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        config.validate()?;

        let domain = DomainSize::parse(&config.domain_size)?;
        let support = SupportCondition::parse(&config.boundary_conditions)?;
        let parameters = ModelParameters::from_config(config)?;

        let n_nodes = parameters.n_el + 1;
        let n_full = n_nodes * domain.dofs_per_node();
        let nodal_coordinates = NodalCoordinates::new(n_nodes, parameters.lx_i);

        // signed constrained-DOF list; elastic DOFs are removed from it
        let mut signed_bc: Vec<i64> = support.constrained_dofs(domain).to_vec();
        let mut elastic_bc_dofs = BTreeMap::new();
        let mut point_stiffness = PointValues::new();
        for (key, &stiffness) in &config.elastic_fixity_dofs {
            let signed: i64 = key.parse().map_err(|_| {
                ModelError::Configuration(format!(
                    "the elastic fixity DOF key \"{key}\" is not an integer DOF index"
                ))
            })?;
            let position = signed_bc.iter().position(|&dof| dof == signed).ok_or_else(|| {
                let available: Vec<String> =
                    signed_bc.iter().map(|dof| dof.to_string()).collect();
                ModelError::Configuration(format!(
                    "the elastic DOF \"{key}\" is not constrained by \"{}\". Choose one of: {}",
                    support.name(),
                    available.join(", ")
                ))
            })?;
            signed_bc.remove(position);

            let global = resolve_signed_dof(signed, n_full)?;
            elastic_bc_dofs.insert(global, stiffness);
            point_stiffness.add(global, stiffness);
        }

        let bc_dofs: Vec<usize> = signed_bc
            .iter()
            .map(|&dof| resolve_signed_dof(dof, n_full))
            .collect::<Result<_>>()?;
        let reducer = DofReducer::new(n_full, &bc_dofs);

        let mut model = Self {
            name: config.name.clone(),
            domain,
            support,
            parameters,
            nodal_coordinates,
            bc_dofs,
            elastic_bc_dofs,
            point_stiffness,
            point_mass: PointValues::new(),
            reducer,
            m: DMatrix::zeros(n_full, n_full),
            k: DMatrix::zeros(n_full, n_full),
            b: DMatrix::zeros(n_full, n_full),
            rayleigh_coefficients: [0.0, 0.0],
            eigen: None,
            mode_identification: None,
            mode_threshold: DEFAULT_MODE_THRESHOLD,
        };
        model.calculate_global_matrices()?;

        if let Some(targets) = &config.adapt_for_target_values {
            model.optimize_for_targets(targets)?;
        }
        Ok(model)
    }

    /// Overrides the mode-identification norm threshold.
    pub fn with_mode_threshold(mut self, threshold: f64) -> Self {
        self.mode_threshold = threshold;
        self
    }

    pub fn mode_threshold(&self) -> f64 {
        self.mode_threshold
    }

    pub fn n_full_dofs(&self) -> usize {
        self.reducer.n_full()
    }

    pub fn n_reduced_dofs(&self) -> usize {
        self.reducer.n_reduced()
    }

    pub fn reducer(&self) -> &DofReducer {
        &self.reducer
    }

    pub fn constrained_dofs(&self) -> &[usize] {
        &self.bc_dofs
    }

    pub fn point_stiffness(&self) -> &PointValues {
        &self.point_stiffness
    }

    pub fn point_mass(&self) -> &PointValues {
        &self.point_mass
    }

    /// Registers an additional lumped mass on the diagonal.
    pub fn add_point_mass(&mut self, dof: usize, value: f64) -> Result<()> {
        if dof >= self.n_full_dofs() {
            return Err(ModelError::Configuration(format!(
                "point mass DOF {dof} is outside the global DOF range of size {}",
                self.n_full_dofs()
            )));
        }
        self.point_mass.add(dof, value);
        self.calculate_global_matrices()
    }

    /// Recomputes `M`, `K` and the Rayleigh damping `B` from the current
    /// parameters. Any cached eigen solution is replaced.
    pub fn calculate_global_matrices(&mut self) -> Result<()> {
        self.m = assemble_mass(&self.parameters, self.domain, &self.point_mass);
        self.k = assemble_stiffness(&self.parameters, self.domain, &self.point_stiffness);
        self.mode_identification = None;
        self.eigenvalue_solve()?;
        self.fit_rayleigh_damping()
    }

    /// Solves the reduced generalized eigenproblem and caches the result.
    /// Idempotent; call again after any parameter mutation.
    pub fn eigenvalue_solve(&mut self) -> Result<()> {
        let k_red = self.reducer.reduce(&self.k, ReductionAxis::Both);
        let m_red = self.reducer.reduce(&self.m, ReductionAxis::Both);
        let (eigenvalues, mode_shapes) = generalized_eigen(&k_red, &m_red)?;
        self.eigen = Some(EigenSolution::new(eigenvalues, mode_shapes));
        Ok(())
    }

    pub fn eigen_solution(&self) -> Result<&EigenSolution> {
        self.eigen.as_ref().ok_or_else(|| {
            ModelError::Numerical("the eigenvalue problem has not been solved yet".to_string())
        })
    }

    /// Fits `B = a0 M + a1 K` so the two lowest modes carry the configured
    /// damping ratio.
    fn fit_rayleigh_damping(&mut self) -> Result<()> {
        let solution = self.eigen_solution()?;
        if solution.n_modes() < 2 {
            return Err(ModelError::Numerical(
                "Rayleigh damping needs at least two modes in the reduced system".to_string(),
            ));
        }
        let omega_i = solution.angular_frequency_of_mode(1)?;
        let omega_j = solution.angular_frequency_of_mode(2)?;
        if omega_i <= 0.0 || omega_j <= 0.0 {
            return Err(ModelError::Numerical(
                "Rayleigh damping requires strictly positive eigenfrequencies".to_string(),
            ));
        }
        if (omega_j - omega_i).abs() <= 1e-9 * omega_j {
            return Err(ModelError::Numerical(format!(
                "the two lowest modes are coincident at {omega_i} rad/s; the Rayleigh \
                 coefficient system is singular"
            )));
        }
        let zeta = self.parameters.material.zeta;
        let coefficient_matrix = 0.5
            * Matrix2::new(
                1.0 / omega_i,
                omega_i,
                1.0 / omega_j,
                omega_j,
            );
        let coefficients = coefficient_matrix
            .lu()
            .solve(&Vector2::new(zeta, zeta))
            .ok_or_else(|| {
                ModelError::Numerical(
                    "the Rayleigh coefficient system is singular (coincident modes?)".to_string(),
                )
            })?;
        self.rayleigh_coefficients = [coefficients[0], coefficients[1]];
        self.b = coefficients[0] * &self.m + coefficients[1] * &self.k;
        Ok(())
    }

    /// Categorizes the first `considered_modes` modes. Re-solves the
    /// eigenproblem first so the classification always reflects the
    /// current parameters.
    pub fn identify_decoupled_eigenmodes(
        &mut self,
        considered_modes: usize,
    ) -> Result<&BTreeMap<ModeCategory, Vec<usize>>> {
        self.eigenvalue_solve()?;
        let solution = self.eigen_solution()?;
        let identification = identify_decoupled_eigenmodes(
            solution,
            &self.reducer,
            self.domain,
            considered_modes,
            self.mode_threshold,
        );
        self.mode_identification = Some(identification);
        self.mode_identification.as_ref().ok_or_else(|| {
            ModelError::Numerical("mode identification produced no result".to_string())
        })
    }

    pub fn mode_identification(&self) -> Option<&BTreeMap<ModeCategory, Vec<usize>>> {
        self.mode_identification.as_ref()
    }

    /// Projects a matrix onto the kept-DOF subspace.
    pub fn reduce_to_free_dofs(&self, matrix: &DMatrix<f64>, axis: ReductionAxis) -> DMatrix<f64> {
        self.reducer.reduce(matrix, axis)
    }

    /// Extends a reduced matrix back to the full DOF space, zero-filling
    /// constrained DOFs.
    pub fn extend_to_full_dofs(&self, matrix: &DMatrix<f64>, axis: ReductionAxis) -> DMatrix<f64> {
        self.reducer.extend(matrix, axis)
    }

    pub fn total_mass(&self) -> f64 {
        self.parameters.total_mass()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use towerdyn_model::config::ModelConfig;

    fn cantilever_json(extra: &str) -> String {
        format!(
            r#"{{
                "name": "cantilever",
                "domain_size": "3D",
                "system_parameters": {{
                    "material": {{
                        "density": 7850.0,
                        "youngs_modulus": 2.1e11,
                        "poisson_ratio": 0.3,
                        "damping_ratio": 0.05
                    }},
                    "geometry": {{
                        "length_x": 3.0,
                        "number_of_elements": 3,
                        "defined_on_intervals": [{{
                            "interval_bounds": [0.0, "End"],
                            "length_y": [0.1],
                            "length_z": [0.2],
                            "area": [0.02],
                            "shear_area_y": [0.016667],
                            "shear_area_z": [0.016667],
                            "moment_of_inertia_y": [6.667e-5],
                            "moment_of_inertia_z": [1.667e-5],
                            "torsional_moment_of_inertia": [4.58e-5]
                        }}]
                    }}
                }},
                "boundary_conditions": "fixed-free"{extra}
            }}"#
        )
    }

    fn cantilever_model() -> StructureModel {
        let config = ModelConfig::from_json_str(&cantilever_json("")).unwrap();
        StructureModel::from_config(&config).unwrap()
    }

    #[test]
    fn builds_cantilever_model() {
        let model = cantilever_model();
        assert_eq!(model.n_full_dofs(), 24);
        assert_eq!(model.n_reduced_dofs(), 18);
        assert_eq!(model.constrained_dofs(), &[0, 1, 2, 3, 4, 5]);
        assert!(model.eigen_solution().is_ok());
    }

    #[test]
    fn rejects_unknown_boundary_condition() {
        let json = cantilever_json("").replace("fixed-free", "welded");
        let config = ModelConfig::from_json_str(&json).unwrap();
        let err = StructureModel::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("welded"));
    }

    #[test]
    fn damping_matrix_is_rayleigh_combination() {
        let model = cantilever_model();
        let [a0, a1] = model.rayleigh_coefficients;
        let expected = a0 * &model.m + a1 * &model.k;
        let diff = (&model.b - &expected).norm();
        assert!(diff < 1e-9 * model.b.norm().max(1.0));
    }

    #[test]
    fn rayleigh_fit_hits_target_ratios_at_both_modes() {
        let model = cantilever_model();
        let [a0, a1] = model.rayleigh_coefficients;
        let solution = model.eigen_solution().unwrap();
        for mode_id in [1, 2] {
            let omega = solution.angular_frequency_of_mode(mode_id).unwrap();
            let zeta = 0.5 * (a0 / omega + a1 * omega);
            assert!((zeta - 0.05).abs() < 1e-9, "mode {mode_id}: zeta = {zeta}");
        }
    }

    #[test]
    fn eigenvalue_solve_is_idempotent() {
        let mut model = cantilever_model();
        let first = model.eigen_solution().unwrap().frequencies_hz.clone();
        model.eigenvalue_solve().unwrap();
        let second = model.eigen_solution().unwrap().frequencies_hz.clone();
        for (a, b) in first.iter().zip(&second) {
            assert!((a - b).abs() < 1e-9 * a.abs().max(1.0));
        }
    }

    #[test]
    fn elastic_dof_promotion_moves_constraint_to_stiffness() {
        let rigid = cantilever_model();
        let json = cantilever_json(
            r#",
            "elastic_fixity_dofs": {"4": 1.0e8}"#,
        );
        let config = ModelConfig::from_json_str(&json).unwrap();
        let elastic = StructureModel::from_config(&config).unwrap();

        // the DOF leaves the rigid constraint set and stays kept
        assert_eq!(elastic.n_reduced_dofs(), rigid.n_reduced_dofs() + 1);
        assert!(elastic.reducer().keeps(4));
        assert!(!rigid.reducer().keeps(4));
        // and carries the spring on the stiffness diagonal
        assert!((elastic.k[(4, 4)] - rigid.k[(4, 4)] - 1.0e8).abs() < 1e-2);
        assert_eq!(elastic.elastic_bc_dofs[&4], 1.0e8);
    }

    #[test]
    fn rejects_elastic_dof_outside_constraint_set() {
        let json = cantilever_json(
            r#",
            "elastic_fixity_dofs": {"7": 1.0e8}"#,
        );
        let config = ModelConfig::from_json_str(&json).unwrap();
        let err = StructureModel::from_config(&config).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
        assert!(err.to_string().contains("7"));
    }

    #[test]
    fn negative_elastic_dof_key_resolves_from_the_end() {
        let json = cantilever_json("")
            .replace("fixed-free", "fixed-fixed")
            .replace(
                r#""boundary_conditions": "fixed-fixed""#,
                r#""boundary_conditions": "fixed-fixed",
                "elastic_fixity_dofs": {"-1": 5.0e6}"#,
            );
        let config = ModelConfig::from_json_str(&json).unwrap();
        let model = StructureModel::from_config(&config).unwrap();
        assert_eq!(model.elastic_bc_dofs[&23], 5.0e6);
        assert!(model.reducer().keeps(23));
    }

    #[test]
    fn point_mass_increases_total_matrix_mass() {
        let mut model = cantilever_model();
        let before = model.m[(23, 23)];
        model.add_point_mass(23, 120.0).unwrap();
        assert!((model.m[(23, 23)] - before - 120.0).abs() < 1e-9);
    }

    #[test]
    fn identifies_sway_modes_for_cantilever() {
        let mut model = cantilever_model();
        let identification = model.identify_decoupled_eigenmodes(10).unwrap().clone();
        assert!(identification.contains_key(&ModeCategory::SwayY));
        assert!(identification.contains_key(&ModeCategory::SwayZ));
        // the weak axis governs: the first mode bends about z (sway_z)
        let first_sway_z = identification[&ModeCategory::SwayZ][0];
        assert_eq!(first_sway_z, 1);
    }
}
