//! Assembly-level invariants: symmetry, mass conservation, the
//! reduction/extension round trip and the tuning contracts.

use nalgebra::{DMatrix, DVector};
use towerdyn_model::ModelConfig;
use towerdyn_solver::{ReductionAxis, StructureModel};

fn uniform_cantilever_json(n_el: usize, boundary_conditions: &str) -> String {
    format!(
        r#"{{
            "name": "uniform_cantilever",
            "domain_size": "3D",
            "system_parameters": {{
                "material": {{
                    "density": 7850.0,
                    "youngs_modulus": 2.1e11,
                    "poisson_ratio": 0.3,
                    "damping_ratio": 0.02
                }},
                "geometry": {{
                    "length_x": 3.0,
                    "number_of_elements": {n_el},
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
            "boundary_conditions": "{boundary_conditions}"
        }}"#
    )
}

fn uniform_cantilever(n_el: usize) -> StructureModel {
    let config = ModelConfig::from_json_str(&uniform_cantilever_json(n_el, "fixed-free")).unwrap();
    StructureModel::from_config(&config).unwrap()
}

#[test]
fn global_matrices_are_exactly_symmetric() {
    let model = uniform_cantilever(5);
    for matrix in [&model.m, &model.k, &model.b] {
        for i in 0..matrix.nrows() {
            for j in 0..i {
                let scale = matrix[(i, j)].abs().max(1.0);
                assert!(
                    (matrix[(i, j)] - matrix[(j, i)]).abs() <= 1e-9 * scale,
                    "asymmetry at ({i}, {j})"
                );
            }
        }
    }
}

#[test]
fn translational_mass_content_equals_total_mass() {
    let model = uniform_cantilever(4);
    let total_mass = model.total_mass();
    let n_nodes = model.parameters.n_el + 1;

    // rigid-body translation in each direction carries the full mass
    for direction in 0..3 {
        let mut rigid = DVector::zeros(model.n_full_dofs());
        for node in 0..n_nodes {
            rigid[node * 6 + direction] = 1.0;
        }
        let content = rigid.dot(&(&model.m * &rigid));
        assert!(
            ((content - total_mass) / total_mass).abs() < 1e-9,
            "direction {direction}: {content} vs {total_mass}"
        );
    }
}

#[test]
fn reduction_of_extension_is_identity_on_kept_dofs() {
    let model = uniform_cantilever(3);
    let n = model.n_full_dofs();
    let matrix = DMatrix::from_fn(n, n, |i, j| ((i * n + j) % 17) as f64 - 5.0);

    for axis in [
        ReductionAxis::Row,
        ReductionAxis::Column,
        ReductionAxis::Both,
    ] {
        let reduced = model.reduce_to_free_dofs(&matrix, axis);
        let round_trip =
            model.reduce_to_free_dofs(&model.extend_to_full_dofs(&reduced, axis), axis);
        assert_eq!(reduced, round_trip, "axis {axis:?}");
    }

    let column = DMatrix::from_fn(n, 1, |i, _| i as f64);
    let reduced = model.reduce_to_free_dofs(&column, ReductionAxis::RowVector);
    let round_trip = model.reduce_to_free_dofs(
        &model.extend_to_full_dofs(&reduced, ReductionAxis::RowVector),
        ReductionAxis::RowVector,
    );
    assert_eq!(reduced, round_trip);
}

#[test]
fn density_tuning_hits_any_positive_target_mass() {
    for target in [1.0, 250.0, 3.7e4] {
        let mut model = uniform_cantilever(3);
        model.adjust_density_for_target_total_mass(target).unwrap();
        assert!(
            (model.total_mass() - target).abs() <= 1e-9 * target,
            "target {target}"
        );
    }
}

#[test]
fn density_tuning_scales_frequencies_uniformly() {
    let mut model = uniform_cantilever(3);
    let before: Vec<f64> = {
        let solution = model.eigen_solution().unwrap();
        (1..=5)
            .map(|mode| solution.frequency_of_mode(mode).unwrap())
            .collect()
    };
    let mass_before = model.total_mass();
    model
        .adjust_density_for_target_total_mass(4.0 * mass_before)
        .unwrap();
    let solution = model.eigen_solution().unwrap();
    // quadrupled mass halves every frequency
    for (mode, f_before) in before.iter().enumerate() {
        let f_after = solution.frequency_of_mode(mode + 1).unwrap();
        assert!(
            (f_after - 0.5 * f_before).abs() < 1e-6 * f_before,
            "mode {}: {f_after} vs {}",
            mode + 1,
            0.5 * f_before
        );
    }
}

#[test]
fn elastic_promotion_keeps_dof_and_injects_spring() {
    let rigid = uniform_cantilever(3);

    let json = uniform_cantilever_json(3, "fixed-free").replace(
        r#""boundary_conditions": "fixed-free""#,
        r#""boundary_conditions": "fixed-free",
        "elastic_fixity_dofs": {"3": 2.5e6}"#,
    );
    let config = ModelConfig::from_json_str(&json).unwrap();
    let elastic = StructureModel::from_config(&config).unwrap();

    assert!(!rigid.reducer().keeps(3));
    assert!(elastic.reducer().keeps(3));
    assert_eq!(elastic.n_reduced_dofs(), rigid.n_reduced_dofs() + 1);
    assert!((elastic.k[(3, 3)] - rigid.k[(3, 3)] - 2.5e6).abs() < 1e-3);
    // the softened torsional base support lowers the torsional frequency
    let constrained: Vec<usize> = elastic.constrained_dofs().to_vec();
    assert!(!constrained.contains(&3));
}

#[test]
fn supports_reduce_the_expected_dof_counts() {
    for (bc, expected_free) in [
        ("fixed-fixed", 12usize),
        ("fixed-free", 18),
        ("free-fixed", 18),
        ("pinned-pinned", 18),
        ("fixed-pinned", 15),
        ("pinned-fixed", 15),
    ] {
        let config = ModelConfig::from_json_str(&uniform_cantilever_json(3, bc)).unwrap();
        let model = StructureModel::from_config(&config).unwrap();
        assert_eq!(model.n_reduced_dofs(), expected_free, "support {bc}");
    }
}

#[test]
fn two_dimensional_domain_uses_three_dofs_per_node() {
    let json = uniform_cantilever_json(4, "fixed-free").replace(
        r#""domain_size": "3D""#,
        r#""domain_size": "2D""#,
    );
    let config = ModelConfig::from_json_str(&json).unwrap();
    let model = StructureModel::from_config(&config).unwrap();
    assert_eq!(model.n_full_dofs(), 15);
    assert_eq!(model.n_reduced_dofs(), 12);
    let solution = model.eigen_solution().unwrap();
    assert!(solution.frequency_of_mode(1).unwrap() > 0.0);
}
