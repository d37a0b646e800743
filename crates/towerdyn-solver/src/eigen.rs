//! Generalized eigenvalue solution and mode categorization.
//!
//! The generalized symmetric problem `K φ = λ M φ` is transformed into a
//! standard symmetric problem through the Cholesky factor of `M`:
//!
//! 1. `M = L Lᵀ`
//! 2. `K* = L⁻¹ K L⁻ᵀ`
//! 3. solve `K* ψ = λ ψ`
//! 4. `φ = L⁻ᵀ ψ`

use std::collections::BTreeMap;

use nalgebra::linalg::{Cholesky, SymmetricEigen};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use towerdyn_model::error::{ModelError, Result};

use crate::dof::{DofLabel, DofReducer, DomainSize};

/// Default norm threshold above which a DOF-label sub-vector counts as
/// participating in a mode. The comparison is unnormalized; a single mode
/// may match several categories.
pub const DEFAULT_MODE_THRESHOLD: f64 = 1e-8;

/// Physical classification of an eigenmode by its dominant DOF labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ModeCategory {
    Longitudinal,
    Torsional,
    SwayY,
    SwayZ,
}

impl ModeCategory {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "longitudinal" => Ok(ModeCategory::Longitudinal),
            "torsional" => Ok(ModeCategory::Torsional),
            "sway_y" => Ok(ModeCategory::SwayY),
            "sway_z" => Ok(ModeCategory::SwayZ),
            other => {
                let available: Vec<&str> =
                    Self::all().iter().map(|category| category.name()).collect();
                Err(ModelError::Configuration(format!(
                    "the mode category \"{other}\" is not available. Choose one of: {}",
                    available.join(", ")
                )))
            }
        }
    }

    pub fn all() -> &'static [ModeCategory] {
        &[
            ModeCategory::Longitudinal,
            ModeCategory::Torsional,
            ModeCategory::SwayY,
            ModeCategory::SwayZ,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            ModeCategory::Longitudinal => "longitudinal",
            ModeCategory::Torsional => "torsional",
            ModeCategory::SwayY => "sway_y",
            ModeCategory::SwayZ => "sway_z",
        }
    }

    /// Categories that can occur in the given domain.
    pub fn available(domain: DomainSize) -> &'static [ModeCategory] {
        match domain {
            DomainSize::TwoD => &[ModeCategory::Longitudinal, ModeCategory::SwayZ],
            DomainSize::ThreeD => &[
                ModeCategory::Longitudinal,
                ModeCategory::Torsional,
                ModeCategory::SwayY,
                ModeCategory::SwayZ,
            ],
        }
    }

    /// DOF labels whose participation flags this category. Sway about an
    /// axis is carried by the perpendicular translation and the matching
    /// rotation: sway_y by `z`/`b`, sway_z by `y`/`g`.
    pub fn labels(self, domain: DomainSize) -> &'static [DofLabel] {
        match domain {
            DomainSize::TwoD => match self {
                ModeCategory::Longitudinal => &[DofLabel::X],
                ModeCategory::SwayZ => &[DofLabel::Y, DofLabel::G],
                ModeCategory::Torsional | ModeCategory::SwayY => &[],
            },
            DomainSize::ThreeD => match self {
                ModeCategory::Longitudinal => &[DofLabel::X],
                ModeCategory::Torsional => &[DofLabel::A],
                ModeCategory::SwayY => &[DofLabel::Z, DofLabel::B],
                ModeCategory::SwayZ => &[DofLabel::Y, DofLabel::G],
            },
        }
    }
}

/// Solves the generalized symmetric eigenproblem `K φ = λ M φ`.
///
/// Returns the raw eigenvalues and the matching eigenvectors as matrix
/// columns, in the (unspecified) order produced by the decomposition.
pub fn generalized_eigen(
    k: &DMatrix<f64>,
    m: &DMatrix<f64>,
) -> Result<(DVector<f64>, DMatrix<f64>)> {
    if k.nrows() != k.ncols() || m.nrows() != m.ncols() {
        return Err(ModelError::Numerical(
            "eigenproblem matrices must be square".to_string(),
        ));
    }
    if k.nrows() != m.nrows() {
        return Err(ModelError::Numerical(format!(
            "stiffness is {}x{} but mass is {}x{}",
            k.nrows(),
            k.ncols(),
            m.nrows(),
            m.ncols()
        )));
    }
    if k.nrows() == 0 {
        return Err(ModelError::Numerical(
            "cannot solve an eigenproblem without free DOFs".to_string(),
        ));
    }

    let cholesky = Cholesky::new(m.clone()).ok_or_else(|| {
        ModelError::Numerical(
            "mass matrix is not positive definite (Cholesky factorization failed)".to_string(),
        )
    })?;
    let l_inv = cholesky.l().try_inverse().ok_or_else(|| {
        ModelError::Numerical("failed to invert the Cholesky factor of the mass matrix".to_string())
    })?;

    let k_star = &l_inv * k * l_inv.transpose();
    let eigen = SymmetricEigen::new(k_star);

    let l_inv_t = l_inv.transpose();
    let mut eigenvectors = DMatrix::zeros(k.nrows(), k.nrows());
    for i in 0..k.nrows() {
        let phi = &l_inv_t * eigen.eigenvectors.column(i);
        eigenvectors.set_column(i, &phi);
    }

    Ok((eigen.eigenvalues, eigenvectors))
}

/// Eigen solution of the reduced model: eigenvalues, frequencies and
/// reduced-space mode shapes with an ascending-frequency sort order.
#[derive(Debug, Clone, Serialize)]
pub struct EigenSolution {
    /// Raw eigenvalues `λ = ω²`, in decomposition order.
    pub eigenvalues: Vec<f64>,
    /// Angular frequencies `ω = sqrt(λ)` in rad/s (clamped at zero for
    /// numerically negative rigid-body eigenvalues).
    pub angular_frequencies: Vec<f64>,
    /// Natural frequencies in Hz.
    pub frequencies_hz: Vec<f64>,
    /// Indices into the raw arrays, ascending by frequency.
    pub sorted_indices: Vec<usize>,
    /// Reduced-space mode shapes, one column per eigenvalue, in
    /// decomposition order.
    pub mode_shapes: DMatrix<f64>,
}

impl EigenSolution {
    pub fn new(eigenvalues: DVector<f64>, mode_shapes: DMatrix<f64>) -> Self {
        let eigenvalues: Vec<f64> = eigenvalues.iter().copied().collect();
        let angular_frequencies: Vec<f64> = eigenvalues
            .iter()
            .map(|&lambda| lambda.max(0.0).sqrt())
            .collect();
        let frequencies_hz: Vec<f64> = angular_frequencies
            .iter()
            .map(|&omega| omega / (2.0 * std::f64::consts::PI))
            .collect();
        let mut sorted_indices: Vec<usize> = (0..eigenvalues.len()).collect();
        sorted_indices.sort_by(|&a, &b| frequencies_hz[a].total_cmp(&frequencies_hz[b]));
        Self {
            eigenvalues,
            angular_frequencies,
            frequencies_hz,
            sorted_indices,
            mode_shapes,
        }
    }

    pub fn n_modes(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Natural frequency of the 1-based mode id in ascending order.
    pub fn frequency_of_mode(&self, mode_id: usize) -> Result<f64> {
        self.checked_raw_index(mode_id)
            .map(|raw| self.frequencies_hz[raw])
    }

    /// Angular frequency of the 1-based mode id in ascending order.
    pub fn angular_frequency_of_mode(&self, mode_id: usize) -> Result<f64> {
        self.checked_raw_index(mode_id)
            .map(|raw| self.angular_frequencies[raw])
    }

    /// Reduced-space mode shape of the 1-based mode id.
    pub fn mode_shape(&self, mode_id: usize) -> Result<DVector<f64>> {
        self.checked_raw_index(mode_id)
            .map(|raw| self.mode_shapes.column(raw).into_owned())
    }

    fn checked_raw_index(&self, mode_id: usize) -> Result<usize> {
        if mode_id == 0 || mode_id > self.sorted_indices.len() {
            return Err(ModelError::Configuration(format!(
                "mode id {mode_id} is outside the available range 1..={}",
                self.sorted_indices.len()
            )));
        }
        Ok(self.sorted_indices[mode_id - 1])
    }
}

/// Splits a full-space eigenvector into its per-DOF-label sub-vectors
/// (stride = dofs per node).
pub fn decompose_eigenmode(
    full_mode: &DVector<f64>,
    domain: DomainSize,
) -> BTreeMap<DofLabel, DVector<f64>> {
    let step = domain.dofs_per_node();
    let n_nodes = full_mode.len() / step;
    domain
        .dof_labels()
        .iter()
        .enumerate()
        .map(|(offset, &label)| {
            let sub = DVector::from_fn(n_nodes, |node, _| full_mode[node * step + offset]);
            (label, sub)
        })
        .collect()
}

/// Categorizes the first `considered_modes` modes (ascending frequency).
///
/// A category matches when any of its DOF-label sub-vectors exceeds the
/// norm threshold. Mode ids are 1-based positions in ascending order; one
/// mode may appear under several categories. Eigenvectors are extended to
/// the full DOF space first so the label stride stays node-aligned for
/// supports that constrain only part of a node.
pub fn identify_decoupled_eigenmodes(
    solution: &EigenSolution,
    reducer: &DofReducer,
    domain: DomainSize,
    considered_modes: usize,
    threshold: f64,
) -> BTreeMap<ModeCategory, Vec<usize>> {
    let considered = considered_modes.min(solution.n_modes());
    let mut identification: BTreeMap<ModeCategory, Vec<usize>> = BTreeMap::new();

    for position in 0..considered {
        let raw = solution.sorted_indices[position];
        let reduced_mode = solution.mode_shapes.column(raw).into_owned();
        let full_mode = reducer.extend_vector(&reduced_mode);
        let decomposed = decompose_eigenmode(&full_mode, domain);

        for &category in ModeCategory::available(domain) {
            let matched = category
                .labels(domain)
                .iter()
                .any(|label| decomposed[label].norm() > threshold);
            if matched {
                identification
                    .entry(category)
                    .or_default()
                    .push(position + 1);
            }
        }
    }

    identification
}
